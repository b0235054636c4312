//! # Dungeon Core
//!
//! The simulation core of a turn-based dungeon crawler. This crate owns the
//! authoritative game state and advances it one turn at a time, using the
//! data and rules from `dungeon_rules`.
//!
//! ## Core Components
//!
//! - **world**: Entity identity, component storage and the event queue
//! - **events**: The closed set of game events
//! - **map**: Tile grid and seeded level generation
//! - **fov**: Symmetric shadowcasting field of view
//! - **pathfinding**: Bounded A* over the tile grid
//! - **combat**: Encounter tracking and engagement locks
//! - **systems**: Movement, attacks, AI, vision, pickup, status and deaths
//! - **scheduler**: The fixed five-phase turn loop
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: Every random draw comes from one seeded stream, so a
//!   seed and a list of intents replay exactly
//! - **Event-Driven**: Systems talk only through the event queue
//! - **Forgiving**: A failing action is logged and skipped; the turn goes on

pub mod combat;
pub mod config;
pub mod error;
pub mod events;
pub mod fov;
pub mod map;
pub mod pathfinding;
pub mod scheduler;
pub mod systems;
pub mod world;

pub use combat::{CombatTracker, Encounter, EncounterId, EncounterState};
pub use config::*;
pub use error::*;
pub use events::*;
pub use fov::compute_fov;
pub use map::*;
pub use pathfinding::*;
pub use scheduler::*;
pub use world::*;
