//! # Dungeon Rules
//!
//! Data and rules for the dungeon simulation: entity identifiers, component
//! records, mechanics enums, the dice language and the combat rule functions.
//! This crate holds no world state and performs no I/O. Every random draw
//! comes from an explicit [`RollSource`].

pub mod dice;
pub mod entities;
pub mod mechanics;
pub mod rng;
pub mod rules;

pub use dice::*;
pub use entities::*;
pub use mechanics::*;
pub use rng::*;
pub use rules::*;
