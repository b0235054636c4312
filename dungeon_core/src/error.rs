//! Error types for the simulation core.

use dungeon_rules::EntityId;
use thiserror::Error;

use crate::world::ComponentKind;

/// Errors from component store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// The id was never created or has been destroyed.
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
}

/// Errors raised while a system handles one entity's action.
///
/// None of these escape the turn scheduler: it logs them and skips the
/// action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error(transparent)]
    World(#[from] WorldError),

    /// A component the action cannot proceed without is absent.
    #[error("entity {entity} has no {component:?} component")]
    MissingComponent {
        entity: EntityId,
        component: ComponentKind,
    },

    /// The entity is dead or not on the active level.
    #[error("entity {0} cannot act")]
    Inactive(EntityId),
}

/// Errors from parsing a host-supplied configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid simulation config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors from building a level out of glyph rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("row {row} has a different width than the first row")]
    RaggedRow { row: usize },

    #[error("unknown tile glyph '{glyph}' at ({x}, {y})")]
    UnknownGlyph { glyph: char, x: usize, y: usize },
}
