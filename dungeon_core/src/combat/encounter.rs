//! Encounter records.

use dungeon_rules::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of an encounter. Lower ids are older encounters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EncounterId(pub u32);

impl fmt::Display for EncounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encounter {}", self.0)
    }
}

/// Lifecycle of an encounter.
///
/// ```text
/// Forming -> Active -> Resolving -> Ended
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncounterState {
    /// Participants are being registered.
    Forming,
    /// Fighting. Participants are locked.
    Active,
    /// At most one side is left standing.
    Resolving,
    /// Terminal. Removed at the next turn boundary.
    Ended,
}

impl EncounterState {
    pub fn name(&self) -> &'static str {
        match self {
            EncounterState::Forming => "forming",
            EncounterState::Active => "active",
            EncounterState::Resolving => "resolving",
            EncounterState::Ended => "ended",
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_become(&self, next: EncounterState) -> bool {
        matches!(
            (self, next),
            (EncounterState::Forming, EncounterState::Active)
                | (EncounterState::Active, EncounterState::Resolving)
                | (EncounterState::Resolving, EncounterState::Ended)
        )
    }
}

/// One fight: who is in it and where it is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: EncounterId,
    pub state: EncounterState,
    /// Everyone who took part, including the dead. Sorted by id.
    pub participants: BTreeSet<EntityId>,
    /// While set, participants may not flee.
    pub locked: bool,
}

impl Encounter {
    pub(crate) fn new(id: EncounterId) -> Self {
        Self {
            id,
            state: EncounterState::Forming,
            participants: BTreeSet::new(),
            locked: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == EncounterState::Active
    }

    pub fn is_ended(&self) -> bool {
        self.state == EncounterState::Ended
    }

    pub fn participant_list(&self) -> Vec<EntityId> {
        self.participants.iter().copied().collect()
    }
}
