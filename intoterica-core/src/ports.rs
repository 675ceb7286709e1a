//! Traits the host implements so the engine can load, save and announce
//! changes without knowing how the host stores or transports anything.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::faction::Faction;
use crate::types::ActorId;

/// Load/save access to the world's faction list.
///
/// Only the single designated writer may call
/// [`save_factions`](FactionStore::save_factions).
pub trait FactionStore: Send + Sync {
    /// Read the current faction list.
    ///
    /// # Errors
    /// Returns an error if the underlying store cannot be read.
    fn load_factions(&self) -> Result<Vec<Faction>>;

    /// Replace the stored faction list.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    fn save_factions(&self, factions: &[Faction]) -> Result<()>;
}

/// Announcement that the shared store changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEvent {
    /// Optional hint about what changed (e.g. `"awardXp"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl StoreEvent {
    /// An event tagged with the command that caused it.
    #[must_use]
    pub fn action(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
        }
    }
}

/// Fire-and-forget fan-out to other sessions.
pub trait Broadcaster: Send + Sync {
    /// Tell every other session the store changed.
    fn broadcast(&self, event: StoreEvent);
}

/// Read access to the host's actor registry.
pub trait ActorDirectory: Send + Sync {
    /// Display name of an actor, if it exists.
    fn actor_name(&self, id: &ActorId) -> Option<String>;

    /// Whether a participant (not the GM) owns the actor.
    fn is_player_owned(&self, id: &ActorId) -> bool;
}
