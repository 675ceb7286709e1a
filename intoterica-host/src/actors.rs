//! The host's actor registry, as seen by the faction engine.

use std::collections::HashMap;

use intoterica_core::ports::ActorDirectory;
use intoterica_core::types::ActorId;
use parking_lot::RwLock;

/// What the engine needs to know about one actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorRecord {
    /// Display name.
    pub name: String,
    /// Whether a participant owns the actor.
    pub player_owned: bool,
}

/// In-memory actor registry.
#[derive(Debug, Default)]
pub struct ActorRegistry {
    actors: RwLock<HashMap<ActorId, ActorRecord>>,
}

impl ActorRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an actor.
    pub fn insert(&self, id: ActorId, name: impl Into<String>, player_owned: bool) {
        self.actors.write().insert(
            id,
            ActorRecord {
                name: name.into(),
                player_owned,
            },
        );
    }

    /// Forget an actor.
    pub fn remove(&self, id: &ActorId) -> Option<ActorRecord> {
        self.actors.write().remove(id)
    }

    /// Number of registered actors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.read().len()
    }

    /// Whether no actor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.read().is_empty()
    }
}

impl ActorDirectory for ActorRegistry {
    fn actor_name(&self, id: &ActorId) -> Option<String> {
        self.actors.read().get(id).map(|a| a.name.clone())
    }

    fn is_player_owned(&self, id: &ActorId) -> bool {
        self.actors.read().get(id).is_some_and(|a| a.player_owned)
    }
}
