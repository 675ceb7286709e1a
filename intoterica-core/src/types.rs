//! Core type definitions for the faction engine.
//!
//! Identifiers are opaque strings handed out by the host application.
//! The engine never interprets them beyond equality.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for a faction. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactionId(pub String);

impl FactionId {
    /// Create a new random faction ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl Default for FactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for FactionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Reference to an actor (character sheet) owned by the host.
///
/// Members hold actor ids as weak references: the actor is looked up
/// through an [`ActorDirectory`](crate::ports::ActorDirectory) when needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Member classification
// ---------------------------------------------------------------------------

/// Whether a faction member is played by a participant or run by the GM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MemberKind {
    /// A player-owned character.
    Player,
    /// A non-player character.
    #[default]
    #[serde(rename = "NPC")]
    Npc,
}

impl MemberKind {
    /// Classify an actor by whether a player owns it.
    #[must_use]
    pub fn from_ownership(player_owned: bool) -> Self {
        if player_owned { Self::Player } else { Self::Npc }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => f.write_str("Player"),
            Self::Npc => f.write_str("NPC"),
        }
    }
}
