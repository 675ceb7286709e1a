//! Users, roles and the permission threshold.
//!
//! The host ranks users by a numeric role. Faction management is gated by
//! a single threshold; write authority is separate and belongs to the
//! Game Master session alone.

use std::collections::HashMap;
use std::fmt;

use intoterica_core::types::ActorId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Host-assigned user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host user roles, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    /// Regular participant.
    Player = 1,
    /// Participant with extra trust.
    TrustedPlayer = 2,
    /// Co-organiser.
    AssistantGm = 3,
    /// Session owner.
    GameMaster = 4,
}

impl Role {
    /// Display name as shown by the host.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::TrustedPlayer => "Trusted Player",
            Self::AssistantGm => "Assistant GM",
            Self::GameMaster => "Game Master",
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Player),
            2 => Ok(Self::TrustedPlayer),
            3 => Ok(Self::AssistantGm),
            4 => Ok(Self::GameMaster),
            other => Err(format!("unknown role level {other}")),
        }
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        role as u8
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A connected user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Host id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Permission role.
    pub role: Role,
    /// Assigned character, if any.
    #[serde(default)]
    pub character: Option<ActorId>,
}

impl User {
    /// Whether this user holds write authority.
    #[must_use]
    pub fn is_gm(&self) -> bool {
        self.role == Role::GameMaster
    }
}

/// Minimum role for each gated feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionConfig {
    /// Create, edit and delete factions, edit reputations, award XP.
    #[serde(default = "default_manage_factions")]
    pub manage_factions: Role,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            manage_factions: default_manage_factions(),
        }
    }
}

impl PermissionConfig {
    /// Whether `role` may manage factions.
    #[must_use]
    pub fn can_manage_factions(&self, role: Role) -> bool {
        role >= self.manage_factions
    }
}

fn default_manage_factions() -> Role {
    Role::AssistantGm
}

/// The host's user list.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl UserDirectory {
    /// An empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a user.
    pub fn upsert(&self, user: User) {
        self.users.write().insert(user.id.clone(), user);
    }

    /// Remove a user.
    pub fn remove(&self, id: &UserId) -> Option<User> {
        self.users.write().remove(id)
    }

    /// Look up a user.
    #[must_use]
    pub fn get(&self, id: &UserId) -> Option<User> {
        self.users.read().get(id).cloned()
    }
}
