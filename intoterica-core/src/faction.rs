//! The faction aggregate: display metadata, reputation state, rank table
//! and member roster.
//!
//! Field names follow the host document (camelCase) so a faction list can
//! be read from and written back to the shared world settings untouched.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aggregate::{clamp_reputation, REPUTATION_MAX, REPUTATION_MIN};
use crate::coerce;
use crate::ranks::{self, Rank};
use crate::types::{ActorId, FactionId, MemberKind};

/// A named group with reputation state, a rank ladder and a roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faction {
    /// Opaque unique identifier.
    pub id: FactionId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Background and goals.
    #[serde(default)]
    pub description: String,
    /// Emoji or image path shown on the faction card.
    #[serde(default = "default_image")]
    pub image: String,
    /// Authoritative reputation while `auto_calc` is off.
    #[serde(default, deserialize_with = "coerce::lenient_reputation")]
    pub reputation: i32,
    /// Unit-weight input for unaffiliated participants while `auto_calc` is on.
    #[serde(default, deserialize_with = "coerce::lenient_reputation")]
    pub party_reputation: i32,
    /// Derive the displayed reputation from members instead of storing it.
    #[serde(default)]
    pub auto_calc: bool,
    /// Whether participants may join on their own.
    #[serde(default)]
    pub allow_enlistment: bool,
    /// Rank ladder; index 0 is the lowest rank.
    #[serde(default, deserialize_with = "ranks::deserialize_ranks")]
    pub ranks: Vec<Rank>,
    /// Roster, unique by member id.
    #[serde(default)]
    pub members: Vec<Member>,
}

/// One actor's standing inside a faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// The actor this membership refers to.
    pub id: ActorId,
    /// Display name captured when the member joined.
    #[serde(default)]
    pub name: String,
    /// Player character or NPC.
    #[serde(rename = "type", default)]
    pub kind: MemberKind,
    /// Index into the owning faction's rank table.
    #[serde(default, deserialize_with = "coerce::lenient_usize")]
    pub rank: usize,
    /// Accumulated experience.
    #[serde(default, deserialize_with = "coerce::lenient_u64")]
    pub xp: u64,
    /// This member's individual standing.
    #[serde(default, deserialize_with = "coerce::lenient_reputation")]
    pub reputation: i32,
}

fn default_image() -> String {
    "⚔️".to_string()
}

impl Faction {
    /// Create an empty faction in manual mode with neutral reputation.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: FactionId::new(),
            name: name.into(),
            description: String::new(),
            image: default_image(),
            reputation: 0,
            party_reputation: 0,
            auto_calc: false,
            allow_enlistment: false,
            ranks: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Builder-style rank table setter.
    #[must_use]
    pub fn with_ranks(mut self, ranks: Vec<Rank>) -> Self {
        self.ranks = ranks;
        self
    }

    /// Find a member by actor id.
    #[must_use]
    pub fn member(&self, id: &ActorId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    /// Find a member by actor id (mutable).
    pub fn member_mut(&mut self, id: &ActorId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| &m.id == id)
    }

    /// Whether the actor is on the roster.
    #[must_use]
    pub fn is_member(&self, id: &ActorId) -> bool {
        self.member(id).is_some()
    }

    /// Name of the rank a member currently holds, if the index is valid.
    #[must_use]
    pub fn rank_name(&self, member: &Member) -> Option<&str> {
        self.ranks.get(member.rank).map(|r| r.name.as_str())
    }

    /// Highest valid rank index, or `0` for an empty table.
    #[must_use]
    pub fn top_rank_index(&self) -> usize {
        self.ranks.len().saturating_sub(1)
    }

    /// Restore the aggregate's invariants after loading foreign data.
    ///
    /// Clamps every reputation to the legal range and drops duplicate member
    /// ids (the first occurrence wins). Rank indexes are left alone: a stale
    /// index weighs `1.0` through [`rank_at`](crate::ranks::rank_at).
    /// Returns `true` if anything was changed.
    pub fn repair(&mut self) -> bool {
        let mut changed = false;

        for value in [&mut self.reputation, &mut self.party_reputation] {
            let clamped = clamp_reputation(i64::from(*value));
            if clamped != *value {
                *value = clamped;
                changed = true;
            }
        }

        let mut seen = HashSet::new();
        let before = self.members.len();
        self.members.retain(|m| seen.insert(m.id.clone()));
        if self.members.len() != before {
            warn!(
                faction = %self.id,
                dropped = before - self.members.len(),
                "Dropped duplicate faction members"
            );
            changed = true;
        }

        for member in &mut self.members {
            if !(REPUTATION_MIN..=REPUTATION_MAX).contains(&member.reputation) {
                member.reputation = clamp_reputation(i64::from(member.reputation));
                changed = true;
            }
        }

        changed
    }

    /// Clamp a requested rank index into the rank table (`0` when empty).
    #[must_use]
    pub fn clamp_rank_index(&self, rank: usize) -> usize {
        rank.min(self.top_rank_index())
    }
}

impl Member {
    /// A fresh member at rank 0 with no XP and neutral standing.
    #[must_use]
    pub fn new(id: ActorId, name: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            rank: 0,
            xp: 0,
            reputation: 0,
        }
    }
}
