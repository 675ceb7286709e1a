//! Faction commands: every write a session can request.
//!
//! On the wire a command is `{"action": "<name>", "payload": {...}}`, the
//! same shape the dispatch message carries. Numeric payload fields are
//! coerced leniently, so a form that sends `"15"` works like one that
//! sends `15`.

use intoterica_core::coerce;
use intoterica_core::roster::{FactionDraft, FactionEdit, MemberEdit};
use intoterica_core::types::{ActorId, FactionId};
use serde::{Deserialize, Serialize};

/// A requested write against the faction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum FactionCommand {
    /// Add a signed delta to the faction (party reputation in auto mode).
    AdjustReputation {
        /// Target faction.
        faction_id: FactionId,
        /// Signed change.
        #[serde(deserialize_with = "coerce::lenient_i32")]
        delta: i32,
    },
    /// Set the faction (party reputation in auto mode) to a value.
    SetReputation {
        /// Target faction.
        faction_id: FactionId,
        /// New value, clamped.
        #[serde(deserialize_with = "coerce::lenient_reputation")]
        value: i32,
    },
    /// Set one member's reputation.
    SetMemberReputation {
        /// Target faction.
        faction_id: FactionId,
        /// Target member.
        member_id: ActorId,
        /// New value, clamped.
        #[serde(deserialize_with = "coerce::lenient_reputation")]
        value: i32,
    },
    /// Grant XP to members.
    AwardXp {
        /// Target faction.
        faction_id: FactionId,
        /// Base amount before the tier multiplier.
        #[serde(deserialize_with = "coerce::lenient_u64")]
        amount: u64,
        /// Members to reward.
        #[serde(default)]
        member_ids: Vec<ActorId>,
    },
    /// Self-service join.
    EnlistFaction {
        /// Faction to join.
        faction_id: FactionId,
        /// The requesting user's character.
        actor_id: ActorId,
    },
    /// Create a faction.
    CreateFaction(FactionDraft),
    /// Replace a faction's descriptive fields and ranks.
    UpdateFaction {
        /// Target faction.
        faction_id: FactionId,
        /// New values.
        #[serde(flatten)]
        edit: FactionEdit,
    },
    /// Delete a faction.
    DeleteFaction {
        /// Target faction.
        faction_id: FactionId,
    },
    /// Put an actor on a faction's roster.
    AddMember {
        /// Target faction.
        faction_id: FactionId,
        /// Actor to add.
        actor_id: ActorId,
        /// Starting rank index.
        #[serde(default, deserialize_with = "coerce::lenient_usize")]
        rank: usize,
    },
    /// Take an actor off a faction's roster.
    RemoveMember {
        /// Target faction.
        faction_id: FactionId,
        /// Member to remove.
        member_id: ActorId,
    },
    /// Switch between manual and auto-calculated reputation.
    SetAutoCalc {
        /// Target faction.
        faction_id: FactionId,
        /// New mode.
        auto_calc: bool,
    },
    /// Correct a member's rank or XP.
    EditMember {
        /// Target faction.
        faction_id: FactionId,
        /// Target member.
        member_id: ActorId,
        /// Fields to change.
        #[serde(flatten)]
        edit: MemberEdit,
    },
}

impl FactionCommand {
    /// Wire name of the action.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::AdjustReputation { .. } => "adjustReputation",
            Self::SetReputation { .. } => "setReputation",
            Self::SetMemberReputation { .. } => "setMemberReputation",
            Self::AwardXp { .. } => "awardXp",
            Self::EnlistFaction { .. } => "enlistFaction",
            Self::CreateFaction(_) => "createFaction",
            Self::UpdateFaction { .. } => "updateFaction",
            Self::DeleteFaction { .. } => "deleteFaction",
            Self::AddMember { .. } => "addMember",
            Self::RemoveMember { .. } => "removeMember",
            Self::SetAutoCalc { .. } => "setAutoCalc",
            Self::EditMember { .. } => "editMember",
        }
    }

    /// Whether the command needs the faction-management role.
    ///
    /// Enlistment is the one self-service command.
    #[must_use]
    pub fn requires_manage(&self) -> bool {
        !matches!(self, Self::EnlistFaction { .. })
    }

    /// The faction this command targets, if it targets an existing one.
    #[must_use]
    pub fn faction_id(&self) -> Option<&FactionId> {
        match self {
            Self::AdjustReputation { faction_id, .. }
            | Self::SetReputation { faction_id, .. }
            | Self::SetMemberReputation { faction_id, .. }
            | Self::AwardXp { faction_id, .. }
            | Self::EnlistFaction { faction_id, .. }
            | Self::UpdateFaction { faction_id, .. }
            | Self::DeleteFaction { faction_id }
            | Self::AddMember { faction_id, .. }
            | Self::RemoveMember { faction_id, .. }
            | Self::SetAutoCalc { faction_id, .. }
            | Self::EditMember { faction_id, .. } => Some(faction_id),
            Self::CreateFaction(_) => None,
        }
    }
}
