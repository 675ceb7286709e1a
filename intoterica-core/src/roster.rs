//! Faction and roster administration.
//!
//! [`FactionBook`] wraps the faction list loaded from the world document.
//! Lookups by id return `Option`: a stale id from another session is a
//! routine event, not an error, so every operation on a missing faction
//! or member is a no-op.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::faction::{Faction, Member};
use crate::ranks::{self, Rank};
use crate::types::{ActorId, FactionId, MemberKind};

// ---------------------------------------------------------------------------
// Edit payloads
// ---------------------------------------------------------------------------

/// Fields supplied when creating a faction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionDraft {
    /// Display name.
    pub name: String,
    /// Background and goals.
    #[serde(default)]
    pub description: String,
    /// Emoji or image path; blank falls back to the default emblem.
    #[serde(default)]
    pub image: Option<String>,
    /// Whether participants may join on their own.
    #[serde(default)]
    pub allow_enlistment: bool,
    /// Rank ladder, as a table or as `name, xp, modifier` lines.
    #[serde(default, deserialize_with = "ranks::deserialize_rank_input")]
    pub ranks: Vec<Rank>,
}

/// Fields replaced by an edit of an existing faction.
///
/// Reputation, mode and roster are untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionEdit {
    /// Display name.
    pub name: String,
    /// Background and goals.
    #[serde(default)]
    pub description: String,
    /// Emoji or image path.
    #[serde(default)]
    pub image: String,
    /// Whether participants may join on their own.
    #[serde(default)]
    pub allow_enlistment: bool,
    /// Replacement rank ladder.
    #[serde(default, deserialize_with = "ranks::deserialize_rank_input")]
    pub ranks: Vec<Rank>,
}

/// A GM correction of a member's rank and/or XP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEdit {
    /// New rank index, clamped into the rank table.
    #[serde(default, deserialize_with = "crate::coerce::lenient_opt_usize")]
    pub rank: Option<usize>,
    /// New XP total.
    #[serde(default, deserialize_with = "crate::coerce::lenient_opt_u64")]
    pub xp: Option<u64>,
}

/// Why a self-service enlistment did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnlistRefusal {
    /// The faction id is unknown.
    #[error("faction not found")]
    UnknownFaction,
    /// The faction does not accept self-service members.
    #[error("faction is not recruiting")]
    Closed,
    /// Auto-calculated factions are managed by the GM only.
    #[error("faction reputation is auto-calculated")]
    AutoCalculated,
    /// The actor is already on the roster.
    #[error("already a member")]
    AlreadyMember,
}

// ---------------------------------------------------------------------------
// FactionBook
// ---------------------------------------------------------------------------

/// The world's faction list with administration operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactionBook {
    factions: Vec<Faction>,
}

impl FactionBook {
    /// Wrap a loaded faction list, repairing each faction on the way in.
    #[must_use]
    pub fn new(mut factions: Vec<Faction>) -> Self {
        for faction in &mut factions {
            faction.repair();
        }
        Self { factions }
    }

    /// All factions in stored order.
    #[must_use]
    pub fn factions(&self) -> &[Faction] {
        &self.factions
    }

    /// Consume the book, returning the list to persist.
    #[must_use]
    pub fn into_inner(self) -> Vec<Faction> {
        self.factions
    }

    /// Number of factions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factions.len()
    }

    /// Whether the book holds no factions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }

    /// Look up a faction.
    #[must_use]
    pub fn get(&self, id: &FactionId) -> Option<&Faction> {
        self.factions.iter().find(|f| &f.id == id)
    }

    /// Look up a faction for mutation.
    pub fn get_mut(&mut self, id: &FactionId) -> Option<&mut Faction> {
        self.factions.iter_mut().find(|f| &f.id == id)
    }

    /// Create a faction in manual mode at neutral reputation.
    pub fn create(&mut self, draft: FactionDraft) -> &Faction {
        let mut faction = Faction::new(draft.name);
        faction.description = draft.description;
        if let Some(image) = draft.image.filter(|i| !i.trim().is_empty()) {
            faction.image = image;
        }
        faction.allow_enlistment = draft.allow_enlistment;
        faction.ranks = draft.ranks;

        info!(faction = %faction.id, name = %faction.name, "Faction created");
        let index = self.factions.len();
        self.factions.push(faction);
        &self.factions[index]
    }

    /// Replace a faction's descriptive fields and rank ladder.
    ///
    /// Member rank indexes are kept as stored; one past a shortened ladder
    /// weighs `1.0` until the member is edited. Returns `false` for an
    /// unknown id.
    pub fn update(&mut self, id: &FactionId, edit: FactionEdit) -> bool {
        let Some(faction) = self.get_mut(id) else {
            return false;
        };
        faction.name = edit.name;
        faction.description = edit.description;
        faction.image = edit.image;
        faction.allow_enlistment = edit.allow_enlistment;
        faction.ranks = edit.ranks;
        debug!(faction = %id, "Faction updated");
        true
    }

    /// Remove a faction. Returns the removed faction, if it existed.
    pub fn delete(&mut self, id: &FactionId) -> Option<Faction> {
        let index = self.factions.iter().position(|f| &f.id == id)?;
        let removed = self.factions.remove(index);
        info!(faction = %id, name = %removed.name, "Faction deleted");
        Some(removed)
    }

    /// Toggle auto-calc mode. Returns `false` if the faction is unknown or
    /// already in the requested mode.
    pub fn set_auto_calc(&mut self, id: &FactionId, auto_calc: bool) -> bool {
        match self.get_mut(id) {
            Some(faction) if faction.auto_calc != auto_calc => {
                faction.auto_calc = auto_calc;
                debug!(faction = %id, auto_calc, "Faction mode changed");
                true
            }
            _ => false,
        }
    }

    /// Add an actor to a faction at the given rank (clamped into the table).
    ///
    /// Returns `None` if the faction is unknown or the actor is already a
    /// member.
    pub fn add_member(
        &mut self,
        faction_id: &FactionId,
        actor: ActorId,
        name: impl Into<String>,
        kind: MemberKind,
        rank: usize,
    ) -> Option<&Member> {
        let faction = self.get_mut(faction_id)?;
        if faction.is_member(&actor) {
            debug!(faction = %faction_id, actor = %actor, "Member already on roster");
            return None;
        }

        let mut member = Member::new(actor, name, kind);
        member.rank = faction.clamp_rank_index(rank);
        info!(
            faction = %faction_id,
            actor = %member.id,
            kind = %member.kind,
            rank = member.rank,
            "Member added"
        );
        faction.members.push(member);
        faction.members.last()
    }

    /// Remove an actor from a faction's roster.
    pub fn remove_member(&mut self, faction_id: &FactionId, actor: &ActorId) -> Option<Member> {
        let faction = self.get_mut(faction_id)?;
        let index = faction.members.iter().position(|m| &m.id == actor)?;
        let removed = faction.members.remove(index);
        info!(faction = %faction_id, actor = %actor, "Member removed");
        Some(removed)
    }

    /// Self-service join: the actor enters at rank 0 as a player.
    ///
    /// # Errors
    /// Returns the [`EnlistRefusal`] explaining why nothing changed.
    pub fn enlist(
        &mut self,
        faction_id: &FactionId,
        actor: ActorId,
        name: impl Into<String>,
    ) -> Result<&Member, EnlistRefusal> {
        let faction = self
            .get(faction_id)
            .ok_or(EnlistRefusal::UnknownFaction)?;
        if !faction.allow_enlistment {
            return Err(EnlistRefusal::Closed);
        }
        if faction.auto_calc {
            return Err(EnlistRefusal::AutoCalculated);
        }
        if faction.is_member(&actor) {
            return Err(EnlistRefusal::AlreadyMember);
        }
        self.add_member(faction_id, actor, name, MemberKind::Player, 0)
            .ok_or(EnlistRefusal::UnknownFaction)
    }

    /// Apply a GM correction to a member's rank and XP.
    ///
    /// Returns `false` if the faction or member is unknown or nothing
    /// changed.
    pub fn edit_member(&mut self, faction_id: &FactionId, actor: &ActorId, edit: MemberEdit) -> bool {
        let Some(faction) = self.get_mut(faction_id) else {
            return false;
        };
        let rank = edit.rank.map(|r| faction.clamp_rank_index(r));
        let Some(member) = faction.member_mut(actor) else {
            return false;
        };

        let mut changed = false;
        if let Some(rank) = rank.filter(|r| *r != member.rank) {
            member.rank = rank;
            changed = true;
        }
        if let Some(xp) = edit.xp.filter(|x| *x != member.xp) {
            member.xp = xp;
            changed = true;
        }
        if changed {
            debug!(faction = %faction_id, actor = %actor, rank = member.rank, xp = member.xp, "Member edited");
        }
        changed
    }
}

impl From<Vec<Faction>> for FactionBook {
    fn from(factions: Vec<Faction>) -> Self {
        Self::new(factions)
    }
}
