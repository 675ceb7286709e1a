//! Reputation mutations.
//!
//! Every entry point clamps, reports the before/after value together with
//! both tiers, and returns `None` when the stored value did not move.
//! Callers notify on [`ReputationChange::tier_changed`], which compares
//! labels only.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{clamp_reputation, effective_reputation};
use crate::faction::Faction;
use crate::tier::ReputationTier;
use crate::types::ActorId;

/// Before/after snapshot of one reputation value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationChange {
    /// Value before the mutation.
    pub old: i32,
    /// Value after the mutation.
    pub new: i32,
    /// Tier before the mutation.
    pub old_tier: ReputationTier,
    /// Tier after the mutation.
    pub new_tier: ReputationTier,
}

impl ReputationChange {
    /// Build a change record, classifying both values.
    #[must_use]
    pub fn between(old: i32, new: i32) -> Self {
        Self {
            old,
            new,
            old_tier: ReputationTier::classify(old),
            new_tier: ReputationTier::classify(new),
        }
    }

    /// Signed difference `new - old`.
    #[must_use]
    pub fn delta(&self) -> i32 {
        self.new - self.old
    }

    /// Whether the displayed tier label changed.
    #[must_use]
    pub fn tier_changed(&self) -> bool {
        self.old_tier.label_differs(self.new_tier)
    }
}

/// Result of setting one member's reputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberReputationChange {
    /// The member's own before/after.
    pub member: ReputationChange,
    /// Faction effective reputation before/after, when in auto mode and it moved.
    pub faction: Option<ReputationChange>,
}

/// Which stored field a faction-level mutation writes.
///
/// Manual factions store `reputation`; auto-calc factions only let the
/// party contribution be edited.
fn target_field(faction: &mut Faction) -> &mut i32 {
    if faction.auto_calc {
        &mut faction.party_reputation
    } else {
        &mut faction.reputation
    }
}

fn write_faction_value(faction: &mut Faction, next: i64) -> Option<ReputationChange> {
    let before = effective_reputation(faction);
    let field = target_field(faction);
    let clamped = clamp_reputation(next);
    if *field == clamped {
        return None;
    }
    *field = clamped;
    let after = effective_reputation(faction);

    debug!(
        faction = %faction.id,
        auto_calc = faction.auto_calc,
        before,
        after,
        "Faction reputation written"
    );
    Some(ReputationChange::between(before, after))
}

/// Add `delta` to the faction's stored reputation (party reputation in
/// auto mode) and clamp.
///
/// The returned change describes the *effective* reputation, which is what
/// participants see.
pub fn adjust_reputation(faction: &mut Faction, delta: i32) -> Option<ReputationChange> {
    let current = i64::from(*target_field(faction));
    write_faction_value(faction, current + i64::from(delta))
}

/// Set the faction's stored reputation (party reputation in auto mode) to
/// an absolute value and clamp.
pub fn set_reputation(faction: &mut Faction, value: i32) -> Option<ReputationChange> {
    write_faction_value(faction, i64::from(value))
}

/// Set one member's reputation.
///
/// In auto mode the faction's effective reputation is recomputed and
/// reported alongside, so both tier changes can be notified independently.
/// Returns `None` for an unknown member or an unchanged value.
pub fn set_member_reputation(
    faction: &mut Faction,
    member_id: &ActorId,
    value: i32,
) -> Option<MemberReputationChange> {
    let faction_before = effective_reputation(faction);
    let clamped = clamp_reputation(i64::from(value));

    let member = faction.member_mut(member_id)?;
    let old = member.reputation;
    if old == clamped {
        return None;
    }
    member.reputation = clamped;

    let faction_change = if faction.auto_calc {
        let faction_after = effective_reputation(faction);
        (faction_after != faction_before)
            .then(|| ReputationChange::between(faction_before, faction_after))
    } else {
        None
    };

    debug!(
        faction = %faction.id,
        member = %member_id,
        old,
        new = clamped,
        "Member reputation written"
    );

    Some(MemberReputationChange {
        member: ReputationChange::between(old, clamped),
        faction: faction_change,
    })
}
