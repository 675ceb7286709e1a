//! XP awards and rank promotion.
//!
//! The faction's effective reputation picks a tier, the tier's XP modifier
//! scales the base grant, and every targeted member receives the same
//! final amount. Each member can climb at most one rank per award.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::{effective_reputation, round_half_up};
use crate::faction::Faction;
use crate::tier::ReputationTier;
use crate::types::ActorId;

/// Per-member result of an award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardEntry {
    /// Member that received XP.
    pub member_id: ActorId,
    /// Member display name at award time.
    pub name: String,
    /// XP added by this award.
    pub xp_gained: u64,
    /// Member's XP after the award.
    pub new_xp: u64,
    /// New rank index and name, if the member was promoted.
    pub promoted_to: Option<(usize, String)>,
}

impl AwardEntry {
    /// Human-readable line for chat output, e.g. `"Mara: +110 XP"`.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.promoted_to {
            Some((_, rank)) => format!("{}: +{} XP (Promoted to {rank}!)", self.name, self.xp_gained),
            None => format!("{}: +{} XP", self.name, self.xp_gained),
        }
    }
}

impl fmt::Display for AwardEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Result of [`award_xp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardOutcome {
    /// Tier the faction stood at when the award was evaluated.
    pub tier: ReputationTier,
    /// XP multiplier taken from that tier.
    pub modifier: f64,
    /// XP each member received after scaling.
    pub final_xp: u64,
    /// One entry per member processed, in the order the targets were given.
    pub entries: Vec<AwardEntry>,
}

impl AwardOutcome {
    /// Number of members promoted by this award.
    #[must_use]
    pub fn promotions(&self) -> usize {
        self.entries.iter().filter(|e| e.promoted_to.is_some()).count()
    }
}

/// Scale `base` by a tier's XP modifier, rounding half up.
#[must_use]
pub fn scaled_xp(base: u64, tier: ReputationTier) -> u64 {
    #[allow(clippy::cast_precision_loss)]
    let scaled = round_half_up(base as f64 * tier.xp_modifier());
    if scaled.is_finite() && scaled > 0.0 {
        // Saturating float-to-int conversion.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let xp = scaled as u64;
        xp
    } else {
        0
    }
}

/// Grant XP to the targeted members and evaluate promotion.
///
/// Ids that are not on the roster are skipped, and a repeated id is only
/// paid once. Entries follow the first occurrence of each target. Returns
/// `None` (and leaves the faction untouched) when no targeted member exists.
pub fn award_xp(faction: &mut Faction, base: u64, targets: &[ActorId]) -> Option<AwardOutcome> {
    let mut seen = HashSet::new();
    let positions: Vec<usize> = targets
        .iter()
        .filter(|id| seen.insert(*id))
        .filter_map(|id| faction.members.iter().position(|m| &m.id == id))
        .collect();
    if positions.is_empty() {
        debug!(faction = %faction.id, "Award skipped: no targeted member on roster");
        return None;
    }

    let tier = ReputationTier::classify(effective_reputation(faction));
    let final_xp = scaled_xp(base, tier);

    let mut entries = Vec::with_capacity(positions.len());
    for index in positions {
        let member = &mut faction.members[index];
        member.xp = member.xp.saturating_add(final_xp);

        let next = member.rank + 1;
        let promoted_to = match faction.ranks.get(next) {
            Some(rank) if member.xp >= rank.xp => {
                member.rank = next;
                Some((next, rank.name.clone()))
            }
            _ => None,
        };

        entries.push(AwardEntry {
            member_id: member.id.clone(),
            name: member.name.clone(),
            xp_gained: final_xp,
            new_xp: member.xp,
            promoted_to,
        });
    }

    let outcome = AwardOutcome {
        tier,
        modifier: tier.xp_modifier(),
        final_xp,
        entries,
    };

    info!(
        faction = %faction.id,
        base,
        final_xp,
        tier = %tier,
        members = outcome.entries.len(),
        promotions = outcome.promotions(),
        "XP awarded"
    );

    Some(outcome)
}
