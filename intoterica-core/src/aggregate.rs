//! Reputation aggregation.
//!
//! In auto-calc mode a faction's displayed reputation is the rank-weighted
//! mean of its members' reputations plus one unit-weight contributor for
//! the unaffiliated party. In manual mode it is the stored value.
//!
//! Everything here is a pure function of its inputs; callers compute the
//! value before and after a mutation and compare.

use crate::faction::{Faction, Member};
use crate::ranks::{rank_at, Rank};

/// Lowest legal reputation.
pub const REPUTATION_MIN: i32 = -100;
/// Highest legal reputation.
pub const REPUTATION_MAX: i32 = 100;

/// Round half up, matching the host's `Math.round` (`-2.5` rounds to `-2`).
#[must_use]
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Clamp any integer into `[REPUTATION_MIN, REPUTATION_MAX]`.
#[must_use]
pub fn clamp_reputation(value: i64) -> i32 {
    // The clamp bounds fit in i32, so the narrowing cast is lossless.
    #[allow(clippy::cast_possible_truncation)]
    let clamped = value.clamp(i64::from(REPUTATION_MIN), i64::from(REPUTATION_MAX)) as i32;
    clamped
}

/// Rank-weighted reputation over `members`, plus `party` at weight `1.0`.
///
/// A member whose rank index is outside `ranks` weighs `1.0`. Returns `0`
/// when the total weight is not positive (possible only with negative
/// modifiers).
#[must_use]
pub fn weighted_reputation(ranks: &[Rank], members: &[Member], party: i32) -> i32 {
    let mut total_weighted = f64::from(party);
    let mut total_weight = 1.0;

    for member in members {
        let weight = rank_at(ranks, member.rank).weight();
        total_weighted += f64::from(member.reputation) * weight;
        total_weight += weight;
    }

    if total_weight <= 0.0 {
        return 0;
    }

    let mean = round_half_up(total_weighted / total_weight);
    if !mean.is_finite() {
        return 0;
    }
    // Finite and already rounded; clamp before narrowing.
    #[allow(clippy::cast_possible_truncation)]
    let mean = mean.clamp(f64::from(REPUTATION_MIN), f64::from(REPUTATION_MAX)) as i64;
    clamp_reputation(mean)
}

/// The reputation the faction currently shows.
///
/// Derived from members and party reputation when `auto_calc` is set,
/// otherwise the stored `reputation`.
#[must_use]
pub fn effective_reputation(faction: &Faction) -> i32 {
    if faction.auto_calc {
        weighted_reputation(&faction.ranks, &faction.members, faction.party_reputation)
    } else {
        clamp_reputation(i64::from(faction.reputation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActorId, MemberKind};

    fn member(id: &str, rank: usize, reputation: i32) -> Member {
        let mut m = Member::new(ActorId::from(id), id, MemberKind::Player);
        m.rank = rank;
        m.reputation = reputation;
        m
    }

    #[test]
    fn clamp_is_idempotent() {
        for v in [-1_000, -101, -100, 0, 57, 100, 101, 9_999] {
            let once = clamp_reputation(v);
            assert_eq!(clamp_reputation(i64::from(once)), once);
        }
        assert_eq!(clamp_reputation(i64::MIN), -100);
        assert_eq!(clamp_reputation(i64::MAX), 100);
    }

    #[test]
    fn rounding_matches_host() {
        assert!((round_half_up(2.5) - 3.0).abs() < f64::EPSILON);
        assert!((round_half_up(-2.5) - -2.0).abs() < f64::EPSILON);
        assert!((round_half_up(26.666) - 27.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_roster_and_neutral_party_is_zero() {
        assert_eq!(weighted_reputation(&[], &[], 0), 0);
    }

    #[test]
    fn party_alone_is_its_own_mean() {
        assert_eq!(weighted_reputation(&[], &[], -35), -35);
    }

    #[test]
    fn single_heavy_member() {
        let ranks = vec![Rank::new("Champion", 0, 2.0)];
        let members = vec![member("a", 0, 40)];
        // (40*2 + 0*1) / 3 = 26.67
        assert_eq!(weighted_reputation(&ranks, &members, 0), 27);
    }

    #[test]
    fn out_of_range_rank_weighs_one() {
        let ranks = vec![Rank::new("Only", 0, 5.0)];
        let members = vec![member("a", 3, 60)];
        assert_eq!(weighted_reputation(&ranks, &members, 0), 30);
    }

    #[test]
    fn non_positive_weight_yields_zero() {
        let ranks = vec![Rank::new("Cursed", 0, -1.0)];
        let members = vec![member("a", 0, 80)];
        assert_eq!(weighted_reputation(&ranks, &members, 50), 0);
    }

    #[test]
    fn effective_follows_mode() {
        let mut faction = Faction::new("Guild").with_ranks(vec![Rank::new("Rank", 0, 1.0)]);
        faction.reputation = 45;
        faction.members.push(member("a", 0, -20));
        assert_eq!(effective_reputation(&faction), 45);

        faction.auto_calc = true;
        faction.party_reputation = 0;
        assert_eq!(effective_reputation(&faction), -10);
        assert_eq!(effective_reputation(&faction), -10);
    }
}
