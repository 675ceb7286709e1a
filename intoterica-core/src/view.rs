//! Read-side projections for dashboards and actor profiles.

use serde::Serialize;

use crate::aggregate::effective_reputation;
use crate::faction::Faction;
use crate::roster::FactionBook;
use crate::tier::ReputationTier;
use crate::types::{ActorId, FactionId};

/// Who is looking at the faction list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    /// Whether the viewer holds the Game Master role.
    pub is_gm: bool,
    /// The viewer's assigned character, if any.
    pub character: Option<ActorId>,
}

/// A faction prepared for display to one viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionView<'a> {
    /// The underlying faction.
    pub faction: &'a Faction,
    /// Reputation as participants see it.
    pub reputation: i32,
    /// Tier for that reputation.
    pub tier: ReputationTier,
    /// Tier label.
    pub status_label: &'static str,
    /// XP multiplier at this standing.
    pub xp_mod: f64,
    /// Whether the viewer may enlist their character.
    pub can_enlist: bool,
}

impl<'a> FactionView<'a> {
    /// Prepare `faction` for `viewer`.
    #[must_use]
    pub fn new(faction: &'a Faction, viewer: &Viewer) -> Self {
        let reputation = effective_reputation(faction);
        let tier = ReputationTier::classify(reputation);
        Self {
            faction,
            reputation,
            tier,
            status_label: tier.label(),
            xp_mod: tier.xp_modifier(),
            can_enlist: can_enlist(faction, viewer),
        }
    }
}

/// Whether `viewer` may self-enlist in `faction`.
///
/// Requires a non-GM viewer with a character that is not yet a member, and
/// a manual-mode faction that accepts enlistment.
#[must_use]
pub fn can_enlist(faction: &Faction, viewer: &Viewer) -> bool {
    if viewer.is_gm || faction.auto_calc || !faction.allow_enlistment {
        return false;
    }
    viewer
        .character
        .as_ref()
        .is_some_and(|actor| !faction.is_member(actor))
}

/// Prepare every faction in the book for one viewer.
#[must_use]
pub fn faction_views<'a>(book: &'a FactionBook, viewer: &Viewer) -> Vec<FactionView<'a>> {
    book.factions()
        .iter()
        .map(|f| FactionView::new(f, viewer))
        .collect()
}

/// One line of an actor's faction affiliations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    /// Faction the actor belongs to.
    pub faction_id: FactionId,
    /// Faction display name.
    pub faction_name: String,
    /// Name of the rank the actor holds; empty if the index is stale.
    pub rank_name: String,
    /// The actor's XP in that faction.
    pub xp: u64,
}

/// Every faction the actor belongs to, in book order.
#[must_use]
pub fn memberships(book: &FactionBook, actor: &ActorId) -> Vec<Membership> {
    book.factions()
        .iter()
        .filter_map(|faction| {
            let member = faction.member(actor)?;
            Some(Membership {
                faction_id: faction.id.clone(),
                faction_name: faction.name.clone(),
                rank_name: faction.rank_name(member).unwrap_or_default().to_string(),
                xp: member.xp,
            })
        })
        .collect()
}
