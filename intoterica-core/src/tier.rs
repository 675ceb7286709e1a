//! Reputation tiers: named bands with display and gameplay attributes.
//!
//! The ladder is checked top to bottom and the first match wins. Negative
//! boundaries are inclusive (`<=`), positive boundaries exclusive (`<`):
//! `-80` is Nemesis but `80` is the upper Devoted band.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named reputation band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReputationTier {
    /// `rep <= -80`
    Nemesis,
    /// `rep <= -50`
    Hostile,
    /// `rep <= -30`
    Unfriendly,
    /// `rep <= -10`
    Wary,
    /// `rep < 10`
    Neutral,
    /// `rep < 30`
    Friendly,
    /// `rep < 50`
    Allied,
    /// `rep < 80`
    Devoted,
    /// Everything above; shares the "Devoted" label with its own face.
    DevotedApex,
}

impl ReputationTier {
    /// Every tier, lowest first.
    pub const ALL: [Self; 9] = [
        Self::Nemesis,
        Self::Hostile,
        Self::Unfriendly,
        Self::Wary,
        Self::Neutral,
        Self::Friendly,
        Self::Allied,
        Self::Devoted,
        Self::DevotedApex,
    ];

    /// Classify a reputation value. Total over all integers.
    #[must_use]
    pub fn classify(reputation: i32) -> Self {
        match reputation {
            r if r <= -80 => Self::Nemesis,
            r if r <= -50 => Self::Hostile,
            r if r <= -30 => Self::Unfriendly,
            r if r <= -10 => Self::Wary,
            r if r < 10 => Self::Neutral,
            r if r < 30 => Self::Friendly,
            r if r < 50 => Self::Allied,
            r if r < 80 => Self::Devoted,
            _ => Self::DevotedApex,
        }
    }

    /// Display label. Change notifications compare labels, not variants.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Nemesis => "Nemesis",
            Self::Hostile => "Hostile",
            Self::Unfriendly => "Unfriendly",
            Self::Wary => "Wary",
            Self::Neutral => "Neutral",
            Self::Friendly => "Friendly",
            Self::Allied => "Allied",
            Self::Devoted | Self::DevotedApex => "Devoted",
        }
    }

    /// CSS class used by the faction card.
    #[must_use]
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Nemesis => "rep-tier-nemesis",
            Self::Hostile => "rep-tier-hostile",
            Self::Unfriendly => "rep-tier-unfriendly",
            Self::Wary => "rep-tier-wary",
            Self::Neutral => "rep-tier-neutral",
            Self::Friendly => "rep-tier-friendly",
            Self::Allied => "rep-tier-allied",
            Self::Devoted | Self::DevotedApex => "rep-tier-devoted",
        }
    }

    /// Face emoji shown next to the value.
    #[must_use]
    pub fn face(self) -> &'static str {
        match self {
            Self::Nemesis => "👿",
            Self::Hostile => "😠",
            Self::Unfriendly => "😒",
            Self::Wary => "😕",
            Self::Neutral => "😐",
            Self::Friendly => "🙂",
            Self::Allied => "😃",
            Self::Devoted => "😇",
            Self::DevotedApex => "🧞",
        }
    }

    /// Multiplier applied to XP awarded by a faction at this standing.
    #[must_use]
    pub fn xp_modifier(self) -> f64 {
        match self {
            Self::Nemesis => 0.5,
            Self::Hostile => 0.75,
            Self::Unfriendly => 0.9,
            Self::Wary | Self::Neutral => 1.0,
            Self::Friendly => 1.1,
            Self::Allied => 1.25,
            Self::Devoted | Self::DevotedApex => 1.5,
        }
    }

    /// Hex display color.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Nemesis => "#8b0000",
            Self::Hostile => "#ff4500",
            Self::Unfriendly => "#ffd700",
            Self::Wary => "#f5f5dc",
            Self::Neutral => "#ffffff",
            Self::Friendly => "#98fb98",
            Self::Allied => "#00ff00",
            Self::Devoted | Self::DevotedApex => "#00bfff",
        }
    }

    /// Whether moving from `self` to `other` changes the displayed label.
    #[must_use]
    pub fn label_differs(self, other: Self) -> bool {
        self.label() != other.label()
    }
}

impl fmt::Display for ReputationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
