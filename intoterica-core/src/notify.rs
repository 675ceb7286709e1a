//! Change notifications.
//!
//! The engine never talks to a chat log directly; callers turn mutation
//! results into [`Notification`]s and hand them to a [`NotificationSink`].

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;

use crate::award::AwardOutcome;
use crate::mutation::{MemberReputationChange, ReputationChange};
use crate::tier::ReputationTier;

/// Something participants should be told about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notification {
    /// A faction's displayed reputation moved.
    FactionReputation {
        /// Faction display name.
        faction: String,
        /// Before/after values.
        change: ReputationChange,
    },
    /// One member's standing moved.
    MemberReputation {
        /// Faction display name.
        faction: String,
        /// Member display name.
        member: String,
        /// Before/after values.
        change: ReputationChange,
    },
    /// A displayed tier label changed.
    TierChanged {
        /// Faction display name.
        faction: String,
        /// Member display name, when the tier belongs to a member.
        member: Option<String>,
        /// Tier before.
        from: ReputationTier,
        /// Tier after.
        to: ReputationTier,
    },
    /// XP was granted to members.
    XpAwarded {
        /// Faction display name.
        faction: String,
        /// Award details.
        outcome: AwardOutcome,
    },
}

fn signed(delta: i32) -> String {
    if delta > 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}

impl Notification {
    /// Notifications for a faction-level change: the value update, plus a
    /// tier change when the label moved.
    #[must_use]
    pub fn for_faction(faction: &str, change: ReputationChange) -> Vec<Self> {
        let mut out = vec![Self::FactionReputation {
            faction: faction.to_string(),
            change,
        }];
        if change.tier_changed() {
            out.push(Self::TierChanged {
                faction: faction.to_string(),
                member: None,
                from: change.old_tier,
                to: change.new_tier,
            });
        }
        out
    }

    /// Notifications for a member change. The member's tier and, in auto
    /// mode, the faction's tier are evaluated independently.
    #[must_use]
    pub fn for_member(faction: &str, member: &str, change: MemberReputationChange) -> Vec<Self> {
        let mut out = vec![Self::MemberReputation {
            faction: faction.to_string(),
            member: member.to_string(),
            change: change.member,
        }];
        if change.member.tier_changed() {
            out.push(Self::TierChanged {
                faction: faction.to_string(),
                member: Some(member.to_string()),
                from: change.member.old_tier,
                to: change.member.new_tier,
            });
        }
        if let Some(faction_change) = change.faction.filter(ReputationChange::tier_changed) {
            out.push(Self::TierChanged {
                faction: faction.to_string(),
                member: None,
                from: faction_change.old_tier,
                to: faction_change.new_tier,
            });
        }
        out
    }

    /// Whether this is a tier-change notification.
    #[must_use]
    pub fn is_tier_change(&self) -> bool {
        matches!(self, Self::TierChanged { .. })
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FactionReputation { faction, change } => write!(
                f,
                "Faction Update: {faction}\nParty Reputation: {} ({})",
                change.new,
                signed(change.delta())
            ),
            Self::MemberReputation {
                faction,
                member,
                change,
            } => write!(
                f,
                "Faction Member Update: {faction}\n{member} Reputation: {} ({})",
                change.new,
                signed(change.delta())
            ),
            Self::TierChanged {
                faction,
                member: Some(member),
                from,
                to,
            } => write!(f, "{member} of {faction} is now {to} {} (was {from})", to.face()),
            Self::TierChanged {
                faction,
                member: None,
                from,
                to,
            } => write!(f, "{faction} is now {to} {} (was {from})", to.face()),
            Self::XpAwarded { faction, outcome } => {
                write!(
                    f,
                    "Faction Update: {faction}\nXP Modifier: x{} ({})",
                    outcome.modifier, outcome.tier
                )?;
                for entry in &outcome.entries {
                    write!(f, "\n- {}", entry.summary())?;
                }
                Ok(())
            }
        }
    }
}

/// Receives notifications produced by committed changes.
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification. Fire-and-forget.
    fn notify(&self, notification: Notification);
}

/// Sink that keeps everything it receives, for inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    received: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything received so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.received.lock())
    }

    /// Number of notifications received and not yet taken.
    #[must_use]
    pub fn len(&self) -> usize {
        self.received.lock().len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.received.lock().is_empty()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.received.lock().push(notification);
    }
}
