//! Engine counters with Prometheus text export.
//!
//! Lock-free `AtomicU64` counters, bumped by whoever commits changes and
//! read on export.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for committed faction activity.
#[derive(Debug)]
pub struct EngineCounters {
    /// Commands committed to the store.
    pub commands_applied: AtomicU64,
    /// Commands that changed nothing (stale ids, equal values).
    pub commands_unchanged: AtomicU64,
    /// Commands refused for lack of permission.
    pub commands_rejected: AtomicU64,
    /// Reputation values written.
    pub reputation_changes: AtomicU64,
    /// Tier label changes observed.
    pub tier_changes: AtomicU64,
    /// Total XP granted across all members.
    pub xp_awarded: AtomicU64,
    /// Rank promotions.
    pub promotions: AtomicU64,
    /// Store writes that failed.
    pub save_failures: AtomicU64,
}

impl EngineCounters {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            commands_applied: AtomicU64::new(0),
            commands_unchanged: AtomicU64::new(0),
            commands_rejected: AtomicU64::new(0),
            reputation_changes: AtomicU64::new(0),
            tier_changes: AtomicU64::new(0),
            xp_awarded: AtomicU64::new(0),
            promotions: AtomicU64::new(0),
            save_failures: AtomicU64::new(0),
        }
    }

    /// Add `n` to a counter.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            commands_applied: self.commands_applied.load(Ordering::Relaxed),
            commands_unchanged: self.commands_unchanged.load(Ordering::Relaxed),
            commands_rejected: self.commands_rejected.load(Ordering::Relaxed),
            reputation_changes: self.reputation_changes.load(Ordering::Relaxed),
            tier_changes: self.tier_changes.load(Ordering::Relaxed),
            xp_awarded: self.xp_awarded.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            save_failures: self.save_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for EngineCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Commands committed.
    pub commands_applied: u64,
    /// Commands with no effect.
    pub commands_unchanged: u64,
    /// Commands refused.
    pub commands_rejected: u64,
    /// Reputation writes.
    pub reputation_changes: u64,
    /// Tier label changes.
    pub tier_changes: u64,
    /// XP granted.
    pub xp_awarded: u64,
    /// Promotions.
    pub promotions: u64,
    /// Failed store writes.
    pub save_failures: u64,
}

impl CounterSnapshot {
    /// Render in Prometheus text exposition format.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP intoterica_commands_total Faction commands by outcome\n\
             # TYPE intoterica_commands_total counter\n\
             intoterica_commands_total{{outcome=\"applied\"}} {}\n\
             intoterica_commands_total{{outcome=\"unchanged\"}} {}\n\
             intoterica_commands_total{{outcome=\"rejected\"}} {}\n\
             # HELP intoterica_reputation_changes_total Reputation values written\n\
             # TYPE intoterica_reputation_changes_total counter\n\
             intoterica_reputation_changes_total {}\n\
             # HELP intoterica_tier_changes_total Tier label changes\n\
             # TYPE intoterica_tier_changes_total counter\n\
             intoterica_tier_changes_total {}\n\
             # HELP intoterica_xp_awarded_total XP granted to members\n\
             # TYPE intoterica_xp_awarded_total counter\n\
             intoterica_xp_awarded_total {}\n\
             # HELP intoterica_promotions_total Rank promotions\n\
             # TYPE intoterica_promotions_total counter\n\
             intoterica_promotions_total {}\n\
             # HELP intoterica_save_failures_total Failed store writes\n\
             # TYPE intoterica_save_failures_total counter\n\
             intoterica_save_failures_total {}\n",
            self.commands_applied,
            self.commands_unchanged,
            self.commands_rejected,
            self.reputation_changes,
            self.tier_changes,
            self.xp_awarded,
            self.promotions,
            self.save_failures,
        )
    }
}
