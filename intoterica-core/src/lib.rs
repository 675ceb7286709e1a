//! # Intoterica Core Library
//!
//! Host-agnostic faction reputation and rank-progression engine.
//!
//! A [`Faction`] carries a reputation in `[-100, 100]`, an ordered rank
//! ladder and a member roster. The engine:
//!
//! - **normalizes** legacy and canonical rank tables ([`ranks`])
//! - **aggregates** members' standing into the faction's effective
//!   reputation in auto-calc mode ([`aggregate`])
//! - **classifies** reputation into tiers with XP multipliers ([`tier`])
//! - **awards** XP and promotes members one rank at a time ([`award`])
//! - **mutates** reputation with before/after tier reports ([`mutation`])
//!
//! Everything above is synchronous and free of I/O. Storage and change
//! announcement go through the traits in [`ports`]; [`persistence`]
//! provides a `SQLite` world settings store.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregate;
pub mod award;
pub mod coerce;
pub mod config;
pub mod error;
pub mod faction;
pub mod metrics;
pub mod mutation;
pub mod notify;
pub mod persistence;
pub mod ports;
pub mod ranks;
pub mod roster;
pub mod tier;
pub mod types;
pub mod view;

pub use aggregate::{clamp_reputation, effective_reputation};
pub use award::{award_xp, AwardEntry, AwardOutcome};
pub use config::IntotericaConfig;
pub use error::IntotericaError;
pub use faction::{Faction, Member};
pub use mutation::{adjust_reputation, set_member_reputation, set_reputation, ReputationChange};
pub use notify::{Notification, NotificationSink};
pub use ports::{ActorDirectory, Broadcaster, FactionStore, StoreEvent};
pub use ranks::Rank;
pub use roster::FactionBook;
pub use tier::ReputationTier;
pub use types::*;
