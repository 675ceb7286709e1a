//! # intoterica-host: virtual-tabletop integration for Intoterica
//!
//! Connects the host-agnostic `intoterica-core` engine to a multi-user
//! tabletop session.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  dispatch   ┌──────────────┐   commands   ┌───────────────────┐
//! │ Player       │ ──────────▶ │ GM session   │ ───────────▶ │ FactionAuthority  │
//! │ session      │             │ (writer)     │  (mpsc)      │ (single writer)   │
//! └──────▲───────┘             └──────▲───────┘              └─────────┬─────────┘
//!        │          update            │                                │ save
//!        └────────────────────────────┴──── LocalSocket ◀──────────────┤
//!                                                                      ▼
//!                                                           ┌───────────────────┐
//!                                                           │ FactionStore      │
//!                                                           └───────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `roles`: users, role levels and the faction-management threshold
//! - `command`: every write a session can request
//! - `socket`: `update`/`dispatch` messages and the in-process channel
//! - `actors`: the actor registry the engine reads names and ownership from
//! - `authority`: the single writer and its command queue
//! - `session`: per-user read cache and write routing
//! - `chat`: chat-log notification sink
//! - `config`: host configuration layered over the core sections
//! - `telemetry`: tracing subscriber setup

pub mod actors;
pub mod authority;
pub mod chat;
pub mod command;
pub mod config;
pub mod error;
pub mod roles;
pub mod session;
pub mod socket;
pub mod telemetry;

pub use authority::{CommandOutcome, FactionAuthority, WriterHandle};
pub use command::FactionCommand;
pub use config::HostConfig;
pub use error::HostError;
pub use roles::{Role, User, UserId};
pub use session::{RequestOutcome, Session};
pub use socket::{Envelope, LocalSocket, SocketMessage};
