//! Socket messages on the `module.intoterica` channel.
//!
//! Two message kinds travel between sessions:
//!
//! - `{"type": "update", "action"?: ...}`: the store changed, re-read it.
//! - `{"type": "dispatch", "action": ..., "payload": {...}}`: a write a
//!   non-privileged session wants the Game Master session to perform.
//!
//! [`LocalSocket`] is an in-process fan-out over a tokio broadcast
//! channel; the real host transport plugs in behind the same envelope.

use intoterica_core::ports::{Broadcaster, StoreEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::command::FactionCommand;
use crate::error::{HostError, Result};
use crate::roles::UserId;

/// Channel name used by the host's socket.
pub const CHANNEL: &str = "module.intoterica";

/// Payload of one socket message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SocketMessage {
    /// The shared store changed.
    Update {
        /// What caused the change, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<String>,
    },
    /// A routed write request.
    Dispatch {
        /// The command, flattened to `action` + `payload`.
        #[serde(flatten)]
        command: FactionCommand,
    },
}

impl From<StoreEvent> for SocketMessage {
    fn from(event: StoreEvent) -> Self {
        Self::Update {
            action: event.action,
        }
    }
}

/// A message plus the user who sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sending user.
    pub sender: UserId,
    /// The message.
    pub message: SocketMessage,
}

/// In-process socket: every subscriber sees every envelope.
#[derive(Debug, Clone)]
pub struct LocalSocket {
    tx: broadcast::Sender<Envelope>,
}

impl LocalSocket {
    /// Create a socket buffering `capacity` messages per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future envelopes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// A sending handle bound to one user.
    #[must_use]
    pub fn handle(&self, sender: UserId) -> SocketHandle {
        SocketHandle {
            sender,
            tx: self.tx.clone(),
        }
    }
}

/// A user's end of the socket.
#[derive(Debug, Clone)]
pub struct SocketHandle {
    sender: UserId,
    tx: broadcast::Sender<Envelope>,
}

impl SocketHandle {
    /// The user this handle sends as.
    #[must_use]
    pub fn sender(&self) -> &UserId {
        &self.sender
    }

    /// Emit a message.
    ///
    /// # Errors
    /// Returns [`HostError::Socket`] if nobody is listening.
    pub fn emit(&self, message: SocketMessage) -> Result<()> {
        let envelope = Envelope {
            sender: self.sender.clone(),
            message,
        };
        self.tx
            .send(envelope)
            .map(|receivers| debug!(sender = %self.sender, receivers, "Socket message sent"))
            .map_err(|_| HostError::Socket(format!("no subscribers on {CHANNEL}")))
    }

    /// Route a command to the Game Master session.
    ///
    /// # Errors
    /// Returns [`HostError::Socket`] if nobody is listening.
    pub fn dispatch(&self, command: FactionCommand) -> Result<()> {
        self.emit(SocketMessage::Dispatch { command })
    }
}

impl Broadcaster for SocketHandle {
    fn broadcast(&self, event: StoreEvent) {
        if let Err(e) = self.emit(event.into()) {
            warn!(error = %e, "Update broadcast dropped");
        }
    }
}
