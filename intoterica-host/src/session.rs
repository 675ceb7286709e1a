//! Client sessions.
//!
//! Every connected user runs a [`Session`]. All sessions read the shared
//! store; only the Game Master's session holds a [`WriterHandle`]. Other
//! sessions route writes as `dispatch` messages, which the Game Master's
//! session relays to the authority.

use std::sync::Arc;

use intoterica_core::faction::Faction;
use intoterica_core::ports::FactionStore;
use intoterica_core::roster::FactionBook;
use intoterica_core::view::{memberships, Membership, Viewer};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::authority::{CommandOutcome, WriterHandle};
use crate::command::FactionCommand;
use crate::error::Result;
use crate::roles::User;
use crate::socket::{Envelope, LocalSocket, SocketHandle, SocketMessage};

/// How a session satisfied a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Applied by this session's own writer.
    Applied(CommandOutcome),
    /// Sent to the Game Master session for processing.
    Routed,
}

/// One user's connection to the world.
pub struct Session<S> {
    user: User,
    socket: SocketHandle,
    writer: Option<WriterHandle>,
    store: Arc<S>,
    cache: RwLock<FactionBook>,
}

impl<S: FactionStore> Session<S> {
    /// Open a read-only session for `user`.
    ///
    /// # Errors
    /// Returns an error if the initial read of the store fails.
    pub fn open(user: User, socket: &LocalSocket, store: Arc<S>) -> Result<Self> {
        let cache = RwLock::new(FactionBook::new(store.load_factions()?));
        let handle = socket.handle(user.id.clone());
        debug!(user = %user.id, role = %user.role, "Session opened");
        Ok(Self {
            user,
            socket: handle,
            writer: None,
            store,
            cache,
        })
    }

    /// Attach the faction writer. Ignored for anyone but the Game Master.
    #[must_use]
    pub fn with_writer(mut self, writer: WriterHandle) -> Self {
        if self.user.is_gm() {
            self.writer = Some(writer);
        } else {
            warn!(user = %self.user.id, "Writer refused for non-GM session");
        }
        self
    }

    /// The session's user.
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Whether this session commits writes itself.
    #[must_use]
    pub fn is_writer(&self) -> bool {
        self.writer.is_some()
    }

    /// Who is looking, for view preparation.
    #[must_use]
    pub fn viewer(&self) -> Viewer {
        Viewer {
            is_gm: self.user.is_gm(),
            character: self.user.character.clone(),
        }
    }

    /// Ask for a write: applied directly by the writer session, routed to
    /// it from anywhere else.
    ///
    /// # Errors
    /// Returns an error if the writer is gone, the store fails, or the
    /// dispatch cannot be sent.
    pub async fn request(&self, command: FactionCommand) -> Result<RequestOutcome> {
        match &self.writer {
            Some(writer) => {
                let outcome = writer.submit(self.user.id.clone(), command).await?;
                if outcome.is_applied() {
                    self.refresh()?;
                }
                Ok(RequestOutcome::Applied(outcome))
            }
            None => {
                debug!(user = %self.user.id, action = command.action(), "Routing command to GM");
                self.socket.dispatch(command)?;
                Ok(RequestOutcome::Routed)
            }
        }
    }

    /// React to one socket envelope.
    ///
    /// Returns the outcome when this session relayed a dispatched command.
    ///
    /// # Errors
    /// Returns an error if a refresh or relayed command fails.
    pub async fn handle(&self, envelope: Envelope) -> Result<Option<CommandOutcome>> {
        if envelope.sender == self.user.id {
            return Ok(None);
        }
        match envelope.message {
            SocketMessage::Update { action } => {
                debug!(user = %self.user.id, ?action, "Store update received");
                self.refresh()?;
                Ok(None)
            }
            SocketMessage::Dispatch { command } => {
                let Some(writer) = &self.writer else {
                    return Ok(None);
                };
                let action = command.action();
                let outcome = writer.submit(envelope.sender.clone(), command).await?;
                info!(from = %envelope.sender, action, ?outcome, "Relayed dispatched command");
                if outcome.is_applied() {
                    self.refresh()?;
                }
                Ok(Some(outcome))
            }
        }
    }

    /// Process socket traffic until the channel closes.
    ///
    /// A lagged receiver has missed updates, so the cache is re-read.
    pub async fn run(&self, mut rx: broadcast::Receiver<Envelope>) {
        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    if let Err(e) = self.handle(envelope).await {
                        warn!(user = %self.user.id, error = %e, "Socket message failed");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user = %self.user.id, skipped, "Socket receiver lagged, refreshing");
                    if let Err(e) = self.refresh() {
                        warn!(user = %self.user.id, error = %e, "Refresh failed");
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!(user = %self.user.id, "Session socket closed");
    }

    /// Re-read the faction list from the store.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn refresh(&self) -> Result<()> {
        let book = FactionBook::new(self.store.load_factions()?);
        *self.cache.write() = book;
        Ok(())
    }

    /// A copy of the cached faction list.
    #[must_use]
    pub fn factions(&self) -> Vec<Faction> {
        self.cache.read().factions().to_vec()
    }

    /// Run `f` against the cached book and this session's viewer.
    pub fn with_book<R>(&self, f: impl FnOnce(&FactionBook, &Viewer) -> R) -> R {
        let viewer = self.viewer();
        f(&self.cache.read(), &viewer)
    }

    /// Factions the session's character belongs to.
    #[must_use]
    pub fn memberships(&self) -> Vec<Membership> {
        match &self.user.character {
            Some(actor) => memberships(&self.cache.read(), actor),
            None => Vec::new(),
        }
    }
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user.id)
            .field("writer", &self.writer.is_some())
            .finish_non_exhaustive()
    }
}
