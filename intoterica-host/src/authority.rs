//! The single faction writer.
//!
//! Exactly one [`FactionAuthority`] exists per world, owned by the Game
//! Master session. It takes commands one at a time from a bounded queue,
//! loads the faction list fresh for each, applies the command, and on a
//! real change saves, broadcasts an `update` and hands notifications to
//! the sink. Commands from every session land in the same queue, so
//! deltas always apply to the latest stored state in arrival order.
//!
//! The store is synchronous (SQLite), so the writer loop runs on a
//! blocking task and callers await a oneshot reply.

use std::sync::Arc;

use intoterica_core::metrics::EngineCounters;
use intoterica_core::notify::{Notification, NotificationSink};
use intoterica_core::ports::{ActorDirectory, Broadcaster, FactionStore, StoreEvent};
use intoterica_core::roster::{EnlistRefusal, FactionBook};
use intoterica_core::types::MemberKind;
use intoterica_core::{adjust_reputation, award_xp, set_member_reputation, set_reputation};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::command::FactionCommand;
use crate::error::{HostError, Result};
use crate::roles::{PermissionConfig, User, UserDirectory, UserId};

/// What happened to one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CommandOutcome {
    /// The store was rewritten.
    Applied {
        /// Notifications handed to the sink.
        notifications: usize,
    },
    /// Valid command, nothing to change (stale id, equal value).
    Unchanged,
    /// The requester may not do this, or the faction refused it.
    Rejected {
        /// Why.
        reason: String,
    },
}

impl CommandOutcome {
    /// Whether the store was written.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Result of running a command against a loaded book.
enum Effect {
    Changed(Vec<Notification>),
    Unchanged,
    Refused(String),
}

impl Effect {
    fn changed_if(changed: bool) -> Self {
        if changed { Self::Changed(Vec::new()) } else { Self::Unchanged }
    }
}

impl From<Option<Vec<Notification>>> for Effect {
    fn from(notes: Option<Vec<Notification>>) -> Self {
        notes.map_or(Self::Unchanged, Self::Changed)
    }
}

/// The world's only faction writer.
pub struct FactionAuthority<S, N, B, A> {
    store: Arc<S>,
    sink: Arc<N>,
    broadcaster: B,
    actors: Arc<A>,
    users: Arc<UserDirectory>,
    permissions: PermissionConfig,
    counters: Arc<EngineCounters>,
}

impl<S, N, B, A> FactionAuthority<S, N, B, A>
where
    S: FactionStore,
    N: NotificationSink,
    B: Broadcaster,
    A: ActorDirectory,
{
    /// Assemble an authority from its ports.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        sink: Arc<N>,
        broadcaster: B,
        actors: Arc<A>,
        users: Arc<UserDirectory>,
        permissions: PermissionConfig,
    ) -> Self {
        Self {
            store,
            sink,
            broadcaster,
            actors,
            users,
            permissions,
            counters: Arc::new(EngineCounters::new()),
        }
    }

    /// Shared counters, for export.
    #[must_use]
    pub fn counters(&self) -> Arc<EngineCounters> {
        Arc::clone(&self.counters)
    }

    /// Validate and apply one command on behalf of `requester`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written. Permission
    /// problems are not errors; they come back as
    /// [`CommandOutcome::Rejected`].
    pub fn apply(&self, requester: &UserId, command: FactionCommand) -> Result<CommandOutcome> {
        let action = command.action();
        let Some(user) = self.users.get(requester) else {
            return Ok(self.reject(requester, action, "unknown user".to_string()));
        };
        if let Some(reason) = self.authorize(&user, &command) {
            return Ok(self.reject(requester, action, reason));
        }

        let mut book = FactionBook::new(self.store.load_factions()?);
        let notes = match self.execute(&mut book, command) {
            Effect::Changed(notes) => notes,
            Effect::Unchanged => {
                EngineCounters::add(&self.counters.commands_unchanged, 1);
                debug!(user = %requester, action, "Command changed nothing");
                return Ok(CommandOutcome::Unchanged);
            }
            Effect::Refused(reason) => return Ok(self.reject(requester, action, reason)),
        };

        if let Err(e) = self.store.save_factions(book.factions()) {
            EngineCounters::add(&self.counters.save_failures, 1);
            warn!(user = %requester, action, error = %e, "Faction save failed");
            return Err(HostError::Core(e));
        }
        EngineCounters::add(&self.counters.commands_applied, 1);
        info!(user = %requester, action, notifications = notes.len(), "Command applied");

        self.broadcaster.broadcast(StoreEvent::action(action));
        let notifications = notes.len();
        for note in notes {
            self.record(&note);
            self.sink.notify(note);
        }
        Ok(CommandOutcome::Applied { notifications })
    }

    /// Start the writer loop and return the queue handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self, capacity: usize) -> WriterHandle
    where
        S: 'static,
        N: 'static,
        B: 'static,
        A: 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Job>(capacity.max(1));
        tokio::task::spawn_blocking(move || {
            while let Some(job) = rx.blocking_recv() {
                let outcome = self.apply(&job.requester, job.command);
                // The requester may have given up waiting.
                let _ = job.reply.send(outcome);
            }
            debug!("Faction writer stopped");
        });
        WriterHandle { tx }
    }

    fn authorize(&self, user: &User, command: &FactionCommand) -> Option<String> {
        let can_manage = self.permissions.can_manage_factions(user.role);
        if command.requires_manage() && !can_manage {
            return Some(format!(
                "{} requires {}",
                command.action(),
                self.permissions.manage_factions
            ));
        }
        if let FactionCommand::EnlistFaction { actor_id, .. } = command {
            if !can_manage && user.character.as_ref() != Some(actor_id) {
                return Some("players can only enlist their own character".to_string());
            }
        }
        None
    }

    fn reject(&self, requester: &UserId, action: &str, reason: String) -> CommandOutcome {
        EngineCounters::add(&self.counters.commands_rejected, 1);
        warn!(user = %requester, action, %reason, "Command rejected");
        CommandOutcome::Rejected { reason }
    }

    fn record(&self, note: &Notification) {
        match note {
            Notification::FactionReputation { .. } | Notification::MemberReputation { .. } => {
                EngineCounters::add(&self.counters.reputation_changes, 1);
            }
            Notification::TierChanged { .. } => {
                EngineCounters::add(&self.counters.tier_changes, 1);
            }
            Notification::XpAwarded { outcome, .. } => {
                let members = outcome.entries.len() as u64;
                EngineCounters::add(&self.counters.xp_awarded, outcome.final_xp.saturating_mul(members));
                EngineCounters::add(&self.counters.promotions, outcome.promotions() as u64);
            }
        }
    }

    fn execute(&self, book: &mut FactionBook, command: FactionCommand) -> Effect {
        match command {
            FactionCommand::AdjustReputation { faction_id, delta } => book
                .get_mut(&faction_id)
                .and_then(|f| {
                    adjust_reputation(f, delta).map(|c| Notification::for_faction(&f.name, c))
                })
                .into(),
            FactionCommand::SetReputation { faction_id, value } => book
                .get_mut(&faction_id)
                .and_then(|f| {
                    set_reputation(f, value).map(|c| Notification::for_faction(&f.name, c))
                })
                .into(),
            FactionCommand::SetMemberReputation {
                faction_id,
                member_id,
                value,
            } => book
                .get_mut(&faction_id)
                .and_then(|f| {
                    let change = set_member_reputation(f, &member_id, value)?;
                    let member = f.member(&member_id)?.name.clone();
                    Some(Notification::for_member(&f.name, &member, change))
                })
                .into(),
            FactionCommand::AwardXp {
                faction_id,
                amount,
                member_ids,
            } => book
                .get_mut(&faction_id)
                .and_then(|f| {
                    let outcome = award_xp(f, amount, &member_ids)?;
                    Some(vec![Notification::XpAwarded {
                        faction: f.name.clone(),
                        outcome,
                    }])
                })
                .into(),
            FactionCommand::EnlistFaction {
                faction_id,
                actor_id,
            } => {
                let Some(name) = self.actors.actor_name(&actor_id) else {
                    debug!(actor = %actor_id, "Enlistment skipped: unknown actor");
                    return Effect::Unchanged;
                };
                match book.enlist(&faction_id, actor_id, name) {
                    Ok(_) => Effect::Changed(Vec::new()),
                    Err(EnlistRefusal::UnknownFaction) => Effect::Unchanged,
                    Err(refusal) => Effect::Refused(refusal.to_string()),
                }
            }
            FactionCommand::CreateFaction(draft) => {
                book.create(draft);
                Effect::Changed(Vec::new())
            }
            FactionCommand::UpdateFaction { faction_id, edit } => {
                Effect::changed_if(book.update(&faction_id, edit))
            }
            FactionCommand::DeleteFaction { faction_id } => {
                Effect::changed_if(book.delete(&faction_id).is_some())
            }
            FactionCommand::AddMember {
                faction_id,
                actor_id,
                rank,
            } => {
                let Some(name) = self.actors.actor_name(&actor_id) else {
                    debug!(actor = %actor_id, "Add member skipped: unknown actor");
                    return Effect::Unchanged;
                };
                let kind = MemberKind::from_ownership(self.actors.is_player_owned(&actor_id));
                Effect::changed_if(book.add_member(&faction_id, actor_id, name, kind, rank).is_some())
            }
            FactionCommand::RemoveMember {
                faction_id,
                member_id,
            } => Effect::changed_if(book.remove_member(&faction_id, &member_id).is_some()),
            FactionCommand::SetAutoCalc {
                faction_id,
                auto_calc,
            } => Effect::changed_if(book.set_auto_calc(&faction_id, auto_calc)),
            FactionCommand::EditMember {
                faction_id,
                member_id,
                edit,
            } => Effect::changed_if(book.edit_member(&faction_id, &member_id, edit)),
        }
    }
}

struct Job {
    requester: UserId,
    command: FactionCommand,
    reply: oneshot::Sender<Result<CommandOutcome>>,
}

/// Queue handle for submitting commands to a running authority.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<Job>,
}

impl WriterHandle {
    /// Queue a command and wait for its outcome.
    ///
    /// # Errors
    /// Returns [`HostError::WriterClosed`] if the writer loop has stopped,
    /// or the store error the command ran into.
    pub async fn submit(&self, requester: UserId, command: FactionCommand) -> Result<CommandOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Job {
                requester,
                command,
                reply,
            })
            .await
            .map_err(|_| HostError::WriterClosed)?;
        rx.await.map_err(|_| HostError::WriterClosed)?
    }

    /// Whether the writer loop is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl std::fmt::Debug for WriterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::ActorRegistry;
    use crate::roles::Role;
    use intoterica_core::faction::{Faction, Member};
    use intoterica_core::notify::RecordingSink;
    use intoterica_core::persistence::MemoryWorldStore;
    use intoterica_core::roster::FactionDraft;
    use intoterica_core::types::{ActorId, FactionId};
    use intoterica_core::Rank;
    use parking_lot::Mutex;

    #[derive(Clone, Default)]
    struct EventLog(Arc<Mutex<Vec<StoreEvent>>>);

    impl Broadcaster for EventLog {
        fn broadcast(&self, event: StoreEvent) {
            self.0.lock().push(event);
        }
    }

    type TestAuthority = FactionAuthority<MemoryWorldStore, RecordingSink, EventLog, ActorRegistry>;

    struct Fixture {
        authority: TestAuthority,
        store: Arc<MemoryWorldStore>,
        sink: Arc<RecordingSink>,
        events: EventLog,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryWorldStore::new());
        let sink = Arc::new(RecordingSink::new());
        let events = EventLog::default();
        let actors = Arc::new(ActorRegistry::new());
        actors.insert(ActorId::from("hero"), "Mara", true);
        actors.insert(ActorId::from("smith"), "Old Tam", false);

        let users = Arc::new(UserDirectory::new());
        for (id, role, character) in [
            ("gm", Role::GameMaster, None),
            ("p1", Role::Player, Some(ActorId::from("hero"))),
        ] {
            users.upsert(User {
                id: UserId::from(id),
                name: id.to_uppercase(),
                role,
                character,
            });
        }

        let authority = FactionAuthority::new(
            Arc::clone(&store),
            Arc::clone(&sink),
            events.clone(),
            actors,
            users,
            PermissionConfig::default(),
        );
        Fixture {
            authority,
            store,
            sink,
            events,
        }
    }

    fn create_guild(fx: &Fixture) -> FactionId {
        let outcome = fx
            .authority
            .apply(
                &UserId::from("gm"),
                FactionCommand::CreateFaction(FactionDraft {
                    name: "Guild".into(),
                    allow_enlistment: true,
                    ranks: vec![Rank::new("Apprentice", 0, 1.0), Rank::new("Journeyman", 100, 1.5)],
                    ..FactionDraft::default()
                }),
            )
            .expect("apply");
        assert!(outcome.is_applied());
        fx.store.load_factions().expect("load")[0].id.clone()
    }

    #[test]
    fn applied_command_saves_broadcasts_and_notifies() {
        let fx = fixture();
        let guild = create_guild(&fx);
        let outcome = fx
            .authority
            .apply(
                &UserId::from("gm"),
                FactionCommand::AdjustReputation {
                    faction_id: guild.clone(),
                    delta: 15,
                },
            )
            .expect("apply");

        assert_eq!(outcome, CommandOutcome::Applied { notifications: 2 });
        assert_eq!(fx.store.save_count(), 2);
        assert_eq!(
            fx.events.0.lock().last().cloned(),
            Some(StoreEvent::action("adjustReputation"))
        );
        let notes = fx.sink.take();
        assert!(notes[1].is_tier_change());
        assert_eq!(fx.authority.counters().snapshot().tier_changes, 1);
    }

    #[test]
    fn stale_faction_is_unchanged_and_not_saved() {
        let fx = fixture();
        let outcome = fx
            .authority
            .apply(
                &UserId::from("gm"),
                FactionCommand::SetReputation {
                    faction_id: FactionId::from("gone"),
                    value: 40,
                },
            )
            .expect("apply");
        assert_eq!(outcome, CommandOutcome::Unchanged);
        assert_eq!(fx.store.save_count(), 0);
        assert!(fx.events.0.lock().is_empty());
    }

    #[test]
    fn players_cannot_manage() {
        let fx = fixture();
        let guild = create_guild(&fx);
        let outcome = fx
            .authority
            .apply(
                &UserId::from("p1"),
                FactionCommand::DeleteFaction { faction_id: guild },
            )
            .expect("apply");
        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
        assert_eq!(fx.store.load_factions().expect("load").len(), 1);
        assert_eq!(fx.authority.counters().snapshot().commands_rejected, 1);
    }

    #[test]
    fn players_enlist_only_their_own_character() {
        let fx = fixture();
        let guild = create_guild(&fx);
        let other = fx
            .authority
            .apply(
                &UserId::from("p1"),
                FactionCommand::EnlistFaction {
                    faction_id: guild.clone(),
                    actor_id: ActorId::from("smith"),
                },
            )
            .expect("apply");
        assert!(matches!(other, CommandOutcome::Rejected { .. }));

        let own = fx
            .authority
            .apply(
                &UserId::from("p1"),
                FactionCommand::EnlistFaction {
                    faction_id: guild,
                    actor_id: ActorId::from("hero"),
                },
            )
            .expect("apply");
        assert!(own.is_applied());
        let member = &fx.store.load_factions().expect("load")[0].members[0];
        assert_eq!(member.name, "Mara");
        assert_eq!(member.kind, MemberKind::Player);
    }

    #[test]
    fn enlisting_an_unknown_actor_is_unchanged() {
        let fx = fixture();
        let guild = create_guild(&fx);
        let saves = fx.store.save_count();
        let outcome = fx
            .authority
            .apply(
                &UserId::from("gm"),
                FactionCommand::EnlistFaction {
                    faction_id: guild,
                    actor_id: ActorId::from("ghost"),
                },
            )
            .expect("apply");
        assert_eq!(outcome, CommandOutcome::Unchanged);
        assert_eq!(fx.store.save_count(), saves);
        assert!(fx.store.load_factions().expect("load")[0].members.is_empty());
    }

    #[test]
    fn stale_rank_keeps_unit_weight_through_award() {
        let fx = fixture();
        let mut faction = Faction::new("Wardens")
            .with_ranks(vec![Rank::new("Low", 0, 1.0), Rank::new("Top", 0, 4.0)]);
        faction.auto_calc = true;
        let mut member = Member::new(ActorId::from("hero"), "Mara", MemberKind::Player);
        member.rank = 5;
        member.reputation = 40;
        faction.members.push(member);
        let id = faction.id.clone();
        fx.store.save_factions(&[faction]).expect("seed");

        let outcome = fx
            .authority
            .apply(
                &UserId::from("gm"),
                FactionCommand::AwardXp {
                    faction_id: id,
                    amount: 100,
                    member_ids: vec![ActorId::from("hero")],
                },
            )
            .expect("apply");
        assert!(outcome.is_applied());

        let notes = fx.sink.take();
        match notes.last() {
            Some(Notification::XpAwarded { outcome, .. }) => {
                assert!((outcome.modifier - 1.1).abs() < f64::EPSILON);
                assert_eq!(outcome.final_xp, 110);
            }
            other => panic!("unexpected {other:?}"),
        }
        let stored = &fx.store.load_factions().expect("load")[0].members[0];
        assert_eq!((stored.rank, stored.xp), (5, 110));
    }

    #[test]
    fn add_member_takes_kind_from_ownership() {
        let fx = fixture();
        let guild = create_guild(&fx);
        let gm = UserId::from("gm");
        for actor in ["smith", "nobody"] {
            fx.authority
                .apply(
                    &gm,
                    FactionCommand::AddMember {
                        faction_id: guild.clone(),
                        actor_id: ActorId::from(actor),
                        rank: 0,
                    },
                )
                .expect("apply");
        }
        let members = &fx.store.load_factions().expect("load")[0].members;
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].kind, MemberKind::Npc);
        assert_eq!(members[0].name, "Old Tam");
    }

    #[test]
    fn award_counts_xp_and_promotions() {
        let fx = fixture();
        let guild = create_guild(&fx);
        let gm = UserId::from("gm");
        fx.authority
            .apply(
                &gm,
                FactionCommand::AddMember {
                    faction_id: guild.clone(),
                    actor_id: ActorId::from("hero"),
                    rank: 0,
                },
            )
            .expect("apply");
        let outcome = fx
            .authority
            .apply(
                &gm,
                FactionCommand::AwardXp {
                    faction_id: guild,
                    amount: 120,
                    member_ids: vec![ActorId::from("hero")],
                },
            )
            .expect("apply");
        assert_eq!(outcome, CommandOutcome::Applied { notifications: 1 });

        let snapshot = fx.authority.counters().snapshot();
        assert_eq!(snapshot.xp_awarded, 120);
        assert_eq!(snapshot.promotions, 1);
        let member = &fx.store.load_factions().expect("load")[0].members[0];
        assert_eq!((member.xp, member.rank), (120, 1));
    }

    #[tokio::test]
    async fn writer_loop_replies_in_order() {
        let fx = fixture();
        let guild = create_guild(&fx);
        let store = Arc::clone(&fx.store);
        let writer = fx.authority.spawn(4);
        let gm = UserId::from("gm");

        for _ in 0..3 {
            let outcome = writer
                .submit(
                    gm.clone(),
                    FactionCommand::AdjustReputation {
                        faction_id: guild.clone(),
                        delta: 5,
                    },
                )
                .await
                .expect("submit");
            assert!(outcome.is_applied());
        }
        assert_eq!(store.load_factions().expect("load")[0].reputation, 15);
        assert!(!writer.is_closed());
    }
}
