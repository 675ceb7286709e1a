//! End-to-end tests for write routing through the Game Master session.

use std::sync::Arc;
use std::time::Duration;

use intoterica_core::metrics::EngineCounters;
use intoterica_core::persistence::{MemoryWorldStore, SqliteWorldStore, WorldData};
use intoterica_core::ports::FactionStore;
use intoterica_core::roster::FactionDraft;
use intoterica_core::types::{ActorId, FactionId};
use intoterica_core::view::faction_views;
use intoterica_core::Rank;
use intoterica_host::actors::ActorRegistry;
use intoterica_host::chat::ChatLog;
use intoterica_host::roles::UserDirectory;
use intoterica_host::socket::SocketHandle;
use intoterica_host::{
    CommandOutcome, FactionAuthority, FactionCommand, HostConfig, LocalSocket, RequestOutcome, Role,
    Session, SocketMessage, User, UserId, WriterHandle,
};
use serde_json::json;

struct World<S> {
    socket: LocalSocket,
    store: Arc<S>,
    chat: Arc<ChatLog>,
    users: Arc<UserDirectory>,
    writer: WriterHandle,
    counters: Arc<EngineCounters>,
}

fn world_with<S: FactionStore + 'static>(config: &HostConfig, store: Arc<S>) -> World<S> {
    let socket = LocalSocket::new(config.dispatch.broadcast_capacity);
    let chat = Arc::new(ChatLog::new(config.engine.notifications.clone()));

    let users = Arc::new(UserDirectory::new());
    for (id, role, character) in [
        ("gm", Role::GameMaster, None),
        ("ada", Role::AssistantGm, None),
        ("pat", Role::Player, Some("pat-char")),
        ("quin", Role::TrustedPlayer, Some("quin-char")),
    ] {
        users.upsert(User {
            id: UserId::from(id),
            name: id.to_string(),
            role,
            character: character.map(ActorId::from),
        });
    }

    let actors = Arc::new(ActorRegistry::new());
    actors.insert(ActorId::from("pat-char"), "Pat", true);
    actors.insert(ActorId::from("quin-char"), "Quin", true);
    actors.insert(ActorId::from("ash"), "Brother Ash", false);

    let authority: FactionAuthority<S, ChatLog, SocketHandle, ActorRegistry> = FactionAuthority::new(
        Arc::clone(&store),
        Arc::clone(&chat),
        socket.handle(UserId::from("gm")),
        actors,
        Arc::clone(&users),
        config.permissions,
    );
    let counters = authority.counters();
    let writer = authority.spawn(config.dispatch.queue_capacity);

    World {
        socket,
        store,
        chat,
        users,
        writer,
        counters,
    }
}

fn world(config: &HostConfig) -> World<MemoryWorldStore> {
    world_with(config, Arc::new(MemoryWorldStore::new()))
}

impl<S: FactionStore + 'static> World<S> {
    fn session(&self, user: &str) -> Session<S> {
        let user = self.users.get(&UserId::from(user)).expect("known user");
        Session::open(user, &self.socket, Arc::clone(&self.store))
            .expect("open session")
            .with_writer(self.writer.clone())
    }

    async fn gm(&self, command: FactionCommand) -> CommandOutcome {
        self.writer
            .submit(UserId::from("gm"), command)
            .await
            .expect("submit")
    }

    async fn create_guild(&self) -> FactionId {
        let outcome = self
            .gm(FactionCommand::CreateFaction(FactionDraft {
                name: "Guild".into(),
                allow_enlistment: true,
                ranks: vec![Rank::new("Initiate", 0, 1.0), Rank::new("Member", 100, 1.2)],
                ..FactionDraft::default()
            }))
            .await;
        assert!(outcome.is_applied());
        self.store.load_factions().expect("load")[0].id.clone()
    }
}

fn enlist(faction: &FactionId, actor: &str) -> FactionCommand {
    FactionCommand::EnlistFaction {
        faction_id: faction.clone(),
        actor_id: ActorId::from(actor),
    }
}

async fn wait_for(mut ready: impl FnMut() -> bool) {
    for _ in 0..200 {
        if ready() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn player_request_is_routed_and_applied_by_gm() {
    let w = world(&HostConfig::default());
    let guild = w.create_guild().await;
    let mut rx = w.socket.subscribe();
    let gm = w.session("gm");
    let pat = w.session("pat");
    assert!(gm.is_writer());
    assert!(!pat.is_writer());

    let routed = pat.request(enlist(&guild, "pat-char")).await.expect("request");
    assert_eq!(routed, RequestOutcome::Routed);
    assert!(w.store.load_factions().expect("load")[0].members.is_empty());

    let dispatch = rx.recv().await.expect("dispatch");
    assert_eq!(dispatch.sender, UserId::from("pat"));
    let relayed = gm.handle(dispatch).await.expect("relay");
    assert!(relayed.expect("gm relays dispatches").is_applied());

    let update = rx.recv().await.expect("update");
    assert_eq!(
        update.message,
        SocketMessage::Update {
            action: Some("enlistFaction".into())
        }
    );
    assert!(pat.memberships().is_empty());
    pat.handle(update).await.expect("refresh");

    let memberships = pat.memberships();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].rank_name, "Initiate");
    assert_eq!(gm.factions()[0].members[0].name, "Pat");
}

#[tokio::test]
async fn sessions_converge_through_run_loops() {
    let w = world(&HostConfig::default());
    let guild = w.create_guild().await;
    let gm = Arc::new(w.session("gm"));
    let pat = Arc::new(w.session("pat"));

    for session in [Arc::clone(&gm), Arc::clone(&pat)] {
        let rx = w.socket.subscribe();
        tokio::spawn(async move { session.run(rx).await });
    }

    pat.request(enlist(&guild, "pat-char")).await.expect("request");
    wait_for(|| !pat.memberships().is_empty()).await;

    let outcome = gm
        .request(FactionCommand::AdjustReputation {
            faction_id: guild.clone(),
            delta: 12,
        })
        .await
        .expect("request");
    assert_eq!(
        outcome,
        RequestOutcome::Applied(CommandOutcome::Applied { notifications: 2 })
    );
    wait_for(|| pat.factions()[0].reputation == 12).await;

    let status = pat.with_book(|book, viewer| faction_views(book, viewer)[0].status_label);
    assert_eq!(status, "Friendly");
}

#[tokio::test]
async fn enlistment_refused_for_auto_calc_and_duplicates() {
    let w = world(&HostConfig::default());
    let guild = w.create_guild().await;
    let pat = UserId::from("pat");

    w.gm(FactionCommand::SetAutoCalc {
        faction_id: guild.clone(),
        auto_calc: true,
    })
    .await;
    let refused = w.writer.submit(pat.clone(), enlist(&guild, "pat-char")).await.expect("submit");
    assert_eq!(
        refused,
        CommandOutcome::Rejected {
            reason: "faction reputation is auto-calculated".into()
        }
    );

    w.gm(FactionCommand::SetAutoCalc {
        faction_id: guild.clone(),
        auto_calc: false,
    })
    .await;
    assert!(w
        .writer
        .submit(pat.clone(), enlist(&guild, "pat-char"))
        .await
        .expect("submit")
        .is_applied());
    let duplicate = w.writer.submit(pat, enlist(&guild, "pat-char")).await.expect("submit");
    assert_eq!(
        duplicate,
        CommandOutcome::Rejected {
            reason: "already a member".into()
        }
    );
    assert_eq!(w.store.load_factions().expect("load")[0].members.len(), 1);
}

#[tokio::test]
async fn commands_below_threshold_are_rejected() {
    let strict = HostConfig::from_toml("[permissions]\nmanage_factions = 4\n").expect("config");
    let w = world(&strict);
    let guild = w.create_guild().await;
    let bump = FactionCommand::AdjustReputation {
        faction_id: guild.clone(),
        delta: 5,
    };

    let outcome = w.writer.submit(UserId::from("ada"), bump.clone()).await.expect("submit");
    assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
    let outcome = w.writer.submit(UserId::from("quin"), bump.clone()).await.expect("submit");
    assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
    let outcome = w.writer.submit(UserId::from("stranger"), bump).await.expect("submit");
    assert_eq!(
        outcome,
        CommandOutcome::Rejected {
            reason: "unknown user".into()
        }
    );
    assert_eq!(w.store.load_factions().expect("load")[0].reputation, 0);

    let relaxed = world(&HostConfig::default());
    let guild = relaxed.create_guild().await;
    let outcome = relaxed
        .writer
        .submit(
            UserId::from("ada"),
            FactionCommand::AdjustReputation {
                faction_id: guild,
                delta: 5,
            },
        )
        .await
        .expect("submit");
    assert!(outcome.is_applied());
}

#[tokio::test]
async fn chat_follows_notification_settings() {
    let config = HostConfig::from_toml("[notifications]\nreputation_changes = false\n").expect("config");
    let w = world(&config);
    let guild = w.create_guild().await;

    w.gm(FactionCommand::AddMember {
        faction_id: guild.clone(),
        actor_id: ActorId::from("pat-char"),
        rank: 0,
    })
    .await;
    w.gm(FactionCommand::AdjustReputation {
        faction_id: guild.clone(),
        delta: 35,
    })
    .await;
    w.gm(FactionCommand::AwardXp {
        faction_id: guild,
        amount: 100,
        member_ids: vec![ActorId::from("pat-char"), ActorId::from("pat-char")],
    })
    .await;

    assert_eq!(
        w.chat.messages(),
        vec![
            "Guild is now Allied 😃 (was Neutral)".to_string(),
            "Faction Update: Guild\nXP Modifier: x1.25 (Allied)\n- Pat: +125 XP (Promoted to Member!)"
                .to_string(),
        ]
    );

    let snapshot = w.counters.snapshot();
    assert_eq!(snapshot.xp_awarded, 125);
    assert_eq!(snapshot.promotions, 1);
    assert!(snapshot
        .to_prometheus()
        .contains("intoterica_commands_total{outcome=\"applied\"} 4"));
}

#[tokio::test]
async fn stale_ids_change_nothing() {
    let w = world(&HostConfig::default());
    w.create_guild().await;
    let ghost = FactionId::from("ghost");

    for command in [
        FactionCommand::DeleteFaction {
            faction_id: ghost.clone(),
        },
        FactionCommand::SetMemberReputation {
            faction_id: ghost.clone(),
            member_id: ActorId::from("pat-char"),
            value: 40,
        },
        enlist(&ghost, "pat-char"),
    ] {
        assert_eq!(w.gm(command).await, CommandOutcome::Unchanged);
    }
    assert_eq!(w.store.save_count(), 1);
    assert_eq!(w.counters.snapshot().commands_unchanged, 3);
}

#[tokio::test]
async fn sqlite_world_keeps_foreign_sections() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = HostConfig::default();
    let store = SqliteWorldStore::open(dir.path().join("world.db"), &config.engine.persistence)
        .expect("open");
    let mut seeded = WorldData::default();
    seeded
        .other
        .insert("quests".into(), json!([{"title": "Find the bell"}]));
    store.save_world(&seeded).expect("seed");

    let w = world_with(&config, Arc::new(store));
    let guild = w.create_guild().await;
    w.gm(FactionCommand::AddMember {
        faction_id: guild.clone(),
        actor_id: ActorId::from("ash"),
        rank: 5,
    })
    .await;

    let world = w.store.load_world().expect("load");
    assert_eq!(world.other["quests"][0]["title"], "Find the bell");
    let member = &world.factions[0].members[0];
    assert_eq!(member.name, "Brother Ash");
    assert_eq!(member.rank, 1);
    assert!(w.store.integrity_check().expect("check"));
}

#[tokio::test]
async fn only_the_gm_session_writes() {
    let w = world(&HostConfig::default());
    let _rx = w.socket.subscribe();
    let quin = w.session("quin");
    assert!(!quin.is_writer());
    let outcome = quin
        .request(FactionCommand::CreateFaction(FactionDraft {
            name: "Rogues".into(),
            ..FactionDraft::default()
        }))
        .await
        .expect("request");
    assert_eq!(outcome, RequestOutcome::Routed);
    assert!(w.store.load_factions().expect("load").is_empty());
}
