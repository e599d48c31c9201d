//! End-to-end room lifecycle tests: registry, actors, timers, teardown.
//!
//! Time-sensitive tests run with the Tokio clock paused, so sleeps
//! auto-advance instantly and tick deadlines are exact.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use scrawl_protocol::{
    BroadcastEvent, ConnId, Player, PlayerId, RoomCode, RoomOptions,
    RoomSnapshot, StageKind,
};
use scrawl_room::{
    Archive, Broadcast, Retired, RoomError, RoomRegistry,
};
use tokio::sync::mpsc;

#[derive(Default)]
struct RecordingBroadcast {
    events: Mutex<Vec<(RoomCode, BroadcastEvent)>>,
}

impl RecordingBroadcast {
    fn events(&self) -> Vec<(RoomCode, BroadcastEvent)> {
        self.events.lock().unwrap().clone()
    }

    fn update_room_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|(_, e)| matches!(e, BroadcastEvent::UpdateRoom { .. }))
            .count()
    }
}

impl Broadcast for RecordingBroadcast {
    fn join(&self, _code: &RoomCode, _conn: &ConnId) {}

    fn leave(&self, _code: &RoomCode, _conn: &ConnId) {}

    fn emit(&self, code: &RoomCode, event: BroadcastEvent) {
        self.events.lock().unwrap().push((code.clone(), event));
    }

    fn close(&self, _code: &RoomCode) {}
}

#[derive(Default)]
struct RecordingArchive {
    stored: Mutex<Vec<RoomSnapshot>>,
}

impl RecordingArchive {
    fn stored(&self) -> Vec<RoomSnapshot> {
        self.stored.lock().unwrap().clone()
    }
}

impl Archive for RecordingArchive {
    fn store(&self, room: RoomSnapshot) {
        self.stored.lock().unwrap().push(room);
    }
}

struct Fixture {
    registry: RoomRegistry,
    retired_rx: mpsc::UnboundedReceiver<Retired>,
    broadcast: Arc<RecordingBroadcast>,
    archive: Arc<RecordingArchive>,
}

fn fixture() -> Fixture {
    let broadcast = Arc::new(RecordingBroadcast::default());
    let archive = Arc::new(RecordingArchive::default());
    let (registry, retired_rx) =
        RoomRegistry::new(broadcast.clone(), archive.clone());
    Fixture {
        registry,
        retired_rx,
        broadcast,
        archive,
    }
}

fn player(id: &str) -> Player {
    Player {
        id: PlayerId::from(id),
        first_name: format!("First-{id}"),
        last_name: format!("Last-{id}"),
        email: format!("{id}@example.com"),
        conn_id: Some(ConnId::from(&format!("conn-{id}")[..])),
        ready: false,
    }
}

fn options(owner: &str, max_players: usize) -> RoomOptions {
    RoomOptions {
        name: "doodles".into(),
        is_private: false,
        max_players,
        owner: player(owner),
        draw_seconds: 60,
        guess_seconds: 30,
    }
}

fn code(s: &str) -> RoomCode {
    RoomCode::from(s)
}

fn conn(s: &str) -> ConnId {
    ConnId::from(s)
}

#[tokio::test]
async fn test_create_seats_owner_with_creating_connection() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));

    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.code, code("ABCD"));
    assert_eq!(snap.players.len(), 1);
    assert_eq!(snap.owner.id, PlayerId::from("p1"));
    assert_eq!(snap.owner.conn_id, Some(conn("c1")));
    assert!(!snap.has_started);
    assert!(!snap.is_finished);
    assert!(snap.game.is_none());
}

#[tokio::test]
async fn test_join_capacity_and_duplicates() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 2), conn("c1"));

    let snap = handle.join(player("p2")).await.unwrap();
    assert_eq!(snap.players.len(), 2);

    let err = handle.join(player("p3")).await.unwrap_err();
    assert_eq!(err, RoomError::MaxPlayersReached);

    let err = handle.join(player("p2")).await.unwrap_err();
    assert_eq!(err, RoomError::PlayerAlreadyInRoom(PlayerId::from("p2")));

    // Failed joins changed nothing.
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.players.len(), 2);
}

#[tokio::test]
async fn test_join_rejected_after_start() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 8), conn("c1"));
    handle.join(player("p2")).await.unwrap();
    handle.start_game().await.unwrap();

    let err = handle.join(player("p3")).await.unwrap_err();
    assert_eq!(err, RoomError::RoomStarted);
}

#[tokio::test]
async fn test_join_broadcasts_update_room() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));
    handle.join(player("p2")).await.unwrap();

    let events = fx.broadcast.events();
    let (room_code, event) = events.last().unwrap();
    assert_eq!(*room_code, code("ABCD"));
    assert!(matches!(event, BroadcastEvent::UpdateRoom { .. }));
    assert_eq!(event.room().players.len(), 2);
}

#[tokio::test]
async fn test_start_game_builds_one_stage_per_player() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 8), conn("c1"));
    handle.join(player("p2")).await.unwrap();
    handle.join(player("p3")).await.unwrap();

    let snap = handle.start_game().await.unwrap();
    assert!(snap.has_started);

    let game = snap.game.expect("started room has a game");
    assert_eq!(game.stages.len(), 3);

    let first = &game.stages[&game.active_stage];
    assert_eq!(first.kind, StageKind::Draw);
    assert_eq!(first.player.id, PlayerId::from("p1"));
    assert_eq!(first.ttl, 60);
    assert!(first.word.is_some());
}

#[tokio::test]
async fn test_toggle_ready_roundtrip() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));

    let snap = handle.toggle_ready(PlayerId::from("p1")).await.unwrap();
    assert!(snap.players[&PlayerId::from("p1")].ready);

    let snap = handle.toggle_ready(PlayerId::from("p1")).await.unwrap();
    assert!(!snap.players[&PlayerId::from("p1")].ready);

    let err = handle
        .toggle_ready(PlayerId::from("ghost"))
        .await
        .unwrap_err();
    assert_eq!(err, RoomError::PlayerNotFound(PlayerId::from("ghost")));
}

#[tokio::test]
async fn test_buzz_appends_contentless_delivered_entry() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));
    handle.join(player("p2")).await.unwrap();

    let snap = handle
        .send_message(PlayerId::from("p2"), None, true)
        .await
        .unwrap();

    let entry = snap.chat_history.last().unwrap();
    assert_eq!(entry.player_id, PlayerId::from("p2"));
    assert!(entry.message.is_none());
    assert!(entry.buzz);
    assert!(entry.delivered);

    // Chat travels as its own broadcast, not an updateRoom.
    let events = fx.broadcast.events();
    let (_, event) = events.last().unwrap();
    assert!(matches!(event, BroadcastEvent::UpdateChatHistory { .. }));
}

#[tokio::test]
async fn test_chat_preserves_append_order() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));

    for i in 0..5 {
        handle
            .send_message(PlayerId::from("p1"), Some(format!("msg-{i}")), false)
            .await
            .unwrap();
    }

    let snap = handle.snapshot().await.unwrap();
    let messages: Vec<_> = snap
        .chat_history
        .iter()
        .map(|e| e.message.clone().unwrap())
        .collect();
    assert_eq!(messages, vec!["msg-0", "msg-1", "msg-2", "msg-3", "msg-4"]);
}

#[tokio::test]
async fn test_canvas_update_broadcasts_with_drawing_player() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));
    handle.join(player("p2")).await.unwrap();
    handle.start_game().await.unwrap();

    let snap = handle
        .update_canvas(PlayerId::from("p1"), "data:image/png;base64,AAAA".into())
        .await
        .unwrap();
    assert_eq!(snap.canvas.as_deref(), Some("data:image/png;base64,AAAA"));

    let events = fx.broadcast.events();
    let (_, event) = events.last().unwrap();
    match event {
        BroadcastEvent::UpdateRoomCanvas { player_id, room } => {
            assert_eq!(*player_id, PlayerId::from("p1"));
            assert_eq!(
                room.canvas.as_deref(),
                Some("data:image/png;base64,AAAA")
            );
        }
        other => panic!("unexpected broadcast: {other:?}"),
    }
}

#[tokio::test]
async fn test_owner_disconnect_before_start_reassigns_ownership() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));
    handle.join(player("p2")).await.unwrap();
    handle.join(player("p3")).await.unwrap();

    handle.connection_lost(conn("conn-p1")).await;

    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.players.len(), 2);
    assert!(!snap.players.contains_key(&PlayerId::from("p1")));
    // Smallest remaining id takes over.
    assert_eq!(snap.owner.id, PlayerId::from("p2"));
}

#[tokio::test]
async fn test_disconnect_after_start_leaves_roster_untouched() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));
    handle.join(player("p2")).await.unwrap();
    handle.start_game().await.unwrap();

    handle.connection_lost(conn("conn-p2")).await;

    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.players.len(), 2);
    assert!(snap.players.contains_key(&PlayerId::from("p2")));
}

#[tokio::test]
async fn test_explicit_leave_reassigns_owner() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));
    handle.join(player("p2")).await.unwrap();
    handle.join(player("p3")).await.unwrap();

    let snap = handle.leave(PlayerId::from("p1")).await.unwrap().unwrap();
    assert_eq!(snap.players.len(), 2);
    assert_eq!(snap.owner.id, PlayerId::from("p2"));

    let err = handle.leave(PlayerId::from("ghost")).await.unwrap_err();
    assert_eq!(err, RoomError::PlayerNotFound(PlayerId::from("ghost")));
}

#[tokio::test]
async fn test_last_leave_destroys_room() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));

    let snap = handle.leave(PlayerId::from("p1")).await.unwrap();
    assert!(snap.is_none());

    let retired = fx.retired_rx.recv().await.unwrap();
    assert_eq!(retired.code, code("ABCD"));
    assert!(fx.registry.retire(&retired));
    assert!(!fx.registry.contains(&code("ABCD")));

    // The actor is gone; further commands resolve to room-not-found.
    let err = handle.snapshot().await.unwrap_err();
    assert_eq!(err, RoomError::RoomNotFound(code("ABCD")));
}

#[tokio::test]
async fn test_retire_notice_with_stale_instance_is_ignored() {
    let mut fx = fixture();
    fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));

    let stale = Retired {
        code: code("ABCD"),
        instance: u64::MAX,
    };
    assert!(!fx.registry.retire(&stale));
    assert!(fx.registry.contains(&code("ABCD")));
}

#[tokio::test]
async fn test_create_with_existing_code_replaces_room() {
    let mut fx = fixture();
    fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));
    let replacement =
        fx.registry.create(code("ABCD"), options("p9", 4), conn("c9"));

    assert_eq!(fx.registry.room_count(), 1);
    let current = fx.registry.get(&code("ABCD")).unwrap();
    let snap = current.snapshot().await.unwrap();
    assert_eq!(snap.owner.id, PlayerId::from("p9"));
    drop(replacement);
}

#[tokio::test(start_paused = true)]
async fn test_stage_ttl_counts_down_once_per_second() {
    let mut fx = fixture();
    let mut opts = options("p1", 4);
    opts.draw_seconds = 3;
    let handle = fx.registry.create(code("ABCD"), opts, conn("c1"));
    handle.join(player("p2")).await.unwrap();

    let snap = handle.start_game().await.unwrap();
    let game = snap.game.unwrap();
    assert_eq!(game.stages[&game.active_stage].ttl, 3);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let snap = handle.snapshot().await.unwrap();
    let game = snap.game.unwrap();
    assert_eq!(game.stages[&game.active_stage].ttl, 2);

    tokio::time::sleep(Duration::from_secs(3)).await;
    let snap = handle.snapshot().await.unwrap();
    let game = snap.game.unwrap();
    // Counted down to zero and stayed there; no forced advance.
    assert_eq!(game.stages[&game.active_stage].ttl, 0);
    assert!(snap.has_started);
    assert!(!snap.is_finished);
}

#[tokio::test(start_paused = true)]
async fn test_each_tick_broadcasts_update_room() {
    let mut fx = fixture();
    let mut opts = options("p1", 4);
    opts.draw_seconds = 3;
    let handle = fx.registry.create(code("ABCD"), opts, conn("c1"));
    handle.start_game().await.unwrap();

    let before = fx.broadcast.update_room_count();
    tokio::time::sleep(Duration::from_millis(3100)).await;
    // Synchronize with the actor so all tick broadcasts are recorded.
    handle.snapshot().await.unwrap();
    let after = fx.broadcast.update_room_count();
    assert_eq!(after - before, 3);
}

#[tokio::test(start_paused = true)]
async fn test_advance_rearms_timer_for_next_stage() {
    let mut fx = fixture();
    let mut opts = options("p1", 4);
    opts.draw_seconds = 10;
    opts.guess_seconds = 5;
    let handle = fx.registry.create(code("ABCD"), opts, conn("c1"));
    handle.join(player("p2")).await.unwrap();
    handle.start_game().await.unwrap();

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let snap = handle
        .advance_stage(None, Some("sketch".into()))
        .await
        .unwrap();
    let game = snap.game.unwrap();
    let active = &game.stages[&game.active_stage];
    assert_eq!(active.kind, StageKind::Guess);
    assert_eq!(active.ttl, 5);
    assert_eq!(active.canvas.as_deref(), Some("sketch"));

    // The old countdown is gone; only the new one ticks.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let snap = handle.snapshot().await.unwrap();
    let game = snap.game.unwrap();
    assert_eq!(game.stages[&game.active_stage].ttl, 4);
}

#[tokio::test]
async fn test_advance_without_game_fails() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));
    let err = handle.advance_stage(None, None).await.unwrap_err();
    assert_eq!(err, RoomError::GameNotStarted);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_advance_finishes_archives_and_tears_down() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));
    handle.start_game().await.unwrap();

    // Owner-only chain: the first stage is terminal.
    let snap = handle
        .advance_stage(Some("a walrus".into()), None)
        .await
        .unwrap();
    assert!(snap.is_finished);

    let stored = fx.archive.stored();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_finished);

    // Still alive and serving during the grace period.
    tokio::time::sleep(Duration::from_secs(30)).await;
    let snap = handle.snapshot().await.unwrap();
    assert!(snap.is_finished);

    // Gone once the grace period elapses.
    tokio::time::sleep(Duration::from_secs(31)).await;
    let err = handle.snapshot().await.unwrap_err();
    assert_eq!(err, RoomError::RoomNotFound(code("ABCD")));

    let retired = fx.retired_rx.recv().await.unwrap();
    assert_eq!(retired.code, code("ABCD"));
    assert!(fx.registry.retire(&retired));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_terminal_advance_archives_once_and_keeps_deadline() {
    let mut fx = fixture();
    let handle = fx.registry.create(code("ABCD"), options("p1", 4), conn("c1"));
    handle.start_game().await.unwrap();
    handle.advance_stage(None, None).await.unwrap();
    assert_eq!(fx.archive.stored().len(), 1);

    // A stray advance deep into the grace period is a frozen no-op:
    // it still acks the finished snapshot, but archives nothing.
    tokio::time::sleep(Duration::from_secs(50)).await;
    let snap = handle
        .advance_stage(Some("late guess".into()), None)
        .await
        .unwrap();
    assert!(snap.is_finished);
    assert_eq!(fx.archive.stored().len(), 1);

    // And it did not push the original teardown deadline back.
    tokio::time::sleep(Duration::from_secs(11)).await;
    let err = handle.snapshot().await.unwrap_err();
    assert_eq!(err, RoomError::RoomNotFound(code("ABCD")));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_start_game_rebuilds_chain_from_current_roster() {
    let mut fx = fixture();
    let mut opts = options("p1", 4);
    opts.draw_seconds = 5;
    let handle = fx.registry.create(code("ABCD"), opts, conn("c1"));
    handle.join(player("p2")).await.unwrap();
    handle.join(player("p3")).await.unwrap();

    let snap = handle.start_game().await.unwrap();
    let first_game = snap.game.unwrap();
    assert_eq!(first_game.stages.len(), 3);

    // Roster shrinks mid-game, then the game is restarted.
    handle.leave(PlayerId::from("p3")).await.unwrap();
    let snap = handle.start_game().await.unwrap();
    let second_game = snap.game.unwrap();

    assert_eq!(second_game.stages.len(), 2);
    assert!(
        second_game
            .stages
            .keys()
            .all(|id| !first_game.stages.contains_key(id)),
        "rebuilt chain must use fresh stage ids"
    );
    let first = &second_game.stages[&second_game.active_stage];
    assert_eq!(first.kind, StageKind::Draw);
    assert_eq!(first.player.id, PlayerId::from("p1"));

    // The timer was re-armed for the new first stage.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let snap = handle.snapshot().await.unwrap();
    let game = snap.game.unwrap();
    assert_eq!(game.stages[&game.active_stage].ttl, 4);
}

#[tokio::test(start_paused = true)]
async fn test_no_ticks_after_finish() {
    let mut fx = fixture();
    let mut opts = options("p1", 4);
    opts.draw_seconds = 10;
    let handle = fx.registry.create(code("ABCD"), opts, conn("c1"));
    handle.start_game().await.unwrap();
    handle.advance_stage(None, None).await.unwrap();

    let before = fx.broadcast.update_room_count();
    tokio::time::sleep(Duration::from_secs(5)).await;
    handle.snapshot().await.unwrap();
    assert_eq!(fx.broadcast.update_room_count(), before);
}
