//! Integration tests for the session orchestrator using scripted
//! collaborators on a paused Tokio clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use drawsync_protocol::{Notification, PlayerId, RoomCode, Topic, TopicKind};
use drawsync_room::{
    ABANDONED, ABORT_REASON, ABORTED, ArchiveStore, BroadcastSink, DependencyError, FALLBACK_WORDS,
    Outcome, Phase, Room, RoomError, RoomSettings, ScoringOracle, SessionOrchestrator,
};
use tokio::time::sleep;

// =========================================================================
// Scripted collaborators
// =========================================================================

/// Hands out a fixed word and looks scores up by drawing payload.
/// Payloads without a scripted score fail.
#[derive(Default)]
struct ScriptedOracle {
    word: Option<String>,
    scores: HashMap<String, u32>,
    delay: Duration,
    evaluations: AtomicUsize,
}

impl ScriptedOracle {
    fn with_word(word: &str) -> Self {
        Self {
            word: Some(word.to_string()),
            ..Self::default()
        }
    }

    fn score(mut self, drawing: &str, score: u32) -> Self {
        self.scores.insert(drawing.to_string(), score);
        self
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

impl ScoringOracle for ScriptedOracle {
    async fn random_word(&self) -> Result<String, DependencyError> {
        self.word
            .clone()
            .ok_or_else(|| DependencyError::unavailable("oracle", "quota exceeded"))
    }

    async fn evaluate_drawing(&self, drawing: &str, _word: &str) -> Result<u32, DependencyError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.scores
            .get(drawing)
            .copied()
            .ok_or_else(|| DependencyError::unavailable("oracle", "model timed out"))
    }
}

#[derive(Default)]
struct MemoryStore {
    saved: Mutex<Vec<Room>>,
    failing: bool,
}

impl MemoryStore {
    fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn saved(&self) -> Vec<Room> {
        self.saved.lock().unwrap().clone()
    }
}

impl ArchiveStore for MemoryStore {
    async fn save(&self, room: Room) -> Result<(), DependencyError> {
        if self.failing {
            return Err(DependencyError::unavailable("archive", "disk full"));
        }
        self.saved.lock().unwrap().push(room);
        Ok(())
    }

    async fn recent_finished(&self, player: &PlayerId, limit: usize) -> Result<Vec<Room>, DependencyError> {
        if self.failing {
            return Err(DependencyError::unavailable("archive", "disk full"));
        }
        let mut rooms: Vec<Room> = self
            .saved
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.phase() == Phase::Finished && r.contains(player))
            .cloned()
            .collect();
        rooms.reverse();
        rooms.sort_by(|a, b| b.created_at_ms().cmp(&a.created_at_ms()));
        rooms.truncate(limit);
        Ok(rooms)
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<(Topic, Notification)>>,
}

impl RecordingSink {
    fn on(&self, code: &RoomCode, kind: TopicKind) -> Vec<Notification> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(topic, _)| &topic.room == code && topic.kind == kind)
            .map(|(_, n)| n.clone())
            .collect()
    }

    fn ticks(&self, code: &RoomCode) -> Vec<u32> {
        self.on(code, TopicKind::Timer)
            .into_iter()
            .filter_map(|n| match n {
                Notification::Tick { remaining } => Some(remaining),
                _ => None,
            })
            .collect()
    }

    fn topics(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, _)| topic.to_string())
            .collect()
    }
}

impl BroadcastSink for RecordingSink {
    fn publish(&self, topic: Topic, notification: Notification) {
        self.events.lock().unwrap().push((topic, notification));
    }
}

// =========================================================================
// Helpers
// =========================================================================

type Orchestrator = SessionOrchestrator<Arc<ScriptedOracle>, Arc<MemoryStore>, Arc<RecordingSink>>;

struct Harness {
    orch: Orchestrator,
    oracle: Arc<ScriptedOracle>,
    archive: Arc<MemoryStore>,
    sink: Arc<RecordingSink>,
}

fn harness_with(oracle: ScriptedOracle, archive: MemoryStore) -> Harness {
    let oracle = Arc::new(oracle);
    let archive = Arc::new(archive);
    let sink = Arc::new(RecordingSink::default());
    let orch = SessionOrchestrator::new(Arc::clone(&oracle), Arc::clone(&archive), Arc::clone(&sink));
    Harness {
        orch,
        oracle,
        archive,
        sink,
    }
}

fn harness(oracle: ScriptedOracle) -> Harness {
    harness_with(oracle, MemoryStore::default())
}

fn pid(id: &str) -> PlayerId {
    PlayerId::from(id)
}

fn round_of(secs: u32) -> RoomSettings {
    RoomSettings {
        round_duration_secs: secs,
        ..RoomSettings::default()
    }
}

/// Advances the paused clock.
async fn advance_ms(ms: u64) {
    sleep(Duration::from_millis(ms)).await;
}

// =========================================================================
// create / get_game / get_available
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_create_then_get_game_returns_fresh_lobby() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let created = h.orch.create(pid("ana")).await;

    let room = h.orch.get_game(created.code()).await.unwrap();
    assert_eq!(room.phase(), Phase::Lobby);
    assert_eq!(room.time_remaining_secs(), room.round_duration_secs());
    assert_eq!(room.round_duration_secs(), 60);
    assert_eq!(room.max_players(), 4);
    assert_eq!(room.players(), &[pid("ana")]);
    assert_eq!(room.scores().len(), 1);
    assert_eq!(room.scores().get(&pid("ana")), Some(0));
    assert!(!h.orch.has_timer(room.code()).await);
}

#[tokio::test(start_paused = true)]
async fn test_create_issues_four_char_hex_codes() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let a = h.orch.create(pid("ana")).await;
    let b = h.orch.create(pid("bo")).await;

    assert_ne!(a.code(), b.code());
    for code in [a.code(), b.code()] {
        assert_eq!(code.as_str().len(), 4);
        assert!(code.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
    assert_eq!(h.orch.room_count().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_create_with_applies_settings() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let settings = RoomSettings {
        max_players: 2,
        round_duration_secs: 30,
        is_private: true,
    };
    let room = h.orch.create_with(pid("ana"), settings).await;

    assert_eq!(room.max_players(), 2);
    assert_eq!(room.time_remaining_secs(), 30);
    assert!(room.is_private());
}

#[tokio::test(start_paused = true)]
async fn test_get_game_unknown_code_returns_none() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    assert!(h.orch.get_game(&RoomCode::new("FFFF")).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_get_available_lists_only_lobbies() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let waiting = h.orch.create(pid("ana")).await;
    let playing = h.orch.create(pid("bo")).await;
    h.orch.start(playing.code()).await;

    let available = h.orch.get_available().await;
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].code(), waiting.code());
}

// =========================================================================
// join
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_join_appends_player_and_broadcasts_roster() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;

    let joined = h.orch.join(room.code(), pid("bo")).await.unwrap();
    assert_eq!(joined.players(), &[pid("ana"), pid("bo")]);
    assert_eq!(joined.scores().get(&pid("bo")), Some(0));

    let rosters = h.sink.on(room.code(), TopicKind::Players);
    assert_eq!(
        rosters,
        vec![Notification::Roster {
            players: vec![pid("ana"), pid("bo")]
        }]
    );
    assert_eq!(h.sink.topics(), vec![format!("/topic/{}/players", room.code())]);
}

#[tokio::test(start_paused = true)]
async fn test_join_past_capacity_returns_full() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("p0")).await;

    for i in 1..4 {
        h.orch.join(room.code(), pid(&format!("p{i}"))).await.unwrap();
    }
    let err = h.orch.join(room.code(), pid("p4")).await.unwrap_err();

    assert!(matches!(err, RoomError::Full(_)));
    let room = h.orch.get_game(room.code()).await.unwrap();
    assert_eq!(room.players().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_join_unknown_room_returns_not_found() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let err = h.orch.join(&RoomCode::new("0000"), pid("ana")).await.unwrap_err();
    assert!(matches!(err, RoomError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn test_join_while_playing_is_allowed() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;
    h.orch.start(room.code()).await;

    let joined = h.orch.join(room.code(), pid("late")).await.unwrap();
    assert_eq!(joined.phase(), Phase::Playing);
    assert!(joined.contains(&pid("late")));
}

#[tokio::test(start_paused = true)]
async fn test_join_finished_room_returns_already_finished() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create_with(pid("ana"), round_of(0)).await;
    h.orch.start(room.code()).await;
    advance_ms(500).await;

    assert_eq!(h.orch.get_game(room.code()).await.unwrap().phase(), Phase::Finished);
    let err = h.orch.join(room.code(), pid("bo")).await.unwrap_err();
    assert!(matches!(err, RoomError::AlreadyFinished(_)));
}

// =========================================================================
// leave
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_leave_removes_player_score_and_submission() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;
    h.orch.join(room.code(), pid("bo")).await.unwrap();
    h.orch
        .submit_drawing(room.code(), pid("bo"), "sketch".into())
        .await
        .unwrap();

    let after = h.orch.leave(room.code(), &pid("bo")).await.unwrap().unwrap();

    assert_eq!(after.players(), &[pid("ana")]);
    assert_eq!(after.scores().get(&pid("bo")), None);
    assert!(after.submissions().is_empty());
    let last_roster = h.sink.on(room.code(), TopicKind::Players).pop();
    assert_eq!(
        last_roster,
        Some(Notification::Roster {
            players: vec![pid("ana")]
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_leave_by_last_player_abandons_and_archives_room() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;

    let result = h.orch.leave(room.code(), &pid("ana")).await.unwrap();

    assert!(result.is_none());
    assert!(h.orch.get_game(room.code()).await.is_none());
    let saved = h.archive.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].phase(), Phase::Aborted);
    assert_eq!(saved[0].winner(), Some(ABANDONED));
    assert_eq!(saved[0].players(), &[pid("ana")], "last player stays on the record");
}

#[tokio::test(start_paused = true)]
async fn test_leave_while_playing_returns_invalid_phase() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;
    h.orch.join(room.code(), pid("bo")).await.unwrap();
    h.orch.start(room.code()).await;

    let err = h.orch.leave(room.code(), &pid("bo")).await.unwrap_err();
    assert!(matches!(
        err,
        RoomError::InvalidPhase {
            phase: Phase::Playing,
            operation: "leave",
            ..
        }
    ));
    assert_eq!(h.orch.get_game(room.code()).await.unwrap().players().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_leave_by_stranger_returns_not_in_room() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;

    let err = h.orch.leave(room.code(), &pid("zed")).await.unwrap_err();
    assert!(matches!(err, RoomError::NotInRoom(..)));
    assert!(h.orch.get_game(room.code()).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_leave_unknown_room_returns_not_found() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let err = h.orch.leave(&RoomCode::new("0000"), &pid("ana")).await.unwrap_err();
    assert!(matches!(err, RoomError::NotFound(_)));
}

// =========================================================================
// start and countdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_sets_word_and_begins_countdown() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;

    h.orch.start(room.code()).await;

    let playing = h.orch.get_game(room.code()).await.unwrap();
    assert_eq!(playing.phase(), Phase::Playing);
    assert_eq!(playing.current_word(), Some("Gato"));
    assert!(h.orch.has_timer(room.code()).await);
    assert_eq!(
        h.sink.on(room.code(), TopicKind::Word),
        vec![Notification::Word {
            word: "Gato".into()
        }]
    );

    advance_ms(2_500).await;
    assert_eq!(h.sink.ticks(room.code()), vec![59, 58, 57]);
    assert_eq!(h.orch.get_game(room.code()).await.unwrap().time_remaining_secs(), 57);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_reaches_finished_after_duration() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;
    h.orch.start(room.code()).await;

    advance_ms(59_500).await;
    assert_eq!(h.orch.get_game(room.code()).await.unwrap().phase(), Phase::Playing);

    advance_ms(1_000).await;
    let finished = h.orch.get_game(room.code()).await.unwrap();
    assert_eq!(finished.phase(), Phase::Finished);
    assert_eq!(finished.time_remaining_secs(), 0);

    let ticks = h.sink.ticks(room.code());
    assert_eq!(ticks.len(), 61);
    assert!(ticks.windows(2).all(|w| w[0] >= w[1]), "ticks went up: {ticks:?}");
    assert_eq!(&ticks[59..], &[0, 0], "final zero marks the end");
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_arms_single_countdown() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;

    h.orch.start(room.code()).await;
    h.orch.start(room.code()).await;
    advance_ms(1_500).await;
    h.orch.start(room.code()).await;
    advance_ms(2_000).await;

    assert_eq!(h.sink.ticks(room.code()), vec![59, 58, 57, 56]);
    assert_eq!(h.sink.on(room.code(), TopicKind::Word).len(), 1);
    assert_eq!(h.orch.scheduler().live_tasks(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_unknown_room_is_ignored() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    h.orch.start(&RoomCode::new("0000")).await;
    assert_eq!(h.orch.scheduler().metrics().total_scheduled, 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_with_failing_word_source_uses_fallback() {
    let h = harness(ScriptedOracle::default());
    let room = h.orch.create(pid("ana")).await;

    h.orch.start(room.code()).await;

    let room = h.orch.get_game(room.code()).await.unwrap();
    let word = room.current_word().unwrap();
    assert!(FALLBACK_WORDS.contains(&word), "unexpected fallback {word}");
}

#[tokio::test(start_paused = true)]
async fn test_start_normalizes_word() {
    let h = harness(ScriptedOracle::with_word("  Perro.\n"));
    let room = h.orch.create(pid("ana")).await;

    h.orch.start(room.code()).await;

    let room = h.orch.get_game(room.code()).await.unwrap();
    assert_eq!(room.current_word(), Some("Perro"));
}

#[tokio::test(start_paused = true)]
async fn test_countdowns_of_different_rooms_are_independent() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let a = h.orch.create(pid("ana")).await;
    let b = h.orch.create(pid("bo")).await;
    h.orch.start(a.code()).await;
    advance_ms(2_000).await;
    h.orch.start(b.code()).await;
    advance_ms(1_500).await;

    assert_eq!(h.sink.ticks(a.code()), vec![59, 58, 57, 56]);
    assert_eq!(h.sink.ticks(b.code()), vec![59, 58]);
}

// =========================================================================
// submit_drawing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_submit_drawing_last_write_wins() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;

    h.orch
        .submit_drawing(room.code(), pid("ana"), "first".into())
        .await
        .unwrap();
    h.orch
        .submit_drawing(room.code(), pid("ana"), "second".into())
        .await
        .unwrap();

    let room = h.orch.get_game(room.code()).await.unwrap();
    assert_eq!(room.submissions().len(), 1);
    assert_eq!(room.submissions()[&pid("ana")], "second");
}

#[tokio::test(start_paused = true)]
async fn test_submit_drawing_unknown_room_returns_not_found() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let err = h
        .orch
        .submit_drawing(&RoomCode::new("0000"), pid("ana"), "x".into())
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::NotFound(_)));
}

// =========================================================================
// Evaluation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_evaluation_scores_zero_for_failed_drawing_and_picks_winner() {
    let oracle = ScriptedOracle::with_word("Gato").score("img-a", 80);
    let h = harness(oracle);
    let room = h.orch.create(pid("A")).await;
    h.orch.join(room.code(), pid("B")).await.unwrap();
    h.orch.start(room.code()).await;
    h.orch.submit_drawing(room.code(), pid("A"), "img-a".into()).await.unwrap();
    h.orch.submit_drawing(room.code(), pid("B"), "img-b".into()).await.unwrap();

    // Finished at t=60, evaluated at t=70.
    advance_ms(69_500).await;
    assert!(h.sink.on(room.code(), TopicKind::Scores).is_empty());
    assert!(h.orch.get_game(room.code()).await.is_some());

    advance_ms(1_000).await;
    let saved = h.archive.saved();
    assert_eq!(saved.len(), 1);
    let finished = &saved[0];
    assert_eq!(finished.phase(), Phase::Finished);
    assert_eq!(finished.scores().get(&pid("A")), Some(80));
    assert_eq!(finished.scores().get(&pid("B")), Some(0));
    assert_eq!(finished.winner(), Some("A"));
    assert_eq!(finished.outcome(), Some(&Outcome::Winner(pid("A"))));

    let scores = h.sink.on(room.code(), TopicKind::Scores);
    assert_eq!(
        scores,
        vec![Notification::Scores {
            scores: finished.scores().clone()
        }]
    );
    assert!(h.orch.get_game(room.code()).await.is_none());
    assert!(!h.orch.has_timer(room.code()).await);
    assert_eq!(h.orch.scheduler().live_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_evaluation_accepts_submission_during_grace_period() {
    let oracle = ScriptedOracle::with_word("Gato").score("buzzer", 65);
    let h = harness(oracle);
    let room = h.orch.create_with(pid("ana"), round_of(5)).await;
    h.orch.start(room.code()).await;

    advance_ms(8_500).await;
    assert_eq!(h.orch.get_game(room.code()).await.unwrap().phase(), Phase::Finished);
    h.orch
        .submit_drawing(room.code(), pid("ana"), "buzzer".into())
        .await
        .unwrap();

    advance_ms(10_000).await;
    let saved = h.archive.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].scores().get(&pid("ana")), Some(65));
}

#[tokio::test(start_paused = true)]
async fn test_evaluation_without_submissions_has_no_winner() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create_with(pid("ana"), round_of(1)).await;
    h.orch.join(room.code(), pid("bo")).await.unwrap();
    h.orch.start(room.code()).await;

    advance_ms(12_500).await;

    let saved = h.archive.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].outcome(), Some(&Outcome::NoWinner));
    assert_eq!(saved[0].winner(), None);
    assert_eq!(saved[0].scores().get(&pid("bo")), Some(0));
    assert_eq!(h.oracle.evaluations(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_evaluation_survives_archive_failure() {
    let oracle = ScriptedOracle::with_word("Gato").score("img", 90);
    let h = harness_with(oracle, MemoryStore::failing());
    let room = h.orch.create_with(pid("ana"), round_of(1)).await;
    h.orch.start(room.code()).await;
    h.orch.submit_drawing(room.code(), pid("ana"), "img".into()).await.unwrap();

    advance_ms(12_500).await;

    let scores = h.sink.on(room.code(), TopicKind::Scores);
    assert_eq!(scores.len(), 1);
    assert!(h.orch.get_game(room.code()).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_evaluation_caps_scores_at_one_hundred() {
    let oracle = ScriptedOracle::with_word("Gato").score("img", 250);
    let h = harness(oracle);
    let room = h.orch.create_with(pid("ana"), round_of(1)).await;
    h.orch.start(room.code()).await;
    h.orch.submit_drawing(room.code(), pid("ana"), "img".into()).await.unwrap();

    advance_ms(12_500).await;

    assert_eq!(h.archive.saved()[0].scores().get(&pid("ana")), Some(100));
}

// =========================================================================
// abort
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_abort_playing_room_stops_countdown() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;
    h.orch.start(room.code()).await;
    advance_ms(5_500).await;

    assert!(h.orch.abort(room.code()).await);
    let ticks_at_abort = h.sink.ticks(room.code()).len();
    advance_ms(120_000).await;

    assert_eq!(h.sink.ticks(room.code()).len(), ticks_at_abort);
    assert!(h.sink.on(room.code(), TopicKind::Scores).is_empty());
    assert_eq!(
        h.sink.on(room.code(), TopicKind::Abort),
        vec![Notification::Aborted {
            reason: ABORT_REASON.into()
        }]
    );
    assert!(h.orch.get_game(room.code()).await.is_none());
    assert!(!h.orch.has_timer(room.code()).await);
    assert_eq!(h.orch.scheduler().live_tasks(), 0);

    let saved = h.archive.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].phase(), Phase::Aborted);
    assert_eq!(saved[0].winner(), Some(ABORTED));
}

#[tokio::test(start_paused = true)]
async fn test_abort_lobby_room() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;

    assert!(h.orch.abort(room.code()).await);
    assert!(h.orch.get_available().await.is_empty());
    assert_eq!(h.archive.saved()[0].phase(), Phase::Aborted);
}

#[tokio::test(start_paused = true)]
async fn test_abort_unknown_room_returns_false() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    assert!(!h.orch.abort(&RoomCode::new("0000")).await);
    assert!(h.archive.saved().is_empty());
    assert!(h.sink.topics().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_abort_twice_second_returns_false() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;

    assert!(h.orch.abort(room.code()).await);
    assert!(!h.orch.abort(room.code()).await);
    assert_eq!(h.archive.saved().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abort_during_grace_period_cancels_evaluation() {
    let oracle = ScriptedOracle::with_word("Gato").score("img", 70);
    let h = harness(oracle);
    let room = h.orch.create_with(pid("ana"), round_of(2)).await;
    h.orch.start(room.code()).await;
    h.orch.submit_drawing(room.code(), pid("ana"), "img".into()).await.unwrap();

    advance_ms(4_500).await;
    assert_eq!(h.orch.get_game(room.code()).await.unwrap().phase(), Phase::Finished);
    assert!(h.orch.abort(room.code()).await);
    advance_ms(30_000).await;

    assert_eq!(h.oracle.evaluations(), 0);
    assert!(h.sink.on(room.code(), TopicKind::Scores).is_empty());
    let saved = h.archive.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].phase(), Phase::Aborted);
}

#[tokio::test(start_paused = true)]
async fn test_abort_during_evaluation_discards_scores() {
    let oracle = ScriptedOracle::with_word("Gato")
        .score("img", 70)
        .slow(Duration::from_secs(5));
    let h = harness(oracle);
    let room = h.orch.create_with(pid("ana"), round_of(1)).await;
    h.orch.start(room.code()).await;
    h.orch.submit_drawing(room.code(), pid("ana"), "img".into()).await.unwrap();

    // Finished at t=1, evaluation starts at t=11 and needs 5s.
    advance_ms(13_000).await;
    assert_eq!(h.oracle.evaluations(), 1);
    assert!(h.orch.abort(room.code()).await);
    advance_ms(10_000).await;

    assert!(h.sink.on(room.code(), TopicKind::Scores).is_empty());
    let saved = h.archive.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].winner(), Some(ABORTED));
}

#[tokio::test(start_paused = true)]
async fn test_abort_one_room_leaves_others_running() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let a = h.orch.create(pid("ana")).await;
    let b = h.orch.create(pid("bo")).await;
    h.orch.start(a.code()).await;
    h.orch.start(b.code()).await;
    advance_ms(1_500).await;

    h.orch.abort(a.code()).await;
    advance_ms(2_000).await;

    assert_eq!(h.sink.ticks(a.code()), vec![59, 58]);
    assert_eq!(h.sink.ticks(b.code()), vec![59, 58, 57, 56]);
}

// =========================================================================
// recent_games
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_recent_games_includes_every_finishing_player() {
    let oracle = ScriptedOracle::with_word("Gato").score("img", 50);
    let h = harness(oracle);
    let room = h.orch.create_with(pid("ana"), round_of(1)).await;
    h.orch.join(room.code(), pid("bo")).await.unwrap();
    h.orch.start(room.code()).await;
    h.orch.submit_drawing(room.code(), pid("bo"), "img".into()).await.unwrap();
    advance_ms(12_500).await;

    for player in ["ana", "bo"] {
        let recent = h.orch.recent_games(&pid(player)).await.unwrap();
        assert_eq!(recent.len(), 1, "{player} should see the round");
        assert_eq!(recent[0].code(), room.code());
        assert_eq!(recent[0].winner(), Some("bo"));
    }
    assert!(h.orch.recent_games(&pid("zed")).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_recent_games_skips_aborted_rooms() {
    let h = harness(ScriptedOracle::with_word("Gato"));
    let room = h.orch.create(pid("ana")).await;
    h.orch.leave(room.code(), &pid("ana")).await.unwrap();

    assert!(h.orch.recent_games(&pid("ana")).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_recent_games_propagates_archive_failure() {
    let h = harness_with(ScriptedOracle::with_word("Gato"), MemoryStore::failing());
    let err = h.orch.recent_games(&pid("ana")).await.unwrap_err();
    assert!(matches!(err, RoomError::Dependency(_)));
}

// =========================================================================
// Concurrent callers
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_joins_and_starts_respect_capacity_and_single_countdown() {
    let h = harness(ScriptedOracle::with_word("Gato"));

    for round in 0..10 {
        let room = h.orch.create(pid("ana")).await;
        let code = room.code().clone();

        let mut joins = Vec::new();
        let mut starts = Vec::new();
        for i in 0..20 {
            let orch = h.orch.clone();
            let code = code.clone();
            if i % 5 == 0 {
                starts.push(tokio::spawn(async move { orch.start(&code).await }));
            } else {
                let player = pid(&format!("p{round}-{i}"));
                joins.push(tokio::spawn(async move { orch.join(&code, player).await }));
            }
        }

        let mut accepted = 0;
        let mut full = 0;
        for join in joins {
            match join.await.unwrap() {
                Ok(room) => {
                    assert!(room.players().len() <= 4, "roster overflowed: {:?}", room.players());
                    accepted += 1;
                }
                Err(RoomError::Full(_)) => full += 1,
                Err(other) => panic!("unexpected join error: {other}"),
            }
        }
        for start in starts {
            start.await.unwrap();
        }

        assert_eq!(accepted, 3);
        assert_eq!(full, 16 - 3);
        let room = h.orch.get_game(&code).await.unwrap();
        assert_eq!(room.players().len(), 4);
        assert_eq!(room.phase(), Phase::Playing);
        assert_eq!(h.sink.on(&code, TopicKind::Word).len(), 1);
        assert!(h.orch.has_timer(&code).await);

        assert!(h.orch.abort(&code).await);
    }

    // Cancelled tasks wind down on their own workers.
    for _ in 0..100 {
        if h.orch.scheduler().live_tasks() == 0 {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.orch.scheduler().live_tasks(), 0);
    assert_eq!(h.archive.saved().len(), 10);
}
