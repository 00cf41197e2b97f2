use std::time::Duration;

use drawsync::prelude::*;
use drawsync::protocol::{Codec, JsonCodec};
use drawsync::room::{DependencyError, FALLBACK_WORDS};
use tokio::sync::broadcast::error::RecvError;

// ---------------------------------------------------------------------------
// A toy scorer
// ---------------------------------------------------------------------------

/// Scores a drawing by how much ink it has: longer payloads score
/// higher, capped at 100. Words come from the built-in list, in turn.
struct InkOracle {
    next_word: std::sync::atomic::AtomicUsize,
}

impl ScoringOracle for InkOracle {
    async fn random_word(&self) -> Result<String, DependencyError> {
        let i = self
            .next_word
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(FALLBACK_WORDS[i % FALLBACK_WORDS.len()].to_string())
    }

    async fn evaluate_drawing(&self, drawing: &str, _word: &str) -> Result<u32, DependencyError> {
        if drawing.is_empty() {
            return Err(DependencyError::invalid_response("ink oracle", "blank canvas"));
        }
        Ok((drawing.len() as u32).min(100))
    }
}

// ---------------------------------------------------------------------------
// One round
// ---------------------------------------------------------------------------

/// Plays one round with three players and returns the archived room.
async fn play_round(builder: DrawSyncBuilder) -> Result<Option<Room>, DrawSyncError> {
    let sink = builder.channel_sink();
    let archive = MemoryArchive::new();
    let oracle = InkOracle {
        next_word: Default::default(),
    };
    let orchestrator = builder.build(oracle, archive.clone(), sink.clone());

    let mut rx = sink.subscribe();
    let watcher = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(published) => {
                    let notification: Notification = match JsonCodec.decode(&published.payload) {
                        Ok(n) => n,
                        Err(e) => {
                            tracing::warn!(error = %e, "undecodable notification");
                            continue;
                        }
                    };
                    tracing::info!(topic = %published.topic, ?notification, "published");
                    if matches!(notification, Notification::Scores { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => tracing::warn!(missed, "watcher lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let room = orchestrator.create(PlayerId::from("ana")).await;
    let code = room.code().clone();
    orchestrator.join(&code, PlayerId::from("bo")).await?;
    orchestrator.join(&code, PlayerId::from("cy")).await?;
    orchestrator.start(&code).await;

    for (player, strokes) in [("ana", 30), ("bo", 80), ("cy", 0)] {
        let drawing = "~".repeat(strokes);
        orchestrator
            .submit_drawing(&code, PlayerId::from(player), drawing)
            .await?;
    }

    if let Err(e) = watcher.await {
        tracing::error!(error = %e, "watcher task failed");
    }

    let history = orchestrator.recent_games(&PlayerId::from("bo")).await?;
    Ok(history.into_iter().next())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    drawsync::init_tracing();

    let builder = DrawSyncBuilder::from_env()?
        .round_secs(5)
        .grace_period(Duration::from_secs(2));

    match play_round(builder).await? {
        Some(room) => eprintln!(
            "room {} finished, winner: {}",
            room.code(),
            room.winner().unwrap_or("nobody")
        ),
        None => eprintln!("round did not reach the archive"),
    }
    Ok(())
}
