//! [`FallbackOracle`]: a [`ScoringOracle`] that needs no network.
//!
//! Picks words from the built-in list and hands out plausible random
//! scores. It stands in for the AI service in development and demos.

use std::ops::RangeInclusive;

use drawsync_room::{DependencyError, ScoringOracle, fallback_word};
use rand::Rng;

/// Scores handed out by [`FallbackOracle`].
pub const FALLBACK_SCORES: RangeInclusive<u32> = 40..=95;

/// Offline word source and scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackOracle;

impl FallbackOracle {
    pub fn new() -> Self {
        Self
    }
}

impl ScoringOracle for FallbackOracle {
    async fn random_word(&self) -> Result<String, DependencyError> {
        Ok(fallback_word())
    }

    async fn evaluate_drawing(&self, drawing: &str, word: &str) -> Result<u32, DependencyError> {
        if drawing.trim().is_empty() {
            return Err(DependencyError::invalid_response("fallback oracle", "empty drawing"));
        }
        let score = rand::rng().random_range(FALLBACK_SCORES);
        tracing::debug!(word, score, "fallback score");
        Ok(score)
    }
}
