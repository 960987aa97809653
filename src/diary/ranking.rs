//! Memory re-ranking: blend vector similarity with how recent an entry is.
//!
//! `score = alpha * (1 - distance) + (1 - alpha) * 1 / (1 + days_since(date))`
//!
//! Candidates farther than `max_distance` are dropped before scoring.
//! Recency works on the logical diary date at day granularity, so entries
//! from the same day share the same recency regardless of time of day.

use chrono::NaiveDate;
use std::cmp::Ordering;

use super::index::ScoredRecord;
use super::types::SimilarEntry;
use crate::config::RetrievalConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingPolicy {
    pub alpha: f64,
    pub max_distance: f64,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            max_distance: 1.0,
        }
    }
}

impl From<&RetrievalConfig> for RankingPolicy {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            alpha: config.alpha,
            max_distance: config.max_distance,
        }
    }
}

/// `1 / (1 + days)`; entries dated after `today` count as today.
pub fn recency(date: NaiveDate, today: NaiveDate) -> f64 {
    let days = (today - date).num_days().max(0);
    1.0 / (1.0 + days as f64)
}

impl RankingPolicy {
    pub fn score(&self, distance: f64, date: NaiveDate, today: NaiveDate) -> f64 {
        let similarity = 1.0 - distance;
        self.alpha * similarity + (1.0 - self.alpha) * recency(date, today)
    }

    /// Cut, score, sort and truncate candidates to at most `k` entries.
    ///
    /// Ties on score fall back to id order so the output does not depend on
    /// the order candidates arrive in.
    pub fn rank(
        &self,
        candidates: Vec<ScoredRecord>,
        today: NaiveDate,
        k: usize,
    ) -> Vec<SimilarEntry> {
        let mut scored: Vec<(f64, ScoredRecord)> = candidates
            .into_iter()
            .filter(|c| c.distance <= self.max_distance)
            .map(|c| (self.score(c.distance, c.record.metadata.date, today), c))
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| match sb.total_cmp(sa) {
            Ordering::Equal => a.record.id.cmp(&b.record.id),
            other => other,
        });

        scored
            .into_iter()
            .take(k)
            .map(|(_, c)| SimilarEntry::from(c.record))
            .collect()
    }
}
