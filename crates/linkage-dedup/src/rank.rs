//! Canonicalization, threshold filtering and ranking of scored pairs.

use crate::similarity::ScoredPair;
use linkage_core::{RecordId, RecordTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the ranker.
#[derive(Error, Debug, PartialEq)]
pub enum RankError {
    #[error("threshold must be between 0.0 and 1.0, got {0}")]
    InvalidThreshold(f64),

    #[error("scored pair references row {0}, table has {1} rows")]
    RowOutOfRange(usize, usize),
}

/// A pair of record ids as written to output and read from ground truth.
///
/// Pairs built with [`IdPair::canonical`] satisfy `lid < rid`; ground-truth
/// rows are taken as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdPair {
    pub lid: RecordId,
    pub rid: RecordId,
}

impl IdPair {
    /// Order two ids so the smaller comes first.
    #[must_use]
    pub fn canonical(a: RecordId, b: RecordId) -> Self {
        if a <= b {
            Self { lid: a, rid: b }
        } else {
            Self { lid: b, rid: a }
        }
    }

    /// True when `lid < rid`.
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.lid < self.rid
    }
}

/// A canonical pair with its score, in rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPair {
    pub pair: IdPair,
    pub score: f64,
}

/// Filters pairs by threshold and orders them by descending score.
#[derive(Debug, Clone, Copy)]
pub struct Ranker {
    threshold: f64,
}

impl Ranker {
    /// Create a ranker. The threshold must lie in `[0, 1]`.
    pub fn new(threshold: f64) -> Result<Self, RankError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(RankError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Rank and keep the scores.
    ///
    /// Pairs are first put back in emission order, so input produced by
    /// sharded scoring ranks exactly like sequential input. The score sort
    /// is stable: equal scores keep emission order.
    pub fn rank_scored(
        &self,
        table: &RecordTable,
        mut scored: Vec<ScoredPair>,
    ) -> Result<Vec<RankedPair>, RankError> {
        let total = scored.len();
        scored.retain(|p| p.score >= self.threshold);
        scored.sort_by_key(|p| p.seq);
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        let records = table.records();
        let ranked = scored
            .into_iter()
            .map(|p| {
                let left = records
                    .get(p.left)
                    .ok_or(RankError::RowOutOfRange(p.left, records.len()))?;
                let right = records
                    .get(p.right)
                    .ok_or(RankError::RowOutOfRange(p.right, records.len()))?;
                Ok(RankedPair {
                    pair: IdPair::canonical(left.id().clone(), right.id().clone()),
                    score: p.score,
                })
            })
            .collect::<Result<Vec<_>, RankError>>()?;

        tracing::debug!(
            scored = total,
            kept = ranked.len(),
            threshold = self.threshold,
            "ranked pairs"
        );
        Ok(ranked)
    }

    /// Rank and drop the scores.
    pub fn rank(
        &self,
        table: &RecordTable,
        scored: Vec<ScoredPair>,
    ) -> Result<Vec<IdPair>, RankError> {
        Ok(self
            .rank_scored(table, scored)?
            .into_iter()
            .map(|r| r.pair)
            .collect())
    }
}
