//! Token-set Jaccard scoring of candidate pairs.
//!
//! Similarity is normalized by the larger set rather than the union:
//! `|A ∩ B| / max(|A|, |B|)`, defined as `0.0` when both sets are empty.

use crate::candidates::{CandidatePair, Candidates};
use linkage_core::{FieldRef, Record, RecordTable};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while scoring candidates.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScoreError {
    /// A candidate refers to a row the table does not have.
    #[error("candidate row {0} out of range for {1} records")]
    RowOutOfRange(usize, usize),
}

/// How a missing comparison value is tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Missing values have no tokens and score `0.0` against anything.
    #[default]
    EmptySet,
    /// Missing values tokenize as the literal `"nan"`, matching results
    /// produced by string-coercing dataframe tooling.
    LiteralNan,
}

/// A candidate pair with its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPair {
    pub left: usize,
    pub right: usize,
    pub seq: usize,
    pub score: f64,
}

fn row_set(sets: &[HashSet<String>], row: usize) -> Result<&HashSet<String>, ScoreError> {
    sets.get(row)
        .ok_or(ScoreError::RowOutOfRange(row, sets.len()))
}

/// Lower-cased whitespace tokens of `text`.
#[must_use]
pub fn token_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Jaccard similarity normalized by the larger set.
#[must_use]
pub fn jaccard_max(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let denom = a.len().max(b.len());
    if denom == 0 {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let common = small.iter().filter(|t| large.contains(*t)).count();
    common as f64 / denom as f64
}

/// Scores pairs on one designated field.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityScorer {
    field: FieldRef,
    missing: MissingValuePolicy,
}

impl SimilarityScorer {
    #[must_use]
    pub fn new(field: FieldRef) -> Self {
        Self {
            field,
            missing: MissingValuePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_missing_policy(mut self, missing: MissingValuePolicy) -> Self {
        self.missing = missing;
        self
    }

    /// Tokens of a record's comparison field.
    #[must_use]
    pub fn tokens(&self, record: &Record) -> HashSet<String> {
        match (record.get(self.field), self.missing) {
            (Some(text), _) => token_set(text),
            (None, MissingValuePolicy::EmptySet) => HashSet::new(),
            (None, MissingValuePolicy::LiteralNan) => HashSet::from(["nan".to_string()]),
        }
    }

    /// Similarity of two records. Symmetric and within `[0, 1]`.
    #[must_use]
    pub fn score(&self, left: &Record, right: &Record) -> f64 {
        jaccard_max(&self.tokens(left), &self.tokens(right))
    }

    /// Score every candidate, preserving emission order.
    ///
    /// Each record is tokenized once. With `parallel`, tokenization and
    /// scoring run on the rayon pool; the output order is unchanged.
    /// Candidates naming rows outside `table` are an error.
    pub fn score_candidates(
        &self,
        table: &RecordTable,
        candidates: &Candidates,
        parallel: bool,
    ) -> Result<Vec<ScoredPair>, ScoreError> {
        let records = table.records();
        let score_one =
            |sets: &[HashSet<String>], p: &CandidatePair| -> Result<ScoredPair, ScoreError> {
                Ok(ScoredPair {
                    left: p.left,
                    right: p.right,
                    seq: p.seq,
                    score: jaccard_max(row_set(sets, p.left)?, row_set(sets, p.right)?),
                })
            };

        let scored: Vec<ScoredPair> = if parallel {
            let sets: Vec<HashSet<String>> = records.par_iter().map(|r| self.tokens(r)).collect();
            candidates
                .pairs
                .par_iter()
                .map(|p| score_one(&sets, p))
                .collect::<Result<_, _>>()?
        } else {
            let sets: Vec<HashSet<String>> = records.iter().map(|r| self.tokens(r)).collect();
            candidates
                .pairs
                .iter()
                .map(|p| score_one(&sets, p))
                .collect::<Result<_, _>>()?
        };

        tracing::debug!(pairs = scored.len(), parallel, "scored candidate pairs");
        Ok(scored)
    }
}
