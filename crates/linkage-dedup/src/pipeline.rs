//! End-to-end matching: block → generate → score → rank.

use crate::blocking::BlockIndex;
use crate::candidates::CandidateGenerator;
use crate::cluster::cluster_matches;
use crate::config::{ConfigError, DatasetConfig, PipelineConfig};
use crate::extract::{ExtractError, KeyExtractor, RuleExtractor};
use crate::rank::{IdPair, RankError, RankedPair, Ranker};
use crate::similarity::{ScoreError, SimilarityScorer};
use linkage_core::{LinkageError, RecordTable};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;

/// Errors that abort a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error(transparent)]
    Rank(#[from] RankError),

    #[error(transparent)]
    Schema(#[from] LinkageError),
}

/// Counters from one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub records: usize,
    pub blocks: usize,
    pub unblocked_records: usize,
    pub largest_block: usize,
    pub skipped_blocks: usize,
    pub skipped_records: usize,
    pub candidate_pairs: usize,
    pub matched_pairs: usize,
    pub clusters: usize,
    pub elapsed_secs: f64,
}

/// Ranked matches plus run statistics.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub ranked: Vec<RankedPair>,
    pub stats: PipelineStats,
}

impl PipelineOutput {
    /// Matched pairs in rank order, without scores.
    #[must_use]
    pub fn matches(&self) -> Vec<IdPair> {
        self.ranked.iter().map(|r| r.pair.clone()).collect()
    }
}

/// A configured matcher, parameterized by its key extractor.
pub struct Pipeline<E: KeyExtractor> {
    config: PipelineConfig,
    extractor: E,
}

impl<E: KeyExtractor> Pipeline<E> {
    /// Build a pipeline. The configuration is validated here.
    pub fn new(config: PipelineConfig, extractor: E) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config, extractor })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run over a table. Deterministic for identical input and configuration.
    pub fn run(&self, table: &RecordTable) -> Result<PipelineOutput, PipelineError> {
        let start = Instant::now();

        // Resolve everything that can fail on configuration before any work.
        let compare = table.field(&self.config.compare_field)?;
        let scorer = SimilarityScorer::new(compare).with_missing_policy(self.config.missing_values);
        let ranker = Ranker::new(self.config.similarity_threshold)?;
        let generator = CandidateGenerator::new(self.config.size_cutoff);

        let blocks = BlockIndex::build(table, &self.extractor)?;
        let candidates = generator.generate(&blocks);
        let scored = scorer.score_candidates(table, &candidates, self.config.parallel)?;
        let ranked = ranker.rank_scored(table, scored)?;

        let pairs: Vec<IdPair> = ranked.iter().map(|r| r.pair.clone()).collect();
        let clusters = cluster_matches(table, &pairs).len();

        let stats = PipelineStats {
            records: table.len(),
            blocks: blocks.len(),
            unblocked_records: blocks.unblocked(),
            largest_block: blocks.largest(),
            skipped_blocks: candidates.stats.blocks_skipped,
            skipped_records: candidates.stats.records_skipped,
            candidate_pairs: candidates.len(),
            matched_pairs: ranked.len(),
            clusters,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };

        tracing::info!(
            records = stats.records,
            blocks = stats.blocks,
            candidates = stats.candidate_pairs,
            matches = stats.matched_pairs,
            "pipeline finished"
        );

        Ok(PipelineOutput { ranked, stats })
    }
}

impl Pipeline<RuleExtractor> {
    /// Compile a dataset configuration against a table's schema.
    pub fn from_dataset(config: &DatasetConfig, table: &RecordTable) -> Result<Self, PipelineError> {
        config.validate()?;
        let extractor = RuleExtractor::compile(&config.extractor, table.schema())?;
        Self::new(config.pipeline.clone(), extractor)
    }
}
