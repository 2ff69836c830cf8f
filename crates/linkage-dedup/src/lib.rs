//! # linkage-dedup
//!
//! Blocking-based duplicate detection for product records.
//!
//! The pipeline runs in five stages:
//! 1. **Extract**: a [`KeyExtractor`] maps each record to tokens
//! 2. **Block**: records sharing a canonical token key form a block
//! 3. **Generate**: blocks below the size cutoff expand into candidate pairs
//! 4. **Score**: token-set Jaccard on a comparison field
//! 5. **Rank**: canonical `(lid, rid)` pairs above the threshold, best first
//!
//! Matches can then be evaluated against ground truth.
//!
//! # Example
//!
//! ```
//! use linkage_core::{Record, RecordId, RecordTable, Schema};
//! use linkage_dedup::{evaluate, DatasetConfig, ExtractorConfig, FieldRules, IdPair, Pipeline, PipelineConfig, Rule};
//!
//! let mut table = RecordTable::new(Schema::new(["id", "title"]).unwrap());
//! for (id, title) in [(1, "red shoe"), (2, "red shoe size9"), (3, "blue hat")] {
//!     let values = vec![Some(id.to_string()), Some(title.to_string())];
//!     table.push(Record::new(RecordId::Int(id), values)).unwrap();
//! }
//!
//! let config = DatasetConfig {
//!     id_field: "id".to_string(),
//!     pipeline: PipelineConfig::default(),
//!     extractor: ExtractorConfig {
//!         fields: vec![FieldRules { field: "title".to_string(), rules: vec![Rule::new(r"^\w+")] }],
//!         ..ExtractorConfig::default()
//!     },
//! };
//! let output = Pipeline::from_dataset(&config, &table).unwrap().run(&table).unwrap();
//! let matches = output.matches();
//! assert_eq!(matches, vec![IdPair::canonical(RecordId::Int(1), RecordId::Int(2))]);
//!
//! let metrics = evaluate(&matches, &matches);
//! assert_eq!(metrics.f1, 1.0);
//! ```

pub mod blocking;
pub mod candidates;
pub mod cluster;
pub mod config;
pub mod evaluate;
pub mod exact;
pub mod extract;
pub mod io;
pub mod pipeline;
pub mod rank;
pub mod similarity;

pub use blocking::{BlockIndex, BlockKey};
pub use candidates::{CandidateGenerator, CandidatePair, Candidates, DEFAULT_SIZE_CUTOFF};
pub use cluster::{cluster_matches, UnionFind};
pub use config::{
    Alias, ConfigError, DatasetConfig, ExtractorConfig, ExtractorPreset, FieldRules, MatchMode,
    NormalizerConfig, PipelineConfig, Rule,
};
pub use evaluate::{evaluate, ordering_violations, Metrics};
pub use exact::ExactDuplicateFinder;
pub use extract::{ExtractError, KeyExtractor, RuleExtractor};
pub use io::{
    read_pair_files, read_pairs, read_pairs_as, read_records, write_pairs, write_pairs_csv,
    InputFormat, IoError,
};
pub use pipeline::{Pipeline, PipelineError, PipelineOutput, PipelineStats};
pub use rank::{IdPair, RankedPair, Ranker};
pub use similarity::{
    jaccard_max, token_set, MissingValuePolicy, ScoreError, ScoredPair, SimilarityScorer,
};
