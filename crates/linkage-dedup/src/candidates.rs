//! Candidate pair generation.
//!
//! Each block small enough to compare expands into all of its unordered
//! member pairs. Blocks at or above the size cutoff are skipped outright,
//! which bounds total work at `O(Σ min(k_i, cutoff)^2)`.

use crate::blocking::BlockIndex;

/// Default block-size cutoff.
pub const DEFAULT_SIZE_CUTOFF: usize = 100;

/// Two row indices proposed for comparison.
///
/// `seq` is the pair's position in the deterministic emission order and is
/// used as the ranking tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidatePair {
    pub left: usize,
    pub right: usize,
    pub seq: usize,
}

/// Counters from one generation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateStats {
    /// Blocks below the cutoff.
    pub blocks_expanded: usize,
    /// Blocks at or above the cutoff.
    pub blocks_skipped: usize,
    /// Records that sat in skipped blocks.
    pub records_skipped: usize,
}

/// Generated pairs in emission order.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    pub pairs: Vec<CandidatePair>,
    pub stats: CandidateStats,
}

impl Candidates {
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Expands blocks into candidate pairs.
#[derive(Debug, Clone, Copy)]
pub struct CandidateGenerator {
    size_cutoff: usize,
}

impl Default for CandidateGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE_CUTOFF)
    }
}

impl CandidateGenerator {
    #[must_use]
    pub fn new(size_cutoff: usize) -> Self {
        Self { size_cutoff }
    }

    #[must_use]
    pub fn size_cutoff(&self) -> usize {
        self.size_cutoff
    }

    /// Number of pairs `generate` would emit, without materializing them.
    #[must_use]
    pub fn estimate(&self, blocks: &BlockIndex) -> usize {
        blocks
            .iter()
            .map(|(_, members)| members.len())
            .filter(|&k| k < self.size_cutoff)
            .map(|k| k * k.saturating_sub(1) / 2)
            .sum()
    }

    /// Emit every `i < j` pair of each block below the cutoff.
    ///
    /// Order: blocks in insertion order, then members in block order.
    #[must_use]
    pub fn generate(&self, blocks: &BlockIndex) -> Candidates {
        let mut pairs = Vec::with_capacity(self.estimate(blocks));
        let mut stats = CandidateStats::default();

        for (key, members) in blocks.iter() {
            if members.len() >= self.size_cutoff {
                stats.blocks_skipped += 1;
                stats.records_skipped += members.len();
                tracing::debug!(key = %key, size = members.len(), "skipping oversized block");
                continue;
            }
            stats.blocks_expanded += 1;
            for (i, &left) in members.iter().enumerate() {
                for &right in &members[i + 1..] {
                    let seq = pairs.len();
                    pairs.push(CandidatePair { left, right, seq });
                }
            }
        }

        if stats.blocks_skipped > 0 {
            tracing::warn!(
                blocks = stats.blocks_skipped,
                records = stats.records_skipped,
                cutoff = self.size_cutoff,
                "blocks at or above the size cutoff produced no candidates"
            );
        }
        tracing::debug!(pairs = pairs.len(), "generated candidate pairs");

        Candidates { pairs, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractError;
    use linkage_core::{Record, RecordId, RecordTable, Schema};

    /// Build an index where row `i` gets key `keys[i]`.
    fn index(keys: &[&str]) -> BlockIndex {
        let mut t = RecordTable::new(Schema::new(["id", "key"]).unwrap());
        for (i, key) in keys.iter().enumerate() {
            t.push(Record::new(
                RecordId::Int(i as i64),
                vec![Some(i.to_string()), Some((*key).to_string())],
            ))
            .unwrap();
        }
        let field = t.field("key").unwrap();
        let ex = move |r: &Record| -> Result<Vec<String>, ExtractError> {
            Ok(r.get(field).map(|k| vec![k.to_string()]).unwrap_or_default())
        };
        BlockIndex::build(&t, &ex).unwrap()
    }

    #[test]
    fn test_all_pairs_within_block() {
        let blocks = index(&["a", "a", "b", "a", "b"]);
        let c = CandidateGenerator::default().generate(&blocks);
        let pairs: Vec<(usize, usize)> = c.pairs.iter().map(|p| (p.left, p.right)).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 3), (1, 3), (2, 4)]);
        let seqs: Vec<usize> = c.pairs.iter().map(|p| p.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
        assert_eq!(c.stats.blocks_expanded, 2);
    }

    #[test]
    fn test_block_at_cutoff_is_skipped() {
        let keys = vec!["big"; 150];
        let blocks = index(&keys);
        let c = CandidateGenerator::new(100).generate(&blocks);
        assert!(c.is_empty());
        assert_eq!(c.stats.blocks_skipped, 1);
        assert_eq!(c.stats.records_skipped, 150);

        let keys = vec!["edge"; 3];
        let c = CandidateGenerator::new(3).generate(&index(&keys));
        assert!(c.is_empty());
        let c = CandidateGenerator::new(4).generate(&index(&keys));
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn test_singletons_yield_nothing() {
        let blocks = index(&["a", "b", "c"]);
        let c = CandidateGenerator::default().generate(&blocks);
        assert!(c.is_empty());
        assert_eq!(c.stats.blocks_expanded, 3);
    }

    #[test]
    fn test_estimate_matches_generate() {
        let mut keys = vec!["x"; 7];
        keys.extend(vec!["y"; 4]);
        keys.extend(vec!["z"; 12]);
        let blocks = index(&keys);
        let generator = CandidateGenerator::new(10);
        assert_eq!(generator.estimate(&blocks), 21 + 6);
        assert_eq!(generator.generate(&blocks).len(), 27);
    }

    #[test]
    fn test_pairs_unique() {
        let keys: Vec<&str> = (0..60).map(|i| if i % 3 == 0 { "p" } else { "q" }).collect();
        let c = CandidateGenerator::default().generate(&index(&keys));
        let mut seen = std::collections::HashSet::new();
        for p in &c.pairs {
            assert!(p.left < p.right);
            assert!(seen.insert((p.left, p.right)));
        }
    }
}
