//! Block index construction.
//!
//! Every record is reduced to a single composite [`BlockKey`] built from its
//! extracted tokens. Records sharing a key form a block; since each record
//! has at most one key, no pair can appear in two blocks.

use crate::extract::{ExtractError, KeyExtractor};
use indexmap::IndexMap;
use linkage_core::RecordTable;
use std::collections::BTreeSet;
use std::fmt;

/// Separator between tokens of a composite key.
pub const KEY_SEPARATOR: &str = " ";

/// Canonical composite blocking key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey(String);

impl BlockKey {
    /// Build a key from raw tokens: lower-cased, trimmed, deduplicated,
    /// sorted and joined. Returns `None` when no non-empty token remains.
    pub fn from_tokens<I, S>(tokens: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if set.is_empty() {
            return None;
        }
        let parts: Vec<&str> = set.iter().map(String::as_str).collect();
        Some(Self(parts.join(KEY_SEPARATOR)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mapping from block key to member row indices.
///
/// Keys iterate in first-seen order; members are in row order.
#[derive(Debug, Clone, Default)]
pub struct BlockIndex {
    blocks: IndexMap<BlockKey, Vec<usize>>,
    unblocked: usize,
}

impl BlockIndex {
    /// Build the index for every record of `table`.
    ///
    /// Records without tokens are counted as unblocked and dropped. An
    /// extractor error aborts the build.
    pub fn build(
        table: &RecordTable,
        extractor: &dyn KeyExtractor,
    ) -> Result<Self, ExtractError> {
        let mut index = Self::default();
        for (row, record) in table.records().iter().enumerate() {
            let tokens = extractor.extract(record)?;
            match BlockKey::from_tokens(&tokens) {
                Some(key) => index.blocks.entry(key).or_default().push(row),
                None => index.unblocked += 1,
            }
        }

        tracing::debug!(
            records = table.len(),
            blocks = index.blocks.len(),
            unblocked = index.unblocked,
            "built block index"
        );
        Ok(index)
    }

    /// Iterate blocks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&BlockKey, &[usize])> {
        self.blocks.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Members of a block.
    #[must_use]
    pub fn get(&self, key: &BlockKey) -> Option<&[usize]> {
        self.blocks.get(key).map(Vec::as_slice)
    }

    /// Number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Records that produced no key.
    #[must_use]
    pub fn unblocked(&self) -> usize {
        self.unblocked
    }

    /// Records that landed in some block.
    #[must_use]
    pub fn blocked(&self) -> usize {
        self.blocks.values().map(Vec::len).sum()
    }

    /// Size of the largest block.
    #[must_use]
    pub fn largest(&self) -> usize {
        self.blocks.values().map(Vec::len).max().unwrap_or(0)
    }
}
