//! Exact duplicate detection by content hash.
//!
//! Records whose selected fields are byte-identical hash to the same digest.
//! Each later record is paired with the first record carrying its digest.

use crate::rank::IdPair;
use linkage_core::{FieldRef, HashFunction, LinkageError, RecordTable};
use std::collections::HashMap;

/// Finds exact duplicates over a fixed list of fields.
pub struct ExactDuplicateFinder<H: HashFunction> {
    hasher: H,
    fields: Vec<FieldRef>,
}

impl<H: HashFunction> ExactDuplicateFinder<H> {
    /// Resolve `fields` against the table's schema.
    pub fn new(hasher: H, table: &RecordTable, fields: &[&str]) -> Result<Self, LinkageError> {
        if fields.is_empty() {
            return Err(LinkageError::Config(
                "exact duplicate detection needs at least one field".to_string(),
            ));
        }
        let fields = fields
            .iter()
            .map(|name| table.field(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { hasher, fields })
    }

    /// Duplicate pairs in encounter order, canonicalized.
    #[must_use]
    pub fn find(&self, table: &RecordTable) -> Vec<IdPair> {
        let mut first_seen: HashMap<Vec<u8>, usize> = HashMap::new();
        let mut pairs = Vec::new();

        for (row, record) in table.records().iter().enumerate() {
            let parts: Vec<Option<&str>> = self.fields.iter().map(|&f| record.get(f)).collect();
            let digest = self.hasher.hash_fields(&parts);
            match first_seen.get(&digest) {
                Some(&original) => {
                    let original = &table.records()[original];
                    pairs.push(IdPair::canonical(original.id().clone(), record.id().clone()));
                }
                None => {
                    first_seen.insert(digest, row);
                }
            }
        }

        tracing::debug!(
            records = table.len(),
            distinct = first_seen.len(),
            duplicates = pairs.len(),
            "exact duplicate scan"
        );
        pairs
    }
}
