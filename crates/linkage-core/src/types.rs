//! Common types for linkage.
//!
//! Records are positional: a [`Schema`] maps column names to positions once,
//! and every later access goes through a resolved [`FieldRef`].

use crate::error::{LinkageError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable identifier of a record.
///
/// Integer ids sort before textual ids; within a variant the natural
/// ordering applies.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Numeric identifier
    Int(i64),
    /// Textual identifier
    Text(String),
}

impl RecordId {
    /// Parse a raw cell, taking the integer form only when it prints back
    /// as the same text (`"7"` is `Int`, `"007"` and `"+7"` are `Text`).
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::parse_as(raw, IdKind::Int)
    }

    /// Parse a raw cell as an id of the given column kind.
    ///
    /// Under [`IdKind::Int`] a cell that is not a canonical integer stays
    /// `Text`, so it can never alias an integer id.
    #[must_use]
    pub fn parse_as(raw: &str, kind: IdKind) -> Self {
        let trimmed = raw.trim();
        match kind {
            IdKind::Int => match canonical_int(trimmed) {
                Some(n) => Self::Int(n),
                None => Self::Text(trimmed.to_string()),
            },
            IdKind::Text => Self::Text(trimmed.to_string()),
        }
    }
}

fn canonical_int(text: &str) -> Option<i64> {
    let n = text.parse::<i64>().ok()?;
    (n.to_string() == text).then_some(n)
}

/// How the ids of one column are typed.
///
/// Decided once per id column so that every id keeps its exact text:
/// integers only when every id is a canonical integer, text otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdKind {
    #[default]
    Int,
    Text,
}

impl IdKind {
    /// Kind of a column holding `raw` ids. An empty column is `Int`.
    pub fn detect<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let all_int = raw
            .into_iter()
            .all(|id| canonical_int(id.as_ref().trim()).is_some());
        if all_int {
            Self::Int
        } else {
            Self::Text
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Resolved position of a column within a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef(usize);

impl FieldRef {
    /// Position of the column.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Ordered column names of a record table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Schema {
    /// Create a schema from column names. Names must be unique.
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut positions = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if positions.insert(name.clone(), i).is_some() {
                return Err(LinkageError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self { columns, positions })
    }

    /// Resolve a column name.
    pub fn field(&self, name: &str) -> Result<FieldRef> {
        self.positions
            .get(name)
            .map(|&i| FieldRef(i))
            .ok_or_else(|| LinkageError::MissingColumn(name.to_string()))
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A single immutable record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: RecordId,
    values: Vec<Option<String>>,
}

impl Record {
    /// Create a record. `None` marks a missing value.
    #[must_use]
    pub fn new(id: RecordId, values: Vec<Option<String>>) -> Self {
        Self { id, values }
    }

    /// The record's identifier.
    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Value of a field, `None` when missing.
    #[must_use]
    pub fn get(&self, field: FieldRef) -> Option<&str> {
        self.values.get(field.0).and_then(|v| v.as_deref())
    }

    /// Number of values carried.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.values.len()
    }
}

/// Records sharing one schema, in ingestion (row) order.
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    schema: Schema,
    records: Vec<Record>,
    rows_by_id: HashMap<RecordId, usize>,
}

impl RecordTable {
    /// Create an empty table.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            records: Vec::new(),
            rows_by_id: HashMap::new(),
        }
    }

    /// Append a record, validating arity and id uniqueness.
    ///
    /// Returns the row index of the new record.
    pub fn push(&mut self, record: Record) -> Result<usize> {
        if record.arity() != self.schema.len() {
            return Err(LinkageError::InvalidFormat(format!(
                "record {} has {} values, schema has {} columns",
                record.id,
                record.arity(),
                self.schema.len()
            )));
        }
        let row = self.records.len();
        if self.rows_by_id.contains_key(&record.id) {
            return Err(LinkageError::DuplicateId(record.id.to_string()));
        }
        self.rows_by_id.insert(record.id.clone(), row);
        self.records.push(record);
        Ok(row)
    }

    /// The table's schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Resolve a column name against the schema.
    pub fn field(&self, name: &str) -> Result<FieldRef> {
        self.schema.field(name)
    }

    /// All records in row order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Record at a row index.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    /// Row index of a record id.
    #[must_use]
    pub fn row_of(&self, id: &RecordId) -> Option<usize> {
        self.rows_by_id.get(id).copied()
    }

    /// `Text` as soon as any record carries a textual id.
    #[must_use]
    pub fn id_kind(&self) -> IdKind {
        if self.records.iter().all(|r| matches!(r.id, RecordId::Int(_))) {
            IdKind::Int
        } else {
            IdKind::Text
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the table holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
