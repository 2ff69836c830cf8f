//! File I/O for record tables and id-pair lists.
//!
//! Records come from CSV (header row required) or JSONL (one object per
//! line). Pair lists, both produced matches and ground truth, are CSV files
//! with `lid` and `rid` columns.

use crate::rank::IdPair;
use indexmap::IndexSet;
use linkage_core::{IdKind, LinkageError, Record, RecordId, RecordTable, Schema};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during I/O operations.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Field '{field}' missing or empty at line {line}")]
    MissingField { field: String, line: usize },

    #[error("Column '{column}' not found in header")]
    ColumnNotFound { column: String },

    #[error(transparent)]
    Table(#[from] LinkageError),
}

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, IoError>;

/// Supported record file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Jsonl,
}

impl InputFormat {
    /// Detect the format from a file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            _ => None,
        }
    }
}

/// Read a record table in the given format.
pub fn read_records<P: AsRef<Path>>(
    path: P,
    format: InputFormat,
    id_field: &str,
) -> Result<RecordTable> {
    match format {
        InputFormat::Csv => read_csv(path, id_field),
        InputFormat::Jsonl => read_jsonl(path, id_field),
    }
}

/// Read records from a CSV file with a header row.
///
/// Empty cells are missing values. Every row must carry a non-empty id.
/// The id kind is decided over the whole column (see [`IdKind`]), so ids
/// keep their exact text.
pub fn read_csv<P: AsRef<Path>>(path: P, id_field: &str) -> Result<RecordTable> {
    let mut reader = csv::ReaderBuilder::new().from_path(path)?;
    let headers = reader.headers()?.clone();
    let schema = Schema::new(headers.iter())?;
    let id_pos = schema
        .field(id_field)
        .map_err(|_| IoError::ColumnNotFound {
            column: id_field.to_string(),
        })?
        .index();

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map_or(0, |p| p.line() as usize);
        match row.get(id_pos).map(str::trim) {
            Some(raw) if !raw.is_empty() => {}
            _ => {
                return Err(IoError::MissingField {
                    field: id_field.to_string(),
                    line,
                })
            }
        }
        rows.push(row);
    }

    let kind = IdKind::detect(rows.iter().filter_map(|row| row.get(id_pos)));
    let mut table = RecordTable::new(schema);
    for row in &rows {
        let id = RecordId::parse_as(row.get(id_pos).unwrap_or_default(), kind);
        let values = row
            .iter()
            .map(|v| (!v.is_empty()).then(|| v.to_string()))
            .collect();
        table.push(Record::new(id, values))?;
    }

    tracing::debug!(
        records = table.len(),
        columns = table.schema().len(),
        id_kind = ?kind,
        "read CSV records"
    );
    Ok(table)
}

/// Read records from a JSONL file.
///
/// The schema is the union of keys in first-seen order; keys absent from a
/// line and JSON `null` are missing values. Non-string scalars are
/// stringified. Ids may be JSON integers or strings; as with CSV, the id
/// kind is decided over the whole file.
pub fn read_jsonl<P: AsRef<Path>>(path: P, id_field: &str) -> Result<RecordTable> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut objects = Vec::new();
    let mut columns: IndexSet<String> = IndexSet::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value =
            serde_json::from_str(&line).map_err(|e| IoError::Parse {
                line: line_num + 1,
                message: e.to_string(),
            })?;
        let serde_json::Value::Object(map) = value else {
            return Err(IoError::Parse {
                line: line_num + 1,
                message: "expected a JSON object".to_string(),
            });
        };
        let raw_id = match map.get(id_field) {
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => {
                return Err(IoError::MissingField {
                    field: id_field.to_string(),
                    line: line_num + 1,
                })
            }
        };
        for key in map.keys() {
            if !columns.contains(key) {
                columns.insert(key.clone());
            }
        }
        objects.push((raw_id, map));
    }

    if objects.is_empty() {
        columns.insert(id_field.to_string());
    }
    let schema = Schema::new(columns.iter().cloned())?;
    let kind = IdKind::detect(objects.iter().map(|(raw, _)| raw));
    let mut table = RecordTable::new(schema);

    for (raw_id, map) in &objects {
        let values = columns
            .iter()
            .map(|c| map.get(c).and_then(json_cell))
            .collect();
        table.push(Record::new(RecordId::parse_as(raw_id, kind), values))?;
    }

    tracing::debug!(
        records = table.len(),
        columns = table.schema().len(),
        id_kind = ?kind,
        "read JSONL records"
    );
    Ok(table)
}

fn json_cell(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Raw `lid,rid` cells of a pair file, in file order.
fn read_raw_pairs<P: AsRef<Path>>(path: P) -> Result<Vec<(String, String)>> {
    let mut reader = csv::ReaderBuilder::new().from_path(path)?;
    let headers = reader.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| IoError::ColumnNotFound {
                column: name.to_string(),
            })
    };
    let lid_pos = position("lid")?;
    let rid_pos = position("rid")?;

    let mut pairs = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map_or(0, |p| p.line() as usize);
        let cell = |pos: usize, name: &str| match row.get(pos).map(str::trim) {
            Some(raw) if !raw.is_empty() => Ok(raw.to_string()),
            _ => Err(IoError::MissingField {
                field: name.to_string(),
                line,
            }),
        };
        pairs.push((cell(lid_pos, "lid")?, cell(rid_pos, "rid")?));
    }
    Ok(pairs)
}

fn to_id_pairs(raw: Vec<(String, String)>, kind: IdKind) -> Vec<IdPair> {
    raw.into_iter()
        .map(|(lid, rid)| IdPair {
            lid: RecordId::parse_as(&lid, kind),
            rid: RecordId::parse_as(&rid, kind),
        })
        .collect()
}

fn raw_kind(files: &[&[(String, String)]]) -> IdKind {
    IdKind::detect(
        files
            .iter()
            .flat_map(|pairs| pairs.iter())
            .flat_map(|(l, r)| [l, r]),
    )
}

/// Read `lid,rid` pairs in file order and as given, typing ids with the
/// `kind` of the record table they refer to.
pub fn read_pairs_as<P: AsRef<Path>>(path: P, kind: IdKind) -> Result<Vec<IdPair>> {
    Ok(to_id_pairs(read_raw_pairs(path)?, kind))
}

/// Read `lid,rid` pairs, deciding the id kind from the file itself.
pub fn read_pairs<P: AsRef<Path>>(path: P) -> Result<Vec<IdPair>> {
    let raw = read_raw_pairs(path)?;
    let kind = raw_kind(&[raw.as_slice()]);
    Ok(to_id_pairs(raw, kind))
}

/// Read a matched-pairs file and a ground-truth file with one shared id
/// kind, so the same id text compares equal on both sides.
pub fn read_pair_files<P: AsRef<Path>, Q: AsRef<Path>>(
    matched: P,
    truth: Q,
) -> Result<(Vec<IdPair>, Vec<IdPair>)> {
    let matched = read_raw_pairs(matched)?;
    let truth = read_raw_pairs(truth)?;
    let kind = raw_kind(&[matched.as_slice(), truth.as_slice()]);
    Ok((to_id_pairs(matched, kind), to_id_pairs(truth, kind)))
}

/// Write pairs as `lid,rid` CSV to any writer.
pub fn write_pairs<W: Write>(writer: W, pairs: &[IdPair]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["lid", "rid"])?;
    for pair in pairs {
        csv_writer.write_record([pair.lid.to_string(), pair.rid.to_string()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write pairs as `lid,rid` CSV to a file.
pub fn write_pairs_csv<P: AsRef<Path>>(path: P, pairs: &[IdPair]) -> Result<()> {
    let file = File::create(path)?;
    write_pairs(BufWriter::new(file), pairs)
}
