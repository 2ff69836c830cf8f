//! # linkage-core
//!
//! Core infrastructure for linkage tools.
//!
//! Provides shared abstractions for:
//! - Typed records (`RecordId`, `Schema`, `FieldRef`, `Record`, `RecordTable`)
//! - Content hashing (xxhash, blake3)
//! - The common error type

pub mod error;
pub mod hashing;
pub mod types;

pub use error::{LinkageError, Result};
pub use hashing::{Blake3Hasher, HashFunction, XxHash3};
pub use types::{FieldRef, IdKind, Record, RecordId, RecordTable, Schema};
