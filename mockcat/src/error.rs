//! Error types for catalog assembly.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::table::SkyId;

/// Errors produced while resolving filters, reading shards and joining tables.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Underlying filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Original error.
        source: std::io::Error,
    },

    /// A shard naming pattern could not be compiled.
    #[error("invalid shard pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A shard could not be decoded at all.
    #[error("malformed shard {shard}: {message}")]
    MalformedShard { shard: PathBuf, message: String },

    /// A key path does not exist in a shard.
    #[error("shard {shard} has no column '{key}'")]
    MissingColumn { shard: PathBuf, key: String },

    /// A column exists but holds the wrong kind of data.
    #[error("column '{key}' in {shard} is {found}, expected {expected}")]
    ColumnType {
        shard: PathBuf,
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Array dimensions inside one shard disagree with each other.
    #[error("shape mismatch in {shard}: {message}")]
    ShapeMismatch { shard: PathBuf, message: String },

    /// A filter name could not be decoded from its byte representation.
    #[error("invalid filter name: {0}")]
    InvalidFilterName(String),

    /// No representative shard lists the requested filter.
    #[error("filter '{filter}' not found in any representative shard")]
    FilterNotFound { filter: String },

    /// More than one shard group lists the requested filter.
    #[error("filter '{filter}' is provided by several shard groups: {}", .groups.join(", "))]
    AmbiguousFilter { filter: String, groups: Vec<String> },

    /// A member shard of a resolved group lacks a filter its representative listed.
    #[error("filter '{filter}' missing from {shard} although its group was resolved for it")]
    FilterMissingInGroup { filter: String, shard: PathBuf },

    /// Two tables expected to describe the same objects diverge.
    #[error("identifier mismatch: {0}")]
    IdentifierMismatch(IdMismatch),

    /// A resolved shard-group pattern expanded to no member shards.
    #[error("shard group '{pattern}' matched no shards")]
    EmptyGroupResult { pattern: String },

    /// A text table does not start with the expected identifier column.
    #[error("{path}: header starts with '{found}', expected '{expected}'")]
    MalformedHeader {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// A table column does not have one value per row.
    #[error("column '{column}' has {found} values, table has {expected} rows")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    /// Two tables cannot be stacked because their columns differ.
    #[error("cannot append tables with different columns: {0}")]
    ColumnLayout(String),

    /// A named column is not present in a table.
    #[error("no column named '{0}'")]
    UnknownColumn(String),

    /// A text table row could not be parsed.
    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// The configuration could not be loaded or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Discovery found no representative shard while at least one was required.
    #[error("no representative shards in {0}")]
    NoRepresentatives(PathBuf),
}

/// Describes how two identifier sequences diverge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdMismatch {
    /// The sequences have different lengths.
    Length { left: usize, right: usize },
    /// The sequences first differ at `index`.
    Position {
        index: usize,
        left: Option<SkyId>,
        right: Option<SkyId>,
    },
    /// An id on the left has no counterpart on the right.
    Missing { id: Option<SkyId> },
    /// An id appears more than once where ids must be unique.
    Duplicate { id: SkyId },
}

fn fmt_id(id: &Option<SkyId>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => "null".to_string(),
    }
}

impl fmt::Display for IdMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdMismatch::Length { left, right } => {
                write!(f, "length {left} != {right}")
            }
            IdMismatch::Position { index, left, right } => write!(
                f,
                "first difference at position {index}: {} != {}",
                fmt_id(left),
                fmt_id(right)
            ),
            IdMismatch::Missing { id } => {
                write!(f, "id {} has no counterpart", fmt_id(id))
            }
            IdMismatch::Duplicate { id } => write!(f, "id {id} appears more than once"),
        }
    }
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
