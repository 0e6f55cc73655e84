//! Shard storage capability.
//!
//! A shard is one hierarchical data file whose columns are addressed by
//! `/`-separated key paths such as `SED/ap_dust/total`. The catalog core only
//! needs three things from storage: list the shards of a directory matching a
//! file-name pattern, open a shard, and read a column by key. Closing is tied to
//! the lifetime of the [`ShardHandle`], so a shard is released as soon as the
//! handle goes out of scope, whether or not the reads succeeded.

mod json;
mod memory;

pub use json::JsonShardStore;
pub use memory::MemoryShardStore;

use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::error::{CatalogError, Result};
use crate::filter_name::FilterName;
use crate::table::SkyId;

/// Raw column data read from a shard.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Integer values.
    Int(Vec<i64>),
    /// Floating point values, `NaN` where missing.
    Float(Vec<f64>),
    /// Text values.
    Text(Vec<String>),
    /// Byte-string values.
    Bytes(Vec<Vec<u8>>),
    /// Two-dimensional floating point block.
    Matrix(Array2<f64>),
    /// A column with no entries, whose element type cannot be told.
    Empty,
}

impl Column {
    /// Short name of the column kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Column::Int(_) => "int",
            Column::Float(_) => "float",
            Column::Text(_) => "text",
            Column::Bytes(_) => "bytes",
            Column::Matrix(_) => "matrix",
            Column::Empty => "empty",
        }
    }

    /// Number of entries (rows for a matrix).
    pub fn len(&self) -> usize {
        match self {
            Column::Int(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Text(v) => v.len(),
            Column::Bytes(v) => v.len(),
            Column::Matrix(m) => m.nrows(),
            Column::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Interpret the column as object identifiers.
    ///
    /// Floating point ids are common in files that mix ids with other columns;
    /// `NaN` and infinities become `None` instead of a bogus integer.
    pub fn into_ids(self) -> Option<Vec<Option<SkyId>>> {
        match self {
            Column::Int(v) => Some(v.into_iter().map(Some).collect()),
            Column::Float(v) => Some(
                v.into_iter()
                    .map(|x| if x.is_finite() { Some(x as SkyId) } else { None })
                    .collect(),
            ),
            Column::Empty => Some(Vec::new()),
            _ => None,
        }
    }

    /// Interpret the column as floating point values.
    pub fn into_floats(self) -> Option<Vec<f64>> {
        match self {
            Column::Int(v) => Some(v.into_iter().map(|x| x as f64).collect()),
            Column::Float(v) => Some(v),
            Column::Empty => Some(Vec::new()),
            _ => None,
        }
    }

    /// Interpret the column as a two-dimensional block.
    pub fn into_matrix(self) -> Option<Array2<f64>> {
        match self {
            Column::Matrix(m) => Some(m),
            Column::Empty => Some(Array2::zeros((0, 0))),
            _ => None,
        }
    }

    /// Decode the column as filter names, accepting text or byte strings.
    pub fn into_filter_names(self) -> Option<Result<Vec<FilterName>>> {
        match self {
            Column::Text(v) => Some(Ok(v.into_iter().map(FilterName::from).collect())),
            Column::Bytes(v) => Some(v.iter().map(|b| FilterName::from_bytes(b)).collect()),
            Column::Empty => Some(Ok(Vec::new())),
            _ => None,
        }
    }
}

/// An open shard. Dropping the handle closes it.
pub trait ShardHandle {
    /// Path the shard was opened from.
    fn path(&self) -> &Path;

    /// Read the column stored under `key`.
    fn read_column(&self, key: &str) -> Result<Column>;

    /// Read an identifier column.
    fn read_ids(&self, key: &str) -> Result<Vec<Option<SkyId>>> {
        let column = self.read_column(key)?;
        let found = column.kind();
        column
            .into_ids()
            .ok_or_else(|| type_error(self, key, "int or float", found))
    }

    /// Read a numeric column as floats.
    fn read_floats(&self, key: &str) -> Result<Vec<f64>> {
        let column = self.read_column(key)?;
        let found = column.kind();
        column
            .into_floats()
            .ok_or_else(|| type_error(self, key, "int or float", found))
    }

    /// Read a two-dimensional block.
    fn read_matrix(&self, key: &str) -> Result<Array2<f64>> {
        let column = self.read_column(key)?;
        let found = column.kind();
        column
            .into_matrix()
            .ok_or_else(|| type_error(self, key, "matrix", found))
    }

    /// Read a column of filter names.
    fn read_filter_names(&self, key: &str) -> Result<Vec<FilterName>> {
        let column = self.read_column(key)?;
        let found = column.kind();
        column
            .into_filter_names()
            .ok_or_else(|| type_error(self, key, "text or bytes", found))?
    }
}

fn type_error<H: ShardHandle + ?Sized>(
    handle: &H,
    key: &str,
    expected: &'static str,
    found: &'static str,
) -> CatalogError {
    CatalogError::ColumnType {
        shard: handle.path().to_path_buf(),
        key: key.to_string(),
        expected,
        found,
    }
}

/// Access to a collection of shards.
pub trait ShardStore {
    /// Shards in `dir` whose file name matches the glob `pattern`, sorted by path.
    fn list(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>>;

    /// Open one shard for reading.
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn ShardHandle + 'a>>;
}

/// Compile a file-name glob, mapping failures into [`CatalogError::InvalidPattern`].
pub(crate) fn compile_pattern(pattern: &str) -> Result<glob::Pattern> {
    glob::Pattern::new(pattern).map_err(|e| CatalogError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}
