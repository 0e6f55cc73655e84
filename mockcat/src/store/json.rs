//! File-backed shards stored as hierarchical JSON documents.
//!
//! Nested objects play the role of groups and arrays are columns:
//!
//! ```text
//! {
//!   "id_galaxy_sky": [101, 102, null],
//!   "filters": ["u_VST", "g_VST"],
//!   "SED": { "ap_dust": { "total": [[21.3, 22.0, 23.1], [20.9, 21.4, 22.8]] } }
//! }
//! ```
//!
//! Arrays of arrays decode as matrices and `null` decodes as `NaN`. An empty
//! array decodes as [`Column::Empty`].

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde_json::Value;

use super::{Column, ShardHandle, ShardStore};
use crate::error::{CatalogError, Result};

/// Shards on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct JsonShardStore;

impl JsonShardStore {
    pub fn new() -> Self {
        Self
    }
}

impl ShardStore for JsonShardStore {
    fn list(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        super::compile_pattern(pattern)?;
        let escaped_dir = glob::Pattern::escape(&dir.to_string_lossy());
        let full = Path::new(&escaped_dir).join(pattern);
        let full = full.to_string_lossy();

        let entries = glob::glob(&full).map_err(|e| CatalogError::InvalidPattern {
            pattern: full.to_string(),
            message: e.to_string(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                CatalogError::io(path, e.into())
            })?;
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn ShardHandle + 'a>> {
        log::debug!("opening shard {}", path.display());
        let text = fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
        let root: Value = serde_json::from_str(&text).map_err(|e| CatalogError::MalformedShard {
            shard: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Box::new(JsonShard {
            path: path.to_path_buf(),
            root,
        }))
    }
}

struct JsonShard {
    path: PathBuf,
    root: Value,
}

impl JsonShard {
    fn malformed(&self, key: &str, message: impl Into<String>) -> CatalogError {
        CatalogError::MalformedShard {
            shard: self.path.clone(),
            message: format!("column '{key}': {}", message.into()),
        }
    }

    fn lookup(&self, key: &str) -> Result<&Value> {
        let mut node = &self.root;
        for part in key.split('/').filter(|p| !p.is_empty()) {
            node = node.get(part).ok_or_else(|| CatalogError::MissingColumn {
                shard: self.path.clone(),
                key: key.to_string(),
            })?;
        }
        Ok(node)
    }

    fn decode(&self, key: &str, values: &[Value]) -> Result<Column> {
        if values.is_empty() {
            return Ok(Column::Empty);
        }

        if values.iter().all(|v| v.is_string()) {
            let text = values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            return Ok(Column::Text(text));
        }

        if values.iter().all(|v| v.is_array()) {
            return self.decode_matrix(key, values);
        }

        if values.iter().all(Value::is_i64) {
            return Ok(Column::Int(values.iter().filter_map(Value::as_i64).collect()));
        }

        let floats = values
            .iter()
            .map(|v| self.decode_float(key, v))
            .collect::<Result<Vec<_>>>()?;
        Ok(Column::Float(floats))
    }

    fn decode_float(&self, key: &str, value: &Value) -> Result<f64> {
        match value {
            Value::Null => Ok(f64::NAN),
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| self.malformed(key, format!("{n} is not representable as f64"))),
            other => Err(self.malformed(key, format!("unexpected element {other}"))),
        }
    }

    fn decode_matrix(&self, key: &str, rows: &[Value]) -> Result<Column> {
        let mut width = None;
        let mut data = Vec::new();
        for row in rows {
            let row = row.as_array().map(Vec::as_slice).unwrap_or_default();
            match width {
                None => width = Some(row.len()),
                Some(w) if w != row.len() => {
                    return Err(self.malformed(
                        key,
                        format!("ragged matrix rows ({w} and {} entries)", row.len()),
                    ))
                }
                Some(_) => {}
            }
            for value in row {
                data.push(self.decode_float(key, value)?);
            }
        }

        let shape = (rows.len(), width.unwrap_or(0));
        let matrix = Array2::from_shape_vec(shape, data)
            .map_err(|e| self.malformed(key, e.to_string()))?;
        Ok(Column::Matrix(matrix))
    }
}

impl ShardHandle for JsonShard {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_column(&self, key: &str) -> Result<Column> {
        match self.lookup(key)? {
            Value::Array(values) => self.decode(key, values),
            Value::Object(_) => Err(CatalogError::ColumnType {
                shard: self.path.clone(),
                key: key.to_string(),
                expected: "column",
                found: "group",
            }),
            _ => Err(CatalogError::ColumnType {
                shard: self.path.clone(),
                key: key.to_string(),
                expected: "column",
                found: "scalar",
            }),
        }
    }
}
