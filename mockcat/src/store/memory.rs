//! In-memory shards for synthetic fixtures.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Column, ShardHandle, ShardStore};
use crate::error::{CatalogError, Result};

/// A shard store held entirely in memory.
///
/// Keeps a count of how many times shards were opened so callers can check
/// that a build touches each shard as few times as expected.
#[derive(Debug, Default)]
pub struct MemoryShardStore {
    shards: BTreeMap<PathBuf, BTreeMap<String, Column>>,
    opens: AtomicUsize,
}

impl MemoryShardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a shard with the given columns.
    pub fn insert_shard<P, I, K>(&mut self, path: P, columns: I)
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = (K, Column)>,
        K: Into<String>,
    {
        let columns = columns.into_iter().map(|(k, c)| (k.into(), c)).collect();
        self.shards.insert(path.into(), columns);
    }

    /// Add one column to a shard, creating the shard if needed.
    pub fn insert_column(&mut self, path: impl Into<PathBuf>, key: impl Into<String>, column: Column) {
        self.shards
            .entry(path.into())
            .or_default()
            .insert(key.into(), column);
    }

    /// Number of shards held.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Total number of `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::Relaxed)
    }
}

impl ShardStore for MemoryShardStore {
    fn list(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = super::compile_pattern(pattern)?;
        Ok(self
            .shards
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .filter(|path| {
                path.file_name()
                    .map(|name| pattern.matches(&name.to_string_lossy()))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn ShardHandle + 'a>> {
        let columns = self.shards.get(path).ok_or_else(|| {
            CatalogError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such shard"),
            )
        })?;
        self.opens.fetch_add(1, Ordering::Relaxed);
        log::debug!("opening in-memory shard {}", path.display());
        Ok(Box::new(MemoryShard {
            path: path.to_path_buf(),
            columns,
        }))
    }
}

struct MemoryShard<'a> {
    path: PathBuf,
    columns: &'a BTreeMap<String, Column>,
}

impl ShardHandle for MemoryShard<'_> {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_column(&self, key: &str) -> Result<Column> {
        self.columns
            .get(key)
            .cloned()
            .ok_or_else(|| CatalogError::MissingColumn {
                shard: self.path.clone(),
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_only_matches_direct_children() {
        let mut store = MemoryShardStore::new();
        store.insert_column("/data/a_SED_00.hdf5", "filters", Column::Text(vec![]));
        store.insert_column("/data/a_SED_01.hdf5", "filters", Column::Text(vec![]));
        store.insert_column("/data/nested/b_SED_00.hdf5", "filters", Column::Text(vec![]));

        let listed = store.list(Path::new("/data"), "*SED*00.hdf5").unwrap();
        assert_eq!(listed, vec![PathBuf::from("/data/a_SED_00.hdf5")]);
    }

    #[test]
    fn test_open_counts_and_missing_columns() {
        let mut store = MemoryShardStore::new();
        store.insert_shard("/d/x.hdf5", [("ids", Column::Int(vec![1, 2]))]);

        {
            let shard = store.open(Path::new("/d/x.hdf5")).unwrap();
            assert_eq!(shard.read_ids("ids").unwrap(), vec![Some(1), Some(2)]);
            assert!(matches!(
                shard.read_column("nope"),
                Err(CatalogError::MissingColumn { .. })
            ));
        }
        assert_eq!(store.open_count(), 1);
        assert!(store.open(Path::new("/d/y.hdf5")).is_err());
        assert_eq!(store.open_count(), 1);
    }

    #[test]
    fn test_invalid_pattern() {
        let store = MemoryShardStore::new();
        assert!(matches!(
            store.list(Path::new("/d"), "[unclosed"),
            Err(CatalogError::InvalidPattern { .. })
        ));
    }
}
