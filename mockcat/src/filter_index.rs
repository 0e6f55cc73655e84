//! Discovery of the filters available in a directory of SED shards.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::{SedLayout, ShardNaming};
use crate::error::Result;
use crate::filter_name::FilterName;
use crate::shard_group::{representatives, ShardGroup};
use crate::store::ShardStore;

/// Filters listed by one representative shard.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub representative: PathBuf,
    pub group: ShardGroup,
    pub filters: Vec<FilterName>,
}

impl IndexEntry {
    pub fn contains(&self, filter: &FilterName) -> bool {
        self.filters.contains(filter)
    }
}

/// Filter membership of every shard group in a directory.
///
/// Built by opening each representative shard exactly once. Entries keep the
/// representative scan order, which every lookup follows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterIndex {
    entries: Vec<IndexEntry>,
}

impl FilterIndex {
    pub fn build<S: ShardStore + ?Sized>(
        store: &S,
        dir: &Path,
        naming: &ShardNaming,
        layout: &SedLayout,
    ) -> Result<Self> {
        let mut entries = Vec::new();
        for representative in representatives(store, dir, naming)? {
            let group = ShardGroup::from_representative(&representative, naming)?;
            let filters = {
                let shard = store.open(&representative)?;
                shard.read_filter_names(&layout.filters_key)?
            };
            log::debug!(
                "{} lists {} filters for group {}",
                representative.display(),
                filters.len(),
                group
            );
            entries.push(IndexEntry {
                representative,
                group,
                filters,
            });
        }
        log::info!("indexed {} shard groups in {}", entries.len(), dir.display());
        Ok(Self { entries })
    }

    /// Build directly from entries, in scan order.
    pub fn from_entries(entries: Vec<IndexEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct filter names, in order of first appearance across the scan.
    pub fn discover(&self) -> Vec<FilterName> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .flat_map(|entry| entry.filters.iter())
            .filter(|name| seen.insert(*name))
            .cloned()
            .collect()
    }

    /// Groups whose representative lists `filter`, in scan order.
    pub fn candidates(&self, filter: &FilterName) -> Vec<&ShardGroup> {
        self.entries
            .iter()
            .filter(|entry| entry.contains(filter))
            .map(|entry| &entry.group)
            .collect()
    }
}

/// Distinct filter names available in `dir`, in first-seen order.
pub fn discover<S: ShardStore + ?Sized>(
    store: &S,
    dir: &Path,
    naming: &ShardNaming,
    layout: &SedLayout,
) -> Result<Vec<FilterName>> {
    Ok(FilterIndex::build(store, dir, naming, layout)?.discover())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::store::{Column, MemoryShardStore};

    fn text(names: &[&str]) -> Column {
        Column::Text(names.iter().map(|s| s.to_string()).collect())
    }

    fn names(filters: &[FilterName]) -> Vec<&str> {
        filters.iter().map(FilterName::as_str).collect()
    }

    fn sample_store() -> MemoryShardStore {
        let mut store = MemoryShardStore::new();
        store.insert_column("/sed/a_SED_00.hdf5", "filters", text(&["u", "g", "r"]));
        store.insert_column("/sed/a_SED_01.hdf5", "filters", text(&["u", "g", "r"]));
        store.insert_column(
            "/sed/b_SED_00.hdf5",
            "filters",
            Column::Bytes(vec![b"r".to_vec(), b"K\0\0".to_vec(), b"u".to_vec()]),
        );
        store
    }

    #[test]
    fn test_discover_keeps_first_seen_order() {
        let store = sample_store();
        let filters = discover(
            &store,
            Path::new("/sed"),
            &ShardNaming::default(),
            &SedLayout::default(),
        )
        .unwrap();
        // Descending scan reads b before a.
        assert_eq!(names(&filters), vec!["r", "K", "u", "g"]);
    }

    #[test]
    fn test_each_representative_opened_once() {
        let store = sample_store();
        let index = FilterIndex::build(
            &store,
            Path::new("/sed"),
            &ShardNaming::default(),
            &SedLayout::default(),
        )
        .unwrap();
        assert_eq!(store.open_count(), 2);
        assert_eq!(index.entries().len(), 2);

        let r = FilterName::new("r");
        let groups: Vec<&str> = index.candidates(&r).iter().map(|g| g.pattern()).collect();
        assert_eq!(groups, vec!["b_SED_??.hdf5", "a_SED_??.hdf5"]);
        assert!(index.candidates(&FilterName::new("W1")).is_empty());
    }

    #[test]
    fn test_empty_directory_yields_nothing() {
        let store = MemoryShardStore::new();
        let filters = discover(
            &store,
            Path::new("/nowhere"),
            &ShardNaming::default(),
            &SedLayout::default(),
        )
        .unwrap();
        assert!(filters.is_empty());
    }

    #[test]
    fn test_missing_filter_column_fails() {
        let mut store = MemoryShardStore::new();
        store.insert_column("/sed/a_SED_00.hdf5", "names", text(&["u"]));
        let err = FilterIndex::build(
            &store,
            Path::new("/sed"),
            &ShardNaming::default(),
            &SedLayout::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::MissingColumn { .. }));
    }
}
