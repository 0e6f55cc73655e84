//! Shard groups and their representative shards.
//!
//! SED shards are numbered with a fixed-width suffix (`run_SED_00.hdf5`,
//! `run_SED_01.hdf5`, ...). The shard carrying the representative suffix stands
//! in for its whole group during filter discovery, and the group's members are
//! found by wildcarding the suffix.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{ScanOrder, ShardNaming};
use crate::error::{CatalogError, Result};
use crate::store::ShardStore;

/// A set of shards addressed by a file-name glob inside one directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardGroup {
    dir: PathBuf,
    pattern: String,
}

impl ShardGroup {
    pub fn new(dir: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            pattern: pattern.into(),
        }
    }

    /// Derive the group of a representative shard by replacing its numeric
    /// suffix with `?` wildcards.
    ///
    /// `/sed/run7_SED_00.hdf5` becomes `run7_SED_??.hdf5` in `/sed`.
    pub fn from_representative(path: &Path, naming: &ShardNaming) -> Result<Self> {
        let invalid = |message: &str| CatalogError::InvalidPattern {
            pattern: path.display().to_string(),
            message: message.to_string(),
        };

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| invalid("shard path has no UTF-8 file name"))?;
        let dotted_ext = format!(".{}", naming.extension);
        let stem = file_name
            .strip_suffix(&dotted_ext)
            .ok_or_else(|| invalid("file name does not carry the shard extension"))?;

        let width = naming.suffix_width();
        let split = stem
            .char_indices()
            .rev()
            .nth(width.saturating_sub(1))
            .map(|(i, _)| i)
            .filter(|_| width > 0)
            .ok_or_else(|| invalid("file name is shorter than the shard suffix"))?;
        let prefix = &stem[..split];

        let pattern = format!(
            "{}{}{}",
            glob::Pattern::escape(prefix),
            "?".repeat(width),
            dotted_ext
        );
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self { dir, pattern })
    }

    /// Directory the group lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File-name glob of the group's members.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Member shards in sorted order. This order defines row order downstream.
    pub fn members<S: ShardStore + ?Sized>(&self, store: &S) -> Result<Vec<PathBuf>> {
        let mut members = store.list(&self.dir, &self.pattern)?;
        members.sort();
        Ok(members)
    }
}

impl fmt::Display for ShardGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Representative shards of every group in `dir`, in the configured scan order.
pub fn representatives<S: ShardStore + ?Sized>(
    store: &S,
    dir: &Path,
    naming: &ShardNaming,
) -> Result<Vec<PathBuf>> {
    let mut found = store.list(dir, &naming.representative_glob())?;
    found.retain(|path| {
        let keep = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| naming.is_representative(n));
        if !keep {
            log::debug!("{} only matches the representative glob by its longer suffix", path.display());
        }
        keep
    });
    found.sort();
    if naming.representative_order == ScanOrder::Descending {
        found.reverse();
    }

    if found.is_empty() {
        if naming.require_representatives {
            return Err(CatalogError::NoRepresentatives(dir.to_path_buf()));
        }
        log::warn!(
            "no representative shards matching {} in {}",
            naming.representative_glob(),
            dir.display()
        );
    }
    Ok(found)
}
