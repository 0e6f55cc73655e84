//! Test helpers for mockcat
//!
//! Writes synthetic SED and light-cone shards to a temporary directory so tests
//! can run the catalog build against real files.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

/// Error type for fixture operations
#[derive(thiserror::Error, Debug)]
pub enum FixtureError {
    #[error("failed to write fixture {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("inconsistent fixture: {0}")]
    Inconsistent(String),
}

/// Galaxy properties written to every light-cone fixture.
pub const GALAXY_PROPERTIES: [&str; 5] = ["ra", "dec", "zobs", "zcos", "zcmb"];

/// Group properties written to every light-cone fixture.
pub const GROUP_PROPERTIES: [&str; 6] = ["ra", "dec", "zobs", "zcos", "zcmb", "mvir"];

/// Contents of one SED shard.
///
/// `apparent` and `absolute` are indexed `[filter][object]`; `None` ids and `NaN`
/// magnitudes are written as JSON `null`.
#[derive(Debug, Clone, Default)]
pub struct SedShard {
    pub ids: Vec<Option<i64>>,
    pub filters: Vec<String>,
    pub apparent: Vec<Vec<f64>>,
    pub absolute: Vec<Vec<f64>>,
}

impl SedShard {
    /// A shard whose magnitudes follow [`apparent_magnitude`] and [`absolute_magnitude`].
    pub fn synthetic(ids: &[i64], filters: &[&str]) -> Self {
        Self {
            ids: ids.iter().copied().map(Some).collect(),
            filters: filters.iter().map(|f| f.to_string()).collect(),
            apparent: filters
                .iter()
                .map(|f| ids.iter().map(|&id| apparent_magnitude(id, f)).collect())
                .collect(),
            absolute: filters
                .iter()
                .map(|f| ids.iter().map(|&id| absolute_magnitude(id, f)).collect())
                .collect(),
        }
    }

    fn to_json(&self) -> Result<Value, FixtureError> {
        let n = self.ids.len();
        let f = self.filters.len();
        for (name, block) in [("apparent", &self.apparent), ("absolute", &self.absolute)] {
            if block.len() != f || block.iter().any(|row| row.len() != n) {
                return Err(FixtureError::Inconsistent(format!(
                    "{name} block must be {f} x {n}"
                )));
            }
        }
        Ok(json!({
            "id_galaxy_sky": self.ids,
            "filters": self.filters,
            "SED": {
                "ap_dust": { "total": self.apparent },
                "ab_dust": { "total": self.absolute },
            },
        }))
    }
}

/// Deterministic apparent magnitude of object `id` in `filter`.
///
/// Spans roughly 20 to 30 so a limit of 25 keeps about half the objects.
pub fn apparent_magnitude(id: i64, filter: &str) -> f64 {
    let offset = filter.bytes().map(u64::from).sum::<u64>() % 7;
    20.0 + ((id.unsigned_abs() * 37 + offset) % 100) as f64 / 10.0
}

/// Deterministic absolute magnitude of object `id` in `filter`.
pub fn absolute_magnitude(id: i64, filter: &str) -> f64 {
    apparent_magnitude(id, filter) - 42.0
}

/// Right ascension written for object `id`.
pub fn ra_of(id: i64) -> f64 {
    id as f64 * 0.25
}

fn write_json(path: &Path, value: &Value) -> Result<PathBuf, FixtureError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| FixtureError::Write {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    fs::write(path, text).map_err(|source| FixtureError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path.to_path_buf())
}

/// Write an SED shard as `dir/name`.
pub fn write_sed_shard(dir: &Path, name: &str, shard: &SedShard) -> Result<PathBuf, FixtureError> {
    write_json(&dir.join(name), &shard.to_json()?)
}

fn section(ids: &[i64], id_key: &str, properties: &[&str]) -> Value {
    let mut section = serde_json::Map::new();
    section.insert(id_key.to_string(), json!(ids));
    for (k, prop) in properties.iter().enumerate() {
        let values: Vec<f64> = ids
            .iter()
            .map(|&id| match *prop {
                "ra" => ra_of(id),
                "dec" => -(id as f64) * 0.1,
                "mvir" => 1.0e12 + id as f64,
                _ => 0.01 * (k as f64 + 1.0) + id as f64 * 1e-4,
            })
            .collect();
        section.insert(prop.to_string(), json!(values));
    }
    Value::Object(section)
}

/// Write a light-cone shard with the default galaxy and group sections.
pub fn write_light_cone_shard(
    dir: &Path,
    name: &str,
    galaxy_ids: &[i64],
    group_ids: &[i64],
) -> Result<PathBuf, FixtureError> {
    let value = json!({
        "galaxies": section(galaxy_ids, "id_galaxy_sky", &GALAXY_PROPERTIES),
        "groups": section(group_ids, "id_group_sky", &GROUP_PROPERTIES),
    });
    write_json(&dir.join(name), &value)
}

/// A temporary directory with `sed/` and `lightcone/` subdirectories.
///
/// `output_dir` is left uncreated so builds can be checked for writing nothing.
pub struct FixtureDir {
    root: TempDir,
}

impl FixtureDir {
    pub fn new() -> Result<Self, FixtureError> {
        let root = TempDir::new().map_err(|source| FixtureError::Write {
            path: std::env::temp_dir(),
            source,
        })?;
        for sub in ["sed", "lightcone"] {
            let path = root.path().join(sub);
            fs::create_dir_all(&path).map_err(|source| FixtureError::Write { path, source })?;
        }
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn sed_dir(&self) -> PathBuf {
        self.root.path().join("sed")
    }

    pub fn light_cone_dir(&self) -> PathBuf {
        self.root.path().join("lightcone")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.path().join("out")
    }

    /// Split `ids` into `shards` SED shards named `{prefix}_SED_{nn}.hdf5`.
    pub fn write_sed_group(
        &self,
        prefix: &str,
        ids: &[i64],
        filters: &[&str],
        shards: usize,
    ) -> Result<Vec<PathBuf>, FixtureError> {
        chunks(ids, shards)
            .enumerate()
            .map(|(i, chunk)| {
                let name = format!("{prefix}_SED_{i:02}.hdf5");
                write_sed_shard(&self.sed_dir(), &name, &SedShard::synthetic(chunk, filters))
            })
            .collect()
    }

    /// Split galaxy ids into `shards` light-cone shards named `mock_{nn}.hdf5`,
    /// giving shard `i` the single group id `i + 1`.
    pub fn write_light_cone(&self, galaxy_ids: &[i64], shards: usize) -> Result<Vec<PathBuf>, FixtureError> {
        chunks(galaxy_ids, shards)
            .enumerate()
            .map(|(i, chunk)| {
                let name = format!("mock_{i:02}.hdf5");
                write_light_cone_shard(&self.light_cone_dir(), &name, chunk, &[i as i64 + 1])
            })
            .collect()
    }
}

fn chunks(ids: &[i64], parts: usize) -> impl Iterator<Item = &[i64]> {
    let parts = parts.max(1);
    let size = ids.len().div_ceil(parts).max(1);
    ids.chunks(size)
}
