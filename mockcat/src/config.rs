//! Catalog build configuration.
//!
//! Every component takes the pieces of [`CatalogConfig`] it needs as explicit
//! arguments. A configuration can be saved to and loaded from a JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::filter_name::FilterName;
use crate::table::SkyId;

/// Order in which representative shards are scanned during discovery and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOrder {
    Ascending,
    Descending,
}

/// Naming convention of SED shards.
///
/// A representative shard is any file matching `*{marker}*{suffix}.{extension}`.
/// The members of its group share the file name up to the numeric suffix, whose
/// width is the length of `representative_suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardNaming {
    pub sed_marker: String,
    pub representative_suffix: String,
    pub extension: String,
    pub representative_order: ScanOrder,
    /// Treat a directory without representatives as an error.
    pub require_representatives: bool,
}

impl Default for ShardNaming {
    fn default() -> Self {
        Self {
            sed_marker: "SED".to_string(),
            representative_suffix: "00".to_string(),
            extension: "hdf5".to_string(),
            representative_order: ScanOrder::Descending,
            require_representatives: false,
        }
    }
}

impl ShardNaming {
    /// Width of the numeric shard suffix.
    pub fn suffix_width(&self) -> usize {
        self.representative_suffix.chars().count()
    }

    /// File-name glob selecting one representative shard per group.
    pub fn representative_glob(&self) -> String {
        format!(
            "*{}*{}.{}",
            self.sed_marker, self.representative_suffix, self.extension
        )
    }

    /// Whether `file_name` names a representative shard.
    ///
    /// The representative suffix must be the whole numeric field, so
    /// `a_SED_100.hdf5` is not a representative for suffix `00`.
    pub fn is_representative(&self, file_name: &str) -> bool {
        let Some(stem) = file_name.strip_suffix(&format!(".{}", self.extension)) else {
            return false;
        };
        stem.strip_suffix(&self.representative_suffix)
            .map_or(false, |prefix| {
                prefix.contains(&self.sed_marker) && !prefix.ends_with(|c: char| c.is_ascii_digit())
            })
    }

    fn validate(&self) -> Result<()> {
        if self.representative_suffix.is_empty() {
            return Err(CatalogError::Config(
                "representative_suffix must not be empty".to_string(),
            ));
        }
        if self.extension.is_empty() {
            return Err(CatalogError::Config("extension must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Key paths inside an SED shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SedLayout {
    pub id_key: String,
    pub filters_key: String,
    /// `[filters, objects]` apparent magnitudes.
    pub apparent_key: String,
    /// `[filters, objects]` absolute magnitudes.
    pub absolute_key: String,
}

impl Default for SedLayout {
    fn default() -> Self {
        Self {
            id_key: "id_galaxy_sky".to_string(),
            filters_key: "filters".to_string(),
            apparent_key: "SED/ap_dust/total".to_string(),
            absolute_key: "SED/ab_dust/total".to_string(),
        }
    }
}

/// One section of a light-cone shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionLayout {
    pub section: String,
    pub id_key: String,
    pub properties: Vec<String>,
}

impl SectionLayout {
    /// Key path of a column inside this section.
    pub fn key(&self, column: &str) -> String {
        format!("{}/{}", self.section, column)
    }

    /// The id column followed by the configured properties.
    pub fn columns(&self) -> Vec<String> {
        std::iter::once(self.id_key.clone())
            .chain(self.properties.iter().cloned())
            .collect()
    }
}

/// Layout of mock light-cone shards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConeLayout {
    pub file_pattern: String,
    pub galaxies: SectionLayout,
    pub groups: SectionLayout,
}

impl Default for LightConeLayout {
    fn default() -> Self {
        let galaxy_props = ["ra", "dec", "zobs", "zcos", "zcmb"];
        let group_props = ["ra", "dec", "zobs", "zcos", "zcmb", "mvir"];
        Self {
            file_pattern: "mock_??.hdf5".to_string(),
            galaxies: SectionLayout {
                section: "galaxies".to_string(),
                id_key: "id_galaxy_sky".to_string(),
                properties: galaxy_props.iter().map(|s| s.to_string()).collect(),
            },
            groups: SectionLayout {
                section: "groups".to_string(),
                id_key: "id_group_sky".to_string(),
                properties: group_props.iter().map(|s| s.to_string()).collect(),
            },
        }
    }
}

/// What to do when more than one shard group lists a requested filter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy", content = "groups")]
pub enum AmbiguityPolicy {
    /// Fail with [`CatalogError::AmbiguousFilter`].
    #[default]
    Reject,
    /// Take the first candidate in representative scan order.
    FirstMatch,
    /// Take the candidate listed earliest here; ambiguity among unlisted groups is rejected.
    Priority(Vec<String>),
}

/// How the properties table and the magnitude table are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
    /// Id sequences must be identical, element by element.
    #[default]
    Concatenate,
    /// Id sets must be equal; the right side is reordered to match the left.
    AlignById,
}

/// Full configuration of a catalog build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory holding the SED shards.
    pub sed_dir: PathBuf,
    /// Directory holding the light-cone shards.
    pub light_cone_dir: PathBuf,
    /// Directory catalogs are written to.
    pub output_dir: PathBuf,
    pub naming: ShardNaming,
    pub sed: SedLayout,
    pub light_cone: LightConeLayout,
    pub ambiguity: AmbiguityPolicy,
    pub join: JoinStrategy,
    /// Id value marking a row as unusable.
    pub invalid_id_sentinel: Option<SkyId>,
    /// Drop rows without any finite apparent magnitude.
    pub drop_unmeasured: bool,
    /// Objects brighter than this (strictly) in `selection_filter` are kept.
    pub magnitude_limit: f64,
    pub selection_filter: FilterName,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sed_dir: PathBuf::from("."),
            light_cone_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            naming: ShardNaming::default(),
            sed: SedLayout::default(),
            light_cone: LightConeLayout::default(),
            ambiguity: AmbiguityPolicy::default(),
            join: JoinStrategy::default(),
            invalid_id_sentinel: Some(0),
            drop_unmeasured: true,
            magnitude_limit: 25.0,
            selection_filter: FilterName::new("Z_VISTA"),
        }
    }
}

impl CatalogConfig {
    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        self.naming.validate()?;
        if !self.magnitude_limit.is_finite() {
            return Err(CatalogError::Config(format!(
                "magnitude_limit must be finite, got {}",
                self.magnitude_limit
            )));
        }
        if self.selection_filter.as_str().is_empty() {
            return Err(CatalogError::Config(
                "selection_filter must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Save to a JSON file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CatalogError::Config(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| CatalogError::io(path, e))
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| CatalogError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }
}
