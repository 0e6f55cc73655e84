//! Filter names.
//!
//! Shards store filter names either as text or as fixed-width byte strings. Both
//! forms are decoded into [`FilterName`] as soon as they leave a shard, and encoded
//! again only when a byte representation is asked for.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// A measurable quantity (usually a photometric passband) such as `r_VST`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterName(String);

impl FilterName {
    /// Create a filter name from text. Surrounding whitespace is trimmed.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_string())
    }

    /// Decode a filter name stored as a byte string.
    ///
    /// Fixed-width string columns pad with NUL or space, so trailing padding is
    /// dropped before decoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let end = bytes
            .iter()
            .rposition(|&b| b != 0 && b != b' ')
            .map_or(0, |i| i + 1);
        let text = std::str::from_utf8(&bytes[..end]).map_err(|e| {
            CatalogError::InvalidFilterName(format!("{:?} is not UTF-8: {e}", &bytes[..end]))
        })?;
        Ok(Self::new(text))
    }

    /// The name as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name encoded for byte-string columns.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Header token of the apparent-magnitude column, e.g. `r_VST_ap`.
    pub fn apparent_column(&self) -> String {
        format!("{}_ap", self.0)
    }

    /// Header token of the absolute-magnitude column, e.g. `r_VST_ab`.
    pub fn absolute_column(&self) -> String {
        format!("{}_ab", self.0)
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FilterName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FilterName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl TryFrom<&[u8]> for FilterName {
    type Error = CatalogError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes(bytes)
    }
}

/// Parse a comma or whitespace separated list of filter names.
pub fn parse_filter_list(list: &str) -> Vec<FilterName> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(FilterName::new)
        .collect()
}
