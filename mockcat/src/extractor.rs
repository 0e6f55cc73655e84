//! Reading magnitudes for one shard group.

use std::path::Path;

use ndarray::{concatenate, Array2, ArrayView2, Axis};

use crate::config::SedLayout;
use crate::error::{CatalogError, Result};
use crate::filter_name::FilterName;
use crate::shard_group::ShardGroup;
use crate::store::ShardStore;
use crate::table::SkyId;

/// Magnitudes of one shard group.
///
/// `apparent` and `absolute` are `[filters, objects]`; column `j` of both
/// belongs to `ids[j]` and row `i` to `filters[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMagnitudes {
    pub group: ShardGroup,
    pub filters: Vec<FilterName>,
    pub ids: Vec<Option<SkyId>>,
    pub apparent: Array2<f64>,
    pub absolute: Array2<f64>,
}

impl GroupMagnitudes {
    /// Number of objects.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Pulls filter rows out of every member shard of a group.
pub struct MagnitudeExtractor<'a, S: ShardStore + ?Sized> {
    store: &'a S,
    layout: &'a SedLayout,
}

impl<'a, S: ShardStore + ?Sized> MagnitudeExtractor<'a, S> {
    pub fn new(store: &'a S, layout: &'a SedLayout) -> Self {
        Self { store, layout }
    }

    /// Read `filters` from every member of `group`, concatenated along the
    /// object axis in member order.
    pub fn extract(&self, group: &ShardGroup, filters: &[FilterName]) -> Result<GroupMagnitudes> {
        let members = group.members(self.store)?;
        if members.is_empty() {
            return Err(CatalogError::EmptyGroupResult {
                pattern: group.pattern().to_string(),
            });
        }

        let mut ids = Vec::new();
        let mut apparent_blocks = Vec::with_capacity(members.len());
        let mut absolute_blocks = Vec::with_capacity(members.len());
        for member in &members {
            let (member_ids, apparent, absolute) = self.read_member(member, filters)?;
            ids.extend(member_ids);
            apparent_blocks.push(apparent);
            absolute_blocks.push(absolute);
        }

        let apparent = stack(group, &apparent_blocks)?;
        let absolute = stack(group, &absolute_blocks)?;
        log::info!(
            "extracted {} filters for {} objects from {} shards of {}",
            filters.len(),
            ids.len(),
            members.len(),
            group
        );

        Ok(GroupMagnitudes {
            group: group.clone(),
            filters: filters.to_vec(),
            ids,
            apparent,
            absolute,
        })
    }

    fn read_member(
        &self,
        path: &Path,
        filters: &[FilterName],
    ) -> Result<(Vec<Option<SkyId>>, Array2<f64>, Array2<f64>)> {
        let shard = self.store.open(path)?;
        let ids = shard.read_ids(&self.layout.id_key)?;
        let available = shard.read_filter_names(&self.layout.filters_key)?;

        let rows = filters
            .iter()
            .map(|filter| {
                available
                    .iter()
                    .position(|name| name == filter)
                    .ok_or_else(|| CatalogError::FilterMissingInGroup {
                        filter: filter.to_string(),
                        shard: path.to_path_buf(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let apparent = shard.read_matrix(&self.layout.apparent_key)?;
        let absolute = shard.read_matrix(&self.layout.absolute_key)?;
        let expected = (available.len(), ids.len());
        for (key, matrix) in [
            (&self.layout.apparent_key, &apparent),
            (&self.layout.absolute_key, &absolute),
        ] {
            if matrix.dim() != expected {
                return Err(CatalogError::ShapeMismatch {
                    shard: path.to_path_buf(),
                    message: format!(
                        "'{key}' is {:?}, expected {expected:?} for {} filters and {} objects",
                        matrix.dim(),
                        expected.0,
                        expected.1
                    ),
                });
            }
        }

        Ok((
            ids,
            apparent.select(Axis(0), &rows),
            absolute.select(Axis(0), &rows),
        ))
    }
}

fn stack(group: &ShardGroup, blocks: &[Array2<f64>]) -> Result<Array2<f64>> {
    let views: Vec<ArrayView2<f64>> = blocks.iter().map(|b| b.view()).collect();
    concatenate(Axis(1), &views).map_err(|e| CatalogError::ShapeMismatch {
        shard: group.dir().join(group.pattern()),
        message: e.to_string(),
    })
}
