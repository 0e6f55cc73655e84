//! Object properties from mock light-cone shards.
//!
//! Each light-cone shard holds a `galaxies` and a `groups` section with one
//! column per property. Properties of a section are read from every shard in
//! sorted file order and stacked into one table.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::{LightConeLayout, SectionLayout};
use crate::error::{CatalogError, Result};
use crate::store::{ShardHandle, ShardStore};
use crate::table::{CatalogTable, SkyId, TableColumn};

/// Galaxy and group property tables of one light cone.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCatalog {
    pub galaxies: CatalogTable,
    pub groups: CatalogTable,
}

/// The light-cone shards of one directory.
pub struct LightCone<'a, S: ShardStore + ?Sized> {
    store: &'a S,
    dir: PathBuf,
    layout: &'a LightConeLayout,
}

impl<'a, S: ShardStore + ?Sized> LightCone<'a, S> {
    pub fn new(store: &'a S, dir: impl Into<PathBuf>, layout: &'a LightConeLayout) -> Self {
        Self {
            store,
            dir: dir.into(),
            layout,
        }
    }

    /// Light-cone shards in sorted order.
    pub fn shards(&self) -> Result<Vec<PathBuf>> {
        let mut shards = self.store.list(&self.dir, &self.layout.file_pattern)?;
        shards.sort();
        Ok(shards)
    }

    /// Read one section from every shard.
    ///
    /// With `ids`, each shard contributes only the rows whose id is in the
    /// subset, sorted by id, one row per id.
    pub fn read_section(&self, section: &SectionLayout, ids: Option<&[SkyId]>) -> Result<CatalogTable> {
        let wanted = ids.map(|ids| ids.iter().copied().collect::<HashSet<_>>());
        let mut table = CatalogTable::new(section.id_key.clone());
        for path in self.shards()? {
            let shard = self.store.open(&path)?;
            table.append(read_chunk(&*shard, section, wanted.as_ref())?)?;
        }
        Ok(table)
    }

    /// Galaxies restricted to `galaxy_ids` and all groups, reading each shard once.
    pub fn mock_catalog(&self, galaxy_ids: &[SkyId]) -> Result<MockCatalog> {
        let wanted: HashSet<SkyId> = galaxy_ids.iter().copied().collect();
        let mut galaxies = CatalogTable::new(self.layout.galaxies.id_key.clone());
        let mut groups = CatalogTable::new(self.layout.groups.id_key.clone());

        let shards = self.shards()?;
        if shards.is_empty() {
            log::warn!(
                "no light-cone shards matching {} in {}",
                self.layout.file_pattern,
                self.dir.display()
            );
        }
        for path in &shards {
            let shard = self.store.open(path)?;
            galaxies.append(read_chunk(&*shard, &self.layout.galaxies, Some(&wanted))?)?;
            groups.append(read_chunk(&*shard, &self.layout.groups, None)?)?;
        }

        log::info!(
            "light cone: {} galaxies selected, {} groups from {} shards",
            galaxies.len(),
            groups.len(),
            shards.len()
        );
        Ok(MockCatalog { galaxies, groups })
    }
}

/// Read the configured columns of `section` from one open shard.
pub fn read_chunk(
    shard: &dyn ShardHandle,
    section: &SectionLayout,
    wanted: Option<&HashSet<SkyId>>,
) -> Result<CatalogTable> {
    if section.id_key.is_empty() {
        return Err(CatalogError::Config(format!(
            "section '{}' has no id column",
            section.section
        )));
    }

    let ids = shard.read_ids(&section.key(&section.id_key))?;
    let columns = section
        .properties
        .iter()
        .map(|name| {
            let values = shard.read_floats(&section.key(name))?;
            Ok(TableColumn::property(name.clone(), values))
        })
        .collect::<Result<Vec<_>>>()?;
    let chunk = CatalogTable::from_parts(section.id_key.clone(), ids, columns)
        .map_err(|e| shape_error(shard.path(), &section.section, e))?;

    let Some(wanted) = wanted else {
        return Ok(chunk);
    };

    let mut rows: Vec<(SkyId, usize)> = chunk
        .ids()
        .iter()
        .enumerate()
        .filter_map(|(row, id)| id.filter(|id| wanted.contains(id)).map(|id| (id, row)))
        .collect();
    rows.sort();
    rows.dedup_by_key(|(id, _)| *id);
    if rows.is_empty() {
        log::debug!(
            "{}: no selected objects in section '{}'",
            shard.path().display(),
            section.section
        );
    }

    let indices: Vec<usize> = rows.into_iter().map(|(_, row)| row).collect();
    Ok(chunk.take_rows(&indices))
}

fn shape_error(shard: &Path, section: &str, err: CatalogError) -> CatalogError {
    match err {
        CatalogError::ColumnLength {
            column,
            expected,
            found,
        } => CatalogError::ShapeMismatch {
            shard: shard.to_path_buf(),
            message: format!(
                "section '{section}': column '{column}' has {found} rows, ids have {expected}"
            ),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Column, MemoryShardStore};
    use approx::assert_relative_eq;

    fn light_cone_shard(store: &mut MemoryShardStore, path: &str, galaxy_ids: Vec<i64>, group_ids: Vec<i64>) {
        let layout = LightConeLayout::default();
        let n = galaxy_ids.len();
        let ra: Vec<f64> = galaxy_ids.iter().map(|&id| id as f64 / 10.0).collect();
        store.insert_column(path, "galaxies/id_galaxy_sky", Column::Int(galaxy_ids));
        for prop in &layout.galaxies.properties {
            let values = if prop == "ra" { ra.clone() } else { vec![0.5; n] };
            store.insert_column(path, format!("galaxies/{prop}"), Column::Float(values));
        }
        let m = group_ids.len();
        store.insert_column(path, "groups/id_group_sky", Column::Int(group_ids));
        for prop in &layout.groups.properties {
            store.insert_column(path, format!("groups/{prop}"), Column::Float(vec![1.5; m]));
        }
    }

    fn sample_store() -> MemoryShardStore {
        let mut store = MemoryShardStore::new();
        light_cone_shard(&mut store, "/lc/mock_01.hdf5", vec![40, 20, 30], vec![2]);
        light_cone_shard(&mut store, "/lc/mock_00.hdf5", vec![12, 11, 10, 11], vec![1]);
        store
    }

    #[test]
    fn test_full_section_in_file_order() {
        let store = sample_store();
        let layout = LightConeLayout::default();
        let cone = LightCone::new(&store, "/lc", &layout);

        let galaxies = cone.read_section(&layout.galaxies, None).unwrap();
        assert_eq!(
            galaxies.ids(),
            &[Some(12), Some(11), Some(10), Some(11), Some(40), Some(20), Some(30)]
        );
        assert_eq!(
            galaxies.header(),
            vec!["id_galaxy_sky", "ra", "dec", "zobs", "zcos", "zcmb"]
        );
    }

    #[test]
    fn test_subset_is_sorted_per_shard_and_deduplicated() {
        let store = sample_store();
        let layout = LightConeLayout::default();
        let cone = LightCone::new(&store, "/lc", &layout);

        let galaxies = cone
            .read_section(&layout.galaxies, Some(&[30, 11, 40, 99]))
            .unwrap();
        assert_eq!(galaxies.ids(), &[Some(11), Some(30), Some(40)]);
        assert_relative_eq!(galaxies.column("ra").unwrap().values[2], 4.0);
    }

    #[test]
    fn test_empty_intersection_is_no_data() {
        let store = sample_store();
        let layout = LightConeLayout::default();
        let cone = LightCone::new(&store, "/lc", &layout);

        let galaxies = cone.read_section(&layout.galaxies, Some(&[999])).unwrap();
        assert!(galaxies.is_empty());
        assert_eq!(galaxies.header().len(), 6);
    }

    #[test]
    fn test_mock_catalog_opens_each_shard_once() {
        let store = sample_store();
        let layout = LightConeLayout::default();
        let cone = LightCone::new(&store, "/lc", &layout);

        let catalog = cone.mock_catalog(&[10, 20]).unwrap();
        assert_eq!(catalog.galaxies.ids(), &[Some(10), Some(20)]);
        assert_eq!(catalog.groups.ids(), &[Some(1), Some(2)]);
        assert_eq!(catalog.groups.header().last().map(String::as_str), Some("mvir"));
        assert_eq!(store.open_count(), 2);
    }

    #[test]
    fn test_missing_id_column_is_config_error() {
        let store = sample_store();
        let mut layout = LightConeLayout::default();
        layout.galaxies.id_key.clear();
        let cone = LightCone::new(&store, "/lc", &layout);
        assert!(matches!(
            cone.read_section(&layout.galaxies, Some(&[10])),
            Err(CatalogError::Config(_))
        ));
    }

    #[test]
    fn test_ragged_section_is_shape_mismatch() {
        let mut store = sample_store();
        store.insert_column("/lc/mock_00.hdf5", "galaxies/zobs", Column::Float(vec![0.1]));
        let layout = LightConeLayout::default();
        let cone = LightCone::new(&store, "/lc", &layout);
        assert!(matches!(
            cone.read_section(&layout.galaxies, None),
            Err(CatalogError::ShapeMismatch { .. })
        ));
    }
}
