//! End-to-end catalog build.

use std::path::{Path, PathBuf};

use crate::assembler::{CatalogAssembler, JoinedCatalog, MagnitudeTable};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::filter_index::FilterIndex;
use crate::filter_name::FilterName;
use crate::light_cone::LightCone;
use crate::resolver::{ResolvedGroups, ShardResolver};
use crate::store::ShardStore;
use crate::table::{CatalogTable, SkyId};
use crate::text::{write_catalog_file, MAGNITUDE_ID_COLUMN};

/// File names written by [`BuildOutput::write_to`].
pub const FILTER_CATALOG_FILE: &str = "filter_catalog.dat";
pub const GALAXY_CATALOG_FILE: &str = "mock_galaxies.dat";
pub const GROUP_CATALOG_FILE: &str = "mock_group.dat";

/// Everything a build produces.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub resolved: ResolvedGroups,
    /// Magnitudes of every object in the SED shards with a valid id.
    pub magnitudes: MagnitudeTable,
    /// SED rows skipped for a null or sentinel id.
    pub invalid_magnitude_rows: usize,
    /// Valid objects brighter than the magnitude limit in the selection filter.
    pub selected_ids: Vec<SkyId>,
    /// Selected galaxies with their magnitudes. Bright rows with the sentinel id
    /// are counted in the report's `invalid_ids`.
    pub galaxies: JoinedCatalog,
    pub groups: CatalogTable,
}

impl BuildOutput {
    /// Write the three catalogs into `dir`, returning the paths written.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir).map_err(|e| CatalogError::io(dir, e))?;

        let filter_path = dir.join(FILTER_CATALOG_FILE);
        write_catalog_file(&self.magnitudes.to_table(MAGNITUDE_ID_COLUMN)?, &filter_path)?;
        let galaxy_path = dir.join(GALAXY_CATALOG_FILE);
        write_catalog_file(&self.galaxies.table, &galaxy_path)?;
        let group_path = dir.join(GROUP_CATALOG_FILE);
        write_catalog_file(&self.groups, &group_path)?;

        Ok(vec![filter_path, galaxy_path, group_path])
    }
}

/// A configured catalog build over one shard store.
pub struct CatalogBuild<'a, S: ShardStore + ?Sized> {
    store: &'a S,
    config: &'a CatalogConfig,
}

impl<'a, S: ShardStore + ?Sized> CatalogBuild<'a, S> {
    pub fn new(store: &'a S, config: &'a CatalogConfig) -> Self {
        Self { store, config }
    }

    /// Filters available in the configured SED directory.
    pub fn available_filters(&self) -> Result<Vec<FilterName>> {
        Ok(self.index()?.discover())
    }

    fn index(&self) -> Result<FilterIndex> {
        FilterIndex::build(
            self.store,
            &self.config.sed_dir,
            &self.config.naming,
            &self.config.sed,
        )
    }

    /// Run the build for `filters`, or for every available filter when empty.
    ///
    /// The selection filter is always extracted, and appended to the requested
    /// list when it is not already part of it.
    pub fn run(&self, filters: &[FilterName]) -> Result<BuildOutput> {
        self.config.validate()?;
        let index = self.index()?;

        let mut requested = if filters.is_empty() {
            index.discover()
        } else {
            filters.to_vec()
        };
        if !requested.contains(&self.config.selection_filter) {
            log::info!(
                "adding selection filter {} to the request",
                self.config.selection_filter
            );
            requested.push(self.config.selection_filter.clone());
        }

        let resolver = ShardResolver::new(&index, self.config.ambiguity.clone());
        let resolved = resolver.resolve_and_group(&requested)?;

        let assembler = CatalogAssembler::from_config(self.config);
        let all_magnitudes =
            assembler.build_magnitude_table(self.store, &self.config.sed, &resolved)?;

        let bright = assembler.select_ids_below_threshold(
            &all_magnitudes,
            &self.config.selection_filter,
            self.config.magnitude_limit,
        )?;
        let (selected_ids, invalid_selected): (Vec<SkyId>, Vec<SkyId>) = bright
            .into_iter()
            .partition(|&id| !assembler.is_invalid_id(Some(id)));

        let (magnitudes, invalid_magnitude_rows) = assembler.drop_invalid_ids(&all_magnitudes);
        if invalid_magnitude_rows > 0 {
            log::warn!(
                "skipping {} of {} SED rows with invalid ids",
                invalid_magnitude_rows,
                all_magnitudes.len()
            );
        }
        log::info!(
            "{} of {} objects brighter than {} in {}",
            selected_ids.len(),
            magnitudes.len(),
            self.config.magnitude_limit,
            self.config.selection_filter
        );

        let light_cone = LightCone::new(
            self.store,
            self.config.light_cone_dir.clone(),
            &self.config.light_cone,
        );
        let mock = light_cone.mock_catalog(&selected_ids)?;

        let mut galaxies = mock.galaxies;
        galaxies.sort_by_id();
        let mut subset = magnitudes.retain_ids(&selected_ids);
        subset.sort_by_id();

        let mut joined = assembler.join(&galaxies, &subset)?;
        joined.report.input_rows += invalid_selected.len();
        joined.report.invalid_ids += invalid_selected.len();
        Ok(BuildOutput {
            resolved,
            magnitudes,
            invalid_magnitude_rows,
            selected_ids,
            galaxies: joined,
            groups: mock.groups,
        })
    }
}
