//! Merging group magnitudes and joining them onto object properties.

use std::collections::{HashMap, HashSet, VecDeque};

use ndarray::{Array1, Axis};

use crate::config::{CatalogConfig, JoinStrategy, SedLayout};
use crate::error::{CatalogError, IdMismatch, Result};
use crate::extractor::{GroupMagnitudes, MagnitudeExtractor};
use crate::filter_name::FilterName;
use crate::resolver::ResolvedGroups;
use crate::store::ShardStore;
use crate::table::{CatalogTable, ColumnKind, SkyId, TableColumn};

/// Apparent and absolute magnitudes of one filter, aligned with a table's ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Magnitudes {
    pub name: FilterName,
    pub apparent: Array1<f64>,
    pub absolute: Array1<f64>,
}

/// Magnitudes of every requested filter over one shared id vector.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MagnitudeTable {
    ids: Vec<Option<SkyId>>,
    filters: Vec<Magnitudes>,
}

impl MagnitudeTable {
    /// Merge per-group extractions into one table.
    ///
    /// The id vector of the first group is kept and every other group must list
    /// the same ids in the same order. Filters are laid out in `order`; filters
    /// not named there follow in extraction order.
    pub fn from_groups(groups: Vec<GroupMagnitudes>, order: &[FilterName]) -> Result<Self> {
        let mut groups = groups.into_iter();
        let Some(first) = groups.next() else {
            return Ok(Self::default());
        };

        let mut table = Self {
            ids: first.ids.clone(),
            filters: Vec::new(),
        };
        table.absorb(first);
        for group in groups {
            if let Some(mismatch) = first_difference(&table.ids, &group.ids) {
                log::warn!(
                    "group {} does not enumerate the same objects: {mismatch}",
                    group.group
                );
                return Err(CatalogError::IdentifierMismatch(mismatch));
            }
            table.absorb(group);
        }

        table.filters.sort_by_key(|m| {
            order
                .iter()
                .position(|name| name == &m.name)
                .unwrap_or(usize::MAX)
        });
        Ok(table)
    }

    fn absorb(&mut self, group: GroupMagnitudes) {
        for (row, name) in group.filters.into_iter().enumerate() {
            self.filters.push(Magnitudes {
                name,
                apparent: group.apparent.index_axis(Axis(0), row).to_owned(),
                absolute: group.absolute.index_axis(Axis(0), row).to_owned(),
            });
        }
    }

    pub fn ids(&self) -> &[Option<SkyId>] {
        &self.ids
    }

    pub fn filters(&self) -> &[Magnitudes] {
        &self.filters
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, name: &FilterName) -> Option<&Magnitudes> {
        self.filters.iter().find(|m| &m.name == name)
    }

    /// Ids whose apparent magnitude in `filter` is strictly below `threshold`,
    /// in table order. Rows without an id are skipped.
    pub fn select_ids_below_threshold(
        &self,
        filter: &FilterName,
        threshold: f64,
    ) -> Result<Vec<SkyId>> {
        let magnitudes = self
            .get(filter)
            .ok_or_else(|| CatalogError::UnknownColumn(filter.apparent_column()))?;
        Ok(self
            .ids
            .iter()
            .zip(magnitudes.apparent.iter())
            .filter(|(_, mag)| **mag < threshold)
            .filter_map(|(id, _)| *id)
            .collect())
    }

    fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            ids: indices.iter().map(|&i| self.ids[i]).collect(),
            filters: self
                .filters
                .iter()
                .map(|m| Magnitudes {
                    name: m.name.clone(),
                    apparent: m.apparent.select(Axis(0), indices),
                    absolute: m.absolute.select(Axis(0), indices),
                })
                .collect(),
        }
    }

    /// Rows whose id is in `ids`, in table order.
    pub fn retain_ids(&self, ids: &[SkyId]) -> Self {
        let wanted: HashSet<SkyId> = ids.iter().copied().collect();
        let indices: Vec<usize> = (0..self.ids.len())
            .filter(|&i| self.ids[i].map_or(false, |id| wanted.contains(&id)))
            .collect();
        self.take_rows(&indices)
    }

    /// Stable sort by id, null ids last.
    pub fn sort_by_id(&mut self) {
        let mut order: Vec<usize> = (0..self.ids.len()).collect();
        order.sort_by_key(|&i| (self.ids[i].is_none(), self.ids[i]));
        *self = self.take_rows(&order);
    }

    /// Columns in filter order: `<name>_ap`, `<name>_ab` per filter.
    pub fn columns(&self) -> Vec<TableColumn> {
        self.filters
            .iter()
            .flat_map(|m| {
                [
                    TableColumn::new(ColumnKind::Apparent(m.name.clone()), m.apparent.clone()),
                    TableColumn::new(ColumnKind::Absolute(m.name.clone()), m.absolute.clone()),
                ]
            })
            .collect()
    }

    /// The table as a [`CatalogTable`] with the given id column name.
    pub fn to_table(&self, id_column: &str) -> Result<CatalogTable> {
        CatalogTable::from_parts(id_column, self.ids.clone(), self.columns())
    }
}

/// What the final filtering pass removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoinReport {
    pub input_rows: usize,
    /// Rows with a null id or the sentinel id.
    pub invalid_ids: usize,
    /// Rows with a valid id but no finite apparent magnitude.
    pub unmeasured: usize,
}

impl JoinReport {
    pub fn dropped(&self) -> usize {
        self.invalid_ids + self.unmeasured
    }

    pub fn output_rows(&self) -> usize {
        self.input_rows - self.dropped()
    }
}

/// Object properties followed by magnitude columns, one row per valid object.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedCatalog {
    pub table: CatalogTable,
    pub report: JoinReport,
}

/// Builds magnitude tables and joins them to object properties.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogAssembler {
    pub invalid_id_sentinel: Option<SkyId>,
    pub drop_unmeasured: bool,
    pub strategy: JoinStrategy,
}

impl Default for CatalogAssembler {
    fn default() -> Self {
        Self {
            invalid_id_sentinel: Some(0),
            drop_unmeasured: true,
            strategy: JoinStrategy::Concatenate,
        }
    }
}

impl CatalogAssembler {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            invalid_id_sentinel: config.invalid_id_sentinel,
            drop_unmeasured: config.drop_unmeasured,
            strategy: config.join,
        }
    }

    /// Extract every resolved group once and merge the results.
    pub fn build_magnitude_table<S: ShardStore + ?Sized>(
        &self,
        store: &S,
        layout: &SedLayout,
        resolved: &ResolvedGroups,
    ) -> Result<MagnitudeTable> {
        let extractor = MagnitudeExtractor::new(store, layout);
        let groups = resolved
            .groups
            .iter()
            .map(|request| extractor.extract(&request.group, &request.filters))
            .collect::<Result<Vec<_>>>()?;
        MagnitudeTable::from_groups(groups, &resolved.requested)
    }

    pub fn select_ids_below_threshold(
        &self,
        table: &MagnitudeTable,
        filter: &FilterName,
        threshold: f64,
    ) -> Result<Vec<SkyId>> {
        table.select_ids_below_threshold(filter, threshold)
    }

    /// Join object properties with magnitudes row by row.
    ///
    /// Both inputs must describe the same objects: equal lengths, and identical
    /// id sequences for [`JoinStrategy::Concatenate`] or equal id sets for
    /// [`JoinStrategy::AlignById`]. Invalid rows are dropped afterwards and
    /// counted in the report.
    pub fn join(
        &self,
        properties: &CatalogTable,
        magnitudes: &MagnitudeTable,
    ) -> Result<JoinedCatalog> {
        let left = properties.ids();
        let right = magnitudes.ids();
        if left.len() != right.len() {
            return Err(CatalogError::IdentifierMismatch(IdMismatch::Length {
                left: left.len(),
                right: right.len(),
            }));
        }

        let aligned = match self.strategy {
            JoinStrategy::Concatenate => {
                if let Some(mismatch) = first_difference(left, right) {
                    return Err(CatalogError::IdentifierMismatch(mismatch));
                }
                None
            }
            JoinStrategy::AlignById => Some(alignment(left, right)?),
        };
        let magnitudes = match &aligned {
            Some(order) => magnitudes.take_rows(order),
            None => magnitudes.clone(),
        };

        let mut joined = properties.clone();
        for column in magnitudes.columns() {
            joined.push_column(column)?;
        }

        let (keep, report) = self.valid_rows(&joined, &magnitudes);
        if report.dropped() > 0 {
            log::warn!(
                "dropped {} of {} joined rows ({} invalid ids, {} without magnitudes)",
                report.dropped(),
                report.input_rows,
                report.invalid_ids,
                report.unmeasured
            );
        }
        log::info!("joined catalog has {} rows", keep.len());

        Ok(JoinedCatalog {
            table: joined.take_rows(&keep),
            report,
        })
    }

    /// Null ids and the sentinel id are invalid.
    pub fn is_invalid_id(&self, id: Option<SkyId>) -> bool {
        match id {
            None => true,
            Some(id) => self.invalid_id_sentinel == Some(id),
        }
    }

    /// Rows of `table` with a valid id, and the number of rows removed.
    pub fn drop_invalid_ids(&self, table: &MagnitudeTable) -> (MagnitudeTable, usize) {
        let keep: Vec<usize> = (0..table.len())
            .filter(|&row| !self.is_invalid_id(table.ids[row]))
            .collect();
        (table.take_rows(&keep), table.len() - keep.len())
    }

    fn valid_rows(&self, joined: &CatalogTable, magnitudes: &MagnitudeTable) -> (Vec<usize>, JoinReport) {
        let mut report = JoinReport {
            input_rows: joined.len(),
            ..JoinReport::default()
        };
        let check_measured = self.drop_unmeasured && !magnitudes.filters().is_empty();

        let keep = joined
            .ids()
            .iter()
            .enumerate()
            .filter(|&(row, &id)| {
                if self.is_invalid_id(id) {
                    report.invalid_ids += 1;
                    return false;
                }
                if check_measured
                    && magnitudes
                        .filters()
                        .iter()
                        .all(|m| !m.apparent[row].is_finite())
                {
                    report.unmeasured += 1;
                    return false;
                }
                true
            })
            .map(|(row, _)| row)
            .collect();
        (keep, report)
    }
}

/// First point where two id sequences that should be identical diverge.
pub fn first_difference(left: &[Option<SkyId>], right: &[Option<SkyId>]) -> Option<IdMismatch> {
    if left.len() != right.len() {
        return Some(IdMismatch::Length {
            left: left.len(),
            right: right.len(),
        });
    }
    left.iter()
        .zip(right)
        .position(|(a, b)| a != b)
        .map(|index| IdMismatch::Position {
            index,
            left: left[index],
            right: right[index],
        })
}

/// For each left row, the right row carrying the same id.
///
/// Ids must be unique on both sides. Null ids are paired in order of occurrence.
fn alignment(left: &[Option<SkyId>], right: &[Option<SkyId>]) -> Result<Vec<usize>> {
    let mut by_id: HashMap<SkyId, usize> = HashMap::with_capacity(right.len());
    let mut nulls: VecDeque<usize> = VecDeque::new();
    for (row, id) in right.iter().enumerate() {
        match id {
            Some(id) => {
                if by_id.insert(*id, row).is_some() {
                    return Err(CatalogError::IdentifierMismatch(IdMismatch::Duplicate { id: *id }));
                }
            }
            None => nulls.push_back(row),
        }
    }

    let mut seen = HashSet::with_capacity(left.len());
    let mut order = Vec::with_capacity(left.len());
    for id in left {
        if let Some(id) = id {
            if !seen.insert(*id) {
                return Err(CatalogError::IdentifierMismatch(IdMismatch::Duplicate { id: *id }));
            }
        }
        let row = match id {
            Some(id) => by_id.remove(id),
            None => nulls.pop_front(),
        };
        let row = row.ok_or_else(|| CatalogError::IdentifierMismatch(IdMismatch::Missing { id: *id }))?;
        order.push(row);
    }
    Ok(order)
}
