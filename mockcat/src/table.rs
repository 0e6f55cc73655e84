//! Column-oriented catalog tables keyed by sky id.

use std::collections::HashSet;
use std::fmt;

use ndarray::{concatenate, Array1, Axis};

use crate::error::{CatalogError, Result};
use crate::filter_name::FilterName;

/// Unique identifier of a simulated object within one run.
pub type SkyId = i64;

/// What a table column holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// An object property such as `ra` or `zobs`.
    Property(String),
    /// Apparent magnitude in a filter.
    Apparent(FilterName),
    /// Absolute magnitude in a filter.
    Absolute(FilterName),
}

impl ColumnKind {
    /// Token used for this column in a text header.
    pub fn header_name(&self) -> String {
        match self {
            ColumnKind::Property(name) => name.clone(),
            ColumnKind::Apparent(filter) => filter.apparent_column(),
            ColumnKind::Absolute(filter) => filter.absolute_column(),
        }
    }

    /// Recover the kind from a header token.
    pub fn from_header(token: &str) -> Self {
        if let Some(name) = token.strip_suffix("_ap") {
            ColumnKind::Apparent(FilterName::new(name))
        } else if let Some(name) = token.strip_suffix("_ab") {
            ColumnKind::Absolute(FilterName::new(name))
        } else {
            ColumnKind::Property(token.to_string())
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_name())
    }
}

/// One named column of values.
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub kind: ColumnKind,
    pub values: Array1<f64>,
}

impl TableColumn {
    pub fn new(kind: ColumnKind, values: impl Into<Array1<f64>>) -> Self {
        Self {
            kind,
            values: values.into(),
        }
    }

    pub fn property(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(ColumnKind::Property(name.into()), values)
    }
}

/// Rows of objects: a nullable id per row and any number of float columns.
///
/// Ids stay nullable until a table is written out, so a missing id is never
/// confused with a real object.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogTable {
    id_column: String,
    ids: Vec<Option<SkyId>>,
    columns: Vec<TableColumn>,
}

impl CatalogTable {
    /// An empty table with no rows and no value columns.
    pub fn new(id_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            ids: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Build a table, checking that every column has one value per id.
    pub fn from_parts(
        id_column: impl Into<String>,
        ids: Vec<Option<SkyId>>,
        columns: Vec<TableColumn>,
    ) -> Result<Self> {
        let mut table = Self {
            id_column: id_column.into(),
            ids,
            columns: Vec::with_capacity(columns.len()),
        };
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Name of the identifier column (`ID` for magnitude tables).
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn ids(&self) -> &[Option<SkyId>] {
        &self.ids
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Header tokens: the id column followed by every value column.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.id_column.clone())
            .chain(self.columns.iter().map(|c| c.kind.header_name()))
            .collect()
    }

    /// Find a column by its header token.
    pub fn column(&self, header_name: &str) -> Option<&TableColumn> {
        self.columns
            .iter()
            .find(|c| c.kind.header_name() == header_name)
    }

    /// Append a value column.
    pub fn push_column(&mut self, column: TableColumn) -> Result<()> {
        if column.values.len() != self.ids.len() {
            return Err(CatalogError::ColumnLength {
                column: column.kind.header_name(),
                expected: self.ids.len(),
                found: column.values.len(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// New table holding the rows at `indices`, in that order.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            id_column: self.id_column.clone(),
            ids: indices.iter().map(|&i| self.ids[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| TableColumn {
                    kind: c.kind.clone(),
                    values: c.values.select(Axis(0), indices),
                })
                .collect(),
        }
    }

    /// Keep the rows whose id is in `ids`, preserving table order.
    pub fn retain_ids(&self, ids: &[SkyId]) -> Self {
        let wanted: HashSet<SkyId> = ids.iter().copied().collect();
        let indices: Vec<usize> = self
            .ids
            .iter()
            .enumerate()
            .filter(|(_, id)| id.map_or(false, |id| wanted.contains(&id)))
            .map(|(i, _)| i)
            .collect();
        self.take_rows(&indices)
    }

    /// Stable sort of the rows by id, null ids last.
    pub fn sort_by_id(&mut self) {
        let mut order: Vec<usize> = (0..self.ids.len()).collect();
        order.sort_by_key(|&i| (self.ids[i].is_none(), self.ids[i]));
        if order.iter().enumerate().any(|(pos, &i)| pos != i) {
            *self = self.take_rows(&order);
        }
    }

    /// Stack the rows of `other` below this table's rows.
    ///
    /// Both tables must have the same id column and the same columns in the
    /// same order. A table with neither rows nor columns takes the layout of
    /// `other`.
    pub fn append(&mut self, other: CatalogTable) -> Result<()> {
        if self.ids.is_empty() && self.columns.is_empty() && self.id_column == other.id_column {
            *self = other;
            return Ok(());
        }

        let same_layout = self.id_column == other.id_column
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.kind == b.kind);
        if !same_layout {
            return Err(CatalogError::ColumnLayout(format!(
                "[{}] vs [{}]",
                self.header().join(" "),
                other.header().join(" ")
            )));
        }

        for (mine, theirs) in self.columns.iter_mut().zip(&other.columns) {
            mine.values = concatenate(Axis(0), &[mine.values.view(), theirs.values.view()])
                .map_err(|e| CatalogError::ColumnLayout(e.to_string()))?;
        }
        self.ids.extend(other.ids);
        Ok(())
    }
}
