//! Whitespace-delimited text catalogs.
//!
//! A catalog file has a header line of column names, the id column first, and
//! one line per object. Every token, including the last on a line, is followed
//! by a single space. Missing values and null ids are written as `NaN`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::Array1;

use crate::error::{CatalogError, Result};
use crate::table::{CatalogTable, ColumnKind, SkyId, TableColumn};

/// Id column name of magnitude catalogs.
pub const MAGNITUDE_ID_COLUMN: &str = "ID";

/// Write `table` to `out`.
pub fn write_catalog<W: Write>(table: &CatalogTable, mut out: W) -> std::io::Result<()> {
    for token in table.header() {
        write!(out, "{token} ")?;
    }
    writeln!(out)?;

    for (row, id) in table.ids().iter().enumerate() {
        match id {
            Some(id) => write!(out, "{id} ")?,
            None => write!(out, "NaN ")?,
        }
        for column in table.columns() {
            write!(out, "{} ", column.values[row])?;
        }
        writeln!(out)?;
    }
    out.flush()
}

/// Write `table` to a file, replacing any existing one.
pub fn write_catalog_file(table: &CatalogTable, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| CatalogError::io(path, e))?;
    write_catalog(table, BufWriter::new(file)).map_err(|e| CatalogError::io(path, e))?;
    log::info!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Read the header of a catalog file, checking that it starts with `expected_id`.
pub fn read_header(path: &Path, expected_id: &str) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| CatalogError::io(path, e))?;
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|e| CatalogError::io(path, e))?;
    parse_header(path, &line, expected_id)
}

fn parse_header(path: &Path, line: &str, expected_id: &str) -> Result<Vec<String>> {
    let header: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    match header.first() {
        Some(first) if first == expected_id => Ok(header),
        first => Err(CatalogError::MalformedHeader {
            path: path.to_path_buf(),
            expected: expected_id.to_string(),
            found: first.cloned().unwrap_or_default(),
        }),
    }
}

fn parse_id(token: &str) -> Option<Option<SkyId>> {
    if let Ok(id) = token.parse::<SkyId>() {
        return Some(Some(id));
    }
    let value = token.parse::<f64>().ok()?;
    if value.is_nan() {
        Some(None)
    } else if value.is_finite() && value.fract() == 0.0 {
        Some(Some(value as SkyId))
    } else {
        None
    }
}

/// Read a catalog file whose first column must be `expected_id`.
pub fn read_catalog(path: &Path, expected_id: &str) -> Result<CatalogTable> {
    let file = File::open(path).map_err(|e| CatalogError::io(path, e))?;
    let mut lines = BufReader::new(file).lines();

    let header_line = lines
        .next()
        .transpose()
        .map_err(|e| CatalogError::io(path, e))?
        .unwrap_or_default();
    let header = parse_header(path, &header_line, expected_id)?;

    let mut ids = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); header.len() - 1];
    for (index, line) in lines.enumerate() {
        let line_no = index + 2;
        let line = line.map_err(|e| CatalogError::io(path, e))?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let parse_error = |message: String| CatalogError::Parse {
            path: path.to_path_buf(),
            line: line_no,
            message,
        };
        if tokens.len() != header.len() {
            return Err(parse_error(format!(
                "{} values for {} columns",
                tokens.len(),
                header.len()
            )));
        }

        let id = parse_id(tokens[0])
            .ok_or_else(|| parse_error(format!("'{}' is not an id", tokens[0])))?;
        ids.push(id);
        for (column, token) in values.iter_mut().zip(&tokens[1..]) {
            let value = token
                .parse::<f64>()
                .map_err(|e| parse_error(format!("'{token}': {e}")))?;
            column.push(value);
        }
    }

    let columns = header[1..]
        .iter()
        .zip(values)
        .map(|(name, column)| TableColumn::new(ColumnKind::from_header(name), Array1::from(column)))
        .collect();
    CatalogTable::from_parts(expected_id, ids, columns)
}

/// Ids of a catalog file whose value in `column` is strictly below `limit`.
pub fn ids_below_threshold_in_file(
    path: &Path,
    expected_id: &str,
    column: &str,
    limit: f64,
) -> Result<Vec<SkyId>> {
    let table = read_catalog(path, expected_id)?;
    let values = &table
        .column(column)
        .ok_or_else(|| CatalogError::UnknownColumn(column.to_string()))?
        .values;
    Ok(table
        .ids()
        .iter()
        .zip(values.iter())
        .filter(|(_, value)| **value < limit)
        .filter_map(|(id, _)| *id)
        .collect())
}
