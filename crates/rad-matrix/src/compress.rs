//! Removal and restoration of empty rows and columns.

use ndarray::{Array2, Axis};

use rad_core::errors::{codes, ErrorInfo, RadError};

use crate::presence::PresenceMap;

/// Element type that has a distinguished "absent" value.
pub trait MatrixCell: Copy + PartialEq + std::fmt::Debug {
    /// Value of an empty cell.
    fn absent() -> Self;

    /// True when the cell holds the absent value.
    fn is_absent(&self) -> bool {
        *self == Self::absent()
    }
}

impl MatrixCell for bool {
    fn absent() -> Self {
        false
    }
}

impl MatrixCell for f64 {
    fn absent() -> Self {
        0.0
    }
}

/// A matrix with its empty rows and columns removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Compressed<T> {
    /// Remaining rows and columns in original order.
    pub matrix: Array2<T>,
    /// Which original rows (sites) were kept.
    pub sites_present: PresenceMap,
    /// Which original columns (layers) were kept.
    pub layers_present: PresenceMap,
}

fn shape_mismatch(message: &str) -> ErrorInfo {
    ErrorInfo::new(codes::MATRIX_SHAPE_MISMATCH, message)
}

/// Drops every row and every column that holds only absent cells.
pub fn compress<T: MatrixCell>(matrix: &Array2<T>) -> Compressed<T> {
    let row_flags: Vec<bool> = matrix
        .axis_iter(Axis(0))
        .map(|row| row.iter().any(|cell| !cell.is_absent()))
        .collect();
    let col_flags: Vec<bool> = matrix
        .axis_iter(Axis(1))
        .map(|col| col.iter().any(|cell| !cell.is_absent()))
        .collect();

    let sites_present = PresenceMap::from_flags(row_flags);
    let layers_present = PresenceMap::from_flags(col_flags);
    let rows = sites_present.present_indices();
    let cols = layers_present.present_indices();
    let kept = Array2::from_shape_fn((rows.len(), cols.len()), |(r, c)| matrix[[rows[r], cols[c]]]);

    Compressed {
        matrix: kept,
        sites_present,
        layers_present,
    }
}

/// Re-inserts absent rows and columns recorded in the presence maps.
pub fn decompress<T: MatrixCell>(
    compressed: &Array2<T>,
    sites_present: &PresenceMap,
    layers_present: &PresenceMap,
) -> Result<Array2<T>, RadError> {
    if !sites_present.is_dense() || !layers_present.is_dense() {
        return Err(RadError::Configuration(shape_mismatch(
            "presence maps must cover indices 0..n without gaps",
        )));
    }
    let (rows, cols) = compressed.dim();
    if rows != sites_present.present_count() || cols != layers_present.present_count() {
        return Err(RadError::Configuration(
            shape_mismatch("compressed matrix does not match the presence maps")
                .with_context("matrix", format!("{rows}x{cols}"))
                .with_context(
                    "present",
                    format!(
                        "{}x{}",
                        sites_present.present_count(),
                        layers_present.present_count()
                    ),
                ),
        ));
    }

    let mut full = Array2::from_elem((sites_present.len(), layers_present.len()), T::absent());
    let layer_indices = layers_present.present_indices();
    for (row, site) in sites_present.present_indices().into_iter().enumerate() {
        for (col, layer) in layer_indices.iter().enumerate() {
            full[[site, *layer]] = compressed[[row, col]];
        }
    }
    Ok(full)
}

/// Assembles a sites by layers matrix from per-layer columns.
pub fn from_columns<T: MatrixCell>(site_count: usize, columns: &[Vec<T>]) -> Result<Array2<T>, RadError> {
    if let Some((layer, column)) = columns
        .iter()
        .enumerate()
        .find(|(_, column)| column.len() != site_count)
    {
        return Err(RadError::Configuration(
            shape_mismatch("column length differs from the site count")
                .with_context("layer", layer.to_string())
                .with_context("length", column.len().to_string())
                .with_context("sites", site_count.to_string()),
        ));
    }
    Ok(Array2::from_shape_fn((site_count, columns.len()), |(site, layer)| {
        columns[layer][site]
    }))
}
