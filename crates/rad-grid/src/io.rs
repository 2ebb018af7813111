//! JSON persistence for grids.

use std::path::Path;

use log::info;

use rad_core::errors::RadError;
use rad_core::serde::{read_json_file, write_json_file};

use crate::shapegrid::ShapeGrid;

/// Writes `grid` as canonical JSON.
pub fn write_shapegrid(path: &Path, grid: &ShapeGrid) -> Result<(), RadError> {
    write_json_file(path, grid)?;
    info!(path = path.display().to_string(), sites = grid.site_count(); "wrote shapegrid");
    Ok(())
}

/// Reads a grid previously written with [`write_shapegrid`].
pub fn read_shapegrid(path: &Path) -> Result<ShapeGrid, RadError> {
    read_json_file(path)
}
