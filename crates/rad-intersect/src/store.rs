//! Layer documents on disk.
//!
//! Layers are stored as JSON: vector layers as features with numeric
//! attributes and polygon rings, rasters as a north-up pixel block.

use std::path::Path;

use rad_core::errors::RadError;
use rad_core::serde::{read_json_file, write_json_file};

use crate::layer::{IntersectParams, Layer, LayerData};

/// Reads layer data from a JSON document.
pub fn read_layer_data(path: &Path) -> Result<LayerData, RadError> {
    read_json_file(path)
}

/// Writes layer data as canonical JSON.
pub fn write_layer_data(path: &Path, data: &LayerData) -> Result<(), RadError> {
    write_json_file(path, data)
}

/// Reads layer data and pairs it with `params`.
pub fn open_layer(path: &Path, params: IntersectParams) -> Result<Layer, RadError> {
    Layer::new(read_layer_data(path)?, params)
}
