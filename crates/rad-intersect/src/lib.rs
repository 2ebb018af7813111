#![deny(missing_docs)]
#![doc = "Computes per-site presence or summary values for one layer against a site grid."]

pub mod engine;
pub mod index;
pub mod layer;
pub mod store;

pub use engine::{intersect_layer, MatrixColumn};
pub use index::SiteIndex;
pub use layer::{
    AncillaryMode, IntersectParams, Layer, LayerData, PolygonRings, RasterLayer, VectorFeature,
    VectorLayer,
};
pub use store::{open_layer, read_layer_data, write_layer_data};
