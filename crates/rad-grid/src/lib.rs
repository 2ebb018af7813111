#![deny(missing_docs)]
#![doc = "Builds regular square or hexagonal site grids over a bounding box, derives site adjacency and persists grids as JSON."]

pub mod adjacency;
pub mod geometry;
pub mod io;
pub mod shapegrid;

pub use adjacency::AdjacencyGraph;
pub use geometry::{Envelope, Point};
pub use io::{read_shapegrid, write_shapegrid};
pub use shapegrid::{build_shapegrid, BBox, CellShape, GridSpec, ShapeGrid, Site};
