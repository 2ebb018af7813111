//! Regular site grids.

use log::debug;
use serde::{Deserialize, Serialize};

use rad_core::errors::{codes, ErrorInfo, RadError};

use crate::geometry::{is_valid_ring, overlap_area, ring_area, vertex_centroid, Envelope, Point};

/// Bounding box of a grid, in map units.
pub type BBox = Envelope;

const SQRT_3: f64 = 1.732_050_807_568_877_2;
const STEP_TOLERANCE: f64 = 1e-9;

/// Cell geometry of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellShape {
    /// Four sided cells laid out in rows and columns.
    Square,
    /// Six sided cells laid out in staggered rows.
    Hexagon,
}

impl CellShape {
    /// Maps a side count onto a cell shape.
    pub fn from_sides(sides: u32) -> Result<Self, RadError> {
        match sides {
            4 => Ok(CellShape::Square),
            6 => Ok(CellShape::Hexagon),
            other => Err(RadError::Configuration(
                ErrorInfo::new(
                    codes::SHAPEGRID_INVALID_PARAMETERS,
                    "cell sides must be 4 (square) or 6 (hexagon)",
                )
                .with_context("cell_sides", other.to_string()),
            )),
        }
    }

    /// Number of sides of one cell.
    pub fn sides(&self) -> u32 {
        match self {
            CellShape::Square => 4,
            CellShape::Hexagon => 6,
        }
    }
}

/// Parameters accepted by [`build_shapegrid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Area to cover.
    pub bbox: BBox,
    /// Cell width in map units.
    pub cell_size: f64,
    /// Number of cell sides, 4 or 6.
    pub cell_sides: u32,
    /// Spatial reference code carried through to consumers.
    #[serde(default = "default_epsg")]
    pub epsg: u32,
    /// Optional polygon limiting which cells are kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutout: Option<Vec<Point>>,
}

fn default_epsg() -> u32 {
    4326
}

impl GridSpec {
    /// Describes a grid without a cutout.
    pub fn new(bbox: BBox, cell_size: f64, cell_sides: u32) -> Self {
        Self {
            bbox,
            cell_size,
            cell_sides,
            epsg: default_epsg(),
            cutout: None,
        }
    }

    fn validate(&self) -> Result<CellShape, RadError> {
        let shape = CellShape::from_sides(self.cell_sides)?;
        let invalid = |message: &str| {
            ErrorInfo::new(codes::SHAPEGRID_INVALID_PARAMETERS, message)
                .with_context("cell_size", self.cell_size.to_string())
                .with_context(
                    "bbox",
                    format!(
                        "{},{},{},{}",
                        self.bbox.min_x, self.bbox.min_y, self.bbox.max_x, self.bbox.max_y
                    ),
                )
        };
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(RadError::Configuration(invalid(
                "cell size must be a positive number",
            )));
        }
        let bounds = [
            self.bbox.min_x,
            self.bbox.min_y,
            self.bbox.max_x,
            self.bbox.max_y,
        ];
        if bounds.iter().any(|v| !v.is_finite())
            || self.bbox.min_x >= self.bbox.max_x
            || self.bbox.min_y >= self.bbox.max_y
        {
            return Err(RadError::Configuration(invalid(
                "bounding box must have min < max on both axes",
            )));
        }
        if self.bbox.width() < self.cell_size || self.bbox.height() < self.cell_size {
            return Err(RadError::Configuration(
                invalid("bounding box extent is smaller than one cell")
                    .with_hint("reduce cell_size or enlarge the bounding box"),
            ));
        }
        if let Some(cutout) = &self.cutout {
            if !is_valid_ring(cutout) {
                return Err(RadError::Configuration(invalid(
                    "cutout must be a ring of at least three finite points",
                )));
            }
        }
        Ok(shape)
    }
}

/// One cell of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Scan order identifier assigned before any cutout is applied.
    pub id: usize,
    /// Cell boundary as an open clockwise ring.
    pub ring: Vec<Point>,
    /// Cell center.
    pub centroid: Point,
}

impl Site {
    /// Cell area.
    pub fn area(&self) -> f64 {
        ring_area(&self.ring)
    }

    /// Bounding rectangle of the cell.
    pub fn envelope(&self) -> Envelope {
        let [x, y] = self.centroid;
        Envelope::of_points(&self.ring).unwrap_or_else(|| Envelope::new(x, y, x, y))
    }
}

/// Ordered collection of cells; the position of a site is its matrix row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeGrid {
    /// Bounding box the grid was built for.
    pub bbox: BBox,
    /// Cell geometry.
    pub shape: CellShape,
    /// Cell width in map units.
    pub cell_size: f64,
    /// Spatial reference code.
    pub epsg: u32,
    /// Cells in scan order.
    pub sites: Vec<Site>,
}

impl ShapeGrid {
    /// Number of sites (matrix rows).
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Envelope of all cells, which may exceed the requested bounding box.
    pub fn extent(&self) -> Option<Envelope> {
        let mut iter = self.sites.iter().map(Site::envelope);
        let first = iter.next()?;
        Some(iter.fold(first, |acc, env| acc.union(&env)))
    }
}

fn steps(extent: f64, step: f64) -> usize {
    if extent <= 0.0 {
        return 0;
    }
    ((extent / step) - STEP_TOLERANCE).ceil().max(0.0) as usize
}

fn square_rings(bbox: &BBox, size: f64) -> Vec<Vec<Point>> {
    let rows = steps(bbox.height(), size);
    let cols = steps(bbox.width(), size);
    let mut rings = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        let top = bbox.max_y - row as f64 * size;
        let bottom = top - size;
        for col in 0..cols {
            let left = bbox.min_x + col as f64 * size;
            let right = left + size;
            rings.push(vec![
                [left, top],
                [right, top],
                [right, bottom],
                [left, bottom],
            ]);
        }
    }
    rings
}

fn hexagon_rings(bbox: &BBox, size: f64) -> Vec<Vec<Point>> {
    // Rows are one apothem apart; odd rows shift by three quarters of a width.
    let apothem = size * SQRT_3 / 4.0;
    let column_step = 1.5 * size;
    let rows = steps(bbox.height(), apothem);
    let mut rings = Vec::new();
    for row in 0..rows {
        let y = bbox.max_y - row as f64 * apothem;
        let offset = if row % 2 == 1 { 0.75 * size } else { 0.0 };
        let cols = steps(bbox.width() - offset, column_step);
        for col in 0..cols {
            let x = bbox.min_x + offset + col as f64 * column_step;
            rings.push(vec![
                [x - 0.25 * size, y + apothem],
                [x + 0.25 * size, y + apothem],
                [x + 0.5 * size, y],
                [x + 0.25 * size, y - apothem],
                [x - 0.25 * size, y - apothem],
                [x - 0.5 * size, y],
            ]);
        }
    }
    rings
}

/// Builds the grid described by `spec`.
///
/// Cells are generated row by row from the top edge of the bounding box. With
/// a cutout, cells that do not overlap it are dropped; surviving cells keep
/// their scan order and identifiers.
pub fn build_shapegrid(spec: &GridSpec) -> Result<ShapeGrid, RadError> {
    let shape = spec.validate()?;
    let rings = match shape {
        CellShape::Square => square_rings(&spec.bbox, spec.cell_size),
        CellShape::Hexagon => hexagon_rings(&spec.bbox, spec.cell_size),
    };
    let scanned = rings.len();
    let sites: Vec<Site> = rings
        .into_iter()
        .enumerate()
        .filter(|(_, ring)| match &spec.cutout {
            Some(cutout) => overlap_area(cutout, &[], ring) > 0.0,
            None => true,
        })
        .map(|(id, ring)| Site {
            id,
            centroid: vertex_centroid(&ring),
            ring,
        })
        .collect();

    if sites.is_empty() {
        return Err(RadError::Configuration(
            ErrorInfo::new(codes::SHAPEGRID_NO_CELLS, "no cells fall inside the cutout")
                .with_context("scanned", scanned.to_string()),
        ));
    }
    debug!(shape:? = shape, scanned = scanned, kept = sites.len(); "built shapegrid");
    Ok(ShapeGrid {
        bbox: spec.bbox,
        shape,
        cell_size: spec.cell_size,
        epsg: spec.epsg,
        sites,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_count_tolerates_float_noise() {
        assert_eq!(steps(10.0, 0.1), 100);
        assert_eq!(steps(10.0, 5.0), 2);
        assert_eq!(steps(10.5, 5.0), 3);
        assert_eq!(steps(-1.0, 5.0), 0);
    }

    #[test]
    fn hexagon_area_matches_regular_hexagon() {
        let bbox = BBox::new(0.0, 0.0, 4.0, 4.0);
        let rings = hexagon_rings(&bbox, 2.0);
        let expected = 3.0 * SQRT_3 / 2.0 * 1.0; // circumradius 1
        assert!((ring_area(&rings[0]) - expected).abs() < 1e-9);
    }
}
