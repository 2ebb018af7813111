//! Layer against grid intersection.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use rad_core::errors::{codes, ErrorInfo, RadError};
use rad_grid::geometry::{is_valid_ring, overlap_area, Envelope};
use rad_grid::ShapeGrid;

use crate::index::SiteIndex;
use crate::layer::{AncillaryMode, IntersectParams, Layer, LayerData, RasterLayer, VectorLayer};

/// One matrix column produced for a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "lowercase")]
pub enum MatrixColumn {
    /// Presence flags per site.
    Presence(Vec<bool>),
    /// Summary values per site; NaN marks undefined.
    Values(Vec<f64>),
}

impl MatrixColumn {
    /// Number of sites covered.
    pub fn len(&self) -> usize {
        match self {
            MatrixColumn::Presence(values) => values.len(),
            MatrixColumn::Values(values) => values.len(),
        }
    }

    /// True when the column covers no sites.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of sites flagged present, for presence columns.
    pub fn present_count(&self) -> Option<usize> {
        match self {
            MatrixColumn::Presence(values) => Some(values.iter().filter(|v| **v).count()),
            MatrixColumn::Values(_) => None,
        }
    }
}

/// Covered area per site, capped at each cell's area.
///
/// Additions stop once a cell is fully covered, so totals only grow and never
/// double count overlapping features past saturation.
struct AreaAccumulator {
    covered: Vec<f64>,
    capacity: Vec<f64>,
}

impl AreaAccumulator {
    fn new(grid: &ShapeGrid) -> Self {
        Self {
            covered: vec![0.0; grid.site_count()],
            capacity: grid.sites.iter().map(|site| site.area()).collect(),
        }
    }

    fn saturated(&self, site: usize) -> bool {
        self.covered[site] >= self.capacity[site]
    }

    fn add(&mut self, site: usize, area: f64) {
        if area > 0.0 && !self.saturated(site) {
            self.covered[site] += area;
        }
    }

    fn presence(&self, percent: f64) -> Vec<bool> {
        self.covered
            .iter()
            .zip(&self.capacity)
            .map(|(covered, capacity)| *covered > capacity * percent / 100.0)
            .collect()
    }
}

/// Intersects one layer with `grid`.
///
/// Presence parameters yield [`MatrixColumn::Presence`]; a site is present
/// only when the qualifying area strictly exceeds the requested percentage of
/// its cell. Ancillary parameters yield [`MatrixColumn::Values`].
pub fn intersect_layer(grid: &ShapeGrid, layer: &Layer) -> Result<MatrixColumn, RadError> {
    let index = SiteIndex::new(grid);
    let Some(grid_extent) = grid.extent() else {
        return Ok(empty_column(&layer.params, 0));
    };
    match (&layer.data, &layer.params) {
        (
            LayerData::Vector(vector),
            IntersectParams::VectorPresenceAbsence {
                attribute,
                min_presence,
                max_presence,
                percent_presence,
            },
        ) => {
            let mut acc = AreaAccumulator::new(grid);
            vector_presence(
                grid,
                &index,
                &grid_extent,
                vector,
                attribute,
                (*min_presence, *max_presence),
                &mut acc,
            )?;
            Ok(MatrixColumn::Presence(acc.presence(*percent_presence)))
        }
        (
            LayerData::Raster(raster),
            IntersectParams::RasterPresenceAbsence {
                min_presence,
                max_presence,
                percent_presence,
            },
        ) => {
            raster.validate()?;
            let mut acc = AreaAccumulator::new(grid);
            for_each_pixel_overlap(grid, &index, &grid_extent, raster, |site, value, area| {
                if value >= *min_presence && value <= *max_presence {
                    acc.add(site, area);
                }
            });
            Ok(MatrixColumn::Presence(acc.presence(*percent_presence)))
        }
        (LayerData::Raster(raster), IntersectParams::RasterAncillary { mode, min_percent }) => {
            raster.validate()?;
            Ok(MatrixColumn::Values(raster_ancillary(
                grid,
                &index,
                &grid_extent,
                raster,
                *mode,
                *min_percent,
            )))
        }
        _ => Err(RadError::LayerType(ErrorInfo::new(
            codes::LAYER_TYPE_MISMATCH,
            "intersection parameters do not apply to this layer type",
        ))),
    }
}

fn empty_column(params: &IntersectParams, sites: usize) -> MatrixColumn {
    if params.yields_presence() {
        MatrixColumn::Presence(vec![false; sites])
    } else {
        MatrixColumn::Values(vec![f64::NAN; sites])
    }
}

fn vector_presence(
    grid: &ShapeGrid,
    index: &SiteIndex,
    grid_extent: &Envelope,
    vector: &VectorLayer,
    attribute: &str,
    (min, max): (f64, f64),
    acc: &mut AreaAccumulator,
) -> Result<(), RadError> {
    let Some(filter) = vector
        .envelope()
        .and_then(|layer_env| layer_env.intersection(grid_extent))
    else {
        debug!(features = vector.features.len(); "vector layer does not overlap the grid");
        return Ok(());
    };

    for (feature_idx, feature) in vector.features.iter().enumerate() {
        let value = *feature.attributes.get(attribute).ok_or_else(|| {
            RadError::LayerType(
                ErrorInfo::new(codes::LAYER_MISSING_ATTRIBUTE, "feature lacks the requested attribute")
                    .with_context("attribute", attribute)
                    .with_context("feature", feature_idx.to_string()),
            )
        })?;
        if !(value >= min && value <= max) {
            continue;
        }
        for polygon in &feature.polygons {
            let rings_valid = is_valid_ring(&polygon.exterior)
                && polygon.interiors.iter().all(|ring| is_valid_ring(ring));
            if !rings_valid {
                return Err(RadError::Intersection(
                    ErrorInfo::new(codes::INTERSECT_GEOMETRY, "polygon ring is not readable")
                        .with_context("feature", feature_idx.to_string()),
                ));
            }
            let Some(search) = Envelope::of_points(&polygon.exterior)
                .and_then(|env| env.intersection(&filter))
            else {
                continue;
            };
            for site in index.candidates(&search) {
                if acc.saturated(site) {
                    continue;
                }
                let area = overlap_area(&polygon.exterior, &polygon.interiors, &grid.sites[site].ring);
                acc.add(site, area);
            }
        }
    }
    Ok(())
}

/// Visits every (site, pixel value, overlap area) triple with positive overlap.
fn for_each_pixel_overlap(
    grid: &ShapeGrid,
    index: &SiteIndex,
    grid_extent: &Envelope,
    raster: &RasterLayer,
    mut visit: impl FnMut(usize, f64, f64),
) {
    let Some(filter) = raster.envelope().intersection(grid_extent) else {
        debug!(rows = raster.rows, cols = raster.cols; "raster does not overlap the grid");
        return;
    };
    let res = raster.resolution;
    let first_col = ((filter.min_x - raster.min_x) / res).floor().max(0.0) as usize;
    let last_col = (((filter.max_x - raster.min_x) / res).ceil() as usize).min(raster.cols);
    let first_row = ((raster.max_y - filter.max_y) / res).floor().max(0.0) as usize;
    let last_row = (((raster.max_y - filter.min_y) / res).ceil() as usize).min(raster.rows);

    for row in first_row..last_row {
        for col in first_col..last_col {
            let Some(value) = raster.value(row, col) else {
                continue;
            };
            let pixel = raster.pixel_envelope(row, col);
            let pixel_ring = pixel.to_ring();
            for site in index.candidates(&pixel) {
                let area = overlap_area(&pixel_ring, &[], &grid.sites[site].ring);
                if area > 0.0 {
                    visit(site, value, area);
                }
            }
        }
    }
}

fn raster_ancillary(
    grid: &ShapeGrid,
    index: &SiteIndex,
    grid_extent: &Envelope,
    raster: &RasterLayer,
    mode: AncillaryMode,
    min_percent: f64,
) -> Vec<f64> {
    let sites = grid.site_count();
    match mode {
        AncillaryMode::WeightedMean => {
            let mut weighted = vec![0.0; sites];
            let mut areas = vec![0.0; sites];
            for_each_pixel_overlap(grid, index, grid_extent, raster, |site, value, area| {
                weighted[site] += value * area;
                areas[site] += area;
            });
            weighted
                .into_iter()
                .zip(areas)
                .map(|(sum, area)| if area > 0.0 { sum / area } else { f64::NAN })
                .collect()
        }
        AncillaryMode::LargestClass => {
            // Keyed by bit pattern so equal values pool.
            let mut classes: Vec<BTreeMap<u64, f64>> = vec![BTreeMap::new(); sites];
            for_each_pixel_overlap(grid, index, grid_extent, raster, |site, value, area| {
                *classes[site].entry(value.to_bits()).or_insert(0.0) += area;
            });
            classes
                .iter()
                .zip(&grid.sites)
                .map(|(areas, site)| {
                    // Equal areas go to the smallest class value.
                    let best = areas
                        .iter()
                        .map(|(bits, area)| (f64::from_bits(*bits), *area))
                        .fold(None, |best: Option<(f64, f64)>, (value, area)| match best {
                            Some((best_value, best_area))
                                if best_area > area || (best_area == area && best_value.total_cmp(&value).is_le()) =>
                            {
                                best
                            }
                            _ => Some((value, area)),
                        });
                    match best {
                        Some((value, area)) if area / site.area() >= min_percent / 100.0 => value,
                        _ => f64::NAN,
                    }
                })
                .collect()
        }
    }
}
