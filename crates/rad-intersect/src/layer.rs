//! Layer payloads and the parameters that say how to intersect them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rad_core::errors::{codes, ErrorInfo, RadError};
use rad_grid::geometry::{Envelope, Point};

/// How a raster layer is summarised per site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AncillaryMode {
    /// Area weighted mean of pixel values.
    WeightedMean,
    /// Pixel value covering the largest area.
    LargestClass,
}

/// Intersection parameters, one variant per layer kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum IntersectParams {
    /// Presence from polygons whose attribute lies in range.
    VectorPresenceAbsence {
        /// Feature attribute to test.
        attribute: String,
        /// Lowest attribute value counted as presence.
        min_presence: f64,
        /// Highest attribute value counted as presence.
        max_presence: f64,
        /// Percentage of a cell that must be covered.
        percent_presence: f64,
    },
    /// Presence from pixels whose value lies in range.
    RasterPresenceAbsence {
        /// Lowest pixel value counted as presence.
        min_presence: f64,
        /// Highest pixel value counted as presence.
        max_presence: f64,
        /// Percentage of a cell that must be covered.
        percent_presence: f64,
    },
    /// Continuous summary of pixel values.
    RasterAncillary {
        /// Summary to compute.
        mode: AncillaryMode,
        /// Minimum percentage of the cell the largest class must cover.
        #[serde(default)]
        min_percent: f64,
    },
}

fn invalid_params(message: &str) -> ErrorInfo {
    ErrorInfo::new(codes::LAYER_INVALID_PARAMETERS, message)
}

fn check_percent(value: f64, name: &str) -> Result<(), RadError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        return Ok(());
    }
    Err(RadError::LayerType(
        invalid_params("percentages must lie in [0, 100]").with_context(name, value.to_string()),
    ))
}

fn check_range(min: f64, max: f64) -> Result<(), RadError> {
    if min.is_nan() || max.is_nan() || min > max {
        return Err(RadError::LayerType(
            invalid_params("presence range must satisfy min <= max")
                .with_context("range", format!("[{min}, {max}]")),
        ));
    }
    Ok(())
}

impl IntersectParams {
    /// Rejects out of range thresholds.
    pub fn validate(&self) -> Result<(), RadError> {
        match self {
            IntersectParams::VectorPresenceAbsence {
                attribute,
                min_presence,
                max_presence,
                percent_presence,
            } => {
                if attribute.trim().is_empty() {
                    return Err(RadError::LayerType(invalid_params(
                        "vector layers need an attribute name",
                    )));
                }
                check_range(*min_presence, *max_presence)?;
                check_percent(*percent_presence, "percent_presence")
            }
            IntersectParams::RasterPresenceAbsence {
                min_presence,
                max_presence,
                percent_presence,
            } => {
                check_range(*min_presence, *max_presence)?;
                check_percent(*percent_presence, "percent_presence")
            }
            IntersectParams::RasterAncillary { min_percent, .. } => {
                check_percent(*min_percent, "min_percent")
            }
        }
    }

    /// True when the parameters yield a boolean column.
    pub fn yields_presence(&self) -> bool {
        !matches!(self, IntersectParams::RasterAncillary { .. })
    }
}

/// Polygon with optional holes; rings are open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonRings {
    /// Outer boundary.
    pub exterior: Vec<Point>,
    /// Holes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interiors: Vec<Vec<Point>>,
}

/// One vector feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorFeature {
    /// Numeric attributes keyed by field name.
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,
    /// Polygon parts.
    pub polygons: Vec<PolygonRings>,
}

/// Polygon layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VectorLayer {
    /// Features in file order.
    pub features: Vec<VectorFeature>,
}

impl VectorLayer {
    /// Envelope of every exterior ring.
    pub fn envelope(&self) -> Option<Envelope> {
        Envelope::of_points(
            self.features
                .iter()
                .flat_map(|feature| feature.polygons.iter())
                .flat_map(|polygon| polygon.exterior.iter()),
        )
    }
}

/// North-up raster with square pixels stored row-major from the top row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterLayer {
    /// X coordinate of the left edge.
    pub min_x: f64,
    /// Y coordinate of the top edge.
    pub max_y: f64,
    /// Pixel width and height.
    pub resolution: f64,
    /// Number of pixel rows.
    pub rows: usize,
    /// Number of pixel columns.
    pub cols: usize,
    /// Value marking missing pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodata: Option<f64>,
    /// Pixel values.
    pub values: Vec<f64>,
}

impl RasterLayer {
    /// Checks that the pixel buffer matches the declared shape.
    pub fn validate(&self) -> Result<(), RadError> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(RadError::Intersection(
                ErrorInfo::new(codes::INTERSECT_RASTER_SHAPE, "raster resolution must be positive")
                    .with_context("resolution", self.resolution.to_string()),
            ));
        }
        if self.values.len() != self.rows * self.cols {
            return Err(RadError::Intersection(
                ErrorInfo::new(
                    codes::INTERSECT_RASTER_SHAPE,
                    "raster value count does not match rows * cols",
                )
                .with_context("rows", self.rows.to_string())
                .with_context("cols", self.cols.to_string())
                .with_context("values", self.values.len().to_string()),
            ));
        }
        Ok(())
    }

    /// Extent covered by the pixels.
    pub fn envelope(&self) -> Envelope {
        Envelope::new(
            self.min_x,
            self.max_y - self.rows as f64 * self.resolution,
            self.min_x + self.cols as f64 * self.resolution,
            self.max_y,
        )
    }

    /// Extent of one pixel.
    pub fn pixel_envelope(&self, row: usize, col: usize) -> Envelope {
        let left = self.min_x + col as f64 * self.resolution;
        let top = self.max_y - row as f64 * self.resolution;
        Envelope::new(left, top - self.resolution, left + self.resolution, top)
    }

    /// Value of a pixel, or `None` for missing data.
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        let value = *self.values.get(row * self.cols + col)?;
        let missing = value.is_nan() || self.nodata.map_or(false, |nodata| value == nodata);
        (!missing).then_some(value)
    }
}

/// Layer geometry or pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerData {
    /// Polygon features.
    Vector(VectorLayer),
    /// Gridded values.
    Raster(RasterLayer),
}

/// A layer paired with its intersection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Geometry or pixels.
    pub data: LayerData,
    /// How to intersect it.
    pub params: IntersectParams,
}

impl Layer {
    /// Pairs data with parameters, rejecting combinations that do not apply.
    pub fn new(data: LayerData, params: IntersectParams) -> Result<Self, RadError> {
        params.validate()?;
        let compatible = matches!(
            (&data, &params),
            (LayerData::Vector(_), IntersectParams::VectorPresenceAbsence { .. })
                | (LayerData::Raster(_), IntersectParams::RasterPresenceAbsence { .. })
                | (LayerData::Raster(_), IntersectParams::RasterAncillary { .. })
        );
        if !compatible {
            let kind = match &data {
                LayerData::Vector(_) => "vector",
                LayerData::Raster(_) => "raster",
            };
            return Err(RadError::LayerType(
                ErrorInfo::new(
                    codes::LAYER_TYPE_MISMATCH,
                    "intersection parameters do not apply to this layer type",
                )
                .with_context("layer_type", kind),
            ));
        }
        Ok(Self { data, params })
    }
}
