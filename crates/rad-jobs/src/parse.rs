//! One typed encoder and parser per stage's result package.
//!
//! Member names:
//!
//! | stage | members |
//! |-------|---------|
//! | build-grid | `shapegrid.json` |
//! | intersect | `layerIndex.xml`, one `layer_<index>.npy` per layer |
//! | compress | `pam.npy`, `sitesPresent.xml`, `layersPresent.xml` |
//! | swap, splotch, grady | `matrix.npy` |
//! | calculate | one `<statistic>.npy` per array, `statistics.xml` |

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayD, Ix1, Ix2, IxDyn};

use rad_core::errors::{codes, ErrorInfo, RadError};
use rad_core::serde::{from_json_slice, to_canonical_json_bytes};
use rad_grid::ShapeGrid;
use rad_intersect::MatrixColumn;
use rad_matrix::{from_npy_bytes, to_npy_bytes, Compressed, PresenceMap};
use rad_stats::{PamStats, StatisticsSummary};

use crate::package::ResultPackage;
use crate::request::JobId;
use crate::status::JobStage;
use crate::xml::{XmlContext, LAYERS_PRESENT_ROOT, SITES_PRESENT_ROOT};

/// Grid member.
pub const SHAPEGRID_MEMBER: &str = "shapegrid.json";
/// Intersect index member.
pub const LAYER_INDEX_MEMBER: &str = "layerIndex.xml";
/// Compressed matrix member.
pub const PAM_MEMBER: &str = "pam.npy";
/// Kept sites member.
pub const SITES_PRESENT_MEMBER: &str = "sitesPresent.xml";
/// Kept layers member.
pub const LAYERS_PRESENT_MEMBER: &str = "layersPresent.xml";
/// Randomized matrix member.
pub const MATRIX_MEMBER: &str = "matrix.npy";
/// Scalar statistics member.
pub const STATISTICS_MEMBER: &str = "statistics.xml";

/// Member name of the intersected column for matrix column `index`.
pub fn layer_member(index: usize) -> String {
    format!("layer_{index}.npy")
}

/// One intersected column as carried in a package.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerArray {
    /// Presence flags.
    Presence(Array1<bool>),
    /// Summary values.
    Values(Array1<f64>),
}

impl LayerArray {
    /// Number of sites.
    pub fn len(&self) -> usize {
        match self {
            LayerArray::Presence(values) => values.len(),
            LayerArray::Values(values) => values.len(),
        }
    }

    /// True for a zero length column.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn from_npy(bytes: &[u8]) -> Result<Self, RadError> {
        match from_npy_bytes::<bool, Ix1>(bytes) {
            Ok(flags) => Ok(LayerArray::Presence(flags)),
            Err(_) => from_npy_bytes::<f64, Ix1>(bytes).map(LayerArray::Values),
        }
    }
}

impl From<&MatrixColumn> for LayerArray {
    fn from(column: &MatrixColumn) -> Self {
        match column {
            MatrixColumn::Presence(values) => LayerArray::Presence(Array1::from(values.clone())),
            MatrixColumn::Values(values) => LayerArray::Values(Array1::from(values.clone())),
        }
    }
}

/// Parsed content of a result package.
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult {
    /// A built grid.
    Grid(ShapeGrid),
    /// Intersected columns keyed by matrix column.
    Intersect(BTreeMap<usize, LayerArray>),
    /// A compressed matrix with its presence maps.
    Compress(Compressed<bool>),
    /// A randomized matrix.
    Randomized {
        /// Randomization stage that produced the matrix.
        stage: JobStage,
        /// Matrix in the layout of its input.
        matrix: Array2<bool>,
    },
    /// Named statistic arrays and the scalar summary.
    Calculate {
        /// Arrays keyed by statistic name.
        arrays: BTreeMap<String, ArrayD<f64>>,
        /// Scalar values.
        summary: StatisticsSummary,
    },
}

impl StageResult {
    /// Stage the result belongs to.
    pub fn stage(&self) -> JobStage {
        match self {
            StageResult::Grid(_) => JobStage::BuildGrid,
            StageResult::Intersect(_) => JobStage::Intersect,
            StageResult::Compress(_) => JobStage::Compress,
            StageResult::Randomized { stage, .. } => *stage,
            StageResult::Calculate { .. } => JobStage::Calculate,
        }
    }
}

/// Packages a built grid.
pub fn encode_grid(job_id: JobId, grid: &ShapeGrid) -> Result<ResultPackage, RadError> {
    Ok(ResultPackage::new(JobStage::BuildGrid.component(), job_id)
        .with_member(SHAPEGRID_MEMBER, to_canonical_json_bytes(grid)?))
}

/// Packages intersected columns with their layer index.
pub fn encode_intersect(
    job_id: JobId,
    columns: &BTreeMap<usize, MatrixColumn>,
    xml: &XmlContext,
) -> Result<ResultPackage, RadError> {
    let mut package = ResultPackage::new(JobStage::Intersect.component(), job_id);
    let mut index = BTreeMap::new();
    for (idx, column) in columns {
        let name = layer_member(*idx);
        let bytes = match column {
            MatrixColumn::Presence(values) => to_npy_bytes(&Array1::from(values.clone()))?,
            MatrixColumn::Values(values) => to_npy_bytes(&Array1::from(values.clone()))?,
        };
        package.insert(name.clone(), bytes);
        index.insert(*idx, name);
    }
    package.insert(LAYER_INDEX_MEMBER, xml.write_layer_index(&index)?);
    Ok(package)
}

/// Packages a compressed matrix.
pub fn encode_compress(job_id: JobId, compressed: &Compressed<bool>, xml: &XmlContext) -> Result<ResultPackage, RadError> {
    Ok(ResultPackage::new(JobStage::Compress.component(), job_id)
        .with_member(PAM_MEMBER, to_npy_bytes(&compressed.matrix)?)
        .with_member(
            SITES_PRESENT_MEMBER,
            xml.write_presence(SITES_PRESENT_ROOT, "site", &compressed.sites_present)?,
        )
        .with_member(
            LAYERS_PRESENT_MEMBER,
            xml.write_presence(LAYERS_PRESENT_ROOT, "layer", &compressed.layers_present)?,
        ))
}

/// Packages a randomized matrix.
pub fn encode_randomized(job_id: JobId, stage: JobStage, matrix: &Array2<bool>) -> Result<ResultPackage, RadError> {
    if !stage.is_randomization() {
        return Err(RadError::Configuration(
            ErrorInfo::new(codes::JOB_STATE, "not a randomization stage").with_context("stage", stage.component()),
        ));
    }
    Ok(ResultPackage::new(stage.component(), job_id).with_member(MATRIX_MEMBER, to_npy_bytes(matrix)?))
}

/// Packages statistics.
pub fn encode_calculate(job_id: JobId, stats: &PamStats, xml: &XmlContext) -> Result<ResultPackage, RadError> {
    let mut package = ResultPackage::new(JobStage::Calculate.component(), job_id);
    for (name, array) in stats.arrays() {
        package.insert(format!("{name}.npy"), to_npy_bytes(&array)?);
    }
    package.insert(STATISTICS_MEMBER, xml.write_statistics(&stats.summary)?);
    Ok(package)
}

/// Parses `package` for a job of stage `expected`.
///
/// A component without a parser, or one that differs from the job's stage,
/// is an [`RadError::UnsupportedComponent`].
pub fn parse_package(expected: JobStage, package: &ResultPackage, xml: &XmlContext) -> Result<StageResult, RadError> {
    let declared = JobStage::from_component(&package.component)?;
    if declared != expected {
        return Err(RadError::UnsupportedComponent(
            ErrorInfo::new(codes::UNSUPPORTED_COMPONENT, "component does not match the job stage")
                .with_context("component", package.component.as_str())
                .with_context("stage", expected.component()),
        ));
    }
    match declared {
        JobStage::BuildGrid => parse_grid(package),
        JobStage::Intersect => parse_intersect(package, xml),
        JobStage::Compress => parse_compress(package, xml),
        JobStage::Swap | JobStage::Splotch | JobStage::Grady => parse_randomized(declared, package),
        JobStage::Calculate => parse_calculate(package, xml),
    }
}

fn parse_grid(package: &ResultPackage) -> Result<StageResult, RadError> {
    let grid: ShapeGrid = from_json_slice(package.require(SHAPEGRID_MEMBER)?)?;
    Ok(StageResult::Grid(grid))
}

fn parse_intersect(package: &ResultPackage, xml: &XmlContext) -> Result<StageResult, RadError> {
    let index = xml.read_layer_index(package.require(LAYER_INDEX_MEMBER)?)?;
    let mut columns = BTreeMap::new();
    for (idx, member) in index {
        let array = LayerArray::from_npy(package.require(&member)?)
            .map_err(|err| RadError::Io(err.info().clone().with_context("member", member.as_str())))?;
        columns.insert(idx, array);
    }
    Ok(StageResult::Intersect(columns))
}

fn parse_compress(package: &ResultPackage, xml: &XmlContext) -> Result<StageResult, RadError> {
    let matrix = from_npy_bytes::<bool, Ix2>(package.require(PAM_MEMBER)?)?;
    let sites_present: PresenceMap = xml.read_presence("site", package.require(SITES_PRESENT_MEMBER)?)?;
    let layers_present: PresenceMap = xml.read_presence("layer", package.require(LAYERS_PRESENT_MEMBER)?)?;
    if matrix.nrows() != sites_present.present_count() || matrix.ncols() != layers_present.present_count() {
        return Err(RadError::Configuration(
            ErrorInfo::new(codes::MATRIX_SHAPE_MISMATCH, "compressed matrix does not match its presence maps")
                .with_context("matrix", format!("{}x{}", matrix.nrows(), matrix.ncols())),
        ));
    }
    Ok(StageResult::Compress(Compressed {
        matrix,
        sites_present,
        layers_present,
    }))
}

fn parse_randomized(stage: JobStage, package: &ResultPackage) -> Result<StageResult, RadError> {
    let matrix = from_npy_bytes::<bool, Ix2>(package.require(MATRIX_MEMBER)?)?;
    Ok(StageResult::Randomized { stage, matrix })
}

fn parse_calculate(package: &ResultPackage, xml: &XmlContext) -> Result<StageResult, RadError> {
    let summary = xml.read_statistics(package.require(STATISTICS_MEMBER)?)?;
    let mut arrays = BTreeMap::new();
    for name in package.member_names() {
        if let Some(stat) = name.strip_suffix(".npy") {
            let array = from_npy_bytes::<f64, IxDyn>(package.require(name)?)?;
            arrays.insert(stat.to_string(), array);
        }
    }
    Ok(StageResult::Calculate { arrays, summary })
}
