//! Structured error types shared across RAD crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable machine readable codes carried inside [`ErrorInfo::code`].
///
/// Job orchestration maps these onto numeric job status codes, so they must
/// not be renamed once published.
pub mod codes {
    /// Grid construction parameters were rejected.
    pub const SHAPEGRID_INVALID_PARAMETERS: &str = "shapegrid_invalid_parameters";
    /// Grid construction produced no cells.
    pub const SHAPEGRID_NO_CELLS: &str = "shapegrid_no_cells";
    /// Layer type and intersection parameters do not match.
    pub const LAYER_TYPE_MISMATCH: &str = "layer_type_mismatch";
    /// Intersection parameters are out of range.
    pub const LAYER_INVALID_PARAMETERS: &str = "layer_invalid_parameters";
    /// Vector feature is missing the requested attribute.
    pub const LAYER_MISSING_ATTRIBUTE: &str = "layer_missing_attribute";
    /// Layer geometry could not be interpreted.
    pub const INTERSECT_GEOMETRY: &str = "intersect_geometry";
    /// Raster payload is inconsistent with its declared shape.
    pub const INTERSECT_RASTER_SHAPE: &str = "intersect_raster_shape";
    /// Intersection was requested without any layers.
    pub const INTERSECT_ZERO_LAYERS: &str = "intersect_zero_layers";
    /// Matrix and presence maps disagree on shape.
    pub const MATRIX_SHAPE_MISMATCH: &str = "matrix_shape_mismatch";
    /// Swap randomization needs at least two rows and two columns.
    pub const SWAP_TOO_FEW_COLUMNS_OR_ROWS: &str = "swap_too_few_columns_or_rows";
    /// Swap randomization exhausted its retry budget.
    pub const SWAP_RETRY_EXHAUSTED: &str = "swap_retry_exhausted";
    /// Splotch randomization could not place the requested cells.
    pub const SPLOTCH_PLACEMENT: &str = "splotch_placement";
    /// Grady randomization could not satisfy the marginal totals.
    pub const GRADY_UNSATISFIABLE: &str = "grady_unsatisfiable";
    /// Statistics calculation failed.
    pub const CALCULATE_INPUT: &str = "calculate_input";
    /// Reading a matrix file failed.
    pub const MATRIX_READ: &str = "matrix_read";
    /// Writing a matrix file failed.
    pub const MATRIX_WRITE: &str = "matrix_write";
    /// Writing presence index documents failed.
    pub const INDICES_WRITE: &str = "indices_write";
    /// A result package named a component that has no parser.
    pub const UNSUPPORTED_COMPONENT: &str = "unsupported_component";
    /// A result package is missing a required member.
    pub const PACKAGE_MEMBER_MISSING: &str = "package_member_missing";
    /// A result package could not be written as an archive.
    pub const PACKAGE_WRITE: &str = "package_write";
    /// A result package archive could not be read.
    pub const PACKAGE_READ: &str = "package_read";
    /// A package member does not match its manifest digest.
    pub const PACKAGE_DIGEST_MISMATCH: &str = "package_digest_mismatch";
    /// An XML index document could not be parsed.
    pub const XML_READ: &str = "xml_read";
    /// A job request lacks an input its stage needs.
    pub const REQUEST_INVALID: &str = "request_invalid";
    /// A job was asked to move through an invalid transition.
    pub const JOB_STATE: &str = "job_state";
    /// A worker subprocess failed.
    pub const PROCESS_FAILED: &str = "process_failed";
    /// Work was abandoned because a stop was requested.
    pub const CANCELLED: &str = "cancelled";
}

/// Structured payload attached to every [`RadError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (identifiers, sizes, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the RAD pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum RadError {
    /// Invalid grid, pool or node configuration.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// Layer type and intersection parameters are incompatible.
    #[error("layer type error: {0}")]
    LayerType(ErrorInfo),
    /// Geometry or raster content could not be intersected.
    #[error("intersection error: {0}")]
    Intersection(ErrorInfo),
    /// A randomization could not complete.
    #[error("randomization error: {0}")]
    Randomization(ErrorInfo),
    /// Filesystem or archive failures.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// A result package names a component with no parser.
    #[error("unsupported component: {0}")]
    UnsupportedComponent(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Worker subprocess failures.
    #[error("process error: {0}")]
    Process(ErrorInfo),
    /// Work was abandoned after a stop request.
    #[error("cancelled: {0}")]
    Cancelled(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl RadError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            RadError::Configuration(info)
            | RadError::LayerType(info)
            | RadError::Intersection(info)
            | RadError::Randomization(info)
            | RadError::Io(info)
            | RadError::UnsupportedComponent(info)
            | RadError::Serde(info)
            | RadError::Process(info)
            | RadError::Cancelled(info) => info,
        }
    }

    /// Returns the stable code of the payload.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Builds an [`RadError::Io`] from any displayable failure.
    pub fn io(code: &str, err: impl ToString) -> Self {
        RadError::Io(ErrorInfo::new(code, err.to_string()))
    }

    /// Builds an [`RadError::Serde`] from any displayable failure.
    pub fn serde(code: &str, err: impl ToString) -> Self {
        RadError::Serde(ErrorInfo::new(code, err.to_string()))
    }

    /// Builds an [`RadError::Configuration`] with the given code and message.
    pub fn configuration(code: &str, message: impl Into<String>) -> Self {
        RadError::Configuration(ErrorInfo::new(code, message))
    }
}
