//! Job stages and numeric job status codes.

use std::fmt;

use serde::{Deserialize, Serialize};

use rad_core::errors::{codes, ErrorInfo, RadError};

/// Pipeline stage a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStage {
    /// Tessellate a bounding box into sites.
    BuildGrid,
    /// Intersect layers with a grid.
    Intersect,
    /// Drop empty rows and columns from a matrix.
    Compress,
    /// Swap randomization.
    Swap,
    /// Splotch randomization.
    Splotch,
    /// Grady randomization.
    Grady,
    /// Diversity statistics.
    Calculate,
}

impl JobStage {
    /// Every stage in pipeline order.
    pub const ALL: [JobStage; 7] = [
        JobStage::BuildGrid,
        JobStage::Intersect,
        JobStage::Compress,
        JobStage::Swap,
        JobStage::Splotch,
        JobStage::Grady,
        JobStage::Calculate,
    ];

    /// Component name declared by result packages of this stage.
    pub fn component(&self) -> &'static str {
        match self {
            JobStage::BuildGrid => "build-grid",
            JobStage::Intersect => "intersect",
            JobStage::Compress => "compress",
            JobStage::Swap => "swap",
            JobStage::Splotch => "splotch",
            JobStage::Grady => "grady",
            JobStage::Calculate => "calculate",
        }
    }

    /// Resolves a declared component name.
    pub fn from_component(name: &str) -> Result<Self, RadError> {
        let wanted = name.trim().to_ascii_lowercase();
        JobStage::ALL
            .into_iter()
            .find(|stage| stage.component() == wanted)
            .ok_or_else(|| {
                RadError::UnsupportedComponent(
                    ErrorInfo::new(codes::UNSUPPORTED_COMPONENT, "no parser for component")
                        .with_context("component", name),
                )
            })
    }

    /// Numeric process type used by compute hosts.
    pub fn process_type(&self) -> u32 {
        match self {
            JobStage::BuildGrid => 305,
            JobStage::Intersect => 310,
            JobStage::Compress => 320,
            JobStage::Swap => 331,
            JobStage::Splotch => 332,
            JobStage::Grady => 333,
            JobStage::Calculate => 340,
        }
    }

    /// Stages whose jobs may feed a job of this stage.
    ///
    /// A job is dispatched only after every job it depends on is complete.
    /// Splotch returns a full matrix, so its output is compressed again.
    pub fn predecessors(&self) -> &'static [JobStage] {
        match self {
            JobStage::BuildGrid => &[],
            JobStage::Intersect => &[JobStage::BuildGrid],
            JobStage::Compress => &[JobStage::Intersect, JobStage::Splotch],
            JobStage::Swap | JobStage::Splotch | JobStage::Grady => &[JobStage::Compress],
            JobStage::Calculate => &[
                JobStage::Compress,
                JobStage::Swap,
                JobStage::Splotch,
                JobStage::Grady,
            ],
        }
    }

    /// True for the randomization stages.
    pub fn is_randomization(&self) -> bool {
        matches!(self, JobStage::Swap | JobStage::Splotch | JobStage::Grady)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.component())
    }
}

/// Status of a job, serialized as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum JobStatus {
    /// Scheduled, not yet dispatched.
    General,
    /// Being prepared by its producer.
    Initialize,
    /// Request handed to a compute host.
    PullRequested,
    /// Compute host retrieved the request.
    PullComplete,
    /// Result package parsed, outputs not yet stored.
    Computed,
    /// Outputs stored.
    Complete,
    /// Failure without a more specific code.
    GeneralError,
    /// Result package named a component without a parser.
    UnsupportedComponent,
    /// Submission to a compute host failed.
    PushFailed,
    /// Stopped on request.
    RemoteKill,
    /// A matrix could not be read.
    IoMatrixReadError,
    /// A matrix could not be written.
    IoMatrixWriteError,
    /// Presence index documents could not be written.
    IoIndicesWriteError,
    /// Intersection failed.
    RadIntersectError,
    /// Intersection requested without layers.
    RadIntersectZeroLayersError,
    /// Compression failed.
    RadCompressError,
    /// Statistics failed.
    RadCalculateError,
    /// Swap randomization failed.
    RadSwapError,
    /// Swap randomization got a matrix smaller than 2x2.
    RadSwapTooFewColumnsOrRowsError,
    /// Grady randomization failed.
    RadGradyError,
    /// Splotch randomization failed.
    RadSplotchError,
    /// Grid construction failed.
    RadShapegridError,
    /// Grid parameters were rejected.
    RadShapegridInvalidParameters,
    /// Grid construction kept no cells.
    RadShapegridNoCells,
}

impl JobStatus {
    const TABLE: [(JobStatus, u32); 24] = [
        (JobStatus::General, 0),
        (JobStatus::Initialize, 1),
        (JobStatus::PullRequested, 90),
        (JobStatus::PullComplete, 100),
        (JobStatus::Computed, 130),
        (JobStatus::Complete, 300),
        (JobStatus::GeneralError, 1000),
        (JobStatus::UnsupportedComponent, 1010),
        (JobStatus::PushFailed, 1100),
        (JobStatus::RemoteKill, 1150),
        (JobStatus::IoMatrixReadError, 6401),
        (JobStatus::IoMatrixWriteError, 6402),
        (JobStatus::IoIndicesWriteError, 6502),
        (JobStatus::RadIntersectError, 8100),
        (JobStatus::RadIntersectZeroLayersError, 8110),
        (JobStatus::RadCompressError, 8200),
        (JobStatus::RadCalculateError, 8300),
        (JobStatus::RadSwapError, 8400),
        (JobStatus::RadSwapTooFewColumnsOrRowsError, 8410),
        (JobStatus::RadGradyError, 8450),
        (JobStatus::RadSplotchError, 8500),
        (JobStatus::RadShapegridError, 8600),
        (JobStatus::RadShapegridInvalidParameters, 8601),
        (JobStatus::RadShapegridNoCells, 8610),
    ];

    /// Numeric status code.
    pub fn code(&self) -> u32 {
        Self::TABLE
            .iter()
            .find(|(status, _)| status == self)
            .map(|(_, code)| *code)
            .unwrap_or(1000)
    }

    /// Looks up a status by numeric code.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(_, known)| *known == code)
            .map(|(status, _)| *status)
    }

    /// Error statuses start at 1000.
    pub fn is_error(&self) -> bool {
        self.code() >= 1000
    }

    /// Complete or failed; a terminal job is archived.
    pub fn is_terminal(&self) -> bool {
        *self == JobStatus::Complete || self.is_error()
    }

    /// Status recording `err` raised while running or receiving `stage`.
    pub fn for_error(stage: JobStage, err: &RadError) -> Self {
        if matches!(err, RadError::UnsupportedComponent(_)) {
            return JobStatus::UnsupportedComponent;
        }
        match err.code() {
            codes::MATRIX_READ => JobStatus::IoMatrixReadError,
            codes::MATRIX_WRITE => JobStatus::IoMatrixWriteError,
            codes::INDICES_WRITE => JobStatus::IoIndicesWriteError,
            codes::INTERSECT_ZERO_LAYERS => JobStatus::RadIntersectZeroLayersError,
            codes::SWAP_TOO_FEW_COLUMNS_OR_ROWS => JobStatus::RadSwapTooFewColumnsOrRowsError,
            codes::SHAPEGRID_INVALID_PARAMETERS => JobStatus::RadShapegridInvalidParameters,
            codes::SHAPEGRID_NO_CELLS => JobStatus::RadShapegridNoCells,
            codes::CANCELLED => JobStatus::RemoteKill,
            _ => match stage {
                JobStage::BuildGrid => JobStatus::RadShapegridError,
                JobStage::Intersect => JobStatus::RadIntersectError,
                JobStage::Compress => JobStatus::RadCompressError,
                JobStage::Swap => JobStatus::RadSwapError,
                JobStage::Splotch => JobStatus::RadSplotchError,
                JobStage::Grady => JobStatus::RadGradyError,
                JobStage::Calculate => JobStatus::RadCalculateError,
            },
        }
    }
}

impl From<JobStatus> for u32 {
    fn from(status: JobStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u32> for JobStatus {
    type Error = String;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        JobStatus::from_code(code).ok_or_else(|| format!("unknown job status code {code}"))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}
