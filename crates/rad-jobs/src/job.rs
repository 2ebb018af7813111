//! A scheduled job and the files its outputs are stored in.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use rad_core::errors::{codes, ErrorInfo, RadError};
use rad_core::serde::{to_canonical_json_bytes, write_json_file};
use rad_matrix::{from_columns, write_matrix};

use crate::parse::{LayerArray, StageResult, LAYERS_PRESENT_MEMBER, SHAPEGRID_MEMBER, SITES_PRESENT_MEMBER, STATISTICS_MEMBER};
use crate::request::{JobId, JobRequest};
use crate::status::{JobStage, JobStatus};
use crate::xml::{XmlContext, LAYERS_PRESENT_ROOT, SITES_PRESENT_ROOT};

/// Where a job stores what it receives.
///
/// Downstream requests reference these paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutputs {
    /// Directory owned by the job.
    pub dir: PathBuf,
}

impl JobOutputs {
    /// Outputs rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Grid document.
    pub fn shapegrid(&self) -> PathBuf {
        self.dir.join(SHAPEGRID_MEMBER)
    }

    /// Presence-absence matrix; full after intersect, compressed after compress.
    pub fn pam(&self) -> PathBuf {
        self.dir.join("pam.npy")
    }

    /// Continuous matrix assembled from ancillary layers.
    pub fn grim(&self) -> PathBuf {
        self.dir.join("grim.npy")
    }

    /// Randomized matrix.
    pub fn matrix(&self) -> PathBuf {
        self.dir.join("matrix.npy")
    }

    /// Kept sites document.
    pub fn sites_present(&self) -> PathBuf {
        self.dir.join(SITES_PRESENT_MEMBER)
    }

    /// Kept layers document.
    pub fn layers_present(&self) -> PathBuf {
        self.dir.join(LAYERS_PRESENT_MEMBER)
    }

    /// Directory of statistic arrays.
    pub fn statistics_dir(&self) -> PathBuf {
        self.dir.join("statistics")
    }

    /// Scalar statistics document.
    pub fn statistics(&self) -> PathBuf {
        self.dir.join(STATISTICS_MEMBER)
    }
}

/// One unit of pipeline work tracked by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Identifier.
    pub id: JobId,
    /// Stage performed.
    pub stage: JobStage,
    /// Current status.
    pub status: JobStatus,
    /// Request sent to the compute host.
    pub request: JobRequest,
    /// Jobs that must complete first.
    #[serde(default)]
    pub depends_on: Vec<JobId>,
    /// Output locations.
    pub outputs: JobOutputs,
    /// Error recorded with a failed status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// RFC 3339 time of the last status change.
    pub updated_at: String,
}

impl Job {
    /// Creates a job in [`JobStatus::General`].
    pub fn new(request: JobRequest, depends_on: Vec<JobId>, outputs: JobOutputs) -> Self {
        Self {
            id: request.job_id,
            stage: request.stage,
            status: JobStatus::General,
            request,
            depends_on,
            outputs,
            error: None,
            updated_at: Utc::now().to_rfc3339(),
        }
    }

    /// Moves to `status`; terminal jobs do not move.
    pub fn set_status(&mut self, status: JobStatus) -> Result<(), RadError> {
        if self.status.is_terminal() {
            return Err(RadError::Configuration(
                ErrorInfo::new(codes::JOB_STATE, "job already reached a terminal status")
                    .with_context("job_id", self.id.to_string())
                    .with_context("status", self.status.to_string())
                    .with_context("requested", status.to_string()),
            ));
        }
        info!(job_id = self.id, stage = self.stage.component(), status = status.code(); "job status changed");
        self.status = status;
        self.updated_at = Utc::now().to_rfc3339();
        Ok(())
    }

    /// Records `err` as the terminal status for this job's stage.
    pub fn fail(&mut self, err: &RadError) -> Result<(), RadError> {
        let status = JobStatus::for_error(self.stage, err);
        warn!(job_id = self.id, stage = self.stage.component(), status = status.code(), error = err.to_string(); "job failed");
        self.set_status(status)?;
        self.error = Some(err.info().clone());
        Ok(())
    }

    /// Applies a parsed result: stores the outputs and completes the job.
    ///
    /// Parse or storage failures become the job's terminal status instead of
    /// being returned; only an invalid transition is an error.
    pub fn apply_result(&mut self, result: Result<StageResult, RadError>, xml: &XmlContext) -> Result<JobStatus, RadError> {
        let stored = result.and_then(|parsed| {
            self.set_status(JobStatus::Computed)?;
            store_result(&self.outputs, &parsed, xml)
        });
        match stored {
            Ok(written) => {
                info!(job_id = self.id, files = written.len(); "stored job outputs");
                self.set_status(JobStatus::Complete)?;
            }
            Err(err) => self.fail(&err)?,
        }
        Ok(self.status)
    }

    /// Writes the job record next to its outputs.
    pub fn write_record(&self) -> Result<(), RadError> {
        write_json_file(&self.outputs.dir.join("job.json"), self)
    }
}

fn write_bytes(path: &Path, bytes: &[u8], code: &str) -> Result<(), RadError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| RadError::io(code, err))?;
    }
    fs::write(path, bytes).map_err(|err| {
        RadError::Io(ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()))
    })
}

/// Writes a parsed result into `outputs`, returning the files written.
pub fn store_result(outputs: &JobOutputs, result: &StageResult, xml: &XmlContext) -> Result<Vec<PathBuf>, RadError> {
    let mut written = Vec::new();
    match result {
        StageResult::Grid(grid) => {
            let path = outputs.shapegrid();
            write_bytes(&path, &to_canonical_json_bytes(grid)?, "shapegrid_write")?;
            written.push(path);
        }
        StageResult::Intersect(columns) => {
            if columns.is_empty() {
                return Err(RadError::Intersection(ErrorInfo::new(
                    codes::INTERSECT_ZERO_LAYERS,
                    "intersect result holds no layers",
                )));
            }
            if columns.keys().copied().ne(0..columns.len()) {
                return Err(RadError::Configuration(ErrorInfo::new(
                    codes::MATRIX_SHAPE_MISMATCH,
                    "layer indices must cover 0..n without gaps",
                )));
            }
            let site_count = columns.values().next().map(LayerArray::len).unwrap_or(0);
            let mut presence = Vec::new();
            let mut values = Vec::new();
            for array in columns.values() {
                match array {
                    LayerArray::Presence(flags) => presence.push(flags.to_vec()),
                    LayerArray::Values(column) => values.push(column.to_vec()),
                }
            }
            if !presence.is_empty() && !values.is_empty() {
                return Err(RadError::LayerType(ErrorInfo::new(
                    codes::LAYER_TYPE_MISMATCH,
                    "intersect result mixes presence and value columns",
                )));
            }
            if values.is_empty() {
                let path = outputs.pam();
                write_matrix(&path, &from_columns(site_count, &presence)?)?;
                written.push(path);
            } else {
                let path = outputs.grim();
                write_matrix(&path, &from_columns(site_count, &values)?)?;
                written.push(path);
            }
        }
        StageResult::Compress(compressed) => {
            let pam = outputs.pam();
            write_matrix(&pam, &compressed.matrix)?;
            let sites = outputs.sites_present();
            write_bytes(
                &sites,
                &xml.write_presence(SITES_PRESENT_ROOT, "site", &compressed.sites_present)?,
                codes::INDICES_WRITE,
            )?;
            let layers = outputs.layers_present();
            write_bytes(
                &layers,
                &xml.write_presence(LAYERS_PRESENT_ROOT, "layer", &compressed.layers_present)?,
                codes::INDICES_WRITE,
            )?;
            written.extend([pam, sites, layers]);
        }
        StageResult::Randomized { matrix, .. } => {
            let path = outputs.matrix();
            write_matrix(&path, matrix)?;
            written.push(path);
        }
        StageResult::Calculate { arrays, summary } => {
            let dir = outputs.statistics_dir();
            for (name, array) in arrays {
                let path = dir.join(format!("{name}.npy"));
                write_matrix(&path, array)?;
                written.push(path);
            }
            let path = outputs.statistics();
            write_bytes(&path, &xml.write_statistics(summary)?, codes::MATRIX_WRITE)?;
            written.push(path);
        }
    }
    Ok(written)
}
