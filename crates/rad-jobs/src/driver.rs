//! Batch loops over many jobs with log-and-continue failure handling.
//!
//! Both loops check a [`CancelToken`] between items and stop cleanly,
//! leaving unprocessed jobs untouched.

use std::path::PathBuf;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use rad_core::CancelToken;

use crate::orchestrator::{DispatchOutcome, JobTransport, Orchestrator};
use crate::package::ResultPackage;
use crate::request::JobId;
use crate::status::JobStatus;

/// What a batch loop did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Items handled before the loop ended.
    pub processed: usize,
    /// Jobs that moved forward: dispatched, or completed on receipt.
    pub advanced: Vec<JobId>,
    /// Jobs still waiting on a dependency.
    pub waiting: Vec<JobId>,
    /// Jobs or items that failed, with a description.
    pub failed: Vec<(JobId, String)>,
    /// True when a stop request ended the loop early.
    pub cancelled: bool,
}

/// Dispatches every ready job.
pub fn dispatch_ready(orchestrator: &mut Orchestrator, transport: &mut dyn JobTransport, cancel: &CancelToken) -> BatchReport {
    let mut report = BatchReport::default();
    for id in orchestrator.ready() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        report.processed += 1;
        match orchestrator.dispatch(id, transport) {
            Ok(DispatchOutcome::Dispatched) => report.advanced.push(id),
            Ok(DispatchOutcome::Waiting { .. }) => report.waiting.push(id),
            Ok(DispatchOutcome::Failed(status)) => report.failed.push((id, status.to_string())),
            Err(err) => {
                warn!(job_id = id, error = err.to_string(); "dispatch skipped");
                report.failed.push((id, err.to_string()));
            }
        }
    }
    info!(dispatched = report.advanced.len(), failed = report.failed.len(), cancelled = report.cancelled; "dispatch pass finished");
    report
}

/// Reads and applies result packages from disk, one per job.
///
/// A package that cannot be read or applied is logged and skipped; the job
/// stays as it was so the package can be delivered again.
pub fn receive_packages(orchestrator: &mut Orchestrator, packages: &[(JobId, PathBuf)], cancel: &CancelToken) -> BatchReport {
    let mut report = BatchReport::default();
    for (id, path) in packages {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        report.processed += 1;
        let package = match ResultPackage::read(path) {
            Ok(package) => package,
            Err(err) => {
                warn!(job_id = *id, path = path.display().to_string(), error = err.to_string(); "could not read package");
                report.failed.push((*id, err.to_string()));
                continue;
            }
        };
        match orchestrator.receive(*id, &package) {
            Ok(JobStatus::Complete) => report.advanced.push(*id),
            Ok(status) => report.failed.push((*id, status.to_string())),
            Err(err) => {
                warn!(job_id = *id, error = err.to_string(); "package not applied");
                report.failed.push((*id, err.to_string()));
            }
        }
    }
    info!(completed = report.advanced.len(), failed = report.failed.len(), cancelled = report.cancelled; "receive pass finished");
    report
}
