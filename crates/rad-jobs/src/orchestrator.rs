//! Schedules jobs, dispatches their requests and applies returned packages.
//!
//! The orchestrator only moves references and statuses around; every numeric
//! computation happens on a compute host.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use rad_core::errors::{codes, ErrorInfo, RadError};

use crate::job::{Job, JobOutputs};
use crate::package::ResultPackage;
use crate::parse::parse_package;
use crate::request::{JobId, JobRequest};
use crate::status::{JobStage, JobStatus};
use crate::xml::XmlContext;

/// Hands a request to a compute host.
pub trait JobTransport {
    /// Submits `request`; the result package arrives later through
    /// [`Orchestrator::receive`].
    fn submit(&mut self, request: &JobRequest) -> Result<(), RadError>;
}

/// Outcome of a dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Request submitted; the job is now [`JobStatus::PullRequested`].
    Dispatched,
    /// A dependency is not complete yet; nothing changed.
    Waiting {
        /// First incomplete dependency.
        blocked_on: JobId,
    },
    /// The job failed before or during submission and was archived.
    Failed(JobStatus),
}

/// Tracks every job from scheduling to its terminal status.
#[derive(Debug)]
pub struct Orchestrator {
    output_root: PathBuf,
    xml: XmlContext,
    next_id: JobId,
    active: BTreeMap<JobId, Job>,
    archived: BTreeMap<JobId, Job>,
}

fn state_error(id: JobId, message: &str) -> RadError {
    RadError::Configuration(ErrorInfo::new(codes::JOB_STATE, message).with_context("job_id", id.to_string()))
}

impl Orchestrator {
    /// Creates an orchestrator storing job outputs under `output_root`.
    pub fn new(output_root: impl Into<PathBuf>, xml: XmlContext) -> Self {
        Self {
            output_root: output_root.into(),
            xml,
            next_id: 1,
            active: BTreeMap::new(),
            archived: BTreeMap::new(),
        }
    }

    /// Root of the job output directories.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// XML settings used for received packages.
    pub fn xml(&self) -> &XmlContext {
        &self.xml
    }

    /// Schedules `request` after the jobs in `depends_on`.
    ///
    /// The request's job id is replaced by a fresh one. Every dependency must
    /// exist and belong to a predecessor stage.
    pub fn schedule(&mut self, mut request: JobRequest, depends_on: &[JobId]) -> Result<JobId, RadError> {
        for dep in depends_on {
            let dep_stage = self
                .job(*dep)
                .map(|job| job.stage)
                .ok_or_else(|| state_error(*dep, "dependency is not a known job"))?;
            if !request.stage.predecessors().contains(&dep_stage) {
                return Err(RadError::Configuration(
                    ErrorInfo::new(codes::JOB_STATE, "dependency stage cannot feed this stage")
                        .with_context("stage", request.stage.component())
                        .with_context("dependency_stage", dep_stage.component()),
                ));
            }
        }
        let id = self.next_id;
        self.next_id += 1;
        request.job_id = id;
        let outputs = JobOutputs::new(self.output_root.join(format!("job_{id}")));
        info!(job_id = id, stage = request.stage.component(), depends_on:? = depends_on; "scheduled job");
        self.active
            .insert(id, Job::new(request, depends_on.to_vec(), outputs));
        Ok(id)
    }

    /// Looks a job up among active and archived jobs.
    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.active.get(&id).or_else(|| self.archived.get(&id))
    }

    /// Current status of a job.
    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.job(id).map(|job| job.status)
    }

    /// Output locations of a job.
    pub fn outputs(&self, id: JobId) -> Option<&JobOutputs> {
        self.job(id).map(|job| &job.outputs)
    }

    /// Jobs that have not reached a terminal status.
    pub fn active(&self) -> impl Iterator<Item = &Job> {
        self.active.values()
    }

    /// Jobs that reached a terminal status.
    pub fn archived(&self) -> impl Iterator<Item = &Job> {
        self.archived.values()
    }

    /// Scheduled jobs whose dependencies are all complete.
    pub fn ready(&self) -> Vec<JobId> {
        self.active
            .values()
            .filter(|job| job.status == JobStatus::General)
            .filter(|job| {
                job.depends_on
                    .iter()
                    .all(|dep| self.status(*dep) == Some(JobStatus::Complete))
            })
            .map(|job| job.id)
            .collect()
    }

    /// Submits a scheduled job once its dependencies are complete.
    ///
    /// Never blocks: an incomplete dependency yields
    /// [`DispatchOutcome::Waiting`]. A failed dependency, an invalid request
    /// or a rejected submission fails the job and archives it. Only misuse
    /// (unknown job, job already dispatched) is returned as an error.
    pub fn dispatch(&mut self, id: JobId, transport: &mut dyn JobTransport) -> Result<DispatchOutcome, RadError> {
        let (depends_on, request) = {
            let job = self
                .active
                .get(&id)
                .ok_or_else(|| state_error(id, "job is not active"))?;
            if job.status != JobStatus::General {
                return Err(state_error(id, "job was already dispatched"));
            }
            (job.depends_on.clone(), job.request.clone())
        };

        let mut blocked = None;
        for dep in depends_on {
            match self.status(dep) {
                Some(JobStatus::Complete) => {}
                Some(status) if status.is_error() => {
                    let err = RadError::Configuration(
                        ErrorInfo::new(codes::JOB_STATE, "a dependency failed")
                            .with_context("dependency", dep.to_string())
                            .with_context("dependency_status", status.to_string()),
                    );
                    return self.fail_and_archive(id, &err);
                }
                _ => {
                    blocked.get_or_insert(dep);
                }
            }
        }
        if let Some(blocked_on) = blocked {
            debug!(job_id = id, blocked_on = blocked_on; "dependency not complete");
            return Ok(DispatchOutcome::Waiting { blocked_on });
        }

        if let Err(err) = request.validate() {
            return self.fail_and_archive(id, &err);
        }
        if let Err(err) = transport.submit(&request) {
            warn!(job_id = id, error = err.to_string(); "submission failed");
            if let Some(job) = self.active.get_mut(&id) {
                job.error = Some(err.info().clone());
                job.set_status(JobStatus::PushFailed)?;
            }
            self.archive(id);
            return Ok(DispatchOutcome::Failed(JobStatus::PushFailed));
        }
        if let Some(job) = self.active.get_mut(&id) {
            job.set_status(JobStatus::PullRequested)?;
        }
        Ok(DispatchOutcome::Dispatched)
    }

    /// Applies a returned package to a dispatched job.
    ///
    /// The job ends complete or in the error status matching the failure,
    /// and is archived either way. The returned status is the job's new one.
    pub fn receive(&mut self, id: JobId, package: &ResultPackage) -> Result<JobStatus, RadError> {
        let xml = self.xml.clone();
        let job = self
            .active
            .get_mut(&id)
            .ok_or_else(|| state_error(id, "job is not active"))?;
        if job.status != JobStatus::PullRequested {
            return Err(state_error(id, "job is not awaiting a result"));
        }
        if package.job_id != id {
            warn!(job_id = id, package_job_id = package.job_id; "package names another job");
        }
        let parsed = parse_package(job.stage, package, &xml);
        let status = job.apply_result(parsed, &xml)?;
        if let Err(err) = job.write_record() {
            warn!(job_id = id, error = err.to_string(); "could not write job record");
        }
        self.archive(id);
        Ok(status)
    }

    /// Records a failure reported by the compute host for a dispatched job.
    ///
    /// The job moves to the error status matching `err` and is archived.
    pub fn report_failure(&mut self, id: JobId, err: &RadError) -> Result<JobStatus, RadError> {
        let job = self
            .active
            .get_mut(&id)
            .ok_or_else(|| state_error(id, "job is not active"))?;
        if job.status != JobStatus::PullRequested {
            return Err(state_error(id, "job is not awaiting a result"));
        }
        job.fail(err)?;
        let status = job.status;
        if let Err(err) = job.write_record() {
            warn!(job_id = id, error = err.to_string(); "could not write job record");
        }
        self.archive(id);
        Ok(status)
    }

    fn fail_and_archive(&mut self, id: JobId, err: &RadError) -> Result<DispatchOutcome, RadError> {
        let job = self
            .active
            .get_mut(&id)
            .ok_or_else(|| state_error(id, "job is not active"))?;
        job.fail(err)?;
        let status = job.status;
        self.archive(id);
        Ok(DispatchOutcome::Failed(status))
    }

    fn archive(&mut self, id: JobId) {
        if let Some(job) = self.active.remove(&id) {
            debug!(job_id = id, status = job.status.code(); "archived job");
            self.archived.insert(id, job);
        }
    }

    /// Schedules a follow-up job of `stage` whose request reads the outputs
    /// of `upstream`.
    pub fn schedule_from(&mut self, stage: JobStage, upstream: JobId, configure: impl FnOnce(&mut JobRequest, &JobOutputs)) -> Result<JobId, RadError> {
        let outputs = self
            .outputs(upstream)
            .cloned()
            .ok_or_else(|| state_error(upstream, "dependency is not a known job"))?;
        let mut request = JobRequest::new(0, stage);
        configure(&mut request, &outputs);
        self.schedule(request, &[upstream])
    }
}
