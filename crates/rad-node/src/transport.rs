//! In-process transport: submitted requests run on a local [`ComputeHost`].

use log::warn;

use rad_core::errors::RadError;
use rad_jobs::{JobId, JobRequest, JobStatus, JobTransport, Orchestrator, ResultPackage};

use crate::host::ComputeHost;

/// Runs each submitted request immediately and keeps the outcome until the
/// orchestrator collects it with [`LocalTransport::deliver`].
#[derive(Debug)]
pub struct LocalTransport {
    host: ComputeHost,
    pending: Vec<(JobId, Result<ResultPackage, RadError>)>,
}

impl LocalTransport {
    /// Wraps a host.
    pub fn new(host: ComputeHost) -> Self {
        Self {
            host,
            pending: Vec::new(),
        }
    }

    /// Outcomes not yet delivered.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Hands every held outcome to `orchestrator`.
    ///
    /// Packages go through [`Orchestrator::receive`]; execution failures are
    /// recorded with [`Orchestrator::report_failure`]. An outcome the
    /// orchestrator refuses is logged and dropped.
    pub fn deliver(&mut self, orchestrator: &mut Orchestrator) -> Vec<(JobId, JobStatus)> {
        let mut statuses = Vec::new();
        for (id, outcome) in self.pending.drain(..) {
            let applied = match &outcome {
                Ok(package) => orchestrator.receive(id, package),
                Err(err) => orchestrator.report_failure(id, err),
            };
            match applied {
                Ok(status) => statuses.push((id, status)),
                Err(err) => warn!(job_id = id, error = err.to_string(); "outcome refused"),
            }
        }
        statuses
    }
}

impl JobTransport for LocalTransport {
    fn submit(&mut self, request: &JobRequest) -> Result<(), RadError> {
        let outcome = self.host.execute(request);
        if let Err(err) = &outcome {
            warn!(job_id = request.job_id, stage = request.stage.component(), error = err.to_string(); "job execution failed");
        }
        self.pending.push((request.job_id, outcome));
        Ok(())
    }
}
