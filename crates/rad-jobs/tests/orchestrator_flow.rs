use std::collections::BTreeMap;

use ndarray::{Array2, Ix2};
use rad_core::errors::{codes, ErrorInfo, RadError};
use rad_core::CancelToken;
use rad_grid::{build_shapegrid, BBox, GridSpec};
use rad_intersect::{IntersectParams, MatrixColumn};
use rad_jobs::{
    dispatch_ready, encode_compress, encode_grid, encode_intersect, receive_packages, DispatchOutcome, JobRequest,
    JobStage, JobStatus, JobTransport, LayerRef, Orchestrator, ResultPackage, XmlContext,
};
use rad_matrix::{compress, read_matrix};

#[derive(Default)]
struct Recorder {
    submitted: Vec<JobRequest>,
    reject: bool,
}

impl JobTransport for Recorder {
    fn submit(&mut self, request: &JobRequest) -> Result<(), RadError> {
        if self.reject {
            return Err(RadError::Process(ErrorInfo::new(codes::PROCESS_FAILED, "host unreachable")));
        }
        self.submitted.push(request.clone());
        Ok(())
    }
}

fn grid_spec() -> GridSpec {
    GridSpec::new(BBox::new(0.0, 0.0, 10.0, 10.0), 5.0, 4)
}

fn grid_request() -> JobRequest {
    let mut request = JobRequest::new(0, JobStage::BuildGrid);
    request.parameters.build_grid = Some(grid_spec());
    request
}

fn presence_layer(index: usize) -> LayerRef {
    LayerRef {
        index,
        path: format!("layers/{index}.json").into(),
        params: IntersectParams::RasterPresenceAbsence {
            min_presence: 1.0,
            max_presence: 1.0,
            percent_presence: 25.0,
        },
    }
}

#[test]
fn stages_advance_only_after_their_dependencies_complete() {
    let dir = tempfile::tempdir().unwrap();
    let xml = XmlContext::new();
    let mut orch = Orchestrator::new(dir.path(), xml.clone());
    let mut transport = Recorder::default();

    let grid_job = orch.schedule(grid_request(), &[]).unwrap();
    let intersect_job = orch
        .schedule_from(JobStage::Intersect, grid_job, |request, outputs| {
            request.inputs.shapegrid = Some(outputs.shapegrid());
            request.inputs.layers = vec![presence_layer(0), presence_layer(1)];
        })
        .unwrap();

    assert_eq!(
        orch.dispatch(intersect_job, &mut transport).unwrap(),
        DispatchOutcome::Waiting { blocked_on: grid_job }
    );
    assert_eq!(orch.status(intersect_job), Some(JobStatus::General));
    assert_eq!(orch.ready(), vec![grid_job]);

    assert_eq!(orch.dispatch(grid_job, &mut transport).unwrap(), DispatchOutcome::Dispatched);
    assert_eq!(orch.status(grid_job), Some(JobStatus::PullRequested));
    assert_eq!(transport.submitted[0].job_id, grid_job);

    let grid = build_shapegrid(&grid_spec()).unwrap();
    let status = orch.receive(grid_job, &encode_grid(grid_job, &grid).unwrap()).unwrap();
    assert_eq!(status, JobStatus::Complete);
    assert!(orch.outputs(grid_job).unwrap().shapegrid().exists());
    assert!(orch.active().all(|job| job.id != grid_job));
    assert_eq!(orch.archived().count(), 1);

    assert_eq!(orch.dispatch(intersect_job, &mut transport).unwrap(), DispatchOutcome::Dispatched);
    let mut columns = BTreeMap::new();
    columns.insert(0, MatrixColumn::Presence(vec![true, false, false, true]));
    columns.insert(1, MatrixColumn::Presence(vec![false; 4]));
    let package = encode_intersect(intersect_job, &columns, &xml).unwrap();
    assert_eq!(orch.receive(intersect_job, &package).unwrap(), JobStatus::Complete);
    let pam: Array2<bool> = read_matrix::<bool, Ix2>(&orch.outputs(intersect_job).unwrap().pam()).unwrap();
    assert_eq!(pam.dim(), (4, 2));
    assert!(pam[[3, 0]]);

    let compress_job = orch
        .schedule_from(JobStage::Compress, intersect_job, |request, outputs| {
            request.inputs.matrix = Some(outputs.pam());
        })
        .unwrap();
    assert_eq!(orch.dispatch(compress_job, &mut transport).unwrap(), DispatchOutcome::Dispatched);
    let package = encode_compress(compress_job, &compress(&pam), &xml).unwrap();
    assert_eq!(orch.receive(compress_job, &package).unwrap(), JobStatus::Complete);
    let outputs = orch.outputs(compress_job).unwrap();
    let compressed: Array2<bool> = read_matrix::<bool, Ix2>(&outputs.pam()).unwrap();
    assert_eq!(compressed.dim(), (2, 1));
    assert!(outputs.sites_present().exists());
    assert!(outputs.layers_present().exists());
    assert_eq!(transport.submitted.len(), 3);
}

#[test]
fn dependencies_must_come_from_predecessor_stages() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = Orchestrator::new(dir.path(), XmlContext::new());
    let grid_job = orch.schedule(grid_request(), &[]).unwrap();
    let err = orch
        .schedule(JobRequest::new(0, JobStage::Swap), &[grid_job])
        .unwrap_err();
    assert_eq!(err.code(), codes::JOB_STATE);
    let err = orch
        .schedule(JobRequest::new(0, JobStage::Intersect), &[99])
        .unwrap_err();
    assert_eq!(err.code(), codes::JOB_STATE);
}

#[test]
fn unsupported_component_becomes_a_terminal_status() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = Orchestrator::new(dir.path(), XmlContext::new());
    let mut transport = Recorder::default();
    let job = orch.schedule(grid_request(), &[]).unwrap();
    orch.dispatch(job, &mut transport).unwrap();

    let status = orch.receive(job, &ResultPackage::new("pam", job)).unwrap();
    assert_eq!(status, JobStatus::UnsupportedComponent);
    assert_eq!(status.code(), 1010);
    let archived = orch.job(job).unwrap();
    assert_eq!(archived.error.as_ref().unwrap().code, codes::UNSUPPORTED_COMPONENT);
    assert!(orch.receive(job, &ResultPackage::new("build-grid", job)).is_err());
}

#[test]
fn receive_requires_a_dispatched_job() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = Orchestrator::new(dir.path(), XmlContext::new());
    let job = orch.schedule(grid_request(), &[]).unwrap();
    let err = orch.receive(job, &ResultPackage::new("build-grid", job)).unwrap_err();
    assert_eq!(err.code(), codes::JOB_STATE);
}

#[test]
fn rejected_submission_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = Orchestrator::new(dir.path(), XmlContext::new());
    let mut transport = Recorder {
        reject: true,
        ..Recorder::default()
    };
    let job = orch.schedule(grid_request(), &[]).unwrap();
    assert_eq!(
        orch.dispatch(job, &mut transport).unwrap(),
        DispatchOutcome::Failed(JobStatus::PushFailed)
    );
    assert_eq!(orch.status(job), Some(JobStatus::PushFailed));
    assert!(orch.dispatch(job, &mut transport).is_err());
}

#[test]
fn intersect_without_layers_fails_with_its_own_status() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = Orchestrator::new(dir.path(), XmlContext::new());
    let mut transport = Recorder::default();
    let mut request = JobRequest::new(0, JobStage::Intersect);
    request.inputs.shapegrid = Some("grid.json".into());
    let job = orch.schedule(request, &[]).unwrap();
    assert_eq!(
        orch.dispatch(job, &mut transport).unwrap(),
        DispatchOutcome::Failed(JobStatus::RadIntersectZeroLayersError)
    );
    assert!(transport.submitted.is_empty());
}

#[test]
fn failed_dependency_fails_its_dependents() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = Orchestrator::new(dir.path(), XmlContext::new());
    let mut transport = Recorder::default();
    let grid_job = orch.schedule(grid_request(), &[]).unwrap();
    let intersect_job = orch
        .schedule_from(JobStage::Intersect, grid_job, |request, outputs| {
            request.inputs.shapegrid = Some(outputs.shapegrid());
            request.inputs.layers = vec![presence_layer(0)];
        })
        .unwrap();
    orch.dispatch(grid_job, &mut transport).unwrap();
    orch.receive(grid_job, &ResultPackage::new("build-grid", grid_job)).unwrap();
    assert_eq!(orch.status(grid_job), Some(JobStatus::RadShapegridError));

    match orch.dispatch(intersect_job, &mut transport).unwrap() {
        DispatchOutcome::Failed(status) => assert!(status.is_error()),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn batch_loops_continue_past_bad_items_and_honor_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = Orchestrator::new(dir.path().join("jobs"), XmlContext::new());
    let mut transport = Recorder::default();
    let first = orch.schedule(grid_request(), &[]).unwrap();
    let second = orch.schedule(grid_request(), &[]).unwrap();

    let stopped = CancelToken::new();
    stopped.cancel();
    let report = dispatch_ready(&mut orch, &mut transport, &stopped);
    assert!(report.cancelled);
    assert_eq!(report.processed, 0);

    let report = dispatch_ready(&mut orch, &mut transport, &CancelToken::new());
    assert_eq!(report.advanced, vec![first, second]);

    let grid = build_shapegrid(&grid_spec()).unwrap();
    let good = dir.path().join("second.zip");
    encode_grid(second, &grid).unwrap().write(&good).unwrap();
    let packages = vec![(first, dir.path().join("missing.zip")), (second, good)];
    let report = receive_packages(&mut orch, &packages, &CancelToken::new());
    assert_eq!(report.processed, 2);
    assert_eq!(report.advanced, vec![second]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(orch.status(first), Some(JobStatus::PullRequested));
}
