use std::path::{Path, PathBuf};

use rad_core::{CancelToken, NodeConfig};
use rad_grid::{BBox, GridSpec};
use rad_intersect::{write_layer_data, IntersectParams, LayerData, RasterLayer};
use rad_jobs::{dispatch_ready, JobId, JobRequest, JobStage, JobStatus, LayerRef, Orchestrator, XmlContext};
use rad_matrix::read_matrix;
use rad_node::{ComputeHost, LocalTransport};
use rad_random::marginals;

fn raster() -> RasterLayer {
    // Left half 1.0, right half 0.0.
    let values = (0..100).map(|idx| if idx % 10 < 5 { 1.0 } else { 0.0 }).collect();
    RasterLayer {
        min_x: 0.0,
        max_y: 10.0,
        resolution: 1.0,
        rows: 10,
        cols: 10,
        nodata: None,
        values,
    }
}

/// One value per cell of the 2 x 2 grid: top left 1, top right 3,
/// bottom left 2, bottom right 0.
fn quadrants() -> RasterLayer {
    let mut values = Vec::with_capacity(100);
    for row in 0..10 {
        for col in 0..10 {
            values.push(match (row < 5, col < 5) {
                (true, true) => 1.0,
                (true, false) => 3.0,
                (false, true) => 2.0,
                (false, false) => 0.0,
            });
        }
    }
    RasterLayer {
        min_x: 0.0,
        max_y: 10.0,
        resolution: 1.0,
        rows: 10,
        cols: 10,
        nodata: None,
        values,
    }
}

fn presence(index: usize, path: &Path, min: f64, max: f64) -> LayerRef {
    LayerRef {
        index,
        path: path.to_path_buf(),
        params: IntersectParams::RasterPresenceAbsence {
            min_presence: min,
            max_presence: max,
            percent_presence: 50.0,
        },
    }
}

fn node(dir: &Path) -> (LocalTransport, Orchestrator) {
    let mut config = NodeConfig::default();
    config.pool.wait_time_ms = 20;
    config.worker.program = env!("CARGO_BIN_EXE_rad-worker").to_string();
    config.worker.scratch_dir = dir.join("scratch");
    config.randomize.swap_retry_budget = 500;
    let xml = XmlContext::new();
    let transport = LocalTransport::new(ComputeHost::new(config, xml.clone()).unwrap());
    (transport, Orchestrator::new(dir.join("jobs"), xml))
}

fn schedule_grid(orch: &mut Orchestrator) -> JobId {
    let mut request = JobRequest::new(0, JobStage::BuildGrid);
    request.parameters.build_grid = Some(GridSpec::new(BBox::new(0.0, 0.0, 10.0, 10.0), 5.0, 4));
    orch.schedule(request, &[]).unwrap()
}

fn run_to_completion(orch: &mut Orchestrator, transport: &mut LocalTransport, max_rounds: usize) {
    let cancel = CancelToken::new();
    let mut rounds = 0;
    while orch.active().next().is_some() {
        rounds += 1;
        assert!(rounds <= max_rounds, "pipeline did not settle");
        dispatch_ready(orch, transport, &cancel);
        transport.deliver(orch);
    }
    assert_eq!(transport.pending(), 0);
}

fn schedule_calculate(orch: &mut Orchestrator, upstream: JobId, matrix: PathBuf, maps_from: JobId) -> JobId {
    let maps = orch.outputs(maps_from).cloned().unwrap();
    orch.schedule_from(JobStage::Calculate, upstream, |request, _| {
        request.inputs.matrix = Some(matrix);
        request.inputs.sites_present = Some(maps.sites_present());
        request.inputs.layers_present = Some(maps.layers_present());
    })
    .unwrap()
}

#[test]
fn jobs_run_stage_by_stage_and_failures_stay_local() {
    let dir = tempfile::tempdir().unwrap();
    let layer = dir.path().join("layer.json");
    write_layer_data(&layer, &LayerData::Raster(raster())).unwrap();
    let (mut transport, mut orch) = node(dir.path());

    let grid_job = schedule_grid(&mut orch);
    let intersect_job = orch
        .schedule_from(JobStage::Intersect, grid_job, |request, outputs| {
            request.inputs.shapegrid = Some(outputs.shapegrid());
            request.inputs.layers = vec![presence(0, &layer, 1.0, 1.0), presence(1, &layer, 0.0, 1.0)];
        })
        .unwrap();
    let compress_job = orch
        .schedule_from(JobStage::Compress, intersect_job, |request, outputs| {
            request.inputs.matrix = Some(outputs.pam());
        })
        .unwrap();
    let swap_job = orch
        .schedule_from(JobStage::Swap, compress_job, |request, outputs| {
            request.inputs.matrix = Some(outputs.pam());
            request.parameters.seed = Some(1);
        })
        .unwrap();
    let compressed = orch.outputs(compress_job).unwrap().pam();
    let calculate_job = schedule_calculate(&mut orch, compress_job, compressed, compress_job);

    run_to_completion(&mut orch, &mut transport, 6);

    for job in [grid_job, intersect_job, compress_job, calculate_job] {
        assert_eq!(orch.status(job), Some(JobStatus::Complete), "job {job}");
    }
    // Layer 0 covers the left sites and layer 1 every site, which leaves no
    // checkerboard to swap.
    assert_eq!(orch.status(swap_job), Some(JobStatus::RadSwapError));
    assert!(orch.job(swap_job).unwrap().error.is_some());
    assert!(orch.outputs(swap_job).unwrap().dir.join("job.json").exists());
    assert!(orch.outputs(calculate_job).unwrap().statistics().exists());
}

#[test]
fn splotch_output_is_compressed_again_before_calculate() {
    let dir = tempfile::tempdir().unwrap();
    let layer = dir.path().join("quadrants.json");
    write_layer_data(&layer, &LayerData::Raster(quadrants())).unwrap();
    let (mut transport, mut orch) = node(dir.path());

    let grid_job = schedule_grid(&mut orch);
    let shapegrid = orch.outputs(grid_job).unwrap().shapegrid();
    // Sites: [1, 0], [0, 1], [1, 1], [0, 0]; the last one is dropped by compress.
    let intersect_job = orch
        .schedule_from(JobStage::Intersect, grid_job, |request, outputs| {
            request.inputs.shapegrid = Some(outputs.shapegrid());
            request.inputs.layers = vec![presence(0, &layer, 1.0, 2.0), presence(1, &layer, 2.0, 3.0)];
        })
        .unwrap();
    let compress_job = orch
        .schedule_from(JobStage::Compress, intersect_job, |request, outputs| {
            request.inputs.matrix = Some(outputs.pam());
        })
        .unwrap();
    let splotch_job = orch
        .schedule_from(JobStage::Splotch, compress_job, |request, outputs| {
            request.inputs.shapegrid = Some(shapegrid.clone());
            request.inputs.matrix = Some(outputs.pam());
            request.inputs.sites_present = Some(outputs.sites_present());
            request.inputs.layers_present = Some(outputs.layers_present());
            request.parameters.seed = Some(5);
        })
        .unwrap();
    let recompress_job = orch
        .schedule_from(JobStage::Compress, splotch_job, |request, outputs| {
            request.inputs.matrix = Some(outputs.matrix());
        })
        .unwrap();
    let recompressed = orch.outputs(recompress_job).unwrap().pam();
    let splotch_calculate = schedule_calculate(&mut orch, recompress_job, recompressed, recompress_job);
    let swap_job = orch
        .schedule_from(JobStage::Swap, compress_job, |request, outputs| {
            request.inputs.matrix = Some(outputs.pam());
            request.parameters.seed = Some(3);
        })
        .unwrap();
    let swapped = orch.outputs(swap_job).unwrap().matrix();
    let swap_calculate = schedule_calculate(&mut orch, swap_job, swapped, compress_job);

    run_to_completion(&mut orch, &mut transport, 8);

    for job in [
        grid_job,
        intersect_job,
        compress_job,
        splotch_job,
        recompress_job,
        splotch_calculate,
        swap_job,
        swap_calculate,
    ] {
        assert_eq!(orch.status(job), Some(JobStatus::Complete), "job {job}");
    }

    // Splotch works on the full matrix and keeps each species' range size.
    let splotched = read_matrix::<bool, ndarray::Ix2>(&orch.outputs(splotch_job).unwrap().matrix()).unwrap();
    assert_eq!(splotched.dim(), (4, 2));
    assert_eq!(marginals(&splotched).1, vec![2, 2]);

    let compressed = read_matrix::<bool, ndarray::Ix2>(&orch.outputs(compress_job).unwrap().pam()).unwrap();
    let swapped = read_matrix::<bool, ndarray::Ix2>(&orch.outputs(swap_job).unwrap().matrix()).unwrap();
    assert_eq!(marginals(&swapped), marginals(&compressed));

    for job in [splotch_calculate, swap_calculate] {
        assert!(orch.outputs(job).unwrap().statistics().exists(), "job {job}");
    }
}

#[test]
fn grady_output_feeds_calculate() {
    let dir = tempfile::tempdir().unwrap();
    let layer = dir.path().join("quadrants.json");
    write_layer_data(&layer, &LayerData::Raster(quadrants())).unwrap();
    let (mut transport, mut orch) = node(dir.path());

    let grid_job = schedule_grid(&mut orch);
    // Both species cover every site, so the only fill is the full matrix.
    let intersect_job = orch
        .schedule_from(JobStage::Intersect, grid_job, |request, outputs| {
            request.inputs.shapegrid = Some(outputs.shapegrid());
            request.inputs.layers = vec![presence(0, &layer, 0.0, 3.0), presence(1, &layer, 0.0, 3.0)];
        })
        .unwrap();
    let compress_job = orch
        .schedule_from(JobStage::Compress, intersect_job, |request, outputs| {
            request.inputs.matrix = Some(outputs.pam());
        })
        .unwrap();
    let grady_job = orch
        .schedule_from(JobStage::Grady, compress_job, |request, outputs| {
            request.inputs.matrix = Some(outputs.pam());
            request.parameters.seed = Some(9);
        })
        .unwrap();
    let randomized = orch.outputs(grady_job).unwrap().matrix();
    let calculate_job = schedule_calculate(&mut orch, grady_job, randomized, compress_job);

    run_to_completion(&mut orch, &mut transport, 6);

    for job in [grid_job, intersect_job, compress_job, grady_job, calculate_job] {
        assert_eq!(orch.status(job), Some(JobStatus::Complete), "job {job}");
    }
    let filled = read_matrix::<bool, ndarray::Ix2>(&orch.outputs(grady_job).unwrap().matrix()).unwrap();
    assert_eq!(filled.dim(), (4, 2));
    assert!(filled.iter().all(|cell| *cell));
    assert!(orch.outputs(calculate_job).unwrap().statistics().exists());
}
