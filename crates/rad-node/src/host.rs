//! Executes job requests on a compute node.
//!
//! Intersect runs one worker subprocess per layer and Splotch one per
//! species, both through the bounded [`ProcessPool`]. The remaining stages
//! are cheap enough to run in process.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use ndarray::{Array1, Array2, Axis, Ix1, Ix2};

use rad_core::errors::{codes, ErrorInfo, RadError};
use rad_core::{CancelToken, NodeConfig, RngHandle};
use rad_grid::{build_shapegrid, read_shapegrid};
use rad_intersect::MatrixColumn;
use rad_jobs::{
    encode_calculate, encode_compress, encode_grid, encode_intersect, encode_randomized, Delivery, JobRequest,
    JobStage, ResultPackage, XmlContext,
};
use rad_matrix::{compress, decompress, read_matrix};
use rad_pool::{PoolReport, ProcessPool};
use rad_random::{grady_randomize, swap_randomize};
use rad_stats::{calculate, PhyloTree, StatsOptions};

use crate::worker::{task_command, WorkerTask};

fn missing_input(stage: JobStage, field: &str) -> RadError {
    RadError::Configuration(
        ErrorInfo::new(codes::REQUEST_INVALID, "request lacks a required input")
            .with_context("stage", stage.component())
            .with_context("field", field),
    )
}

/// Runs job requests with the settings of one node.
#[derive(Debug, Clone)]
pub struct ComputeHost {
    config: NodeConfig,
    xml: XmlContext,
    cancel: CancelToken,
}

impl ComputeHost {
    /// Creates a host; the configuration is validated first.
    pub fn new(config: NodeConfig, xml: XmlContext) -> Result<Self, RadError> {
        config.validate()?;
        let mut cancel = CancelToken::new();
        if let Some(sentinel) = &config.stop_sentinel {
            cancel = cancel.with_sentinel(sentinel.clone());
        }
        Ok(Self { config, xml, cancel })
    }

    /// Replaces the stop token shared with the worker pool.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Node settings.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Executes `request` and returns its result package.
    pub fn execute(&self, request: &JobRequest) -> Result<ResultPackage, RadError> {
        request.validate()?;
        let id = request.job_id;
        info!(job_id = id, stage = request.stage.component(); "executing job");
        let inputs = &request.inputs;
        let params = &request.parameters;
        let seed = params.seed.unwrap_or(self.config.seed);
        match request.stage {
            JobStage::BuildGrid => {
                let spec = params
                    .build_grid
                    .as_ref()
                    .ok_or_else(|| missing_input(request.stage, "parameters.build_grid"))?;
                encode_grid(id, &build_shapegrid(spec)?)
            }
            JobStage::Intersect => {
                let columns = self.intersect(request)?;
                encode_intersect(id, &columns, &self.xml)
            }
            JobStage::Compress => {
                let matrix = read_bool_matrix(inputs.matrix.as_deref(), request.stage)?;
                encode_compress(id, &compress(&matrix), &self.xml)
            }
            JobStage::Swap => {
                let matrix = read_bool_matrix(inputs.matrix.as_deref(), request.stage)?;
                // One swap per presence unless the request asks otherwise.
                let num_swaps = params
                    .num_swaps
                    .unwrap_or_else(|| matrix.iter().filter(|cell| **cell).count());
                let mut rng = RngHandle::from_seed(seed);
                info!(job_id = id, seed = rng.seed(), num_swaps = num_swaps; "swapping");
                let report = swap_randomize(&matrix, num_swaps, self.config.randomize.swap_retry_budget, &mut rng)?;
                info!(job_id = id, swaps = report.swaps, attempts = report.attempts; "swap finished");
                encode_randomized(id, request.stage, &report.matrix)
            }
            JobStage::Grady => {
                let matrix = read_bool_matrix(inputs.matrix.as_deref(), request.stage)?;
                let mut rng = RngHandle::from_seed(seed);
                let randomized = grady_randomize(&matrix, self.config.randomize.grady_search_threshold, &mut rng)?;
                encode_randomized(id, request.stage, &randomized)
            }
            JobStage::Splotch => {
                let randomized = self.splotch(request, seed)?;
                encode_randomized(id, request.stage, &randomized)
            }
            JobStage::Calculate => {
                let matrix = self.read_full_matrix(request)?;
                let tree = inputs.tree.as_deref().map(PhyloTree::read).transpose()?;
                let options = StatsOptions {
                    covariance: params.do_covariance,
                    schluter: params.do_schluter,
                };
                let stats = calculate(&matrix, tree.as_ref(), &options)?;
                encode_calculate(id, &stats, &self.xml)
            }
        }
    }

    /// Executes `request` and applies its delivery directive.
    ///
    /// Returns the package together with the file it was written to, if any.
    pub fn run(&self, request: &JobRequest) -> Result<(ResultPackage, Option<PathBuf>), RadError> {
        let package = self.execute(request)?;
        match &request.post_processing.deliver {
            Delivery::Return => Ok((package, None)),
            Delivery::File { path } => {
                package.write(path)?;
                info!(job_id = request.job_id, path = path.display().to_string(); "package delivered");
                Ok((package, Some(path.clone())))
            }
        }
    }

    /// Reads the request matrix, decompressing it when both presence maps are named.
    fn read_full_matrix(&self, request: &JobRequest) -> Result<Array2<bool>, RadError> {
        let inputs = &request.inputs;
        let matrix = read_bool_matrix(inputs.matrix.as_deref(), request.stage)?;
        match (&inputs.sites_present, &inputs.layers_present) {
            (Some(sites), Some(layers)) => {
                let sites_present = self.xml.read_presence("site", &read_file(sites)?)?;
                let layers_present = self.xml.read_presence("layer", &read_file(layers)?)?;
                decompress(&matrix, &sites_present, &layers_present)
            }
            _ => Ok(matrix),
        }
    }

    fn scratch_dir(&self, request: &JobRequest) -> Result<PathBuf, RadError> {
        let dir = self
            .config
            .worker
            .scratch_dir
            .join(format!("job_{}_{}", request.job_id, request.stage.component()));
        fs::create_dir_all(&dir).map_err(|err| {
            RadError::Io(ErrorInfo::new("scratch_dir", err.to_string()).with_context("path", dir.display().to_string()))
        })?;
        Ok(dir)
    }

    fn run_tasks(&self, tasks: &[WorkerTask]) -> Result<PoolReport, RadError> {
        for task in tasks {
            // A leftover array from an earlier run would mask a failed worker.
            if task.output().exists() {
                fs::remove_file(task.output()).map_err(|err| RadError::io("scratch_dir", err))?;
            }
        }
        let mut pool = ProcessPool::from_config(&self.config.pool)?.with_cancel_token(self.cancel.clone());
        let commands = tasks
            .iter()
            .map(|task| task_command(&self.config.worker.program, task))
            .collect::<Result<Vec<_>, _>>()?;
        pool.add_process_commands(commands);
        let report = pool.run_processes();
        if report.cancelled {
            return Err(RadError::Cancelled(
                ErrorInfo::new(codes::CANCELLED, "stop requested while workers were queued")
                    .with_context("remaining", report.remaining.to_string()),
            ));
        }
        for outcome in report.outcomes.iter().filter(|outcome| !outcome.success) {
            warn!(command = outcome.command.as_str(), exit_code:? = outcome.exit_code; "worker failed");
        }
        Ok(report)
    }

    fn intersect(&self, request: &JobRequest) -> Result<BTreeMap<usize, MatrixColumn>, RadError> {
        let shapegrid = request
            .inputs
            .shapegrid
            .clone()
            .ok_or_else(|| missing_input(request.stage, "inputs.shapegrid"))?;
        let scratch = self.scratch_dir(request)?;
        let tasks: Vec<WorkerTask> = request
            .inputs
            .layers
            .iter()
            .map(|layer| WorkerTask::IntersectLayer {
                shapegrid: shapegrid.clone(),
                layer: layer.path.clone(),
                params: layer.params.clone(),
                output: scratch.join(format!("layer_{}.npy", layer.index)),
            })
            .collect();
        let report = self.run_tasks(&tasks)?;

        let mut columns = BTreeMap::new();
        for (layer, task) in request.inputs.layers.iter().zip(&tasks) {
            let column = read_column(task.output()).map_err(|err| {
                RadError::Intersection(
                    ErrorInfo::new(codes::PROCESS_FAILED, "worker produced no column for a layer")
                        .with_context("layer", layer.path.display().to_string())
                        .with_context("index", layer.index.to_string())
                        .with_context("failures", report.failures().to_string())
                        .with_context("cause", err.to_string()),
                )
            })?;
            columns.insert(layer.index, column);
        }
        Ok(columns)
    }

    fn splotch(&self, request: &JobRequest, seed: u64) -> Result<Array2<bool>, RadError> {
        let shapegrid = request
            .inputs
            .shapegrid
            .clone()
            .ok_or_else(|| missing_input(request.stage, "inputs.shapegrid"))?;
        let matrix = self.read_full_matrix(request)?;
        let grid = read_shapegrid(&shapegrid)?;
        let (rows, cols) = matrix.dim();
        if rows != grid.site_count() {
            return Err(RadError::Configuration(
                ErrorInfo::new(codes::MATRIX_SHAPE_MISMATCH, "splotch needs one row per grid site; name the presence maps of a compressed matrix")
                    .with_context("rows", rows.to_string())
                    .with_context("sites", grid.site_count().to_string()),
            ));
        }

        let scratch = self.scratch_dir(request)?;
        let tasks: Vec<WorkerTask> = matrix
            .axis_iter(Axis(1))
            .enumerate()
            .map(|(col, column)| WorkerTask::SplotchLayer {
                shapegrid: shapegrid.clone(),
                occupied: column.iter().filter(|cell| **cell).count(),
                seed,
                column: col as u64,
                output: scratch.join(format!("species_{col}.npy")),
            })
            .collect();
        let report = self.run_tasks(&tasks)?;

        let mut out = Array2::from_elem((rows, cols), false);
        for (col, task) in tasks.iter().enumerate() {
            let placed: Array1<bool> = read_matrix::<bool, Ix1>(task.output()).map_err(|err| {
                RadError::Randomization(
                    ErrorInfo::new(codes::PROCESS_FAILED, "worker produced no column for a species")
                        .with_context("column", col.to_string())
                        .with_context("failures", report.failures().to_string())
                        .with_context("cause", err.to_string()),
                )
            })?;
            if placed.len() != rows {
                return Err(RadError::Randomization(
                    ErrorInfo::new(codes::MATRIX_SHAPE_MISMATCH, "worker column has the wrong length")
                        .with_context("column", col.to_string()),
                ));
            }
            out.column_mut(col).assign(&placed);
        }
        Ok(out)
    }
}

fn read_bool_matrix(path: Option<&Path>, stage: JobStage) -> Result<Array2<bool>, RadError> {
    let path = path.ok_or_else(|| missing_input(stage, "inputs.matrix"))?;
    read_matrix::<bool, Ix2>(path)
}

fn read_file(path: &Path) -> Result<Vec<u8>, RadError> {
    fs::read(path).map_err(|err| {
        RadError::Io(ErrorInfo::new(codes::MATRIX_READ, err.to_string()).with_context("path", path.display().to_string()))
    })
}

fn read_column(path: &Path) -> Result<MatrixColumn, RadError> {
    match read_matrix::<bool, Ix1>(path) {
        Ok(flags) => Ok(MatrixColumn::Presence(flags.to_vec())),
        Err(_) => read_matrix::<f64, Ix1>(path).map(|values| MatrixColumn::Values(values.to_vec())),
    }
}
