//! Task documents executed by the standalone `rad-worker` binary.
//!
//! A worker receives one JSON task as its only argument, writes a single
//! `.npy` array to the task's output path and exits. Anything else it has to
//! say goes to standard error.

use std::path::{Path, PathBuf};

use log::{debug, info};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use rad_core::errors::RadError;
use rad_core::serde::{from_json_slice, to_canonical_json_bytes};
use rad_core::RngHandle;
use rad_grid::{read_shapegrid, AdjacencyGraph};
use rad_intersect::{intersect_layer, open_layer, IntersectParams, MatrixColumn};
use rad_matrix::write_matrix;
use rad_random::splotch_column;

/// One unit of work for a worker subprocess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "kebab-case")]
pub enum WorkerTask {
    /// Intersect one layer with a grid.
    IntersectLayer {
        /// Grid document.
        shapegrid: PathBuf,
        /// Layer document.
        layer: PathBuf,
        /// Intersection parameters for the layer.
        params: IntersectParams,
        /// Destination of the column array.
        output: PathBuf,
    },
    /// Place one species as a contiguous patch.
    SplotchLayer {
        /// Grid document.
        shapegrid: PathBuf,
        /// Number of sites the species occupies.
        occupied: usize,
        /// Master seed of the randomization.
        seed: u64,
        /// Matrix column; selects the seed substream.
        column: u64,
        /// Destination of the column array.
        output: PathBuf,
    },
}

impl WorkerTask {
    /// Path the worker writes its array to.
    pub fn output(&self) -> &Path {
        match self {
            WorkerTask::IntersectLayer { output, .. } | WorkerTask::SplotchLayer { output, .. } => output,
        }
    }

    /// Canonical JSON form passed on the command line.
    pub fn to_json(&self) -> Result<String, RadError> {
        let bytes = to_canonical_json_bytes(self)?;
        String::from_utf8(bytes).map_err(|err| RadError::serde("worker_task_encode", err))
    }

    /// Parses a task document.
    pub fn from_json(text: &str) -> Result<Self, RadError> {
        from_json_slice(text.as_bytes())
    }
}

/// Quotes `text` for a POSIX shell.
pub fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Shell command running `task` with the worker executable `program`.
pub fn task_command(program: &str, task: &WorkerTask) -> Result<String, RadError> {
    Ok(format!("{} {}", shell_quote(program), shell_quote(&task.to_json()?)))
}

/// Executes `task` in this process and returns the written path.
pub fn run_task(task: &WorkerTask) -> Result<PathBuf, RadError> {
    match task {
        WorkerTask::IntersectLayer {
            shapegrid,
            layer,
            params,
            output,
        } => {
            let grid = read_shapegrid(shapegrid)?;
            let layer_doc = open_layer(layer, params.clone())?;
            let column = intersect_layer(&grid, &layer_doc)?;
            debug!(layer = layer.display().to_string(), sites = column.len(); "layer intersected");
            match column {
                MatrixColumn::Presence(flags) => write_matrix(output, &Array1::from(flags))?,
                MatrixColumn::Values(values) => write_matrix(output, &Array1::from(values))?,
            }
        }
        WorkerTask::SplotchLayer {
            shapegrid,
            occupied,
            seed,
            column,
            output,
        } => {
            let grid = read_shapegrid(shapegrid)?;
            let adjacency = AdjacencyGraph::from_grid(&grid);
            let mut rng = RngHandle::for_substream(*seed, *column);
            let placed = splotch_column(&adjacency, *occupied, &mut rng)?;
            write_matrix(output, &Array1::from(placed))?;
        }
    }
    info!(output = task.output().display().to_string(); "worker task finished");
    Ok(task.output().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_survives_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn task_command_names_the_program_first() {
        let task = WorkerTask::SplotchLayer {
            shapegrid: "grid.json".into(),
            occupied: 2,
            seed: 7,
            column: 1,
            output: "out/col_1.npy".into(),
        };
        let command = task_command("/opt/rad worker", &task).unwrap();
        assert!(command.starts_with("'/opt/rad worker' '{"));
        assert!(command.contains("\"task\":\"splotch-layer\""));
    }
}
