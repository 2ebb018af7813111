use std::process::Command;

use ndarray::Ix1;
use rad_grid::{build_shapegrid, write_shapegrid, BBox, GridSpec};
use rad_matrix::read_matrix;
use rad_node::WorkerTask;

fn worker() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rad-worker"))
}

#[test]
fn worker_writes_the_array_named_in_its_task() {
    let dir = tempfile::tempdir().unwrap();
    let grid_path = dir.path().join("grid.json");
    let grid = build_shapegrid(&GridSpec::new(BBox::new(0.0, 0.0, 15.0, 15.0), 5.0, 4)).unwrap();
    write_shapegrid(&grid_path, &grid).unwrap();
    let output = dir.path().join("out").join("species_0.npy");
    let task = WorkerTask::SplotchLayer {
        shapegrid: grid_path,
        occupied: 4,
        seed: 3,
        column: 0,
        output: output.clone(),
    };

    let status = worker().arg(task.to_json().unwrap()).status().unwrap();
    assert!(status.success());
    let placed = read_matrix::<bool, Ix1>(&output).unwrap();
    assert_eq!(placed.len(), 9);
    assert_eq!(placed.iter().filter(|cell| **cell).count(), 4);
}

#[test]
fn worker_reports_failures_on_stderr() {
    let out = worker().output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("usage"));

    let out = worker().arg("{not json").output().unwrap();
    assert!(!out.status.success());
    assert!(!out.stderr.is_empty());
}
