use std::error::Error;

use log::error;
use rad_node::{run_task, WorkerTask};

const USAGE: &str = "usage: rad-worker '<json task document>'";

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let mut args = std::env::args().skip(1);
    let document = args.next().ok_or(USAGE)?;
    if args.next().is_some() {
        return Err(USAGE.into());
    }
    let task = WorkerTask::from_json(&document)?;
    if let Err(err) = run_task(&task) {
        error!(output = task.output().display().to_string(), code = err.code(); "worker task failed");
        return Err(err.into());
    }
    Ok(())
}
