use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use rad_core::{load_config, NodeConfig};
use rad_jobs::{Delivery, JobRequest, XmlContext};
use rad_node::ComputeHost;

#[derive(Args, Debug)]
pub struct RunJobArgs {
    /// JSON job request.
    #[arg(long)]
    pub request: PathBuf,
    /// YAML node configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Write the package here instead of where the request says.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Override pool.max_concurrent.
    #[arg(long)]
    pub max_concurrent: Option<usize>,
    /// Override pool.wait_time_ms.
    #[arg(long)]
    pub wait_time_ms: Option<u64>,
    /// Override worker.program.
    #[arg(long)]
    pub worker: Option<String>,
    /// Override worker.scratch_dir.
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,
    /// Default namespace of the XML members.
    #[arg(long)]
    pub namespace: Option<String>,
}

pub fn run(args: &RunJobArgs) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => NodeConfig::default(),
    };
    if let Some(max_concurrent) = args.max_concurrent {
        config.pool.max_concurrent = max_concurrent;
    }
    if let Some(wait_time_ms) = args.wait_time_ms {
        config.pool.wait_time_ms = wait_time_ms;
    }
    if let Some(worker) = &args.worker {
        config.worker.program = worker.clone();
    }
    if let Some(scratch_dir) = &args.scratch_dir {
        config.worker.scratch_dir = scratch_dir.clone();
    }
    let xml = match &args.namespace {
        Some(uri) => XmlContext::with_namespace(uri.clone()),
        None => XmlContext::new(),
    };

    let mut request = JobRequest::read(&args.request)?;
    if let Some(out) = &args.out {
        request.post_processing.deliver = Delivery::File { path: out.clone() };
    }
    let host = ComputeHost::new(config, xml)?;
    let (package, written) = host.run(&request)?;
    match written {
        Some(path) => println!("{}", path.display()),
        None => {
            for name in package.member_names() {
                println!("{name}");
            }
        }
    }
    Ok(())
}
