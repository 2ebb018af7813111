use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use rad_jobs::{parse_package, store_result, JobOutputs, JobRequest, ResultPackage, XmlContext};

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Request the package answers; its stage selects the parser.
    #[arg(long)]
    pub request: PathBuf,
    /// Result package archive.
    #[arg(long)]
    pub package: PathBuf,
    /// Job output directory.
    #[arg(long)]
    pub out: PathBuf,
    /// Default namespace of the XML members.
    #[arg(long)]
    pub namespace: Option<String>,
}

pub fn run(args: &ReceiveArgs) -> Result<(), Box<dyn Error>> {
    let xml = match &args.namespace {
        Some(uri) => XmlContext::with_namespace(uri.clone()),
        None => XmlContext::new(),
    };
    let request = JobRequest::read(&args.request)?;
    let package = ResultPackage::read(&args.package)?;
    let parsed = parse_package(request.stage, &package, &xml)?;
    let written = store_result(&JobOutputs::new(&args.out), &parsed, &xml)?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}
