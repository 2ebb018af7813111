#![deny(missing_docs)]
#![doc = "Job orchestration for the RAD pipeline: stage and status model, reference-only job requests, zip result packages with XML indices, one typed parser per stage, and a non-blocking orchestrator with cancellable batch loops."]

pub mod driver;
pub mod job;
pub mod orchestrator;
pub mod package;
pub mod parse;
pub mod request;
pub mod status;
pub mod xml;

pub use driver::{dispatch_ready, receive_packages, BatchReport};
pub use job::{store_result, Job, JobOutputs};
pub use orchestrator::{DispatchOutcome, JobTransport, Orchestrator};
pub use package::{PackageManifest, ResultPackage, MANIFEST_MEMBER};
pub use parse::{
    encode_calculate, encode_compress, encode_grid, encode_intersect, encode_randomized, parse_package,
    LayerArray, StageResult,
};
pub use request::{Delivery, JobId, JobInputs, JobParameters, JobRequest, LayerRef, PostProcessing};
pub use status::{JobStage, JobStatus};
pub use xml::XmlContext;
