#![deny(missing_docs)]
#![doc = "Compute host for the RAD pipeline: executes job requests, fans intersect and splotch work out to `rad-worker` subprocesses through the bounded pool, and assembles result packages."]

pub mod host;
pub mod transport;
pub mod worker;

pub use host::ComputeHost;
pub use transport::LocalTransport;
pub use worker::{run_task, shell_quote, task_command, WorkerTask};
