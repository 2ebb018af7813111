#![deny(missing_docs)]
#![doc = "Bounded concurrent pool of shell subprocesses polled at a fixed interval."]

pub mod pool;

pub use pool::{PoolReport, ProcessHandle, ProcessOutcome, ProcessPool, MAX_CONCURRENT_PROCESSES, WAIT_TIME};
