#![deny(missing_docs)]
#![doc = "Shared building blocks for the RAD macroecology pipeline: structured errors, deterministic seeding, cooperative cancellation, canonical serialization and node configuration."]

pub mod cancel;
pub mod config;
pub mod errors;
pub mod hash;
pub mod rng;
pub mod serde;

pub use cancel::CancelToken;
pub use config::{load_config, NodeConfig, PoolConfig, RandomizeConfig, WorkerConfig};
pub use errors::{codes, ErrorInfo, RadError};
pub use hash::stable_hash_string;
pub use rng::{derive_substream_seed, RngHandle};
