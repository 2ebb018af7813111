pub mod build_grid;
pub mod pool;
pub mod receive;
pub mod run_job;
