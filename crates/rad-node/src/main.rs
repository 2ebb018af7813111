use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    build_grid::{self, BuildGridArgs},
    pool::{self, PoolArgs},
    receive::{self, ReceiveArgs},
    run_job::{self, RunJobArgs},
};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "rad-node", about = "RAD compute node CLI")]
struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a shapegrid and write it as JSON.
    BuildGrid(BuildGridArgs),
    /// Execute a job request and write its result package.
    RunJob(RunJobArgs),
    /// Parse a result package into a job's output locations.
    Receive(ReceiveArgs),
    /// Run a list of shell commands through the bounded process pool.
    Pool(PoolArgs),
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    env_logger::Builder::from_env(env).format_timestamp_millis().init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    match cli.command {
        Command::BuildGrid(args) => build_grid::run(&args),
        Command::RunJob(args) => run_job::run(&args),
        Command::Receive(args) => receive::run(&args),
        Command::Pool(args) => pool::run(&args),
    }
}
