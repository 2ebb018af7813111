use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use rad_core::serde::to_canonical_json_bytes;
use rad_core::{CancelToken, PoolConfig};
use rad_pool::ProcessPool;

#[derive(Args, Debug)]
pub struct PoolArgs {
    /// File with one shell command per line; blank lines and `#` comments are skipped.
    #[arg(long)]
    pub commands: Option<PathBuf>,
    /// Commands given directly.
    #[arg(value_name = "COMMAND")]
    pub inline: Vec<String>,
    /// Maximum number of simultaneously running commands.
    #[arg(long, default_value_t = rad_pool::MAX_CONCURRENT_PROCESSES)]
    pub max_concurrent: usize,
    /// Pause between polls in milliseconds.
    #[arg(long, default_value_t = rad_pool::WAIT_TIME.as_millis() as u64)]
    pub wait_time_ms: u64,
    /// Stop launching once this file exists.
    #[arg(long)]
    pub stop_sentinel: Option<PathBuf>,
}

pub fn run(args: &PoolArgs) -> Result<(), Box<dyn Error>> {
    let mut commands = Vec::new();
    if let Some(path) = &args.commands {
        let text = fs::read_to_string(path)?;
        commands.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    commands.extend(args.inline.iter().cloned());
    if commands.is_empty() {
        return Err("no commands given".into());
    }

    let config = PoolConfig {
        max_concurrent: args.max_concurrent,
        wait_time_ms: args.wait_time_ms,
    };
    let mut cancel = CancelToken::new();
    if let Some(sentinel) = &args.stop_sentinel {
        cancel = cancel.with_sentinel(sentinel.clone());
    }
    let mut pool = ProcessPool::from_config(&config)?.with_cancel_token(cancel);
    pool.add_process_commands(commands);
    let report = pool.run_processes();
    let json = to_canonical_json_bytes(&report)?;
    println!("{}", String::from_utf8(json)?);
    Ok(())
}
