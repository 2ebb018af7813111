//! Subprocess pool with a concurrency cap and a fixed poll interval.
//!
//! Commands are shell strings run through `sh -c`. The pool never aborts a
//! batch because one command fails: every exit is recorded as a
//! [`ProcessOutcome`] and the queue keeps draining.

use std::collections::VecDeque;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use rad_core::config::{PoolConfig, DEFAULT_MAX_CONCURRENT, DEFAULT_WAIT_TIME_MS};
use rad_core::errors::{codes, ErrorInfo, RadError};
use rad_core::CancelToken;

/// Default cap on simultaneously running subprocesses.
pub const MAX_CONCURRENT_PROCESSES: usize = DEFAULT_MAX_CONCURRENT;
/// Default pause between polls.
pub const WAIT_TIME: Duration = Duration::from_millis(DEFAULT_WAIT_TIME_MS);

/// A launched subprocess owned by the pool until its exit is observed.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    command: String,
    launched_at: Instant,
}

impl ProcessHandle {
    /// Operating system process id.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Command line the process was started from.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Instant the process was started.
    pub fn launched_at(&self) -> Instant {
        self.launched_at
    }
}

/// Exit record of one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    /// Command line.
    pub command: String,
    /// Exit code; `None` when the process could not be started or was killed by a signal.
    pub exit_code: Option<i32>,
    /// True for a zero exit status.
    pub success: bool,
    /// Wall time between launch and observed exit.
    pub elapsed_ms: u64,
}

/// Summary returned by [`ProcessPool::run_processes`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolReport {
    /// Commands launched during the run.
    pub launched: usize,
    /// Largest running count observed at a poll.
    pub peak_running: usize,
    /// Exits observed since the previous report, in observation order.
    pub outcomes: Vec<ProcessOutcome>,
    /// Commands left in the queue because a stop was requested.
    pub remaining: usize,
    /// True when the run ended on a stop request.
    pub cancelled: bool,
}

impl PoolReport {
    /// Number of commands that did not exit cleanly.
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|outcome| !outcome.success).count()
    }
}

/// Bounded pool of shell subprocesses.
#[derive(Debug)]
pub struct ProcessPool {
    queue: VecDeque<String>,
    running: Vec<ProcessHandle>,
    outcomes: Vec<ProcessOutcome>,
    max_concurrent: usize,
    wait_time: Duration,
    cancel: Option<CancelToken>,
}

impl Default for ProcessPool {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            running: Vec::new(),
            outcomes: Vec::new(),
            max_concurrent: MAX_CONCURRENT_PROCESSES,
            wait_time: WAIT_TIME,
            cancel: None,
        }
    }
}

impl ProcessPool {
    /// Creates an empty pool with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty pool with explicit limits; both must be positive.
    pub fn with_limits(max_concurrent: usize, wait_time: Duration) -> Result<Self, RadError> {
        if max_concurrent == 0 || wait_time.is_zero() {
            return Err(RadError::Configuration(
                ErrorInfo::new("pool_limits", "pool limits must be positive")
                    .with_context("max_concurrent", max_concurrent.to_string())
                    .with_context("wait_time_ms", wait_time.as_millis().to_string()),
            ));
        }
        let mut pool = Self::default();
        pool.max_concurrent = max_concurrent;
        pool.wait_time = wait_time;
        Ok(pool)
    }

    /// Creates a pool from node configuration.
    pub fn from_config(config: &PoolConfig) -> Result<Self, RadError> {
        Self::with_limits(config.max_concurrent, Duration::from_millis(config.wait_time_ms))
    }

    /// Stops launching queued commands once `token` reports cancellation.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Concurrency cap applied by [`ProcessPool::run_processes`].
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Poll interval.
    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }

    /// Appends commands to the queue.
    pub fn add_process_commands<I, S>(&mut self, commands: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queue.extend(commands.into_iter().map(Into::into));
    }

    /// Number of commands waiting to be launched.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Starts `command` right away, regardless of the concurrency cap.
    pub fn launch_process(&mut self, command: &str) -> Result<u32, RadError> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|err| {
                RadError::Process(
                    ErrorInfo::new(codes::PROCESS_FAILED, err.to_string()).with_context("command", command),
                )
            })?;
        let handle = ProcessHandle {
            child,
            command: command.to_string(),
            launched_at: Instant::now(),
        };
        let pid = handle.pid();
        debug!(pid = pid, command = command; "launched process");
        self.running.push(handle);
        Ok(pid)
    }

    /// Polls every live handle and returns how many are still running.
    ///
    /// Exited processes are removed and their outcomes recorded.
    pub fn number_of_running_processes(&mut self) -> usize {
        let mut still_running = Vec::with_capacity(self.running.len());
        for mut handle in self.running.drain(..) {
            match handle.child.try_wait() {
                Ok(None) => still_running.push(handle),
                Ok(Some(status)) => {
                    let outcome = ProcessOutcome {
                        command: handle.command,
                        exit_code: status.code(),
                        success: status.success(),
                        elapsed_ms: handle.launched_at.elapsed().as_millis() as u64,
                    };
                    if outcome.success {
                        debug!(command = outcome.command.as_str(), elapsed_ms = outcome.elapsed_ms; "process exited");
                    } else {
                        warn!(command = outcome.command.as_str(), exit_code:? = outcome.exit_code; "process failed");
                    }
                    self.outcomes.push(outcome);
                }
                Err(err) => {
                    warn!(command = handle.command.as_str(), error = err.to_string(); "lost track of process");
                    self.outcomes.push(ProcessOutcome {
                        command: handle.command,
                        exit_code: None,
                        success: false,
                        elapsed_ms: handle.launched_at.elapsed().as_millis() as u64,
                    });
                }
            }
        }
        self.running = still_running;
        self.running.len()
    }

    /// Sleeps for the pool's poll interval.
    pub fn wait(&self) {
        self.wait_for(self.wait_time);
    }

    /// Sleeps for `duration`.
    pub fn wait_for(&self, duration: Duration) {
        thread::sleep(duration);
    }

    /// Drains the queue while keeping at most `max_concurrent` processes alive.
    ///
    /// Returns once the queue is empty and every launched process has exited.
    /// After a stop request no further commands are launched; the remaining
    /// queue is left in place and the run ends when the running ones exit.
    pub fn run_processes(&mut self) -> PoolReport {
        let mut report = PoolReport::default();
        info!(queued = self.queue.len(), max_concurrent = self.max_concurrent; "running process queue");
        loop {
            if !report.cancelled && self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                warn!(queued = self.queue.len(); "stop requested, no further launches");
                report.cancelled = true;
            }
            if !report.cancelled {
                while self.number_of_running_processes() < self.max_concurrent {
                    let Some(command) = self.queue.pop_front() else {
                        break;
                    };
                    match self.launch_process(&command) {
                        Ok(_) => report.launched += 1,
                        Err(err) => {
                            warn!(command = command.as_str(), error = err.to_string(); "could not launch process");
                            self.outcomes.push(ProcessOutcome {
                                command,
                                exit_code: None,
                                success: false,
                                elapsed_ms: 0,
                            });
                        }
                    }
                }
            }
            let running = self.number_of_running_processes();
            report.peak_running = report.peak_running.max(running);
            if running == 0 && (report.cancelled || self.queue.is_empty()) {
                break;
            }
            self.wait();
        }
        report.remaining = self.queue.len();
        report.outcomes = std::mem::take(&mut self.outcomes);
        info!(
            launched = report.launched,
            failures = report.failures(),
            peak_running = report.peak_running;
            "process queue finished"
        );
        report
    }
}

impl Drop for ProcessPool {
    fn drop(&mut self) {
        for handle in &mut self.running {
            if let Err(err) = handle.child.kill() {
                debug!(pid = handle.child.id(), error = err.to_string(); "kill on drop failed");
            }
            let _ = handle.child.wait();
        }
    }
}
