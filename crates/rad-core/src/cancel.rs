//! Cooperative cancellation shared by batch drivers and the process pool.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;

/// Stop flag checked between units of work.
///
/// Cloning shares the flag. When a sentinel path is configured, the token also
/// reports cancellation once that file exists, which lets an operator stop a
/// long batch by touching a file.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    sentinel: Option<PathBuf>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also treats the existence of `path` as a stop request.
    pub fn with_sentinel(mut self, path: impl Into<PathBuf>) -> Self {
        self.sentinel = Some(path.into());
        self
    }

    /// Returns the configured sentinel path.
    pub fn sentinel(&self) -> Option<&Path> {
        self.sentinel.as_deref()
    }

    /// Requests a stop.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true once a stop was requested through the flag or the sentinel.
    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        match &self.sentinel {
            Some(path) if path.exists() => {
                info!(sentinel = path.display().to_string(); "stop sentinel detected");
                self.flag.store(true, Ordering::SeqCst);
                true
            }
            _ => false,
        }
    }
}
