//! Dispatch configuration.
//!
//! A [`DispatchConfig`] is passed into every `execute` call. Nothing about
//! backend choice or worker counts is kept as process-wide state, so a call
//! in flight can never observe a reconfiguration.

use crate::core::error::{DispatchError, DispatchResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default target block count for dynamic dispatch.
pub const DEFAULT_BLOCK_HINT: usize = 900;

/// Which backend runs the pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// One OS thread per worker, pieces from the split policy.
    #[default]
    FixedPool,
    /// Work-stealing blocks over axes 0 and 1.
    DynamicBlocks,
    /// The fixed-pool plan, run in order on the calling thread.
    Sequential,
}

impl Backend {
    /// Parse a backend name as used on the command line and in config files.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "fixed_pool" | "fixed" | "threads" => Some(Backend::FixedPool),
            "dynamic_blocks" | "dynamic" | "smp" => Some(Backend::DynamicBlocks),
            "sequential" | "serial" => Some(Backend::Sequential),
            _ => None,
        }
    }
}

/// Number of hardware threads, falling back to one.
pub fn detected_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Options for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Backend to use.
    pub backend: Backend,
    /// Worker threads for the fixed pool, piece count for sequential runs,
    /// and pool size for dynamic blocks.
    pub worker_count: usize,
    /// Target block count for dynamic dispatch (0 = automatic).
    pub block_hint: usize,
    /// Cap logging at `Info` while workers run.
    pub quiet_workers: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            backend: Backend::FixedPool,
            worker_count: detected_parallelism(),
            block_hint: DEFAULT_BLOCK_HINT,
            quiet_workers: true,
        }
    }
}

impl DispatchConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Set the worker count (0 is rejected by [`validate`](Self::validate)).
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    /// Set the dynamic block hint.
    pub fn with_block_hint(mut self, hint: usize) -> Self {
        self.block_hint = hint;
        self
    }

    /// Enable or disable log suppression in parallel sections.
    pub fn with_quiet_workers(mut self, quiet: bool) -> Self {
        self.quiet_workers = quiet;
        self
    }

    /// Switch between dynamic blocks and the fixed pool.
    pub fn set_dynamic(&mut self, enabled: bool) {
        self.backend = if enabled {
            Backend::DynamicBlocks
        } else {
            Backend::FixedPool
        };
    }

    /// Whether dynamic block dispatch is selected.
    pub fn is_dynamic(&self) -> bool {
        self.backend == Backend::DynamicBlocks
    }

    /// Set the worker count. Zero or negative values are rejected and the
    /// configuration is left unchanged.
    pub fn set_worker_count(&mut self, workers: i64) -> DispatchResult<()> {
        if workers <= 0 {
            log::warn!("worker count must be positive, keeping {}", self.worker_count);
            return Err(DispatchError::invalid(
                "worker_count",
                format!("must be positive, got {}", workers),
            ));
        }
        self.worker_count = workers as usize;
        Ok(())
    }

    /// Set the dynamic block hint. Negative values are rejected and the
    /// configuration is left unchanged.
    pub fn set_block_hint(&mut self, hint: i64) -> DispatchResult<()> {
        if hint < 0 {
            log::warn!("block hint cannot be less than 0, keeping {}", self.block_hint);
            return Err(DispatchError::invalid(
                "block_hint",
                format!("cannot be negative, got {}", hint),
            ));
        }
        self.block_hint = hint as usize;
        Ok(())
    }

    /// Check the values that public fields or files may have set.
    pub fn validate(&self) -> DispatchResult<()> {
        if self.worker_count == 0 {
            return Err(DispatchError::invalid("worker_count", "must be positive, got 0"));
        }
        Ok(())
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> DispatchResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| DispatchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> DispatchResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> DispatchResult<String> {
        toml::to_string(self).map_err(|e| DispatchError::Config(e.to_string()))
    }
}

impl fmt::Display for DispatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backend: {:?}", self.backend)?;
        writeln!(f, "Worker count: {}", self.worker_count)?;
        writeln!(f, "Block hint: {}", self.block_hint)?;
        write!(f, "Quiet workers: {}", self.quiet_workers)
    }
}
