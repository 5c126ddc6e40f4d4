//! Execution engine module.
//!
//! This module resolves what to process and hands it to a dispatch backend.

pub mod config;
pub mod engine;

pub use config::{Backend, DispatchConfig};
pub use engine::DispatchEngine;
