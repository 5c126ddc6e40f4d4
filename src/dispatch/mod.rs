//! Dispatch backends.
//!
//! A backend takes a [`Job`] (the full extent, a split policy and a
//! type-erased per-piece callback), runs the callback over disjoint pieces
//! and returns only once every piece has finished.
//!
//! - [`FixedPoolDispatcher`]: one OS thread per worker id, pieces from the
//!   split policy.
//! - [`DynamicBlockDispatcher`]: axes 0 and 1 recursively bisected into
//!   blocks on a work-stealing pool.
//! - [`SequentialDispatcher`]: the fixed-pool plan run in order on the
//!   calling thread.

pub mod dynamic;
pub mod fixed_pool;
pub mod plan;
pub mod quiet;
pub mod report;
pub mod sequential;

pub use dynamic::DynamicBlockDispatcher;
pub use fixed_pool::FixedPoolDispatcher;
pub use report::{DispatchReport, PieceOutcome, PieceRecord};
pub use sequential::SequentialDispatcher;

use crate::core::context::Piece;
use crate::core::error::{DispatchResult, OperationResult};
use crate::core::extent::Extent;
use crate::core::split::SplitPolicy;

/// The per-piece callback as the backends see it.
pub type WorkFn<'a> = dyn Fn(&Piece) -> OperationResult<()> + Sync + 'a;

/// Everything a backend needs for one call.
pub struct Job<'a> {
    /// The full extent to cover.
    pub extent: Extent,
    /// Partitioning policy for id-based backends.
    pub splitter: &'a dyn SplitPolicy,
    /// Callback run once per piece.
    pub work: &'a WorkFn<'a>,
    /// Suppress debug logging while pieces run.
    pub quiet: bool,
}

/// A scheduling strategy.
pub trait Dispatcher: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Run `job` to completion.
    ///
    /// Returns `Err` only when the job could not be started; piece failures
    /// are recorded in the report.
    fn dispatch(&self, job: &Job<'_>) -> DispatchResult<DispatchReport>;
}
