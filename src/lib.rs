//! # extent_dispatch - Parallel Extent Dispatch
//!
//! extent_dispatch splits a rectangular 3D index range (an *extent*) into
//! disjoint pieces and runs a per-piece kernel over them concurrently.
//!
//! ## Features
//!
//! - **Axis splitting**: Deterministic partitioning along the slowest axis
//!   that can be split, with a hook for custom policies
//! - **Fixed worker pool**: One scoped OS thread per worker, each taking one piece
//! - **Dynamic blocks**: Recursive 2D bisection on rayon's work-stealing pool
//! - **Safe shared output**: Workers write through region-checked writers over
//!   a piece plan verified to be disjoint
//! - **Failure reports**: Per-piece outcomes instead of a single error
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use extent_dispatch::prelude::*;
//!
//! let extent = Extent::new([0, 255, 0, 255, 0, 15]);
//! let input = Volume::from_fn(extent, |[x, y, z]| (x ^ y ^ z) as u8);
//! let mut output = Volume::new(extent, 0u8);
//!
//! let invert = FnOperation::new("invert", |ctx: &mut PieceContext<'_, u8, u8>| {
//!     let input = ctx.first_input()?;
//!     let mut out = ctx.output(0)?;
//!     out.fill_with(|index| 255 - input.get(index).copied().unwrap_or(0))
//! });
//!
//! let engine = DispatchEngine::new();
//! let config = DispatchConfig::new().with_worker_count(8);
//! let report = engine
//!     .execute(&[vec![&input]], &mut [&mut output], &invert, &config)?
//!     .into_result()?;
//! println!("{}", report.summary());
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`core`]: Extents, splitting, volumes, the operation trait and errors
//! - [`dispatch`]: The fixed-pool, dynamic-block and sequential backends
//! - [`execution`]: Configuration and the orchestrating engine
//!
//! ## Implementing Operations
//!
//! Implement [`ThreadedOperation`](core::operation::ThreadedOperation) for a
//! kernel that needs more than a closure, e.g. its own split policy or
//! slice handling under dynamic dispatch.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod dispatch;
pub mod execution;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use extent_dispatch::prelude::*;
/// ```
pub mod prelude {
    // Extents and splitting
    pub use crate::core::extent::Extent;
    pub use crate::core::split::{split_extent, AxisSplitter, SplitPolicy, SplitResult};

    // Buffers
    pub use crate::core::volume::{RegionWriter, Volume};

    // Operations and contexts
    pub use crate::core::context::{Piece, PieceContext};
    pub use crate::core::operation::{FnOperation, ThreadedOperation, UnimplementedOperation};

    // Errors
    pub use crate::core::error::{
        DispatchError, DispatchResult, OperationError, OperationResult, PieceFailure,
    };

    // Dispatch
    pub use crate::dispatch::{
        DispatchReport, Dispatcher, DynamicBlockDispatcher, FixedPoolDispatcher, PieceOutcome,
        PieceRecord, SequentialDispatcher,
    };

    // Execution
    pub use crate::execution::config::{Backend, DispatchConfig};
    pub use crate::execution::engine::DispatchEngine;
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
