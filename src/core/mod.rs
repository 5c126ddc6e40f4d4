//! Core types and traits for extent dispatch.
//!
//! This module contains the foundational pieces every backend builds on:
//! - Extents and the axis splitter
//! - Volume buffers and region-restricted writers
//! - The invocation package and per-piece context
//! - The worker callback trait
//! - Error types

pub mod context;
pub mod error;
pub mod extent;
pub mod operation;
pub mod split;
pub mod volume;

// Re-export commonly used types
pub use context::{InvocationPackage, Piece, PieceContext};
pub use error::{DispatchError, OperationError, PieceFailure};
pub use extent::Extent;
pub use operation::{FnOperation, ThreadedOperation, UnimplementedOperation};
pub use split::{split_extent, AxisSplitter, SplitPolicy, SplitResult};
pub use volume::{RegionWriter, Volume};
