//! The per-piece worker callback contract.
//!
//! A [`ThreadedOperation`] is what a concrete filter implements to take part
//! in extent dispatch. The engine decides how the extent is cut up and
//! scheduled; the operation only ever sees one piece at a time.

use crate::core::context::PieceContext;
use crate::core::error::{OperationError, OperationResult};
use crate::core::extent::Extent;
use crate::core::split::{split_extent, SplitPolicy, SplitResult};

/// A kernel run once per piece, possibly on many threads at once.
///
/// # Thread Safety
///
/// `Send + Sync` bounds let one operation instance serve every worker. An
/// implementation must write only inside [`PieceContext::region`] (the
/// writers enforce this) and must synchronise any state it keeps outside
/// the package itself.
///
/// # Example Implementation
///
/// ```ignore
/// struct Invert;
///
/// impl ThreadedOperation<u8, u8> for Invert {
///     fn name(&self) -> &str {
///         "invert"
///     }
///
///     fn threaded_execute(&self, ctx: &mut PieceContext<'_, u8, u8>) -> OperationResult<()> {
///         let input = ctx.first_input()?;
///         let mut out = ctx.output(0)?;
///         out.fill_with(|index| 255 - input.get(index).copied().unwrap_or(0))
///     }
/// }
/// ```
pub trait ThreadedOperation<I, O>: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        "unnamed"
    }

    /// Process one piece.
    ///
    /// The default fails with [`OperationError::NotImplemented`] so a
    /// missing override shows up in the dispatch report instead of
    /// silently producing untouched output.
    fn threaded_execute(&self, ctx: &mut PieceContext<'_, I, O>) -> OperationResult<()> {
        log::error!(
            "operation '{}' does not override threaded_execute (piece {} {})",
            self.name(),
            ctx.piece_id(),
            ctx.extent()
        );
        Err(OperationError::NotImplemented {
            operation: self.name().to_string(),
        })
    }

    /// Partitioning hook used by the fixed-pool and sequential backends.
    ///
    /// Override to supply a different policy; the result must keep pieces
    /// disjoint and inside `full`.
    fn split_extent(&self, full: &Extent, piece: usize, total: usize) -> SplitResult {
        split_extent(full, piece, total)
    }

    /// Whether the operation re-derives axis 2 from
    /// [`PieceContext::slice_range`].
    ///
    /// Dynamic blocks always carry a single `[0, 0]` slice on axis 2. Only
    /// operations answering `true` may be dispatched that way over a
    /// multi-slice extent.
    fn rederives_slices(&self) -> bool {
        false
    }
}

/// Adapts an operation's split hook to a [`SplitPolicy`].
pub(crate) struct OperationSplitter<'o, I, O>(pub &'o dyn ThreadedOperation<I, O>);

impl<I, O> SplitPolicy for OperationSplitter<'_, I, O> {
    fn split(&self, full: &Extent, piece: usize, total: usize) -> SplitResult {
        self.0.split_extent(full, piece, total)
    }
}

/// An operation built from a closure.
pub struct FnOperation<F> {
    name: String,
    rederives_slices: bool,
    f: F,
}

impl<F> FnOperation<F> {
    /// Wrap `f` as an operation called `name`.
    pub fn new<I, O>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut PieceContext<'_, I, O>) -> OperationResult<()> + Send + Sync,
    {
        Self {
            name: name.into(),
            rederives_slices: false,
            f,
        }
    }

    /// Declare that the closure reads the true axis-2 range itself.
    pub fn rederiving_slices(mut self) -> Self {
        self.rederives_slices = true;
        self
    }
}

impl<I, O, F> ThreadedOperation<I, O> for FnOperation<F>
where
    F: Fn(&mut PieceContext<'_, I, O>) -> OperationResult<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn threaded_execute(&self, ctx: &mut PieceContext<'_, I, O>) -> OperationResult<()> {
        (self.f)(ctx)
    }

    fn rederives_slices(&self) -> bool {
        self.rederives_slices
    }
}

/// An operation that supplies no kernel at all.
///
/// Every piece it is asked to process fails with
/// [`OperationError::NotImplemented`].
#[derive(Debug, Clone, Default)]
pub struct UnimplementedOperation;

impl<I, O> ThreadedOperation<I, O> for UnimplementedOperation {
    fn name(&self) -> &str {
        "unimplemented"
    }
}
