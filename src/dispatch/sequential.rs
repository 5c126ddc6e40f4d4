//! Deterministic single-threaded backend.
//!
//! Runs the same piece plan as [`FixedPoolDispatcher`](super::FixedPoolDispatcher)
//! in ascending id order on the calling thread. Useful for tests and for
//! comparing parallel output against a reference pass.

use crate::core::error::DispatchResult;
use crate::dispatch::plan::{execute_planned, plan_pieces};
use crate::dispatch::report::DispatchReport;
use crate::dispatch::{Dispatcher, Job};
use crate::execution::config::Backend;
use std::time::Instant;

/// In-order execution of `pieces` pieces.
#[derive(Debug, Clone, Copy)]
pub struct SequentialDispatcher {
    pieces: usize,
}

impl SequentialDispatcher {
    /// Split into `pieces` pieces (at least one).
    pub fn new(pieces: usize) -> Self {
        Self {
            pieces: pieces.max(1),
        }
    }
}

impl Dispatcher for SequentialDispatcher {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn dispatch(&self, job: &Job<'_>) -> DispatchResult<DispatchReport> {
        let start = Instant::now();
        let plan = plan_pieces(&job.extent, job.splitter, self.pieces)?;
        let records = plan
            .iter()
            .map(|planned| execute_planned(planned, job.work))
            .collect();
        Ok(DispatchReport::new(
            Backend::Sequential,
            job.extent,
            records,
            start.elapsed(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::Piece;
    use crate::core::error::OperationResult;
    use crate::core::extent::Extent;
    use crate::core::split::AxisSplitter;
    use parking_lot::Mutex;

    #[test]
    fn test_runs_in_order_on_caller_thread() {
        let caller = std::thread::current().id();
        let order = Mutex::new(Vec::new());
        let work = |piece: &Piece| -> OperationResult<()> {
            assert_eq!(std::thread::current().id(), caller);
            order.lock().push(piece.id);
            Ok(())
        };
        let job = Job {
            extent: Extent::new([0, 3, 0, 3, 0, 5]),
            splitter: &AxisSplitter,
            work: &work,
            quiet: false,
        };
        let report = SequentialDispatcher::new(3).dispatch(&job).unwrap();
        assert_eq!(order.into_inner(), vec![0, 1, 2]);
        assert_eq!(report.backend, Backend::Sequential);
        assert_eq!(report.processed_cells(), 96);
    }
}
