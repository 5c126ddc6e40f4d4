//! Fixed worker-pool backend.
//!
//! Spawns exactly `workers` scoped OS threads for one call. Worker `id`
//! processes piece `id` of `workers` as computed by the job's split policy;
//! ids past the achieved piece count idle. The call returns after every
//! thread has been joined.

use crate::core::error::{DispatchError, DispatchResult, OperationError};
use crate::core::extent::Extent;
use crate::dispatch::plan::{execute_planned, plan_pieces, Planned};
use crate::dispatch::quiet::QuietDebug;
use crate::dispatch::report::{DispatchReport, PieceOutcome, PieceRecord};
use crate::dispatch::{Dispatcher, Job};
use crate::execution::config::Backend;
use std::time::Instant;

/// Fork-join over a fixed number of OS threads.
#[derive(Debug, Clone, Copy)]
pub struct FixedPoolDispatcher {
    workers: usize,
}

impl FixedPoolDispatcher {
    /// Create a dispatcher with `workers` threads (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Number of threads spawned per call.
    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Dispatcher for FixedPoolDispatcher {
    fn name(&self) -> &'static str {
        "fixed-pool"
    }

    fn dispatch(&self, job: &Job<'_>) -> DispatchResult<DispatchReport> {
        let start = Instant::now();
        let plan = plan_pieces(&job.extent, job.splitter, self.workers)?;
        let work = job.work;

        let records = {
            let _quiet = QuietDebug::engage(job.quiet);
            crossbeam::thread::scope(|scope| {
                let spawned: Vec<_> = plan
                    .iter()
                    .map(|planned| {
                        let handle = scope
                            .builder()
                            .name(format!("extent-worker-{}", planned.id()))
                            .spawn(move |_| execute_planned(planned, work));
                        (planned, handle)
                    })
                    .collect();

                spawned
                    .into_iter()
                    .map(|(planned, handle)| match handle {
                        Ok(handle) => handle.join().unwrap_or_else(|payload| {
                            failed_record(planned, OperationError::from_panic(payload))
                        }),
                        Err(e) => failed_record(
                            planned,
                            OperationError::Failed(format!("could not spawn worker: {}", e)),
                        ),
                    })
                    .collect::<Vec<_>>()
            })
            .map_err(|_| DispatchError::ThreadPool("a worker thread panicked outside its piece".to_string()))?
        };

        Ok(DispatchReport::new(
            Backend::FixedPool,
            job.extent,
            records,
            start.elapsed(),
        ))
    }
}

fn failed_record(planned: &Planned, error: OperationError) -> PieceRecord {
    let (extent, region) = match planned {
        Planned::Run(piece) | Planned::Skipped(piece) => (piece.extent, piece.region),
        Planned::Idle(_) => (Extent::EMPTY, Extent::EMPTY),
    };
    PieceRecord {
        piece: planned.id(),
        extent,
        region,
        outcome: PieceOutcome::Failed(error),
    }
}
