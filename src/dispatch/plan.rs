//! Piece planning shared by the fixed-pool and sequential backends.

use crate::core::context::Piece;
use crate::core::error::{DispatchError, DispatchResult, OperationError};
use crate::core::extent::Extent;
use crate::core::split::SplitPolicy;
use crate::dispatch::report::{PieceOutcome, PieceRecord};
use crate::dispatch::WorkFn;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// What one worker id will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Planned {
    /// Run the callback on this piece.
    Run(Piece),
    /// Id beyond the achieved piece count.
    Idle(usize),
    /// Empty sub-extent.
    Skipped(Piece),
}

impl Planned {
    pub(crate) fn id(&self) -> usize {
        match self {
            Planned::Run(piece) | Planned::Skipped(piece) => piece.id,
            Planned::Idle(id) => *id,
        }
    }
}

/// Ask `splitter` for every worker's piece and check the plan is sound.
///
/// Every runnable piece must lie inside `full` and no two may intersect;
/// otherwise shared output writes could race and the call is refused.
pub(crate) fn plan_pieces(
    full: &Extent,
    splitter: &dyn SplitPolicy,
    workers: usize,
) -> DispatchResult<Vec<Planned>> {
    let plan: Vec<Planned> = (0..workers)
        .map(|id| {
            let result = splitter.split(full, id, workers);
            if !result.is_in_range(id) {
                Planned::Idle(id)
            } else if result.extent.is_empty() {
                Planned::Skipped(Piece::new(id, result.extent))
            } else {
                Planned::Run(Piece::new(id, result.extent))
            }
        })
        .collect();

    let runnable: Vec<&Piece> = plan
        .iter()
        .filter_map(|p| match p {
            Planned::Run(piece) => Some(piece),
            _ => None,
        })
        .collect();

    for (i, a) in runnable.iter().enumerate() {
        if !full.contains_extent(&a.extent) {
            return Err(DispatchError::PieceOutsideExtent {
                piece: a.id,
                sub: a.extent,
                extent: *full,
            });
        }
        if let Some(b) = runnable[i + 1..].iter().find(|b| a.extent.intersects(&b.extent)) {
            return Err(DispatchError::OverlappingPieces {
                first: a.id,
                second: b.id,
            });
        }
    }

    let idle = plan.iter().filter(|p| matches!(p, Planned::Idle(_))).count();
    if idle > 0 {
        log::debug!(
            "{} splits into {} piece(s); {} of {} worker(s) stay idle",
            full,
            workers - idle,
            idle,
            workers
        );
    }

    Ok(plan)
}

/// Run the callback for one piece, turning a panic into a failure.
pub(crate) fn run_piece(piece: &Piece, work: &WorkFn<'_>) -> PieceRecord {
    let outcome = match catch_unwind(AssertUnwindSafe(|| work(piece))) {
        Ok(Ok(())) => PieceOutcome::Completed,
        Ok(Err(error)) => PieceOutcome::Failed(error),
        Err(payload) => PieceOutcome::Failed(OperationError::from_panic(payload)),
    };
    if let PieceOutcome::Failed(error) = &outcome {
        log::warn!("piece {} {} failed: {}", piece.id, piece.extent, error);
    }
    PieceRecord {
        piece: piece.id,
        extent: piece.extent,
        region: piece.region,
        outcome,
    }
}

/// Carry out one planned entry.
pub(crate) fn execute_planned(planned: &Planned, work: &WorkFn<'_>) -> PieceRecord {
    match planned {
        Planned::Run(piece) => run_piece(piece, work),
        Planned::Skipped(piece) => PieceRecord {
            piece: piece.id,
            extent: piece.extent,
            region: piece.region,
            outcome: PieceOutcome::Skipped,
        },
        Planned::Idle(id) => PieceRecord {
            piece: *id,
            extent: Extent::EMPTY,
            region: Extent::EMPTY,
            outcome: PieceOutcome::Idle,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::split::{AxisSplitter, SplitResult};

    struct Overlapping;

    impl SplitPolicy for Overlapping {
        fn split(&self, full: &Extent, piece: usize, _total: usize) -> SplitResult {
            let (min, max) = full.axis(1);
            let lo = (min + piece as i32).min(max);
            SplitResult {
                extent: full.with_axis(1, lo, max),
                achieved: 2,
            }
        }
    }

    struct Escaping;

    impl SplitPolicy for Escaping {
        fn split(&self, full: &Extent, _piece: usize, _total: usize) -> SplitResult {
            let (min, max) = full.axis(0);
            SplitResult {
                extent: full.with_axis(0, min, max + 1),
                achieved: 1,
            }
        }
    }

    #[test]
    fn test_plan_marks_idle_workers() {
        let full = Extent::new([0, 9, 0, 9, 0, 9]);
        let plan = plan_pieces(&full, &AxisSplitter, 16).unwrap();
        assert_eq!(plan.len(), 16);
        assert!(plan[..10].iter().all(|p| matches!(p, Planned::Run(_))));
        assert!(plan[10..].iter().all(|p| matches!(p, Planned::Idle(_))));
        assert_eq!(plan[12].id(), 12);
    }

    #[test]
    fn test_plan_skips_empty_extent() {
        // axis 1 is splittable but axis 0 is inverted, so nothing is split
        let full = Extent::new([5, 4, 0, 9, 0, 0]);
        let plan = plan_pieces(&full, &AxisSplitter, 3).unwrap();
        assert!(matches!(plan[0], Planned::Skipped(piece) if piece.extent == full));
        assert!(plan[1..].iter().all(|p| matches!(p, Planned::Idle(_))));
    }

    #[test]
    fn test_plan_rejects_overlap() {
        let full = Extent::plane(0, 9, 0, 9);
        assert!(matches!(
            plan_pieces(&full, &Overlapping, 2),
            Err(DispatchError::OverlappingPieces { first: 0, second: 1 })
        ));
    }

    #[test]
    fn test_plan_rejects_escaping_piece() {
        let full = Extent::plane(0, 9, 0, 9);
        assert!(matches!(
            plan_pieces(&full, &Escaping, 1),
            Err(DispatchError::PieceOutsideExtent { piece: 0, .. })
        ));
    }

    #[test]
    fn test_run_piece_catches_panic() {
        let work = |piece: &Piece| -> Result<(), OperationError> {
            if piece.id == 1 {
                panic!("piece one exploded");
            }
            Ok(())
        };
        let ok = run_piece(&Piece::new(0, Extent::plane(0, 0, 0, 0)), &work);
        assert_eq!(ok.outcome, PieceOutcome::Completed);

        let failed = run_piece(&Piece::new(1, Extent::plane(0, 0, 0, 0)), &work);
        assert_eq!(
            failed.outcome,
            PieceOutcome::Failed(OperationError::Panicked("piece one exploded".to_string()))
        );
    }
}
