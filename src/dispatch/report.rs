//! Aggregated outcome of one dispatch.

use crate::core::error::{DispatchError, DispatchResult, OperationError, PieceFailure};
use crate::core::extent::Extent;
use crate::execution::config::Backend;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happened to one piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceOutcome {
    /// The callback ran and returned `Ok`.
    Completed,
    /// The worker id was beyond the achieved piece count.
    Idle,
    /// The sub-extent was empty on some axis.
    Skipped,
    /// The callback returned an error or panicked.
    Failed(OperationError),
}

/// One row of a [`DispatchReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceRecord {
    /// Worker id or block index.
    pub piece: usize,
    /// The sub-extent handed to the callback.
    pub extent: Extent,
    /// The output region the piece was allowed to write. Wider than
    /// `extent` on axis 2 for dynamic blocks of slice-aware operations.
    pub region: Extent,
    /// Outcome.
    pub outcome: PieceOutcome,
}

/// Per-piece results of one `execute` call.
///
/// Failures of individual pieces do not abort the call; they are collected
/// here and can be reduced with [`DispatchReport::into_result`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Backend that ran the call.
    pub backend: Backend,
    /// The full extent that was processed.
    pub extent: Extent,
    /// One record per worker or block, sorted by piece id.
    pub pieces: Vec<PieceRecord>,
    /// Wall time between dispatch and barrier.
    pub duration: Duration,
}

impl DispatchReport {
    /// Create a report from unsorted records.
    pub fn new(backend: Backend, extent: Extent, mut pieces: Vec<PieceRecord>, duration: Duration) -> Self {
        pieces.sort_by_key(|record| record.piece);
        Self {
            backend,
            extent,
            pieces,
            duration,
        }
    }

    fn count(&self, pred: impl Fn(&PieceOutcome) -> bool) -> usize {
        self.pieces.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Pieces whose callback succeeded.
    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, PieceOutcome::Completed))
    }

    /// Workers left without a piece.
    pub fn idle(&self) -> usize {
        self.count(|o| matches!(o, PieceOutcome::Idle))
    }

    /// Pieces with an empty sub-extent.
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, PieceOutcome::Skipped))
    }

    /// All failed pieces.
    pub fn failures(&self) -> Vec<PieceFailure> {
        self.pieces
            .iter()
            .filter_map(|record| match &record.outcome {
                PieceOutcome::Failed(error) => Some(PieceFailure {
                    piece: record.piece,
                    extent: record.extent,
                    error: error.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Whether no piece failed.
    pub fn is_success(&self) -> bool {
        self.pieces
            .iter()
            .all(|r| !matches!(r.outcome, PieceOutcome::Failed(_)))
    }

    /// Number of cells covered by callbacks that completed.
    pub fn processed_cells(&self) -> usize {
        self.pieces
            .iter()
            .filter(|r| r.outcome == PieceOutcome::Completed)
            .map(|r| r.region.cell_count())
            .sum()
    }

    /// Turn piece failures into a [`DispatchError::PartialFailure`].
    pub fn into_result(self) -> DispatchResult<Self> {
        let failures = self.failures();
        match failures.into_iter().next() {
            None => Ok(self),
            Some(first) => Err(DispatchError::PartialFailure {
                failed: self.pieces.len() - self.completed() - self.idle() - self.skipped(),
                total: self.pieces.len(),
                first,
            }),
        }
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        let failed = self.pieces.len() - self.completed() - self.idle() - self.skipped();
        let mark = if failed == 0 { "✓" } else { "✗" };
        format!(
            "{} {:?} over {}: {} completed, {} idle, {} skipped, {} failed in {:.2?}",
            mark,
            self.backend,
            self.extent,
            self.completed(),
            self.idle(),
            self.skipped(),
            failed,
            self.duration
        )
    }
}
