//! Extent splitting.
//!
//! Divides a full extent into `total` disjoint pieces along a single axis.
//! The axis is the slowest-varying one that has more than one index, so
//! pieces stay contiguous in memory for x-fastest buffers.
//!
//! The number of pieces actually produced can be smaller than requested:
//! a 10-slice volume split 16 ways yields 10 pieces, and callers holding
//! piece ids 10..15 must do nothing.

use crate::core::extent::{Extent, AXES};
use serde::{Deserialize, Serialize};

/// Outcome of splitting one piece off a full extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitResult {
    /// The piece's sub-extent. Equal to the full extent when it could not be
    /// split, or when the requested piece lies beyond `achieved`.
    pub extent: Extent,
    /// How many pieces the full extent really divides into (`1..=total`).
    pub achieved: usize,
}

impl SplitResult {
    /// Whether `piece` falls inside the achieved piece count.
    pub fn is_in_range(&self, piece: usize) -> bool {
        piece < self.achieved
    }
}

/// A partitioning policy.
///
/// Implementations must hand out pairwise disjoint sub-extents contained in
/// the full extent for every `piece < achieved`. The fixed-pool dispatcher
/// checks this before running any worker.
pub trait SplitPolicy: Send + Sync {
    /// Compute piece `piece` of `total`.
    fn split(&self, full: &Extent, piece: usize, total: usize) -> SplitResult;
}

/// The default policy: contiguous slabs along the slowest splittable axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisSplitter;

impl SplitPolicy for AxisSplitter {
    fn split(&self, full: &Extent, piece: usize, total: usize) -> SplitResult {
        split_extent(full, piece, total)
    }
}

/// Split `full` into `total` pieces and return piece `piece`.
///
/// `total == 0` is treated as 1.
pub fn split_extent(full: &Extent, piece: usize, total: usize) -> SplitResult {
    let unsplit = SplitResult {
        extent: *full,
        achieved: 1,
    };

    if full.is_empty() {
        log::trace!("split {}: empty extent, cannot split", full);
        return unsplit;
    }

    let mut split_axis = None;
    for axis in (0..AXES).rev() {
        let (min, max) = full.axis(axis);
        if min < max {
            split_axis = Some(axis);
            break;
        }
    }
    let Some(axis) = split_axis else {
        log::trace!("split {}: single cell, cannot split", full);
        return unsplit;
    };

    let (min, max) = full.axis(axis);
    let range = max as i64 - min as i64 + 1;
    let total = total.max(1) as i64;
    let per_piece = div_ceil(range, total);
    let achieved = div_ceil(range, per_piece);
    let last = achieved - 1;

    // ids too large for i64 are past the last piece as well
    let extent = match i64::try_from(piece) {
        Ok(p) if p < last => {
            let lo = min as i64 + p * per_piece;
            full.with_axis(axis, lo as i32, (lo + per_piece - 1) as i32)
        }
        Ok(p) if p == last => {
            let lo = min as i64 + p * per_piece;
            full.with_axis(axis, lo as i32, max)
        }
        _ => *full,
    };

    log::trace!(
        "split {} piece {} of {} on axis {} -> {}",
        full,
        piece,
        total,
        axis,
        extent
    );

    SplitResult {
        extent,
        achieved: achieved as usize,
    }
}

/// All in-range pieces of `full` split `total` ways, in piece order.
pub fn split_all(full: &Extent, total: usize) -> Vec<Extent> {
    let achieved = split_extent(full, 0, total).achieved;
    (0..achieved)
        .map(|piece| split_extent(full, piece, total).extent)
        .collect()
}

fn div_ceil(a: i64, b: i64) -> i64 {
    (a + b - 1) / b
}
