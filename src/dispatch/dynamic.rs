//! Dynamic block backend.
//!
//! Covers axes 0 and 1 of the extent with a 2D range and lets rayon's
//! work-stealing scheduler bisect it recursively until blocks are small
//! enough, much like a `blocked_range2d`. Every leaf block becomes one
//! callback with axis 2 collapsed to `[0, 0]`.
//!
//! Both ends of the 2D range are inclusive, so the last row and column of
//! the extent are covered.

use crate::core::context::Piece;
use crate::core::error::DispatchResult;
use crate::core::extent::Extent;
use crate::dispatch::plan::run_piece;
use crate::dispatch::quiet::QuietDebug;
use crate::dispatch::report::{DispatchReport, PieceRecord};
use crate::dispatch::{Dispatcher, Job};
use crate::execution::config::Backend;
use parking_lot::Mutex;
use rayon::ThreadPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Blocks per pool thread when no hint is given.
pub const AUTO_BLOCKS_PER_THREAD: usize = 4;

/// An inclusive rectangle over axes 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// First column.
    pub x0: i32,
    /// Last column.
    pub x1: i32,
    /// First row.
    pub y0: i32,
    /// Last row.
    pub y1: i32,
}

impl Block {
    /// The axis-0/axis-1 rectangle of an extent.
    pub fn of(extent: &Extent) -> Self {
        let (x0, x1) = extent.axis(0);
        let (y0, y1) = extent.axis(1);
        Self { x0, x1, y0, y1 }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        (self.x1 as i64 - self.x0 as i64 + 1).max(0) as usize
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        (self.y1 as i64 - self.y0 as i64 + 1).max(0) as usize
    }

    /// Number of cells.
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    /// Halve the longer side. Requires that side to hold at least two cells.
    pub fn bisect(&self) -> (Block, Block) {
        if self.width() >= self.height() {
            let mid = self.x0 + (self.width() / 2) as i32 - 1;
            (
                Block { x1: mid, ..*self },
                Block { x0: mid + 1, ..*self },
            )
        } else {
            let mid = self.y0 + (self.height() / 2) as i32 - 1;
            (
                Block { y1: mid, ..*self },
                Block { y0: mid + 1, ..*self },
            )
        }
    }

    /// The callback extent: this block with a single `[0, 0]` slice.
    pub fn to_extent(&self) -> Extent {
        Extent::plane(self.x0, self.x1, self.y0, self.y1)
    }
}

/// Largest block area for a target block count.
pub fn grain_for(area: usize, target_blocks: usize) -> usize {
    let target = target_blocks.max(1);
    ((area + target - 1) / target).max(1)
}

/// Recursively bisect `block` on the current rayon pool and call `leaf` on
/// every block no larger than `grain`.
pub fn subdivide<F>(block: Block, grain: usize, leaf: &F)
where
    F: Fn(Block) + Sync,
{
    if block.area() <= grain || block.area() <= 1 {
        leaf(block);
        return;
    }
    let (left, right) = block.bisect();
    rayon::join(|| subdivide(left, grain, leaf), || subdivide(right, grain, leaf));
}

/// Work-stealing dispatch over 2D blocks.
#[derive(Clone)]
pub struct DynamicBlockDispatcher {
    block_hint: usize,
    pool: Option<Arc<ThreadPool>>,
}

impl DynamicBlockDispatcher {
    /// Dispatch on rayon's global pool, aiming for `block_hint` blocks
    /// (0 picks a count from the pool size).
    pub fn new(block_hint: usize) -> Self {
        Self {
            block_hint,
            pool: None,
        }
    }

    /// Dispatch on a dedicated pool instead of the global one.
    pub fn with_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    fn target_blocks(&self) -> usize {
        if self.block_hint > 0 {
            return self.block_hint;
        }
        let threads = match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        };
        threads * AUTO_BLOCKS_PER_THREAD
    }
}

impl std::fmt::Debug for DynamicBlockDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicBlockDispatcher")
            .field("block_hint", &self.block_hint)
            .field("pool_threads", &self.pool.as_ref().map(|p| p.current_num_threads()))
            .finish()
    }
}

impl Dispatcher for DynamicBlockDispatcher {
    fn name(&self) -> &'static str {
        "dynamic-blocks"
    }

    fn dispatch(&self, job: &Job<'_>) -> DispatchResult<DispatchReport> {
        let start = Instant::now();
        if job.extent.is_empty() {
            return Ok(DispatchReport::new(
                Backend::DynamicBlocks,
                job.extent,
                Vec::new(),
                start.elapsed(),
            ));
        }

        let full = Block::of(&job.extent);
        let grain = grain_for(full.area(), self.target_blocks());
        let (z0, z1) = job.extent.axis(2);
        let next_index = AtomicUsize::new(0);
        let records: Mutex<Vec<PieceRecord>> = Mutex::new(Vec::new());
        let work = job.work;

        log::debug!(
            "dynamic dispatch of {} with grain {} (target {} blocks)",
            job.extent,
            grain,
            self.target_blocks()
        );

        let leaf = |block: Block| {
            let extent = block.to_extent();
            let piece = Piece {
                id: next_index.fetch_add(1, Ordering::Relaxed),
                extent,
                region: extent.with_axis(2, z0, z1),
            };
            let record = run_piece(&piece, work);
            records.lock().push(record);
        };

        {
            let _quiet = QuietDebug::engage(job.quiet);
            match &self.pool {
                Some(pool) => pool.install(|| subdivide(full, grain, &leaf)),
                None => subdivide(full, grain, &leaf),
            }
        }

        Ok(DispatchReport::new(
            Backend::DynamicBlocks,
            job.extent,
            records.into_inner(),
            start.elapsed(),
        ))
    }
}
