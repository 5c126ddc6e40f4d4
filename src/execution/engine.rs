//! Dispatch engine implementation.
//!
//! The engine is the single synchronous entry point: it resolves the extent
//! to process, packages the caller's buffers, picks a backend from the
//! configuration, waits for every piece, and hands back a report.

use crate::core::context::{InvocationPackage, Piece, PieceContext};
use crate::core::error::{DispatchError, DispatchResult, OperationResult};
use crate::core::extent::Extent;
use crate::core::operation::{OperationSplitter, ThreadedOperation};
use crate::core::volume::Volume;
use crate::dispatch::{
    DispatchReport, Dispatcher, DynamicBlockDispatcher, FixedPoolDispatcher, Job,
    SequentialDispatcher,
};
use crate::execution::config::{Backend, DispatchConfig};
use log::debug;
use parking_lot::Mutex;
use rayon::ThreadPool;
use std::sync::Arc;

/// Pick the extent to process from the ports.
///
/// The first output port wins; without outputs the first input port with a
/// connection is used.
pub fn resolve_extent<I, O>(
    inputs: &[Vec<&Volume<I>>],
    outputs: &[&mut Volume<O>],
) -> DispatchResult<Extent> {
    if let Some(output) = outputs.first() {
        return Ok(output.extent());
    }
    inputs
        .iter()
        .find_map(|connections| connections.first())
        .map(|volume| volume.extent())
        .ok_or(DispatchError::NoWorkExtent)
}

/// Runs threaded operations over extents.
pub struct DispatchEngine {
    /// Dedicated rayon pool, reused while the requested size stays the same.
    pool: Mutex<Option<Arc<ThreadPool>>>,
}

impl DispatchEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self {
            pool: Mutex::new(None),
        }
    }

    /// Process the extent resolved from the ports.
    pub fn execute<I, O>(
        &self,
        inputs: &[Vec<&Volume<I>>],
        outputs: &mut [&mut Volume<O>],
        op: &dyn ThreadedOperation<I, O>,
        config: &DispatchConfig,
    ) -> DispatchResult<DispatchReport>
    where
        I: Sync,
        O: Send,
    {
        let extent = resolve_extent(inputs, outputs)?;
        self.execute_with_extent(inputs, outputs, extent, op, config)
    }

    /// Process an explicitly requested extent.
    ///
    /// Every output volume must contain `requested`.
    pub fn execute_with_extent<I, O>(
        &self,
        inputs: &[Vec<&Volume<I>>],
        outputs: &mut [&mut Volume<O>],
        requested: Extent,
        op: &dyn ThreadedOperation<I, O>,
        config: &DispatchConfig,
    ) -> DispatchResult<DispatchReport>
    where
        I: Sync,
        O: Send,
    {
        config.validate()?;
        for (port, output) in outputs.iter().enumerate() {
            if !output.extent().contains_extent(&requested) {
                return Err(DispatchError::ExtentMismatch {
                    port,
                    requested,
                    available: output.extent(),
                });
            }
        }
        if config.backend == Backend::DynamicBlocks
            && !requested.is_empty()
            && requested.axis(2) != (0, 0)
            && !op.rederives_slices()
        {
            return Err(DispatchError::SliceCollapse {
                extent: requested,
                slices: requested.len(2),
            });
        }

        let dispatcher = self.dispatcher_for(config)?;
        debug!(
            "{} '{}' over {} with {:?}",
            dispatcher.name(),
            op.name(),
            requested,
            config
        );

        let package = InvocationPackage::new(inputs, outputs, requested);
        let splitter = OperationSplitter(op);
        let work = |piece: &Piece| -> OperationResult<()> {
            let mut ctx = PieceContext::new(&package, *piece);
            op.threaded_execute(&mut ctx)
        };
        let job = Job {
            extent: requested,
            splitter: &splitter,
            work: &work,
            quiet: config.quiet_workers,
        };

        let report = dispatcher.dispatch(&job)?;
        drop(package);

        debug!("{}", report.summary());
        Ok(report)
    }

    fn dispatcher_for(&self, config: &DispatchConfig) -> DispatchResult<Box<dyn Dispatcher>> {
        Ok(match config.backend {
            Backend::FixedPool => Box::new(FixedPoolDispatcher::new(config.worker_count)),
            Backend::Sequential => Box::new(SequentialDispatcher::new(config.worker_count)),
            Backend::DynamicBlocks => {
                let dispatcher = DynamicBlockDispatcher::new(config.block_hint);
                if config.worker_count == rayon::current_num_threads() {
                    Box::new(dispatcher)
                } else {
                    Box::new(dispatcher.with_pool(self.pool_with(config.worker_count)?))
                }
            }
        })
    }

    fn pool_with(&self, threads: usize) -> DispatchResult<Arc<ThreadPool>> {
        let mut cached = self.pool.lock();
        if let Some(pool) = cached.as_ref() {
            if pool.current_num_threads() == threads {
                return Ok(pool.clone());
            }
        }
        debug!("building dynamic dispatch pool with {} threads", threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("extent-block-{}", i))
            .build()
            .map_err(|e| DispatchError::ThreadPool(e.to_string()))?;
        let pool = Arc::new(pool);
        *cached = Some(pool.clone());
        Ok(pool)
    }
}

impl Default for DispatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::OperationError;
    use crate::core::operation::{FnOperation, UnimplementedOperation};
    use crate::dispatch::PieceOutcome;

    fn cell_value([x, y, z]: [i32; 3]) -> u32 {
        (x as u32).wrapping_mul(73_856_093) ^ (y as u32).wrapping_mul(19_349_663) ^ (z as u32).wrapping_mul(83_492_791)
    }

    const NO_INPUTS: &[Vec<&Volume<u8>>] = &[];

    fn fill_op() -> Box<dyn ThreadedOperation<u8, u32>> {
        Box::new(FnOperation::new("fill", |ctx: &mut PieceContext<'_, u8, u32>| {
            ctx.output(0)?.fill_with(cell_value)
        }))
    }

    #[test]
    fn test_fixed_pool_matches_sequential_pass() {
        let extent = Extent::new([0, 40, -5, 30, 0, 6]);
        let engine = DispatchEngine::new();
        let op = fill_op();

        let mut parallel = Volume::new(extent, 0u32);
        let config = DispatchConfig::new().with_worker_count(8);
        let report = engine.execute(NO_INPUTS, &mut [&mut parallel], op.as_ref(), &config).unwrap();
        assert!(report.is_success());
        assert_eq!(report.backend, Backend::FixedPool);
        assert_eq!(report.pieces.len(), 8);
        assert_eq!(report.processed_cells(), extent.cell_count());

        let sequential = Volume::from_fn(extent, cell_value);
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_every_cell_written_exactly_once() {
        let extent = Extent::new([0, 19, 0, 9, 0, 4]);
        let engine = DispatchEngine::new();
        let op = FnOperation::new("count", |ctx: &mut PieceContext<'_, u8, u32>| {
            let region = ctx.region();
            let mut out = ctx.output(0)?;
            for index in region.indices() {
                let seen = out.get(index)?;
                out.set(index, seen + 1)?;
            }
            Ok(())
        });

        for backend in [Backend::FixedPool, Backend::Sequential] {
            let mut counts = Volume::new(extent, 0u32);
            let config = DispatchConfig::new().with_backend(backend).with_worker_count(8);
            engine.execute(NO_INPUTS, &mut [&mut counts], &op, &config).unwrap();
            assert!(counts.as_slice().iter().all(|&c| c == 1), "{:?}", backend);
        }
    }

    #[test]
    fn test_dynamic_blocks_on_single_slice() {
        let extent = Extent::plane(0, 99, 0, 49);
        let engine = DispatchEngine::new();
        let op = fill_op();
        let mut out = Volume::new(extent, 0u32);
        let config = DispatchConfig::new()
            .with_backend(Backend::DynamicBlocks)
            .with_worker_count(rayon::current_num_threads())
            .with_block_hint(30);

        let report = engine.execute(NO_INPUTS, &mut [&mut out], op.as_ref(), &config).unwrap();
        assert!(report.is_success());
        assert_eq!(report.processed_cells(), extent.cell_count());
        assert_eq!(out, Volume::from_fn(extent, cell_value));
    }

    #[test]
    fn test_dynamic_rejects_multi_slice_extent() {
        let extent = Extent::new([0, 9, 0, 9, 3, 7]);
        let engine = DispatchEngine::new();
        let mut out = Volume::new(extent, 0u32);
        let config = DispatchConfig::new().with_backend(Backend::DynamicBlocks);

        let result = engine.execute(NO_INPUTS, &mut [&mut out], fill_op().as_ref(), &config);
        match result {
            Err(DispatchError::SliceCollapse { extent: e, slices }) => {
                assert_eq!(e, extent);
                assert_eq!(slices, 5);
            }
            other => panic!("expected SliceCollapse, got {:?}", other),
        }
        assert!(out.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_dynamic_with_rederived_slices() {
        let extent = Extent::new([0, 15, 0, 11, 3, 7]);
        let engine = DispatchEngine::new();
        let op = FnOperation::new("slices", |ctx: &mut PieceContext<'_, u8, u32>| {
            let (z0, z1) = ctx.slice_range();
            let block = ctx.extent();
            let mut out = ctx.output(0)?;
            for z in z0..=z1 {
                for [x, y, _] in block.indices() {
                    out.set([x, y, z], cell_value([x, y, z]))?;
                }
            }
            Ok(())
        })
        .rederiving_slices();

        let mut out = Volume::new(extent, 0u32);
        let config = DispatchConfig::new()
            .with_backend(Backend::DynamicBlocks)
            .with_worker_count(2)
            .with_block_hint(6);
        let report = engine.execute(NO_INPUTS, &mut [&mut out], &op, &config).unwrap();
        assert!(report.is_success());
        assert_eq!(report.processed_cells(), extent.cell_count());
        assert!(report.pieces.iter().all(|r| r.extent.axis(2) == (0, 0) && r.region.axis(2) == (3, 7)));
        assert_eq!(out, Volume::from_fn(extent, cell_value));
    }

    #[test]
    fn test_extent_from_first_connected_input() {
        let engine = DispatchEngine::new();
        let input = Volume::new(Extent::plane(0, 7, 0, 7), 1u8);
        let seen = Mutex::new(Vec::new());
        let op = FnOperation::new("sink", |ctx: &mut PieceContext<'_, u8, u32>| {
            seen.lock().push(ctx.full_extent());
            assert_eq!(ctx.input(1, 0)?.extent(), Extent::plane(0, 7, 0, 7));
            Ok(())
        });

        let inputs = vec![vec![], vec![&input]];
        let mut outputs: [&mut Volume<u32>; 0] = [];
        let config = DispatchConfig::new().with_worker_count(2);
        let report = engine.execute(&inputs, &mut outputs, &op, &config).unwrap();
        assert!(report.is_success());
        drop(op);
        assert!(seen.into_inner().iter().all(|&e| e == Extent::plane(0, 7, 0, 7)));
    }

    #[test]
    fn test_no_work_extent() {
        let engine = DispatchEngine::new();
        let inputs: Vec<Vec<&Volume<u8>>> = vec![vec![], vec![]];
        let mut outputs: [&mut Volume<u32>; 0] = [];
        let result = engine.execute(&inputs, &mut outputs, fill_op().as_ref(), &DispatchConfig::new());
        assert!(matches!(result, Err(DispatchError::NoWorkExtent)));
    }

    #[test]
    fn test_unimplemented_operation_is_reported() {
        let engine = DispatchEngine::new();
        let mut out = Volume::new(Extent::plane(0, 9, 0, 9), 0u32);
        let config = DispatchConfig::new().with_worker_count(2);

        let report = engine
            .execute::<u8, u32>(&[], &mut [&mut out], &UnimplementedOperation, &config)
            .unwrap();
        assert_eq!(report.failures().len(), 2);
        assert!(report.pieces.iter().all(|r| matches!(
            r.outcome,
            PieceOutcome::Failed(OperationError::NotImplemented { .. })
        )));
        assert!(matches!(
            report.into_result(),
            Err(DispatchError::PartialFailure { failed: 2, total: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_dispatch() {
        let engine = DispatchEngine::new();
        let mut out = Volume::new(Extent::plane(0, 9, 0, 9), 0u32);
        let config = DispatchConfig::new().with_worker_count(0);
        let result = engine.execute(NO_INPUTS, &mut [&mut out], fill_op().as_ref(), &config);
        assert!(matches!(result, Err(DispatchError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_requested_extent_must_fit_outputs() {
        let engine = DispatchEngine::new();
        let mut out = Volume::new(Extent::plane(0, 9, 0, 9), 0u32);
        let config = DispatchConfig::new().with_worker_count(2);

        let result = engine.execute_with_extent(
            NO_INPUTS,
            &mut [&mut out],
            Extent::plane(0, 10, 0, 9),
            fill_op().as_ref(),
            &config,
        );
        assert!(matches!(result, Err(DispatchError::ExtentMismatch { port: 0, .. })));

        let report = engine
            .execute_with_extent(NO_INPUTS, &mut [&mut out], Extent::plane(2, 4, 2, 4), fill_op().as_ref(), &config)
            .unwrap();
        assert_eq!(report.processed_cells(), 9);
        assert_eq!(out.get([3, 3, 0]), Some(&cell_value([3, 3, 0])));
        assert_eq!(out.get([5, 5, 0]), Some(&0));
    }

    #[test]
    fn test_pool_is_reused() {
        let engine = DispatchEngine::new();
        let first = engine.pool_with(3).unwrap();
        let second = engine.pool_with(3).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let third = engine.pool_with(2).unwrap();
        assert_eq!(third.current_num_threads(), 2);
    }
}
