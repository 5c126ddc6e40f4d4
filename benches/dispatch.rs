//! Backend comparison benchmarks.
//!
//! Run: `cargo bench -- dispatch`
//!
//! Inverts a single-slice volume with each backend so the cost of thread
//! spawning, block bisection and region checks can be compared directly.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use extent_dispatch::prelude::*;

fn invert_op() -> impl ThreadedOperation<u8, u8> {
    FnOperation::new("invert", |ctx: &mut PieceContext<'_, u8, u8>| {
        let input = ctx.first_input()?;
        let mut out = ctx.output(0)?;
        out.fill_with(|index| 255 - input.get(index).copied().unwrap_or(0))
    })
}

fn bench_backends(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch/invert");
    let engine = DispatchEngine::new();
    let op = invert_op();
    let workers = rayon::current_num_threads();

    for side in [128usize, 512, 1024] {
        let extent = Extent::from_dimensions([side, side, 1]);
        let input = Volume::from_fn(extent, |[x, y, _]| (x ^ y) as u8);
        let mut output = Volume::new(extent, 0u8);
        group.throughput(Throughput::Elements(extent.cell_count() as u64));

        for backend in [Backend::Sequential, Backend::FixedPool, Backend::DynamicBlocks] {
            let config = DispatchConfig::new()
                .with_backend(backend)
                .with_worker_count(workers);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", backend), side),
                &config,
                |b, config| {
                    b.iter(|| {
                        let report = engine
                            .execute(&[vec![&input]], &mut [&mut output], &op, config)
                            .unwrap();
                        std::hint::black_box(report.completed())
                    })
                },
            );
        }
    }

    group.finish();
}

/// Split cost alone, without any threads.
fn bench_split(c: &mut Criterion) {
    let full = Extent::new([0, 4095, 0, 4095, 0, 255]);
    c.bench_function("split/256_pieces", |b| {
        b.iter(|| {
            (0..256)
                .map(|piece| split_extent(std::hint::black_box(&full), piece, 256).extent.cell_count())
                .sum::<usize>()
        })
    });
}

criterion_group!(benches, bench_backends, bench_split);
criterion_main!(benches);
