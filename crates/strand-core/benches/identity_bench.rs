//! # Identity Benchmarks
//!
//! Performance benchmarks for identifier generation and cost evaluation.
//!
//! Run with: `cargo bench -p strand-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use strand_core::variables::Position2D;
use strand_core::{
    AbsoluteConstraint, Constraint, Graph, IdGenerator, Identifier, MemoryGraph, Position2DStamped,
    RelativeConstraint, Timestamp, Variable, device_id, generate_stamped,
};

const UNIT: [f64; 4] = [1.0, 0.0, 0.0, 1.0];

/// Build a chain of N stamped positions joined by odometry constraints.
fn create_chain(size: i64) -> MemoryGraph {
    let ids = IdGenerator::seeded(0);
    let mut graph = MemoryGraph::new();
    let mut previous: Option<Identifier> = None;

    for secs in 0..size {
        let variable =
            Position2DStamped::with_values(Timestamp::new(secs, 0), Identifier::NIL, [0.0, 0.0]);
        let id = variable.identifier();
        graph.add_variable(Box::new(variable));
        if let Some(from) = previous {
            let odometry =
                RelativeConstraint::<Position2D, 2>::new(&ids, from, id, [1.0, 0.0], &UNIT)
                    .expect("odometry");
            graph.add_constraint(Box::new(odometry)).expect("add");
        }
        previous = Some(id);
    }

    graph
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_identity(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity");
    let device = device_id("bench");

    group.bench_function("stamped", |b| {
        let mut secs = 0i64;
        b.iter(|| {
            secs += 1;
            black_box(generate_stamped(
                "strand::Position2DStamped",
                Timestamp::new(secs, 0),
                device,
            ))
        });
    });

    group.bench_function("random_seeded", |b| {
        let ids = IdGenerator::seeded(7);
        b.iter(|| black_box(ids.random()));
    });

    group.bench_function("random_os", |b| {
        let ids = IdGenerator::default();
        b.iter(|| black_box(ids.random()));
    });

    group.finish();
}

fn bench_cost_evaluation(c: &mut Criterion) {
    let ids = IdGenerator::seeded(1);
    let prior = AbsoluteConstraint::<Position2D, 2>::new(
        &ids,
        ids.random(),
        [1.0, 2.0],
        &[2.0, 0.5, 0.5, 1.0],
    )
    .expect("prior");

    c.bench_function("prior_residual_and_jacobian", |b| {
        let cost = prior.cost_function();
        let mut residuals = [0.0; 2];
        let mut jacobian = [0.0; 4];
        let parameters: [&[f64]; 1] = [&[0.5, 0.5]];
        b.iter(|| {
            let mut blocks = [Some(&mut jacobian[..])];
            let ok = cost.evaluate(black_box(&parameters), &mut residuals, Some(&mut blocks));
            black_box(ok)
        });
    });
}

fn bench_graph_cost(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_cost");

    for size in [10i64, 100, 1000].iter() {
        let graph = create_chain(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &graph, |b, graph| {
            b.iter(|| black_box(graph.evaluate_cost()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_identity,
    bench_cost_evaluation,
    bench_graph_cost
);
criterion_main!(benches);
