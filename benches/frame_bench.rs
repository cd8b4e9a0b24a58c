use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use impact_scene::*;
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

const DT: f32 = 1.0 / 60.0;

fn prepare_scene(object_count: usize, parallel: bool) -> Simulation {
    let mut sim = Simulation::default();
    sim.world_mut().set_parallel_enabled(parallel);
    sim.add_fixture(RigidBody::fixed(ShapeDescriptor::Plane));
    let mut rng = StdRng::seed_from_u64(1);
    while sim.registry().len() < object_count {
        let kind = if sim.registry().len() % 2 == 0 {
            SpawnKind::Sphere
        } else {
            SpawnKind::Box
        };
        let mut params = SpawnParams::randomized(kind, &mut rng);
        params.position.y += sim.registry().len() as f32 * 0.05;
        let _ = sim.spawn(params.to_request(kind));
    }
    sim
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    for &count in &[16usize, 64, 256] {
        for parallel in [false, true] {
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, count), &count, |b, &count| {
                let mut sim = prepare_scene(count, parallel);
                b.iter(|| black_box(sim.frame(black_box(DT))))
            });
        }
    }
    group.finish();
}

fn bench_spawn_teardown(c: &mut Criterion) {
    c.bench_function("spawn_teardown_cycle", |b| {
        let mut sim = Simulation::default();
        b.iter(|| {
            let handle = sim.spawn(SpawnRequest::new(ShapeDescriptor::sphere(0.5)));
            if let Ok(handle) = handle {
                black_box(sim.teardown(handle));
            }
        })
    });
}

criterion_group!(benches, bench_frame, bench_spawn_teardown);
criterion_main!(benches);
