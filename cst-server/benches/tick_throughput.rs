use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cst_core::config::SimulationConfig;
use cst_core::ingress::{FullFrame, IngressEvent};
use cst_core::mode::{ModeOptions, OperatingMode};
use cst_core::model::SensorSnapshot;
use cst_server::controller::ModeController;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn bench_simulation_tick(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let mut controller = ModeController::new(SimulationConfig::default());
    controller.enter(OperatingMode::Simulation, ModeOptions::default());
    let mut snapshot = Arc::new(SensorSnapshot::at_rest());

    c.bench_function("simulation_tick_and_publish", |b| {
        b.iter(|| {
            let updates = controller.tick(&mut rng);
            snapshot = Arc::new(snapshot.with_updates(black_box(updates)));
        });
    });
}

fn bench_hybrid_frame(c: &mut Criterion) {
    let mut controller = ModeController::new(SimulationConfig::default());
    controller.enter(OperatingMode::Normal, ModeOptions::default());
    let snapshot = SensorSnapshot::at_rest();
    let event = IngressEvent::Full(FullFrame::default());

    c.bench_function("hybrid_full_frame", |b| {
        b.iter(|| {
            let updates = controller.on_frame(black_box(&event));
            black_box(snapshot.with_updates(updates));
        });
    });
}

fn bench_snapshot_json(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let mut controller = ModeController::new(SimulationConfig::default());
    controller.enter(OperatingMode::Simulation, ModeOptions::default());
    let snapshot = SensorSnapshot::at_rest().with_updates(controller.tick(&mut rng));

    c.bench_function("snapshot_json", |b| {
        b.iter(|| black_box(snapshot.to_json_filtered(None)));
    });
}

criterion_group!(
    benches,
    bench_simulation_tick,
    bench_hybrid_frame,
    bench_snapshot_json
);
criterion_main!(benches);
