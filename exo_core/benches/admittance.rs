use criterion::{Criterion, black_box, criterion_group, criterion_main};
use exo_core::{AdmittanceGains, Reference, TorqueFilter, desired_velocity};
use exo_traits::JointState;

fn bench_tick_math(c: &mut Criterion) {
    let gains = AdmittanceGains::default();
    let state = JointState {
        position: 0.12,
        velocity: -0.3,
        current: 1.1,
    };

    c.bench_function("desired_velocity", |b| {
        b.iter(|| {
            desired_velocity(
                black_box(4.2),
                black_box(&state),
                Reference::default(),
                black_box(&gains),
                0.001,
            )
        })
    });

    c.bench_function("filter_update", |b| {
        let mut filter = TorqueFilter::new();
        filter.update(1.0, 0.1);
        b.iter(|| filter.update(black_box(2.5), black_box(0.1)))
    });
}

criterion_group!(benches, bench_tick_math);
criterion_main!(benches);
