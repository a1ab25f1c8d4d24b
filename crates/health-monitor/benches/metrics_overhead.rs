// Benchmark to measure metrics overhead on the probe result path
// Compare performance with metrics enabled vs disabled

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use health_monitor::{ControlPlane, CycleSummary, MetricsRegistry};
use probe::{HealthStatus, ProbeKind, ProbeOutcome, ProbeProtocol, Thresholds};
use service_registry::ServiceRegistration;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

fn bench_metrics_recording(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics_recording");

    // Typical recording pattern of one applied probe result
    let record = |metrics: &Option<Arc<MetricsRegistry>>| {
        if let Some(m) = metrics {
            m.record_probe(
                black_box("orders"),
                black_box(ProbeProtocol::Http),
                black_box(ProbeKind::Success),
                black_box(Duration::from_millis(10)),
            );
            m.update_instance(
                black_box("orders-1"),
                black_box("orders"),
                black_box(HealthStatus::Healthy),
                black_box(5),
                black_box(0),
            );
        }
    };

    group.bench_function("disabled", |b| {
        let metrics: Option<Arc<MetricsRegistry>> = None;
        b.iter(|| record(&metrics));
    });

    group.bench_function("enabled", |b| {
        let metrics = Some(Arc::new(MetricsRegistry::new()));
        b.iter(|| record(&metrics));
    });

    group.finish();
}

fn bench_individual_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("individual_operations");
    let registry = Arc::new(MetricsRegistry::new());

    group.bench_function("record_probe", |b| {
        b.iter(|| {
            registry.record_probe(
                black_box("orders"),
                black_box(ProbeProtocol::Tcp),
                black_box(ProbeKind::Timeout),
                black_box(Duration::from_millis(10)),
            );
        });
    });

    group.bench_function("record_transition", |b| {
        b.iter(|| {
            registry.record_transition(
                black_box("orders"),
                black_box(HealthStatus::Unhealthy),
                black_box(HealthStatus::Healthy),
            );
        });
    });

    group.bench_function("record_cycle", |b| {
        let summary = CycleSummary {
            instances: 100,
            dispatched: 100,
            applied: 98,
            discarded: 2,
            transitions: 3,
            duration: Duration::from_millis(250),
            cancelled: false,
        };
        b.iter(|| registry.record_cycle(black_box(&summary)));
    });

    group.bench_function("render", |b| {
        for id in 0..100 {
            registry.update_instance(&format!("orders-{id}"), "orders", HealthStatus::Healthy, 1, 0);
        }
        b.iter(|| black_box(registry.render()));
    });

    group.finish();
}

fn bench_apply_outcome(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_outcome");
    let outcome = ProbeOutcome::success(Duration::from_millis(10), "HTTP 200").with_status_code(200);

    for (name, metrics) in [
        ("disabled", None),
        ("enabled", Some(Arc::new(MetricsRegistry::new()))),
    ] {
        let control = ControlPlane::new(Thresholds::default(), metrics);

        // Spread results over many instances like a real cycle
        for num_instances in [1usize, 100] {
            let instances: Vec<_> = (0..num_instances)
                .filter_map(|id| {
                    control
                        .register(ServiceRegistration::new(
                            format!("{name}-{id}"),
                            "orders",
                            "10.0.0.5",
                            8080,
                            ProbeProtocol::Http,
                        ))
                        .ok()
                })
                .collect();

            group.bench_with_input(
                BenchmarkId::new(name, num_instances),
                &instances,
                |b, instances| {
                    b.iter(|| {
                        for instance in instances {
                            black_box(control.apply_outcome(instance, &outcome));
                        }
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_metrics_recording,
    bench_individual_operations,
    bench_apply_outcome
);
criterion_main!(benches);
