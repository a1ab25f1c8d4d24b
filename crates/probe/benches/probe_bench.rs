use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use probe::{
    HealthTracker, HttpProber, InstanceHealthState, ProbeKind, ProbeOutcome, ProbeProtocol,
    ProbeTarget, Prober, TcpProber, Thresholds, advance,
};
use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

fn refused_target(protocol: ProbeProtocol) -> ProbeTarget {
    ProbeTarget::from_instance("bench-1", "127.0.0.1", 1, protocol, |_| None)
}

fn tcp_probe_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tcp_probe");

    // Nothing listens on port 1 (measures failure path)
    let prober = TcpProber::new(Duration::from_millis(100));
    let target = refused_target(ProbeProtocol::Tcp);

    group.bench_function("tcp_connection_refused", |b| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        b.iter(|| rt.block_on(async { black_box(prober.probe(&target).await) }));
    });

    group.finish();
}

fn http_probe_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("http_probe");

    let prober = HttpProber::new(Duration::from_millis(100), &[]).unwrap();
    let target = refused_target(ProbeProtocol::Http);

    group.bench_function("http_connection_error", |b| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        b.iter(|| rt.block_on(async { black_box(prober.probe(&target).await) }));
    });

    group.finish();
}

fn state_machine_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_machine");
    let thresholds = Thresholds::default();
    let ok = ProbeOutcome::success(Duration::from_millis(1), "HTTP 200");
    let fail = ProbeOutcome::failure(ProbeKind::ProtocolError, Duration::from_millis(1), "HTTP 500");

    group.bench_function("advance", |b| {
        let state = InstanceHealthState::default();
        b.iter(|| {
            black_box(advance(
                black_box(&state),
                black_box(&fail),
                ProbeProtocol::Http,
                thresholds,
                SystemTime::now(),
            ))
        });
    });

    for count in [10usize, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("tracker_record", count), count, |b, &count| {
            let tracker = HealthTracker::new(thresholds);
            let ids: Vec<String> = (0..count).map(|i| format!("instance-{}", i)).collect();
            b.iter(|| {
                for (i, id) in ids.iter().enumerate() {
                    let outcome = if i % 2 == 0 { &ok } else { &fail };
                    black_box(tracker.record(id, outcome, ProbeProtocol::Http));
                }
            });
        });
    }

    group.finish();
}

fn concurrent_probes_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_probes");
    group.sample_size(10); // Concurrent tests are expensive

    for count in [1, 10, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let prober = Arc::new(TcpProber::new(Duration::from_millis(100)));
            b.iter(|| {
                let prober = prober.clone();
                rt.block_on(async move {
                    let mut handles = vec![];

                    for _ in 0..count {
                        let prober = prober.clone();
                        handles.push(tokio::spawn(async move {
                            prober.probe(&refused_target(ProbeProtocol::Tcp)).await
                        }));
                    }

                    for handle in handles {
                        black_box(handle.await.unwrap());
                    }
                })
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    tcp_probe_benchmark,
    http_probe_benchmark,
    state_machine_benchmark,
    concurrent_probes_benchmark,
);

criterion_main!(benches);
