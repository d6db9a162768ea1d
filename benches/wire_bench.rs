//! Benchmarks for the wire-frame parser and correlation scan.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use skew_engine::config::EngineConfig;
use skew_engine::correlator::correlate;
use skew_engine::spot::Spot;
use skew_engine::window::SpotWindow;
use skew_engine::wire::parse_frame;

const SAMPLE_FRAMES: &[&str] = &[
    "14020.00|AA1A|W6JSV-#|CQ|14020|20|25|CW|1|1700000000000|1700000000500|extra",
    "7018.30|RW1M|EA5WU-#|CQ|7018|19|18|CW|1|1700000000000|1700000000500|extra",
    "14100.00|CS3B|KM3T-2-#|CQ|14100|24|22|CW|1|1700000000000|1700000000500|extra",
    "28169.90|VA3XCD|K9LC-#|DX|28169|9|10|CW|1|1700000000000|1700000000500|extra",
];

fn bench_parse_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_frame");

    group.throughput(Throughput::Elements(1));
    group.bench_function("single", |b| {
        b.iter(|| parse_frame(black_box(SAMPLE_FRAMES[0])))
    });

    group.throughput(Throughput::Elements(SAMPLE_FRAMES.len() as u64));
    group.bench_function("batch", |b| {
        b.iter(|| {
            for frame in SAMPLE_FRAMES {
                let _ = parse_frame(black_box(frame));
            }
        })
    });

    group.finish();
}

fn bench_correlate(c: &mut Criterion) {
    let config = EngineConfig::default();

    let mut window = SpotWindow::new(1000);
    for i in 0..900 {
        window.insert(Spot {
            de: format!("SK{i}"),
            dx: "AA1A".to_string(),
            time: 1000 + i as i64,
            snr: 20,
            freq: 14020.0 + (i as f64) * 0.0001,
            reference: false,
            analyzed: false,
        });
    }
    let reference = Spot {
        de: "W1REF".to_string(),
        dx: "AA1A".to_string(),
        time: 1500,
        snr: 20,
        freq: 14020.0,
        reference: true,
        analyzed: false,
    };

    let mut group = c.benchmark_group("correlate");
    group.throughput(Throughput::Elements(900));
    group.bench_function("scan_900", |b| {
        b.iter(|| {
            let mut w = SpotWindow::new(1000);
            for i in 0..900 {
                w.insert(Spot {
                    de: format!("SK{i}"),
                    dx: "AA1A".to_string(),
                    time: 1000 + i as i64,
                    snr: 20,
                    freq: 14020.0 + (i as f64) * 0.0001,
                    reference: false,
                    analyzed: false,
                });
            }
            black_box(correlate(&mut w, &reference, &config))
        })
    });
    group.finish();

    let _ = window;
}

criterion_group!(benches, bench_parse_frame, bench_correlate);
criterion_main!(benches);
