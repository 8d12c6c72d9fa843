use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use matchpulse::pipeline::{EngineConfig, detect_all_sprints, run_match};
use matchpulse::signal::smooth_speed_signal;
use matchpulse::sprint::detect_sprints;
use matchpulse::synthetic::{SyntheticConfig, generate_match};

fn bench_config() -> SyntheticConfig {
    SyntheticConfig {
        players_per_team: 11,
        period_frames: 6_000,
        ..SyntheticConfig::default()
    }
}

fn bench_smoothing(c: &mut Criterion) {
    let inputs = generate_match(&bench_config());
    let cfg = EngineConfig::default();
    let mut samples: Vec<_> = inputs
        .tracking
        .iter()
        .filter(|s| s.player_id == 1 && s.period == 1)
        .cloned()
        .collect();
    samples.sort_by_key(|s| s.frame);

    c.bench_function("smooth_one_player_period", |b| {
        b.iter(|| {
            let speeds = smooth_speed_signal(black_box(&samples), &cfg.signal).unwrap();
            black_box(speeds.len());
        })
    });
}

fn bench_detection(c: &mut Criterion) {
    let inputs = generate_match(&bench_config());
    let cfg = EngineConfig::default();
    let mut samples: Vec<_> = inputs
        .tracking
        .iter()
        .filter(|s| s.player_id == 1 && s.period == 1)
        .cloned()
        .collect();
    samples.sort_by_key(|s| s.frame);
    let speeds = smooth_speed_signal(&samples, &cfg.signal).unwrap();

    c.bench_function("detect_one_player_period", |b| {
        b.iter(|| {
            let events = detect_sprints(
                black_box(&samples),
                black_box(&speeds),
                &cfg.sprint,
                cfg.signal.fps,
            );
            black_box(events.len());
        })
    });
}

fn bench_detect_all(c: &mut Criterion) {
    let inputs = generate_match(&bench_config());
    let cfg = EngineConfig::default();

    c.bench_function("detect_all_sprints", |b| {
        b.iter(|| {
            let events = detect_all_sprints(black_box(&inputs.tracking), &cfg);
            black_box(events.len());
        })
    });
}

fn bench_full_match(c: &mut Criterion) {
    let inputs = generate_match(&bench_config());
    let cfg = EngineConfig::default();

    c.bench_function("run_match", |b| {
        b.iter(|| {
            let metrics = run_match(black_box(&inputs), &cfg).unwrap();
            black_box(metrics.combined.len());
        })
    });
}

criterion_group!(
    perf,
    bench_smoothing,
    bench_detection,
    bench_detect_all,
    bench_full_match
);
criterion_main!(perf);
