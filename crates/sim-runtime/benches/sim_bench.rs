use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_core::SimConfig;
use sim_runtime::{run_days_in_place, MarketEngine};

fn bench_ticks(c: &mut Criterion) {
    let mut engine = MarketEngine::new(SimConfig::rent_squeeze()).unwrap();
    c.bench_function("market_tick", |b| {
        b.iter(|| {
            let _ = run_days_in_place(&mut engine, 1);
        })
    });
}

fn bench_year(c: &mut Criterion) {
    c.bench_function("festival 365 days", |b| {
        b.iter(|| {
            let mut engine = MarketEngine::new(SimConfig::festival()).unwrap();
            let _ = black_box(run_days_in_place(&mut engine, 365));
            black_box(engine.snapshot())
        })
    });
}

criterion_group!(benches, bench_ticks, bench_year);
criterion_main!(benches);
