use std::time::Duration;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use wexel_core::engine::yield_calc::{
    compute_boosted_apy, daily_reward, project_deposit, project_yield, BoostQuote, PayoutFrequency, ProjectionMarket,
};
use wexel_core::engine::{Amount, Pool};

#[inline]
fn usd(n: u128) -> Amount {
    Amount::from_base_units(n * 1_000_000)
}

fn bench_yield(c: &mut Criterion) {
    let mut g = c.benchmark_group("yield");
    g.warm_up_time(Duration::from_secs(2));
    g.measurement_time(Duration::from_secs(5));
    g.sample_size(300);
    g.throughput(Throughput::Elements(1));

    // (rótulo, base, boost, alvo)
    let cases: [(&str, u32, Amount, Amount); 4] = [
        ("no_boost", 1_800, Amount::ZERO, usd(300)),
        ("third", 1_800, usd(100), usd(300)),
        ("capped", 1_800, usd(9_000), usd(300)),
        ("whale", 840, usd(300_000_000), usd(900_000_000)),
    ];

    for (label, base, boost, target) in cases {
        g.bench_function(format!("boosted_apy_{label}"), |b| {
            b.iter(|| black_box(compute_boosted_apy(black_box(base), black_box(boost), black_box(target), 1_000)));
        });
    }

    g.bench_function("daily_reward", |b| {
        b.iter(|| black_box(daily_reward(black_box(usd(1_000_000)), black_box(1_980)).unwrap()));
    });

    g.bench_function("project_yield_quarterly_24m", |b| {
        b.iter(|| {
            let p = project_yield(black_box(usd(25_000)), black_box(1_800), PayoutFrequency::Quarterly, 24).unwrap();
            black_box(p);
        });
    });

    let pool = Pool::with_defaults(1, 1_800, 24, usd(100));
    let market = ProjectionMarket {
        takara_apr_bps: 3_000,
        takara_price_usd: Amount::from_base_units(100_000),
        max_boost_fraction_bps: 1_000,
        boost: Some(BoostQuote { price_usd: Amount::from_base_units(2_500), discount_bps: 1_500 }),
    };
    g.bench_function("project_deposit_boosted_24m", |b| {
        b.iter(|| {
            let p = project_deposit(black_box(usd(25_000)), &pool, PayoutFrequency::Quarterly, &market).unwrap();
            black_box(p);
        });
    });
    g.finish();
}

criterion_group!(benches, bench_yield);
criterion_main!(benches);
