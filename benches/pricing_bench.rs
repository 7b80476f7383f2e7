use alloy_primitives::U256;
use criterion::{Criterion, criterion_group, criterion_main};
use lazy_static::lazy_static;
use smardex_sync::{CurveKind, VenueCurve, VenueState};
use std::hint::black_box;

const NOW: u64 = 1_700_000_000;

lazy_static! {
    static ref AT_AVERAGE: VenueState = VenueState {
        reserve0: U256::from(1_000_000_000_000_000_000u128),
        reserve1: U256::from(2_000_000_000_000_000_000u128),
        fictive_reserve0: U256::from(500_000_000_000_000_000u128),
        fictive_reserve1: U256::from(1_000_000_000_000_000_000u128),
        price_average0: U256::from(500_000_000_000_000_000u128),
        price_average1: U256::from(1_000_000_000_000_000_000u128),
        price_average_last_timestamp: U256::from(NOW),
        fees_lp: U256::from(700),
        fees_pool: U256::from(200),
    };
    static ref OFF_AVERAGE: VenueState = VenueState {
        price_average1: U256::from(800_000_000_000_000_000u128),
        price_average_last_timestamp: U256::from(NOW - 120),
        ..AT_AVERAGE.clone()
    };
}

fn quote_volume(state: &VenueState, side_is_sell: bool) -> usize {
    let curve = CurveKind::FictiveReserve;
    (1..=100u64)
        .filter_map(|step| {
            let amount = U256::from(step) * U256::from(1_000_000_000_000_000u64);
            if side_is_sell {
                curve.quote_given_input(state, amount, true, NOW)
            } else {
                curve.quote_given_output(state, amount, false, NOW)
            }
        })
        .count()
}

fn benchmark_pricing_group(c: &mut Criterion) {
    let mut group = c.benchmark_group("pricing");

    group.bench_function("sell_100_amounts_at_average", |b| b.iter(|| quote_volume(black_box(&AT_AVERAGE), true)));
    group.bench_function("sell_100_amounts_two_legs", |b| b.iter(|| quote_volume(black_box(&OFF_AVERAGE), true)));
    group.bench_function("buy_100_amounts_two_legs", |b| b.iter(|| quote_volume(black_box(&OFF_AVERAGE), false)));
    group.finish();
}

criterion_group!(benches, benchmark_pricing_group);
criterion_main!(benches);
