use chrono::{Duration, TimeZone, Utc};
use num_bigint::BigInt;
use num_rational::BigRational;
use proptest::prelude::*;

use wexel_core::engine::boost::{boost_target, BoostEngine};
use wexel_core::engine::lifecycle::{accrue, days_elapsed, open_deposit, term_days};
use wexel_core::engine::ports::PriceSource;
use wexel_core::engine::reference::{policy_boosted_apy, policy_daily_reward};
use wexel_core::engine::types::{Pool, PriceQuote};
use wexel_core::engine::yield_calc::{apy_cap_bps, compute_boosted_apy, daily_reward};
use wexel_core::engine::{Amount, EngineErrorCode, Result};

#[inline]
fn units(v: u128) -> Amount {
    Amount::from_base_units(v)
}

/// $1 fixo para qualquer mint.
struct Parity;

impl PriceSource for Parity {
    fn latest_price(&self, token_mint: &str) -> Result<PriceQuote> {
        Ok(PriceQuote {
            token_mint: token_mint.to_string(),
            price_usd: units(1_000_000),
            source: "manual".into(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        })
    }
}

fn pool(base_apy_bps: u32, boost_target_bps: u32) -> Pool {
    Pool { boost_target_bps, ..Pool::with_defaults(1, base_apy_bps, 12, Amount::ZERO) }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 2_000, .. ProptestConfig::default() })]

    #[test]
    fn daily_reward_never_overpays_the_year(
        p in 1u128..=1_000_000_000_000_000u128,
        apy in 0u32..=10_000u32,
    ) {
        let d = daily_reward(units(p), apy).unwrap().base_units();
        prop_assert!(d * 365 <= p * u128::from(apy) / 10_000, "365×{} > {}×{}/10000", d, p, apy);
        // exato: 365·d ≤ p·apy/10000 em racionais
        let lhs = BigRational::from_integer(BigInt::from(d * 365));
        let rhs = BigRational::new(BigInt::from(p * u128::from(apy)), BigInt::from(10_000u32));
        prop_assert!(lhs <= rhs);
    }

    #[test]
    fn boosted_apy_bounded_by_cap(
        base in 0u32..=10_000u32,
        boost in 0u128..=10_000_000_000_000u128,
        target in 1u128..=10_000_000_000_000u128,
        fraction in 0u32..=10_000u32,
    ) {
        let apy = compute_boosted_apy(base, units(boost), units(target), fraction);
        prop_assert!(apy >= base);
        prop_assert!(apy <= apy_cap_bps(base, fraction));
        // uplift padrão de 10%: nunca acima de base × 1.10 na grade de bps
        let apy10 = compute_boosted_apy(base, units(boost), units(target), 1_000);
        prop_assert!(u64::from(apy10) * 10 <= u64::from(base) * 11 + 5);
    }

    #[test]
    fn zero_target_passes_base_through(
        base in 0u32..=10_000u32,
        boost in 0u128..=u128::from(u64::MAX),
        fraction in 0u32..=10_000u32,
    ) {
        prop_assert_eq!(compute_boosted_apy(base, units(boost), Amount::ZERO, fraction), base);
    }

    #[test]
    fn core_matches_bigrational_reference(
        base in 0u32..=10_000u32,
        boost in 0u128..=1_000_000_000_000u128,
        target in 1u128..=1_000_000_000_000u128,
        fraction in 0u32..=10_000u32,
        p in 0u128..=1_000_000_000_000_000u128,
    ) {
        let core = compute_boosted_apy(base, units(boost), units(target), fraction);
        prop_assert_eq!(core, policy_boosted_apy(base, units(boost), units(target), fraction).unwrap());
        prop_assert_eq!(daily_reward(units(p), base).unwrap(), policy_daily_reward(units(p), base).unwrap());
    }

    #[test]
    fn boost_sequence_never_passes_target(
        principal_usd in 1u128..=1_000_000u128,
        target_bps in 0u32..=10_000u32,
        steps in prop::collection::vec(1u128..=500_000u128, 1..12),
    ) {
        let pool = pool(1_800, target_bps);
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut d = open_deposit(1, &pool, "w", units(principal_usd * 1_000_000), t0).unwrap();
        let engine = BoostEngine::new(Parity, 1_000);
        let target = boost_target(d.principal, &d.terms).unwrap();
        for usd in steps {
            match engine.apply_boost(&d, "USDC", units(usd * 1_000_000)) {
                Ok(next) => d = next,
                Err(e) => prop_assert_eq!(e.code, EngineErrorCode::BoostTargetExceeded),
            }
            prop_assert!(d.boost_value <= target);
            prop_assert!(d.effective_apy_bps <= apy_cap_bps(1_800, 1_000));
        }
        let recorded: u128 = d.boosts.iter().map(|b| b.value_usd.base_units()).sum();
        prop_assert_eq!(recorded, d.boost_value.base_units());
    }

    #[test]
    fn accrual_is_path_independent(
        principal in 1_000_000u128..=1_000_000_000_000u128,
        checkpoints in prop::collection::vec(0i64..=400, 0..8),
        last in 0i64..=400,
    ) {
        let pool = pool(1_800, 3_000);
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let fresh = open_deposit(1, &pool, "w", units(principal), t0).unwrap();

        let mut stepped = fresh.clone();
        let mut sorted = checkpoints;
        sorted.sort_unstable();
        for day in sorted.into_iter().filter(|d| *d <= last) {
            stepped = accrue(&stepped, t0 + Duration::days(day)).unwrap().0;
        }
        stepped = accrue(&stepped, t0 + Duration::days(last)).unwrap().0;
        let (once, _) = accrue(&fresh, t0 + Duration::days(last)).unwrap();

        prop_assert_eq!(stepped.accrued_rewards, once.accrued_rewards);
        prop_assert_eq!(stepped.last_accrued_day, once.last_accrued_day);
        // repetir o mesmo dia não credita nada
        let (_, again) = accrue(&once, t0 + Duration::days(last)).unwrap();
        prop_assert_eq!(again, Amount::ZERO);
    }

    #[test]
    fn accrual_equals_sum_of_rate_segments(
        principal_usd in 100u128..=1_000_000u128,
        ops in prop::collection::vec((0i64..=60, any::<bool>(), 1u128..=200_000u128), 1..16),
    ) {
        let pool = pool(1_800, 3_000);
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let principal = units(principal_usd * 1_000_000);
        let mut d = open_deposit(1, &pool, "w", principal, t0).unwrap();
        let engine = BoostEngine::new(Parity, 1_000);

        // (apy, dias) de cada trecho com taxa constante
        let mut segments: Vec<(u32, u64)> = Vec::new();
        let mut settled_day = 0u64;
        let mut apy = d.effective_apy_bps;
        let mut now = t0;
        for (gap, boost, usd) in ops {
            now += Duration::days(gap);
            let today = days_elapsed(&d, now);
            if boost {
                match engine.apply_boost_at(&d, "USDC", units(usd * 1_000_000), now) {
                    Ok(next) => {
                        segments.push((apy, today - settled_day));
                        settled_day = today;
                        prop_assert!(next.effective_apy_bps >= apy);
                        apy = next.effective_apy_bps;
                        d = next;
                    }
                    Err(e) => prop_assert_eq!(e.code, EngineErrorCode::BoostTargetExceeded),
                }
            } else {
                d = accrue(&d, now).unwrap().0;
                segments.push((apy, today - settled_day));
                settled_day = today;
            }
            prop_assert_eq!(d.effective_apy_bps, apy);
        }
        let end = t0 + Duration::days(400);
        d = accrue(&d, end).unwrap().0;
        segments.push((apy, term_days(&d) - settled_day));

        let expected: u128 = segments
            .iter()
            .map(|&(rate, days)| daily_reward(principal, rate).unwrap().base_units() * u128::from(days))
            .sum();
        prop_assert_eq!(d.accrued_rewards.base_units(), expected);
        prop_assert_eq!(d.last_accrued_day, term_days(&d));
    }
}
