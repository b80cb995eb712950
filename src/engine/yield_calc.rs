//! Cálculo de yield: APY com boost, recompensa diária e projeções.
//! Políticas de arredondamento:
//! - APY com boost: 2 casas de percentual (= bps inteiros), *half away from zero*
//! - recompensas e projeções: **floor** na unidade base (nunca distribui a mais)

use serde::{Deserialize, Serialize};

use super::amount::Amount;
use super::boost::{boost_requirement, BoostRequirement};
use super::error::Result;
use super::error_catalog::EngineErrorCode;
use super::guardrails::{div_round_half_away_u256, ensure_nonzero, mul_div_floor, to_u128_checked};
use super::types::{Bps, Pool, BPS_SCALE, DAYS_PER_YEAR, U256};
use crate::engine_err;

const MONTHS_PER_YEAR: u32 = 12;

#[inline]
fn bps_from_u256(v: U256) -> Result<Bps> {
    let wide = to_u128_checked(v)?;
    Bps::try_from(wide).map_err(|_| engine_err!(EngineErrorCode::Overflow, detalhe => "bps"))
}

/// APY efetivo: `base × (1 + min(boost/target, 1) × max_boost_fraction)`.
///
/// `target == 0` devolve `base_apy_bps` intacto (pool sem boost possível).
/// Intermediários em U256, logo não falha para entradas válidas.
pub fn compute_boosted_apy(
    base_apy_bps: Bps,
    boost_amount: Amount,
    target_amount: Amount,
    max_boost_fraction_bps: Bps,
) -> Bps {
    if target_amount.is_zero() || base_apy_bps == 0 {
        return base_apy_bps;
    }
    let t = U256::from(target_amount.base_units());
    let b = U256::from(boost_amount.min(target_amount).base_units());
    let scale = U256::from(BPS_SCALE);

    // base * (scale*t + b*f) / (scale*t)
    let num = U256::from(base_apy_bps) * (scale * t + b * U256::from(max_boost_fraction_bps));
    let den = scale * t;
    match div_round_half_away_u256(num, den).and_then(bps_from_u256) {
        Ok(v) => v,
        // den > 0 e o resultado é limitado por base*(1+f) < 2^64
        Err(_) => apy_cap_bps(base_apy_bps, max_boost_fraction_bps),
    }
}

/// Teto do APY com boost total, na mesma grade de bps de [`compute_boosted_apy`].
pub fn apy_cap_bps(base_apy_bps: Bps, max_boost_fraction_bps: Bps) -> Bps {
    let num = U256::from(base_apy_bps) * U256::from(u64::from(BPS_SCALE) + u64::from(max_boost_fraction_bps));
    div_round_half_away_u256(num, U256::from(BPS_SCALE))
        .and_then(bps_from_u256)
        .unwrap_or(Bps::MAX)
}

/// `floor(principal × apy_bps / (365 × 10_000))`.
pub fn daily_reward(principal: Amount, apy_bps: Bps) -> Result<Amount> {
    let den = u128::from(DAYS_PER_YEAR) * u128::from(BPS_SCALE);
    mul_div_floor(principal.base_units(), u128::from(apy_bps), den).map(Amount::from_base_units)
}

/// Recompensa acumulada em `days` dias: `daily_reward × days`.
pub fn accrued_rewards(principal: Amount, apy_bps: Bps, days: u64) -> Result<Amount> {
    daily_reward(principal, apy_bps)?.checked_mul_u64(days)
}

/// Percentual decimal ("8.4", "12.345") → bps com floor: `floor(pct × 100)`.
pub fn apy_bps_from_percent(percent: &str) -> Result<Bps> {
    let raw = percent.trim();
    let invalid = || engine_err!(EngineErrorCode::InvalidArgument, campo => "apy", valor => raw);
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((raw, ""));
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !digits(int_part) || !digits(frac_part) {
        return Err(invalid());
    }
    let whole: u64 = if int_part.is_empty() { 0 } else { int_part.parse().map_err(|_| invalid())? };
    // só as duas primeiras casas contam (floor)
    let mut cents = 0u64;
    for (i, c) in frac_part.chars().take(2).enumerate() {
        let d = u64::from(c as u8 - b'0');
        cents += if i == 0 { d * 10 } else { d };
    }
    let bps = whole
        .checked_mul(100)
        .and_then(|v| v.checked_add(cents))
        .ok_or_else(invalid)?;
    Bps::try_from(bps).map_err(|_| invalid())
}

/// Frequência de pagamento e seu multiplicador de APY.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutFrequency {
    Monthly,
    Quarterly,
    Yearly,
}

impl PayoutFrequency {
    /// ×1,00 / ×1,15 / ×1,30 em bps.
    pub const fn multiplier_bps(&self) -> Bps {
        match self {
            Self::Monthly => 10_000,
            Self::Quarterly => 11_500,
            Self::Yearly => 13_000,
        }
    }

    pub const fn payouts_per_year(&self) -> u32 {
        match self {
            Self::Monthly => 12,
            Self::Quarterly => 4,
            Self::Yearly => 1,
        }
    }
}

/// Projeção do yield em USDT para o prazo inteiro.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldProjection {
    pub effective_apy_bps: Bps,
    pub yearly_yield: Amount,
    pub monthly_yield: Amount,
    pub total_yield: Amount,
    pub payouts_count: u32,
    pub yield_per_payout: Amount,
    pub final_amount: Amount,
}

/// Projeta o yield de `principal` por `duration_months` meses.
/// Prazos curtos demais para um pagamento da frequência pagam tudo no vencimento (1 pagamento).
pub fn project_yield(
    principal: Amount,
    apy_bps: Bps,
    frequency: PayoutFrequency,
    duration_months: u32,
) -> Result<YieldProjection> {
    ensure_nonzero(u128::from(duration_months), "duration_months")?;

    let eff = U256::from(apy_bps) * U256::from(frequency.multiplier_bps());
    let effective_apy_bps = bps_from_u256(div_round_half_away_u256(eff, U256::from(BPS_SCALE))?)?;

    let yearly_yield = principal.mul_bps_floor(effective_apy_bps)?;
    let monthly_yield = Amount::from_base_units(yearly_yield.base_units() / u128::from(MONTHS_PER_YEAR));
    // uma única divisão para não perder precisão em prazos fracionários
    let total_yield = principal.mul_div_floor(
        u128::from(effective_apy_bps) * u128::from(duration_months),
        u128::from(BPS_SCALE) * u128::from(MONTHS_PER_YEAR),
    )?;

    let payouts_count = (duration_months * frequency.payouts_per_year() / MONTHS_PER_YEAR).max(1);
    let yield_per_payout = Amount::from_base_units(total_yield.base_units() / u128::from(payouts_count));
    let final_amount = principal.checked_add(total_yield)?;

    Ok(YieldProjection {
        effective_apy_bps,
        yearly_yield,
        monthly_yield,
        total_yield,
        payouts_count,
        yield_per_payout,
        final_amount,
    })
}

/// Recompensa paralela em TAKARA: APR simples sobre o principal, paga em tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakaraRewards {
    pub apr_bps: Bps,
    pub yearly_usd: Amount,
    pub total_usd: Amount,
    pub price_usd: Amount,
    pub token_amount: Amount,
}

/// `principal × apr × months / 12` em USD, convertido em tokens a `price_usd` (floor nos dois passos).
pub fn takara_rewards(principal: Amount, apr_bps: Bps, months: u32, price_usd: Amount) -> Result<TakaraRewards> {
    ensure_nonzero(u128::from(months), "duration_months")?;
    let yearly_usd = principal.mul_bps_floor(apr_bps)?;
    let total_usd = principal.mul_div_floor(
        u128::from(apr_bps) * u128::from(months),
        u128::from(BPS_SCALE) * u128::from(MONTHS_PER_YEAR),
    )?;
    let token_amount = total_usd.tokens_at_price(price_usd)?;
    Ok(TakaraRewards { apr_bps, yearly_usd, total_usd, price_usd, token_amount })
}

/// Preço do token de boost e desconto aplicado sobre ele.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostQuote {
    pub price_usd: Amount,
    pub discount_bps: Bps,
}

/// Condições de mercado de uma projeção completa.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionMarket {
    pub takara_apr_bps: Bps,
    pub takara_price_usd: Amount,
    /// Teto global da fração de uplift.
    pub max_boost_fraction_bps: Bps,
    /// `None` projeta sem boost.
    pub boost: Option<BoostQuote>,
}

/// USDT + TAKARA + requisito de boost para um depósito hipotético.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositProjection {
    pub principal: Amount,
    pub usdt: YieldProjection,
    pub takara: TakaraRewards,
    pub boost: Option<BoostRequirement>,
    /// principal + yield USDT + valor USD das recompensas TAKARA.
    pub total_value_at_end: Amount,
}

/// Projeta um depósito no pool pelo prazo do pool. Com boost, o yield USDT
/// assume o alvo preenchido na abertura.
pub fn project_deposit(
    principal: Amount,
    pool: &Pool,
    frequency: PayoutFrequency,
    market: &ProjectionMarket,
) -> Result<DepositProjection> {
    let terms = pool.terms();
    let (apy_bps, boost) = match market.boost {
        Some(quote) => {
            let req = boost_requirement(principal, &terms, quote.price_usd, quote.discount_bps)?;
            let fraction = terms.boost_max_bps.min(market.max_boost_fraction_bps);
            let apy = compute_boosted_apy(terms.base_apy_bps, req.target_usd, req.target_usd, fraction);
            (apy, Some(req))
        }
        None => (terms.base_apy_bps, None),
    };
    let usdt = project_yield(principal, apy_bps, frequency, pool.lock_months)?;
    let takara = takara_rewards(principal, market.takara_apr_bps, pool.lock_months, market.takara_price_usd)?;
    let total_value_at_end = principal.checked_add(usdt.total_yield)?.checked_add(takara.total_usd)?;
    Ok(DepositProjection { principal, usdt, takara, boost, total_value_at_end })
}

// -------------------------
// TESTES
// -------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn usd(v: u128) -> Amount {
        Amount::from_usd(v).unwrap()
    }

    #[test]
    fn t_degenerate_target_passthrough() {
        assert_eq!(compute_boosted_apy(1_800, usd(500), Amount::ZERO, 1_000), 1_800);
        assert_eq!(compute_boosted_apy(0, usd(500), usd(300), 1_000), 0);
    }

    #[test]
    fn t_boost_ratio_linear_and_capped() {
        // 18% base, meio alvo => 18 * 1.05 = 18.90%
        assert_eq!(compute_boosted_apy(1_800, usd(150), usd(300), 1_000), 1_890);
        // alvo cheio => 19.80%
        assert_eq!(compute_boosted_apy(1_800, usd(300), usd(300), 1_000), 1_980);
        // acima do alvo não passa do teto
        assert_eq!(compute_boosted_apy(1_800, usd(9_000), usd(300), 1_000), 1_980);
        assert_eq!(apy_cap_bps(1_800, 1_000), 1_980);
    }

    #[test]
    fn t_boosted_apy_rounds_half_away() {
        // 7.00% * (1 + 1/3 * 0.1) = 7.2333.. -> 7.23%
        assert_eq!(compute_boosted_apy(700, usd(100), usd(300), 1_000), 723);
        // 0.05% * 1.1 = 0.055 -> 0.06%
        assert_eq!(compute_boosted_apy(5, usd(1), usd(1), 1_000), 6);
    }

    #[test]
    fn t_daily_reward_floor() {
        // $1000 a 18%: 180/365 = 0.493150.. -> 493150
        assert_eq!(daily_reward(usd(1_000), 1_800).unwrap(), Amount::from_base_units(493_150));
        assert_eq!(daily_reward(Amount::from_base_units(1), 1_800).unwrap(), Amount::ZERO);
        assert_eq!(accrued_rewards(usd(1_000), 1_800, 10).unwrap(), Amount::from_base_units(4_931_500));
    }

    #[test]
    fn t_apy_from_percent() {
        assert_eq!(apy_bps_from_percent("8.4").unwrap(), 840);
        assert_eq!(apy_bps_from_percent("12.345").unwrap(), 1_234);
        assert_eq!(apy_bps_from_percent("18").unwrap(), 1_800);
        assert_eq!(apy_bps_from_percent(".5").unwrap(), 50);
        for bad in ["-1", "", "abc", "1.2.3", "99999999999"] {
            assert_eq!(apy_bps_from_percent(bad).unwrap_err().code, EngineErrorCode::InvalidArgument);
        }
    }

    #[test]
    fn t_projection_quarterly() {
        // 7% + 1.4% = 8.4%; trimestral x1.15 = 9.66%
        let p = project_yield(usd(10_000), 840, PayoutFrequency::Quarterly, 12).unwrap();
        assert_eq!(p.effective_apy_bps, 966);
        assert_eq!(p.yearly_yield, usd(966));
        assert_eq!(p.monthly_yield, Amount::from_base_units(80_500_000));
        assert_eq!(p.total_yield, usd(966));
        assert_eq!(p.payouts_count, 4);
        assert_eq!(p.yield_per_payout, Amount::from_base_units(241_500_000));
        assert_eq!(p.final_amount, usd(10_966));
    }

    #[test]
    fn t_projection_short_yearly_single_payout() {
        let p = project_yield(usd(1_200), 1_000, PayoutFrequency::Yearly, 6).unwrap();
        assert_eq!(p.effective_apy_bps, 1_300);
        assert_eq!(p.total_yield, usd(78));
        assert_eq!(p.payouts_count, 1);
        assert!(project_yield(usd(1), 1, PayoutFrequency::Monthly, 0).is_err());
    }

    #[test]
    fn t_takara_rewards_floor() {
        let r = takara_rewards(usd(1_000), 3_000, 12, Amount::from_base_units(100_000)).unwrap();
        assert_eq!(r.yearly_usd, usd(300));
        assert_eq!(r.total_usd, usd(300));
        assert_eq!(r.token_amount, usd(3_000));

        // 40% por 18 meses = $600; a $0,07 => 8571,428571 tokens
        let r = takara_rewards(usd(1_000), 4_000, 18, Amount::from_base_units(70_000)).unwrap();
        assert_eq!(r.total_usd, usd(600));
        assert_eq!(r.token_amount, Amount::from_base_units(8_571_428_571));

        assert!(takara_rewards(usd(1_000), 3_000, 0, usd(1)).is_err());
        assert_eq!(
            takara_rewards(usd(1_000), 3_000, 12, Amount::ZERO).unwrap_err().code,
            EngineErrorCode::InvalidArgument
        );
    }

    fn pool() -> Pool {
        Pool::with_defaults(1, 1_800, 12, usd(100))
    }

    fn market(boost: Option<BoostQuote>) -> ProjectionMarket {
        ProjectionMarket {
            takara_apr_bps: 3_000,
            takara_price_usd: Amount::from_base_units(100_000),
            max_boost_fraction_bps: 1_000,
            boost,
        }
    }

    #[test]
    fn t_deposit_projection_without_boost() {
        let p = project_deposit(usd(1_000), &pool(), PayoutFrequency::Monthly, &market(None)).unwrap();
        assert_eq!(p.usdt.effective_apy_bps, 1_800);
        assert_eq!(p.usdt.total_yield, usd(180));
        assert_eq!(p.takara.total_usd, usd(300));
        assert!(p.boost.is_none());
        assert_eq!(p.total_value_at_end, usd(1_480));
    }

    #[test]
    fn t_deposit_projection_with_full_boost() {
        let quote = BoostQuote { price_usd: Amount::from_base_units(500_000), discount_bps: 1_500 };
        let p = project_deposit(usd(1_000), &pool(), PayoutFrequency::Monthly, &market(Some(quote))).unwrap();
        assert_eq!(p.usdt.effective_apy_bps, 1_980);
        assert_eq!(p.usdt.total_yield, usd(198));
        let req = p.boost.unwrap();
        assert_eq!(req.target_usd, usd(300));
        assert_eq!(req.token_amount, Amount::from_base_units(705_882_352));
        assert_eq!(p.total_value_at_end, usd(1_498));
    }
}
