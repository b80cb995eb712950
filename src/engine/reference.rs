//! Referência de alta precisão ("goldens") baseada em **BigRational** para o
//! APY com boost e a recompensa diária.
//!
//! Objetivos desta referência:
//! 1. Calcular os valores **contínuos/exatos** (sem quantização).
//! 2. Reproduzir a política de arredondamento do core (APY half-away em bps,
//!    recompensas floor) em BigRational, como oráculo independente do U256.
//! 3. Medir o quanto a quantização do core se afasta do valor exato.
//!
//! Não entra no caminho de produção; serve a testes e geração de goldens.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};

use super::amount::Amount;
use super::error::Result;
use super::error_catalog::EngineErrorCode;
use super::types::{Bps, BPS_SCALE, DAYS_PER_YEAR};
use super::yield_calc;
use crate::engine_err;

#[inline]
fn q(n: u128, d: u128) -> BigRational {
    BigRational::new(BigInt::from(n), BigInt::from(d))
}

#[inline]
fn q_int(n: u128) -> BigRational {
    BigRational::from_integer(BigInt::from(n))
}

/// Arredonda half-away-from-zero (domínio não negativo ⇒ floor(r + 1/2)).
fn round_half_away(r: &BigRational) -> BigRational {
    let half = BigRational::new(BigInt::one(), BigInt::from(2));
    if *r >= BigRational::zero() {
        (r + half).floor()
    } else {
        (r - half).ceil()
    }
}

fn to_u128(r: &BigRational) -> Result<u128> {
    r.to_integer()
        .to_u128()
        .ok_or_else(|| engine_err!(EngineErrorCode::Overflow, detalhe => "ref->u128"))
}

// -------------------------
// Contínuo/exato (sem quantização)
// -------------------------
/// APY com boost exato, em bps racionais.
pub fn continuous_boosted_apy(base_apy_bps: Bps, boost: Amount, target: Amount, max_fraction_bps: Bps) -> BigRational {
    let base = q_int(u128::from(base_apy_bps));
    if target.is_zero() {
        return base;
    }
    let mut ratio = q(boost.base_units(), target.base_units());
    if ratio > BigRational::one() {
        ratio = BigRational::one();
    }
    let f = q(u128::from(max_fraction_bps), u128::from(BPS_SCALE));
    base * (BigRational::one() + ratio * f)
}

/// Recompensa diária exata (unidades base racionais).
pub fn continuous_daily_reward(principal: Amount, apy_bps: Bps) -> BigRational {
    q_int(principal.base_units()) * q(u128::from(apy_bps), u128::from(BPS_SCALE) * u128::from(DAYS_PER_YEAR))
}

// -------------------------
// Política (replica o core em big-precision)
// -------------------------
pub fn policy_boosted_apy(base_apy_bps: Bps, boost: Amount, target: Amount, max_fraction_bps: Bps) -> Result<Bps> {
    let exact = continuous_boosted_apy(base_apy_bps, boost, target, max_fraction_bps);
    let wide = to_u128(&round_half_away(&exact))?;
    Bps::try_from(wide).map_err(|_| engine_err!(EngineErrorCode::Overflow, detalhe => "ref bps"))
}

pub fn policy_daily_reward(principal: Amount, apy_bps: Bps) -> Result<Amount> {
    to_u128(&continuous_daily_reward(principal, apy_bps).floor()).map(Amount::from_base_units)
}

// -------------------------
// Estruturas de comparação (goldens)
// -------------------------
#[derive(Debug, Clone)]
pub struct RefApy {
    pub apy_core: Bps,
    pub apy_policy: Bps,
    pub apy_cont: BigRational,
    /// |core - contínuo|, em bps.
    pub abs_error_bps: BigRational,
}

#[derive(Debug, Clone)]
pub struct RefReward {
    pub reward_core: Amount,
    pub reward_policy: Amount,
    pub reward_cont: BigRational,
    /// Quanto o ano inteiro (365 × core) fica abaixo do exato; nunca negativo.
    pub annual_shortfall: BigRational,
}

/// Compara o **core** com a referência (APY com boost).
pub fn golden_boosted_apy(base_apy_bps: Bps, boost: Amount, target: Amount, max_fraction_bps: Bps) -> Result<RefApy> {
    let apy_core = yield_calc::compute_boosted_apy(base_apy_bps, boost, target, max_fraction_bps);
    let apy_policy = policy_boosted_apy(base_apy_bps, boost, target, max_fraction_bps)?;
    let apy_cont = continuous_boosted_apy(base_apy_bps, boost, target, max_fraction_bps);
    let diff = q_int(u128::from(apy_core)) - apy_cont.clone();
    let abs_error_bps = if diff < BigRational::zero() { -diff } else { diff };
    Ok(RefApy { apy_core, apy_policy, apy_cont, abs_error_bps })
}

/// Compara o **core** com a referência (recompensa diária).
pub fn golden_daily_reward(principal: Amount, apy_bps: Bps) -> Result<RefReward> {
    let reward_core = yield_calc::daily_reward(principal, apy_bps)?;
    let reward_policy = policy_daily_reward(principal, apy_bps)?;
    let reward_cont = continuous_daily_reward(principal, apy_bps);
    let annual_exact = q_int(principal.base_units()) * q(u128::from(apy_bps), u128::from(BPS_SCALE));
    let annual_core = q_int(reward_core.base_units()) * q_int(u128::from(DAYS_PER_YEAR));
    let annual_shortfall = annual_exact - annual_core;
    Ok(RefReward { reward_core, reward_policy, reward_cont, annual_shortfall })
}
