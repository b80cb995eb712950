//! Validações e helpers numéricos seguros para o motor.
//! Objetivo: entradas seguras e divisões/multiplicações sem estouro.

use super::error::Result;
use super::error_catalog::EngineErrorCode;
use super::types::U256;
use crate::{engine_bail, engine_err};

#[inline]
pub fn ensure_nonzero(value: u128, field: &str) -> Result<()> {
    if value == 0 {
        engine_bail!(EngineErrorCode::InvalidArgument, campo => field, valor => 0);
    }
    Ok(())
}

/// `min <= value <= max`, senão `InvalidArgument` com o campo.
#[inline]
pub fn ensure_range(value: u32, min: u32, max: u32, field: &str) -> Result<()> {
    if value < min || value > max {
        engine_bail!(EngineErrorCode::InvalidArgument, campo => field, valor => value, min => min, max => max);
    }
    Ok(())
}

#[inline]
pub fn to_u128_checked(v: U256) -> Result<u128> {
    if v > U256::from(u128::MAX) {
        Err(engine_err!(EngineErrorCode::Overflow, detalhe => "u256->u128"))
    } else {
        Ok(v.as_u128())
    }
}

/// floor(a * b / d) em U256 → u128.
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Result<u128> {
    if d == 0 {
        engine_bail!(EngineErrorCode::Overflow, detalhe => "div0");
    }
    let n = U256::from(a) * U256::from(b);
    to_u128_checked(n / U256::from(d))
}

/// Divisão com arredondamento *half away from zero* (operandos não negativos ⇒ half-up).
pub fn div_round_half_away_u256(n: U256, d: U256) -> Result<U256> {
    if d.is_zero() {
        engine_bail!(EngineErrorCode::Overflow, detalhe => "div0");
    }
    let q = n / d;
    let r = n % d;
    // 2r >= d ⇒ a fração é >= 0,5
    if (r << 1) >= d {
        Ok(q + U256::from(1u8))
    } else {
        Ok(q)
    }
}
