//! Quantias em unidades base (1 unidade = 1e-6 USD), sempre não negativas.
//! Toda aritmética é checada; divisões truncam (floor) salvo indicação contrária.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{EngineError, Result};
use super::error_catalog::EngineErrorCode;
use super::guardrails::{ensure_nonzero, mul_div_floor, to_u128_checked};
use super::types::{Bps, BPS_SCALE, USD_DECIMALS, USD_SCALE, U256};
use crate::engine_err;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    #[inline]
    pub const fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    #[inline]
    pub const fn base_units(self) -> u128 {
        self.0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Dólares inteiros → unidades base.
    pub fn from_usd(whole: u128) -> Result<Self> {
        whole
            .checked_mul(USD_SCALE)
            .map(Self)
            .ok_or_else(|| engine_err!(EngineErrorCode::Overflow, detalhe => "from_usd"))
    }

    pub fn checked_add(self, other: Amount) -> Result<Amount> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or_else(|| engine_err!(EngineErrorCode::Overflow, detalhe => "add"))
    }

    pub fn checked_sub(self, other: Amount) -> Result<Amount> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or_else(|| engine_err!(EngineErrorCode::Overflow, detalhe => "sub"))
    }

    /// `self - other`, saturando em zero.
    #[inline]
    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    pub fn checked_mul_u64(self, k: u64) -> Result<Amount> {
        self.0
            .checked_mul(u128::from(k))
            .map(Amount)
            .ok_or_else(|| engine_err!(EngineErrorCode::Overflow, detalhe => "mul"))
    }

    /// floor(self * num / den) com intermediário em U256.
    pub fn mul_div_floor(self, num: u128, den: u128) -> Result<Amount> {
        mul_div_floor(self.0, num, den).map(Amount)
    }

    /// floor(self * bps / 10_000).
    pub fn mul_bps_floor(self, bps: Bps) -> Result<Amount> {
        self.mul_div_floor(u128::from(bps), u128::from(BPS_SCALE))
    }

    /// Valor em USD de `self` tokens (6 decimais) ao preço `price` (micro-USD por token).
    pub fn value_at_price(self, price: Amount) -> Result<Amount> {
        let n = U256::from(self.0) * U256::from(price.0);
        to_u128_checked(n / U256::from(USD_SCALE)).map(Amount)
    }

    /// Tokens (6 decimais) que `self` USD compram a `price` (floor). Preço zero é inválido.
    pub fn tokens_at_price(self, price: Amount) -> Result<Amount> {
        ensure_nonzero(price.0, "price_usd")?;
        mul_div_floor(self.0, USD_SCALE, price.0).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / USD_SCALE;
        let frac = self.0 % USD_SCALE;
        write!(f, "{}.{:06}", whole, frac)
    }
}

/// Aceita "1000", "1000.5", "0.000001". Mais de 6 casas → `InvalidArgument`.
impl FromStr for Amount {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        let invalid = || engine_err!(EngineErrorCode::InvalidArgument, campo => "amount", valor => raw);
        if raw.is_empty() {
            return Err(invalid());
        }
        let (int_part, frac_part) = match raw.split_once('.') {
            Some((i, f)) => (i, f),
            None => (raw, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac_part.len() > USD_DECIMALS as usize {
            return Err(invalid());
        }
        let whole: u128 = if int_part.is_empty() { 0 } else { int_part.parse().map_err(|_| invalid())? };
        let mut frac: u128 = if frac_part.is_empty() { 0 } else { frac_part.parse().map_err(|_| invalid())? };
        for _ in frac_part.len()..USD_DECIMALS as usize {
            frac *= 10;
        }
        let base = Amount::from_usd(whole)?;
        base.checked_add(Amount(frac))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let a: Amount = "1000.5".parse().unwrap();
        assert_eq!(a.base_units(), 1_000_500_000);
        assert_eq!(a.to_string(), "1000.500000");
        assert_eq!("0.000001".parse::<Amount>().unwrap(), Amount::from_base_units(1));
        assert_eq!(".25".parse::<Amount>().unwrap(), Amount::from_base_units(250_000));
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", "-1", "1.0000001", "abc", "1,5", "."] {
            let err = bad.parse::<Amount>().unwrap_err();
            assert_eq!(err.code, EngineErrorCode::InvalidArgument, "input {:?}", bad);
        }
    }

    #[test]
    fn checked_ops() {
        let max = Amount::from_base_units(u128::MAX);
        assert_eq!(max.checked_add(Amount::from_base_units(1)).unwrap_err().code, EngineErrorCode::Overflow);
        assert_eq!(Amount::ZERO.checked_sub(Amount::from_base_units(1)).unwrap_err().code, EngineErrorCode::Overflow);
        assert_eq!(Amount::from_base_units(3).saturating_sub(Amount::from_base_units(5)), Amount::ZERO);
    }

    #[test]
    fn bps_and_price() {
        let p = Amount::from_usd(1_000).unwrap();
        assert_eq!(p.mul_bps_floor(6_000).unwrap(), Amount::from_usd(600).unwrap());
        // 250 tokens a $0,10
        let tokens = Amount::from_usd(250).unwrap();
        let price = Amount::from_base_units(100_000);
        assert_eq!(tokens.value_at_price(price).unwrap(), Amount::from_usd(25).unwrap());
        assert_eq!(Amount::from_usd(25).unwrap().tokens_at_price(price).unwrap(), tokens);
        // $1 a $3: 0,333333 (floor)
        let third = Amount::from_usd(1).unwrap().tokens_at_price(Amount::from_usd(3).unwrap()).unwrap();
        assert_eq!(third, Amount::from_base_units(333_333));
        assert_eq!(tokens.tokens_at_price(Amount::ZERO).unwrap_err().code, EngineErrorCode::InvalidArgument);
    }
}
