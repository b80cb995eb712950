//! Configuração do motor: defaults da política + overrides por variável de ambiente.
//!
//! | Variável | Campo | Default |
//! |---|---|---|
//! | `WXL_DEFAULT_LTV_BPS` | `default_ltv_bps` | 6000 |
//! | `WXL_MAX_BOOST_FRACTION_BPS` | `max_boost_fraction_bps` | 1000 |
//! | `WXL_MAX_PRICE_DEVIATION_BPS` | `max_price_deviation_bps` | 1500 |
//! | `WXL_PRICE_MAX_AGE_SECS` | `price_max_age_secs` | 300 |
//! | `WXL_VALID_SOURCES` | `valid_sources` (csv) | pyth,chainlink,dex,cex,coingecko,binance,jupiter,manual |
//! | `WXL_KYC_REQUIRED_FOR_COLLATERAL` | `kyc_required_for_collateral` | true |
//! | `WXL_TAKARA_APR_BPS` | `takara_apr_bps` | 3000 |
//! | `WXL_TAKARA_PRICE_USD` | `takara_price_usd` | 0.10 |
//! | `WXL_BOOST_DISCOUNT_BPS` | `boost_discount_bps` | 1500 |

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::amount::Amount;
use crate::engine::error::Result;
use crate::engine::error_catalog::EngineErrorCode;
use crate::engine::guardrails::ensure_range;
use crate::engine::oracle::DEFAULT_SOURCES;
use crate::engine::types::{Bps, BPS_SCALE, DEFAULT_LTV_BPS, DEFAULT_MAX_BOOST_FRACTION_BPS};
use crate::{engine_bail, engine_err};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub default_ltv_bps: Bps,
    pub max_boost_fraction_bps: Bps,
    pub max_price_deviation_bps: Bps,
    pub price_max_age_secs: u64,
    pub valid_sources: Vec<String>,
    pub kyc_required_for_collateral: bool,
    /// APR da recompensa TAKARA usada nas projeções.
    pub takara_apr_bps: Bps,
    pub takara_price_usd: Amount,
    /// Desconto sobre o preço de mercado do token de boost nas projeções.
    pub boost_discount_bps: Bps,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_ltv_bps: DEFAULT_LTV_BPS,
            max_boost_fraction_bps: DEFAULT_MAX_BOOST_FRACTION_BPS,
            max_price_deviation_bps: 1_500,
            price_max_age_secs: 300,
            valid_sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            kyc_required_for_collateral: true,
            takara_apr_bps: 3_000,
            takara_price_usd: Amount::from_base_units(100_000),
            boost_discount_bps: 1_500,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| engine_err!(EngineErrorCode::InvalidArgument, campo => name, valor => raw))
}

impl EngineConfig {
    /// Lê `WXL_*` do ambiente do processo.
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().filter(|(k, _)| k.starts_with("WXL_")).collect();
        Self::from_vars(&vars)
    }

    /// Mesmo que [`from_env`](Self::from_env), a partir de um mapa explícito.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(v) = vars.get("WXL_DEFAULT_LTV_BPS") {
            cfg.default_ltv_bps = parse_var("WXL_DEFAULT_LTV_BPS", v)?;
        }
        if let Some(v) = vars.get("WXL_MAX_BOOST_FRACTION_BPS") {
            cfg.max_boost_fraction_bps = parse_var("WXL_MAX_BOOST_FRACTION_BPS", v)?;
        }
        if let Some(v) = vars.get("WXL_MAX_PRICE_DEVIATION_BPS") {
            cfg.max_price_deviation_bps = parse_var("WXL_MAX_PRICE_DEVIATION_BPS", v)?;
        }
        if let Some(v) = vars.get("WXL_PRICE_MAX_AGE_SECS") {
            cfg.price_max_age_secs = parse_var("WXL_PRICE_MAX_AGE_SECS", v)?;
        }
        if let Some(v) = vars.get("WXL_VALID_SOURCES") {
            cfg.valid_sources = v
                .split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = vars.get("WXL_KYC_REQUIRED_FOR_COLLATERAL") {
            cfg.kyc_required_for_collateral = parse_var("WXL_KYC_REQUIRED_FOR_COLLATERAL", v)?;
        }
        if let Some(v) = vars.get("WXL_TAKARA_APR_BPS") {
            cfg.takara_apr_bps = parse_var("WXL_TAKARA_APR_BPS", v)?;
        }
        if let Some(v) = vars.get("WXL_TAKARA_PRICE_USD") {
            cfg.takara_price_usd = parse_var("WXL_TAKARA_PRICE_USD", v)?;
        }
        if let Some(v) = vars.get("WXL_BOOST_DISCOUNT_BPS") {
            cfg.boost_discount_bps = parse_var("WXL_BOOST_DISCOUNT_BPS", v)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_range(self.default_ltv_bps, 1, BPS_SCALE, "default_ltv_bps")?;
        ensure_range(self.max_boost_fraction_bps, 0, BPS_SCALE, "max_boost_fraction_bps")?;
        ensure_range(self.max_price_deviation_bps, 0, BPS_SCALE, "max_price_deviation_bps")?;
        ensure_range(self.takara_apr_bps, 0, BPS_SCALE, "takara_apr_bps")?;
        ensure_range(self.boost_discount_bps, 0, BPS_SCALE - 1, "boost_discount_bps")?;
        if self.takara_price_usd.is_zero() {
            engine_bail!(EngineErrorCode::InvalidArgument, campo => "takara_price_usd");
        }
        if self.valid_sources.is_empty() {
            engine_bail!(EngineErrorCode::InvalidArgument, campo => "valid_sources");
        }
        Ok(())
    }

    pub fn price_max_age(&self) -> chrono::Duration {
        let secs = i64::try_from(self.price_max_age_secs).unwrap_or(i64::MAX).min(i64::MAX / 1_000);
        chrono::Duration::seconds(secs)
    }
}
