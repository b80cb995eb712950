//! Administração de pools: criação validada e atualizações limitadas.
//! Com depósitos existentes só mudam APY, caps de boost, flag de ativo e prazo.

use serde::{Deserialize, Serialize};

use super::amount::Amount;
use super::error::Result;
use super::error_catalog::EngineErrorCode;
use super::guardrails::ensure_range;
use super::types::{Bps, Pool, BPS_SCALE, MAX_LOCK_MONTHS, MIN_LOCK_MONTHS};
use crate::engine_bail;

/// Confere os limites de todos os campos do pool.
pub fn validate_pool(pool: &Pool) -> Result<()> {
    ensure_range(pool.base_apy_bps, 0, BPS_SCALE, "base_apy_bps")?;
    ensure_range(pool.lock_months, MIN_LOCK_MONTHS, MAX_LOCK_MONTHS, "lock_months")?;
    ensure_range(pool.boost_target_bps, 0, BPS_SCALE, "boost_target_bps")?;
    ensure_range(pool.boost_max_bps, 0, BPS_SCALE, "boost_max_bps")?;
    if let Some(ltv) = pool.ltv_bps {
        ensure_range(ltv, 0, BPS_SCALE, "ltv_bps")?;
    }
    Ok(())
}

/// Patch parcial de um pool; `None` mantém o valor atual.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolUpdate {
    pub base_apy_bps: Option<Bps>,
    pub lock_months: Option<u32>,
    pub min_deposit_usd: Option<Amount>,
    pub boost_target_bps: Option<Bps>,
    pub boost_max_bps: Option<Bps>,
    pub ltv_bps: Option<Bps>,
    pub is_active: Option<bool>,
}

impl PoolUpdate {
    /// Campos que não podem mudar depois que o pool recebeu depósitos.
    fn frozen_fields(&self) -> Vec<&'static str> {
        let mut frozen = Vec::new();
        if self.min_deposit_usd.is_some() {
            frozen.push("min_deposit_usd");
        }
        if self.ltv_bps.is_some() {
            frozen.push("ltv_bps");
        }
        frozen
    }
}

/// Aplica `update` sobre `pool`, devolvendo o pool novo já validado.
pub fn apply_pool_update(pool: &Pool, update: &PoolUpdate, has_deposits: bool) -> Result<Pool> {
    if has_deposits {
        let frozen = update.frozen_fields();
        if !frozen.is_empty() {
            engine_bail!(EngineErrorCode::InvalidArgument, campo => frozen.join(","), pool_id => pool.id);
        }
    }
    let mut next = pool.clone();
    if let Some(v) = update.base_apy_bps {
        next.base_apy_bps = v;
    }
    if let Some(v) = update.lock_months {
        next.lock_months = v;
    }
    if let Some(v) = update.min_deposit_usd {
        next.min_deposit_usd = v;
    }
    if let Some(v) = update.boost_target_bps {
        next.boost_target_bps = v;
    }
    if let Some(v) = update.boost_max_bps {
        next.boost_max_bps = v;
    }
    if let Some(v) = update.ltv_bps {
        next.ltv_bps = Some(v);
    }
    if let Some(v) = update.is_active {
        next.is_active = v;
    }
    validate_pool(&next)?;
    Ok(next)
}
