//! Tipos básicos do motor (escala fixa USDT 1e6) + U256 para intermediários.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uint::construct_uint;

use super::amount::Amount;

construct_uint! {
    /// Inteiro de 256 bits para contas intermediárias seguras.
    pub struct U256(4);
}

pub type Bps = u32; // 0..=10_000 (1 bp = 0,01%)
pub type PoolId = u64;
pub type WexelId = u64;

pub const BPS_SCALE: Bps = 10_000;
pub const USD_DECIMALS: u32 = 6;
pub const USD_SCALE: u128 = 1_000_000; // 1e6 unidades base = 1 USD
pub const DAYS_PER_YEAR: u64 = 365;

pub const DEFAULT_LTV_BPS: Bps = 6_000; // 60%
pub const DEFAULT_MAX_BOOST_FRACTION_BPS: Bps = 1_000; // +10% relativo
pub const DEFAULT_BOOST_TARGET_BPS: Bps = 3_000; // 30% do principal

pub const MIN_LOCK_MONTHS: u32 = 1;
pub const MAX_LOCK_MONTHS: u32 = 60;

/// Pool de depósito configurado pelo administrador.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: PoolId,
    pub base_apy_bps: Bps,
    pub lock_months: u32,
    pub min_deposit_usd: Amount,
    pub boost_target_bps: Bps,
    /// Fração máxima de uplift relativo do APY (1_000 = +10%).
    pub boost_max_bps: Bps,
    /// Override de LTV; `None` usa o default da configuração.
    pub ltv_bps: Option<Bps>,
    pub is_active: bool,
}

impl Pool {
    /// Pool ativo com alvo e fração de boost padrão (30% / +10%).
    pub fn with_defaults(id: PoolId, base_apy_bps: Bps, lock_months: u32, min_deposit_usd: Amount) -> Self {
        Self {
            id,
            base_apy_bps,
            lock_months,
            min_deposit_usd,
            boost_target_bps: DEFAULT_BOOST_TARGET_BPS,
            boost_max_bps: DEFAULT_MAX_BOOST_FRACTION_BPS,
            ltv_bps: None,
            is_active: true,
        }
    }

    #[inline]
    pub fn terms(&self) -> PoolTerms {
        PoolTerms {
            base_apy_bps: self.base_apy_bps,
            boost_target_bps: self.boost_target_bps,
            boost_max_bps: self.boost_max_bps,
        }
    }
}

/// Condições de rendimento do pool congeladas na abertura do wexel.
/// Alterações posteriores no pool só valem para depósitos novos.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolTerms {
    pub base_apy_bps: Bps,
    pub boost_target_bps: Bps,
    pub boost_max_bps: Bps,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DepositStatus {
    Active,
    Redeemed,
}

/// Um boost aplicado com sucesso (valor congelado no preço do momento).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostRecord {
    pub token_mint: String,
    pub token_amount: Amount,
    pub price_usd: Amount,
    pub value_usd: Amount,
}

/// Depósito (wexel): principal travado, boost acumulado e estado de colateral.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub id: WexelId,
    pub pool_id: PoolId,
    pub owner: String,
    pub principal: Amount,
    pub boost_value: Amount,
    pub boosts: Vec<BoostRecord>,
    pub terms: PoolTerms,
    pub effective_apy_bps: Bps,
    pub created_at: DateTime<Utc>,
    pub maturity_date: DateTime<Utc>,
    pub is_collateralized: bool,
    pub loan_amount: Option<Amount>,
    pub accrued_rewards: Amount,
    pub claimed_rewards: Amount,
    pub last_accrued_day: u64,
    pub status: DepositStatus,
    pub version: u64,
}

impl Deposit {
    #[inline]
    pub fn is_redeemed(&self) -> bool {
        self.status == DepositStatus::Redeemed
    }

    #[inline]
    pub fn is_matured(&self, now: DateTime<Utc>) -> bool {
        now >= self.maturity_date
    }

    /// Saldo de loan em aberto (zero quando não colateralizado).
    #[inline]
    pub fn outstanding_loan(&self) -> Amount {
        self.loan_amount.unwrap_or(Amount::ZERO)
    }
}

/// Cotação corrente de um par (mint, fonte).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub token_mint: String,
    /// Micro-USD por token inteiro (mesma escala de `Amount`).
    pub price_usd: Amount,
    pub source: String,
    pub updated_at: DateTime<Utc>,
}
