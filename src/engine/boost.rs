//! Boost: valor extra empenhado contra um wexel para subir o APY efetivo.
//! Alvo = principal × boost_target_bps; o acumulado nunca passa do alvo
//! (rejeição estrita, sem clamp parcial nesta camada).
//! Alvo, fração e APY base vêm de `Deposit::terms`, congelados na abertura.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::amount::Amount;
use super::error::Result;
use super::error_catalog::EngineErrorCode;
use super::guardrails::{ensure_nonzero, ensure_range, mul_div_floor};
use super::lifecycle;
use super::ports::PriceSource;
use super::types::{Bps, BoostRecord, Deposit, PoolTerms, BPS_SCALE};
use super::yield_calc::compute_boosted_apy;
use crate::{engine_bail, engine_err};

pub struct BoostEngine<P: PriceSource> {
    prices: P,
    /// Teto global da fração de uplift; o pool pode pedir menos, nunca mais.
    max_boost_fraction_bps: Bps,
}

impl<P: PriceSource> BoostEngine<P> {
    pub fn new(prices: P, max_boost_fraction_bps: Bps) -> Self {
        Self { prices, max_boost_fraction_bps }
    }

    #[inline]
    pub fn boost_fraction_bps(&self, terms: &PoolTerms) -> Bps {
        terms.boost_max_bps.min(self.max_boost_fraction_bps)
    }

    pub fn effective_apy(&self, deposit: &Deposit) -> Result<Bps> {
        let terms = &deposit.terms;
        let target = boost_target(deposit.principal, terms)?;
        Ok(compute_boosted_apy(terms.base_apy_bps, deposit.boost_value, target, self.boost_fraction_bps(terms)))
    }

    /// Aplica `token_amount` de `token_mint` como boost. Não persiste nada: a
    /// transferência on-ledger e o commit do registro são do chamador, nessa ordem.
    ///
    /// Não fecha o accrual: o APY novo vale também para dias ainda não
    /// creditados. Em fluxo real use [`apply_boost_at`](Self::apply_boost_at).
    pub fn apply_boost(&self, deposit: &Deposit, token_mint: &str, token_amount: Amount) -> Result<Deposit> {
        if deposit.is_redeemed() {
            engine_bail!(EngineErrorCode::WexelNotFound, wexel_id => deposit.id);
        }
        ensure_nonzero(token_amount.base_units(), "token_amount")?;

        let quote = self.prices.latest_price(token_mint)?;
        let value_usd = token_amount.value_at_price(quote.price_usd)?;
        ensure_nonzero(value_usd.base_units(), "boost_value_usd")?;

        let target = boost_target(deposit.principal, &deposit.terms)?;
        let prospective = deposit.boost_value.checked_add(value_usd)?;
        if prospective > target {
            let remaining = target.saturating_sub(deposit.boost_value);
            tracing::debug!(wexel_id = deposit.id, %prospective, %target, "boost rejected");
            return Err(engine_err!(
                EngineErrorCode::BoostTargetExceeded,
                wexel_id => deposit.id,
                max_boost => remaining,
                attempted => value_usd,
            ));
        }

        let mut next = deposit.clone();
        next.boost_value = prospective;
        next.boosts.push(BoostRecord {
            token_mint: token_mint.to_string(),
            token_amount,
            price_usd: quote.price_usd,
            value_usd,
        });
        next.effective_apy_bps = self.effective_apy(&next)?;
        Ok(next)
    }

    /// Credita os dias completos até `now` com o APY antigo e só então aplica o
    /// boost. O registro devolvido carrega as duas mudanças para um único commit.
    pub fn apply_boost_at(
        &self,
        deposit: &Deposit,
        token_mint: &str,
        token_amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<Deposit> {
        let (settled, _) = lifecycle::accrue(deposit, now)?;
        self.apply_boost(&settled, token_mint, token_amount)
    }
}

/// `principal × boost_target_bps / 10_000` (floor).
#[inline]
pub fn boost_target(principal: Amount, terms: &PoolTerms) -> Result<Amount> {
    principal.mul_bps_floor(terms.boost_target_bps)
}

/// Quanto ainda cabe de boost (em USD) antes do alvo.
pub fn remaining_capacity(deposit: &Deposit) -> Result<Amount> {
    Ok(boost_target(deposit.principal, &deposit.terms)?.saturating_sub(deposit.boost_value))
}

/// Progresso do boost em bps do alvo (0 para alvo zero).
pub fn boost_progress_bps(deposit: &Deposit) -> Result<Bps> {
    let target = boost_target(deposit.principal, &deposit.terms)?;
    if target.is_zero() {
        return Ok(0);
    }
    let p = mul_div_floor(deposit.boost_value.base_units(), u128::from(BPS_SCALE), target.base_units())?;
    Ok(p.min(u128::from(BPS_SCALE)) as Bps)
}

/// Tokens necessários para preencher o alvo de boost de um depósito novo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostRequirement {
    pub target_usd: Amount,
    pub market_price_usd: Amount,
    pub discount_bps: Bps,
    /// Preço de mercado já com o desconto (floor).
    pub boost_price_usd: Amount,
    pub token_amount: Amount,
}

/// `target / (price × (1 − discount))`, tudo com floor. O desconto barateia o
/// token para o alvo e precisa ficar abaixo de 100%.
pub fn boost_requirement(
    principal: Amount,
    terms: &PoolTerms,
    price_usd: Amount,
    discount_bps: Bps,
) -> Result<BoostRequirement> {
    ensure_range(discount_bps, 0, BPS_SCALE - 1, "discount_bps")?;
    let target_usd = boost_target(principal, terms)?;
    let boost_price_usd = price_usd.mul_bps_floor(BPS_SCALE - discount_bps)?;
    let token_amount = target_usd.tokens_at_price(boost_price_usd)?;
    Ok(BoostRequirement {
        target_usd,
        market_price_usd: price_usd,
        discount_bps,
        boost_price_usd,
        token_amount,
    })
}
