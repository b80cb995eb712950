//! Ciclo de vida do wexel:
//! `Created → Boosted* → (Collateralized → Repaid)* → Matured → Redeemed`.
//! Accrual é idempotente por dia: repetir para o mesmo dia não credita nada.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use super::amount::Amount;
use super::error::Result;
use super::error_catalog::EngineErrorCode;
use super::guardrails::ensure_nonzero;
use super::types::{Deposit, DepositStatus, Pool, WexelId};
use super::yield_calc::daily_reward;
use crate::{engine_bail, engine_err};

/// Abre um wexel novo no pool (sem boost, sem colateral, versão 0).
pub fn open_deposit(id: WexelId, pool: &Pool, owner: &str, principal: Amount, now: DateTime<Utc>) -> Result<Deposit> {
    if !pool.is_active {
        engine_bail!(EngineErrorCode::PoolInactive, pool_id => pool.id);
    }
    if owner.trim().is_empty() {
        engine_bail!(EngineErrorCode::InvalidArgument, campo => "owner");
    }
    ensure_nonzero(principal.base_units(), "principal")?;
    if principal < pool.min_deposit_usd {
        engine_bail!(EngineErrorCode::InsufficientFunds, required => pool.min_deposit_usd, available => principal);
    }
    let maturity_date = now
        .checked_add_months(Months::new(pool.lock_months))
        .ok_or_else(|| engine_err!(EngineErrorCode::Overflow, detalhe => "maturity_date"))?;

    Ok(Deposit {
        id,
        pool_id: pool.id,
        owner: owner.to_string(),
        principal,
        boost_value: Amount::ZERO,
        boosts: Vec::new(),
        terms: pool.terms(),
        effective_apy_bps: pool.base_apy_bps,
        created_at: now,
        maturity_date,
        is_collateralized: false,
        loan_amount: None,
        accrued_rewards: Amount::ZERO,
        claimed_rewards: Amount::ZERO,
        last_accrued_day: 0,
        status: DepositStatus::Active,
        version: 0,
    })
}

/// Dias inteiros do prazo do wexel.
pub fn term_days(deposit: &Deposit) -> u64 {
    let days = deposit.maturity_date.signed_duration_since(deposit.created_at).num_days();
    u64::try_from(days).unwrap_or(0)
}

/// Dias inteiros decorridos até `now`, limitados ao prazo.
pub fn days_elapsed(deposit: &Deposit, now: DateTime<Utc>) -> u64 {
    let days = now.signed_duration_since(deposit.created_at).num_days();
    u64::try_from(days).unwrap_or(0).min(term_days(deposit))
}

/// Credita os dias ainda não acumulados. Devolve o wexel novo e o valor creditado.
pub fn accrue(deposit: &Deposit, now: DateTime<Utc>) -> Result<(Deposit, Amount)> {
    if deposit.is_redeemed() {
        engine_bail!(EngineErrorCode::WexelNotFound, wexel_id => deposit.id);
    }
    let elapsed = days_elapsed(deposit, now);
    if elapsed <= deposit.last_accrued_day {
        return Ok((deposit.clone(), Amount::ZERO));
    }
    let days = elapsed - deposit.last_accrued_day;
    let credit = daily_reward(deposit.principal, deposit.effective_apy_bps)?.checked_mul_u64(days)?;

    let mut next = deposit.clone();
    next.accrued_rewards = next.accrued_rewards.checked_add(credit)?;
    next.last_accrued_day = elapsed;
    Ok((next, credit))
}

#[inline]
pub fn pending_rewards(deposit: &Deposit) -> Amount {
    deposit.accrued_rewards.saturating_sub(deposit.claimed_rewards)
}

pub fn claim(deposit: &Deposit, amount: Amount) -> Result<Deposit> {
    if deposit.is_redeemed() {
        engine_bail!(EngineErrorCode::WexelNotFound, wexel_id => deposit.id);
    }
    ensure_nonzero(amount.base_units(), "claim_amount")?;
    let pending = pending_rewards(deposit);
    if amount > pending {
        engine_bail!(EngineErrorCode::InsufficientFunds, required => amount, available => pending);
    }
    let mut next = deposit.clone();
    next.claimed_rewards = next.claimed_rewards.checked_add(amount)?;
    Ok(next)
}

/// Resultado de um resgate: principal devolvido e recompensas ainda não sacadas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub wexel_id: WexelId,
    pub principal: Amount,
    pub unclaimed_rewards: Amount,
    pub redeemed_at: DateTime<Utc>,
}

/// Resgate terminal: só no/após o vencimento e sem loan em aberto.
pub fn redeem(deposit: &Deposit, now: DateTime<Utc>) -> Result<(Deposit, Redemption)> {
    if deposit.is_redeemed() {
        engine_bail!(EngineErrorCode::WexelNotFound, wexel_id => deposit.id);
    }
    if deposit.is_collateralized {
        engine_bail!(EngineErrorCode::WexelAlreadyCollateralized, wexel_id => deposit.id);
    }
    if !deposit.is_matured(now) {
        engine_bail!(
            EngineErrorCode::WexelNotMatured,
            wexel_id => deposit.id,
            maturity_date => deposit.maturity_date.to_rfc3339(),
        );
    }
    let redemption = Redemption {
        wexel_id: deposit.id,
        principal: deposit.principal,
        unclaimed_rewards: pending_rewards(deposit),
        redeemed_at: now,
    };
    let mut next = deposit.clone();
    next.status = DepositStatus::Redeemed;
    Ok((next, redemption))
}
