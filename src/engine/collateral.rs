//! Colateral: empréstimo por LTV contra o principal do wexel.
//! Política: loan = floor(principal × ltv / 10_000); repay parcial reduz o saldo,
//! saldo zero libera o wexel. Re-colateralizar depois de quitar é permitido.

use super::amount::Amount;
use super::error::Result;
use super::error_catalog::EngineErrorCode;
use super::guardrails::{ensure_nonzero, ensure_range};
use super::types::{Bps, Deposit, BPS_SCALE};
use crate::engine_bail;

/// `principal × ltv_bps / 10_000` (floor).
#[inline]
pub fn loan_amount(principal: Amount, ltv_bps: Bps) -> Result<Amount> {
    ensure_range(ltv_bps, 0, BPS_SCALE, "ltv_bps")?;
    principal.mul_bps_floor(ltv_bps)
}

fn ensure_active(deposit: &Deposit) -> Result<()> {
    if deposit.is_redeemed() {
        engine_bail!(EngineErrorCode::WexelNotFound, wexel_id => deposit.id);
    }
    Ok(())
}

/// Empréstimo possível para um wexel livre.
pub fn quote_loan(deposit: &Deposit, ltv_bps: Bps) -> Result<Amount> {
    ensure_active(deposit)?;
    if deposit.is_collateralized {
        engine_bail!(EngineErrorCode::WexelAlreadyCollateralized, wexel_id => deposit.id);
    }
    loan_amount(deposit.principal, ltv_bps)
}

pub fn collateralize(deposit: &Deposit, ltv_bps: Bps) -> Result<Deposit> {
    let loan = quote_loan(deposit, ltv_bps)?;
    ensure_nonzero(loan.base_units(), "loan_amount")?;
    let mut next = deposit.clone();
    next.is_collateralized = true;
    next.loan_amount = Some(loan);
    Ok(next)
}

/// Abate `amount` do saldo. Zero ou acima do saldo em aberto → `InvalidArgument`.
pub fn repay(deposit: &Deposit, amount: Amount) -> Result<Deposit> {
    ensure_active(deposit)?;
    if !deposit.is_collateralized {
        engine_bail!(EngineErrorCode::WexelNotCollateralized, wexel_id => deposit.id);
    }
    ensure_nonzero(amount.base_units(), "repay_amount")?;
    let outstanding = deposit.outstanding_loan();
    if amount > outstanding {
        engine_bail!(EngineErrorCode::InvalidArgument, campo => "repay_amount", valor => amount, max => outstanding);
    }
    let left = outstanding.checked_sub(amount)?;
    let mut next = deposit.clone();
    if left.is_zero() {
        next.is_collateralized = false;
        next.loan_amount = None;
    } else {
        next.loan_amount = Some(left);
    }
    Ok(next)
}

// -------------------------
// TESTES
// -------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{DepositStatus, PoolTerms, DEFAULT_LTV_BPS};
    use chrono::{TimeZone, Utc};

    fn usd(v: u128) -> Amount {
        Amount::from_usd(v).unwrap()
    }

    fn deposit() -> Deposit {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Deposit {
            id: 9,
            pool_id: 1,
            owner: "wallet-a".into(),
            principal: usd(1_000),
            boost_value: Amount::ZERO,
            boosts: Vec::new(),
            terms: PoolTerms { base_apy_bps: 1_800, boost_target_bps: 3_000, boost_max_bps: 1_000 },
            effective_apy_bps: 1_800,
            created_at: t0,
            maturity_date: t0,
            is_collateralized: false,
            loan_amount: None,
            accrued_rewards: Amount::ZERO,
            claimed_rewards: Amount::ZERO,
            last_accrued_day: 0,
            status: DepositStatus::Active,
            version: 0,
        }
    }

    #[test]
    fn t_loan_amount_60pct() {
        assert_eq!(loan_amount(Amount::from_base_units(1_000_000_000), 6_000).unwrap(), Amount::from_base_units(600_000_000));
        assert_eq!(loan_amount(Amount::from_base_units(3), 6_000).unwrap(), Amount::from_base_units(1));
        assert!(loan_amount(usd(1), 10_001).is_err());
    }

    #[test]
    fn t_collateralize_repay_cycle() {
        let d = collateralize(&deposit(), DEFAULT_LTV_BPS).unwrap();
        assert!(d.is_collateralized);
        assert_eq!(d.loan_amount, Some(usd(600)));
        assert_eq!(
            collateralize(&d, DEFAULT_LTV_BPS).unwrap_err().code,
            EngineErrorCode::WexelAlreadyCollateralized
        );

        let d = repay(&d, usd(600)).unwrap();
        assert!(!d.is_collateralized);
        assert_eq!(d.loan_amount, None);
        assert_eq!(repay(&d, usd(600)).unwrap_err().code, EngineErrorCode::WexelNotCollateralized);

        // re-colateralizar é permitido
        assert!(collateralize(&d, DEFAULT_LTV_BPS).is_ok());
    }

    #[test]
    fn t_partial_repay() {
        let d = collateralize(&deposit(), DEFAULT_LTV_BPS).unwrap();
        let d = repay(&d, usd(250)).unwrap();
        assert!(d.is_collateralized);
        assert_eq!(d.outstanding_loan(), usd(350));
        assert_eq!(repay(&d, usd(351)).unwrap_err().code, EngineErrorCode::InvalidArgument);
        assert_eq!(repay(&d, Amount::ZERO).unwrap_err().code, EngineErrorCode::InvalidArgument);
        let d = repay(&d, usd(350)).unwrap();
        assert!(!d.is_collateralized);
    }

    #[test]
    fn t_zero_ltv_rejected() {
        assert_eq!(collateralize(&deposit(), 0).unwrap_err().code, EngineErrorCode::InvalidArgument);
        assert_eq!(quote_loan(&deposit(), 5_000).unwrap(), usd(500));
    }
}
