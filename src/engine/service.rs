//! Serviço de aplicação: orquestra pools, wexels, oráculo e métricas sobre as portas.
//!
//! Toda mutação de wexel segue ler → calcular → `upsert(expected_version)`. Um
//! escritor concorrente faz o commit falhar com `VersionConflict`; o chamador relê
//! e tenta de novo (é o único erro retryable do catálogo).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::amount::Amount;
use super::boost::{boost_progress_bps, boost_target, remaining_capacity, BoostEngine};
use super::collateral;
use super::error::Result;
use super::error_catalog::EngineErrorCode;
use super::lifecycle::{self, Redemption};
use super::oracle::{check_deviation, is_fresh, PriceOracleAggregator};
use super::pool::{apply_pool_update, validate_pool, PoolUpdate};
use super::ports::{Clock, DepositRepository, MetricsSink, PoolRepository};
use super::types::{Bps, Deposit, Pool, PoolId, PriceQuote, WexelId};
use super::yield_calc::{project_deposit, BoostQuote, DepositProjection, PayoutFrequency, ProjectionMarket};
use crate::config::EngineConfig;
use crate::obs::wrap;
use crate::telemetry::make_info_span;
use crate::{engine_bail, engine_err};

pub const OPS_COUNTER: &str = "wexel_ops_total";
pub const APY_GAUGE: &str = "wexel_effective_apy_bps";
pub const PRICE_GAUGE: &str = "oracle_price_usd";

/// Quem pede a operação: carteira autenticada + estado de KYC.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub wallet: String,
    pub kyc_verified: bool,
}

impl Actor {
    pub fn new(wallet: impl Into<String>, kyc_verified: bool) -> Self {
        Self { wallet: wallet.into(), kyc_verified }
    }
}

/// Fotografia do boost de um wexel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostPosition {
    pub target: Amount,
    pub boost_value: Amount,
    pub remaining: Amount,
    pub progress_bps: Bps,
    pub effective_apy_bps: Bps,
}

/// Resultado de uma varredura de accrual.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccrualRun {
    pub scanned: usize,
    pub updated: usize,
    pub conflicts: usize,
    pub credited: Amount,
}

pub struct WexelService<PR, DR, C, M>
where
    C: Clock,
{
    pools: PR,
    deposits: DR,
    oracle: Arc<PriceOracleAggregator<C>>,
    clock: C,
    metrics: M,
    config: EngineConfig,
    next_id: AtomicU64,
}

impl<PR, DR, C, M> WexelService<PR, DR, C, M>
where
    PR: PoolRepository,
    DR: DepositRepository,
    C: Clock,
    M: MetricsSink,
{
    pub fn new(
        pools: PR,
        deposits: DR,
        oracle: Arc<PriceOracleAggregator<C>>,
        clock: C,
        metrics: M,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { pools, deposits, oracle, clock, metrics, config, next_id: AtomicU64::new(1) })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn oracle(&self) -> &PriceOracleAggregator<C> {
        &self.oracle
    }

    /// Span + histograma de duração + contador por resultado.
    fn observe<T>(&self, op: &'static str, subject: u64, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let span = make_info_span(op, subject, "wexel_service");
        let _guard = span.enter();
        let out = wrap::time(op, f);
        match &out {
            Ok(_) => {
                info!(op, subject, "ok");
                self.metrics.incr_counter(OPS_COUNTER, 1, &[("op", op.to_string()), ("outcome", "ok".to_string())]);
            }
            Err(err) => {
                warn!(op, subject, error = %err.to_log_json(), "falhou");
                self.metrics.incr_counter(
                    OPS_COUNTER,
                    1,
                    &[("op", op.to_string()), ("outcome", err.code.code().to_string())],
                );
            }
        }
        out
    }

    fn load_pool(&self, pool_id: PoolId) -> Result<Pool> {
        self.pools
            .get_by_id(pool_id)?
            .ok_or_else(|| engine_err!(EngineErrorCode::PoolNotFound, pool_id => pool_id))
    }

    fn load_deposit(&self, wexel_id: WexelId) -> Result<Deposit> {
        match self.deposits.get_by_id(wexel_id)? {
            Some(d) if !d.is_redeemed() => Ok(d),
            _ => engine_bail!(EngineErrorCode::WexelNotFound, wexel_id => wexel_id),
        }
    }

    fn load_owned(&self, actor: &Actor, wexel_id: WexelId) -> Result<Deposit> {
        let deposit = self.load_deposit(wexel_id)?;
        if deposit.owner != actor.wallet {
            engine_bail!(EngineErrorCode::UnauthorizedWallet, wallet => &actor.wallet, wexel_id => wexel_id);
        }
        Ok(deposit)
    }

    #[inline]
    fn commit(&self, read: &Deposit, next: Deposit) -> Result<Deposit> {
        self.deposits.upsert(next, Some(read.version))
    }

    fn allocate_id(&self) -> Result<WexelId> {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if self.deposits.get_by_id(id)?.is_none() {
                return Ok(id);
            }
        }
    }

    fn ltv_for(&self, pool: &Pool) -> Bps {
        pool.ltv_bps.unwrap_or(self.config.default_ltv_bps)
    }

    fn boost_engine(&self) -> BoostEngine<Arc<PriceOracleAggregator<C>>> {
        BoostEngine::new(Arc::clone(&self.oracle), self.config.max_boost_fraction_bps)
    }

    // ---------------- pools ----------------

    pub fn create_pool(&self, pool: Pool) -> Result<Pool> {
        self.observe("create_pool", pool.id, || {
            validate_pool(&pool)?;
            if self.pools.get_by_id(pool.id)?.is_some() {
                engine_bail!(EngineErrorCode::InvalidArgument, campo => "pool_id", valor => pool.id);
            }
            self.pools.upsert(pool.clone())?;
            Ok(pool)
        })
    }

    pub fn update_pool(&self, pool_id: PoolId, update: &PoolUpdate) -> Result<Pool> {
        self.observe("update_pool", pool_id, || {
            let pool = self.load_pool(pool_id)?;
            let has_deposits = self.deposits.count_for_pool(pool_id)? > 0;
            let next = apply_pool_update(&pool, update, has_deposits)?;
            self.pools.upsert(next.clone())?;
            Ok(next)
        })
    }

    pub fn get_pool(&self, pool_id: PoolId) -> Result<Pool> {
        self.load_pool(pool_id)
    }

    pub fn list_active_pools(&self) -> Result<Vec<Pool>> {
        self.pools.list_active()
    }

    // ---------------- preços ----------------

    pub fn update_price(&self, token_mint: &str, price_usd: Amount, source: &str) -> Result<PriceQuote> {
        self.observe("update_price", 0, || {
            let quote = self.oracle.update_price(token_mint, price_usd, source)?;
            self.metrics.record_gauge(
                PRICE_GAUGE,
                quote.price_usd.base_units() as f64 / 1e6,
                &[("token_mint", quote.token_mint.clone()), ("source", quote.source.clone())],
            );
            Ok(quote)
        })
    }

    pub fn get_price(&self, token_mint: &str, source: Option<&str>) -> Result<PriceQuote> {
        self.oracle.get_price(token_mint, source)
    }

    /// Mediana das cotações frescas, recusada se alguma fonte desviar além do limite configurado.
    pub fn reference_price(&self, token_mint: &str) -> Result<PriceQuote> {
        self.observe("reference_price", 0, || {
            let now = self.clock.now();
            let max_age = self.config.price_max_age();
            let fresh: Vec<PriceQuote> = self
                .oracle
                .quotes_for(token_mint)
                .into_iter()
                .filter(|q| is_fresh(q, now, max_age))
                .collect();
            if fresh.is_empty() {
                engine_bail!(EngineErrorCode::PriceNotFound, token_mint => token_mint);
            }
            check_deviation(&fresh, self.config.max_price_deviation_bps)
        })
    }

    // ---------------- wexels ----------------

    pub fn open_deposit(&self, actor: &Actor, pool_id: PoolId, principal: Amount) -> Result<Deposit> {
        self.observe("open_deposit", pool_id, || {
            let pool = self.load_pool(pool_id)?;
            let id = self.allocate_id()?;
            let deposit = lifecycle::open_deposit(id, &pool, &actor.wallet, principal, self.clock.now())?;
            self.deposits.upsert(deposit, None)
        })
    }

    pub fn get_deposit(&self, wexel_id: WexelId) -> Result<Deposit> {
        self.load_deposit(wexel_id)
    }

    /// Fecha o accrual no APY antigo e aplica o boost no mesmo commit.
    pub fn apply_boost(&self, actor: &Actor, wexel_id: WexelId, token_mint: &str, token_amount: Amount) -> Result<Deposit> {
        self.observe("apply_boost", wexel_id, || {
            let deposit = self.load_owned(actor, wexel_id)?;
            let next = self.boost_engine().apply_boost_at(&deposit, token_mint, token_amount, self.clock.now())?;
            let saved = self.commit(&deposit, next)?;
            self.metrics.record_gauge(
                APY_GAUGE,
                f64::from(saved.effective_apy_bps),
                &[("wexel_id", saved.id.to_string())],
            );
            Ok(saved)
        })
    }

    pub fn boost_position(&self, wexel_id: WexelId) -> Result<BoostPosition> {
        let deposit = self.load_deposit(wexel_id)?;
        Ok(BoostPosition {
            target: boost_target(deposit.principal, &deposit.terms)?,
            boost_value: deposit.boost_value,
            remaining: remaining_capacity(&deposit)?,
            progress_bps: boost_progress_bps(&deposit)?,
            effective_apy_bps: deposit.effective_apy_bps,
        })
    }

    /// Accrual de um wexel até hoje. Sem dias novos não há escrita.
    pub fn accrue(&self, wexel_id: WexelId) -> Result<(Deposit, Amount)> {
        self.observe("accrue", wexel_id, || {
            let deposit = self.load_deposit(wexel_id)?;
            self.accrue_loaded(&deposit)
        })
    }

    fn accrue_loaded(&self, deposit: &Deposit) -> Result<(Deposit, Amount)> {
        let (next, credited) = lifecycle::accrue(deposit, self.clock.now())?;
        if credited.is_zero() && next.last_accrued_day == deposit.last_accrued_day {
            return Ok((next, credited));
        }
        Ok((self.commit(deposit, next)?, credited))
    }

    /// Varre os wexels ativos. Conflitos de versão são contados e pulados:
    /// o próximo ciclo do agendador pega o que faltou.
    pub fn accrue_all(&self) -> Result<AccrualRun> {
        self.observe("accrue_all", 0, || {
            let mut run = AccrualRun::default();
            for deposit in self.deposits.list_active()? {
                run.scanned += 1;
                match self.accrue_loaded(&deposit) {
                    Ok((_, credited)) if credited.is_zero() => {}
                    Ok((_, credited)) => {
                        run.updated += 1;
                        run.credited = run.credited.checked_add(credited)?;
                    }
                    Err(err) if err.code.is_retryable() => {
                        warn!(wexel_id = deposit.id, "accrual adiado por conflito de versão");
                        run.conflicts += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
            Ok(run)
        })
    }

    pub fn claim(&self, actor: &Actor, wexel_id: WexelId, amount: Amount) -> Result<Deposit> {
        self.observe("claim", wexel_id, || {
            let deposit = self.load_owned(actor, wexel_id)?;
            let next = lifecycle::claim(&deposit, amount)?;
            self.commit(&deposit, next)
        })
    }

    pub fn quote_loan(&self, wexel_id: WexelId) -> Result<Amount> {
        let deposit = self.load_deposit(wexel_id)?;
        let pool = self.load_pool(deposit.pool_id)?;
        collateral::quote_loan(&deposit, self.ltv_for(&pool))
    }

    pub fn collateralize(&self, actor: &Actor, wexel_id: WexelId) -> Result<Deposit> {
        self.observe("collateralize", wexel_id, || {
            if self.config.kyc_required_for_collateral && !actor.kyc_verified {
                engine_bail!(EngineErrorCode::KycRequired, wallet => &actor.wallet);
            }
            let deposit = self.load_owned(actor, wexel_id)?;
            let pool = self.load_pool(deposit.pool_id)?;
            let next = collateral::collateralize(&deposit, self.ltv_for(&pool))?;
            self.commit(&deposit, next)
        })
    }

    pub fn repay(&self, actor: &Actor, wexel_id: WexelId, amount: Amount) -> Result<Deposit> {
        self.observe("repay", wexel_id, || {
            let deposit = self.load_owned(actor, wexel_id)?;
            let next = collateral::repay(&deposit, amount)?;
            self.commit(&deposit, next)
        })
    }

    /// Fecha o accrual do prazo e resgata no mesmo commit.
    pub fn redeem(&self, actor: &Actor, wexel_id: WexelId) -> Result<Redemption> {
        self.observe("redeem", wexel_id, || {
            let deposit = self.load_owned(actor, wexel_id)?;
            let now = self.clock.now();
            let (accrued, _) = lifecycle::accrue(&deposit, now)?;
            let (next, redemption) = lifecycle::redeem(&accrued, now)?;
            self.commit(&deposit, next)?;
            Ok(redemption)
        })
    }

    /// Projeção para um depósito hipotético de `principal` no pool, pelo prazo do pool.
    /// Com `boost_mint`, o token é cotado no oráculo e o alvo entra preenchido.
    pub fn project(
        &self,
        pool_id: PoolId,
        principal: Amount,
        frequency: PayoutFrequency,
        boost_mint: Option<&str>,
    ) -> Result<DepositProjection> {
        let pool = self.load_pool(pool_id)?;
        let boost = match boost_mint {
            Some(mint) => Some(BoostQuote {
                price_usd: self.oracle.get_price(mint, None)?.price_usd,
                discount_bps: self.config.boost_discount_bps,
            }),
            None => None,
        };
        let market = ProjectionMarket {
            takara_apr_bps: self.config.takara_apr_bps,
            takara_price_usd: self.config.takara_price_usd,
            max_boost_fraction_bps: self.config.max_boost_fraction_bps,
            boost,
        };
        project_deposit(principal, &pool, frequency, &market)
    }
}
