//! Portas do motor: persistência, relógio, preço e métricas.
//! O núcleo de cálculo nunca fala com storage diretamente; tudo entra pelo construtor.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::error::Result;
use super::types::{Deposit, Pool, PoolId, PriceQuote, WexelId};

/// Repositório de pools (chave por id).
pub trait PoolRepository: Send + Sync {
    fn get_by_id(&self, id: PoolId) -> Result<Option<Pool>>;
    fn upsert(&self, pool: Pool) -> Result<()>;
    fn list_active(&self) -> Result<Vec<Pool>>;
}

/// Repositório de wexels com lock otimista.
pub trait DepositRepository: Send + Sync {
    fn get_by_id(&self, id: WexelId) -> Result<Option<Deposit>>;
    /// Grava `deposit` se a versão armazenada for `expected_version`
    /// (`None` = o registro não pode existir). A versão gravada é `expected + 1`
    /// (1 para registros novos); conflito → `VersionConflict`.
    fn upsert(&self, deposit: Deposit, expected_version: Option<u64>) -> Result<Deposit>;
    fn list_active(&self) -> Result<Vec<Deposit>>;
    fn count_for_pool(&self, pool_id: PoolId) -> Result<usize>;
}

impl<T: PoolRepository + ?Sized> PoolRepository for Arc<T> {
    fn get_by_id(&self, id: PoolId) -> Result<Option<Pool>> {
        (**self).get_by_id(id)
    }
    fn upsert(&self, pool: Pool) -> Result<()> {
        (**self).upsert(pool)
    }
    fn list_active(&self) -> Result<Vec<Pool>> {
        (**self).list_active()
    }
}

impl<T: DepositRepository + ?Sized> DepositRepository for Arc<T> {
    fn get_by_id(&self, id: WexelId) -> Result<Option<Deposit>> {
        (**self).get_by_id(id)
    }
    fn upsert(&self, deposit: Deposit, expected_version: Option<u64>) -> Result<Deposit> {
        (**self).upsert(deposit, expected_version)
    }
    fn list_active(&self) -> Result<Vec<Deposit>> {
        (**self).list_active()
    }
    fn count_for_pool(&self, pool_id: PoolId) -> Result<usize> {
        (**self).count_for_pool(pool_id)
    }
}

/// Fonte de preço corrente para um token (qualquer fonte, a mais recente).
pub trait PriceSource {
    fn latest_price(&self, token_mint: &str) -> Result<PriceQuote>;
}

impl<T: PriceSource + ?Sized> PriceSource for Arc<T> {
    fn latest_price(&self, token_mint: &str) -> Result<PriceQuote> {
        (**self).latest_price(token_mint)
    }
}

impl<T: PriceSource + ?Sized> PriceSource for &T {
    fn latest_price(&self, token_mint: &str) -> Result<PriceQuote> {
        (**self).latest_price(token_mint)
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Relógio controlado manualmente (testes, simulações).
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Porta de observabilidade (contadores/gauges) injetada no serviço.
pub trait MetricsSink: Send + Sync {
    fn incr_counter(&self, name: &'static str, value: u64, labels: &[(&'static str, String)]);
    fn record_gauge(&self, name: &'static str, value: f64, labels: &[(&'static str, String)]);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr_counter(&self, _name: &'static str, _value: u64, _labels: &[(&'static str, String)]) {}
    fn record_gauge(&self, _name: &'static str, _value: f64, _labels: &[(&'static str, String)]) {}
}

impl<T: MetricsSink + ?Sized> MetricsSink for Arc<T> {
    fn incr_counter(&self, name: &'static str, value: u64, labels: &[(&'static str, String)]) {
        (**self).incr_counter(name, value, labels)
    }
    fn record_gauge(&self, name: &'static str, value: f64, labels: &[(&'static str, String)]) {
        (**self).record_gauge(name, value, labels)
    }
}
