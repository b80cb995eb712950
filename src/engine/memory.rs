//! Adaptadores em memória das portas de persistência (testes, demo).

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::error::Result;
use super::error_catalog::EngineErrorCode;
use super::ports::{DepositRepository, PoolRepository};
use super::types::{Deposit, Pool, PoolId, WexelId};
use crate::{engine_bail, engine_err};

#[derive(Debug, Default)]
pub struct InMemoryPools {
    rows: RwLock<BTreeMap<PoolId, Pool>>,
}

impl InMemoryPools {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PoolRepository for InMemoryPools {
    fn get_by_id(&self, id: PoolId) -> Result<Option<Pool>> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        Ok(rows.get(&id).cloned())
    }

    fn upsert(&self, pool: Pool) -> Result<()> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        rows.insert(pool.id, pool);
        Ok(())
    }

    fn list_active(&self) -> Result<Vec<Pool>> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        Ok(rows.values().filter(|p| p.is_active).cloned().collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDeposits {
    rows: RwLock<BTreeMap<WexelId, Deposit>>,
}

impl InMemoryDeposits {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DepositRepository for InMemoryDeposits {
    fn get_by_id(&self, id: WexelId) -> Result<Option<Deposit>> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        Ok(rows.get(&id).cloned())
    }

    fn upsert(&self, mut deposit: Deposit, expected_version: Option<u64>) -> Result<Deposit> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        // compare-and-swap sob o write lock
        let stored = rows.get(&deposit.id).map(|d| d.version);
        let next_version = match (stored, expected_version) {
            (None, None) => 1,
            (Some(current), Some(expected)) if current == expected => current + 1,
            (None, Some(_)) => engine_bail!(EngineErrorCode::WexelNotFound, wexel_id => deposit.id),
            (Some(current), _) => {
                return Err(engine_err!(
                    EngineErrorCode::VersionConflict,
                    wexel_id => deposit.id,
                    stored => current,
                    expected => expected_version.map_or_else(|| "none".to_string(), |v| v.to_string()),
                ))
            }
        };
        deposit.version = next_version;
        rows.insert(deposit.id, deposit.clone());
        Ok(deposit)
    }

    fn list_active(&self) -> Result<Vec<Deposit>> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        Ok(rows.values().filter(|d| !d.is_redeemed()).cloned().collect())
    }

    fn count_for_pool(&self, pool_id: PoolId) -> Result<usize> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        Ok(rows.values().filter(|d| d.pool_id == pool_id).count())
    }
}
