use anyhow::Result;
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use wexel_core::engine::memory::{InMemoryDeposits, InMemoryPools};
use wexel_core::engine::ports::{Clock, ManualClock, SystemClock};
use wexel_core::engine::{Actor, Amount, PayoutFrequency, Pool, PriceOracleAggregator, WexelService};
use wexel_core::{telemetry, EngineConfig};

/// Ciclo completo de um wexel sobre adaptadores em memória, com o relógio
/// avançado manualmente até o vencimento.
#[tokio::main]
async fn main() -> Result<()> {
    let tel = telemetry::init("wexel-core")?;
    let config = EngineConfig::from_env()?;

    // parte do relógio de parede e avança à mão
    let clock = Arc::new(ManualClock::new(SystemClock.now()));
    let oracle = Arc::new(PriceOracleAggregator::new(Arc::clone(&clock), config.valid_sources.as_slice()));
    let svc = WexelService::new(
        InMemoryPools::new(),
        InMemoryDeposits::new(),
        oracle,
        Arc::clone(&clock),
        tel.metrics_sink(),
        config,
    )?;

    svc.create_pool(Pool::with_defaults(1, 1_800, 12, Amount::from_usd(100)?))?;

    let alice = Actor::new("alice-wallet", true);
    svc.update_price("SOL", "150".parse()?, "pyth")?;
    svc.update_price("SOL", "151.5".parse()?, "jupiter")?;
    let projection = svc.project(1, Amount::from_usd(1_000)?, PayoutFrequency::Quarterly, Some("SOL"))?;
    info!(
        projection = %serde_json::to_string(&projection)?,
        total = %projection.total_value_at_end,
        "projeção"
    );

    let t0 = Instant::now();
    let wexel = svc.open_deposit(&alice, 1, Amount::from_usd(1_000)?)?;
    let reference = svc.reference_price("SOL")?;
    info!(price = %reference.price_usd, source = %reference.source, "preço de referência");

    let boosted = svc.apply_boost(&alice, wexel.id, "SOL", "1.5".parse()?)?;
    let position = svc.boost_position(wexel.id)?;
    tel.boost_progress_bps.record(f64::from(position.progress_bps), &[KeyValue::new("pool_id", 1i64)]);
    info!(apy_bps = boosted.effective_apy_bps, remaining = %position.remaining, "boost aplicado");

    let loaned = svc.collateralize(&alice, wexel.id)?;
    info!(loan = %loaned.outstanding_loan(), "colateralizado");

    for _ in 0..12 {
        clock.advance(chrono::Duration::days(30));
        let run = svc.accrue_all()?;
        info!(credited = %run.credited, updated = run.updated, "accrual mensal");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    svc.repay(&alice, wexel.id, loaned.outstanding_loan())?;
    clock.advance(chrono::Duration::days(10));
    let redemption = svc.redeem(&alice, wexel.id)?;
    info!(
        principal = %redemption.principal,
        rewards = %redemption.unclaimed_rewards,
        "resgatado"
    );

    tel.op_latency_ms.record(t0.elapsed().as_secs_f64() * 1000.0, &[KeyValue::new("op", "lifecycle")]);
    tel.shutdown();
    Ok(())
}
