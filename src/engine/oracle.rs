//! Agregador de preços: uma cotação corrente por (mint, fonte), leitura
//! *last-writer-wins* entre fontes. Desvio e frescor são políticas do chamador.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use super::amount::Amount;
use super::error::Result;
use super::error_catalog::EngineErrorCode;
use super::guardrails::ensure_nonzero;
use super::ports::{Clock, PriceSource};
use super::types::{Bps, PriceQuote, BPS_SCALE, U256};
use crate::{engine_bail, engine_err};

pub const DEFAULT_SOURCES: &[&str] = &["pyth", "chainlink", "dex", "cex", "coingecko", "binance", "jupiter", "manual"];
pub const AGGREGATED_SOURCE: &str = "aggregated";

type SourceMap = BTreeMap<String, PriceQuote>;

pub struct PriceOracleAggregator<C: Clock> {
    clock: C,
    valid_sources: Vec<String>,
    quotes: RwLock<BTreeMap<String, SourceMap>>,
}

impl<C: Clock> PriceOracleAggregator<C> {
    pub fn new<S: AsRef<str>>(clock: C, valid_sources: &[S]) -> Self {
        Self {
            clock,
            valid_sources: valid_sources.iter().map(|s| s.as_ref().to_ascii_lowercase()).collect(),
            quotes: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_default_sources(clock: C) -> Self {
        Self::new(clock, DEFAULT_SOURCES)
    }

    fn normalize_source(&self, source: &str) -> Result<String> {
        let normalized = source.trim().to_ascii_lowercase();
        if !self.valid_sources.iter().any(|s| *s == normalized) {
            engine_bail!(EngineErrorCode::InvalidPriceSource, source => source, valid_sources => self.valid_sources.join(","));
        }
        Ok(normalized)
    }

    /// Upsert idempotente por (mint, fonte); sobrescreve valor e timestamp, sem histórico.
    pub fn update_price(&self, token_mint: &str, price_usd: Amount, source: &str) -> Result<PriceQuote> {
        if token_mint.trim().is_empty() {
            engine_bail!(EngineErrorCode::InvalidArgument, campo => "token_mint");
        }
        ensure_nonzero(price_usd.base_units(), "price_usd")?;
        let source = self.normalize_source(source)?;

        let quote = PriceQuote {
            token_mint: token_mint.to_string(),
            price_usd,
            source: source.clone(),
            updated_at: self.clock.now(),
        };
        let mut guard = self.quotes.write().unwrap_or_else(|e| e.into_inner());
        guard
            .entry(token_mint.to_string())
            .or_default()
            .insert(source, quote.clone());
        tracing::debug!(token_mint, source = %quote.source, price = %quote.price_usd, "price updated");
        Ok(quote)
    }

    /// Com `source`: a cotação daquele par. Sem: a mais recente entre todas as fontes
    /// (empate em `updated_at` → última fonte em ordem lexical).
    pub fn get_price(&self, token_mint: &str, source: Option<&str>) -> Result<PriceQuote> {
        let not_found = || engine_err!(EngineErrorCode::PriceNotFound, token_mint => token_mint);
        let guard = self.quotes.read().unwrap_or_else(|e| e.into_inner());
        let per_source = guard.get(token_mint).ok_or_else(not_found)?;
        match source {
            Some(src) => {
                let key = src.trim().to_ascii_lowercase();
                per_source
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| not_found().with_context("source", key))
            }
            None => per_source
                .values()
                .max_by_key(|q| q.updated_at)
                .cloned()
                .ok_or_else(not_found),
        }
    }

    /// Todas as cotações correntes de um token, uma por fonte.
    pub fn quotes_for(&self, token_mint: &str) -> Vec<PriceQuote> {
        let guard = self.quotes.read().unwrap_or_else(|e| e.into_inner());
        guard
            .get(token_mint)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Todas as cotações, mais recentes primeiro.
    pub fn all_prices(&self) -> Vec<PriceQuote> {
        let guard = self.quotes.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<PriceQuote> = guard.values().flat_map(|m| m.values().cloned()).collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all
    }

    pub fn supported_tokens(&self) -> Vec<String> {
        let guard = self.quotes.read().unwrap_or_else(|e| e.into_inner());
        guard.keys().cloned().collect()
    }
}

impl<C: Clock> PriceSource for PriceOracleAggregator<C> {
    fn latest_price(&self, token_mint: &str) -> Result<PriceQuote> {
        self.get_price(token_mint, None)
    }
}

#[inline]
pub fn is_fresh(quote: &PriceQuote, now: DateTime<Utc>, max_age: Duration) -> bool {
    now.signed_duration_since(quote.updated_at) < max_age
}

/// Mediana das cotações (par: média floor dos dois centrais, fonte `aggregated`).
pub fn median_quote(quotes: &[PriceQuote]) -> Result<PriceQuote> {
    if quotes.is_empty() {
        engine_bail!(EngineErrorCode::PriceNotFound, token_mint => "-");
    }
    let mut sorted: Vec<&PriceQuote> = quotes.iter().collect();
    sorted.sort_by_key(|q| q.price_usd);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        return Ok(sorted[mid].clone());
    }
    let (lo, hi) = (sorted[mid - 1], sorted[mid]);
    let sum = lo.price_usd.checked_add(hi.price_usd)?;
    Ok(PriceQuote {
        token_mint: hi.token_mint.clone(),
        price_usd: Amount::from_base_units(sum.base_units() / 2),
        source: AGGREGATED_SOURCE.to_string(),
        updated_at: lo.updated_at.max(hi.updated_at),
    })
}

/// Política do chamador: toda fonte deve ficar a no máximo `max_deviation_bps` da mediana.
/// Devolve a mediana quando o conjunto é aceito.
pub fn check_deviation(quotes: &[PriceQuote], max_deviation_bps: Bps) -> Result<PriceQuote> {
    let median = median_quote(quotes)?;
    let m = U256::from(median.price_usd.base_units());
    if m.is_zero() {
        engine_bail!(EngineErrorCode::InvalidArgument, campo => "median_price");
    }
    let scale = U256::from(BPS_SCALE);
    for quote in quotes {
        let p = U256::from(quote.price_usd.base_units());
        let diff = if p > m { p - m } else { m - p };
        // diff/m > max/10_000  ⇔  diff*10_000 > max*m
        if diff * scale > U256::from(max_deviation_bps) * m {
            let deviation_bps = diff * scale / m;
            engine_bail!(
                EngineErrorCode::PriceDeviationTooHigh,
                deviation_bps => deviation_bps,
                max_deviation_bps => max_deviation_bps,
                source => &quote.source,
            );
        }
    }
    Ok(median)
}

// -------------------------
// TESTES
// -------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ports::ManualClock;
    use chrono::TimeZone;
    use std::sync::Arc;

    const SOL: &str = "So11111111111111111111111111111111111111112";

    fn setup() -> (Arc<ManualClock>, PriceOracleAggregator<Arc<ManualClock>>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        let oracle = PriceOracleAggregator::with_default_sources(clock.clone());
        (clock, oracle)
    }

    fn px(usd_cents: u128) -> Amount {
        Amount::from_base_units(usd_cents * 10_000)
    }

    #[test]
    fn t_most_recent_wins_across_sources() {
        let (clock, oracle) = setup();
        oracle.update_price(SOL, px(15_000), "pyth").unwrap();
        clock.advance(Duration::seconds(10));
        oracle.update_price(SOL, px(15_100), "Binance").unwrap();

        let q = oracle.get_price(SOL, None).unwrap();
        assert_eq!(q.source, "binance");
        assert_eq!(q.price_usd, px(15_100));

        let q = oracle.get_price(SOL, Some("pyth")).unwrap();
        assert_eq!(q.price_usd, px(15_000));
    }

    #[test]
    fn t_not_found_cases() {
        let (_clock, oracle) = setup();
        assert_eq!(oracle.get_price(SOL, None).unwrap_err().code, EngineErrorCode::PriceNotFound);
        oracle.update_price(SOL, px(1), "dex").unwrap();
        assert_eq!(oracle.get_price(SOL, Some("cex")).unwrap_err().code, EngineErrorCode::PriceNotFound);
    }

    #[test]
    fn t_upsert_is_idempotent_except_timestamp() {
        let (clock, oracle) = setup();
        let a = oracle.update_price(SOL, px(100), "pyth").unwrap();
        clock.advance(Duration::seconds(1));
        let b = oracle.update_price(SOL, px(100), "pyth").unwrap();
        assert_eq!(a.price_usd, b.price_usd);
        assert_eq!(a.source, b.source);
        assert!(b.updated_at > a.updated_at);
        assert_eq!(oracle.quotes_for(SOL).len(), 1);
    }

    #[test]
    fn t_rejects_unknown_source_and_zero_price() {
        let (_clock, oracle) = setup();
        let err = oracle.update_price(SOL, px(1), "random-feed").unwrap_err();
        assert_eq!(err.code, EngineErrorCode::InvalidPriceSource);
        let err = oracle.update_price(SOL, Amount::ZERO, "pyth").unwrap_err();
        assert_eq!(err.code, EngineErrorCode::InvalidArgument);
    }

    #[test]
    fn t_median_and_deviation() {
        let (_clock, oracle) = setup();
        oracle.update_price(SOL, px(100), "pyth").unwrap();
        oracle.update_price(SOL, px(102), "dex").unwrap();
        oracle.update_price(SOL, px(104), "cex").unwrap();
        let m = check_deviation(&oracle.quotes_for(SOL), 1_500).unwrap();
        assert_eq!(m.price_usd, px(102));

        oracle.update_price(SOL, px(150), "binance").unwrap();
        let quotes = oracle.quotes_for(SOL);
        // par: (102 + 104) / 2 = 103
        assert_eq!(median_quote(&quotes).unwrap().price_usd, px(103));
        assert_eq!(median_quote(&quotes).unwrap().source, AGGREGATED_SOURCE);
        let err = check_deviation(&quotes, 1_500).unwrap_err();
        assert_eq!(err.code, EngineErrorCode::PriceDeviationTooHigh);
        assert_eq!(err.context.get("source").map(String::as_str), Some("binance"));
    }

    #[test]
    fn t_freshness_and_listing() {
        let (clock, oracle) = setup();
        let q = oracle.update_price(SOL, px(100), "pyth").unwrap();
        oracle.update_price("USDT", px(100), "manual").unwrap();
        assert!(is_fresh(&q, clock.now(), Duration::minutes(5)));
        clock.advance(Duration::minutes(5));
        assert!(!is_fresh(&q, clock.now(), Duration::minutes(5)));
        assert_eq!(oracle.all_prices().len(), 2);
        assert_eq!(oracle.supported_tokens(), vec![SOL.to_string(), "USDT".to_string()]);
    }
}
