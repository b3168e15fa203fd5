// =============================================================================
// DataSourceCascade — cache → backend → exchange → synthetic
// =============================================================================
//
// Resolution order for one (market, interval, window) request:
//
//   1. Cache covers the window        -> cached slice            (cache)
//   2. Backend serves every gap       -> merge, slice from cache (backend)
//   3. Exchange serves the window     -> merge, slice from cache (exchange)
//   4. Everything failed              -> generated, NOT cached   (synthetic)
//
// Only candles from a real source are ever merged into the cache. Overlapping
// in-flight requests for the same key are not coalesced; the cache's write
// lock keeps their merges consistent.
// =============================================================================

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::CacheStore;
use crate::error::EngineResult;
use crate::market_data::{missing_ranges, Candle, CandleKey, CandleSeries, TimeWindow};
use crate::sources::{retain_valid, CandleSource, SyntheticGenerator};
use crate::types::Provenance;

/// Candles for the requested window plus the tier that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedCandles {
    pub candles: Vec<Candle>,
    pub provenance: Provenance,
}

pub struct DataSourceCascade {
    cache: Arc<CacheStore>,
    backend: Arc<dyn CandleSource>,
    exchange: Arc<dyn CandleSource>,
    synthetic: SyntheticGenerator,
}

impl DataSourceCascade {
    pub fn new(
        cache: Arc<CacheStore>,
        backend: Arc<dyn CandleSource>,
        exchange: Arc<dyn CandleSource>,
        synthetic: SyntheticGenerator,
    ) -> Self {
        Self {
            cache,
            backend,
            exchange,
            synthetic,
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Resolve a candle window. Never fails: a total remote outage yields a
    /// `Synthetic` result instead of an error.
    #[instrument(skip(self, window), name = "cascade::resolve", fields(window = %window))]
    pub async fn resolve(&self, market: &str, interval: &str, window: TimeWindow) -> ResolvedCandles {
        // ── 1. Cache ─────────────────────────────────────────────────────
        let cached = self.cache.get(market, interval).await;
        let missing = missing_ranges(cached.as_ref().map(CandleSeries::bounds), window);

        if missing.is_empty() {
            if let Some(series) = cached {
                let candles = series.slice(window);
                debug!(market, interval, count = candles.len(), "window served from cache");
                return ResolvedCandles {
                    candles,
                    provenance: Provenance::Cache,
                };
            }
        }

        // ── 2. Backend, one call per missing range ───────────────────────
        match self.fetch_ranges(self.backend.as_ref(), market, interval, &missing).await {
            Ok(fetched) => {
                return self
                    .store_and_slice(market, interval, window, fetched, Provenance::Backend)
                    .await;
            }
            Err(e) => warn!(market, interval, error = %e, "backend tier failed -- trying exchange"),
        }

        // ── 3. Exchange, full window ─────────────────────────────────────
        match self.exchange.fetch_candles(market, interval, window).await {
            Ok(fetched) => {
                let fetched = retain_valid(self.exchange.name(), market, fetched);
                return self
                    .store_and_slice(market, interval, window, fetched, Provenance::Exchange)
                    .await;
            }
            Err(e) => warn!(market, interval, error = %e, "exchange tier failed -- generating synthetic candles"),
        }

        // ── 4. Synthetic ─────────────────────────────────────────────────
        let candles = self.synthetic.generate(market, interval, window);
        warn!(market, interval, count = candles.len(), "serving synthetic candles (not cached)");
        ResolvedCandles {
            candles,
            provenance: Provenance::Synthetic,
        }
    }

    /// All-or-nothing: any failing range fails the tier.
    async fn fetch_ranges(
        &self,
        source: &dyn CandleSource,
        market: &str,
        interval: &str,
        ranges: &[TimeWindow],
    ) -> EngineResult<Vec<Candle>> {
        let mut fetched = Vec::new();
        for range in ranges {
            let candles = source.fetch_candles(market, interval, *range).await?;
            debug!(tier = source.name(), market, range = %range, count = candles.len(), "range fetched");
            fetched.extend(retain_valid(source.name(), market, candles));
        }
        Ok(fetched)
    }

    async fn store_and_slice(
        &self,
        market: &str,
        interval: &str,
        window: TimeWindow,
        fetched: Vec<Candle>,
        provenance: Provenance,
    ) -> ResolvedCandles {
        let fetched_count = fetched.len();
        self.cache.merge(market, interval, fetched.clone()).await;

        // Read back so gaps filled now and candles cached earlier come out
        // as one series. With unavailable storage, fall back to the batch.
        let candles = match self.cache.get(market, interval).await {
            Some(series) => series.slice(window),
            None => CandleSeries::from_candles(CandleKey::new(market, interval), fetched, 0)
                .map(|series| series.slice(window))
                .unwrap_or_default(),
        };

        info!(
            market,
            interval,
            provenance = %provenance,
            fetched = fetched_count,
            returned = candles.len(),
            "window resolved"
        );
        ResolvedCandles { candles, provenance }
    }
}

impl std::fmt::Debug for DataSourceCascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceCascade")
            .field("cache", &self.cache)
            .field("backend", &self.backend.name())
            .field("exchange", &self.exchange.name())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryPersistence, NoopPersistence};
    use crate::testing::{candle, MockSource};

    struct Fixture {
        cache: Arc<CacheStore>,
        backend: Arc<MockSource>,
        exchange: Arc<MockSource>,
        cascade: DataSourceCascade,
    }

    fn fixture(backend: MockSource, exchange: MockSource) -> Fixture {
        fixture_with_cache(
            Arc::new(CacheStore::new(Arc::new(MemoryPersistence::new()))),
            backend,
            exchange,
        )
    }

    fn fixture_with_cache(cache: Arc<CacheStore>, backend: MockSource, exchange: MockSource) -> Fixture {
        let backend = Arc::new(backend);
        let exchange = Arc::new(exchange);
        let cascade = DataSourceCascade::new(
            cache.clone(),
            backend.clone(),
            exchange.clone(),
            SyntheticGenerator::default(),
        );
        Fixture {
            cache,
            backend,
            exchange,
            cascade,
        }
    }

    fn timestamps(candles: &[Candle]) -> Vec<i64> {
        candles.iter().map(|c| c.timestamp).collect()
    }

    #[tokio::test]
    async fn covered_window_is_served_from_cache() {
        let fx = fixture(MockSource::failing("backend"), MockSource::failing("exchange"));
        fx.cache
            .merge("BTC-PERP", "1h", (100..=200).step_by(10).map(|t| candle(t, 1.0)).collect())
            .await;

        let resolved = fx.cascade.resolve("BTC-PERP", "1h", TimeWindow::new(120, 180)).await;

        assert_eq!(resolved.provenance, Provenance::Cache);
        assert_eq!(timestamps(&resolved.candles), vec![120, 130, 140, 150, 160, 170, 180]);
        assert_eq!(fx.backend.calls(), 0);
        assert_eq!(fx.exchange.calls(), 0);
    }

    #[tokio::test]
    async fn backend_fills_each_missing_range_and_merges() {
        let backend = MockSource::serving("backend", (0..=300).step_by(50).map(|t| candle(t, 2.0)).collect());
        let fx = fixture(backend, MockSource::failing("exchange"));
        fx.cache.merge("BTC-PERP", "1h", vec![candle(100, 1.0), candle(200, 1.0)]).await;

        let resolved = fx.cascade.resolve("BTC-PERP", "1h", TimeWindow::new(50, 250)).await;

        assert_eq!(resolved.provenance, Provenance::Backend);
        assert_eq!(
            fx.backend.requested(),
            vec![TimeWindow::new(50, 100), TimeWindow::new(200, 250)]
        );
        // 150 sits in the interior and was never requested.
        assert_eq!(timestamps(&resolved.candles), vec![50, 100, 200, 250]);
        assert_eq!(resolved.candles[1], candle(100, 2.0));
        assert_eq!(fx.cache.get("BTC-PERP", "1h").await.unwrap().bounds(), (50, 250));
        assert_eq!(fx.exchange.calls(), 0);
    }

    #[tokio::test]
    async fn backend_failure_falls_back_to_exchange_and_caches_it() {
        let exchange = MockSource::serving("exchange", vec![candle(10, 3.0), candle(20, 3.0)]);
        let fx = fixture(MockSource::failing("backend"), exchange);

        let resolved = fx.cascade.resolve("ETH-PERP", "1h", TimeWindow::new(10, 20)).await;

        assert_eq!(resolved.provenance, Provenance::Exchange);
        assert_eq!(timestamps(&resolved.candles), vec![10, 20]);
        assert_eq!(fx.exchange.requested(), vec![TimeWindow::new(10, 20)]);

        let cached = fx.cache.get("ETH-PERP", "1h").await.expect("exchange candles cached");
        assert_eq!(cached.candles(), &[candle(10, 3.0), candle(20, 3.0)]);
    }

    #[tokio::test]
    async fn partial_backend_failure_fails_the_whole_tier() {
        let backend = MockSource::failing_after("backend", 1, vec![candle(50, 2.0)]);
        let exchange = MockSource::serving("exchange", vec![candle(50, 4.0), candle(250, 4.0)]);
        let fx = fixture(backend, exchange);
        fx.cache.merge("BTC-PERP", "1h", vec![candle(100, 1.0), candle(200, 1.0)]).await;

        let resolved = fx.cascade.resolve("BTC-PERP", "1h", TimeWindow::new(50, 250)).await;

        assert_eq!(resolved.provenance, Provenance::Exchange);
        assert_eq!(fx.backend.calls(), 2);
        // Nothing from the half-finished backend tier was written.
        let cached = fx.cache.get("BTC-PERP", "1h").await.unwrap();
        assert_eq!(cached.candles()[0], candle(50, 4.0));
    }

    #[tokio::test]
    async fn total_outage_is_synthetic_and_never_cached() {
        let fx = fixture(MockSource::failing("backend"), MockSource::failing("exchange"));
        let window = TimeWindow::new(0, 24 * 3_600_000);

        let first = fx.cascade.resolve("SOL-PERP", "1h", window).await;
        assert_eq!(first.provenance, Provenance::Synthetic);
        assert!(!first.candles.is_empty());
        assert!(fx.cache.get("SOL-PERP", "1h").await.is_none());

        let second = fx.cascade.resolve("SOL-PERP", "1h", window).await;
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn malformed_remote_candles_are_not_cached() {
        let broken = Candle::new(30, 10.0, 5.0, 1.0, 10.0, 1.0);
        let backend = MockSource::serving("backend", vec![candle(10, 1.0), broken]);
        let fx = fixture(backend, MockSource::failing("exchange"));

        let resolved = fx.cascade.resolve("BTC-PERP", "1h", TimeWindow::new(0, 40)).await;

        assert_eq!(resolved.provenance, Provenance::Backend);
        assert_eq!(timestamps(&resolved.candles), vec![10]);
        assert_eq!(fx.cache.get("BTC-PERP", "1h").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unavailable_cache_still_returns_fetched_window() {
        let cache = Arc::new(CacheStore::new(Arc::new(NoopPersistence)));
        let backend = MockSource::serving("backend", vec![candle(10, 1.0), candle(20, 1.0), candle(90, 1.0)]);
        let fx = fixture_with_cache(cache, backend, MockSource::failing("exchange"));

        let resolved = fx.cascade.resolve("BTC-PERP", "1h", TimeWindow::new(0, 50)).await;

        assert_eq!(resolved.provenance, Provenance::Backend);
        assert_eq!(timestamps(&resolved.candles), vec![10, 20]);
    }
}
