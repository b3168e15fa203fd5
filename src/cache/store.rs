// =============================================================================
// CacheStore — persistent candle cache keyed by (market, interval)
// =============================================================================
//
// The cache is an optimisation, not a source of truth: storage failures are
// logged at warn and turned into misses / no-ops, never returned to callers.
//
// Thread safety:
//   - All writes (set / merge / clear) are serialised through one async
//     mutex, so a merge's read-modify-write cannot interleave with another
//     write and sequentially awaited merges land in call order.
//   - Reads go straight to the backend; a reader sees either the old or the
//     new record, never a partial one.
// =============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::persistence::{PersistedEntry, Persistence};
use crate::error::EngineResult;
use crate::market_data::{self, missing_ranges, Candle, CandleKey, CandleSeries, TimeWindow};

/// Aggregate view over everything currently cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_candles: usize,
    pub markets: Vec<String>,
    pub intervals: Vec<String>,
}

pub struct CacheStore {
    persistence: Arc<dyn Persistence>,
    write_lock: Mutex<()>,
}

impl CacheStore {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        if persistence.is_available() {
            info!(backend = persistence.name(), "candle cache ready");
        } else {
            warn!(
                backend = persistence.name(),
                "candle cache storage unavailable -- every lookup will miss"
            );
        }
        Self {
            persistence,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.persistence.name()
    }

    /// Stored series for the key, if any.
    pub async fn get(&self, market: &str, interval: &str) -> Option<CandleSeries> {
        let key = CandleKey::new(market, interval);
        self.load(&key).await
    }

    /// Replace the entry with a sorted, deduplicated copy of `candles`
    /// (last write wins). Empty input is a no-op.
    pub async fn set(&self, market: &str, interval: &str, candles: Vec<Candle>) {
        if candles.is_empty() {
            return;
        }
        let _guard = self.write_lock.lock().await;
        let key = CandleKey::new(market, interval);
        if let Some(series) = CandleSeries::from_candles(key, candles, market_data::now_ms()) {
            self.put(&series).await;
        }
    }

    /// Union `new_candles` into the stored series; new candles win ties.
    /// Behaves like [`set`](Self::set) when nothing is stored yet.
    pub async fn merge(&self, market: &str, interval: &str, new_candles: Vec<Candle>) {
        if new_candles.is_empty() {
            return;
        }
        let _guard = self.write_lock.lock().await;
        let key = CandleKey::new(market, interval);
        let now = market_data::now_ms();

        // An unreadable entry is left alone rather than overwritten by the
        // new batch alone.
        let stored = match self.read(&key).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed -- merge not applied");
                return;
            }
        };
        let series = match stored {
            Some(existing) => existing.merged(new_candles, now),
            None => match CandleSeries::from_candles(key, new_candles, now) {
                Some(series) => series,
                None => return,
            },
        };
        self.put(&series).await;
    }

    /// Drop every entry, or only those for `market`.
    pub async fn clear(&self, market: Option<&str>) {
        let _guard = self.write_lock.lock().await;
        let keys = match self.persistence.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "cache clear skipped -- cannot list entries");
                return;
            }
        };

        let mut removed = 0usize;
        for key in keys.iter().filter(|k| market.map_or(true, |m| k.market == m)) {
            match self.persistence.remove(key).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(key = %key, error = %e, "failed to remove cache entry"),
            }
        }

        match market {
            Some(m) => info!(market = %m, removed, "cleared cache for market"),
            None => info!(removed, "cleared all cached candles"),
        }
    }

    /// Missing sub-ranges of `[start, end]` given what is cached for the key.
    pub async fn missing_ranges(&self, market: &str, interval: &str, window: TimeWindow) -> Vec<TimeWindow> {
        let cached = self.get(market, interval).await;
        missing_ranges(cached.as_ref().map(CandleSeries::bounds), window)
    }

    pub async fn stats(&self) -> CacheStats {
        let keys = match self.persistence.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "cache stats unavailable");
                return CacheStats::default();
            }
        };

        let mut stats = CacheStats::default();
        let mut markets = BTreeSet::new();
        let mut intervals = BTreeSet::new();
        for key in &keys {
            if let Some(series) = self.load(key).await {
                stats.total_entries += 1;
                stats.total_candles += series.len();
                markets.insert(key.market.clone());
                intervals.insert(key.interval.clone());
            }
        }
        stats.markets = markets.into_iter().collect();
        stats.intervals = intervals.into_iter().collect();
        stats
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    async fn read(&self, key: &CandleKey) -> EngineResult<Option<CandleSeries>> {
        let Some(entry) = self.persistence.load(key).await? else {
            debug!(key = %key, "cache miss");
            return Ok(None);
        };
        let series = entry.into_series();
        match &series {
            Some(s) => debug!(key = %key, candles = s.len(), "cache hit"),
            None => debug!(key = %key, "cache miss (empty entry)"),
        }
        Ok(series)
    }

    async fn load(&self, key: &CandleKey) -> Option<CandleSeries> {
        self.read(key).await.unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "cache read failed -- treating as miss");
            None
        })
    }

    async fn put(&self, series: &CandleSeries) {
        let entry = PersistedEntry::from(series);
        match self.persistence.store(&entry).await {
            Ok(()) => debug!(key = %series.key(), candles = series.len(), "stored candles"),
            Err(e) => warn!(key = %series.key(), error = %e, "cache write failed -- entry left unchanged"),
        }
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("backend", &self.persistence.name())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
