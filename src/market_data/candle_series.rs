use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle. `timestamp` is the bucket open time in ms since epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Finite, non-negative prices and volume with
    /// `low <= min(open, close) <= max(open, close) <= high`.
    pub fn is_valid(&self) -> bool {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return false;
        }
        self.low <= self.open.min(self.close) && self.open.max(self.close) <= self.high
    }
}

/// Composite key that identifies a unique candle series.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CandleKey {
    pub market: String,
    pub interval: String,
}

impl CandleKey {
    pub fn new(market: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            interval: interval.into(),
        }
    }
}

impl std::fmt::Display for CandleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.market, self.interval)
    }
}

/// Inclusive `[start, end]` time window in ms since epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    /// Bounds given in the wrong order are swapped.
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// The `days` days leading up to `now_ms`.
    pub fn last_days(days: u32, now_ms: i64) -> Self {
        let span = i64::from(days) * 24 * 60 * 60 * 1000;
        Self::new(now_ms - span, now_ms)
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// CandleSeries -- ordered, deduplicated history per (market, interval)
// ---------------------------------------------------------------------------

/// Locally known history for one `(market, interval)` pair.
///
/// Candles are always sorted ascending by timestamp with no duplicates, and a
/// series is never empty. Both properties are established by the
/// constructors, which are the only way to build one.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    key: CandleKey,
    candles: Vec<Candle>,
    last_update: i64,
}

impl CandleSeries {
    /// Sort and deduplicate `candles` (last write wins on equal timestamps).
    /// Returns `None` for an empty input.
    pub fn from_candles(key: CandleKey, candles: Vec<Candle>, last_update: i64) -> Option<Self> {
        let candles = dedupe_sorted(candles);
        if candles.is_empty() {
            return None;
        }
        Some(Self {
            key,
            candles,
            last_update,
        })
    }

    /// Union of this series and `incoming`; incoming candles win ties.
    pub fn merged(&self, incoming: Vec<Candle>, last_update: i64) -> Self {
        let mut all = Vec::with_capacity(self.candles.len() + incoming.len());
        all.extend_from_slice(&self.candles);
        all.extend(incoming);
        Self {
            key: self.key.clone(),
            candles: dedupe_sorted(all),
            last_update,
        }
    }

    pub fn key(&self) -> &CandleKey {
        &self.key
    }

    pub fn market(&self) -> &str {
        &self.key.market
    }

    pub fn interval(&self) -> &str {
        &self.key.interval
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }

    pub fn first_timestamp(&self) -> i64 {
        self.candles[0].timestamp
    }

    pub fn last_timestamp(&self) -> i64 {
        self.candles[self.candles.len() - 1].timestamp
    }

    /// `(first_timestamp, last_timestamp)`.
    pub fn bounds(&self) -> (i64, i64) {
        (self.first_timestamp(), self.last_timestamp())
    }

    pub fn last_update(&self) -> i64 {
        self.last_update
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Candles whose timestamp falls inside `window`, oldest first.
    pub fn slice(&self, window: TimeWindow) -> Vec<Candle> {
        let lo = self.candles.partition_point(|c| c.timestamp < window.start);
        let hi = self.candles.partition_point(|c| c.timestamp <= window.end);
        self.candles[lo..hi.max(lo)].to_vec()
    }
}

fn dedupe_sorted(candles: Vec<Candle>) -> Vec<Candle> {
    let mut by_ts: BTreeMap<i64, Candle> = BTreeMap::new();
    for candle in candles {
        by_ts.insert(candle.timestamp, candle);
    }
    by_ts.into_values().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_candle(timestamp: i64, close: f64) -> Candle {
        Candle::new(timestamp, close, close + 1.0, close - 1.0, close, 100.0)
    }

    fn key() -> CandleKey {
        CandleKey::new("BTC-PERP", "1m")
    }

    fn timestamps(series: &CandleSeries) -> Vec<i64> {
        series.candles().iter().map(|c| c.timestamp).collect()
    }

    #[test]
    fn from_candles_sorts_and_keeps_last_duplicate() {
        let series = CandleSeries::from_candles(
            key(),
            vec![
                sample_candle(300, 3.0),
                sample_candle(100, 1.0),
                sample_candle(200, 2.0),
                sample_candle(100, 9.0),
            ],
            0,
        )
        .expect("non-empty");

        assert_eq!(timestamps(&series), vec![100, 200, 300]);
        assert_eq!(series.candles()[0].close, 9.0);
        assert_eq!(series.bounds(), (100, 300));
    }

    #[test]
    fn empty_input_builds_nothing() {
        assert!(CandleSeries::from_candles(key(), Vec::new(), 0).is_none());
    }

    #[test]
    fn merged_prefers_incoming_on_ties() {
        let series =
            CandleSeries::from_candles(key(), vec![sample_candle(100, 1.0), sample_candle(200, 2.0)], 0)
                .unwrap();
        let merged = series.merged(vec![sample_candle(200, 5.0), sample_candle(50, 0.5)], 7);

        assert_eq!(timestamps(&merged), vec![50, 100, 200]);
        assert_eq!(merged.candles()[2].close, 5.0);
        assert_eq!(merged.last_update(), 7);
    }

    #[test]
    fn slice_is_inclusive_on_both_ends() {
        let series = CandleSeries::from_candles(
            key(),
            (0..10).map(|i| sample_candle(i * 10, i as f64 + 1.0)).collect(),
            0,
        )
        .unwrap();

        let slice = series.slice(TimeWindow::new(20, 50));
        let ts: Vec<i64> = slice.iter().map(|c| c.timestamp).collect();
        assert_eq!(ts, vec![20, 30, 40, 50]);

        assert!(series.slice(TimeWindow::new(1000, 2000)).is_empty());
    }

    #[test]
    fn candle_validation() {
        assert!(sample_candle(0, 10.0).is_valid());
        assert!(!Candle::new(0, 10.0, 9.0, 8.0, 10.0, 1.0).is_valid());
        assert!(!Candle::new(0, 10.0, 11.0, 8.0, f64::NAN, 1.0).is_valid());
        assert!(!Candle::new(0, 10.0, 11.0, 8.0, 10.0, -1.0).is_valid());
    }

    #[test]
    fn window_normalises_reversed_bounds() {
        let w = TimeWindow::new(20, 10);
        assert_eq!((w.start, w.end), (10, 20));
        assert!(w.contains(10) && w.contains(20) && !w.contains(21));

        let days = TimeWindow::last_days(1, 86_400_000);
        assert_eq!((days.start, days.end), (0, 86_400_000));
    }
}
