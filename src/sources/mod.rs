// =============================================================================
// Candle Sources
// =============================================================================
//
// Remote tiers the cascade falls through, in order:
//
//   1. Backend  — our own API service, which may answer from its own cache.
//   2. Exchange — direct candle snapshot from the exchange REST API.
//
// Both implement `CandleSource`. The synthetic generator is not a source: it
// never fails and its output is never persisted.

pub mod backend;
pub mod exchange;
pub mod synthetic;

pub use backend::BackendClient;
pub use exchange::ExchangeClient;
pub use synthetic::SyntheticGenerator;

use async_trait::async_trait;
use tracing::warn;

use crate::error::EngineResult;
use crate::market_data::{Candle, TimeWindow};

/// A remote tier able to deliver candles for an inclusive time range.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Tier name used in logs and errors.
    fn name(&self) -> &'static str;

    async fn fetch_candles(
        &self,
        market: &str,
        interval: &str,
        range: TimeWindow,
    ) -> EngineResult<Vec<Candle>>;
}

/// Drop candles that break the OHLC invariants so they never reach the cache.
pub fn retain_valid(tier: &str, market: &str, mut candles: Vec<Candle>) -> Vec<Candle> {
    let before = candles.len();
    candles.retain(Candle::is_valid);
    let dropped = before - candles.len();
    if dropped > 0 {
        warn!(tier, market, dropped, "discarded malformed candles");
    }
    candles
}

/// Parse a JSON value that may be either a string or a number into `f64`.
pub(crate) fn parse_str_f64(val: &serde_json::Value) -> Option<f64> {
    match val {
        serde_json::Value::String(s) => s.parse::<f64>().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
