// =============================================================================
// Exchange REST client — direct candle snapshots (Hyperliquid-style /info)
// =============================================================================
//
// POST {base}/info
//   { "type": "candleSnapshot",
//     "req": { "coin": "BTC", "interval": "1h", "startTime": ms, "endTime": ms } }
//   -> [ { "t": ms, "o": "50000.0", "h": ..., "l": ..., "c": ..., "v": ... }, ... ]
//
// Prices arrive as JSON strings. Markets are named `<COIN>-PERP` on our side
// and plain `<COIN>` on the exchange.
// =============================================================================

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::{parse_str_f64, CandleSource};
use crate::error::{EngineError, EngineResult};
use crate::market_data::{Candle, Interval, TimeWindow};

const TIER: &str = "exchange";

#[derive(Clone)]
pub struct ExchangeClient {
    base_url: String,
    client: reqwest::Client,
}

impl ExchangeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build exchange HTTP client")?;

        debug!(base_url = %base_url, "ExchangeClient initialised");
        Ok(Self { base_url, client })
    }

    /// Exchange coin symbol for one of our market names.
    pub fn coin_for(market: &str) -> &str {
        market.strip_suffix("-PERP").unwrap_or(market)
    }

    fn snapshot_request(market: &str, interval: Interval, range: TimeWindow) -> serde_json::Value {
        json!({
            "type": "candleSnapshot",
            "req": {
                "coin": Self::coin_for(market),
                "interval": interval.as_str(),
                "startTime": range.start,
                "endTime": range.end,
            }
        })
    }

    /// Parse the array-of-objects snapshot response.
    fn parse_snapshot(body: &serde_json::Value) -> EngineResult<Vec<Candle>> {
        let raw = body
            .as_array()
            .ok_or_else(|| EngineError::remote(TIER, "candle snapshot is not an array"))?;

        let mut candles = Vec::with_capacity(raw.len());
        for entry in raw {
            let parsed = (|| {
                Some(Candle::new(
                    entry["t"].as_i64()?,
                    parse_str_f64(&entry["o"])?,
                    parse_str_f64(&entry["h"])?,
                    parse_str_f64(&entry["l"])?,
                    parse_str_f64(&entry["c"])?,
                    parse_str_f64(&entry["v"])?,
                ))
            })();

            match parsed {
                Some(candle) => candles.push(candle),
                None => warn!(entry = %entry, "skipping malformed candle snapshot entry"),
            }
        }
        Ok(candles)
    }
}

#[async_trait]
impl CandleSource for ExchangeClient {
    fn name(&self) -> &'static str {
        TIER
    }

    #[instrument(skip(self, range), name = "exchange::fetch_candles", fields(range = %range))]
    async fn fetch_candles(
        &self,
        market: &str,
        interval: &str,
        range: TimeWindow,
    ) -> EngineResult<Vec<Candle>> {
        let interval: Interval = interval.parse()?;
        let url = format!("{}/info", self.base_url);

        let resp = self
            .client
            .post(&url)
            .json(&Self::snapshot_request(market, interval, range))
            .send()
            .await
            .map_err(|e| EngineError::remote(TIER, format!("POST {url} failed: {e}")))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| EngineError::remote(TIER, format!("failed to parse response: {e}")))?;

        if !status.is_success() {
            return Err(EngineError::remote(TIER, format!("POST {url} returned {status}: {body}")));
        }

        let candles = Self::parse_snapshot(&body)?;
        debug!(market, interval = %interval, count = candles.len(), "exchange candles fetched");
        Ok(candles)
    }
}

impl std::fmt::Debug for ExchangeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
