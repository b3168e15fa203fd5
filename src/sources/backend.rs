// =============================================================================
// Backend REST client — candles from our own API service
// =============================================================================
//
// GET {base}/api/candles/{market}/{interval}?start=<ms>&end=<ms>
//   -> { "candles": [{timestamp, open, high, low, close, volume}, ...],
//        "from_cache": bool }
// =============================================================================

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::CandleSource;
use crate::error::{EngineError, EngineResult};
use crate::market_data::{Candle, TimeWindow};

const TIER: &str = "backend";

/// Response body of the backend candles endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendCandles {
    pub candles: Vec<Candle>,
    /// Whether the backend answered from its own cache.
    #[serde(default)]
    pub from_cache: bool,
}

#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build backend HTTP client")?;

        debug!(base_url = %base_url, "BackendClient initialised");
        Ok(Self { base_url, client })
    }

    pub fn candles_url(&self, market: &str, interval: &str) -> String {
        format!("{}/api/candles/{}/{}", self.base_url, market, interval)
    }

    fn decode(body: serde_json::Value) -> EngineResult<BackendCandles> {
        serde_json::from_value(body)
            .map_err(|e| EngineError::remote(TIER, format!("unexpected response shape: {e}")))
    }
}

#[async_trait]
impl CandleSource for BackendClient {
    fn name(&self) -> &'static str {
        TIER
    }

    #[instrument(skip(self, range), name = "backend::fetch_candles", fields(range = %range))]
    async fn fetch_candles(
        &self,
        market: &str,
        interval: &str,
        range: TimeWindow,
    ) -> EngineResult<Vec<Candle>> {
        let url = self.candles_url(market, interval);

        let resp = self
            .client
            .get(&url)
            .query(&[("start", range.start), ("end", range.end)])
            .send()
            .await
            .map_err(|e| EngineError::remote(TIER, format!("GET {url} failed: {e}")))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| EngineError::remote(TIER, format!("failed to parse response: {e}")))?;

        if !status.is_success() {
            return Err(EngineError::remote(TIER, format!("GET {url} returned {status}: {body}")));
        }

        let decoded = Self::decode(body)?;
        debug!(
            market,
            interval,
            count = decoded.candles.len(),
            from_cache = decoded.from_cache,
            "backend candles fetched"
        );
        Ok(decoded.candles)
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
