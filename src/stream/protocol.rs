// =============================================================================
// Ticker stream wire protocol
// =============================================================================
//
// Outbound control frames:
//   { "type": "subscribe",   "channel": "ticker", "market": "BTC-PERP" }
//   { "type": "unsubscribe", "channel": "ticker", "market": "BTC-PERP" }
//
// Inbound ticker frames come in a few shapes depending on the relay:
//   { "type": "ticker", "market": "BTC-PERP", "price": 50000.5, "timestamp": ms,
//     "volume24h": 1.2e6, "change24h": -0.4 }
//   { "channel": "ticker", "symbol": "BTC-PERP", "last": "50000.5" }
// =============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::market_data::now_ms;
use crate::sources::parse_str_f64;

const TICKER_CHANNEL: &str = "ticker";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub channel: String,
    pub market: String,
}

impl ControlMessage {
    pub fn subscribe(market: &str) -> Self {
        Self::new("subscribe", market)
    }

    pub fn unsubscribe(market: &str) -> Self {
        Self::new("unsubscribe", market)
    }

    fn new(kind: &str, market: &str) -> Self {
        Self {
            kind: kind.to_string(),
            channel: TICKER_CHANNEL.to_string(),
            market: market.to_string(),
        }
    }

    pub fn encode(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One live price tick for a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub market: String,
    pub price: f64,
    pub timestamp: i64,
    #[serde(rename = "volume24h", skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<f64>,
    #[serde(rename = "change24h", skip_serializing_if = "Option::is_none")]
    pub change_24h: Option<f64>,
}

/// Parse one inbound text frame.
///
/// `Err(StreamParse)` for anything that is not JSON (or a ticker that lacks a
/// market or price); `Ok(None)` for valid JSON that is not a ticker, such as
/// subscription acks and heartbeats.
pub fn parse_inbound(text: &str) -> EngineResult<Option<PriceUpdate>> {
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Err(EngineError::StreamParse("payload is not JSON".into()));
    }

    let root: Value = serde_json::from_str(trimmed)
        .map_err(|e| EngineError::StreamParse(format!("invalid JSON: {e}")))?;

    let is_ticker = root["type"].as_str() == Some(TICKER_CHANNEL)
        || root["channel"].as_str() == Some(TICKER_CHANNEL);
    if !is_ticker {
        return Ok(None);
    }

    let market = root["market"]
        .as_str()
        .or_else(|| root["symbol"].as_str())
        .ok_or_else(|| EngineError::StreamParse("ticker without market".into()))?;

    let price = parse_str_f64(&root["price"])
        .or_else(|| parse_str_f64(&root["last"]))
        .ok_or_else(|| EngineError::StreamParse(format!("ticker for {market} without price")))?;

    let timestamp = root["timestamp"]
        .as_i64()
        .or_else(|| parse_str_f64(&root["timestamp"]).map(|t| t as i64))
        .unwrap_or_else(now_ms);

    Ok(Some(PriceUpdate {
        market: market.to_string(),
        price,
        timestamp,
        volume_24h: parse_str_f64(&root["volume24h"]),
        change_24h: parse_str_f64(&root["change24h"]),
    }))
}
