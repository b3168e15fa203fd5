// =============================================================================
// Engine error taxonomy
// =============================================================================
//
// None of these escape the public request/subscribe surface for expected
// degraded conditions. The cascade and the stream manager match on them to
// decide whether to fall through, retry, or give up.
// =============================================================================

use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Storage layer missing or failing. Recovered by treating the operation
    /// as a miss / no-op.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// A remote tier (backend or exchange) could not deliver candles.
    #[error("{tier} fetch failed: {reason}")]
    RemoteFetch { tier: &'static str, reason: String },

    /// Interval string not in the supported catalogue.
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// Inbound stream payload that is not a well-formed message.
    #[error("malformed stream message: {0}")]
    StreamParse(String),

    /// Live connection failed to open or dropped.
    #[error("stream transport error: {0}")]
    StreamTransport(String),

    /// Reconnect budget exhausted; the manager stays disconnected until an
    /// explicit `connect()`.
    #[error("max reconnect attempts ({0}) exceeded")]
    MaxReconnectExceeded(u32),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    pub fn remote(tier: &'static str, reason: impl Display) -> Self {
        Self::RemoteFetch {
            tier,
            reason: reason.to_string(),
        }
    }

    pub fn cache(reason: impl Display) -> Self {
        Self::CacheUnavailable(reason.to_string())
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
