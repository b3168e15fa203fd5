// =============================================================================
// Shared types used across the candle-sync engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Which tier satisfied a candle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Cache,
    Backend,
    Exchange,
    Synthetic,
}

impl Provenance {
    /// `true` when the candles came from a real market data source.
    pub fn is_real(&self) -> bool {
        !matches!(self, Self::Synthetic)
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Backend => write!(f, "backend"),
            Self::Exchange => write!(f, "exchange"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Lifecycle of the single multiplexed live-data connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ReconnectPending,
    Failed,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::ReconnectPending => write!(f, "ReconnectPending"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Coarse connection status handed to UI collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub connecting: bool,
}

impl From<ConnectionState> for ConnectionStatus {
    fn from(state: ConnectionState) -> Self {
        Self {
            connected: state == ConnectionState::Connected,
            connecting: state == ConnectionState::Connecting,
        }
    }
}
