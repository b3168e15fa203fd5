// =============================================================================
// MarketDataEngine — the public request/subscribe surface
// =============================================================================
//
// Ties the subsystems together:
//   - CacheStore + DataSourceCascade answer historical candle requests.
//   - StreamSubscriptionManager multiplexes live price subscriptions.
//
// UI collaborators hold one `Arc<MarketDataEngine>` and never see tier
// failures: degraded answers carry `Provenance::Synthetic` instead.
// =============================================================================

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{CacheStats, CacheStore, FilePersistence, MemoryPersistence, NoopPersistence, Persistence};
use crate::cascade::{DataSourceCascade, ResolvedCandles};
use crate::error::EngineError;
use crate::market_data::{now_ms, TimeWindow};
use crate::runtime_config::EngineConfig;
use crate::sources::{BackendClient, CandleSource, ExchangeClient, SyntheticGenerator};
use crate::stream::{PriceUpdate, StreamSubscriptionManager, Subscription, Transport, WebSocketTransport};
use crate::types::{ConnectionState, ConnectionStatus};

/// Point-in-time view used by the status log.
#[derive(Debug, Clone, Serialize)]
pub struct EngineHealth {
    pub connection: ConnectionState,
    pub reconnect_attempts: u32,
    pub active_topics: Vec<String>,
    pub cache_backend: &'static str,
    pub cache: CacheStats,
}

pub struct MarketDataEngine {
    cache: Arc<CacheStore>,
    cascade: DataSourceCascade,
    stream: StreamSubscriptionManager,
}

impl MarketDataEngine {
    /// Assemble an engine from explicit collaborators.
    pub fn new(
        cache: Arc<CacheStore>,
        backend: Arc<dyn CandleSource>,
        exchange: Arc<dyn CandleSource>,
        stream: StreamSubscriptionManager,
    ) -> Self {
        let cascade = DataSourceCascade::new(cache.clone(), backend, exchange, SyntheticGenerator::default());
        Self {
            cache,
            cascade,
            stream,
        }
    }

    /// Build the production stack described by `config`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let persistence = persistence_for(config);
        let cache = Arc::new(CacheStore::new(persistence));

        let backend = Arc::new(BackendClient::new(&config.backend_url, config.request_timeout())?);
        let exchange = Arc::new(ExchangeClient::new(&config.exchange_url, config.request_timeout())?);

        let transport: Arc<dyn Transport> = Arc::new(WebSocketTransport::new(&config.ws_url));
        let stream = StreamSubscriptionManager::new(transport, config.stream_config());

        info!(
            cache = cache.backend_name(),
            backend_url = %config.backend_url,
            exchange_url = %config.exchange_url,
            ws_url = %config.ws_url,
            "market data engine initialised"
        );
        Ok(Self::new(cache, backend, exchange, stream))
    }

    // ── Historical candles ──────────────────────────────────────────────

    pub async fn get_candles(&self, market: &str, interval: &str, window: TimeWindow) -> ResolvedCandles {
        self.cascade.resolve(market, interval, window).await
    }

    /// Candles for the trailing `days` days up to now.
    pub async fn get_recent_candles(&self, market: &str, interval: &str, days: u32) -> ResolvedCandles {
        self.get_candles(market, interval, TimeWindow::last_days(days, now_ms()))
            .await
    }

    // ── Live prices ─────────────────────────────────────────────────────

    pub fn subscribe_price<F>(&self, market: &str, callback: F) -> Subscription
    where
        F: Fn(&PriceUpdate) + Send + Sync + 'static,
    {
        self.stream.subscribe(market, callback)
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.stream.status()
    }

    pub fn check_health(&self) -> Result<(), EngineError> {
        self.stream.check_health()
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn stream(&self) -> &StreamSubscriptionManager {
        &self.stream
    }

    pub async fn health(&self) -> EngineHealth {
        EngineHealth {
            connection: self.stream.state(),
            reconnect_attempts: self.stream.reconnect_attempts(),
            active_topics: self.stream.active_topics(),
            cache_backend: self.cache.backend_name(),
            cache: self.cache.stats().await,
        }
    }

    pub fn disconnect(&self) {
        self.stream.disconnect();
    }
}

impl std::fmt::Debug for MarketDataEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataEngine")
            .field("cascade", &self.cascade)
            .field("stream", &self.stream)
            .finish()
    }
}

/// A configured directory gets file storage, degrading to no storage if the
/// directory cannot be used. No directory means an in-memory cache.
fn persistence_for(config: &EngineConfig) -> Arc<dyn Persistence> {
    match &config.cache_dir {
        Some(dir) => match FilePersistence::open(dir) {
            Ok(files) => Arc::new(files),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cache directory unusable -- running without cache");
                Arc::new(NoopPersistence)
            }
        },
        None => Arc::new(MemoryPersistence::new()),
    }
}
