// =============================================================================
// candle-sync — Main Entry Point
// =============================================================================
//
// Warms the candle cache for every configured (market, interval), subscribes
// to live prices for each market and logs them, then runs until Ctrl+C.
// =============================================================================

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use candle_sync::runtime_config::DEFAULT_CONFIG_PATH;
use candle_sync::{EngineConfig, MarketDataEngine, PriceUpdate};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("candle-sync starting up");

    let file_config = EngineConfig::load(DEFAULT_CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        EngineConfig::default()
    });
    // Env overrides apply to this run only; the file keeps its own values.
    let mut config = file_config.clone();
    config.apply_env_overrides();

    info!(
        markets = ?config.markets,
        intervals = ?config.intervals,
        warmup_days = config.warmup_days,
        "Configured markets"
    );

    // ── 2. Build engine ──────────────────────────────────────────────────
    let engine = Arc::new(MarketDataEngine::from_config(&config)?);

    // ── 3. Warm the cache ────────────────────────────────────────────────
    for market in &config.markets {
        for interval in &config.intervals {
            let engine = engine.clone();
            let market = market.clone();
            let interval = *interval;
            let days = config.warmup_days;
            tokio::spawn(async move {
                let resolved = engine
                    .get_recent_candles(&market, interval.as_str(), days)
                    .await;
                info!(
                    market = %market,
                    interval = %interval,
                    provenance = %resolved.provenance,
                    candles = resolved.candles.len(),
                    "warmup complete"
                );
            });
        }
    }

    // ── 4. Live prices ───────────────────────────────────────────────────
    let _subscriptions: Vec<_> = config
        .markets
        .iter()
        .map(|market| {
            engine.subscribe_price(market, |update: &PriceUpdate| {
                info!(
                    market = %update.market,
                    price = update.price,
                    change_24h = ?update.change_24h,
                    "price"
                );
            })
        })
        .collect();

    // ── 5. Status loop ───────────────────────────────────────────────────
    let status_engine = engine.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(30));
        loop {
            interval.tick().await;
            let health = status_engine.health().await;
            info!(
                connection = %health.connection,
                reconnect_attempts = health.reconnect_attempts,
                topics = health.active_topics.len(),
                cache_entries = health.cache.total_entries,
                cache_candles = health.cache.total_candles,
                "status"
            );
            if let Err(e) = status_engine.check_health() {
                error!(error = %e, "price stream down -- reconnecting from scratch");
                status_engine.stream().connect();
            }
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received -- stopping gracefully");

    engine.disconnect();

    if let Err(e) = file_config.save(DEFAULT_CONFIG_PATH) {
        error!(error = %e, "Failed to save engine config on shutdown");
    }

    info!("candle-sync shut down complete.");
    Ok(())
}
