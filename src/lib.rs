// =============================================================================
// candle-sync — cached historical candles + multiplexed live prices
// =============================================================================
//
// Historical requests go through a cache-first cascade
// (cache -> backend -> exchange -> synthetic); live prices come from one
// shared, self-reconnecting stream connection. `MarketDataEngine` is the
// entry point.
// =============================================================================

pub mod cache;
pub mod cascade;
pub mod engine;
pub mod error;
pub mod market_data;
pub mod runtime_config;
pub mod sources;
pub mod stream;
pub mod types;

#[cfg(test)]
mod testing;

pub use cascade::ResolvedCandles;
pub use engine::{EngineHealth, MarketDataEngine};
pub use error::{EngineError, EngineResult};
pub use market_data::{Candle, Interval, TimeWindow};
pub use runtime_config::EngineConfig;
pub use stream::{PriceUpdate, Subscription};
pub use types::{ConnectionState, ConnectionStatus, Provenance};
