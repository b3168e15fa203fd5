pub mod candle_series;
pub mod interval;
pub mod range_resolver;

// Re-export the core value types for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle_series::{Candle, CandleKey, CandleSeries, TimeWindow};
pub use interval::Interval;
pub use range_resolver::missing_ranges;

/// Current wall-clock time in ms since epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 64-bit FNV-1a. Stable across runs and platforms, unlike `DefaultHasher`.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0100_0000_01b3)
    })
}
