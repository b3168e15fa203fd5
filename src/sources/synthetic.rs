// =============================================================================
// Synthetic candle generator — last-resort tier when every remote tier fails
// =============================================================================
//
// Trend + bounded random walk, seeded by the market name so that repeated
// requests for the same window render identically within a session. Output
// of this module must never be written to the cache.
// =============================================================================

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::market_data::{fnv1a, Candle, Interval, TimeWindow};

/// Per-candle volatility of the random walk (0.2 %).
const STEP_VOLATILITY: f64 = 0.002;
/// The walk is clamped to `[base * (1 - BAND), base * (1 + BAND)]`.
const PRICE_BAND: f64 = 0.5;
/// Bucket width used when the interval string is not recognised.
const FALLBACK_STEP_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    max_candles: usize,
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new(5_000)
    }
}

impl SyntheticGenerator {
    /// `max_candles` caps very wide windows; the most recent buckets are kept.
    pub fn new(max_candles: usize) -> Self {
        Self {
            max_candles: max_candles.max(1),
        }
    }

    pub fn generate(&self, market: &str, interval: &str, window: TimeWindow) -> Vec<Candle> {
        let step = interval
            .parse::<Interval>()
            .map(|iv| iv.duration_ms())
            .unwrap_or(FALLBACK_STEP_MS);

        let Some((start, count)) = bucket_span(window, step, self.max_candles) else {
            return Vec::new();
        };

        let seed = market_seed(market);
        let mut rng = StdRng::seed_from_u64(seed);
        let base = base_price(market, seed);
        let drift = rng.gen_range(-0.0005..0.0005);
        let (floor, ceiling) = (base * (1.0 - PRICE_BAND), base * (1.0 + PRICE_BAND));

        let mut candles = Vec::with_capacity(count);
        let mut close = base;
        for i in 0..count {
            let open = close;
            let shock = rng.gen_range(-STEP_VOLATILITY..STEP_VOLATILITY);
            close = (open * (1.0 + drift + shock)).clamp(floor, ceiling);

            let high = open.max(close) * (1.0 + rng.gen_range(0.0..STEP_VOLATILITY));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..STEP_VOLATILITY));
            let volume = rng.gen_range(100.0..1_000.0);

            candles.push(Candle::new(start + i as i64 * step, open, high, low, close, volume));
        }
        candles
    }
}

/// First timestamp and number of step-aligned buckets inside `window`, keeping
/// only the most recent `max` of them. `None` when no bucket fits. Windows
/// near the i64 limits are handled without overflow.
fn bucket_span(window: TimeWindow, step: i64, max: usize) -> Option<(i64, usize)> {
    let last = window.end.checked_sub(window.end.rem_euclid(step))?;
    let rem = window.start.rem_euclid(step);
    let first = if rem == 0 {
        window.start
    } else {
        window.start.checked_add(step - rem)?
    };
    if first > last {
        return None;
    }

    // An overflowing span is wider than any cap.
    let total = last
        .checked_sub(first)
        .map(|span| span / step + 1)
        .unwrap_or(i64::MAX);
    let count = total.min(i64::try_from(max).unwrap_or(i64::MAX));
    let start = last.checked_sub((count - 1).checked_mul(step)?)?;
    Some((start, usize::try_from(count).ok()?))
}

fn market_seed(market: &str) -> u64 {
    fnv1a(market.as_bytes())
}

fn base_price(market: &str, seed: u64) -> f64 {
    let coin = market.split('-').next().unwrap_or(market);
    match coin {
        "BTC" => 50_000.0,
        "ETH" => 3_000.0,
        "SOL" => 100.0,
        _ => 10.0 + (seed % 990) as f64,
    }
}
