//! Shared fixtures for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{EngineError, EngineResult};
use crate::market_data::{Candle, TimeWindow};
use crate::sources::CandleSource;

pub fn candle(ts: i64, close: f64) -> Candle {
    Candle::new(ts, close, close * 1.01, close * 0.99, close, 10.0)
}

/// Scripted `CandleSource`: serves a fixed candle set filtered to the
/// requested range, and starts failing after `ok_calls` requests.
pub struct MockSource {
    name: &'static str,
    candles: Vec<Candle>,
    ok_calls: usize,
    requested: Mutex<Vec<TimeWindow>>,
}

impl MockSource {
    pub fn serving(name: &'static str, candles: Vec<Candle>) -> Self {
        Self::failing_after(name, usize::MAX, candles)
    }

    pub fn failing(name: &'static str) -> Self {
        Self::failing_after(name, 0, Vec::new())
    }

    pub fn failing_after(name: &'static str, ok_calls: usize, candles: Vec<Candle>) -> Self {
        Self {
            name,
            candles,
            ok_calls,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requested.lock().len()
    }

    pub fn requested(&self) -> Vec<TimeWindow> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl CandleSource for MockSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_candles(
        &self,
        _market: &str,
        _interval: &str,
        range: TimeWindow,
    ) -> EngineResult<Vec<Candle>> {
        let call = {
            let mut requested = self.requested.lock();
            requested.push(range);
            requested.len()
        };
        if call > self.ok_calls {
            return Err(EngineError::remote(self.name, "scripted failure"));
        }
        Ok(self
            .candles
            .iter()
            .copied()
            .filter(|c| range.contains(c.timestamp))
            .collect())
    }
}
