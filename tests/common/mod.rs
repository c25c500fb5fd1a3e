#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use retrotest::prelude::*;

pub const SYMBOL: &str = "TEST";

pub fn day(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
}

pub fn bars(prices: &[f64]) -> Vec<PriceBar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| PriceBar::new(day(i), p))
        .collect()
}

pub fn engine_with(prices: &[f64]) -> BacktestEngine<InMemoryPriceSource> {
    let source = InMemoryPriceSource::new("mem").with_bars(SYMBOL, bars(prices));
    BacktestEngine::new(EngineConfig::default(), source)
}

//request spanning every bar built by `bars`
pub fn request(strategy: &str, n: usize) -> BacktestRequest {
    BacktestRequest::new(
        strategy,
        SYMBOL,
        day(0).to_rfc3339(),
        day(n.saturating_sub(1).max(1)).to_rfc3339(),
    )
}

pub fn sma_request(short_window: usize, long_window: usize, n: usize, tc: f64) -> BacktestRequest {
    request("SMA", n)
        .with_param("SMA_S", short_window as f64)
        .with_param("SMA_L", long_window as f64)
        .with_transaction_cost(tc)
}

pub fn mean_reversion_request(window: usize, dev: f64, n: usize, tc: f64) -> BacktestRequest {
    request("MeanReversion", n)
        .with_param("SMA", window as f64)
        .with_param("dev", dev)
        .with_transaction_cost(tc)
}

//deterministic wavy price path with a gentle drift
pub fn wave(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + 0.05 * t + 8.0 * (t / 9.0).sin() + 3.0 * (t / 2.3).cos()
        })
        .collect()
}

pub fn rising(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 * (1.0 + 0.002 * i as f64)).collect()
}
