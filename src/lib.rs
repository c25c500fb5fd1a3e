//a Rust-based engine for backtesting parametric trading strategies against historical prices

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod strategy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        BacktestRequest, EngineConfig, MeanReversionParams, SmaParams, StrategyParams,
        StrategyType,
    };
    pub use crate::data::{
        CachedPriceSource, CsvPriceSource, InMemoryPriceSource, PriceBar, PriceSeries,
        PriceSource,
    };
    pub use crate::engine::{backtest_series, compound, log_returns, BacktestEngine};
    pub use crate::error::{BacktestError, Result};
    pub use crate::metrics::{BacktestResult, ResultsData, SummaryMetrics};
    pub use crate::strategy::{
        mean_reversion::MeanReversionStrategy, sma_crossover::SmaCrossoverStrategy, Position,
        PositionSeries, SignalGenerator, Strategy,
    };
}
