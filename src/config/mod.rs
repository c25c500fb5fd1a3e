pub mod backtest_config;

pub use backtest_config::{
    BacktestRequest, EngineConfig, MeanReversionParams, SmaParams, StrategyParams, StrategyType,
    DEFAULT_DISPLAY_WINDOW, DEFAULT_TRANSACTION_COST,
};
