pub mod backtest;
pub mod compound;
pub mod returns;

pub use backtest::{backtest_series, BacktestEngine};
pub use compound::{compound, CompoundedCurves};
pub use returns::log_returns;
