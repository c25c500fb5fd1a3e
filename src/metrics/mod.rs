pub mod summary;
pub mod timeseries;

pub use summary::{summarize, BacktestResult, ResultsData, SummaryMetrics};
pub use timeseries::{calculate_equity_curve, max_drawdown, EquityPoint};
