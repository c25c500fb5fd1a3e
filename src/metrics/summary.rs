use crate::data::bar::format_instant;
use crate::engine::compound::CompoundedCurves;
use crate::error::{BacktestError, Result};
use crate::metrics::timeseries::{calculate_equity_curve, max_drawdown, tail};
use crate::strategy::{Position, PositionSeries};
use chrono::{DateTime, Utc};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

//display-ready tail of both curves, index aligned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsData {
    pub dates: Vec<String>,
    pub buy_and_hold: Vec<f64>,
    pub strategy: Vec<f64>,
}

impl ResultsData {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

//outcome of one backtest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    //terminal compounded strategy value (1.0 = break even)
    pub performance: f64,
    //strategy minus buy-and-hold terminal value
    pub outperformance: f64,
    pub results_data: ResultsData,
    pub summary: SummaryMetrics,
}

//descriptive statistics reported alongside the result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub first_date: String,
    pub last_date: String,
    pub num_bars: usize,
    pub strategy_return_pct: f64,
    pub buy_and_hold_return_pct: f64,
    pub max_drawdown: f64,
    pub buy_and_hold_max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub num_trades: usize,
    pub exposure: f64,
    pub total_cost: f64,
}

impl SummaryMetrics {
    pub fn from_run(
        timestamps: &[DateTime<Utc>],
        curves: &CompoundedCurves,
        positions: &PositionSeries,
    ) -> Self {
        let performance = curves.strategy.last().copied().unwrap_or(1.0);
        let buy_and_hold = curves.buy_and_hold.last().copied().unwrap_or(1.0);

        //the last position is never held over a bar, so it does not count toward exposure
        let held = &positions.positions[..positions.len().saturating_sub(1)];
        let exposure = if held.is_empty() {
            0.0
        } else {
            held.iter().filter(|&&p| p != Position::Flat).count() as f64 / held.len() as f64
        };

        SummaryMetrics {
            first_date: timestamps.first().map(format_instant).unwrap_or_default(),
            last_date: timestamps.last().map(format_instant).unwrap_or_default(),
            num_bars: curves.strategy.len(),
            strategy_return_pct: (performance - 1.0) * 100.0,
            buy_and_hold_return_pct: (buy_and_hold - 1.0) * 100.0,
            max_drawdown: max_drawdown(&curves.strategy),
            buy_and_hold_max_drawdown: max_drawdown(&curves.buy_and_hold),
            sharpe_ratio: calculate_sharpe_ratio(&curves.strategy_returns),
            num_trades: positions.changes(),
            exposure,
            total_cost: curves.total_cost,
        }
    }

    //prints metrics in a formatted table
    pub fn pretty_print_table(&self) {
        let mut table = Table::new();

        table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));

        table.add_row(Row::new(vec![
            Cell::new("Period"),
            Cell::new(&format!("{} to {}", self.first_date, self.last_date)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Bars"),
            Cell::new(&format!("{}", self.num_bars)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Strategy Return"),
            Cell::new(&format!("{:.2}%", self.strategy_return_pct)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Buy & Hold Return"),
            Cell::new(&format!("{:.2}%", self.buy_and_hold_return_pct)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Max Drawdown"),
            Cell::new(&format!("{:.2}%", self.max_drawdown * 100.0)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Buy & Hold Max Drawdown"),
            Cell::new(&format!("{:.2}%", self.buy_and_hold_max_drawdown * 100.0)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Sharpe Ratio"),
            Cell::new(&format!("{:.3}", self.sharpe_ratio)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Position Changes"),
            Cell::new(&format!("{}", self.num_trades)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Exposure"),
            Cell::new(&format!("{:.2}%", self.exposure * 100.0)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Total Cost (log)"),
            Cell::new(&format!("{:.6}", self.total_cost)),
        ]));

        table.printstd();
    }
}

//reduces compounded curves to the run's result
//timestamps must be aligned with the curves
pub fn summarize(
    timestamps: &[DateTime<Utc>],
    curves: &CompoundedCurves,
    positions: &PositionSeries,
    display_window: usize,
) -> Result<BacktestResult> {
    if timestamps.len() != curves.strategy.len() || curves.strategy.len() != curves.buy_and_hold.len() {
        return Err(BacktestError::internal(format!(
            "curve lengths differ: {} timestamps, {} strategy, {} buy and hold",
            timestamps.len(),
            curves.strategy.len(),
            curves.buy_and_hold.len()
        )));
    }

    let (strategy_last, buy_and_hold_last) =
        match (curves.strategy.last(), curves.buy_and_hold.last()) {
            (Some(&s), Some(&b)) => (s, b),
            _ => return Err(BacktestError::internal("cannot summarize an empty curve")),
        };

    if let Some(index) = curves
        .strategy
        .iter()
        .chain(curves.buy_and_hold.iter())
        .position(|v| !v.is_finite())
    {
        return Err(BacktestError::internal(format!(
            "non-finite equity value at curve position {}",
            index % curves.strategy.len()
        )));
    }

    let points = calculate_equity_curve(timestamps, &curves.buy_and_hold, &curves.strategy);
    let window = tail(&points, display_window);

    let results_data = ResultsData {
        dates: window.iter().map(|p| format_instant(&p.timestamp)).collect(),
        buy_and_hold: window.iter().map(|p| p.buy_and_hold).collect(),
        strategy: window.iter().map(|p| p.strategy).collect(),
    };

    Ok(BacktestResult {
        performance: strategy_last,
        outperformance: strategy_last - buy_and_hold_last,
        results_data,
        summary: SummaryMetrics::from_run(timestamps, curves, positions),
    })
}

//annualized sharpe ratio of the strategy's per-bar net returns, assuming daily bars
//the anchor bar earns nothing and is left out
fn calculate_sharpe_ratio(net_log_returns: &[f64]) -> f64 {
    if net_log_returns.len() < 3 {
        return 0.0;
    }
    let returns: Vec<f64> = net_log_returns[1..].iter().map(|r| r.exp_m1()).collect();

    let mean = returns.as_slice().mean();
    let std_dev = returns.as_slice().std_dev();

    if !(std_dev > 0.0) {
        return 0.0;
    }

    (mean / std_dev) * (252.0_f64).sqrt()
}
