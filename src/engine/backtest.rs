use crate::config::{BacktestRequest, EngineConfig, StrategyParams, StrategyType};
use crate::data::bar::{parse_instant, PriceSeries, RangeBound};
use crate::data::loader::PriceSource;
use crate::engine::compound::compound;
use crate::engine::returns::log_returns;
use crate::error::{BacktestError, Result};
use crate::metrics::summary::{summarize, BacktestResult};
use crate::strategy::{SignalGenerator, Strategy};
use chrono::Duration;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

//runs backtests against a price source
//holds no per-run state, so one engine can serve many callers at once
pub struct BacktestEngine<S: PriceSource> {
    config: EngineConfig,
    source: S,
}

impl<S: PriceSource> BacktestEngine<S> {
    //creates a new backtest engine
    pub fn new(config: EngineConfig, source: S) -> Self {
        BacktestEngine { config, source }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    //runs one backtest; every failure comes back as a typed error
    pub fn run(&self, request: &BacktestRequest) -> Result<BacktestResult> {
        info!(
            symbol = %request.symbol,
            strategy = %request.strategy_type,
            start = %request.start_date,
            end = %request.end_date,
            "running backtest"
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_inner(request)))
            .unwrap_or_else(|payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(BacktestError::internal(format!(
                    "backtest of {} panicked: {}",
                    request.symbol, message
                )))
            });

        match &outcome {
            Ok(result) => info!(
                symbol = %request.symbol,
                performance = result.performance,
                outperformance = result.outperformance,
                "backtest finished"
            ),
            Err(e) => warn!(symbol = %request.symbol, error = %e, "backtest failed"),
        }

        outcome
    }

    //runs independent requests in parallel, one result per request in input order
    pub fn run_many(&self, requests: &[BacktestRequest]) -> Vec<Result<BacktestResult>> {
        requests.par_iter().map(|request| self.run(request)).collect()
    }

    fn run_inner(&self, request: &BacktestRequest) -> Result<BacktestResult> {
        //validate everything before touching data
        self.config.validate()?;
        let strategy_type = StrategyType::parse(&request.strategy_type)?;
        let params = StrategyParams::from_mapping(strategy_type, &request.parameters)?;
        let strategy = Strategy::from_params(&params)?;
        debug!(
            strategy = strategy.strategy_type().as_str(),
            params = ?params,
            "validated request"
        );

        let cost_rate = request.transaction_cost;
        if !(cost_rate.is_finite() && cost_rate >= 0.0) {
            return Err(BacktestError::invalid(format!(
                "transaction cost ({}) must be a non-negative number",
                cost_rate
            )));
        }

        let start = parse_instant(&request.start_date, RangeBound::Start)?;
        let end = parse_instant(&request.end_date, RangeBound::End)?;
        if start >= end {
            return Err(BacktestError::invalid(format!(
                "start date {} must be before end date {}",
                request.start_date, request.end_date
            )));
        }
        if let Some(max_days) = self.config.max_range_days {
            let limit = Duration::try_days(max_days).ok_or_else(|| {
                BacktestError::invalid(format!("max_range_days ({}) is out of range", max_days))
            })?;
            if end - start > limit {
                return Err(BacktestError::invalid(format!(
                    "date range exceeds {} days",
                    max_days
                )));
            }
        }

        let series = self.source.load(&request.symbol, start, end)?;
        backtest_series(&series, &strategy, cost_rate, self.config.display_window)
    }
}

//backtests a strategy over an already loaded series
pub fn backtest_series(
    series: &PriceSeries,
    strategy: &Strategy,
    cost_rate: f64,
    display_window: usize,
) -> Result<BacktestResult> {
    let minimum = strategy.min_bars();
    if series.len() < minimum {
        return Err(BacktestError::InsufficientHistory {
            symbol: series.symbol.clone(),
            bars: series.len(),
            minimum,
        });
    }

    let prices = series.closes();
    let returns = log_returns(&prices)?;
    let signals = strategy.generate(&prices)?;

    //returns[k] covers bar k + 1, so bar j's return is returns[j - 1]
    let first = signals.first_index;
    if first == 0 || signals.len() != prices.len() - first {
        return Err(BacktestError::internal(format!(
            "{} produced {} positions from index {} for {} prices",
            strategy.name(),
            signals.len(),
            first,
            prices.len()
        )));
    }
    let aligned_returns = &returns[first - 1..];

    debug!(
        strategy = strategy.name(),
        first_index = first,
        positions = signals.len(),
        changes = signals.changes(),
        "generated signals"
    );

    let curves = compound(aligned_returns, &signals.positions, cost_rate)?;
    let timestamps = &series.timestamps()[first..];

    summarize(timestamps, &curves, &signals, display_window)
}
