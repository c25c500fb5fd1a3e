use crate::error::{BacktestError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

pub const DEFAULT_TRANSACTION_COST: f64 = 0.0001;
pub const DEFAULT_DISPLAY_WINDOW: usize = 100;

//strategy type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyType {
    #[serde(rename = "SMA")]
    Sma,
    MeanReversion,
}

impl StrategyType {
    //parse strategy type from string
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sma" | "sma_crossover" => Ok(StrategyType::Sma),
            "meanreversion" | "mean_reversion" | "meanrev" => Ok(StrategyType::MeanReversion),
            _ => Err(BacktestError::UnsupportedStrategy(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyType::Sma => "SMA",
            StrategyType::MeanReversion => "MeanReversion",
        }
    }
}

//sma crossover strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmaParams {
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for SmaParams {
    fn default() -> Self {
        SmaParams {
            short_window: 10,
            long_window: 50,
        }
    }
}

impl SmaParams {
    pub fn validate(&self) -> Result<()> {
        if self.short_window == 0 {
            return Err(BacktestError::invalid("short_window must be positive"));
        }
        if self.long_window <= self.short_window {
            return Err(BacktestError::invalid(format!(
                "long_window ({}) must be greater than short_window ({})",
                self.long_window, self.short_window
            )));
        }
        Ok(())
    }
}

//mean reversion strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanReversionParams {
    pub window: usize,
    pub deviation_threshold: f64,
}

impl Default for MeanReversionParams {
    fn default() -> Self {
        MeanReversionParams {
            window: 20,
            deviation_threshold: 2.0,
        }
    }
}

impl MeanReversionParams {
    pub fn validate(&self) -> Result<()> {
        if self.window < 2 {
            return Err(BacktestError::invalid(format!(
                "window ({}) must be at least 2",
                self.window
            )));
        }
        if !(self.deviation_threshold.is_finite() && self.deviation_threshold > 0.0) {
            return Err(BacktestError::invalid(format!(
                "deviation_threshold ({}) must be a positive number",
                self.deviation_threshold
            )));
        }
        Ok(())
    }
}

//strategy-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StrategyParams {
    Sma(SmaParams),
    MeanReversion(MeanReversionParams),
}

impl StrategyParams {
    //reads named parameters for a strategy type, falling back to defaults
    //accepts the platform's keys (SMA_S, SMA_L, SMA, dev) and descriptive aliases
    pub fn from_mapping(strategy_type: StrategyType, params: &IndexMap<String, f64>) -> Result<Self> {
        let parsed = match strategy_type {
            StrategyType::Sma => {
                let defaults = SmaParams::default();
                warn_unknown(params, &["SMA_S", "short_window", "SMA_L", "long_window"]);
                StrategyParams::Sma(SmaParams {
                    short_window: window_param(params, &["SMA_S", "short_window"], defaults.short_window)?,
                    long_window: window_param(params, &["SMA_L", "long_window"], defaults.long_window)?,
                })
            }
            StrategyType::MeanReversion => {
                let defaults = MeanReversionParams::default();
                warn_unknown(params, &["SMA", "window", "dev", "deviation_threshold"]);
                StrategyParams::MeanReversion(MeanReversionParams {
                    window: window_param(params, &["SMA", "window"], defaults.window)?,
                    deviation_threshold: lookup(params, &["dev", "deviation_threshold"])
                        .unwrap_or(defaults.deviation_threshold),
                })
            }
        };

        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            StrategyParams::Sma(p) => p.validate(),
            StrategyParams::MeanReversion(p) => p.validate(),
        }
    }
}

fn lookup(params: &IndexMap<String, f64>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| params.get(*k).copied())
}

fn window_param(params: &IndexMap<String, f64>, keys: &[&str], default: usize) -> Result<usize> {
    let value = match lookup(params, keys) {
        Some(v) => v,
        None => return Ok(default),
    };

    if !value.is_finite() || value.fract() != 0.0 || value < 1.0 {
        return Err(BacktestError::invalid(format!(
            "{} must be a positive whole number, got {}",
            keys[0], value
        )));
    }
    if value > u32::MAX as f64 {
        return Err(BacktestError::invalid(format!("{} is too large: {}", keys[0], value)));
    }
    Ok(value as usize)
}

fn warn_unknown(params: &IndexMap<String, f64>, known: &[&str]) {
    for key in params.keys() {
        if !known.contains(&key.as_str()) {
            warn!(parameter = %key, "ignoring unknown strategy parameter");
        }
    }
}

fn default_transaction_cost() -> f64 {
    DEFAULT_TRANSACTION_COST
}

//one backtest invocation, as handed over by the calling service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub strategy_type: String,
    #[serde(default)]
    pub parameters: IndexMap<String, f64>,
    pub symbol: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_transaction_cost")]
    pub transaction_cost: f64,
}

impl BacktestRequest {
    pub fn new(
        strategy_type: impl Into<String>,
        symbol: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        BacktestRequest {
            strategy_type: strategy_type.into(),
            parameters: IndexMap::new(),
            symbol: symbol.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            transaction_cost: DEFAULT_TRANSACTION_COST,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_transaction_cost(mut self, transaction_cost: f64) -> Self {
        self.transaction_cost = transaction_cost;
        self
    }

    //load a request from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let request: BacktestRequest = serde_json::from_str(&contents)?;
        Ok(request)
    }
}

//engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    //points of each curve returned for display
    pub display_window: usize,
    //cost applied by callers that do not specify one
    pub default_transaction_cost: f64,
    //how long cached raw prices stay fresh
    pub cache_ttl_secs: u64,
    //longest accepted date range, if any
    pub max_range_days: Option<i64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            display_window: DEFAULT_DISPLAY_WINDOW,
            default_transaction_cost: DEFAULT_TRANSACTION_COST,
            cache_ttl_secs: 3600,
            max_range_days: None,
        }
    }
}

impl EngineConfig {
    //load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.display_window == 0 {
            return Err(BacktestError::invalid("display_window must be positive"));
        }
        if !(self.default_transaction_cost.is_finite() && self.default_transaction_cost >= 0.0) {
            return Err(BacktestError::invalid(format!(
                "default_transaction_cost ({}) must be a non-negative number",
                self.default_transaction_cost
            )));
        }
        if let Some(days) = self.max_range_days {
            if days <= 0 || chrono::Duration::try_days(days).is_none() {
                return Err(BacktestError::invalid(format!(
                    "max_range_days ({}) must be a positive number of days",
                    days
                )));
            }
        }
        Ok(())
    }

    //save configuration to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
