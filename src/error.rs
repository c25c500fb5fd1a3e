use thiserror::Error;

//errors a backtest run can fail with
//every variant is recoverable by the caller; nothing here should escape as a panic
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BacktestError {
    #[error("invalid parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("no price data for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("insufficient history for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientHistory {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("non-positive price {price} at bar {index}")]
    NonPositivePrice { index: usize, price: f64 },

    #[error("every rolling window of length {window} has zero deviation")]
    DegenerateWindow { window: usize },

    #[error("unsupported strategy type: {0}")]
    UnsupportedStrategy(String),

    #[error("internal computation error: {context}")]
    InternalComputationError { context: String },
}

impl BacktestError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        BacktestError::InvalidParameters {
            reason: reason.into(),
        }
    }

    pub fn unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        BacktestError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    pub fn internal(context: impl Into<String>) -> Self {
        BacktestError::InternalComputationError {
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BacktestError>;
