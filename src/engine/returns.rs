use crate::error::{BacktestError, Result};

//log returns between consecutive prices: returns[i] = ln(prices[i + 1] / prices[i])
//log returns add across time, which the compounder relies on
pub fn log_returns(prices: &[f64]) -> Result<Vec<f64>> {
    if let Some((index, &price)) = prices.iter().enumerate().find(|(_, &p)| !(p > 0.0)) {
        return Err(BacktestError::NonPositivePrice { index, price });
    }

    Ok(prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
}
