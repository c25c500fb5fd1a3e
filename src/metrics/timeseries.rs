use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//one point of both equity curves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub buy_and_hold: f64,
    pub strategy: f64,
}

impl EquityPoint {
    pub fn new(timestamp: DateTime<Utc>, buy_and_hold: f64, strategy: f64) -> Self {
        EquityPoint {
            timestamp,
            buy_and_hold,
            strategy,
        }
    }
}

//zips timestamps with both curves
pub fn calculate_equity_curve(
    timestamps: &[DateTime<Utc>],
    buy_and_hold: &[f64],
    strategy: &[f64],
) -> Vec<EquityPoint> {
    timestamps
        .iter()
        .zip(buy_and_hold.iter().zip(strategy.iter()))
        .map(|(&t, (&b, &s))| EquityPoint::new(t, b, s))
        .collect()
}

//drawdown from the running peak at every point
pub fn drawdowns(curve: &[f64]) -> Vec<f64> {
    let mut peak = f64::MIN;
    curve
        .iter()
        .map(|&value| {
            if value > peak {
                peak = value;
            }
            if peak > 0.0 {
                (peak - value) / peak
            } else {
                0.0
            }
        })
        .collect()
}

//largest peak-to-trough decline as a fraction of the peak
pub fn max_drawdown(curve: &[f64]) -> f64 {
    drawdowns(curve).into_iter().fold(0.0, f64::max)
}

//final points of the curve, at most `window` of them
pub fn tail<T>(points: &[T], window: usize) -> &[T] {
    &points[points.len().saturating_sub(window)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn drawdown_tracks_running_peak() {
        let curve = [1.0, 1.2, 0.9, 1.3, 1.04];
        let dd = drawdowns(&curve);
        assert_eq!(dd[0], 0.0);
        assert_eq!(dd[1], 0.0);
        assert_relative_eq!(dd[2], 0.25, max_relative = 1e-12);
        assert_eq!(dd[3], 0.0);
        assert_relative_eq!(dd[4], 0.2, max_relative = 1e-12);
        assert_relative_eq!(max_drawdown(&curve), 0.25, max_relative = 1e-12);
    }

    #[test]
    fn tail_bounds() {
        let values: Vec<usize> = (0..150).collect();
        assert_eq!(tail(&values, 100).len(), 100);
        assert_eq!(tail(&values, 100)[0], 50);
        assert_eq!(*tail(&values, 100).last().unwrap(), 149);
        assert_eq!(tail(&values[..30], 100).len(), 30);
        assert_eq!(tail(&values[..100], 100), &values[..100]);
    }
}
