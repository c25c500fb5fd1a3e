use crate::error::{BacktestError, Result};
use crate::strategy::rolling::RollingWindow;
use crate::strategy::{Position, PositionSeries, SignalGenerator};

//sma crossover strategy
//long while the short sma is above the long sma, short while it is below
//always invested once both averages exist; an exact tie keeps the previous position
#[derive(Debug, Clone, PartialEq)]
pub struct SmaCrossoverStrategy {
    short_window: usize,
    long_window: usize,
}

impl SmaCrossoverStrategy {
    pub fn new(short_window: usize, long_window: usize) -> Self {
        SmaCrossoverStrategy {
            short_window,
            long_window,
        }
    }

    fn decide(short_sma: f64, long_sma: f64, previous: Option<Position>) -> Position {
        if short_sma > long_sma {
            Position::Long
        } else if short_sma < long_sma {
            Position::Short
        } else {
            previous.unwrap_or(Position::Short)
        }
    }
}

impl SignalGenerator for SmaCrossoverStrategy {
    fn first_signal_index(&self) -> usize {
        self.long_window.saturating_sub(1)
    }

    fn generate(&self, prices: &[f64]) -> Result<PositionSeries> {
        let first_index = self.first_signal_index();
        if prices.len() <= first_index {
            return Err(BacktestError::internal(format!(
                "sma crossover needs {} prices, got {}",
                first_index + 1,
                prices.len()
            )));
        }

        let mut short = RollingWindow::new(self.short_window);
        let mut long = RollingWindow::new(self.long_window);
        let mut positions = Vec::with_capacity(prices.len() - first_index);
        let mut previous = None;

        for &price in prices {
            short.push(price);
            long.push(price);

            //both averages are defined from the long window onward
            if let (Some(short_sma), Some(long_sma)) = (short.mean(), long.mean()) {
                let position = Self::decide(short_sma, long_sma, previous);
                positions.push(position);
                previous = Some(position);
            }
        }

        Ok(PositionSeries {
            first_index,
            positions,
        })
    }

    fn name(&self) -> &str {
        "SMA Crossover"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_signal_at_long_window() {
        let strategy = SmaCrossoverStrategy::new(2, 4);
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let series = strategy.generate(&prices).unwrap();

        assert_eq!(series.first_index, 3);
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn rising_prices_go_long() {
        let strategy = SmaCrossoverStrategy::new(2, 4);
        let prices: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let series = strategy.generate(&prices).unwrap();
        assert!(series.positions.iter().all(|&p| p == Position::Long));
    }

    #[test]
    fn falling_prices_go_short() {
        let strategy = SmaCrossoverStrategy::new(2, 4);
        let prices: Vec<f64> = (1..=10).rev().map(|x| x as f64).collect();
        let series = strategy.generate(&prices).unwrap();
        assert!(series.positions.iter().all(|&p| p == Position::Short));
    }

    #[test]
    fn crossover_flips_position() {
        let strategy = SmaCrossoverStrategy::new(1, 3);
        //up, up, then a sharp drop
        let prices = [10.0, 11.0, 12.0, 13.0, 5.0, 4.0];
        let series = strategy.generate(&prices).unwrap();

        assert_eq!(
            series.positions,
            vec![Position::Long, Position::Long, Position::Short, Position::Short]
        );
    }

    #[test]
    fn tie_without_history_defaults_short() {
        let strategy = SmaCrossoverStrategy::new(2, 3);
        let series = strategy.generate(&[5.0, 5.0, 5.0, 5.0]).unwrap();
        assert!(series.positions.iter().all(|&p| p == Position::Short));
    }

    #[test]
    fn tie_holds_previous_position() {
        let strategy = SmaCrossoverStrategy::new(1, 2);
        //sma1 = price, sma2 = mean of last two; 3 -> 3 is a tie after a rise
        let prices = [2.0, 3.0, 3.0, 3.0];
        let series = strategy.generate(&prices).unwrap();
        assert_eq!(
            series.positions,
            vec![Position::Long, Position::Long, Position::Long]
        );
    }

    #[test]
    fn never_flat() {
        let strategy = SmaCrossoverStrategy::new(3, 7);
        let prices: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 / 5.0).sin() * 10.0)
            .collect();
        let series = strategy.generate(&prices).unwrap();
        assert!(series.positions.iter().all(|&p| p != Position::Flat));
        assert!(series.changes() > 0);
    }

    #[test]
    fn too_few_prices_is_an_error() {
        let strategy = SmaCrossoverStrategy::new(2, 5);
        assert!(strategy.generate(&[1.0, 2.0, 3.0]).is_err());
    }
}
