use crate::error::{BacktestError, Result};
use crate::strategy::rolling::RollingWindow;
use crate::strategy::{Position, PositionSeries, SignalGenerator};

//bollinger-style mean reversion strategy
//enters against a move of more than `deviation` rolling standard deviations and
//exits once price returns to the rolling mean. path dependent: each bar starts
//from the previous bar's position
#[derive(Debug, Clone, PartialEq)]
pub struct MeanReversionStrategy {
    window: usize,
    deviation: f64,
}

impl MeanReversionStrategy {
    pub fn new(window: usize, deviation: f64) -> Self {
        MeanReversionStrategy { window, deviation }
    }

    //applies the entry/exit rules to one z-score
    pub fn step(&self, current: Position, z: f64) -> Position {
        match current {
            Position::Flat if z < -self.deviation => Position::Long,
            Position::Flat if z > self.deviation => Position::Short,
            Position::Long if z >= 0.0 => Position::Flat,
            Position::Short if z <= 0.0 => Position::Flat,
            held => held,
        }
    }
}

impl SignalGenerator for MeanReversionStrategy {
    fn first_signal_index(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn generate(&self, prices: &[f64]) -> Result<PositionSeries> {
        let first_index = self.first_signal_index();
        if prices.len() <= first_index {
            return Err(BacktestError::internal(format!(
                "mean reversion needs {} prices, got {}",
                first_index + 1,
                prices.len()
            )));
        }

        let mut rolling = RollingWindow::new(self.window);
        let mut positions = Vec::with_capacity(prices.len() - first_index);
        let mut current = Position::Flat;
        let mut evaluated = 0usize;

        for &price in prices {
            rolling.push(price);

            let (mean, std_dev) = match (rolling.mean(), rolling.std_dev()) {
                (Some(mean), Some(std_dev)) => (mean, std_dev),
                _ => continue,
            };

            //a flat window has no z-score; keep whatever we hold
            if std_dev > 0.0 {
                let z = (price - mean) / std_dev;
                current = self.step(current, z);
                evaluated += 1;
            }
            positions.push(current);
        }

        if evaluated == 0 {
            return Err(BacktestError::DegenerateWindow {
                window: self.window,
            });
        }

        Ok(PositionSeries {
            first_index,
            positions,
        })
    }

    fn name(&self) -> &str {
        "Mean Reversion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_follows_entry_and_exit_rules() {
        let s = MeanReversionStrategy::new(5, 2.0);

        assert_eq!(s.step(Position::Flat, -2.5), Position::Long);
        assert_eq!(s.step(Position::Flat, 2.5), Position::Short);
        assert_eq!(s.step(Position::Flat, 1.9), Position::Flat);
        assert_eq!(s.step(Position::Flat, -2.0), Position::Flat);

        assert_eq!(s.step(Position::Long, -0.5), Position::Long);
        assert_eq!(s.step(Position::Long, 0.0), Position::Flat);
        assert_eq!(s.step(Position::Long, 3.0), Position::Flat);

        assert_eq!(s.step(Position::Short, 0.5), Position::Short);
        assert_eq!(s.step(Position::Short, 0.0), Position::Flat);
        assert_eq!(s.step(Position::Short, -3.0), Position::Flat);
    }

    #[test]
    fn buys_a_dip_and_exits_at_the_mean() {
        let s = MeanReversionStrategy::new(5, 1.0);
        let prices = [
            100.0, 101.0, 100.0, 101.0, 100.0, //window fills
            90.0,  //deep dip: z well below -1
            92.0,  //still below the mean
            110.0, //back above the mean
        ];
        let series = s.generate(&prices).unwrap();

        assert_eq!(series.first_index, 4);
        assert_eq!(
            series.positions,
            vec![
                Position::Flat,
                Position::Long,
                Position::Long,
                Position::Flat
            ]
        );
    }

    #[test]
    fn shorts_a_spike() {
        let s = MeanReversionStrategy::new(4, 1.0);
        let prices = [100.0, 101.0, 100.0, 101.0, 120.0, 80.0];
        let series = s.generate(&prices).unwrap();
        assert_eq!(
            series.positions,
            vec![Position::Flat, Position::Short, Position::Flat]
        );
    }

    #[test]
    fn flat_segment_holds_previous_position() {
        let s = MeanReversionStrategy::new(3, 1.0);
        let prices = [100.0, 101.0, 100.0, 90.0, 90.0, 90.0, 90.0];
        let series = s.generate(&prices).unwrap();

        //long after the dip, then the window goes flat and the long is held
        assert_eq!(series.positions[1], Position::Long);
        assert_eq!(*series.positions.last().unwrap(), Position::Long);
    }

    #[test]
    fn constant_prices_are_degenerate() {
        let s = MeanReversionStrategy::new(3, 1.0);
        let err = s.generate(&[50.0; 10]).unwrap_err();
        assert_eq!(err, BacktestError::DegenerateWindow { window: 3 });
    }
}
