pub mod mean_reversion;
pub mod rolling;
pub mod sma_crossover;

use crate::config::{StrategyParams, StrategyType};
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub use mean_reversion::MeanReversionStrategy;
pub use sma_crossover::SmaCrossoverStrategy;

//exposure held over the next bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Short,
    Flat,
    Long,
}

impl Position {
    //signed exposure (-1, 0, +1)
    pub fn value(self) -> f64 {
        match self {
            Position::Short => -1.0,
            Position::Flat => 0.0,
            Position::Long => 1.0,
        }
    }

    //size of the trade needed to move from previous to self (0, 1 or 2 units)
    pub fn turnover_from(self, previous: Position) -> f64 {
        (self.value() - previous.value()).abs()
    }
}

//positions decided at the close of each bar, starting at first_index of the price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSeries {
    pub first_index: usize,
    pub positions: Vec<Position>,
}

impl PositionSeries {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    //number of bars where the position differs from the previous bar
    pub fn changes(&self) -> usize {
        self.positions.windows(2).filter(|w| w[0] != w[1]).count()
    }
}

//maps a price series to positions
pub trait SignalGenerator {
    //index of the first bar that can carry a position
    fn first_signal_index(&self) -> usize;

    //fewest bars a run needs: the first signal plus at least one tradable return
    fn min_bars(&self) -> usize {
        self.first_signal_index() + 2
    }

    //positions for every bar from first_signal_index onward
    //prices must hold at least first_signal_index + 1 values
    fn generate(&self, prices: &[f64]) -> Result<PositionSeries>;

    fn name(&self) -> &str;
}

//every strategy the engine can run, matched exhaustively
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    SmaCrossover(SmaCrossoverStrategy),
    MeanReversion(MeanReversionStrategy),
}

impl Strategy {
    //builds a validated strategy from its parameters
    pub fn from_params(params: &StrategyParams) -> Result<Self> {
        params.validate()?;
        Ok(match params {
            StrategyParams::Sma(p) => {
                Strategy::SmaCrossover(SmaCrossoverStrategy::new(p.short_window, p.long_window))
            }
            StrategyParams::MeanReversion(p) => Strategy::MeanReversion(
                MeanReversionStrategy::new(p.window, p.deviation_threshold),
            ),
        })
    }

    pub fn strategy_type(&self) -> StrategyType {
        match self {
            Strategy::SmaCrossover(_) => StrategyType::Sma,
            Strategy::MeanReversion(_) => StrategyType::MeanReversion,
        }
    }

    fn generator(&self) -> &dyn SignalGenerator {
        match self {
            Strategy::SmaCrossover(s) => s as &dyn SignalGenerator,
            Strategy::MeanReversion(s) => s,
        }
    }
}

impl SignalGenerator for Strategy {
    fn first_signal_index(&self) -> usize {
        self.generator().first_signal_index()
    }

    fn generate(&self, prices: &[f64]) -> Result<PositionSeries> {
        self.generator().generate(prices)
    }

    fn name(&self) -> &str {
        self.generator().name()
    }
}
