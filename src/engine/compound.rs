use crate::error::{BacktestError, Result};
use crate::strategy::Position;

//cumulative equity curves anchored at 1.0 on the first bar
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundedCurves {
    pub strategy: Vec<f64>,
    pub buy_and_hold: Vec<f64>,
    //per-bar strategy log returns net of costs (0.0 at the anchor)
    pub strategy_returns: Vec<f64>,
    //sum of all costs charged, in log-return units
    pub total_cost: f64,
}

//turns aligned returns and positions into cumulative equity curves
//
//returns[i] is the log return realized over bar i and positions[i] the position
//decided at the close of bar i. the strategy earns positions[i - 1] * returns[i]
//over bar i and pays cost_rate per unit of position change at the bar the change
//is detected. both curves are summed in log space and exponentiated, so index 0
//(whose return and position history are not used) anchors both at 1.0
pub fn compound(returns: &[f64], positions: &[Position], cost_rate: f64) -> Result<CompoundedCurves> {
    if returns.len() != positions.len() {
        return Err(BacktestError::internal(format!(
            "returns ({}) and positions ({}) are not aligned",
            returns.len(),
            positions.len()
        )));
    }
    if returns.is_empty() {
        return Err(BacktestError::internal("nothing to compound"));
    }
    if !(cost_rate.is_finite() && cost_rate >= 0.0) {
        return Err(BacktestError::invalid(format!(
            "transaction cost ({}) must be a non-negative number",
            cost_rate
        )));
    }

    let len = returns.len();
    let mut strategy = Vec::with_capacity(len);
    let mut buy_and_hold = Vec::with_capacity(len);
    let mut strategy_returns = Vec::with_capacity(len);

    let mut strategy_log = 0.0;
    let mut buy_and_hold_log = 0.0;
    let mut total_cost = 0.0;

    strategy.push(1.0);
    buy_and_hold.push(1.0);
    strategy_returns.push(0.0);

    for i in 1..len {
        let cost = cost_rate * positions[i].turnover_from(positions[i - 1]);
        let net = positions[i - 1].value() * returns[i] - cost;

        strategy_log += net;
        buy_and_hold_log += returns[i];
        total_cost += cost;

        strategy.push(strategy_log.exp());
        buy_and_hold.push(buy_and_hold_log.exp());
        strategy_returns.push(net);
    }

    Ok(CompoundedCurves {
        strategy,
        buy_and_hold,
        strategy_returns,
        total_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use Position::{Flat, Long, Short};

    #[test]
    fn anchors_both_curves_at_one() {
        let curves = compound(&[0.5, 0.1], &[Long, Long], 0.0).unwrap();
        assert_eq!(curves.strategy[0], 1.0);
        assert_eq!(curves.buy_and_hold[0], 1.0);
        //the anchor's own return is not earned
        assert_relative_eq!(curves.buy_and_hold[1], (0.1f64).exp());
    }

    #[test]
    fn uses_previous_position_for_each_return() {
        let returns = [0.0, 0.1, -0.2, 0.05];
        let positions = [Long, Short, Short, Flat];
        let curves = compound(&returns, &positions, 0.0).unwrap();

        //long over bar 1, short over bar 2, short over bar 3
        let expected: f64 = 0.1 + 0.2 - 0.05;
        assert_relative_eq!(*curves.strategy.last().unwrap(), expected.exp(), max_relative = 1e-12);
        assert_relative_eq!(*curves.buy_and_hold.last().unwrap(), (-0.05f64).exp(), max_relative = 1e-12);
    }

    #[test]
    fn charges_cost_per_unit_of_change() {
        let returns = [0.0, 0.0, 0.0, 0.0];
        let positions = [Long, Short, Flat, Flat];
        let curves = compound(&returns, &positions, 0.01).unwrap();

        //long -> short is two units, short -> flat is one
        assert_relative_eq!(curves.total_cost, 0.03, max_relative = 1e-12);
        assert_relative_eq!(curves.strategy_returns[1], -0.02);
        assert_relative_eq!(curves.strategy_returns[2], -0.01);
        assert_relative_eq!(*curves.strategy.last().unwrap(), (-0.03f64).exp(), max_relative = 1e-12);
    }

    #[test]
    fn no_trades_no_cost() {
        let curves = compound(&[0.0, 0.01, 0.02], &[Long, Long, Long], 0.5).unwrap();
        assert_eq!(curves.total_cost, 0.0);
        assert_eq!(curves.strategy, curves.buy_and_hold);
    }

    #[test]
    fn rejects_misaligned_input() {
        assert!(matches!(
            compound(&[0.0, 0.1], &[Long], 0.0),
            Err(BacktestError::InternalComputationError { .. })
        ));
    }

    #[test]
    fn rejects_negative_cost() {
        assert!(matches!(
            compound(&[0.0, 0.1], &[Long, Long], -0.1),
            Err(BacktestError::InvalidParameters { .. })
        ));
    }
}
