use crate::common::Amount;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

/// Safety buffer applied on top of simulated execution cost and gas limits.
pub const GAS_SAFETY_MARGIN_PERCENT: u64 = 10;

/// Cost prediction for one prepared transfer group.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub transfer_count: usize,
    /// Total value moved by the group, in base units.
    #[serde_as(as = "DisplayFromStr")]
    pub total_value: Amount,
    pub gas_units: u128,
    /// Gas price in wei used for the cost figures.
    pub gas_price: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub simulated_cost: Amount,
    /// `ceil(simulated_cost * 1.10)`
    #[serde_as(as = "DisplayFromStr")]
    pub cost_with_margin: Amount,
}

/// ceil(value * (100 + margin) / 100), saturating at the numeric limit.
pub(crate) fn apply_safety_margin(value: Amount) -> Amount {
    let percent = Amount::from(100 + GAS_SAFETY_MARGIN_PERCENT);
    value
        .checked_mul(percent)
        .and_then(|scaled| scaled.checked_add(Amount::from(99)))
        .map(|padded| padded / Amount::from(100))
        .unwrap_or(Amount::MAX)
}

/// Gas limit for a submission: the simulated units padded by the same margin.
pub(crate) fn gas_limit_with_margin(gas_units: u128) -> u64 {
    let padded = gas_units
        .saturating_mul(100 + GAS_SAFETY_MARGIN_PERCENT as u128)
        .saturating_add(99)
        / 100;
    u64::try_from(padded).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margin_rounds_up() {
        assert_eq!(apply_safety_margin(Amount::ZERO), Amount::ZERO);
        assert_eq!(apply_safety_margin(Amount::from(100u64)), Amount::from(110u64));
        // 101 * 1.10 = 111.1, rounded up
        assert_eq!(apply_safety_margin(Amount::from(101u64)), Amount::from(112u64));
        assert_eq!(apply_safety_margin(Amount::from(1u64)), Amount::from(2u64));
    }

    #[test]
    fn margin_saturates_instead_of_overflowing() {
        assert_eq!(apply_safety_margin(Amount::MAX), Amount::MAX);
    }

    #[test]
    fn gas_limit_margin_matches_cost_margin() {
        assert_eq!(gas_limit_with_margin(0), 0);
        assert_eq!(gas_limit_with_margin(21_000), 23_100);
        assert_eq!(gas_limit_with_margin(21_001), 23_102);
        assert_eq!(gas_limit_with_margin(u128::MAX), u64::MAX);
    }
}
