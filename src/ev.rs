//! Expected value of a proposal, in risk multiples

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::algorithms::Signal;
use crate::market::parse_price;
use crate::types::Stars;

/// Floor for risk so a zero-width stop never divides by zero
const RISK_EPSILON: Decimal = dec!(0.0001);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EvReport {
    pub risk: Decimal,
    pub reward: Decimal,
    pub r_multiple: Decimal,
    pub win_probability: Decimal,
    /// `p * R - (1 - p)`
    pub expected_value: Decimal,
}

impl EvReport {
    pub fn is_positive(&self) -> bool {
        self.expected_value > Decimal::ZERO
    }
}

/// Assumed win rate for a confidence rating
pub fn win_probability(stars: Stars) -> Decimal {
    match stars.count() {
        5 => dec!(0.80),
        4 => dec!(0.65),
        3 => dec!(0.50),
        2 => dec!(0.35),
        _ => dec!(0.20),
    }
}

pub fn compute(entry: Decimal, stop: Decimal, target: Decimal, stars: Stars) -> EvReport {
    let risk = (entry - stop).abs();
    let reward = (target - entry).abs();
    let r_multiple = reward / risk.max(RISK_EPSILON);
    let p = win_probability(stars);

    EvReport {
        risk,
        reward,
        r_multiple,
        win_probability: p,
        expected_value: p * r_multiple - (Decimal::ONE - p),
    }
}

pub fn from_signal(signal: &Signal) -> EvReport {
    compute(signal.entry_price(), signal.stop, signal.target, signal.stars)
}

/// EV from levels rendered as text; all zeros when any level does not parse
pub fn from_text(entry: &str, stop: &str, target: &str, stars: Stars) -> EvReport {
    match (parse_price(entry), parse_price(stop), parse_price(target)) {
        (Some(entry), Some(stop), Some(target)) => compute(entry, stop, target, stars),
        _ => EvReport::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_three_star_two_r() {
        let ev = compute(dec!(2000), dec!(1990), dec!(2020), Stars::saturating(3));
        assert_eq!(ev.risk, dec!(10));
        assert_eq!(ev.reward, dec!(20));
        assert_eq!(ev.r_multiple, dec!(2));
        assert_eq!(ev.win_probability, dec!(0.50));
        assert_eq!(ev.expected_value, dec!(0.5));
    }

    #[test]
    fn test_zero_risk_floored() {
        let ev = compute(dec!(2000), dec!(2000), dec!(2001), Stars::MAX);
        assert_eq!(ev.risk, Decimal::ZERO);
        assert_eq!(ev.r_multiple, dec!(10000));
        assert!(ev.is_positive());
    }

    #[test]
    fn test_unparseable_levels_zeroed() {
        let ev = from_text("$2000.00", "n/a", "$2020.00", Stars::MAX);
        assert_eq!(ev, EvReport::default());

        let ev = from_text("$ 2,000.00", "$1990", "2020", Stars::saturating(3));
        assert_eq!(ev.expected_value, dec!(0.5));
    }

    #[test]
    fn test_sign_matches_probability_inequality() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let entry = Decimal::new(rng.gen_range(190_000..210_000), 2);
            let stop = entry - Decimal::new(rng.gen_range(1..2_000), 2);
            let target = entry + Decimal::new(rng.gen_range(1..4_000), 2);
            let stars = Stars::saturating(rng.gen_range(1..=5));

            let ev = compute(entry, stop, target, stars);
            let p = ev.win_probability;
            assert_eq!(ev.is_positive(), p * ev.r_multiple > Decimal::ONE - p);
        }
    }

    #[test]
    fn test_probability_table() {
        let table: Vec<Decimal> = (1..=5).map(|s| win_probability(Stars::saturating(s))).collect();
        assert_eq!(table, vec![dec!(0.20), dec!(0.35), dec!(0.50), dec!(0.65), dec!(0.80)]);
    }
}
