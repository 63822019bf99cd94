use serde::{Deserialize, Serialize};

/// The three normalized signals produced by one analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub demand: u8,
    pub risk: u8,
    pub competition: u8,
}

/// Rounds and clamps a raw signal value into the 0..=100 score range.
///
/// Non-finite inputs collapse to 0 rather than poisoning downstream
/// arithmetic.
pub(crate) fn clamp_score(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_into_score_range() {
        assert_eq!(clamp_score(-3.0), 0);
        assert_eq!(clamp_score(0.4), 0);
        assert_eq!(clamp_score(49.5), 50);
        assert_eq!(clamp_score(100.0), 100);
        assert_eq!(clamp_score(250.0), 100);
    }

    #[test]
    fn non_finite_values_collapse_to_zero() {
        assert_eq!(clamp_score(f64::NAN), 0);
        assert_eq!(clamp_score(f64::INFINITY), 0);
    }
}
