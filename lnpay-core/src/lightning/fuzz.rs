//! Route fuzz
//!
//! Higher fuzz lets the route source pick more randomised, possibly pricier
//! paths. We start high for privacy and back off each time a route comes back
//! over the fee budget.

/// Fuzz a fresh payment starts with
pub const INITIAL_FUZZ: f64 = 0.75;

/// Amount removed from the fuzz after an over-budget route
pub const FUZZ_STEP: f64 = 0.15;

/// Below this the fuzz is considered spent and an expensive route is final
pub const FUZZ_EXHAUSTED: f64 = 0.01;

/// Next fuzz value after a rejected route, floored at zero
pub fn decay(current: f64) -> f64 {
    let next = current - FUZZ_STEP;
    if next <= 0.0 {
        0.0
    } else {
        next
    }
}

/// True once no fuzz is left to trade for a cheaper route
pub fn is_exhausted(fuzz: f64) -> bool {
    fuzz < FUZZ_EXHAUSTED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_sequence_reaches_zero() {
        let mut fuzz = INITIAL_FUZZ;
        let mut steps = 0;
        while !is_exhausted(fuzz) {
            let next = decay(fuzz);
            assert!(next < fuzz);
            fuzz = next;
            steps += 1;
        }
        // 0.75 -> 0.60 -> 0.45 -> 0.30 -> 0.15 -> ~0 (float residue) or 0
        assert_eq!(steps, 5);
        assert!(fuzz < FUZZ_EXHAUSTED);
        assert_eq!(decay(fuzz), 0.0);
    }

    #[test]
    fn test_decay_floor() {
        assert_eq!(decay(0.0), 0.0);
        assert_eq!(decay(0.1), 0.0);
        assert!((decay(0.75) - 0.60).abs() < 1e-12);
    }
}
