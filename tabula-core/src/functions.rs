use crate::Float;

/// Computes the **logistic sigmoid** `σ(z) = 1 / (1 + e^{-z})`.
///
/// The two branches keep the exponent non-positive, so `exp` never
/// overflows for large `|z|`:
///
/// ```text
/// z >= 0:  1 / (1 + e^{-z})
/// z <  0:  e^{z} / (1 + e^{z})
/// ```
///
/// # Returns
///
/// A value in `[0, 1]`. For `|z|` beyond roughly 37 the result rounds to
/// exactly `0.0` or `1.0` in `f64`; callers needing the open interval should
/// clamp (see [`clamp_probability`]).
///
/// # Examples
///
/// ```rust
/// use tabula_core::functions::sigmoid;
///
/// assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
/// assert!(sigmoid(-800.0) >= 0.0);
/// ```
pub fn sigmoid(z: Float) -> Float {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let ez = z.exp();
        ez / (1.0 + ez)
    }
}

/// `ln(1 + e^x)` without overflow for large positive `x`.
pub fn softplus(x: Float) -> Float {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

/// Computes `ln σ(z)` directly.
///
/// Uses the identity `ln σ(z) = -softplus(-z)`, which stays finite where
/// `sigmoid(z)` has already rounded to `0.0`. The complement follows from
/// `ln(1 - σ(z)) = ln σ(-z)`.
pub fn log_sigmoid(z: Float) -> Float {
    -softplus(-z)
}

/// Largest `f64` strictly below one.
const ONE_BELOW: Float = 1.0 - Float::EPSILON / 2.0;

/// Pulls a probability into the open interval `(0, 1)`.
pub fn clamp_probability(p: Float) -> Float {
    p.clamp(Float::MIN_POSITIVE, ONE_BELOW)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sigmoid_midpoint_and_symmetry() {
        assert_abs_diff_eq!(sigmoid(0.0), 0.5, epsilon = 1e-12);
        for z in [0.3, 1.0, 4.5, 12.0] {
            assert_abs_diff_eq!(sigmoid(z) + sigmoid(-z), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sigmoid_extremes_do_not_overflow() {
        assert!(sigmoid(1_000.0).is_finite());
        assert!(sigmoid(-1_000.0).is_finite());
        assert_eq!(sigmoid(-1_000.0), 0.0);
    }

    #[test]
    fn test_log_sigmoid_matches_naive_form() {
        for z in [-5.0, -0.5, 0.0, 0.5, 5.0] {
            assert_abs_diff_eq!(log_sigmoid(z), sigmoid(z).ln(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_log_sigmoid_stays_finite_when_saturated() {
        let v = log_sigmoid(-800.0);
        assert!(v.is_finite());
        assert_abs_diff_eq!(v, -800.0, epsilon = 1e-9);
        assert_abs_diff_eq!(log_sigmoid(800.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_clamp_probability_is_open_interval() {
        assert!(clamp_probability(0.0) > 0.0);
        assert!(clamp_probability(1.0) < 1.0);
        assert_eq!(clamp_probability(0.25), 0.25);
    }
}
