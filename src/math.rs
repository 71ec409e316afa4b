//! Numerically stable log-space arithmetic and sorting helpers.
//!
//! Nested sampling accumulates evidence as a sum of terms spanning hundreds
//! of orders of magnitude, so every addition happens in log space via
//! log-sum-exp. `libm` supplies `lgamma` for the unit-ball volume constant.

/// Stable `ln(e^x + e^y)`.
///
/// Factoring out the larger exponent keeps the intermediate `exp` in `[0, 1]`.
/// `-inf` operands behave like adding zero in normal space.
pub fn log_sum_exp(x: f64, y: f64) -> f64 {
    if x == f64::NEG_INFINITY {
        return y;
    }
    if y == f64::NEG_INFINITY {
        return x;
    }
    let (hi, lo) = if x > y { (x, y) } else { (y, x) };
    hi + (lo - hi).exp().ln_1p()
}

/// Stable `ln(sum_i e^{x_i})` over a slice.
///
/// Returns `-inf` for an empty slice or a slice of `-inf` values.
pub fn log_sum_exp_slice(values: &[f64]) -> f64 {
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = values.iter().map(|&v| (v - hi).exp()).sum();
    hi + sum.ln()
}

/// Stable `ln(1 - e^x)` for `x <= 0`.
///
/// Returns `-inf` when `x >= 0`, where the true value would be undefined or
/// `-inf`; the prior-mass accumulator only ever approaches zero remaining
/// mass from below.
pub fn ln_one_minus_exp(x: f64) -> f64 {
    if x >= 0.0 {
        f64::NEG_INFINITY
    } else {
        (-x.exp()).ln_1p()
    }
}

/// Log-volume of the unit ball in `d` dimensions.
///
/// `ln V_d = (d/2) ln(pi) - ln Gamma(d/2 + 1)`; multiplying by the product of
/// semi-axes (in log space) gives an ellipsoid's hyper-volume.
pub fn ln_unit_ball_volume(d: usize) -> f64 {
    let half_d = d as f64 / 2.0;
    half_d * std::f64::consts::PI.ln() - libm::lgamma(half_d + 1.0)
}

/// Standard normal CDF: `Phi(x) = (1 + erf(x / sqrt(2))) / 2`.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x * std::f64::consts::FRAC_1_SQRT_2))
}

/// Permutation that sorts `values` in increasing order.
///
/// Sorting is by `total_cmp`, so the permutation is deterministic even in the
/// presence of signed zeros. Used to order marginal posterior distributions
/// without disturbing the companion probability array.
pub fn sorted_permutation(values: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    indices
}
