//! Likelihood evaluation over the full parameter space.

use nalgebra::DVector;

/// A log-likelihood function over the full parameter vector.
///
/// Implementations must return a finite value (or `-inf`) everywhere inside
/// the joint prior support; `NaN` or `+inf` aborts the run. Any closure
/// `Fn(&DVector<f64>) -> f64` is a `Likelihood` through the blanket impl.
pub trait Likelihood {
    /// Natural log of the likelihood at `theta`.
    fn log_value(&self, theta: &DVector<f64>) -> f64;
}

impl<F> Likelihood for F
where
    F: Fn(&DVector<f64>) -> f64,
{
    fn log_value(&self, theta: &DVector<f64>) -> f64 {
        self(theta)
    }
}
