//! Prior distributions over blocks of the parameter space.
//!
//! A prior covers one or more consecutive coordinates; the full parameter
//! space is the concatenation of the blocks declared by the prior list, so
//! different coordinates can carry different priors. The driver delegates
//! initial sampling and support checks to this trait.

use nalgebra::DVector;
use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

use crate::math;

/// Attempts made by the truncated-normal rejection loop before giving up
/// and falling back to a uniform draw inside the truncation bounds.
const MAX_TRUNCATION_ATTEMPTS: usize = 1000;

/// A prior distribution over a block of consecutive coordinates.
pub trait Prior {
    /// Number of coordinates this prior covers.
    fn dimensions(&self) -> usize;

    /// Fill `out` with one point drawn from the prior.
    ///
    /// `out.len()` must equal [`dimensions`](Self::dimensions).
    fn draw(&self, out: &mut [f64], rng: &mut dyn RngCore);

    /// Log prior density at `theta`, `-inf` outside the support.
    ///
    /// `theta` holds only this prior's coordinate block.
    fn log_density(&self, theta: &[f64]) -> f64;
}

/// Uniform prior over an axis-aligned box.
#[derive(Debug, Clone)]
pub struct UniformPrior {
    minima: DVector<f64>,
    maxima: DVector<f64>,
    log_density_inside: f64,
}

impl UniformPrior {
    /// Create a uniform prior over `[minima_i, maxima_i]` per coordinate.
    ///
    /// # Panics
    ///
    /// Panics if the bounds have different lengths, are empty, or if any
    /// `maxima_i <= minima_i`.
    pub fn new(minima: DVector<f64>, maxima: DVector<f64>) -> Self {
        assert_eq!(minima.len(), maxima.len(), "bounds must have equal length");
        assert!(!minima.is_empty(), "bounds must not be empty");
        assert!(
            minima.iter().zip(maxima.iter()).all(|(lo, hi)| hi > lo),
            "each maximum must exceed its minimum"
        );
        let log_volume: f64 = minima
            .iter()
            .zip(maxima.iter())
            .map(|(lo, hi)| (hi - lo).ln())
            .sum();
        Self {
            minima,
            maxima,
            log_density_inside: -log_volume,
        }
    }

    /// Lower bounds of the box.
    pub fn minima(&self) -> &DVector<f64> {
        &self.minima
    }

    /// Upper bounds of the box.
    pub fn maxima(&self) -> &DVector<f64> {
        &self.maxima
    }
}

impl Prior for UniformPrior {
    fn dimensions(&self) -> usize {
        self.minima.len()
    }

    fn draw(&self, out: &mut [f64], rng: &mut dyn RngCore) {
        debug_assert_eq!(out.len(), self.dimensions());
        for (i, value) in out.iter_mut().enumerate() {
            let u: f64 = rng.random();
            *value = self.minima[i] + u * (self.maxima[i] - self.minima[i]);
        }
    }

    fn log_density(&self, theta: &[f64]) -> f64 {
        debug_assert_eq!(theta.len(), self.dimensions());
        let inside = theta
            .iter()
            .enumerate()
            .all(|(i, &x)| x >= self.minima[i] && x <= self.maxima[i]);
        if inside {
            self.log_density_inside
        } else {
            f64::NEG_INFINITY
        }
    }
}

/// Independent normal prior per coordinate. Support is the whole axis.
#[derive(Debug, Clone)]
pub struct NormalPrior {
    means: DVector<f64>,
    std_devs: DVector<f64>,
}

impl NormalPrior {
    /// Create a normal prior with per-coordinate means and standard deviations.
    ///
    /// # Panics
    ///
    /// Panics if the arrays have different lengths, are empty, or if any
    /// standard deviation is not strictly positive.
    pub fn new(means: DVector<f64>, std_devs: DVector<f64>) -> Self {
        assert_eq!(means.len(), std_devs.len(), "means and std devs must have equal length");
        assert!(!means.is_empty(), "parameters must not be empty");
        assert!(
            std_devs.iter().all(|&s| s > 0.0),
            "standard deviations must be positive"
        );
        Self { means, std_devs }
    }
}

impl Prior for NormalPrior {
    fn dimensions(&self) -> usize {
        self.means.len()
    }

    fn draw(&self, out: &mut [f64], rng: &mut dyn RngCore) {
        debug_assert_eq!(out.len(), self.dimensions());
        for (i, value) in out.iter_mut().enumerate() {
            let z: f64 = rng.sample(StandardNormal);
            *value = self.means[i] + z * self.std_devs[i];
        }
    }

    fn log_density(&self, theta: &[f64]) -> f64 {
        debug_assert_eq!(theta.len(), self.dimensions());
        theta
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let z = (x - self.means[i]) / self.std_devs[i];
                -0.5 * z * z - self.std_devs[i].ln() - 0.5 * (2.0 * std::f64::consts::PI).ln()
            })
            .sum()
    }
}

/// Normal prior truncated to an axis-aligned box.
///
/// Drawing uses rejection from the parent normal, which is efficient as long
/// as the box retains a non-negligible fraction of the normal's mass. After
/// a thousand rejections a coordinate falls back to a uniform draw inside
/// its bounds.
#[derive(Debug, Clone)]
pub struct TruncatedNormalPrior {
    means: DVector<f64>,
    std_devs: DVector<f64>,
    minima: DVector<f64>,
    maxima: DVector<f64>,
    log_normalizations: DVector<f64>,
}

impl TruncatedNormalPrior {
    /// Create a truncated normal prior.
    ///
    /// # Panics
    ///
    /// Panics if the arrays have different lengths, are empty, if any standard
    /// deviation is not strictly positive, or if any `maxima_i <= minima_i`.
    pub fn new(
        means: DVector<f64>,
        std_devs: DVector<f64>,
        minima: DVector<f64>,
        maxima: DVector<f64>,
    ) -> Self {
        let d = means.len();
        assert!(d > 0, "parameters must not be empty");
        assert!(
            std_devs.len() == d && minima.len() == d && maxima.len() == d,
            "parameter arrays must have equal length"
        );
        assert!(
            std_devs.iter().all(|&s| s > 0.0),
            "standard deviations must be positive"
        );
        assert!(
            minima.iter().zip(maxima.iter()).all(|(lo, hi)| hi > lo),
            "each maximum must exceed its minimum"
        );

        // ln(Phi((b - mu)/sigma) - Phi((a - mu)/sigma)) per coordinate
        let log_normalizations = DVector::from_iterator(
            d,
            (0..d).map(|i| {
                let z_lo = (minima[i] - means[i]) / std_devs[i];
                let z_hi = (maxima[i] - means[i]) / std_devs[i];
                (math::normal_cdf(z_hi) - math::normal_cdf(z_lo)).ln()
            }),
        );
        Self {
            means,
            std_devs,
            minima,
            maxima,
            log_normalizations,
        }
    }
}

impl Prior for TruncatedNormalPrior {
    fn dimensions(&self) -> usize {
        self.means.len()
    }

    fn draw(&self, out: &mut [f64], rng: &mut dyn RngCore) {
        debug_assert_eq!(out.len(), self.dimensions());
        for (i, value) in out.iter_mut().enumerate() {
            let mut accepted = None;
            for _ in 0..MAX_TRUNCATION_ATTEMPTS {
                let z: f64 = rng.sample(StandardNormal);
                let x = self.means[i] + z * self.std_devs[i];
                if x >= self.minima[i] && x <= self.maxima[i] {
                    accepted = Some(x);
                    break;
                }
            }
            *value = accepted.unwrap_or_else(|| {
                let u: f64 = rng.random();
                self.minima[i] + u * (self.maxima[i] - self.minima[i])
            });
        }
    }

    fn log_density(&self, theta: &[f64]) -> f64 {
        debug_assert_eq!(theta.len(), self.dimensions());
        let mut total = 0.0;
        for (i, &x) in theta.iter().enumerate() {
            if x < self.minima[i] || x > self.maxima[i] {
                return f64::NEG_INFINITY;
            }
            let z = (x - self.means[i]) / self.std_devs[i];
            total += -0.5 * z * z
                - self.std_devs[i].ln()
                - 0.5 * (2.0 * std::f64::consts::PI).ln()
                - self.log_normalizations[i];
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use crate::constants::DEFAULT_SEED;

    #[test]
    fn test_uniform_draws_stay_in_support() {
        let prior = UniformPrior::new(
            DVector::from_vec(vec![-1.0, 0.0]),
            DVector::from_vec(vec![1.0, 10.0]),
        );
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(DEFAULT_SEED);
        let mut point = [0.0; 2];
        for _ in 0..1000 {
            prior.draw(&mut point, &mut rng);
            assert!(prior.log_density(&point).is_finite());
        }
    }

    #[test]
    fn test_uniform_density_outside_support() {
        let prior = UniformPrior::new(
            DVector::from_vec(vec![0.0]),
            DVector::from_vec(vec![2.0]),
        );
        assert_eq!(prior.log_density(&[3.0]), f64::NEG_INFINITY);
        // Density inside is 1 / volume = 1/2
        assert!((prior.log_density(&[1.0]) - 0.5_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_normal_density_peak() {
        let prior = NormalPrior::new(
            DVector::from_vec(vec![1.0]),
            DVector::from_vec(vec![2.0]),
        );
        let at_mean = prior.log_density(&[1.0]);
        let expected = -(2.0_f64.ln()) - 0.5 * (2.0 * std::f64::consts::PI).ln();
        assert!((at_mean - expected).abs() < 1e-12);
        assert!(prior.log_density(&[5.0]) < at_mean);
    }

    #[test]
    fn test_truncated_normal_draws_stay_in_bounds() {
        let prior = TruncatedNormalPrior::new(
            DVector::from_vec(vec![0.0]),
            DVector::from_vec(vec![1.0]),
            DVector::from_vec(vec![-0.5]),
            DVector::from_vec(vec![0.5]),
        );
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(DEFAULT_SEED);
        let mut point = [0.0; 1];
        for _ in 0..1000 {
            prior.draw(&mut point, &mut rng);
            assert!((-0.5..=0.5).contains(&point[0]));
        }
        assert_eq!(prior.log_density(&[0.6]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_truncated_normal_density_exceeds_parent() {
        // Truncation renormalizes, so the density inside the bounds is
        // strictly larger than the parent normal's.
        let parent = NormalPrior::new(
            DVector::from_vec(vec![0.0]),
            DVector::from_vec(vec![1.0]),
        );
        let truncated = TruncatedNormalPrior::new(
            DVector::from_vec(vec![0.0]),
            DVector::from_vec(vec![1.0]),
            DVector::from_vec(vec![-1.0]),
            DVector::from_vec(vec![1.0]),
        );
        assert!(truncated.log_density(&[0.3]) > parent.log_density(&[0.3]));
    }

    #[test]
    #[should_panic(expected = "each maximum must exceed its minimum")]
    fn test_uniform_rejects_inverted_bounds() {
        let _ = UniformPrior::new(
            DVector::from_vec(vec![1.0]),
            DVector::from_vec(vec![0.0]),
        );
    }
}
