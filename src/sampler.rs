//! Constrained drawing from a union of cluster ellipsoids.
//!
//! Each live-point cluster gets a bounding ellipsoid, enlarged by
//!
//! ```text
//! f_c = f0 * (N_live / n_c)^(s/2) * X^s
//! ```
//!
//! where `f0` is the initial enlargement fraction, `s` the shrinking rate and
//! `X` the remaining prior mass: small clusters get stretched more to make up
//! for their noisier covariance, and all enlargement decays as the prior mass
//! contracts onto the iso-likelihood contour. Candidates are drawn uniformly
//! over the union of the enlarged ellipsoids with the Feroz–Hobson
//! multiplicity correction, filtered by prior support, and accepted once the
//! likelihood exceeds the current threshold.

use nalgebra::DVector;
use rand::{Rng, RngCore};

use crate::cluster::Clustering;
use crate::ellipsoid::Ellipsoid;
use crate::error::RunError;
use crate::likelihood::Likelihood;
use crate::prior::Prior;

/// Multi-ellipsoidal sampler for the hard-threshold constrained draw.
#[derive(Debug, Clone)]
pub struct MultiEllipsoidalSampler {
    initial_enlargement_fraction: f64,
    shrinking_rate: f64,
    ellipsoids: Vec<Ellipsoid>,
}

impl MultiEllipsoidalSampler {
    /// Create a sampler with the given enlargement parameters.
    ///
    /// # Panics
    ///
    /// Panics if `initial_enlargement_fraction` is negative or
    /// `shrinking_rate` is outside `[0, 1]`.
    pub fn new(initial_enlargement_fraction: f64, shrinking_rate: f64) -> Self {
        assert!(
            initial_enlargement_fraction >= 0.0,
            "initial enlargement fraction must be non-negative"
        );
        assert!(
            (0.0..=1.0).contains(&shrinking_rate),
            "shrinking rate must lie in [0, 1]"
        );
        Self {
            initial_enlargement_fraction,
            shrinking_rate,
            ellipsoids: Vec::new(),
        }
    }

    /// Fit one enlarged ellipsoid per cluster of the live set.
    ///
    /// Clusters with `D` or fewer members cannot support a covariance fit and
    /// are merged into their nearest neighbor by centroid distance before
    /// fitting. `log_remaining_mass` is the driver's `ln X` accumulator.
    pub fn build_ellipsoids(
        &mut self,
        sample: &[DVector<f64>],
        clustering: &Clustering,
        log_remaining_mass: f64,
    ) {
        let n_live = sample.len();
        let d = sample[0].len();

        let mut groups: Vec<Vec<DVector<f64>>> = vec![Vec::new(); clustering.n_clusters];
        for (point, &id) in sample.iter().zip(clustering.indices.iter()) {
            groups[id].push(point.clone());
        }
        // Live-point reduction can empty a cluster between clustering ticks
        groups.retain(|g| !g.is_empty());
        merge_undersized_groups(&mut groups, d);

        let remaining_mass = log_remaining_mass.exp();
        self.ellipsoids.clear();
        for group in &groups {
            let enlargement = (self.initial_enlargement_fraction
                * (n_live as f64 / group.len() as f64).powf(self.shrinking_rate / 2.0)
                * remaining_mass.powf(self.shrinking_rate))
            .max(1.0);
            self.ellipsoids.push(Ellipsoid::build(group, enlargement));
        }
    }

    /// Draw a point with `logL > log_likelihood_constraint`.
    ///
    /// Samples the ellipsoid union: a cluster is picked with probability
    /// proportional to its enlarged volume, a candidate is drawn uniformly in
    /// it, and the candidate survives with probability `1/m` where `m` is the
    /// number of ellipsoids containing it. Candidates outside the joint prior
    /// support are rejected. Returns `Ok(None)` when `max_n_draw_attempts`
    /// candidates were tried without satisfying the constraint.
    ///
    /// # Errors
    ///
    /// [`RunError::NonFiniteLikelihood`] if the likelihood returns `NaN` or
    /// `+inf` on a supported candidate.
    pub fn draw_with_constraint<L: Likelihood>(
        &self,
        rng: &mut dyn RngCore,
        priors: &[Box<dyn Prior>],
        likelihood: &L,
        log_likelihood_constraint: f64,
        max_n_draw_attempts: usize,
    ) -> Result<Option<(DVector<f64>, f64)>, RunError> {
        debug_assert!(!self.ellipsoids.is_empty(), "build_ellipsoids not called");
        let total_volume: f64 = self.ellipsoids.iter().map(|e| e.hyper_volume()).sum();

        for _ in 0..max_n_draw_attempts {
            // Pick a cluster with probability proportional to its volume
            let mut remaining = rng.random::<f64>() * total_volume;
            let mut chosen = self.ellipsoids.len() - 1;
            for (c, ellipsoid) in self.ellipsoids.iter().enumerate() {
                remaining -= ellipsoid.hyper_volume();
                if remaining <= 0.0 {
                    chosen = c;
                    break;
                }
            }

            let candidate = self.ellipsoids[chosen].sample_interior(rng);

            // Feroz-Hobson correction for the union of overlapping ellipsoids:
            // keep with probability 1/m, m = number of ellipsoids containing
            // the candidate (the source ellipsoid always counts).
            let multiplicity = self
                .ellipsoids
                .iter()
                .filter(|e| e.contains(&candidate))
                .count()
                .max(1);
            if multiplicity > 1 && rng.random::<f64>() >= 1.0 / multiplicity as f64 {
                continue;
            }

            if !in_prior_support(priors, &candidate) {
                continue;
            }

            let log_likelihood = likelihood.log_value(&candidate);
            if log_likelihood.is_nan() || log_likelihood == f64::INFINITY {
                return Err(RunError::NonFiniteLikelihood {
                    value: log_likelihood,
                    point: candidate.iter().copied().collect(),
                });
            }
            if log_likelihood > log_likelihood_constraint {
                return Ok(Some((candidate, log_likelihood)));
            }
        }

        Ok(None)
    }

    /// Ellipsoids from the latest [`build_ellipsoids`](Self::build_ellipsoids) call.
    pub fn ellipsoids(&self) -> &[Ellipsoid] {
        &self.ellipsoids
    }

    /// Configured initial enlargement fraction `f0`.
    pub fn initial_enlargement_fraction(&self) -> f64 {
        self.initial_enlargement_fraction
    }

    /// Configured shrinking rate `s`.
    pub fn shrinking_rate(&self) -> f64 {
        self.shrinking_rate
    }
}

/// Whether every prior block of `theta` has finite log density.
fn in_prior_support(priors: &[Box<dyn Prior>], theta: &DVector<f64>) -> bool {
    let coords = theta.as_slice();
    let mut offset = 0;
    for prior in priors {
        let d = prior.dimensions();
        if prior.log_density(&coords[offset..offset + d]) == f64::NEG_INFINITY {
            return false;
        }
        offset += d;
    }
    true
}

/// Merge groups of `D` or fewer points into their nearest neighbor by
/// centroid distance until every surviving group can support an ellipsoid.
fn merge_undersized_groups(groups: &mut Vec<Vec<DVector<f64>>>, d: usize) {
    loop {
        if groups.len() <= 1 {
            return;
        }
        let undersized = groups.iter().position(|g| g.len() <= d);
        let Some(victim) = undersized else { return };

        let victim_centroid = centroid(&groups[victim]);
        let nearest = groups
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != victim)
            .min_by(|(_, a), (_, b)| {
                let da = (centroid(a) - &victim_centroid).norm();
                let db = (centroid(b) - &victim_centroid).norm();
                da.total_cmp(&db)
            })
            .map(|(i, _)| i);
        let Some(target) = nearest else { return };

        let members = groups.swap_remove(victim);
        // swap_remove may have moved the target into the victim's slot
        let target = if target == groups.len() { victim } else { target };
        groups[target].extend(members);
    }
}

fn centroid(points: &[DVector<f64>]) -> DVector<f64> {
    let mut sum = DVector::zeros(points[0].len());
    for p in points {
        sum += p;
    }
    sum / points.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use crate::constants::DEFAULT_SEED;
    use crate::prior::UniformPrior;

    fn uniform_cloud(
        n: usize,
        lo: f64,
        hi: f64,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Vec<DVector<f64>> {
        (0..n)
            .map(|_| {
                DVector::from_vec(vec![
                    lo + rng.random::<f64>() * (hi - lo),
                    lo + rng.random::<f64>() * (hi - lo),
                ])
            })
            .collect()
    }

    fn box_priors(lo: f64, hi: f64) -> Vec<Box<dyn Prior>> {
        vec![Box::new(UniformPrior::new(
            DVector::from_vec(vec![lo, lo]),
            DVector::from_vec(vec![hi, hi]),
        ))]
    }

    #[test]
    fn test_one_ellipsoid_per_cluster() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(DEFAULT_SEED);
        let mut sample = uniform_cloud(20, -1.0, 0.0, &mut rng);
        sample.extend(uniform_cloud(20, 5.0, 6.0, &mut rng));
        let clustering = Clustering {
            n_clusters: 2,
            indices: [vec![0; 20], vec![1; 20]].concat(),
            sizes: vec![20, 20],
        };

        let mut sampler = MultiEllipsoidalSampler::new(1.5, 0.2);
        sampler.build_ellipsoids(&sample, &clustering, 0.0);

        assert_eq!(sampler.ellipsoids().len(), 2);
        assert!(sampler.ellipsoids().iter().all(|e| e.hyper_volume() > 0.0));
        assert!(sampler.ellipsoids().iter().all(|e| e.enlargement() >= 1.0));
    }

    #[test]
    fn test_undersized_cluster_merged_at_assembly() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(DEFAULT_SEED);
        let mut sample = uniform_cloud(20, -1.0, 0.0, &mut rng);
        sample.extend(uniform_cloud(2, 5.0, 6.0, &mut rng));
        // A 2-point cluster in 2-D cannot hold an ellipsoid
        let clustering = Clustering {
            n_clusters: 2,
            indices: [vec![0; 20], vec![1; 2]].concat(),
            sizes: vec![20, 2],
        };

        let mut sampler = MultiEllipsoidalSampler::new(1.5, 0.2);
        sampler.build_ellipsoids(&sample, &clustering, 0.0);

        assert_eq!(sampler.ellipsoids().len(), 1);
        assert_eq!(sampler.ellipsoids()[0].n_points(), 22);
    }

    #[test]
    fn test_draw_respects_constraint_and_support() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(DEFAULT_SEED);
        let sample = uniform_cloud(50, -2.0, 2.0, &mut rng);
        let priors = box_priors(-5.0, 5.0);
        let gaussian = |theta: &DVector<f64>| -0.5 * theta.norm_squared();

        let mut sampler = MultiEllipsoidalSampler::new(2.0, 0.2);
        sampler.build_ellipsoids(&sample, &Clustering::single(50), 0.0);

        let threshold = -3.0;
        for _ in 0..50 {
            let (point, log_likelihood) = sampler
                .draw_with_constraint(&mut rng, &priors, &gaussian, threshold, 10_000)
                .unwrap()
                .expect("a satisfying point exists well inside the ellipsoid");
            assert!(log_likelihood > threshold);
            assert!((log_likelihood + 0.5 * point.norm_squared()).abs() < 1e-12);
            assert!(point.iter().all(|&x| (-5.0..=5.0).contains(&x)));
        }
    }

    #[test]
    fn test_draw_exhaustion_returns_none() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(DEFAULT_SEED);
        let sample = uniform_cloud(30, -2.0, 2.0, &mut rng);
        let priors = box_priors(-5.0, 5.0);
        let gaussian = |theta: &DVector<f64>| -0.5 * theta.norm_squared();

        let mut sampler = MultiEllipsoidalSampler::new(1.5, 0.2);
        sampler.build_ellipsoids(&sample, &Clustering::single(30), 0.0);

        // No point can beat an infinite threshold
        let result = sampler
            .draw_with_constraint(&mut rng, &priors, &gaussian, f64::INFINITY, 200)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_non_finite_likelihood_aborts() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(DEFAULT_SEED);
        let sample = uniform_cloud(30, -2.0, 2.0, &mut rng);
        let priors = box_priors(-5.0, 5.0);
        let broken = |_: &DVector<f64>| f64::NAN;

        let mut sampler = MultiEllipsoidalSampler::new(1.5, 0.2);
        sampler.build_ellipsoids(&sample, &Clustering::single(30), 0.0);

        let result = sampler.draw_with_constraint(&mut rng, &priors, &broken, -1.0, 100);
        assert!(matches!(result, Err(RunError::NonFiniteLikelihood { .. })));
    }
}
