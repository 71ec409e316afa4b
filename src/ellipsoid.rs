//! Bounding ellipsoids for clusters of live points.
//!
//! An ellipsoid is fitted to a point set from its sample covariance:
//! the eigenvectors give the principal frame, the eigenvalues the squared
//! semi-axes. The raw covariance ellipsoid does not contain every sample
//! point, so the axes are scaled by the largest Mahalanobis distance of a
//! source point; the enlargement factor then stretches the result further to
//! compensate for finite-sample covariance bias.
//!
//! ## Geometry
//!
//! With center `c`, orthonormal eigenvectors `Q`, and semi-axes `a`:
//! - containment: `sum_i (y_i / a_i)^2 <= 1` where `y = Q^T (theta - c)`
//! - volume: `V = V_ball(D) * prod_i a_i`
//! - interior sampling: uniform unit-ball point mapped through `Q diag(a)`

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::{Rng, RngCore};

use crate::constants::EIGENVALUE_FLOOR_RATIO;
use crate::math;

/// Bounding ellipsoid of a point set.
#[derive(Debug, Clone)]
pub struct Ellipsoid {
    center: DVector<f64>,
    covariance: DMatrix<f64>,
    eigenvalues: DVector<f64>,
    eigenvectors: DMatrix<f64>,
    semi_axes: DVector<f64>,
    enlargement: f64,
    hyper_volume: f64,
    n_points: usize,
}

impl Ellipsoid {
    /// Fit the bounding ellipsoid of `points` and stretch each semi-axis by
    /// `enlargement`.
    ///
    /// The unenlarged ellipsoid (`enlargement = 1`) contains every source
    /// point: after the eigendecomposition the axes are scaled by the largest
    /// Mahalanobis distance among the points. Eigenvalues below
    /// `EIGENVALUE_FLOOR_RATIO * lambda_max` are clamped up to keep
    /// near-degenerate clusters usable.
    ///
    /// # Panics
    ///
    /// Panics if `points.len() <= D` (the covariance would be singular) or if
    /// `enlargement < 1`.
    pub fn build(points: &[DVector<f64>], enlargement: f64) -> Self {
        let n = points.len();
        assert!(n >= 2, "an ellipsoid needs at least two points");
        let d = points[0].len();
        assert!(n > d, "need at least D + 1 = {} points, got {}", d + 1, n);
        assert!(enlargement >= 1.0, "enlargement must be >= 1");

        // Componentwise mean
        let mut center = DVector::zeros(d);
        for p in points {
            center += p;
        }
        center /= n as f64;

        // Unbiased sample covariance
        let mut covariance = DMatrix::zeros(d, d);
        for p in points {
            let diff = p - &center;
            covariance += &diff * diff.transpose();
        }
        covariance /= (n - 1) as f64;

        let eigen = SymmetricEigen::new(covariance.clone());
        let mut eigenvalues = eigen.eigenvalues;
        let eigenvectors = eigen.eigenvectors;

        // Clamp non-positive or tiny eigenvalues relative to the largest one
        let lambda_max = eigenvalues.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let floor = EIGENVALUE_FLOOR_RATIO * lambda_max.max(f64::MIN_POSITIVE);
        for lambda in eigenvalues.iter_mut() {
            *lambda = lambda.max(floor);
        }

        // Scale so the unenlarged ellipsoid contains every source point
        let mut max_mahalanobis_sq: f64 = 0.0;
        for p in points {
            let y = eigenvectors.transpose() * (p - &center);
            let dist_sq: f64 = y
                .iter()
                .zip(eigenvalues.iter())
                .map(|(yi, li)| yi * yi / li)
                .sum();
            max_mahalanobis_sq = max_mahalanobis_sq.max(dist_sq);
        }
        if max_mahalanobis_sq == 0.0 {
            max_mahalanobis_sq = 1.0;
        }

        let semi_axes = DVector::from_iterator(
            d,
            eigenvalues
                .iter()
                .map(|&l| enlargement * (l * max_mahalanobis_sq).sqrt()),
        );

        let ln_volume = math::ln_unit_ball_volume(d)
            + semi_axes.iter().map(|a| a.ln()).sum::<f64>();

        Self {
            center,
            covariance,
            eigenvalues,
            eigenvectors,
            semi_axes,
            enlargement,
            hyper_volume: ln_volume.exp(),
            n_points: n,
        }
    }

    /// Whether `theta` lies inside (or on) the enlarged ellipsoid.
    pub fn contains(&self, theta: &DVector<f64>) -> bool {
        let y = self.eigenvectors.transpose() * (theta - &self.center);
        let dist_sq: f64 = y
            .iter()
            .zip(self.semi_axes.iter())
            .map(|(yi, ai)| (yi / ai) * (yi / ai))
            .sum();
        dist_sq <= 1.0
    }

    /// Draw a point uniformly from the ellipsoid interior.
    ///
    /// A standard-normal vector is normalized to a unit-sphere direction,
    /// scaled by `u^{1/D}` for uniform ball density, then mapped into the
    /// principal frame.
    pub fn sample_interior(&self, rng: &mut dyn RngCore) -> DVector<f64> {
        let d = self.center.len();
        let mut direction = DVector::zeros(d);
        loop {
            for z in direction.iter_mut() {
                *z = rng.sample(rand_distr::StandardNormal);
            }
            let norm = direction.norm();
            if norm > 0.0 {
                direction /= norm;
                break;
            }
        }
        let u: f64 = rng.random();
        let radius = u.powf(1.0 / d as f64);

        let ball = direction * radius;
        let scaled = DVector::from_iterator(
            d,
            ball.iter().zip(self.semi_axes.iter()).map(|(b, a)| b * a),
        );
        &self.center + &self.eigenvectors * scaled
    }

    /// Whether this ellipsoid overlaps `other`.
    ///
    /// Checks mutual center containment, then probes the semi-axis endpoints
    /// of each ellipsoid against the other. This catches every overlap the
    /// union sampler cares about; grazing intersections away from all probe
    /// points may be missed, which only makes the multiplicity correction
    /// slightly conservative.
    pub fn overlaps(&self, other: &Ellipsoid) -> bool {
        if self.contains(&other.center) || other.contains(&self.center) {
            return true;
        }
        self.axis_endpoints()
            .any(|p| other.contains(&p))
            || other.axis_endpoints().any(|p| self.contains(&p))
    }

    fn axis_endpoints(&self) -> impl Iterator<Item = DVector<f64>> + '_ {
        let d = self.center.len();
        (0..d).flat_map(move |j| {
            let axis = self.eigenvectors.column(j) * self.semi_axes[j];
            [&self.center + &axis, &self.center - &axis]
        })
    }

    /// Ellipsoid center (componentwise mean of the source points).
    pub fn center(&self) -> &DVector<f64> {
        &self.center
    }

    /// Unbiased sample covariance of the source points.
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Clamped covariance eigenvalues, paired with [`eigenvectors`](Self::eigenvectors) columns.
    pub fn eigenvalues(&self) -> &DVector<f64> {
        &self.eigenvalues
    }

    /// Orthonormal eigenvector matrix (principal frame, one column per axis).
    pub fn eigenvectors(&self) -> &DMatrix<f64> {
        &self.eigenvectors
    }

    /// Effective semi-axes, enlargement included.
    pub fn semi_axes(&self) -> &DVector<f64> {
        &self.semi_axes
    }

    /// Enlargement factor applied to the semi-axes.
    pub fn enlargement(&self) -> f64 {
        self.enlargement
    }

    /// Hyper-volume of the enlarged ellipsoid.
    pub fn hyper_volume(&self) -> f64 {
        self.hyper_volume
    }

    /// Number of source points the ellipsoid was fitted to.
    pub fn n_points(&self) -> usize {
        self.n_points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use crate::constants::DEFAULT_SEED;

    fn gaussian_cloud(n: usize, d: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<DVector<f64>> {
        (0..n)
            .map(|_| {
                DVector::from_iterator(
                    d,
                    (0..d).map(|_| rng.sample::<f64, _>(rand_distr::StandardNormal)),
                )
            })
            .collect()
    }

    #[test]
    fn test_source_points_contained_without_enlargement() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(DEFAULT_SEED);
        let points = gaussian_cloud(50, 3, &mut rng);
        let ellipsoid = Ellipsoid::build(&points, 1.0);
        for p in &points {
            assert!(ellipsoid.contains(p), "source point escaped the ellipsoid");
        }
    }

    #[test]
    fn test_interior_samples_are_contained() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(DEFAULT_SEED);
        let points = gaussian_cloud(30, 2, &mut rng);
        let ellipsoid = Ellipsoid::build(&points, 1.0);
        for _ in 0..2000 {
            let sample = ellipsoid.sample_interior(&mut rng);
            assert!(ellipsoid.contains(&sample));
        }
    }

    #[test]
    fn test_enlargement_scales_volume() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(DEFAULT_SEED);
        let points = gaussian_cloud(40, 2, &mut rng);
        let unit = Ellipsoid::build(&points, 1.0);
        let doubled = Ellipsoid::build(&points, 2.0);
        // Each of the D = 2 axes doubles, so the volume quadruples
        let ratio = doubled.hyper_volume() / unit.hyper_volume();
        assert!((ratio - 4.0).abs() < 1e-9, "volume ratio was {}", ratio);
    }

    #[test]
    fn test_far_point_not_contained() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(DEFAULT_SEED);
        let points = gaussian_cloud(40, 2, &mut rng);
        let ellipsoid = Ellipsoid::build(&points, 1.0);
        let far = DVector::from_vec(vec![1e3, 1e3]);
        assert!(!ellipsoid.contains(&far));
    }

    #[test]
    fn test_overlap_detection() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(DEFAULT_SEED);
        let cloud = gaussian_cloud(40, 2, &mut rng);
        let shifted_slightly: Vec<_> = cloud
            .iter()
            .map(|p| p + DVector::from_vec(vec![0.5, 0.0]))
            .collect();
        let shifted_far: Vec<_> = cloud
            .iter()
            .map(|p| p + DVector::from_vec(vec![1e4, 0.0]))
            .collect();

        let a = Ellipsoid::build(&cloud, 1.0);
        let b = Ellipsoid::build(&shifted_slightly, 1.0);
        let c = Ellipsoid::build(&shifted_far, 1.0);

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_near_degenerate_cluster_still_builds() {
        // Points almost on a line: one eigenvalue is ~0 and gets floored
        let points: Vec<_> = (0..10)
            .map(|i| DVector::from_vec(vec![i as f64, i as f64 * 1e-14]))
            .collect();
        let ellipsoid = Ellipsoid::build(&points, 1.0);
        assert!(ellipsoid.eigenvalues().iter().all(|&l| l > 0.0));
        assert!(ellipsoid.hyper_volume().is_finite());
        for p in &points {
            assert!(ellipsoid.contains(p));
        }
    }
}
