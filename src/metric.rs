//! Pairwise distances between parameter vectors.

use nalgebra::DVector;

/// Scalar distance between two parameter vectors.
///
/// Implementations must be symmetric, non-negative, and zero exactly when
/// `a == b`. The k-means clusterer assigns points to centroids through this
/// trait, so swapping the metric changes the cluster geometry.
pub trait Metric {
    /// Distance between `a` and `b`.
    fn distance(&self, a: &DVector<f64>, b: &DVector<f64>) -> f64;
}

/// Standard Euclidean (L2) distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanMetric;

impl Metric for EuclideanMetric {
    fn distance(&self, a: &DVector<f64>, b: &DVector<f64>) -> f64 {
        (a - b).norm()
    }
}
