//! Live-point clustering with k-means and BIC model selection.
//!
//! The clusterer partitions the live set so the sampler can fit one bounding
//! ellipsoid per likelihood island. The cluster count is chosen by scanning a
//! range of candidate `k` values with random-restart k-means and keeping the
//! `k` that minimizes a BIC-like score
//!
//! ```text
//! score(k) = N ln(S(k)/N) + k D ln(N)
//! ```
//!
//! where `S(k)` is the within-cluster sum of squared distances. `S(k)` is
//! non-increasing in `k` while the penalty grows linearly, so the score is
//! guarded against the always-split degenerate minimum.

use nalgebra::DVector;
use rand::{Rng, RngCore};

use crate::constants::MAX_KMEANS_ITERATIONS;
use crate::error::ConfigError;
use crate::metric::Metric;

/// Result of a clustering pass over the live set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clustering {
    /// Number of clusters found.
    pub n_clusters: usize,
    /// Cluster id of each point, in `[0, n_clusters)`.
    pub indices: Vec<usize>,
    /// Number of points per cluster; sums to the point count.
    pub sizes: Vec<usize>,
}

impl Clustering {
    /// The trivial clustering: every point in one cluster.
    pub fn single(n_points: usize) -> Self {
        Self {
            n_clusters: 1,
            indices: vec![0; n_points],
            sizes: vec![n_points],
        }
    }
}

/// Partitions a set of parameter vectors into clusters.
pub trait Clusterer {
    /// Cluster `sample`, consuming randomness from `rng`.
    fn cluster(&self, sample: &[DVector<f64>], rng: &mut dyn RngCore, verbose: bool)
        -> Clustering;
}

/// Random-restart k-means with BIC selection of the cluster count.
#[derive(Debug, Clone)]
pub struct KmeansClusterer<M: Metric> {
    metric: M,
    min_n_clusters: usize,
    max_n_clusters: usize,
    n_trials: usize,
    rel_tolerance: f64,
}

impl<M: Metric> KmeansClusterer<M> {
    /// Create a clusterer scanning `[min_n_clusters, max_n_clusters]` with
    /// `n_trials` random restarts per candidate count.
    ///
    /// A trial iterates until the relative decrease of the total
    /// within-cluster cost drops below `rel_tolerance`.
    pub fn new(
        metric: M,
        min_n_clusters: usize,
        max_n_clusters: usize,
        n_trials: usize,
        rel_tolerance: f64,
    ) -> Result<Self, ConfigError> {
        if min_n_clusters == 0 || max_n_clusters < min_n_clusters {
            return Err(ConfigError::InvalidClusterRange {
                min: min_n_clusters,
                max: max_n_clusters,
            });
        }
        if !(rel_tolerance > 0.0) {
            return Err(ConfigError::NonPositiveTolerance {
                name: "rel_tolerance",
                value: rel_tolerance,
            });
        }
        if n_trials == 0 {
            return Err(ConfigError::NonPositiveTolerance {
                name: "n_trials",
                value: 0.0,
            });
        }
        Ok(Self {
            metric,
            min_n_clusters,
            max_n_clusters,
            n_trials,
            rel_tolerance,
        })
    }

    /// Run one k-means trial from random initial centroids.
    ///
    /// Returns the final cost and assignment.
    fn run_trial(
        &self,
        sample: &[DVector<f64>],
        k: usize,
        rng: &mut dyn RngCore,
    ) -> (f64, Vec<usize>) {
        let n = sample.len();

        // Initial centroids: k distinct sample points
        let mut chosen = vec![false; n];
        let mut centroids: Vec<DVector<f64>> = Vec::with_capacity(k);
        while centroids.len() < k {
            let i = rng.random_range(0..n);
            if !chosen[i] {
                chosen[i] = true;
                centroids.push(sample[i].clone());
            }
        }

        let mut assignment = vec![0usize; n];
        let mut previous_cost = f64::INFINITY;

        for _ in 0..MAX_KMEANS_ITERATIONS {
            // Assignment step, accumulating the cost against current centroids
            let mut cost = 0.0;
            let mut sizes = vec![0usize; k];
            for (i, point) in sample.iter().enumerate() {
                let mut best = 0;
                let mut best_distance = f64::INFINITY;
                for (c, centroid) in centroids.iter().enumerate() {
                    let distance = self.metric.distance(point, centroid);
                    if distance < best_distance {
                        best_distance = distance;
                        best = c;
                    }
                }
                assignment[i] = best;
                sizes[best] += 1;
                cost += best_distance * best_distance;
            }

            // Reseed any empty cluster from the farthest point of the largest one
            for empty in 0..k {
                if sizes[empty] > 0 {
                    continue;
                }
                let largest = (0..k).max_by_key(|&c| sizes[c]).unwrap_or(0);
                let farthest = (0..n)
                    .filter(|&i| assignment[i] == largest)
                    .max_by(|&a, &b| {
                        let da = self.metric.distance(&sample[a], &centroids[largest]);
                        let db = self.metric.distance(&sample[b], &centroids[largest]);
                        da.total_cmp(&db)
                    });
                if let Some(i) = farthest {
                    assignment[i] = empty;
                    sizes[largest] -= 1;
                    sizes[empty] += 1;
                    centroids[empty] = sample[i].clone();
                }
            }

            // Update step: centroids move to the member means
            let d = sample[0].len();
            let mut sums = vec![DVector::<f64>::zeros(d); k];
            for (i, point) in sample.iter().enumerate() {
                sums[assignment[i]] += point;
            }
            for (c, sum) in sums.into_iter().enumerate() {
                if sizes[c] > 0 {
                    centroids[c] = sum / sizes[c] as f64;
                }
            }

            if previous_cost.is_finite() {
                let relative_change = (previous_cost - cost) / previous_cost.max(f64::MIN_POSITIVE);
                if relative_change.abs() < self.rel_tolerance {
                    previous_cost = cost;
                    break;
                }
            }
            previous_cost = cost;
        }

        (previous_cost, assignment)
    }

    /// Merge clusters smaller than `D + 1` into their nearest neighbor by
    /// centroid distance, then relabel ids compactly.
    fn merge_small_clusters(&self, sample: &[DVector<f64>], assignment: &mut [usize], k: usize) {
        let d = sample[0].len();
        let mut alive: Vec<bool> = vec![true; k];

        loop {
            let (sizes, centroids) = sizes_and_centroids(sample, assignment, k);
            let n_alive = alive.iter().filter(|&&a| a).count();
            if n_alive <= 1 {
                break;
            }

            // Smallest undersized cluster still alive
            let undersized = (0..k)
                .filter(|&c| alive[c] && sizes[c] <= d)
                .min_by_key(|&c| sizes[c]);
            let Some(victim) = undersized else { break };

            let nearest = (0..k)
                .filter(|&c| alive[c] && c != victim)
                .min_by(|&a, &b| {
                    let da = self.metric.distance(&centroids[a], &centroids[victim]);
                    let db = self.metric.distance(&centroids[b], &centroids[victim]);
                    da.total_cmp(&db)
                });
            let Some(target) = nearest else { break };

            for id in assignment.iter_mut() {
                if *id == victim {
                    *id = target;
                }
            }
            alive[victim] = false;
        }

        // Compact the surviving labels to 0..n_clusters
        let mut remap = vec![usize::MAX; k];
        let mut next = 0;
        for (c, &is_alive) in alive.iter().enumerate() {
            if is_alive {
                remap[c] = next;
                next += 1;
            }
        }
        for id in assignment.iter_mut() {
            *id = remap[*id];
        }
    }
}

impl<M: Metric> Clusterer for KmeansClusterer<M> {
    fn cluster(
        &self,
        sample: &[DVector<f64>],
        rng: &mut dyn RngCore,
        verbose: bool,
    ) -> Clustering {
        let n = sample.len();
        let d = sample[0].len();

        let mut best_score = f64::INFINITY;
        let mut best_assignment: Vec<usize> = vec![0; n];
        let mut best_k = 1;

        for k in self.min_n_clusters..=self.max_n_clusters.min(n) {
            let mut trial_cost = f64::INFINITY;
            let mut trial_assignment = vec![0usize; n];
            for _ in 0..self.n_trials {
                let (cost, assignment) = self.run_trial(sample, k, rng);
                if cost < trial_cost {
                    trial_cost = cost;
                    trial_assignment = assignment;
                }
            }

            let score = n as f64 * (trial_cost.max(f64::MIN_POSITIVE) / n as f64).ln()
                + (k * d) as f64 * (n as f64).ln();
            if score < best_score {
                best_score = score;
                best_assignment = trial_assignment;
                best_k = k;
            }
        }

        let mut assignment = best_assignment;
        self.merge_small_clusters(sample, &mut assignment, best_k);

        let n_clusters = assignment.iter().copied().max().unwrap_or(0) + 1;
        let mut sizes = vec![0usize; n_clusters];
        for &id in &assignment {
            sizes[id] += 1;
        }

        if verbose {
            eprintln!(
                "Kmeans: {} clusters from candidate range [{}, {}] (BIC {:.3})",
                n_clusters, self.min_n_clusters, self.max_n_clusters, best_score
            );
        }

        Clustering {
            n_clusters,
            indices: assignment,
            sizes,
        }
    }
}

/// Per-cluster sizes and centroid means for a labeled sample.
fn sizes_and_centroids(
    sample: &[DVector<f64>],
    assignment: &[usize],
    k: usize,
) -> (Vec<usize>, Vec<DVector<f64>>) {
    let d = sample[0].len();
    let mut sizes = vec![0usize; k];
    let mut centroids = vec![DVector::<f64>::zeros(d); k];
    for (point, &id) in sample.iter().zip(assignment.iter()) {
        sizes[id] += 1;
        centroids[id] += point;
    }
    for (c, centroid) in centroids.iter_mut().enumerate() {
        if sizes[c] > 0 {
            *centroid /= sizes[c] as f64;
        }
    }
    (sizes, centroids)
}
