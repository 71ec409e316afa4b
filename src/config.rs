//! Configuration for the nested sampling engine.

use crate::error::ConfigError;

/// Construction-time options for [`NestedSampler`](crate::nested::NestedSampler).
///
/// Validated when the sampler is built; see
/// [`ConfigError`] for the rejection rules.
#[derive(Debug, Clone)]
pub struct NestedSamplerConfig {
    /// Initial number of live points (default: 500).
    pub initial_n_objects: usize,

    /// Lower bound the live set may be reduced to (default: 500).
    ///
    /// Must be at least `D + 1`, or no ellipsoid could be fitted to the
    /// remaining points.
    pub min_n_objects: usize,

    /// Initial ellipsoid enlargement fraction `f0` (default: 1.5).
    ///
    /// Scales every ellipsoid semi-axis; larger values make the constrained
    /// draw more robust against covariance underestimation at the cost of
    /// more rejected candidates.
    pub initial_enlargement_fraction: f64,

    /// Exponent `s` of the remaining prior mass in the enlargement
    /// schedule (default: 0.2). Must lie in `[0, 1]`; smaller values shrink
    /// the ellipsoids more slowly.
    pub shrinking_rate: f64,

    /// Seed for the run's random sequence (default: `None`).
    ///
    /// `None` seeds from the wall clock at initialization; pass `Some` for a
    /// fully reproducible run.
    pub seed: Option<u64>,

    /// Print progress lines and the final timing to stderr (default: false).
    pub verbose: bool,
}

impl Default for NestedSamplerConfig {
    fn default() -> Self {
        Self {
            initial_n_objects: 500,
            min_n_objects: 500,
            initial_enlargement_fraction: 1.5,
            shrinking_rate: 0.2,
            seed: None,
            verbose: false,
        }
    }
}

impl NestedSamplerConfig {
    /// Set the initial number of live points.
    pub fn initial_n_objects(mut self, n: usize) -> Self {
        self.initial_n_objects = n;
        self
    }

    /// Set the minimum number of live points.
    pub fn min_n_objects(mut self, n: usize) -> Self {
        self.min_n_objects = n;
        self
    }

    /// Set the initial enlargement fraction.
    pub fn initial_enlargement_fraction(mut self, f: f64) -> Self {
        self.initial_enlargement_fraction = f;
        self
    }

    /// Set the shrinking rate.
    pub fn shrinking_rate(mut self, s: f64) -> Self {
        self.shrinking_rate = s;
        self
    }

    /// Set the RNG seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable progress output.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check the configuration against the dimensionality of the problem.
    pub(crate) fn validate(&self, n_dimensions: usize) -> Result<(), ConfigError> {
        if self.min_n_objects > self.initial_n_objects {
            return Err(ConfigError::MinExceedsInitial {
                min: self.min_n_objects,
                initial: self.initial_n_objects,
            });
        }
        if self.min_n_objects < n_dimensions + 1 {
            return Err(ConfigError::TooFewLivePoints {
                n_objects: self.min_n_objects,
                required: n_dimensions + 1,
            });
        }
        if self.initial_enlargement_fraction < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "initial_enlargement_fraction",
                value: self.initial_enlargement_fraction,
                range: "[0, inf)",
            });
        }
        if !(0.0..=1.0).contains(&self.shrinking_rate) {
            return Err(ConfigError::OutOfRange {
                name: "shrinking_rate",
                value: self.shrinking_rate,
                range: "[0, 1]",
            });
        }
        Ok(())
    }
}

/// Per-run options for [`NestedSampler::run`](crate::nested::NestedSampler::run).
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Stop once the remainder-to-evidence ratio falls below this
    /// (default: 0.05).
    pub termination_factor: f64,

    /// Iterations before the first real clustering pass (default: 100).
    ///
    /// The early live set is a prior sample, so any structure the clusterer
    /// would find there is noise; a single cluster is assumed instead.
    pub n_initial_iterations_without_clustering: usize,

    /// Clustering is refreshed every this many iterations (default: 20).
    pub n_iterations_with_same_clustering: usize,

    /// Candidates tried per constrained draw before giving up
    /// (default: 10_000).
    pub max_n_draw_attempts: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            termination_factor: 0.05,
            n_initial_iterations_without_clustering: 100,
            n_iterations_with_same_clustering: 20,
            max_n_draw_attempts: 10_000,
        }
    }
}

impl RunConfig {
    /// Set the termination factor.
    ///
    /// # Panics
    ///
    /// Panics unless `factor > 0`.
    pub fn termination_factor(mut self, factor: f64) -> Self {
        assert!(factor > 0.0, "termination factor must be > 0");
        self.termination_factor = factor;
        self
    }

    /// Set the initial no-clustering phase length.
    pub fn n_initial_iterations_without_clustering(mut self, n: usize) -> Self {
        self.n_initial_iterations_without_clustering = n;
        self
    }

    /// Set the clustering refresh period.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn n_iterations_with_same_clustering(mut self, n: usize) -> Self {
        assert!(n > 0, "clustering period must be > 0");
        self.n_iterations_with_same_clustering = n;
        self
    }

    /// Set the draw attempt budget.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn max_n_draw_attempts(mut self, n: usize) -> Self {
        assert!(n > 0, "draw attempt budget must be > 0");
        self.max_n_draw_attempts = n;
        self
    }
}
