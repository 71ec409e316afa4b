//! Numerical constants used throughout the crate.

/// Default deterministic seed for RNG operations.
///
/// Used by tests and demos that want reproducibility without picking a seed.
/// The value `0x6E6573746564` is "nested" encoded in ASCII.
pub const DEFAULT_SEED: u64 = 0x6E6573746564;

/// Progress is reported every this many nested iterations (when verbose).
pub const PROGRESS_INTERVAL: usize = 50;

/// Relative floor applied to covariance eigenvalues.
///
/// Any eigenvalue below `EIGENVALUE_FLOOR_RATIO * lambda_max` is clamped up to
/// that level so that near-degenerate clusters still yield a usable ellipsoid.
pub const EIGENVALUE_FLOOR_RATIO: f64 = 1e-12;

/// Hard iteration cap for a single k-means trial.
///
/// Trials normally stop much earlier on the relative-cost tolerance; the cap
/// only guards against oscillating assignments.
pub const MAX_KMEANS_ITERATIONS: usize = 500;
