//! Adaptive reduction of the live-point count.
//!
//! Early iterations need many live points to map the likelihood surface;
//! once most of the evidence has been gathered the live set can shrink to
//! save likelihood evaluations. A reducer proposes the next live-point count
//! from the current remainder-to-evidence ratio; the driver enforces that the
//! count never grows and never drops below the configured minimum.

use crate::error::ConfigError;

/// Strategy deciding the next live-point count.
pub trait LivePointsReducer {
    /// Propose the live-point count for the coming iteration.
    ///
    /// `ratio` is the current ratio of live-evidence remainder to accumulated
    /// evidence; `current_n_objects` is the live count going in. The returned
    /// value is already clamped to `[min, current_n_objects]`.
    fn update_n_objects(&mut self, ratio: f64, current_n_objects: usize) -> usize;
}

/// Reduction proportional to the evidence remainder (Feroz et al. 2009).
///
/// The count stays at `initial_n_objects` while `ratio` exceeds
/// `tolerance_on_evidence` and decays linearly with the ratio towards
/// `min_n_objects` as the remainder vanishes.
#[derive(Debug, Clone)]
pub struct FerozReducer {
    initial_n_objects: usize,
    min_n_objects: usize,
    tolerance_on_evidence: f64,
}

impl FerozReducer {
    /// Create a Feroz reducer.
    pub fn new(
        initial_n_objects: usize,
        min_n_objects: usize,
        tolerance_on_evidence: f64,
    ) -> Result<Self, ConfigError> {
        if min_n_objects > initial_n_objects {
            return Err(ConfigError::MinExceedsInitial {
                min: min_n_objects,
                initial: initial_n_objects,
            });
        }
        if !(tolerance_on_evidence > 0.0) {
            return Err(ConfigError::NonPositiveTolerance {
                name: "tolerance_on_evidence",
                value: tolerance_on_evidence,
            });
        }
        Ok(Self {
            initial_n_objects,
            min_n_objects,
            tolerance_on_evidence,
        })
    }
}

impl LivePointsReducer for FerozReducer {
    fn update_n_objects(&mut self, ratio: f64, current_n_objects: usize) -> usize {
        let span = (self.initial_n_objects - self.min_n_objects) as f64;
        let fraction = (ratio / self.tolerance_on_evidence).clamp(0.0, 1.0);
        let target = self.min_n_objects + (span * fraction).ceil() as usize;
        target.clamp(self.min_n_objects, current_n_objects)
    }
}

/// Reduction on a fixed exponential schedule in the iteration counter.
#[derive(Debug, Clone)]
pub struct ExponentialReducer {
    initial_n_objects: usize,
    min_n_objects: usize,
    decay_rate: f64,
    iteration: usize,
}

impl ExponentialReducer {
    /// Create an exponential reducer with per-iteration decay `decay_rate`.
    pub fn new(
        initial_n_objects: usize,
        min_n_objects: usize,
        decay_rate: f64,
    ) -> Result<Self, ConfigError> {
        if min_n_objects > initial_n_objects {
            return Err(ConfigError::MinExceedsInitial {
                min: min_n_objects,
                initial: initial_n_objects,
            });
        }
        if !(decay_rate > 0.0) {
            return Err(ConfigError::NonPositiveTolerance {
                name: "decay_rate",
                value: decay_rate,
            });
        }
        Ok(Self {
            initial_n_objects,
            min_n_objects,
            decay_rate,
            iteration: 0,
        })
    }
}

impl LivePointsReducer for ExponentialReducer {
    fn update_n_objects(&mut self, _ratio: f64, current_n_objects: usize) -> usize {
        let span = (self.initial_n_objects - self.min_n_objects) as f64;
        let decayed = span * (-self.decay_rate * self.iteration as f64).exp();
        self.iteration += 1;
        let target = self.min_n_objects + decayed.round() as usize;
        target.clamp(self.min_n_objects, current_n_objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feroz_holds_initial_above_tolerance() {
        let mut reducer = FerozReducer::new(1000, 100, 0.01).unwrap();
        assert_eq!(reducer.update_n_objects(0.5, 1000), 1000);
        assert_eq!(reducer.update_n_objects(0.01, 1000), 1000);
    }

    #[test]
    fn test_feroz_decays_towards_minimum() {
        let mut reducer = FerozReducer::new(1000, 100, 0.01).unwrap();
        let half = reducer.update_n_objects(0.005, 1000);
        assert!(half < 1000 && half > 100, "got {}", half);
        assert_eq!(reducer.update_n_objects(0.0, 1000), 100);
    }

    #[test]
    fn test_feroz_never_grows() {
        let mut reducer = FerozReducer::new(1000, 100, 0.01).unwrap();
        // A rebounding ratio must not re-inflate the live set
        let reduced = reducer.update_n_objects(0.002, 1000);
        assert_eq!(reducer.update_n_objects(0.5, reduced), reduced);
    }

    #[test]
    fn test_exponential_sequence_is_non_increasing() {
        let mut reducer = ExponentialReducer::new(500, 50, 0.01).unwrap();
        let mut current = 500;
        let mut previous = 500;
        for _ in 0..1000 {
            current = reducer.update_n_objects(1.0, current);
            assert!(current <= previous);
            assert!(current >= 50);
            previous = current;
        }
        assert_eq!(current, 50);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            FerozReducer::new(100, 200, 0.01),
            Err(ConfigError::MinExceedsInitial { .. })
        ));
        assert!(matches!(
            ExponentialReducer::new(100, 50, 0.0),
            Err(ConfigError::NonPositiveTolerance { .. })
        ));
    }
}
