//! Two Gaussian rings: multi-modal posterior geometry.
//!
//! Scaled-down version of the two-circles demo; checks that the posterior
//! mass settles onto both rings rather than collapsing into one mode.

use nalgebra::DVector;
use nidus::{
    EuclideanMetric, FerozReducer, KmeansClusterer, NestedSampler, NestedSamplerConfig, Prior,
    Results, RunConfig, RunStatus, UniformPrior,
};

const RING_RADIUS: f64 = 2.0;
const RING_WIDTH: f64 = 0.1;

fn ring_log_likelihood(theta: &DVector<f64>, center_x: f64) -> f64 {
    let dx = theta[0] - center_x;
    let radius = (dx * dx + theta[1] * theta[1]).sqrt();
    let deviation = radius - RING_RADIUS;
    -deviation * deviation / (2.0 * RING_WIDTH * RING_WIDTH)
}

#[test]
fn posterior_concentrates_on_both_rings() {
    let priors: Vec<Box<dyn Prior>> = vec![Box::new(UniformPrior::new(
        DVector::from_vec(vec![-7.0, -6.0]),
        DVector::from_vec(vec![7.0, 6.0]),
    ))];
    let likelihood = |theta: &DVector<f64>| {
        ring_log_likelihood(theta, -3.5).max(ring_log_likelihood(theta, 3.5))
    };
    let clusterer = KmeansClusterer::new(EuclideanMetric, 1, 5, 5, 0.01).unwrap();

    let n_live = 400;
    let mut sampler = NestedSampler::new(
        priors,
        likelihood,
        clusterer,
        NestedSamplerConfig::default()
            .initial_n_objects(n_live)
            .min_n_objects(n_live)
            .initial_enlargement_fraction(2.0)
            .shrinking_rate(0.3)
            .seed(17),
    )
    .unwrap();
    let mut reducer = FerozReducer::new(n_live, n_live, 0.01).unwrap();
    let status = sampler
        .run(
            &mut reducer,
            &RunConfig::default()
                .termination_factor(0.01)
                .n_initial_iterations_without_clustering(200)
                .n_iterations_with_same_clustering(10)
                .max_n_draw_attempts(20_000),
        )
        .unwrap();
    assert_eq!(status, RunStatus::Converged);

    let probabilities = Results::new(&sampler).posterior_probability();
    let sample = sampler.posterior_sample();

    // Posterior-weighted mean distance from the nearest ring
    let mut mass_left = 0.0;
    let mut mass_right = 0.0;
    let mut weighted_deviation = 0.0;
    for (point, &p) in sample.iter().zip(probabilities.iter()) {
        let left = ((point[0] + 3.5).powi(2) + point[1].powi(2)).sqrt();
        let right = ((point[0] - 3.5).powi(2) + point[1].powi(2)).sqrt();
        let deviation = (left - RING_RADIUS).abs().min((right - RING_RADIUS).abs());
        weighted_deviation += p * deviation;
        if point[0] < 0.0 {
            mass_left += p;
        } else {
            mass_right += p;
        }
    }

    assert!(
        weighted_deviation < 0.5,
        "posterior mass sits {} away from the rings on average",
        weighted_deviation
    );
    // The rings are symmetric, so neither side may dominate completely
    assert!(mass_left > 0.1, "left ring mass {}", mass_left);
    assert!(mass_right > 0.1, "right ring mass {}", mass_right);
}
