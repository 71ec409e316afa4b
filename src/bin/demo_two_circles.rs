//! Two-rings demo: posterior mass concentrated on two circles.
//!
//! The likelihood is the better of two Gaussian rings of radius 2 centered at
//! `(-3.5, 0)` and `(+3.5, 0)`, a thin curved structure that defeats a single
//! bounding ellipsoid. The live set starts large and is reduced aggressively
//! once most of the evidence has been collected.

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

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let priors: Vec<Box<dyn Prior>> = vec![Box::new(UniformPrior::new(
        DVector::from_vec(vec![-7.0, -6.0]),
        DVector::from_vec(vec![7.0, 6.0]),
    ))];

    let likelihood = |theta: &DVector<f64>| {
        ring_log_likelihood(theta, -3.5).max(ring_log_likelihood(theta, 3.5))
    };

    let clusterer = KmeansClusterer::new(EuclideanMetric, 1, 5, 10, 0.01)?;

    let initial_n_objects = 10_000;
    let min_n_objects = 500;
    let config = NestedSamplerConfig::default()
        .initial_n_objects(initial_n_objects)
        .min_n_objects(min_n_objects)
        .initial_enlargement_fraction(3.0)
        .shrinking_rate(0.3)
        .verbose(true);
    let mut sampler = NestedSampler::new(priors, likelihood, clusterer, config)?;

    let mut reducer = FerozReducer::new(initial_n_objects, min_n_objects, 0.01)?;
    let run_config = RunConfig::default()
        .termination_factor(0.001)
        .n_initial_iterations_without_clustering(200)
        .n_iterations_with_same_clustering(10)
        .max_n_draw_attempts(20_000);

    let status = sampler.run(&mut reducer, &run_config)?;

    let results = Results::new(&sampler);
    results.write_parameters_to_file("demo_two_circles_parameter", ".txt")?;
    results.write_log_likelihood_to_file("demo_two_circles_likelihood_distribution.txt")?;
    results.write_evidence_information_to_file("demo_two_circles_evidence_information.txt")?;
    results.write_posterior_probability_to_file("demo_two_circles_posterior_distribution.txt")?;
    results.write_parameters_summary_to_file("demo_two_circles_parameter_summary.txt")?;

    println!(
        "log(Z) = {:.5} +/- {:.5}   H = {:.5}   iterations = {}",
        sampler.log_evidence(),
        sampler.log_evidence_error(),
        sampler.information_gain(),
        sampler.n_iterations()
    );

    if status == RunStatus::DrawExhausted {
        std::process::exit(1);
    }
    Ok(())
}
