//! Eggbox demo: a 2-D likelihood with 25 identical modes on a grid.
//!
//! The log-likelihood `(2 + cos(x/2) cos(y/2))^5` over the uniform prior
//! `[0, 10*pi]^2` is the classic stress test for multi-modal evidence
//! computation: the clusterer must track many well-separated islands at once.

use nalgebra::DVector;
use nidus::{
    EuclideanMetric, FerozReducer, KmeansClusterer, NestedSampler, NestedSamplerConfig, Prior,
    Results, RunConfig, RunStatus, UniformPrior,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let n_dimensions = 2;
    let priors: Vec<Box<dyn Prior>> = vec![Box::new(UniformPrior::new(
        DVector::from_element(n_dimensions, 0.0),
        DVector::from_element(n_dimensions, 10.0 * std::f64::consts::PI),
    ))];

    let likelihood = |theta: &DVector<f64>| {
        (2.0 + (theta[0] / 2.0).cos() * (theta[1] / 2.0).cos()).powi(5)
    };

    let clusterer = KmeansClusterer::new(EuclideanMetric, 4, 20, 10, 0.01)?;

    let initial_n_objects = 2000;
    let config = NestedSamplerConfig::default()
        .initial_n_objects(initial_n_objects)
        .min_n_objects(initial_n_objects)
        .initial_enlargement_fraction(1.5)
        .shrinking_rate(0.2)
        .verbose(true);
    let mut sampler = NestedSampler::new(priors, likelihood, clusterer, config)?;

    let mut reducer = FerozReducer::new(initial_n_objects, initial_n_objects, 0.01)?;
    let run_config = RunConfig::default()
        .termination_factor(0.05)
        .n_initial_iterations_without_clustering(1000)
        .n_iterations_with_same_clustering(100)
        .max_n_draw_attempts(10_000);

    let status = sampler.run(&mut reducer, &run_config)?;

    let results = Results::new(&sampler);
    results.write_parameters_to_file("demo_eggbox_parameter", ".txt")?;
    results.write_log_likelihood_to_file("demo_eggbox_likelihood_distribution.txt")?;
    results.write_evidence_information_to_file("demo_eggbox_evidence_information.txt")?;
    results.write_posterior_probability_to_file("demo_eggbox_posterior_distribution.txt")?;
    results.write_parameters_summary_to_file("demo_eggbox_parameter_summary.txt")?;

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
