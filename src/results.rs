//! Posterior summaries and text-file persistence of a finished run.
//!
//! Output files are plain ASCII, one record per line, scientific notation
//! with nine digits of precision. The posterior probability applies Bayes'
//! theorem in log space to the stored record weights and renormalizes, which
//! absorbs the small deviation caused by the approximate evidence.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use nalgebra::DMatrix;

use crate::cluster::Clusterer;
use crate::likelihood::Likelihood;
use crate::math;
use crate::nested::NestedSampler;

/// Read-only view over a finished [`NestedSampler`] that derives posterior
/// summaries and writes the result files.
pub struct Results<'a, L: Likelihood, C: Clusterer> {
    sampler: &'a NestedSampler<L, C>,
}

impl<'a, L: Likelihood, C: Clusterer> Results<'a, L, C> {
    /// Wrap a sampler whose [`run`](NestedSampler::run) has completed.
    pub fn new(sampler: &'a NestedSampler<L, C>) -> Self {
        Self { sampler }
    }

    /// Normalized posterior probability of each record.
    ///
    /// Bayes' theorem in log space: `ln p_i = logW_i - logZ` with
    /// `logW = ln(L dX)`, exponentiated and normalized to sum to one.
    pub fn posterior_probability(&self) -> Vec<f64> {
        let log_weights = self.sampler.log_weight_of_posterior_sample();
        let log_evidence = self.sampler.log_evidence();
        let mut probabilities: Vec<f64> = log_weights
            .iter()
            .map(|&lw| (lw - log_evidence).exp())
            .collect();
        let total: f64 = probabilities.iter().sum();
        if total > 0.0 {
            for p in probabilities.iter_mut() {
                *p /= total;
            }
        }
        probabilities
    }

    /// Marginal parameter estimates, one row per dimension.
    ///
    /// Columns: mean, median, mode, second moment, lower and upper credible
    /// interval. The credible-interval columns are written as zero; a proper
    /// shortest-interval computation is a documented extension.
    pub fn parameter_estimation(&self) -> DMatrix<f64> {
        let n_dimensions = self.sampler.n_dimensions();
        let sample = self.sampler.posterior_sample();
        let probabilities = self.posterior_probability();
        let mut estimates = DMatrix::zeros(n_dimensions, 6);

        for i in 0..n_dimensions {
            let values: Vec<f64> = sample.iter().map(|p| p[i]).collect();

            // Order the marginal by parameter value, carrying the weights
            let permutation = math::sorted_permutation(&values);
            let sorted_values: Vec<f64> = permutation.iter().map(|&j| values[j]).collect();
            let sorted_probabilities: Vec<f64> =
                permutation.iter().map(|&j| probabilities[j]).collect();

            let mean: f64 = sorted_values
                .iter()
                .zip(sorted_probabilities.iter())
                .map(|(v, p)| v * p)
                .sum();
            let second_moment: f64 = sorted_values
                .iter()
                .zip(sorted_probabilities.iter())
                .map(|(v, p)| (v - mean) * (v - mean) * p)
                .sum();

            // Median: first value where the cumulative probability passes 1/2
            let mut cumulative = 0.0;
            let mut median = sorted_values.first().copied().unwrap_or(0.0);
            for (v, p) in sorted_values.iter().zip(sorted_probabilities.iter()) {
                if cumulative >= 0.5 {
                    break;
                }
                median = *v;
                cumulative += p;
            }

            // Mode: value carrying the largest probability
            let mode = sorted_probabilities
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(j, _)| sorted_values[j])
                .unwrap_or(0.0);

            estimates[(i, 0)] = mean;
            estimates[(i, 1)] = median;
            estimates[(i, 2)] = mode;
            estimates[(i, 3)] = second_moment;
            estimates[(i, 4)] = 0.0;
            estimates[(i, 5)] = 0.0;
        }

        estimates
    }

    /// Write one single-column file per dimension, named
    /// `{prefix}{dimension:03}{extension}`.
    pub fn write_parameters_to_file(&self, path_prefix: &str, extension: &str) -> io::Result<()> {
        let sample = self.sampler.posterior_sample();
        for i in 0..self.sampler.n_dimensions() {
            let path = format!("{}{:03}{}", path_prefix, i, extension);
            let mut file = open_output_file(&path)?;
            for point in sample {
                writeln!(file, "{:.9e}", point[i])?;
            }
            file.flush()?;
        }
        Ok(())
    }

    /// Write the log-likelihood of each posterior record.
    pub fn write_log_likelihood_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = open_output_file(path)?;
        writeln!(file, "# Posterior sample from nested sampling")?;
        writeln!(file, "# log(Likelihood)")?;
        for value in self.sampler.log_likelihood_of_posterior_sample() {
            writeln!(file, "{:.9e}", value)?;
        }
        file.flush()
    }

    /// Write the log-weight `ln(L dX)` of each posterior record.
    pub fn write_log_weights_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = open_output_file(path)?;
        writeln!(file, "# Posterior sample from nested sampling")?;
        writeln!(file, "# log(Weight) = log(Likelihood) + log(dX)")?;
        for value in self.sampler.log_weight_of_posterior_sample() {
            writeln!(file, "{:.9e}", value)?;
        }
        file.flush()
    }

    /// Write the normalized posterior probability of each record.
    pub fn write_posterior_probability_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let probabilities = self.posterior_probability();
        let mut file = open_output_file(path)?;
        writeln!(file, "# Posterior probability distribution from nested sampling")?;
        for p in &probabilities {
            writeln!(file, "{:.9e}", p)?;
        }
        file.flush()
    }

    /// Write the log-evidence, its error, and the information gain.
    pub fn write_evidence_information_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = open_output_file(path)?;
        writeln!(file, "# Evidence results from nested sampling")?;
        writeln!(
            file,
            "# Skilling's log(Evidence)    Skilling's Error log(Evidence)    Skilling's Information Gain"
        )?;
        writeln!(
            file,
            "{:.9e}    {:.9e}    {:.9e}",
            self.sampler.log_evidence(),
            self.sampler.log_evidence_error(),
            self.sampler.information_gain()
        )?;
        file.flush()
    }

    /// Write the marginal parameter estimates, one row per dimension.
    pub fn write_parameters_summary_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let estimates = self.parameter_estimation();
        let mut file = open_output_file(path)?;
        writeln!(file, "# Summary of Parameter Estimation from nested sampling")?;
        writeln!(file, "# Column #1: Expectation (I Moment)")?;
        writeln!(file, "# Column #2: Median")?;
        writeln!(file, "# Column #3: Mode")?;
        writeln!(file, "# Column #4: II Moment (Variance if Normal Distribution)")?;
        writeln!(file, "# Column #5: Lower Credible Interval (CI)")?;
        writeln!(file, "# Column #6: Upper Credible Interval (CI)")?;
        for i in 0..estimates.nrows() {
            for j in 0..estimates.ncols() {
                if j > 0 {
                    write!(file, "    ")?;
                }
                write!(file, "{:.9e}", estimates[(i, j)])?;
            }
            writeln!(file)?;
        }
        file.flush()
    }

    /// Pretty-printed JSON of the run's scalar summary.
    pub fn evidence_summary_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.sampler.evidence_summary())
    }
}

fn open_output_file<P: AsRef<Path>>(path: P) -> io::Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}
