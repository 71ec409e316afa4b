//! Formatting of progress lines and run timing.

use std::time::Duration;

/// One progress line of the nested iteration loop.
///
/// Mirrors the accumulator state: iteration count, cluster count, live-point
/// count, cumulated prior mass, remainder-to-evidence ratio, log-evidence and
/// information gain.
#[allow(clippy::too_many_arguments)]
pub fn format_progress(
    n_iterations: usize,
    n_clusters: usize,
    n_live: usize,
    cumulated_prior_mass: f64,
    ratio: f64,
    log_evidence: f64,
    information_gain: f64,
) -> String {
    format!(
        "Nit: {}   Ncl: {}   Nlive: {}   CPM: {:.4e}   Ratio: {:.4e}   log(E): {:.5}   IG: {:.5}",
        n_iterations, n_clusters, n_live, cumulated_prior_mass, ratio, log_evidence, information_gain
    )
}

/// Human-readable total computational time in seconds, minutes or hours.
pub fn format_computational_time(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        format!("Total Computational Time: {:.3} seconds", secs)
    } else if secs < 3600.0 {
        format!("Total Computational Time: {:.3} minutes", secs / 60.0)
    } else {
        format!("Total Computational Time: {:.3} hours", secs / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_contains_fields() {
        let line = format_progress(150, 3, 500, 0.25, 1.2e-2, -4.5, 6.1);
        assert!(line.contains("Nit: 150"));
        assert!(line.contains("Ncl: 3"));
        assert!(line.contains("Nlive: 500"));
    }

    #[test]
    fn test_time_formatting_tiers() {
        assert!(format_computational_time(Duration::from_secs(12)).contains("seconds"));
        assert!(format_computational_time(Duration::from_secs(120)).contains("minutes"));
        assert!(format_computational_time(Duration::from_secs(7200)).contains("hours"));
    }
}
