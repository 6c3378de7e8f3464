use clockrun_system_variation::SwarmCoefficients;

/// Share of the population averaged into [`IterationStats::top_mean`].
const TOP_SHARE: f64 = 0.05;

/// Population summary recorded after one optimizer iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationStats {
    /// Zero-based iteration index.
    pub iteration: u32,
    /// Highest fitness in the population.
    pub best: i64,
    /// Mean fitness.
    pub mean: f64,
    /// Median fitness.
    pub median: f64,
    /// Mean fitness of the top five percent, at least one candidate.
    pub top_mean: f64,
    /// Swarm coefficients used for the iteration, if any.
    pub coefficients: Option<SwarmCoefficients>,
}

impl IterationStats {
    /// Summarises a set of fitness values; `None` when it is empty.
    #[must_use]
    pub fn measure(
        iteration: u32,
        fitness: &[i64],
        coefficients: Option<SwarmCoefficients>,
    ) -> Option<Self> {
        let mut sorted = fitness.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        let best = *sorted.first()?;
        let len = sorted.len();
        let mean = sorted.iter().map(|value| *value as f64).sum::<f64>() / len as f64;
        let median = if len % 2 == 0 {
            (sorted[len / 2 - 1] as f64 + sorted[len / 2] as f64) / 2.0
        } else {
            sorted[len / 2] as f64
        };
        let top = ((len as f64 * TOP_SHARE).ceil() as usize).clamp(1, len);
        let top_mean = sorted[..top].iter().map(|value| *value as f64).sum::<f64>() / top as f64;
        Some(Self {
            iteration,
            best,
            mean,
            median,
            top_mean,
            coefficients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarises_fitness_values() {
        let stats = IterationStats::measure(3, &[10, 40, 20, 30], None).expect("stats");
        assert_eq!(stats.iteration, 3);
        assert_eq!(stats.best, 40);
        assert!((stats.mean - 25.0).abs() < 1e-12);
        assert!((stats.median - 25.0).abs() < 1e-12);
        assert!((stats.top_mean - 40.0).abs() < 1e-12);
    }

    #[test]
    fn top_share_grows_with_population() {
        let fitness: Vec<i64> = (1..=40).collect();
        let stats = IterationStats::measure(0, &fitness, None).expect("stats");
        assert!((stats.top_mean - 39.5).abs() < 1e-12);
        assert!((stats.median - 20.5).abs() < 1e-12);
    }

    #[test]
    fn empty_population_has_no_summary() {
        assert!(IterationStats::measure(0, &[], None).is_none());
    }
}
