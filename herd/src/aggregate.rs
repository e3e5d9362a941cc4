//! Whole-run totals, built up from every drained interval.
use crate::recorder::Collected;
use crate::thresholds;
use herd_core::{Aggregation, CheckStats, CounterStats, RateStats, RunConfig, RunSummary, TrendStats};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct Aggregate {
    pub requests: u64,
    pub failed: u64,
    pub request_latency: Trend,
    pub iterations: u64,
    pub iteration_latency: Trend,
}

impl Aggregate {
    pub fn absorb(&mut self, collected: Collected) {
        self.requests += collected.requests;
        self.failed += collected.failed;
        self.request_latency.extend(&collected.request_latency);
        self.iterations += collected.iterations;
        self.iteration_latency.extend(&collected.iteration_latency);
    }

    pub fn failed_rate(&self) -> RateStats {
        RateStats::new(self.failed, self.requests.saturating_sub(self.failed))
    }

    /// Evaluate `config.thresholds` and fold everything into the final summary.
    pub fn into_summary(
        mut self,
        config: &RunConfig,
        elapsed: Duration,
        vus_max: usize,
        checks: Vec<CheckStats>,
    ) -> RunSummary {
        let checks_rate = RateStats::from_checks(&checks);
        let outcomes = thresholds::evaluate(&config.thresholds, &mut self, &checks_rate, elapsed);

        RunSummary {
            name: config.name.clone(),
            elapsed,
            vus: config.vus.get(),
            vus_max,
            http_reqs: CounterStats::new(self.requests, elapsed),
            http_req_failed: self.failed_rate(),
            http_req_duration: self.request_latency.stats(),
            iterations: CounterStats::new(self.iterations, elapsed),
            iteration_duration: self.iteration_latency.stats(),
            checks,
            thresholds: outcomes,
        }
    }
}

/// Every sample of a duration metric, in milliseconds.
///
/// Percentiles are exact, interpolated linearly between the two closest ranks.
#[derive(Debug, Default)]
pub(crate) struct Trend {
    samples: Vec<f64>,
    sorted: bool,
}

impl Trend {
    pub fn extend(&mut self, durations: &[Duration]) {
        if durations.is_empty() {
            return;
        }
        self.samples
            .extend(durations.iter().map(|d| d.as_secs_f64() * 1e3));
        self.sorted = false;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `None` for aggregations which do not apply to a trend, or when there are no samples.
    pub fn aggregate(&mut self, aggregation: Aggregation) -> Option<f64> {
        match aggregation {
            Aggregation::Avg => self.avg(),
            Aggregation::Min => self.percentile(0.),
            Aggregation::Med => self.percentile(50.),
            Aggregation::Max => self.percentile(100.),
            Aggregation::Percentile(p) => self.percentile(p),
            Aggregation::Rate | Aggregation::Count => None,
        }
    }

    pub fn stats(&mut self) -> Option<TrendStats> {
        Some(TrendStats {
            count: self.samples.len() as u64,
            avg: self.avg()?,
            min: self.percentile(0.)?,
            med: self.percentile(50.)?,
            max: self.percentile(100.)?,
            p90: self.percentile(90.)?,
            p95: self.percentile(95.)?,
            p99: self.percentile(99.)?,
        })
    }

    fn avg(&self) -> Option<f64> {
        match self.samples.len() {
            0 => None,
            1 => Some(self.samples[0]),
            _ => Some(statistical::mean(&self.samples)),
        }
    }

    fn percentile(&mut self, p: f64) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        if !self.sorted {
            self.samples.sort_unstable_by(|a, b| a.total_cmp(b));
            self.sorted = true;
        }

        let rank = (p / 100.).clamp(0., 1.) * (self.samples.len() - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        let weight = rank - lower as f64;
        Some(self.samples[lower] + (self.samples[upper] - self.samples[lower]) * weight)
    }
}
