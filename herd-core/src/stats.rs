use crate::Threshold;
use humantime::format_duration;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::fmt;
use std::time::Duration;

/// Aggregated results of a load-test run.
///
/// Trend values are in milliseconds, rates are fractions in `[0, 1]`.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub name: String,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub elapsed: Duration,
    pub vus: usize,
    pub vus_max: usize,
    pub http_reqs: CounterStats,
    pub http_req_failed: RateStats,
    pub http_req_duration: Option<TrendStats>,
    pub iterations: CounterStats,
    pub iteration_duration: Option<TrendStats>,
    pub checks: Vec<CheckStats>,
    pub thresholds: Vec<ThresholdOutcome>,
}

impl RunSummary {
    /// The run verdict: true when every threshold held.
    pub fn passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }

    pub fn breached(&self) -> impl Iterator<Item = &ThresholdOutcome> {
        self.thresholds.iter().filter(|t| !t.passed)
    }

    /// All checks folded into a single pass rate.
    pub fn checks_rate(&self) -> RateStats {
        RateStats::from_checks(&self.checks)
    }

    pub fn check(&self, name: &str) -> Option<&CheckStats> {
        self.checks.iter().find(|c| c.name == name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CounterStats {
    pub count: u64,
    /// Per second over the elapsed run time.
    pub rate: f64,
}

impl CounterStats {
    pub fn new(count: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0. { count as f64 / secs } else { 0. };
        Self { count, rate }
    }
}

/// A boolean metric: `trues` out of `trues + falses` samples.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateStats {
    pub trues: u64,
    pub falses: u64,
    pub rate: f64,
}

impl RateStats {
    pub fn new(trues: u64, falses: u64) -> Self {
        let total = trues + falses;
        let rate = if total > 0 {
            trues as f64 / total as f64
        } else {
            0.
        };
        Self {
            trues,
            falses,
            rate,
        }
    }

    /// Every check sample folded into one rate.
    pub fn from_checks(checks: &[CheckStats]) -> Self {
        let passes = checks.iter().map(|c| c.passes).sum();
        let fails = checks.iter().map(|c| c.fails).sum();
        Self::new(passes, fails)
    }

    pub fn total(&self) -> u64 {
        self.trues + self.falses
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendStats {
    pub count: u64,
    pub avg: f64,
    pub min: f64,
    pub med: f64,
    pub max: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckStats {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckStats {
    pub fn all_passed(&self) -> bool {
        self.fails == 0 && self.passes > 0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOutcome {
    pub threshold: Threshold,
    /// `None` when the metric recorded no samples.
    pub observed: Option<f64>,
    pub passed: bool,
}

impl fmt::Display for ThresholdOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.passed { "ok" } else { "BREACHED" };
        match self.observed {
            Some(observed) => write!(f, "{} (observed {:.4}) {}", self.threshold, observed, mark),
            None => write!(f, "{} (no samples) {}", self.threshold, mark),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = Duration::from_millis(self.elapsed.as_millis() as u64);
        writeln!(f, "scenario: {}", self.name)?;
        writeln!(f, "  elapsed ..............: {}", format_duration(elapsed))?;
        writeln!(f, "  vus ..................: {} (max {})", self.vus, self.vus_max)?;

        let checks = self.checks_rate();
        writeln!(
            f,
            "  checks ...............: {:.2}% passed={} failed={}",
            checks.rate * 100.,
            checks.trues,
            checks.falses
        )?;
        for check in &self.checks {
            let mark = if check.fails == 0 { "+" } else { "x" };
            writeln!(
                f,
                "    {mark} {} (passed={} failed={})",
                check.name, check.passes, check.fails
            )?;
        }

        writeln!(
            f,
            "  http_reqs ............: {} ({:.2}/s)",
            self.http_reqs.count, self.http_reqs.rate
        )?;
        writeln!(
            f,
            "  http_req_failed ......: {:.2}% ({} of {})",
            self.http_req_failed.rate * 100.,
            self.http_req_failed.trues,
            self.http_req_failed.total()
        )?;
        write_trend(f, "http_req_duration ....", self.http_req_duration.as_ref())?;
        writeln!(
            f,
            "  iterations ...........: {} ({:.2}/s)",
            self.iterations.count, self.iterations.rate
        )?;
        write_trend(f, "iteration_duration ...", self.iteration_duration.as_ref())?;

        if !self.thresholds.is_empty() {
            writeln!(f, "  thresholds:")?;
            for outcome in &self.thresholds {
                writeln!(f, "    {outcome}")?;
            }
        }
        Ok(())
    }
}

fn write_trend(f: &mut fmt::Formatter<'_>, label: &str, trend: Option<&TrendStats>) -> fmt::Result {
    match trend {
        Some(t) => writeln!(
            f,
            "  {label}: avg={:.2}ms min={:.2}ms med={:.2}ms max={:.2}ms p(90)={:.2}ms p(95)={:.2}ms p(99)={:.2}ms",
            t.avg, t.min, t.med, t.max, t.p90, t.p95, t.p99
        ),
        None => writeln!(f, "  {label}: no samples"),
    }
}
