use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Built-in metrics recorded by the harness and addressable from thresholds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    /// Number of HTTP requests issued.
    HttpReqs,
    /// Fraction of HTTP requests which errored or returned an unexpected status.
    HttpReqFailed,
    /// Time from sending a request to receiving the response headers.
    HttpReqDuration,
    /// Number of completed scenario iterations.
    Iterations,
    /// Wall-clock time of a full iteration, pauses included.
    IterationDuration,
    /// Fraction of passing checks.
    Checks,
}

/// How samples of a metric are aggregated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Rate,
    Trend,
}

impl MetricName {
    pub const ALL: [MetricName; 6] = [
        MetricName::HttpReqs,
        MetricName::HttpReqFailed,
        MetricName::HttpReqDuration,
        MetricName::Iterations,
        MetricName::IterationDuration,
        MetricName::Checks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::HttpReqs => "http_reqs",
            MetricName::HttpReqFailed => "http_req_failed",
            MetricName::HttpReqDuration => "http_req_duration",
            MetricName::Iterations => "iterations",
            MetricName::IterationDuration => "iteration_duration",
            MetricName::Checks => "checks",
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            MetricName::HttpReqs | MetricName::Iterations => MetricKind::Counter,
            MetricName::HttpReqFailed | MetricName::Checks => MetricKind::Rate,
            MetricName::HttpReqDuration | MetricName::IterationDuration => MetricKind::Trend,
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        MetricName::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownMetric(s.to_string()))
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetricKind::Counter => "counter",
            MetricKind::Rate => "rate",
            MetricKind::Trend => "trend",
        };
        f.write_str(s)
    }
}

/// Names used when publishing through the `metrics` facade.
#[derive(Copy, Clone)]
pub struct MetricLabels {
    pub requests: &'static str,
    pub failed: &'static str,
    pub duration: &'static str,
    pub iterations: &'static str,
    pub iteration_duration: &'static str,
    pub checks: &'static str,
    pub vus: &'static str,
}

pub const METRIC_LABELS: MetricLabels = MetricLabels {
    requests: "herd_http_reqs",
    failed: "herd_http_req_failed",
    duration: "herd_http_req_duration",
    iterations: "herd_iterations",
    iteration_duration: "herd_iteration_duration",
    checks: "herd_checks",
    vus: "herd_vus",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for metric in MetricName::ALL {
            assert_eq!(metric.as_str().parse::<MetricName>().unwrap(), metric);
        }
    }

    #[test]
    fn unknown_metric() {
        assert_eq!(
            "http_req_waiting".parse::<MetricName>(),
            Err(ConfigError::UnknownMetric("http_req_waiting".to_string()))
        );
    }

    #[test]
    fn kinds() {
        assert_eq!(MetricName::HttpReqDuration.kind(), MetricKind::Trend);
        assert_eq!(MetricName::HttpReqFailed.kind(), MetricKind::Rate);
        assert_eq!(MetricName::Iterations.kind(), MetricKind::Counter);
    }
}
