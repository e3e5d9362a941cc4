//! Threshold evaluation against whole-run aggregates.
use crate::aggregate::Aggregate;
use herd_core::{Aggregation, CounterStats, MetricName, RateStats, Threshold, ThresholdOutcome};
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Evaluate every threshold, in order.
///
/// A threshold whose metric recorded no samples passes with no observed value.
pub(crate) fn evaluate(
    thresholds: &[Threshold],
    aggregate: &mut Aggregate,
    checks: &RateStats,
    elapsed: Duration,
) -> Vec<ThresholdOutcome> {
    thresholds
        .iter()
        .map(|threshold| {
            let observed = observe(threshold, aggregate, checks, elapsed);
            let passed = observed.map_or(true, |value| threshold.expr().holds(value));
            debug!("Threshold {threshold}: observed={observed:?}, passed={passed}");
            ThresholdOutcome {
                threshold: threshold.clone(),
                observed,
                passed,
            }
        })
        .collect()
}

fn observe(
    threshold: &Threshold,
    aggregate: &mut Aggregate,
    checks: &RateStats,
    elapsed: Duration,
) -> Option<f64> {
    let aggregation = threshold.expr().aggregation;
    match threshold.metric() {
        MetricName::HttpReqs => counter(aggregate.requests, aggregation, elapsed),
        MetricName::Iterations => counter(aggregate.iterations, aggregation, elapsed),
        MetricName::HttpReqFailed => rate(&aggregate.failed_rate(), aggregation),
        MetricName::Checks => rate(checks, aggregation),
        MetricName::HttpReqDuration => aggregate.request_latency.aggregate(aggregation),
        MetricName::IterationDuration => aggregate.iteration_latency.aggregate(aggregation),
    }
}

fn counter(count: u64, aggregation: Aggregation, elapsed: Duration) -> Option<f64> {
    match aggregation {
        Aggregation::Count => Some(count as f64),
        Aggregation::Rate => Some(CounterStats::new(count, elapsed).rate),
        _ => None,
    }
}

fn rate(stats: &RateStats, aggregation: Aggregation) -> Option<f64> {
    match aggregation {
        Aggregation::Rate if stats.total() > 0 => Some(stats.rate),
        _ => None,
    }
}
