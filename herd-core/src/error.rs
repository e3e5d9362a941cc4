use crate::{Aggregation, MetricKind, MetricName};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown metric `{0}`")]
    UnknownMetric(String),

    #[error("Threshold `{0}` must have the form `metric:expression`")]
    MissingMetric(String),

    #[error("Invalid threshold expression `{expression}`: {reason}")]
    InvalidExpression {
        expression: String,
        reason: &'static str,
    },

    #[error("Aggregation `{aggregation}` is not supported by {kind} metric `{metric}`")]
    UnsupportedAggregation {
        metric: MetricName,
        kind: MetricKind,
        aggregation: Aggregation,
    },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

impl ConfigError {
    pub(crate) fn invalid(expression: &str, reason: &'static str) -> Self {
        Self::InvalidExpression {
            expression: expression.to_string(),
            reason,
        }
    }
}
