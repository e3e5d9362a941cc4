//! Pass/fail conditions evaluated over the aggregated metrics of a run.
//!
//! A threshold pairs a [`MetricName`] with an expression such as `p(95)<500` or
//! `rate<0.01`. The textual form used by the CLI and serialized configs is
//! `metric:expression`, e.g. `http_req_duration:p(95)<500`.
use crate::{ConfigError, MetricKind, MetricName};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Aggregation {
    Avg,
    Min,
    Med,
    Max,
    /// Percentile in `(0, 100]`
    Percentile(f64),
    Rate,
    Count,
}

impl Aggregation {
    pub fn supported_by(&self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Trend => matches!(
                self,
                Aggregation::Avg
                    | Aggregation::Min
                    | Aggregation::Med
                    | Aggregation::Max
                    | Aggregation::Percentile(_)
            ),
            MetricKind::Rate => matches!(self, Aggregation::Rate),
            MetricKind::Counter => matches!(self, Aggregation::Count | Aggregation::Rate),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Avg => f.write_str("avg"),
            Aggregation::Min => f.write_str("min"),
            Aggregation::Med => f.write_str("med"),
            Aggregation::Max => f.write_str("max"),
            Aggregation::Percentile(p) => write!(f, "p({p})"),
            Aggregation::Rate => f.write_str("rate"),
            Aggregation::Count => f.write_str("count"),
        }
    }
}

impl FromStr for Aggregation {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avg" => Ok(Aggregation::Avg),
            "min" => Ok(Aggregation::Min),
            "med" => Ok(Aggregation::Med),
            "max" => Ok(Aggregation::Max),
            "rate" => Ok(Aggregation::Rate),
            "count" => Ok(Aggregation::Count),
            _ => {
                let inner = s
                    .strip_prefix("p(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .ok_or("unknown aggregation")?;
                let p: f64 = inner.parse().map_err(|_| "percentile is not a number")?;
                if p > 0. && p <= 100. {
                    Ok(Aggregation::Percentile(p))
                } else {
                    Err("percentile must be within (0, 100]")
                }
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparator {
    pub fn compare(&self, observed: f64, bound: f64) -> bool {
        match self {
            Comparator::Lt => observed < bound,
            Comparator::Le => observed <= bound,
            Comparator::Gt => observed > bound,
            Comparator::Ge => observed >= bound,
            Comparator::Eq => observed == bound,
            Comparator::Ne => observed != bound,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
        }
    }

    /// Two-character operators come first so `<=` is not read as `<`.
    const TOKENS: [(&'static str, Comparator); 6] = [
        ("<=", Comparator::Le),
        (">=", Comparator::Ge),
        ("==", Comparator::Eq),
        ("!=", Comparator::Ne),
        ("<", Comparator::Lt),
        (">", Comparator::Gt),
    ];
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The right-hand side of a threshold: `aggregation comparator value`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThresholdExpr {
    pub aggregation: Aggregation,
    pub comparator: Comparator,
    pub value: f64,
}

impl ThresholdExpr {
    pub fn holds(&self, observed: f64) -> bool {
        self.comparator.compare(observed, self.value)
    }
}

impl fmt::Display for ThresholdExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.aggregation, self.comparator, self.value)
    }
}

impl FromStr for ThresholdExpr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();

        let op_start = compact
            .find(['<', '>', '=', '!'])
            .ok_or_else(|| ConfigError::invalid(s, "missing comparison operator"))?;
        let (lhs, rest) = compact.split_at(op_start);

        let (token, comparator) = Comparator::TOKENS
            .into_iter()
            .find(|(token, _)| rest.starts_with(token))
            .ok_or_else(|| ConfigError::invalid(s, "unknown comparison operator"))?;

        let aggregation: Aggregation = lhs.parse().map_err(|e| ConfigError::invalid(s, e))?;

        let value: f64 = rest[token.len()..]
            .parse()
            .map_err(|_| ConfigError::invalid(s, "bound is not a number"))?;
        if !value.is_finite() {
            return Err(ConfigError::invalid(s, "bound must be finite"));
        }

        Ok(Self {
            aggregation,
            comparator,
            value,
        })
    }
}

/// A metric and the condition its aggregate must satisfy for the run to pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Threshold {
    metric: MetricName,
    expr: ThresholdExpr,
}

impl Threshold {
    pub fn new(metric: MetricName, expr: ThresholdExpr) -> Result<Self, ConfigError> {
        if expr.aggregation.supported_by(metric.kind()) {
            Ok(Self { metric, expr })
        } else {
            Err(ConfigError::UnsupportedAggregation {
                metric,
                kind: metric.kind(),
                aggregation: expr.aggregation,
            })
        }
    }

    /// Parse only the expression part, e.g. `Threshold::parse(MetricName::Checks, "rate>0.9")`.
    pub fn parse(metric: MetricName, expr: &str) -> Result<Self, ConfigError> {
        Self::new(metric, expr.parse()?)
    }

    pub fn metric(&self) -> MetricName {
        self.metric
    }

    pub fn expr(&self) -> &ThresholdExpr {
        &self.expr
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.metric, self.expr)
    }
}

impl FromStr for Threshold {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (metric, expr) = s
            .split_once(':')
            .ok_or_else(|| ConfigError::MissingMetric(s.to_string()))?;
        Self::parse(metric.parse()?, expr)
    }
}

impl TryFrom<String> for Threshold {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Threshold> for String {
    fn from(value: Threshold) -> Self {
        value.to_string()
    }
}
