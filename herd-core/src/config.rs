use crate::{
    ConfigError, Threshold, DEFAULT_DURATION, DEFAULT_GRACEFUL_STOP, DEFAULT_PROGRESS_INTERVAL,
    DEFAULT_VUS,
};
use humantime::format_duration;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::fmt;
use std::num::{NonZeroU32, NonZeroUsize};
use std::time::Duration;

/// Settings for a single load-test run. Read once when the run starts.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: String,
    pub vus: NonZeroUsize,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub duration: Duration,
    #[serde(default)]
    pub thresholds: Vec<Threshold>,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub graceful_stop: Duration,
    #[serde(default)]
    pub max_rps: Option<NonZeroU32>,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub progress_interval: Duration,
}

impl RunConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vus: DEFAULT_VUS,
            duration: DEFAULT_DURATION,
            thresholds: vec![],
            graceful_stop: DEFAULT_GRACEFUL_STOP,
            max_rps: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration("duration"));
        }
        if self.progress_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("progress_interval"));
        }
        Ok(())
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vus={}, duration={}, graceful_stop={}",
            self.vus,
            format_duration(self.duration),
            format_duration(self.graceful_stop),
        )?;
        if let Some(rps) = self.max_rps {
            write!(f, ", max_rps={rps}")?;
        }
        for threshold in &self.thresholds {
            write!(f, ", threshold={threshold}")?;
        }
        Ok(())
    }
}
