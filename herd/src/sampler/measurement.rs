use crate::recorder::Collected;
use pdatastructs::tdigest::{TDigest, K1};
use std::fmt;
use std::time::Duration;

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Rates and latency quantiles over a single progress interval.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub rps: f64,
    pub failed_rate: f64,
    pub iterations: u64,
    pub active_vus: usize,
    pub elapsed: Duration,
    samples: usize,
    latency: TDigest<K1>,
}

impl Measurement {
    pub(crate) fn new(collected: &Collected, elapsed: Duration, active_vus: usize) -> Self {
        let secs = elapsed.as_secs_f64();
        let rps = if secs > 0. {
            collected.requests as f64 / secs
        } else {
            0.
        };
        // A failure can still land one interval apart from its request.
        let failed_rate = if collected.requests > 0 {
            collected.failed.min(collected.requests) as f64 / collected.requests as f64
        } else {
            0.
        };

        let mut latency = default_tdigest();
        for dur in &collected.request_latency {
            latency.insert(dur.as_secs_f64());
        }

        Self {
            rps,
            failed_rate,
            iterations: collected.iterations,
            active_vus,
            elapsed,
            samples: collected.request_latency.len(),
            latency,
        }
    }

    /// Approximate request latency at `quantile`, `None` if no request completed.
    pub fn latency(&self, quantile: f64) -> Option<Duration> {
        if self.samples == 0 {
            return None;
        }
        let secs = self.latency.quantile(quantile);
        // TDigest can return NaN for tiny sample counts.
        secs.is_finite().then(|| Duration::from_secs_f64(secs.max(0.)))
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vus={}, reqs/s={:.2}, failed={:.2}%, iterations={}",
            self.active_vus,
            self.rps,
            self.failed_rate * 100.,
            self.iterations,
        )?;
        for (label, q) in [("p50", 0.5), ("p90", 0.9), ("p99", 0.99)] {
            match self.latency(q) {
                Some(dur) => write!(f, ", {label}={dur:?}")?,
                None => write!(f, ", {label}=-")?,
            }
        }
        Ok(())
    }
}

fn default_tdigest() -> TDigest<K1> {
    TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE)
}
