use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use herd_core::CheckStats;
#[cfg(feature = "metrics")]
use herd_core::METRIC_LABELS;
use metrics_util::AtomicBucket;
use std::num::NonZeroU32;
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc, RwLock,
};
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Record a named check for the current virtual user and return `passed`.
///
/// Checks never abort an iteration; they are aggregated into the `checks` rate.
///
/// # Example
/// ```no_run
/// # async fn example(client: herd::http::Client) {
/// let res = client.get("http://localhost:8000/health").send().await;
/// herd::check("health check status is 200", res.status_is(200));
/// # }
/// ```
pub fn check(name: &str, passed: bool) -> bool {
    match current_recorder() {
        Some(recorder) => recorder.record_check(name, passed),
        None => warn!("No VU hook available; check `{name}` was not recorded."),
    }
    passed
}

/// Id of the virtual user running the current task, starting at 0.
pub fn vu_id() -> Option<usize> {
    VU_HOOK.try_with(|v| v.id).ok()
}

pub(crate) fn current_recorder() -> Option<Arc<Recorder>> {
    VU_HOOK.try_with(|v| v.recorder.clone()).ok()
}

#[derive(Clone)]
pub(crate) struct VuData {
    pub id: usize,
    pub recorder: Arc<Recorder>,
}

tokio::task_local! {
    pub(crate) static VU_HOOK: VuData;
}

/// Shared sink for the samples of every virtual user in a run.
///
/// Writers only touch atomics; the harness drains interval data with [`Recorder::collect`].
pub(crate) struct Recorder {
    limiter: Option<DefaultDirectRateLimiter>,
    requests: AtomicU64,
    failed: AtomicU64,
    request_latency: AtomicBucket<Duration>,
    iterations: AtomicU64,
    iteration_latency: AtomicBucket<Duration>,
    checks: RwLock<Vec<Arc<CheckCounter>>>,
    active_vus: AtomicUsize,
    peak_vus: AtomicUsize,
}

impl Recorder {
    pub fn new(max_rps: Option<NonZeroU32>) -> Self {
        Self {
            limiter: max_rps.map(rate_limiter),
            requests: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            request_latency: AtomicBucket::new(),
            iterations: AtomicU64::new(0),
            iteration_latency: AtomicBucket::new(),
            checks: RwLock::new(vec![]),
            active_vus: AtomicUsize::new(0),
            peak_vus: AtomicUsize::new(0),
        }
    }

    /// Wait for the shared request budget, if the run is rate-capped.
    pub async fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    pub fn record_request(&self, latency: Duration, failed: bool) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.request_latency.push(latency);
        if failed {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(METRIC_LABELS.requests).increment(1);
            metrics::histogram!(METRIC_LABELS.duration).record(latency.as_secs_f64() * 1e3);
            if failed {
                metrics::counter!(METRIC_LABELS.failed).increment(1);
            }
        }
    }

    pub fn record_iteration(&self, elapsed: Duration) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        self.iteration_latency.push(elapsed);

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(METRIC_LABELS.iterations).increment(1);
            metrics::histogram!(METRIC_LABELS.iteration_duration)
                .record(elapsed.as_secs_f64() * 1e3);
        }
    }

    pub fn record_check(&self, name: &str, passed: bool) {
        let counter = self.check_counter(name);
        if passed {
            counter.passes.fetch_add(1, Ordering::Relaxed);
        } else {
            counter.fails.fetch_add(1, Ordering::Relaxed);
        }

        #[cfg(feature = "metrics")]
        metrics::counter!(
            METRIC_LABELS.checks,
            "check" => name.to_string(),
            "passed" => if passed { "true" } else { "false" }
        )
        .increment(1);
    }

    pub fn vu_started(&self) {
        let active = self.active_vus.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_vus.fetch_max(active, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        metrics::gauge!(METRIC_LABELS.vus).set(active as f64);
    }

    pub fn vu_stopped(&self) {
        let active = self.active_vus.fetch_sub(1, Ordering::Relaxed) - 1;

        #[cfg(feature = "metrics")]
        metrics::gauge!(METRIC_LABELS.vus).set(active as f64);
        #[cfg(not(feature = "metrics"))]
        let _ = active;
    }

    pub fn active_vus(&self) -> usize {
        self.active_vus.load(Ordering::Relaxed)
    }

    pub fn peak_vus(&self) -> usize {
        self.peak_vus.load(Ordering::Relaxed)
    }

    /// Drain everything recorded since the previous call.
    pub fn collect(&self) -> Collected {
        // `record_request` counts the request before the failure, so drain failures first.
        let failed = self.failed.swap(0, Ordering::SeqCst);
        let requests = self.requests.swap(0, Ordering::SeqCst);
        let iterations = self.iterations.swap(0, Ordering::Relaxed);

        let mut request_latency = vec![];
        self.request_latency
            .clear_with(|dur| request_latency.extend_from_slice(dur));
        let mut iteration_latency = vec![];
        self.iteration_latency
            .clear_with(|dur| iteration_latency.extend_from_slice(dur));

        Collected {
            requests,
            failed,
            request_latency,
            iterations,
            iteration_latency,
        }
    }

    /// Cumulative check counts, in the order checks were first seen.
    pub fn checks(&self) -> Vec<CheckStats> {
        self.checks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|c| CheckStats {
                name: c.name.clone(),
                passes: c.passes.load(Ordering::Relaxed),
                fails: c.fails.load(Ordering::Relaxed),
            })
            .collect()
    }

    fn check_counter(&self, name: &str) -> Arc<CheckCounter> {
        {
            let checks = self
                .checks
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(counter) = checks.iter().find(|c| c.name == name) {
                return counter.clone();
            }
        }

        let mut checks = self
            .checks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Another VU may have registered it between the two locks.
        if let Some(counter) = checks.iter().find(|c| c.name == name) {
            return counter.clone();
        }
        trace!("Registering check `{name}`");
        let counter = Arc::new(CheckCounter::new(name));
        checks.push(counter.clone());
        counter
    }
}

pub(crate) struct CheckCounter {
    name: String,
    passes: AtomicU64,
    fails: AtomicU64,
}

impl CheckCounter {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passes: AtomicU64::new(0),
            fails: AtomicU64::new(0),
        }
    }
}

/// Samples drained from a [`Recorder`].
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub requests: u64,
    pub failed: u64,
    pub request_latency: Vec<Duration>,
    pub iterations: u64,
    pub iteration_latency: Vec<Duration>,
}

fn rate_limiter(max_rps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(max_rps).allow_burst(NonZeroU32::MIN))
}
