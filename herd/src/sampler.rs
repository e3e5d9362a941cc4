//! Periodic progress reporting while virtual users run.
use crate::aggregate::Aggregate;
use crate::recorder::Recorder;
use std::sync::Arc;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

mod measurement;
mod timer;

pub use measurement::Measurement;
use timer::Timer;

/// Drains the [`Recorder`] once per interval, folding every sample into the run aggregate.
pub(crate) struct Sampler {
    recorder: Arc<Recorder>,
    timer: Timer,
    aggregate: Aggregate,
}

impl Sampler {
    pub async fn new(recorder: Arc<Recorder>, interval: Duration) -> Self {
        let timer = Timer::new(interval).await;
        trace!("Progress interval: {timer}");
        Self {
            recorder,
            timer,
            aggregate: Aggregate::default(),
        }
    }

    /// Wait for the next interval and measure it. Cancel safe.
    pub async fn sample(&mut self) -> Measurement {
        let elapsed = self.timer.tick().await;
        self.drain(elapsed)
    }

    /// Drain whatever the final partial interval recorded and return the run aggregate.
    pub fn finish(mut self) -> Aggregate {
        let elapsed = self.timer.since_last_tick();
        let measurement = self.drain(elapsed);
        debug!(
            "Final interval: {measurement}; {} latency samples in total",
            self.aggregate.request_latency.len()
        );
        self.aggregate
    }

    fn drain(&mut self, elapsed: Duration) -> Measurement {
        let collected = self.recorder.collect();
        let measurement = Measurement::new(&collected, elapsed, self.recorder.active_vus());

        #[cfg(feature = "metrics")]
        {
            metrics::gauge!("herd_interval_rps").set(measurement.rps);
            metrics::gauge!("herd_interval_failed_rate").set(measurement.failed_rate);
        }

        self.aggregate.absorb(collected);
        measurement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn every_sample_reaches_the_aggregate() {
        let recorder = Arc::new(Recorder::new(None));
        let mut sampler = Sampler::new(recorder.clone(), Duration::from_secs(1)).await;

        recorder.record_request(Duration::from_millis(10), false);
        recorder.record_request(Duration::from_millis(30), true);
        let measurement = sampler.sample().await;
        assert_eq!(measurement.rps, 2.);
        assert_eq!(measurement.failed_rate, 0.5);

        recorder.record_request(Duration::from_millis(20), false);
        recorder.record_iteration(Duration::from_millis(60));
        let aggregate = sampler.finish();

        assert_eq!(aggregate.requests, 3);
        assert_eq!(aggregate.failed, 1);
        assert_eq!(aggregate.request_latency.len(), 3);
        assert_eq!(aggregate.iterations, 1);
    }
}
