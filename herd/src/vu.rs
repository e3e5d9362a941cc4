//! Virtual users: one spawned task per VU, each looping the scenario iteration.
use crate::recorder::{Recorder, VuData, VU_HOOK};
use crate::scenario::Scenario;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};

pub(crate) struct VuPool<S: Scenario> {
    scenario: Arc<S>,
    context: Arc<S::Context>,
    recorder: Arc<Recorder>,
    running: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl<S: Scenario> VuPool<S> {
    pub fn new(scenario: Arc<S>, context: Arc<S::Context>, recorder: Arc<Recorder>) -> Self {
        Self {
            scenario,
            context,
            recorder,
            running: Arc::new(AtomicBool::new(true)),
            tasks: vec![],
        }
    }

    /// Spawn VUs until `vus` are running. VU ids are assigned in spawn order.
    pub fn spawn(&mut self, vus: usize) {
        while self.tasks.len() < vus {
            let id = self.tasks.len();
            let scenario = self.scenario.clone();
            let context = self.context.clone();
            let recorder = self.recorder.clone();
            let running = self.running.clone();
            let hook = VuData {
                id,
                recorder: recorder.clone(),
            };

            trace!("Spawning VU {id}");
            self.tasks.push(tokio::spawn(
                VU_HOOK
                    .scope(hook, async move {
                        let _active = ActiveVu::new(&recorder);
                        // NOTE: The flag is only checked between iterations; a started
                        // iteration runs to completion unless the pool aborts it.
                        while running.load(Ordering::Relaxed) {
                            let start = Instant::now();
                            scenario.iteration(&context).await;
                            recorder.record_iteration(start.elapsed());
                        }
                    })
                    .instrument(tracing::debug_span!("vu", id)),
            ));
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Stop starting new iterations and wait up to `graceful_stop` for in-flight ones.
    /// VUs still running after that are aborted. Returns the number interrupted.
    pub async fn stop(mut self, graceful_stop: Duration) -> usize {
        self.running.store(false, Ordering::Relaxed);
        let mut tasks = std::mem::take(&mut self.tasks);

        let mut joined = 0;
        let graceful = tokio::time::timeout(graceful_stop, async {
            for (id, task) in tasks.iter_mut().enumerate() {
                log_exit(id, task.await);
                joined += 1;
            }
        })
        .await;

        if graceful.is_ok() {
            debug!("All {} VUs finished their last iteration", tasks.len());
            return 0;
        }

        let interrupted = tasks[joined..].iter().filter(|t| !t.is_finished()).count();
        warn!(
            "{interrupted} VUs still running after the {} graceful stop; interrupting.",
            humantime::format_duration(graceful_stop)
        );
        for task in &tasks[joined..] {
            task.abort();
        }
        for (id, task) in tasks.iter_mut().enumerate().skip(joined) {
            log_exit(id, task.await);
        }
        interrupted
    }
}

impl<S: Scenario> Drop for VuPool<S> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn log_exit(id: usize, res: Result<(), JoinError>) {
    match res {
        Ok(()) => trace!("VU {id} stopped"),
        Err(err) if err.is_cancelled() => trace!("VU {id} interrupted"),
        Err(err) => error!("VU {id} panicked: {err}"),
    }
}

/// Counts a VU as active for as long as its task is alive, including when aborted.
struct ActiveVu<'a>(&'a Recorder);

impl<'a> ActiveVu<'a> {
    fn new(recorder: &'a Recorder) -> Self {
        recorder.vu_started();
        Self(recorder)
    }
}

impl Drop for ActiveVu<'_> {
    fn drop(&mut self) {
        self.0.vu_stopped();
    }
}
