//! The lifecycle a load test drives.
use crate::error::ScenarioError;
use std::future::Future;

/// A load-test scenario: one-time setup, a repeated iteration, one-time teardown.
///
/// The harness calls [`Scenario::setup`] exactly once before any virtual user starts. The
/// returned context is shared read-only with every iteration on every virtual user, and
/// finally handed to [`Scenario::teardown`] once all iterations have completed or been
/// cancelled.
///
/// Iterations do not return errors. Failed requests and failed checks are recorded as
/// metrics through [`crate::http::Client`] and [`crate::check`], so one bad iteration never
/// stops the next.
///
/// # Example
/// ```no_run
/// use herd::prelude::*;
/// use std::time::Duration;
///
/// struct Ping {
///     client: herd::http::Client,
/// }
///
/// impl Scenario for Ping {
///     type Context = String;
///
///     async fn setup(&self) -> Result<String, ScenarioError> {
///         Ok("http://localhost:8000".to_string())
///     }
///
///     async fn iteration(&self, base_url: &String) {
///         let res = self.client.get(format!("{base_url}/health")).send().await;
///         check("status is 200", res.status_is(200));
///         tokio::time::sleep(Duration::from_secs(1)).await;
///     }
/// }
/// ```
pub trait Scenario: Send + Sync + 'static {
    /// Value produced by `setup` and shared by all iterations.
    type Context: Send + Sync + 'static;

    fn setup(&self) -> impl Future<Output = Result<Self::Context, ScenarioError>> + Send;

    fn iteration(&self, context: &Self::Context) -> impl Future<Output = ()> + Send;

    /// Best-effort cleanup. Errors are logged and never change the run verdict.
    fn teardown(
        &self,
        context: &Self::Context,
    ) -> impl Future<Output = Result<(), ScenarioError>> + Send {
        let _ = context;
        async { Ok(()) }
    }
}
