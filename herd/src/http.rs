//! Instrumented HTTP client.
//!
//! Every request sent through [`Client`] inside a virtual user records `http_reqs`,
//! `http_req_duration` and `http_req_failed`. A request counts as failed when it errors
//! before a response arrives or when the status is not in its [`ExpectedStatuses`].
use crate::recorder::current_recorder;
use herd_core::DEFAULT_REQUEST_TIMEOUT;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

pub use reqwest::{header, IntoUrl, Method, StatusCode};

#[derive(Clone, Debug)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }

    pub fn from_reqwest(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    pub fn get(&self, url: impl IntoUrl) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: impl IntoUrl) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn request(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.request(method, url),
            expected: ExpectedStatuses::default(),
        }
    }

    /// The underlying client, for requests which should not be recorded.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

impl Default for Client {
    fn default() -> Self {
        // Only fails if the TLS backend cannot initialize.
        Self::new(DEFAULT_REQUEST_TIMEOUT).unwrap_or_else(|_| Self {
            inner: reqwest::Client::new(),
        })
    }
}

pub struct RequestBuilder {
    inner: reqwest::RequestBuilder,
    expected: ExpectedStatuses,
}

impl RequestBuilder {
    pub fn header(mut self, key: HeaderName, value: HeaderValue) -> Self {
        self.inner = self.inner.header(key, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.inner = self.inner.headers(headers);
        self
    }

    pub fn body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.inner = self.inner.body(body);
        self
    }

    /// Statuses which do not count towards `http_req_failed`. Defaults to `200..=399`.
    pub fn expect(mut self, expected: ExpectedStatuses) -> Self {
        self.expected = expected;
        self
    }

    pub async fn send(self) -> HttpOutcome {
        let recorder = current_recorder();
        if let Some(recorder) = &recorder {
            recorder.throttle().await;
        }

        let start = Instant::now();
        let res = exchange(self.inner).await;
        let latency = start.elapsed();

        let outcome = match res {
            Ok((status, body_len)) => HttpOutcome {
                status: Some(status),
                latency,
                body_len,
                error: None,
                expected: self.expected.contains(status.as_u16()),
            },
            Err((status, err)) => {
                debug!("Request failed after {latency:?}: {err}");
                HttpOutcome {
                    status,
                    latency,
                    body_len: 0,
                    error: Some(err.to_string()),
                    expected: false,
                }
            }
        };

        match recorder {
            Some(recorder) => recorder.record_request(latency, outcome.failed()),
            None => warn!("No VU hook available; request was not recorded."),
        }
        trace!("{outcome}");

        outcome
    }
}

async fn exchange(
    req: reqwest::RequestBuilder,
) -> Result<(StatusCode, usize), (Option<StatusCode>, reqwest::Error)> {
    let res = req.send().await.map_err(|e| (None, e))?;
    let status = res.status();
    let body = res.bytes().await.map_err(|e| (Some(status), e))?;
    Ok((status, body.len()))
}

/// The result of one recorded request. The body is read and discarded.
#[derive(Clone, Debug)]
pub struct HttpOutcome {
    /// `None` when no response arrived.
    pub status: Option<StatusCode>,
    pub latency: Duration,
    pub body_len: usize,
    pub error: Option<String>,
    expected: bool,
}

impl HttpOutcome {
    pub fn status_code(&self) -> Option<u16> {
        self.status.map(|s| s.as_u16())
    }

    pub fn status_is(&self, code: u16) -> bool {
        self.status_code() == Some(code)
    }

    pub fn status_in(&self, codes: &[u16]) -> bool {
        self.status_code().is_some_and(|s| codes.contains(&s))
    }

    /// Whether this request counts towards `http_req_failed`.
    pub fn failed(&self) -> bool {
        !self.expected
    }

    pub fn is_network_error(&self) -> bool {
        self.status.is_none()
    }
}

impl std::fmt::Display for HttpOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.status, &self.error) {
            (Some(status), None) => write!(f, "status={} latency={:?}", status, self.latency),
            (Some(status), Some(err)) => {
                write!(f, "status={} latency={:?} error={}", status, self.latency, err)
            }
            (None, Some(err)) => write!(f, "no response latency={:?} error={}", self.latency, err),
            (None, None) => write!(f, "no response latency={:?}", self.latency),
        }
    }
}

/// Statuses a request treats as success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpectedStatuses {
    Range(RangeInclusive<u16>),
    AnyOf(Vec<u16>),
}

impl ExpectedStatuses {
    pub fn only(status: u16) -> Self {
        Self::AnyOf(vec![status])
    }

    pub fn any_of(statuses: &[u16]) -> Self {
        Self::AnyOf(statuses.to_vec())
    }

    pub fn contains(&self, status: u16) -> bool {
        match self {
            Self::Range(range) => range.contains(&status),
            Self::AnyOf(statuses) => statuses.contains(&status),
        }
    }
}

impl Default for ExpectedStatuses {
    fn default() -> Self {
        Self::Range(200..=399)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{Recorder, VuData, VU_HOOK};
    use axum::{http::StatusCode as AxumStatus, routing::get, Router};
    use std::net::SocketAddr;
    use std::sync::Arc;

    async fn serve() -> SocketAddr {
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/denied", get(|| async { AxumStatus::UNAUTHORIZED }))
            .route("/boom", get(|| async { AxumStatus::INTERNAL_SERVER_ERROR }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    /// Binds and immediately drops a listener so the port refuses connections.
    async fn closed_port() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    #[test]
    fn expected_statuses() {
        let default = ExpectedStatuses::default();
        assert!(default.contains(200));
        assert!(default.contains(302));
        assert!(!default.contains(401));

        let auth = ExpectedStatuses::any_of(&[200, 401]);
        assert!(auth.contains(401));
        assert!(!auth.contains(403));

        assert!(ExpectedStatuses::only(200).contains(200));
        assert!(!ExpectedStatuses::only(200).contains(201));
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn records_status_and_failure() {
        let addr = serve().await;
        let client = Client::default();
        let recorder = Arc::new(Recorder::new(None));
        let hook = VuData {
            id: 0,
            recorder: recorder.clone(),
        };

        let (ok, denied, denied_expected, boom) = VU_HOOK
            .scope(hook, async {
                let ok = client.get(format!("http://{addr}/ok")).send().await;
                let denied = client.get(format!("http://{addr}/denied")).send().await;
                let denied_expected = client
                    .get(format!("http://{addr}/denied"))
                    .expect(ExpectedStatuses::any_of(&[200, 401]))
                    .send()
                    .await;
                let boom = client.get(format!("http://{addr}/boom")).send().await;
                (ok, denied, denied_expected, boom)
            })
            .await;

        assert!(ok.status_is(200));
        assert_eq!(ok.body_len, 2);
        assert!(!ok.failed());

        assert!(denied.status_is(401));
        assert!(denied.failed());

        assert!(denied_expected.status_in(&[200, 401]));
        assert!(!denied_expected.failed());

        assert!(boom.status_is(500));
        assert!(boom.failed());

        let collected = recorder.collect();
        assert_eq!(collected.requests, 4);
        assert_eq!(collected.failed, 2);
        assert_eq!(collected.request_latency.len(), 4);
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn connection_refused_is_a_failed_request() {
        let addr = closed_port().await;
        let client = Client::default();
        let recorder = Arc::new(Recorder::new(None));
        let hook = VuData {
            id: 0,
            recorder: recorder.clone(),
        };

        let outcome = VU_HOOK
            .scope(hook, async {
                client.get(format!("http://{addr}/health")).send().await
            })
            .await;

        assert!(outcome.is_network_error());
        assert!(outcome.failed());
        assert!(outcome.error.is_some());
        assert!(!outcome.status_in(&[200, 401]));

        let collected = recorder.collect();
        assert_eq!(collected.requests, 1);
        assert_eq!(collected.failed, 1);
    }
}
