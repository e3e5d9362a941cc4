//! A stand-in for the orders API, for driving load tests locally and in tests.
//!
//! `/health` always answers. The list endpoints require a bearer token issued by
//! `POST /oauth/token` and answer 401 otherwise.
use axum::{
    debug_handler,
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use metrics::counter;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub const TOKEN_TTL_SECS: u64 = 30 * 60;

#[derive(Clone, Debug, Default)]
pub struct MockConfig {
    /// Added to every response.
    pub latency: Duration,
    /// Requests beyond this rate are answered with 429.
    pub max_rps: Option<NonZeroU32>,
    /// When true the token endpoint answers 503.
    pub disable_tokens: bool,
}

/// Shared state; clones observe the same server.
#[derive(Clone)]
pub struct MockState {
    inner: Arc<Inner>,
}

struct Inner {
    config: MockConfig,
    limiter: Option<DefaultDirectRateLimiter>,
    tokens: RwLock<HashSet<String>>,
    requests: Mutex<Vec<String>>,
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        let limiter = config
            .max_rps
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));
        Self {
            inner: Arc::new(Inner {
                config,
                limiter,
                tokens: RwLock::new(HashSet::new()),
                requests: Mutex::new(vec![]),
            }),
        }
    }

    /// Every request seen so far as `METHOD /path`, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.inner.requests).clone()
    }

    pub fn clear_requests(&self) {
        lock(&self.inner.requests).clear();
    }

    fn issue_token(&self) -> String {
        let token = format!("{:032x}", rand::thread_rng().gen::<u128>());
        self.inner
            .tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.clone());
        token
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(token) = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        else {
            return false;
        };
        self.inner
            .tokens
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(token)
    }
}

pub fn app(state: MockState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/customers/", get(customers))
        .route("/api/v1/orders/", get(orders))
        .route("/oauth/token", post(token))
        .layer(middleware::from_fn_with_state(state.clone(), observe))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: SocketAddr, config: MockConfig) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    debug!("Mock orders API listening on {}", listener.local_addr()?);
    axum::serve(listener, app(MockState::new(config))).await?;
    Ok(())
}

/// Serve on an ephemeral local port in the background.
pub async fn spawn(config: MockConfig) -> anyhow::Result<(SocketAddr, MockState)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = MockState::new(config);
    let router = app(state.clone());
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            tracing::error!("Mock orders API stopped: {err}");
        }
    });
    Ok((addr, state))
}

async fn observe(State(state): State<MockState>, req: Request, next: Next) -> Response {
    let line = format!("{} {}", req.method(), req.uri().path());
    counter!("mock-service.requests", "path" => req.uri().path().to_string()).increment(1);
    lock(&state.inner.requests).push(line);

    if let Some(limiter) = &state.inner.limiter {
        if limiter.check().is_err() {
            return StatusCode::TOO_MANY_REQUESTS.into_response();
        }
    }
    if !state.inner.config.latency.is_zero() {
        tokio::time::sleep(state.inner.config.latency).await;
    }
    next.run(req).await
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
struct Detail {
    detail: &'static str,
}

#[derive(Serialize)]
struct Customer {
    id: u32,
    name: &'static str,
    code: &'static str,
    phone: &'static str,
}

#[derive(Serialize)]
struct Order {
    id: u32,
    customer_id: u32,
    item: &'static str,
    amount: f64,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: u64,
    scope: &'static str,
}

#[debug_handler]
async fn health() -> Json<Health> {
    Json(Health { status: "healthy" })
}

#[debug_handler]
async fn customers(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(vec![
        Customer {
            id: 1,
            name: "Amina Njeri",
            code: "CUST001",
            phone: "+254700000001",
        },
        Customer {
            id: 2,
            name: "Brian Otieno",
            code: "CUST002",
            phone: "+254700000002",
        },
    ])
    .into_response()
}

#[debug_handler]
async fn orders(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(vec![Order {
        id: 1,
        customer_id: 1,
        item: "Maize flour 2kg",
        amount: 250.,
    }])
    .into_response()
}

#[debug_handler]
async fn token(State(state): State<MockState>) -> Response {
    if state.inner.config.disable_tokens {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(TokenResponse {
        access_token: state.issue_token(),
        token_type: "Bearer",
        expires_in: TOKEN_TTL_SECS,
        scope: "read write",
    })
    .into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(Detail {
            detail: "Could not validate credentials",
        }),
    )
        .into_response()
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
