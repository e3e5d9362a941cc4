use herd::http::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use herd::http::{Client, ExpectedStatuses};
use herd::{check, Scenario, ScenarioError};
use serde::Deserialize;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
/// Sent when no real token is configured. The API answers 401, which the list checks accept.
pub const PLACEHOLDER_TOKEN: &str = "test-token";
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

/// One request of an iteration.
#[derive(Debug)]
pub struct Step {
    pub path: &'static str,
    /// Whether the request carries the authorization headers.
    pub authorized: bool,
    pub expected: &'static [u16],
    pub check: &'static str,
}

pub const STEPS: [Step; 3] = [
    Step {
        path: "/health",
        authorized: false,
        expected: &[200],
        check: "health check status is 200",
    },
    Step {
        path: "/api/v1/customers/",
        authorized: true,
        expected: &[200, 401],
        check: "customers list status is 200 or 401",
    },
    Step {
        path: "/api/v1/orders/",
        authorized: true,
        expected: &[200, 401],
        check: "orders list status is 200 or 401",
    },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthSource {
    /// Use this bearer token as is.
    Static(String),
    /// Request a token from `{api_url}/oauth/token` during setup.
    TokenEndpoint,
}

impl Default for AuthSource {
    fn default() -> Self {
        Self::Static(PLACEHOLDER_TOKEN.to_string())
    }
}

pub struct OrdersApi {
    client: Client,
    api_url: String,
    auth: AuthSource,
    pause: Duration,
}

impl OrdersApi {
    pub fn new(client: Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            auth: AuthSource::default(),
            pause: DEFAULT_PAUSE,
        }
    }

    pub fn auth(mut self, auth: AuthSource) -> Self {
        self.auth = auth;
        self
    }

    /// Think time after every step.
    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn fetch_token(&self) -> Result<String, ScenarioError> {
        let url = format!("{}/oauth/token", self.api_url);
        debug!("Requesting access token from {url}");
        let res = self.client.inner().post(&url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ScenarioError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }
        let token: TokenResponse = res.json().await?;
        info!(
            "Acquired {} token with scope `{}`, expires in {}s",
            token.token_type,
            token.scope.as_deref().unwrap_or(""),
            token.expires_in.unwrap_or_default()
        );
        Ok(token.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: Option<u64>,
    scope: Option<String>,
}

/// Accepts a copied header value such as `Bearer abc` as well as the bare token.
fn bare_token(token: &str) -> &str {
    let token = token.trim();
    match token.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim_start(),
        _ => token,
    }
}

/// Built once by setup and shared by every VU.
#[derive(Clone, Debug)]
pub struct OrdersContext {
    pub base_url: String,
    /// Authorization and content type for the authenticated steps.
    pub headers: HeaderMap,
}

impl Scenario for OrdersApi {
    type Context = OrdersContext;

    async fn setup(&self) -> Result<OrdersContext, ScenarioError> {
        let token = match &self.auth {
            AuthSource::Static(token) => bare_token(token).to_string(),
            AuthSource::TokenEndpoint => self.fetch_token().await?,
        };

        let authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ScenarioError::other("token is not a valid header value"))?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(OrdersContext {
            base_url: self.api_url.clone(),
            headers,
        })
    }

    async fn iteration(&self, context: &OrdersContext) {
        for step in &STEPS {
            let mut req = self
                .client
                .get(format!("{}{}", context.base_url, step.path))
                .expect(ExpectedStatuses::any_of(step.expected));
            if step.authorized {
                req = req.headers(context.headers.clone());
            }

            let res = req.send().await;
            if !check(step.check, res.status_in(step.expected)) {
                debug!("{} {}: {res}", step.path, step.check);
            }

            tokio::time::sleep(self.pause).await;
        }
    }

    async fn teardown(&self, context: &OrdersContext) -> Result<(), ScenarioError> {
        info!("Finished load test against {}", context.base_url);
        Ok(())
    }
}
