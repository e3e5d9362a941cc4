use herd::http::Client;
use loadtest::OrdersApi;
use mock_service::{MockConfig, MockState};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_env_filter("herd=debug,loadtest=debug,mock_service=info")
            .try_init()
            .ok();
    });
}

/// Start a mock orders API and return its base URL.
#[allow(unused)]
pub async fn mock(config: MockConfig) -> anyhow::Result<(String, MockState)> {
    let (addr, state) = mock_service::spawn(config).await?;
    Ok((format!("http://{addr}"), state))
}

/// A base URL nothing listens on.
#[allow(unused)]
pub async fn dead_url() -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    Ok(format!("http://{}", listener.local_addr()?))
}

#[allow(unused)]
pub fn orders_api(api_url: &str, pause: Duration) -> OrdersApi {
    OrdersApi::new(Client::new(Duration::from_secs(5)).unwrap(), api_url).pause(pause)
}
