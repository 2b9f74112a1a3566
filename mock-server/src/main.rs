use chrono::Duration;
use tokio::net::TcpListener;
use todoable_mock_server::{MockConfig, MockState, API_PREFIX};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");

    let mut config = MockConfig {
        public_uri: format!("http://{addr}{API_PREFIX}"),
        ..MockConfig::default()
    };
    if let Ok(username) = std::env::var("TODOABLE_USERNAME") {
        config.username = username;
    }
    if let Ok(password) = std::env::var("TODOABLE_PASSWORD") {
        config.password = password;
    }
    if let Some(secs) = std::env::var("TODOABLE_TOKEN_TTL_SECS").ok().and_then(|s| s.parse().ok()) {
        config.token_ttl = Duration::seconds(secs);
    }

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, user = %config.username, "listening");
    todoable_mock_server::run(listener, MockState::new(config)).await
}
