use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let config = gatehouse::config::Config::from_env()?;
    // Startup banner at info level; the signing secret itself never hits the logs.
    info!(
        target: "gatehouse",
        "gatehouse starting: http_port={}, db_root='{}', token_ttl_ms={}",
        config.http_port, config.db_root, config.jwt_ttl_ms
    );

    gatehouse::server::run(config).await
}
