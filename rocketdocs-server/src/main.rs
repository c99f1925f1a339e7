//! Binary entry point: loads configuration from the environment, wires
//! telemetry, and serves the HTTP surface.

use rocketdocs_server::config::RocketdocsConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = rocketdocs_telemetry::init();

    let config = RocketdocsConfig::from_env().unwrap_or_else(|err| {
        tracing::warn!(%err, "failed to load configuration from environment, using defaults");
        RocketdocsConfig::default()
    });
    let bind_addr = config.bind_addr.clone();

    let app = rocketdocs_server::build_app(config);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "rocketdocs-server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
