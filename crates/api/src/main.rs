use std::sync::Arc;

use anyhow::Context;

use asyncreply_api::{app, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    asyncreply_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let (services, _worker) = app::build_services(&config).context("failed to wire services")?;
    let services = Arc::new(services);
    let router = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router).await?;
    Ok(())
}
