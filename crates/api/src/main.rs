use anyhow::Context;

use vitrine_infra::CatalogConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vitrine_observability::init();

    let config = CatalogConfig::from_env().context("invalid configuration")?;
    let app = vitrine_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
