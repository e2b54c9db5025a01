//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: catalog source selection and caching
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: query parameters, response bodies and their mapping
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use vitrine_infra::CatalogConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &CatalogConfig) -> anyhow::Result<Router> {
    let services = services::build_services(config).await?;
    Ok(router(Arc::new(services)))
}

/// Router over already-built services.
pub fn router(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/shop", routes::shop::router())
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
