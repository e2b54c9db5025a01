use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use vitrine_catalog::Currency;
use vitrine_infra::FetchOutcome;

use crate::app::dto::{self, FiltersParams, ProductsParams, ProductsResponse};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/products", get(list_products))
        .route("/filters", get(filter_options))
        .route("/currencies", get(list_currencies))
}

/// Resolve the display currency for `code`. A failed currency load only matters
/// when a specific code was asked for.
async fn resolve_display(
    services: &AppServices,
    code: Option<&str>,
) -> Result<Currency, axum::response::Response> {
    let currencies = match services.catalog().service().currencies().await {
        FetchOutcome::Ready(list) => list,
        FetchOutcome::Failed(reason) if code.is_some_and(|c| !c.trim().is_empty()) => {
            return Err(errors::json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "currencies_unavailable",
                reason,
            ));
        }
        FetchOutcome::Empty(_) | FetchOutcome::Failed(_) => Vec::new(),
    };

    dto::display_currency(&currencies, code)
        .map_err(|e| errors::bad_request("unknown_currency", e.to_string()))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<ProductsParams>,
) -> axum::response::Response {
    let display = match resolve_display(&services, params.currency.as_deref()).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let filter = match params.to_filter(&display) {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let page = match params.page() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let outcome = services
        .catalog()
        .fetch_page(&filter, page, services.today(), services.now())
        .await;

    let body = ProductsResponse::from_outcome(outcome, &filter, page, services.page_size(), &display);
    (StatusCode::OK, Json(body)).into_response()
}

pub async fn filter_options(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<FiltersParams>,
) -> axum::response::Response {
    let display = match resolve_display(&services, params.currency.as_deref()).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let scope = match params.scope() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let options = services
        .catalog()
        .filter_options(scope, services.today(), services.now())
        .await;

    (StatusCode::OK, Json(dto::options_in(options, &display))).into_response()
}

pub async fn list_currencies(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let outcome = services.catalog().service().currencies().await;
    (StatusCode::OK, Json(outcome)).into_response()
}
