use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;

use vitrine_infra::source::{CatalogSeed, InMemoryCatalog};
use vitrine_infra::{CachedCatalog, CatalogConfig, CatalogService, CatalogSource, PgCatalog};

/// Which backend serves the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    InMemory,
    Postgres,
}

/// Shared handler state: the cached catalog pipeline plus the clock it runs on.
pub struct AppServices {
    catalog: CachedCatalog<Arc<dyn CatalogSource>>,
    backend: Backend,
    page_size: u32,
    /// Pinned "now" for tests; wall clock otherwise.
    fixed_now: Option<DateTime<Utc>>,
}

impl AppServices {
    pub fn new(source: Arc<dyn CatalogSource>, backend: Backend, config: &CatalogConfig) -> Self {
        let service = CatalogService::new(source, config.page_size);
        Self {
            page_size: service.page_size(),
            catalog: CachedCatalog::new(service, config.products_max_age(), config.options_max_age()),
            backend,
            fixed_now: None,
        }
    }

    pub fn with_fixed_time(mut self, now: DateTime<Utc>) -> Self {
        self.fixed_now = Some(now);
        self
    }

    pub fn catalog(&self) -> &CachedCatalog<Arc<dyn CatalogSource>> {
        &self.catalog
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(Utc::now)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Postgres when `DATABASE_URL` is set, otherwise the in-memory catalog
/// (seeded from `VITRINE_SEED_FILE` when given).
pub async fn build_services(config: &CatalogConfig) -> anyhow::Result<AppServices> {
    if let Some(url) = &config.database_url {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .context("failed to connect to Postgres")?;
        tracing::info!("catalog backed by Postgres");
        return Ok(AppServices::new(
            Arc::new(PgCatalog::new(pool)),
            Backend::Postgres,
            config,
        ));
    }

    let catalog = match &config.seed_file {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read seed file {path}"))?;
            let seed = CatalogSeed::from_json(&json)
                .with_context(|| format!("failed to parse seed file {path}"))?;
            tracing::info!(path = %path, products = seed.products.len(), "in-memory catalog seeded");
            InMemoryCatalog::from_seed(seed)
        }
        None => {
            tracing::warn!("DATABASE_URL not set and no seed file; serving an empty in-memory catalog");
            InMemoryCatalog::new()
        }
    };

    Ok(AppServices::new(Arc::new(catalog), Backend::InMemory, config))
}
