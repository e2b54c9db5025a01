//! Infrastructure layer: data sources, query compilation, the catalog
//! pipeline, caching and configuration.

pub mod cache;
pub mod config;
pub mod pipeline;
pub mod query;
pub mod source;

pub use cache::{CacheLookup, CachedCatalog, QueryCache};
pub use config::{CatalogConfig, ConfigError};
pub use pipeline::{CatalogPage, CatalogService, EmptyReason, FetchId, FetchOutcome, FilterOptions};
pub use query::{CatalogQuery, CatalogQueryBuilder};
pub use source::{CatalogSource, InMemoryCatalog, PgCatalog, PriceBounds, ProductPage, SourceError};
