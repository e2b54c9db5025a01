//! Catalog data-source boundary.
//!
//! The pipeline reads through [`CatalogSource`] only. Implementations decide
//! how the reads are executed (SQL, in-memory, ...); the pipeline decides what
//! to read and in which order.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vitrine_catalog::{
    AvailabilityRecord, Boutique, Category, Color, Currency, Event, Mall, Product, Scope, Size,
};
use vitrine_core::{EventId, MallId, ProductId};

use crate::query::CatalogQuery;

pub use in_memory::{CatalogSeed, InMemoryCatalog, QueryKind};
pub use postgres::PgCatalog;

/// One page of products plus the size of the unpaginated match set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total_count: u64,
}

/// Lowest and highest effective price among sellable variants, pivot units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub min: f64,
    pub max: f64,
}

/// Data-source failure.
///
/// The pipeline never propagates these; it logs them and degrades the stage
/// to `FetchOutcome::Failed`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The backend rejected or failed the query.
    #[error("query failed in {operation}: {message}")]
    Query { operation: String, message: String },

    /// A row came back in a shape we cannot map.
    #[error("failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    /// The backend could not be reached (pool closed, lock poisoned, ...).
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    pub fn query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn decode(what: impl Into<String>, message: impl core::fmt::Display) -> Self {
        Self::Decode {
            what: what.into(),
            message: message.to_string(),
        }
    }
}

/// Read-only catalog queries the shop pipeline depends on.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Events whose window contains `today`, most recently started first.
    async fn active_events(&self, today: NaiveDate) -> Result<Vec<Event>, SourceError>;

    /// Availability records of `event_id`, narrowed by `scope`.
    async fn availability(
        &self,
        event_id: EventId,
        scope: Scope,
    ) -> Result<Vec<AvailabilityRecord>, SourceError>;

    /// Execute a compiled product query: one page with every variant, media and
    /// lookup row attached, plus the unpaginated count.
    async fn products(&self, query: &CatalogQuery) -> Result<ProductPage, SourceError>;

    /// Colors used by sellable variants of `universe`.
    async fn colors(&self, universe: &[ProductId]) -> Result<Vec<Color>, SourceError>;

    /// Sizes used by sellable variants of `universe`.
    async fn sizes(&self, universe: &[ProductId]) -> Result<Vec<Size>, SourceError>;

    /// Effective price range of sellable variants of `universe`. `None` when
    /// nothing is sellable.
    async fn price_bounds(&self, universe: &[ProductId]) -> Result<Option<PriceBounds>, SourceError>;

    /// Categories of listed products in `universe`.
    async fn categories(&self, universe: &[ProductId]) -> Result<Vec<Category>, SourceError>;

    /// Malls referenced by availability records of `event_id`.
    async fn malls(&self, event_id: EventId) -> Result<Vec<Mall>, SourceError>;

    /// Boutiques referenced by availability records of `event_id`, optionally
    /// within one mall.
    async fn boutiques(
        &self,
        event_id: EventId,
        mall_id: Option<MallId>,
    ) -> Result<Vec<Boutique>, SourceError>;

    async fn currencies(&self) -> Result<Vec<Currency>, SourceError>;
}

#[async_trait::async_trait]
impl<S> CatalogSource for Arc<S>
where
    S: CatalogSource + ?Sized,
{
    async fn active_events(&self, today: NaiveDate) -> Result<Vec<Event>, SourceError> {
        (**self).active_events(today).await
    }

    async fn availability(
        &self,
        event_id: EventId,
        scope: Scope,
    ) -> Result<Vec<AvailabilityRecord>, SourceError> {
        (**self).availability(event_id, scope).await
    }

    async fn products(&self, query: &CatalogQuery) -> Result<ProductPage, SourceError> {
        (**self).products(query).await
    }

    async fn colors(&self, universe: &[ProductId]) -> Result<Vec<Color>, SourceError> {
        (**self).colors(universe).await
    }

    async fn sizes(&self, universe: &[ProductId]) -> Result<Vec<Size>, SourceError> {
        (**self).sizes(universe).await
    }

    async fn price_bounds(&self, universe: &[ProductId]) -> Result<Option<PriceBounds>, SourceError> {
        (**self).price_bounds(universe).await
    }

    async fn categories(&self, universe: &[ProductId]) -> Result<Vec<Category>, SourceError> {
        (**self).categories(universe).await
    }

    async fn malls(&self, event_id: EventId) -> Result<Vec<Mall>, SourceError> {
        (**self).malls(event_id).await
    }

    async fn boutiques(
        &self,
        event_id: EventId,
        mall_id: Option<MallId>,
    ) -> Result<Vec<Boutique>, SourceError> {
        (**self).boutiques(event_id, mall_id).await
    }

    async fn currencies(&self) -> Result<Vec<Currency>, SourceError> {
        (**self).currencies().await
    }
}
