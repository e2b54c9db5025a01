//! End-to-end shop catalog pipeline.
//!
//! active event -> availability universe -> product query -> variant post-filter,
//! plus the filter-option facets that only depend on the active event.

mod outcome;
mod service;

pub use outcome::{CatalogPage, EmptyReason, FetchId, FetchOutcome, has_next_page};
pub use service::{CatalogService, FilterOptions};
