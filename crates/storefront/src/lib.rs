//! `vitrine-storefront`
//!
//! **Responsibility:** Client-side listing state for the shop page.
//!
//! This crate provides:
//! - The infinite-scroll aggregator that merges catalog pages
//! - The scroll-position heuristic that decides when to load the next page
//! - Filter-reset and stale-response gating by request identity
//!
//! It performs no IO: callers execute the [`FetchRequest`]s it hands out and
//! feed the outcomes back.

pub mod config;
pub mod feed;
pub mod scroll;

pub use config::FeedConfig;
pub use feed::{FetchRequest, InfiniteCatalog, Receipt};
pub use scroll::ScrollMetrics;
