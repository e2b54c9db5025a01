//! Shop catalog domain.
//!
//! Entities, currency conversion, event windows, availability, filter state and
//! the variant post-filter, all as deterministic logic with no IO. Querying a
//! backend lives in `vitrine-infra`.

pub mod availability;
pub mod currency;
pub mod event;
pub mod filter;
pub mod post_filter;
pub mod presentation;
pub mod product;

pub use availability::{AvailabilityRecord, ProductUniverse, Scope};
pub use currency::{Currency, convert, find_pivot, from_pivot, to_pivot};
pub use event::{ActiveEvent, Event, resolve_active_event};
pub use filter::{CatalogFilter, CatalogKey, PriceBits, SortKey};
pub use post_filter::VariantFilter;
pub use presentation::{PriceTag, ProductCard, cover_media};
pub use product::{
    ApprovalStatus, Boutique, Category, Color, Design, Mall, Media, Product, Size, Variant,
};
