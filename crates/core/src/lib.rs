//! `vitrine-core`: shared domain building blocks.
//!
//! Identifiers and the domain error model used by every other crate in the
//! workspace. Nothing in here performs IO.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, index_by_id};
pub use error::{DomainError, DomainResult};
pub use id::{
    BoutiqueId, CategoryId, ColorId, CurrencyId, DesignId, EventId, MallId, ProductId, SizeId,
    VariantId,
};
