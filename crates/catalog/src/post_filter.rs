//! Variant-level filtering applied after the product query returns.
//!
//! Status, color, size and price live on variants, not on the product row, so
//! the product query fetches every variant and this pass narrows them. A
//! product left with no variants is dropped.

use vitrine_core::{ColorId, SizeId};

use crate::filter::CatalogFilter;
use crate::product::{Product, Variant};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VariantFilter {
    pub color_id: Option<ColorId>,
    pub size_id: Option<SizeId>,
    /// Inclusive lower bound on the effective price, pivot units.
    pub min_price: Option<f64>,
    /// Inclusive upper bound on the effective price, pivot units.
    pub max_price: Option<f64>,
}

impl From<&CatalogFilter> for VariantFilter {
    fn from(filter: &CatalogFilter) -> Self {
        Self {
            color_id: filter.color_id,
            size_id: filter.size_id,
            min_price: filter.min_price,
            max_price: filter.max_price,
        }
    }
}

impl VariantFilter {
    /// Approved, and matching every bound that is set.
    pub fn matches(&self, variant: &Variant) -> bool {
        if !variant.status.is_approved() {
            return false;
        }
        if self.color_id.is_some() && variant.color_id != self.color_id {
            return false;
        }
        if self.size_id.is_some() && variant.size_id != self.size_id {
            return false;
        }

        let price = variant.effective_price_in_pivot();
        self.min_price.is_none_or(|min| price >= min) && self.max_price.is_none_or(|max| price <= max)
    }

    /// Narrow one product's variants. `None` when nothing survives.
    pub fn apply_to(&self, mut product: Product) -> Option<Product> {
        product.variants.retain(|v| self.matches(v));
        if product.variants.is_empty() {
            None
        } else {
            Some(product)
        }
    }

    /// Narrow a page of products, preserving order.
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        products
            .into_iter()
            .filter_map(|p| self.apply_to(p))
            .collect()
    }
}
