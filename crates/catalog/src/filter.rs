//! Shop filter state and the typed key it is cached under.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use vitrine_core::{
    BoutiqueId, CategoryId, ColorId, DomainError, DomainResult, MallId, SizeId,
};

use crate::availability::Scope;
use crate::currency::{Currency, from_pivot, to_pivot};

/// Listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Highest product id first (ids are assigned in creation order).
    #[default]
    Newest,
    Alphabetical,
    PriceAsc,
    PriceDesc,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Alphabetical => "alphabetical",
            SortKey::PriceAsc => "price_asc",
            SortKey::PriceDesc => "price_desc",
        }
    }
}

impl FromStr for SortKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "newest" => Ok(Self::Newest),
            "alphabetical" => Ok(Self::Alphabetical),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            other => Err(DomainError::validation(format!("unknown sort key: {other}"))),
        }
    }
}

/// Everything the shop UI can filter on, minus the page cursor.
///
/// Price bounds are always in pivot units. Use [`CatalogFilter::set_price_range_in`]
/// to enter them in another currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub mall_id: Option<MallId>,
    pub boutique_id: Option<BoutiqueId>,
    pub category_id: Option<CategoryId>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
    pub color_id: Option<ColorId>,
    pub size_id: Option<SizeId>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl CatalogFilter {
    pub fn scope(&self) -> Scope {
        Scope::new(self.mall_id, self.boutique_id)
    }

    /// Trimmed search term, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Whether any filter applies to variants rather than products.
    pub fn has_variant_filters(&self) -> bool {
        self.color_id.is_some()
            || self.size_id.is_some()
            || self.min_price.is_some()
            || self.max_price.is_some()
    }

    /// Store a price range entered in `currency`, converting to pivot units.
    pub fn set_price_range_in(
        &mut self,
        min: Option<f64>,
        max: Option<f64>,
        currency: &Currency,
    ) -> DomainResult<()> {
        for bound in [min, max].into_iter().flatten() {
            if !bound.is_finite() || bound < 0.0 {
                return Err(DomainError::validation(format!(
                    "price bound must be a non-negative number, got {bound}"
                )));
            }
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(DomainError::validation(format!(
                    "min price {lo} is greater than max price {hi}"
                )));
            }
        }
        self.min_price = min.map(|v| to_pivot(v, currency));
        self.max_price = max.map(|v| to_pivot(v, currency));
        Ok(())
    }

    /// Price range expressed in `currency`, for echoing back to the user.
    pub fn price_range_in(&self, currency: &Currency) -> (Option<f64>, Option<f64>) {
        (
            self.min_price.map(|v| from_pivot(v, currency)),
            self.max_price.map(|v| from_pivot(v, currency)),
        )
    }

    /// Cache key for one page of this filter.
    pub fn key(&self, page: u32) -> CatalogKey {
        CatalogKey {
            mall_id: self.mall_id,
            boutique_id: self.boutique_id,
            category_id: self.category_id,
            search: self.search_term().map(str::to_lowercase),
            sort: self.sort,
            color_id: self.color_id,
            size_id: self.size_id,
            min_price: self.min_price.map(PriceBits::from),
            max_price: self.max_price.map(PriceBits::from),
            page,
        }
    }

    /// Whether two filters select the same listing, ignoring blank-search and
    /// search-case differences.
    pub fn same_listing(&self, other: &CatalogFilter) -> bool {
        self.key(1) == other.key(1)
    }
}

/// Bit pattern of a pivot price, giving `f64` bounds total equality and hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceBits(u64);

impl From<f64> for PriceBits {
    fn from(value: f64) -> Self {
        // -0.0 and 0.0 select the same rows.
        let normalized = if value == 0.0 { 0.0 } else { value };
        Self(normalized.to_bits())
    }
}

/// Full filter tuple plus page, with structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogKey {
    pub mall_id: Option<MallId>,
    pub boutique_id: Option<BoutiqueId>,
    pub category_id: Option<CategoryId>,
    pub search: Option<String>,
    pub sort: SortKey,
    pub color_id: Option<ColorId>,
    pub size_id: Option<SizeId>,
    pub min_price: Option<PriceBits>,
    pub max_price: Option<PriceBits>,
    pub page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::fixtures::{foreign, pivot};

    #[test]
    fn sort_key_parses_wire_names() {
        assert_eq!("price_desc".parse::<SortKey>().unwrap(), SortKey::PriceDesc);
        assert_eq!("".parse::<SortKey>().unwrap(), SortKey::Newest);
        assert!("cheapest".parse::<SortKey>().is_err());
        assert_eq!(SortKey::Alphabetical.as_str(), "alphabetical");
    }

    #[test]
    fn price_range_is_stored_in_pivot_units() {
        let mut filter = CatalogFilter::default();
        filter
            .set_price_range_in(Some(100.0), Some(300.0), &foreign(2.0))
            .unwrap();

        assert_eq!(filter.min_price, Some(50.0));
        assert_eq!(filter.max_price, Some(150.0));
        assert_eq!(filter.price_range_in(&foreign(2.0)), (Some(100.0), Some(300.0)));
        assert_eq!(filter.price_range_in(&pivot()), (Some(50.0), Some(150.0)));
    }

    #[test]
    fn inverted_or_negative_price_range_is_rejected() {
        let mut filter = CatalogFilter::default();
        assert!(filter.set_price_range_in(Some(10.0), Some(5.0), &pivot()).is_err());
        assert!(filter.set_price_range_in(Some(-1.0), None, &pivot()).is_err());
        assert_eq!(filter.min_price, None);
    }

    #[test]
    fn blank_search_is_ignored() {
        let filter = CatalogFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.search_term(), None);
        assert!(filter.same_listing(&CatalogFilter::default()));
    }

    #[test]
    fn keys_differ_per_page_and_per_filter() {
        let filter = CatalogFilter {
            category_id: Some(CategoryId::new(3)),
            min_price: Some(10.0),
            ..Default::default()
        };
        assert_eq!(filter.key(1), filter.clone().key(1));
        assert_ne!(filter.key(1), filter.key(2));

        let other = CatalogFilter {
            min_price: Some(10.5),
            ..filter.clone()
        };
        assert_ne!(filter.key(1), other.key(1));
    }

    #[test]
    fn search_case_does_not_split_the_cache() {
        let a = CatalogFilter {
            search: Some("Linen".to_string()),
            ..Default::default()
        };
        let b = CatalogFilter {
            search: Some(" linen ".to_string()),
            ..Default::default()
        };
        assert_eq!(a.key(1), b.key(1));
    }

    #[test]
    fn variant_filters_are_detected() {
        assert!(!CatalogFilter::default().has_variant_filters());
        let filter = CatalogFilter {
            size_id: Some(SizeId::new(1)),
            ..Default::default()
        };
        assert!(filter.has_variant_filters());
    }
}
