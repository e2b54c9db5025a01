//! Availability records and the product universe they define.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use vitrine_core::{BoutiqueId, EventId, MallId, ProductId};

/// Links a product to an event, optionally scoped to a mall and/or boutique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub event_id: EventId,
    pub product_id: ProductId,
    #[serde(default)]
    pub mall_id: Option<MallId>,
    #[serde(default)]
    pub boutique_id: Option<BoutiqueId>,
}

/// Optional mall/boutique narrowing of the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub mall_id: Option<MallId>,
    pub boutique_id: Option<BoutiqueId>,
}

impl Scope {
    pub fn new(mall_id: Option<MallId>, boutique_id: Option<BoutiqueId>) -> Self {
        Self {
            mall_id,
            boutique_id,
        }
    }

    /// Equality on every scope component that is set.
    pub fn admits(&self, record: &AvailabilityRecord) -> bool {
        self.mall_id.is_none_or(|m| record.mall_id == Some(m))
            && self.boutique_id.is_none_or(|b| record.boutique_id == Some(b))
    }
}

/// Distinct set of product ids on sale in one event and scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductUniverse {
    event_id: Option<EventId>,
    products: BTreeSet<ProductId>,
}

impl ProductUniverse {
    /// Collect the products that `records` offer in `event_id` under `scope`.
    ///
    /// Records for other events are ignored, so callers may pass an unfiltered
    /// slice.
    pub fn collect<'a, I>(event_id: EventId, scope: &Scope, records: I) -> Self
    where
        I: IntoIterator<Item = &'a AvailabilityRecord>,
    {
        let products = records
            .into_iter()
            .filter(|r| r.event_id == event_id && scope.admits(r))
            .map(|r| r.product_id)
            .collect();

        Self {
            event_id: Some(event_id),
            products,
        }
    }

    pub fn event_id(&self) -> Option<EventId> {
        self.event_id
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.products.contains(&id)
    }

    /// Ascending product ids.
    pub fn ids(&self) -> Vec<ProductId> {
        self.products.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(event: i64, product: i64, mall: Option<i64>, boutique: Option<i64>) -> AvailabilityRecord {
        AvailabilityRecord {
            event_id: EventId::new(event),
            product_id: ProductId::new(product),
            mall_id: mall.map(MallId::new),
            boutique_id: boutique.map(BoutiqueId::new),
        }
    }

    #[test]
    fn unscoped_universe_collects_distinct_products_of_the_event() {
        let records = vec![
            record(1, 10, Some(1), None),
            record(1, 10, Some(2), None),
            record(1, 11, None, None),
            record(2, 12, None, None),
        ];

        let universe = ProductUniverse::collect(EventId::new(1), &Scope::default(), &records);
        assert_eq!(universe.ids(), vec![ProductId::new(10), ProductId::new(11)]);
        assert_eq!(universe.event_id(), Some(EventId::new(1)));
    }

    #[test]
    fn scope_narrows_by_mall_and_boutique() {
        let records = vec![
            record(1, 10, Some(1), Some(5)),
            record(1, 11, Some(1), Some(6)),
            record(1, 12, Some(2), Some(5)),
            record(1, 13, None, None),
        ];

        let by_mall = Scope::new(Some(MallId::new(1)), None);
        let universe = ProductUniverse::collect(EventId::new(1), &by_mall, &records);
        assert_eq!(universe.ids(), vec![ProductId::new(10), ProductId::new(11)]);

        let by_both = Scope::new(Some(MallId::new(1)), Some(BoutiqueId::new(5)));
        let universe = ProductUniverse::collect(EventId::new(1), &by_both, &records);
        assert_eq!(universe.ids(), vec![ProductId::new(10)]);
    }

    #[test]
    fn no_records_means_empty_universe() {
        let universe = ProductUniverse::collect(EventId::new(1), &Scope::default(), &[]);
        assert!(universe.is_empty());
        assert_eq!(universe.len(), 0);
    }
}
