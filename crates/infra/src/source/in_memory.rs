use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use vitrine_catalog::{
    AvailabilityRecord, Boutique, Category, Color, Currency, Event, Mall, Product, Scope, Size,
    Variant,
};
use vitrine_core::{
    BoutiqueId, CategoryId, ColorId, CurrencyId, EventId, MallId, ProductId, SizeId, index_by_id,
};

use super::{CatalogSource, PriceBounds, ProductPage, SourceError};
use crate::query::CatalogQuery;

/// One [`CatalogSource`] read, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    ActiveEvents,
    Availability,
    Products,
    Colors,
    Sizes,
    PriceBounds,
    Categories,
    Malls,
    Boutiques,
    Currencies,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::ActiveEvents => "active_events",
            QueryKind::Availability => "availability",
            QueryKind::Products => "products",
            QueryKind::Colors => "colors",
            QueryKind::Sizes => "sizes",
            QueryKind::PriceBounds => "price_bounds",
            QueryKind::Categories => "categories",
            QueryKind::Malls => "malls",
            QueryKind::Boutiques => "boutiques",
            QueryKind::Currencies => "currencies",
        }
    }
}

/// Serializable snapshot used to populate an [`InMemoryCatalog`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    pub events: Vec<Event>,
    pub availability: Vec<AvailabilityRecord>,
    pub products: Vec<Product>,
    pub colors: Vec<Color>,
    pub sizes: Vec<Size>,
    pub categories: Vec<Category>,
    pub malls: Vec<Mall>,
    pub boutiques: Vec<Boutique>,
    pub currencies: Vec<Currency>,
}

impl CatalogSeed {
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        serde_json::from_str(json).map_err(|e| SourceError::decode("catalog seed", e))
    }
}

#[derive(Debug, Default)]
struct CatalogData {
    events: BTreeMap<EventId, Event>,
    availability: Vec<AvailabilityRecord>,
    products: BTreeMap<ProductId, Product>,
    colors: BTreeMap<ColorId, Color>,
    sizes: BTreeMap<SizeId, Size>,
    categories: BTreeMap<CategoryId, Category>,
    malls: BTreeMap<MallId, Mall>,
    boutiques: BTreeMap<BoutiqueId, Boutique>,
    currencies: BTreeMap<CurrencyId, Currency>,
}

impl CatalogData {
    /// Approved variants of listed products in `universe`.
    fn sellable_variants<'a>(&'a self, universe: &'a [ProductId]) -> impl Iterator<Item = &'a Variant> + 'a {
        universe
            .iter()
            .filter_map(|id| self.products.get(id))
            .filter(|p| p.is_listed())
            .flat_map(|p| p.variants.iter())
            .filter(|v| v.status.is_approved())
    }
}

/// In-memory catalog.
///
/// Intended for tests/dev. Reads can be made to fail per [`QueryKind`], and
/// every read is counted, so callers can assert which stages ran.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    data: RwLock<CatalogData>,
    failures: RwLock<HashMap<QueryKind, String>>,
    calls: RwLock<HashMap<QueryKind, usize>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        let data = CatalogData {
            events: index_by_id(seed.events),
            availability: seed.availability,
            products: index_by_id(seed.products),
            colors: index_by_id(seed.colors),
            sizes: index_by_id(seed.sizes),
            categories: index_by_id(seed.categories),
            malls: index_by_id(seed.malls),
            boutiques: index_by_id(seed.boutiques),
            currencies: index_by_id(seed.currencies),
        };
        Self {
            data: RwLock::new(data),
            ..Self::default()
        }
    }

    /// Make every subsequent `kind` read fail with `message`.
    pub fn fail(&self, kind: QueryKind, message: impl Into<String>) {
        if let Ok(mut failures) = self.failures.write() {
            failures.insert(kind, message.into());
        }
    }

    pub fn recover(&self, kind: QueryKind) {
        if let Ok(mut failures) = self.failures.write() {
            failures.remove(&kind);
        }
    }

    /// Number of `kind` reads attempted so far, failed ones included.
    pub fn calls(&self, kind: QueryKind) -> usize {
        self.calls
            .read()
            .map(|calls| calls.get(&kind).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn upsert_event(&self, event: Event) -> Result<(), SourceError> {
        self.write(|data| {
            data.events.insert(event.id, event);
        })
    }

    pub fn upsert_product(&self, product: Product) -> Result<(), SourceError> {
        self.write(|data| {
            data.products.insert(product.id, product);
        })
    }

    pub fn add_availability(&self, record: AvailabilityRecord) -> Result<(), SourceError> {
        self.write(|data| data.availability.push(record))
    }

    pub fn upsert_currency(&self, currency: Currency) -> Result<(), SourceError> {
        self.write(|data| {
            data.currencies.insert(currency.id, currency);
        })
    }

    fn write(&self, f: impl FnOnce(&mut CatalogData)) -> Result<(), SourceError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| SourceError::Unavailable("lock poisoned".to_string()))?;
        f(&mut data);
        Ok(())
    }

    /// Count the call, apply injected failures, then run `f` under the read lock.
    fn read<T>(&self, kind: QueryKind, f: impl FnOnce(&CatalogData) -> T) -> Result<T, SourceError> {
        if let Ok(mut calls) = self.calls.write() {
            *calls.entry(kind).or_default() += 1;
        }

        let failure = self
            .failures
            .read()
            .map_err(|_| SourceError::Unavailable("lock poisoned".to_string()))?
            .get(&kind)
            .cloned();
        if let Some(message) = failure {
            return Err(SourceError::query(kind.as_str(), message));
        }

        let data = self
            .data
            .read()
            .map_err(|_| SourceError::Unavailable("lock poisoned".to_string()))?;
        Ok(f(&data))
    }
}

#[async_trait::async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn active_events(&self, today: NaiveDate) -> Result<Vec<Event>, SourceError> {
        self.read(QueryKind::ActiveEvents, |data| {
            let mut events: Vec<Event> = data
                .events
                .values()
                .filter(|e| e.is_active_on(today))
                .cloned()
                .collect();
            events.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
            events
        })
    }

    async fn availability(
        &self,
        event_id: EventId,
        scope: Scope,
    ) -> Result<Vec<AvailabilityRecord>, SourceError> {
        self.read(QueryKind::Availability, |data| {
            data.availability
                .iter()
                .filter(|r| r.event_id == event_id && scope.admits(r))
                .copied()
                .collect()
        })
    }

    async fn products(&self, query: &CatalogQuery) -> Result<ProductPage, SourceError> {
        self.read(QueryKind::Products, |data| {
            let (products, total_count) = query.evaluate(data.products.values(), &data.availability);
            ProductPage {
                products,
                total_count,
            }
        })
    }

    async fn colors(&self, universe: &[ProductId]) -> Result<Vec<Color>, SourceError> {
        self.read(QueryKind::Colors, |data| {
            let used: BTreeSet<ColorId> = data
                .sellable_variants(universe)
                .filter_map(|v| v.color_id)
                .collect();
            used.iter().filter_map(|id| data.colors.get(id)).cloned().collect()
        })
    }

    async fn sizes(&self, universe: &[ProductId]) -> Result<Vec<Size>, SourceError> {
        self.read(QueryKind::Sizes, |data| {
            let used: BTreeSet<SizeId> = data
                .sellable_variants(universe)
                .filter_map(|v| v.size_id)
                .collect();
            used.iter().filter_map(|id| data.sizes.get(id)).cloned().collect()
        })
    }

    async fn price_bounds(&self, universe: &[ProductId]) -> Result<Option<PriceBounds>, SourceError> {
        self.read(QueryKind::PriceBounds, |data| {
            data.sellable_variants(universe)
                .map(Variant::effective_price_in_pivot)
                .fold(None, |acc: Option<PriceBounds>, price| {
                    Some(match acc {
                        None => PriceBounds {
                            min: price,
                            max: price,
                        },
                        Some(b) => PriceBounds {
                            min: b.min.min(price),
                            max: b.max.max(price),
                        },
                    })
                })
        })
    }

    async fn categories(&self, universe: &[ProductId]) -> Result<Vec<Category>, SourceError> {
        self.read(QueryKind::Categories, |data| {
            let used: BTreeMap<CategoryId, Category> = universe
                .iter()
                .filter_map(|id| data.products.get(id))
                .filter(|p| p.is_listed())
                .filter_map(|p| p.category.clone())
                .map(|c| (c.id, c))
                .collect();
            used.into_values().collect()
        })
    }

    async fn malls(&self, event_id: EventId) -> Result<Vec<Mall>, SourceError> {
        self.read(QueryKind::Malls, |data| {
            let used: BTreeSet<MallId> = data
                .availability
                .iter()
                .filter(|r| r.event_id == event_id)
                .filter_map(|r| r.mall_id)
                .collect();
            used.iter().filter_map(|id| data.malls.get(id)).cloned().collect()
        })
    }

    async fn boutiques(
        &self,
        event_id: EventId,
        mall_id: Option<MallId>,
    ) -> Result<Vec<Boutique>, SourceError> {
        self.read(QueryKind::Boutiques, |data| {
            let scope = Scope::new(mall_id, None);
            let used: BTreeSet<BoutiqueId> = data
                .availability
                .iter()
                .filter(|r| r.event_id == event_id && scope.admits(r))
                .filter_map(|r| r.boutique_id)
                .collect();
            used.iter().filter_map(|id| data.boutiques.get(id)).cloned().collect()
        })
    }

    async fn currencies(&self) -> Result<Vec<Currency>, SourceError> {
        self.read(QueryKind::Currencies, |data| data.currencies.values().cloned().collect())
    }
}
