use chrono::NaiveDate;
use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};

use vitrine_catalog::{
    Boutique, CatalogFilter, Category, Color, Currency, Event, Mall, ProductUniverse, Scope, Size,
    VariantFilter, resolve_active_event,
};
use vitrine_core::EventId;

use super::outcome::{CatalogPage, EmptyReason, FetchId, FetchOutcome};
use crate::query::CatalogQueryBuilder;
use crate::source::{CatalogSource, PriceBounds, SourceError};

/// Unwrap `Ready`, or return the `Empty`/`Failed` outcome from the enclosing fn.
macro_rules! ready_or_return {
    ($outcome:expr) => {
        match $outcome {
            FetchOutcome::Ready(value) => value,
            FetchOutcome::Empty(reason) => return FetchOutcome::Empty(reason),
            FetchOutcome::Failed(reason) => return FetchOutcome::Failed(reason),
        }
    };
}

/// Log a source failure and absorb it.
fn absorb<T>(stage: &'static str, result: Result<T, SourceError>) -> FetchOutcome<T> {
    match result {
        Ok(value) => FetchOutcome::Ready(value),
        Err(err) => {
            error!(stage, error = %err, "catalog stage failed");
            FetchOutcome::Failed(err.to_string())
        }
    }
}

/// Filter facets for one event and scope. Each facet degrades independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub event_id: EventId,
    pub colors: FetchOutcome<Vec<Color>>,
    pub sizes: FetchOutcome<Vec<Size>>,
    pub price_bounds: FetchOutcome<PriceBounds>,
    pub malls: FetchOutcome<Vec<Mall>>,
    pub boutiques: FetchOutcome<Vec<Boutique>>,
    pub categories: FetchOutcome<Vec<Category>>,
}

impl FilterOptions {
    /// No facet failed.
    pub fn is_complete(&self) -> bool {
        !(self.colors.is_failed()
            || self.sizes.is_failed()
            || self.price_bounds.is_failed()
            || self.malls.is_failed()
            || self.boutiques.is_failed()
            || self.categories.is_failed())
    }
}

/// Shop catalog pipeline: active event, availability, product query, variant
/// post-filter.
///
/// Never returns `Err`; every stage outcome is a [`FetchOutcome`].
#[derive(Debug, Clone)]
pub struct CatalogService<S> {
    source: S,
    page_size: u32,
}

impl<S> CatalogService<S>
where
    S: CatalogSource,
{
    pub fn new(source: S, page_size: u32) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The event whose window contains `today`, most recently started first.
    pub async fn resolve_event(&self, today: NaiveDate) -> FetchOutcome<Event> {
        let events = ready_or_return!(absorb("active_event", self.source.active_events(today).await));

        match resolve_active_event(&events, today) {
            None => {
                info!(%today, "no active event");
                FetchOutcome::Empty(EmptyReason::NoActiveEvent)
            }
            Some(active) => {
                if !active.overlapping.is_empty() {
                    warn!(
                        event_id = %active.event.id,
                        overlapping = ?active.overlapping,
                        "overlapping active events, using the most recently started"
                    );
                }
                debug!(event_id = %active.event.id, "active event resolved");
                FetchOutcome::Ready(active.event)
            }
        }
    }

    /// Distinct products offered by `event_id` under `scope`.
    pub async fn product_universe(&self, event_id: EventId, scope: Scope) -> FetchOutcome<ProductUniverse> {
        let records = ready_or_return!(absorb(
            "availability",
            self.source.availability(event_id, scope).await
        ));

        let universe = ProductUniverse::collect(event_id, &scope, &records);
        if universe.is_empty() {
            info!(%event_id, "no products available for event and scope");
            return FetchOutcome::Empty(EmptyReason::NoAvailability);
        }
        debug!(%event_id, products = universe.len(), "product universe collected");
        FetchOutcome::Ready(universe)
    }

    /// Fetch one 1-based page for `filter`. Page 0 is treated as page 1.
    ///
    /// Short-circuits without querying products when no event is active or the
    /// availability universe is empty.
    pub async fn fetch_page(
        &self,
        filter: &CatalogFilter,
        page: u32,
        today: NaiveDate,
    ) -> FetchOutcome<CatalogPage> {
        let fetch_id = FetchId::new();
        let span = info_span!(
            "catalog_fetch",
            %fetch_id,
            page = page.max(1),
            sort = filter.sort.as_str()
        );
        self.run_fetch(filter, page.max(1), today).instrument(span).await
    }

    async fn run_fetch(
        &self,
        filter: &CatalogFilter,
        page: u32,
        today: NaiveDate,
    ) -> FetchOutcome<CatalogPage> {
        let event = ready_or_return!(self.resolve_event(today).await);
        let universe = ready_or_return!(self.product_universe(event.id, filter.scope()).await);

        let query = CatalogQueryBuilder::from_filter(&universe, filter, page, self.page_size).build();
        let result = ready_or_return!(absorb("products", self.source.products(&query).await));

        if result.total_count == 0 {
            info!("no products match filter");
            return FetchOutcome::Empty(EmptyReason::NoMatches);
        }

        let fetched = result.products.len();
        let products = VariantFilter::from(filter).apply(result.products);
        if products.len() < fetched {
            debug!(
                dropped = fetched - products.len(),
                "products without a matching variant dropped"
            );
        }

        info!(
            total_count = result.total_count,
            returned = products.len(),
            "catalog page fetched"
        );
        FetchOutcome::Ready(CatalogPage::new(
            products,
            result.total_count,
            !filter.has_variant_filters(),
            page,
            self.page_size,
        ))
    }

    /// Resolve the event and universe once, then query every facet concurrently.
    pub async fn filter_options(&self, scope: Scope, today: NaiveDate) -> FetchOutcome<FilterOptions> {
        let event = ready_or_return!(self.resolve_event(today).await);
        let universe = match self.product_universe(event.id, scope).await {
            FetchOutcome::Ready(universe) => universe.ids(),
            FetchOutcome::Empty(_) => Vec::new(),
            FetchOutcome::Failed(reason) => return FetchOutcome::Failed(reason),
        };

        let (colors, sizes, price_bounds, malls, boutiques, categories) = tokio::join!(
            self.source.colors(&universe),
            self.source.sizes(&universe),
            self.source.price_bounds(&universe),
            self.source.malls(event.id),
            self.source.boutiques(event.id, scope.mall_id),
            self.source.categories(&universe),
        );

        let price_bounds = match absorb("price_bounds", price_bounds) {
            FetchOutcome::Ready(Some(bounds)) => FetchOutcome::Ready(bounds),
            FetchOutcome::Ready(None) => FetchOutcome::Empty(EmptyReason::NoMatches),
            FetchOutcome::Empty(reason) => FetchOutcome::Empty(reason),
            FetchOutcome::Failed(reason) => FetchOutcome::Failed(reason),
        };

        FetchOutcome::Ready(FilterOptions {
            event_id: event.id,
            colors: absorb("colors", colors),
            sizes: absorb("sizes", sizes),
            price_bounds,
            malls: absorb("malls", malls),
            boutiques: absorb("boutiques", boutiques),
            categories: absorb("categories", categories),
        })
    }

    /// All configured currencies, id order.
    pub async fn currencies(&self) -> FetchOutcome<Vec<Currency>> {
        absorb("currencies", self.source.currencies().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use vitrine_catalog::{ApprovalStatus, AvailabilityRecord, Product, Variant};
    use vitrine_core::{CategoryId, ColorId, CurrencyId, MallId, ProductId, SizeId, VariantId};

    use crate::source::{CatalogSeed, InMemoryCatalog, QueryKind};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn variant(id: i64, product: i64, color: i64, price: f64) -> Variant {
        Variant {
            id: VariantId::new(id),
            product_id: ProductId::new(product),
            color_id: Some(ColorId::new(color)),
            size_id: Some(SizeId::new(1)),
            currency: None,
            catalog_price: price,
            promotion_price: None,
            status: ApprovalStatus::Approved,
            media: vec![],
        }
    }

    fn product(id: i64, variants: Vec<Variant>) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            description: String::new(),
            category: None,
            design: None,
            status: ApprovalStatus::Approved,
            is_visible: true,
            variants,
        }
    }

    fn available(event: i64, product: i64, mall: Option<i64>) -> AvailabilityRecord {
        AvailabilityRecord {
            event_id: EventId::new(event),
            product_id: ProductId::new(product),
            mall_id: mall.map(MallId::new),
            boutique_id: None,
        }
    }

    /// Event 1 (January) offering `count` products, each with one color-1 variant.
    fn catalog(count: i64) -> Arc<InMemoryCatalog> {
        let seed = CatalogSeed {
            events: vec![Event::new(EventId::new(1), date(1, 1), date(1, 31)).unwrap()],
            availability: (1..=count).map(|id| available(1, id, None)).collect(),
            products: (1..=count)
                .map(|id| product(id, vec![variant(id * 10, id, 1, 10.0 * id as f64)]))
                .collect(),
            ..Default::default()
        };
        Arc::new(InMemoryCatalog::from_seed(seed))
    }

    fn service(source: &Arc<InMemoryCatalog>) -> CatalogService<Arc<InMemoryCatalog>> {
        CatalogService::new(Arc::clone(source), 12)
    }

    #[tokio::test]
    async fn no_active_event_short_circuits_to_empty() {
        let source = catalog(3);
        let outcome = service(&source)
            .fetch_page(&CatalogFilter::default(), 1, date(2, 15))
            .await;

        assert_eq!(outcome, FetchOutcome::Empty(EmptyReason::NoActiveEvent));
        assert_eq!(source.calls(QueryKind::Availability), 0);
        assert_eq!(source.calls(QueryKind::Products), 0);
    }

    #[tokio::test]
    async fn empty_universe_never_queries_products() {
        let source = Arc::new(InMemoryCatalog::from_seed(CatalogSeed {
            events: vec![Event::new(EventId::new(1), date(1, 1), date(1, 31)).unwrap()],
            products: vec![product(1, vec![variant(1, 1, 1, 10.0)])],
            ..Default::default()
        }));

        let outcome = service(&source)
            .fetch_page(&CatalogFilter::default(), 1, date(1, 10))
            .await;

        assert_eq!(outcome, FetchOutcome::Empty(EmptyReason::NoAvailability));
        assert_eq!(outcome.into_page(1, 12).total_count, 0);
        assert_eq!(source.calls(QueryKind::Products), 0);
    }

    #[tokio::test]
    async fn pages_are_newest_first_with_total_count() {
        let source = catalog(25);
        let svc = service(&source);

        let first = svc
            .fetch_page(&CatalogFilter::default(), 1, date(1, 10))
            .await
            .into_ready()
            .unwrap();
        assert_eq!(first.total_count, 25);
        assert_eq!(first.products.len(), 12);
        assert_eq!(first.products[0].id, ProductId::new(25));
        assert_eq!(first.next_page, Some(2));
        assert!(first.count_is_exact);

        let last = svc
            .fetch_page(&CatalogFilter::default(), 3, date(1, 10))
            .await
            .into_ready()
            .unwrap();
        assert_eq!(last.products.len(), 1);
        assert!(!last.has_next_page);
    }

    #[tokio::test]
    async fn variant_filters_drop_products_and_flag_the_count() {
        let source = catalog(2);
        source
            .upsert_product(product(3, vec![variant(30, 3, 2, 30.0)]))
            .unwrap();
        source.add_availability(available(1, 3, None)).unwrap();

        let filter = CatalogFilter {
            color_id: Some(ColorId::new(2)),
            ..Default::default()
        };
        let page = service(&source)
            .fetch_page(&filter, 1, date(1, 10))
            .await
            .into_ready()
            .unwrap();

        let ids: Vec<_> = page.products.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![3]);
        // counted before the variant pass
        assert_eq!(page.total_count, 3);
        assert!(!page.count_is_exact);
    }

    #[tokio::test]
    async fn no_matching_products_is_empty_not_failed() {
        let source = catalog(2);
        let filter = CatalogFilter {
            category_id: Some(CategoryId::new(99)),
            ..Default::default()
        };
        let outcome = service(&source).fetch_page(&filter, 1, date(1, 10)).await;
        assert_eq!(outcome, FetchOutcome::Empty(EmptyReason::NoMatches));
    }

    #[tokio::test]
    async fn source_failure_is_absorbed_into_failed() {
        let source = catalog(2);
        source.fail(QueryKind::Products, "connection reset");

        let outcome = service(&source)
            .fetch_page(&CatalogFilter::default(), 1, date(1, 10))
            .await;

        assert!(outcome.is_failed());
        assert_eq!(outcome.status(), "failed");
        assert_eq!(outcome.into_page(1, 12), CatalogPage::empty(1, 12));
    }

    #[tokio::test]
    async fn scope_narrows_the_universe() {
        let source = catalog(0);
        for (id, mall) in [(1, 1), (2, 2), (3, 1)] {
            source
                .upsert_product(product(id, vec![variant(id * 10, id, 1, 10.0)]))
                .unwrap();
            source.add_availability(available(1, id, Some(mall))).unwrap();
        }

        let filter = CatalogFilter {
            mall_id: Some(MallId::new(1)),
            ..Default::default()
        };
        let page = service(&source)
            .fetch_page(&filter, 1, date(1, 10))
            .await
            .into_ready()
            .unwrap();
        let ids: Vec<_> = page.products.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn overlapping_events_use_the_latest_start() {
        let source = catalog(1);
        source
            .upsert_event(Event::new(EventId::new(2), date(1, 10), date(1, 20)).unwrap())
            .unwrap();

        let event = service(&source).resolve_event(date(1, 15)).await;
        assert_eq!(event.into_ready().map(|e| e.id), Some(EventId::new(2)));
    }

    #[tokio::test]
    async fn filter_options_degrade_per_facet() {
        let source = catalog(3);
        source.fail(QueryKind::Sizes, "timeout");

        let options = service(&source)
            .filter_options(Scope::default(), date(1, 10))
            .await
            .into_ready()
            .unwrap();

        assert!(options.sizes.is_failed());
        assert!(!options.is_complete());
        assert_eq!(options.colors.ready().map(Vec::len), Some(0));
        assert_eq!(
            options.price_bounds,
            FetchOutcome::Ready(PriceBounds { min: 10.0, max: 30.0 })
        );
        assert_eq!(options.event_id, EventId::new(1));
    }

    #[tokio::test]
    async fn filter_options_without_sellable_variants_have_empty_price_bounds() {
        let source = Arc::new(InMemoryCatalog::from_seed(CatalogSeed {
            events: vec![Event::new(EventId::new(1), date(1, 1), date(1, 31)).unwrap()],
            ..Default::default()
        }));

        let options = service(&source)
            .filter_options(Scope::default(), date(1, 10))
            .await
            .into_ready()
            .unwrap();
        assert_eq!(options.price_bounds, FetchOutcome::Empty(EmptyReason::NoMatches));
        assert!(options.is_complete());
    }

    #[tokio::test]
    async fn currencies_pass_through() {
        let source = catalog(0);
        source
            .upsert_currency(Currency {
                id: CurrencyId::new(1),
                code: "EUR".to_string(),
                exchange_rate: 1.0,
                is_pivot: true,
                decimal_places: 2,
            })
            .unwrap();

        let currencies = service(&source).currencies().await.into_ready().unwrap();
        assert_eq!(currencies[0].code, "EUR");
    }
}
