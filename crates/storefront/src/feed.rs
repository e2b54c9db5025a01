//! Infinite-scroll aggregator.
//!
//! Pages of one filter are merged in fetch order. Any filter change bumps the
//! generation, drops every page and restarts at page 1; responses carrying an
//! older generation (or a page that is no longer awaited) are rejected, so a
//! late answer can never clobber the current listing.

use tracing::debug;

use vitrine_catalog::{CatalogFilter, Product};
use vitrine_infra::pipeline::{CatalogPage, EmptyReason, FetchOutcome, has_next_page};

use crate::config::FeedConfig;
use crate::scroll::ScrollMetrics;

/// One page the caller should fetch and hand back to [`InfiniteCatalog::receive`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub generation: u64,
    pub filter: CatalogFilter,
    pub page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    Applied,
    /// Superseded by a filter change or never requested; ignored.
    Stale,
}

#[derive(Debug, Clone)]
pub struct InfiniteCatalog {
    config: FeedConfig,
    filter: CatalogFilter,
    generation: u64,
    pages: Vec<CatalogPage>,
    /// Previous listing, shown while the first page of a new filter loads.
    placeholder: Vec<CatalogPage>,
    in_flight: Option<FetchRequest>,
    empty: Option<EmptyReason>,
    error: Option<String>,
    /// A later page came back empty; stop asking for more.
    exhausted: bool,
}

impl InfiniteCatalog {
    pub fn new(config: FeedConfig, filter: CatalogFilter) -> Self {
        Self {
            config,
            filter,
            generation: 0,
            pages: Vec::new(),
            placeholder: Vec::new(),
            in_flight: None,
            empty: None,
            error: None,
            exhausted: false,
        }
    }

    pub fn filter(&self) -> &CatalogFilter {
        &self.filter
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Request page 1 if nothing is loaded or loading.
    pub fn start(&mut self) -> Option<FetchRequest> {
        if !self.pages.is_empty() || self.in_flight.is_some() {
            return None;
        }
        Some(self.request(1))
    }

    /// Replace the filter. A different listing resets the feed and requests page 1.
    pub fn set_filter(&mut self, filter: CatalogFilter) -> Option<FetchRequest> {
        if self.filter.same_listing(&filter) {
            self.filter = filter;
            return None;
        }

        self.generation += 1;
        self.filter = filter;
        if !self.pages.is_empty() {
            self.placeholder = std::mem::take(&mut self.pages);
        }
        self.in_flight = None;
        self.empty = None;
        self.error = None;
        self.exhausted = false;
        debug!(generation = self.generation, "filter changed, feed reset");

        Some(self.request(1))
    }

    /// Scroll heuristic: near the bottom, nothing in flight, and a next page exists.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> Option<FetchRequest> {
        if !metrics.near_bottom(self.config.threshold_px) {
            return None;
        }
        self.fetch_next()
    }

    /// Request the next page regardless of scroll position.
    pub fn fetch_next(&mut self) -> Option<FetchRequest> {
        if self.in_flight.is_some() || !self.has_next_page() {
            return None;
        }
        let next = self.pages.len() as u32 + 1;
        Some(self.request(next))
    }

    /// Apply the outcome of `request`, unless it has been superseded.
    pub fn receive(&mut self, request: &FetchRequest, outcome: FetchOutcome<CatalogPage>) -> Receipt {
        if self.in_flight.as_ref() != Some(request) {
            debug!(
                generation = request.generation,
                current = self.generation,
                page = request.page,
                "stale catalog response ignored"
            );
            return Receipt::Stale;
        }
        self.in_flight = None;
        self.placeholder.clear();

        match outcome {
            FetchOutcome::Ready(page) => {
                self.error = None;
                self.pages.push(page);
            }
            FetchOutcome::Empty(reason) => {
                if request.page == 1 {
                    self.empty = Some(reason);
                } else {
                    self.exhausted = true;
                }
            }
            FetchOutcome::Failed(reason) => {
                self.error = Some(reason);
            }
        }
        Receipt::Applied
    }

    /// Every loaded product, in fetch order. Not de-duplicated.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.pages.iter().flat_map(|p| p.products.iter())
    }

    /// Products to render: the previous listing while the first page of a new
    /// filter is loading, otherwise [`Self::products`].
    pub fn visible_products(&self) -> impl Iterator<Item = &Product> {
        let source = if self.pages.is_empty() && self.in_flight.is_some() {
            &self.placeholder
        } else {
            &self.pages
        };
        source.iter().flat_map(|p| p.products.iter())
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages.len()
    }

    /// Total count reported by the first page.
    pub fn total_count(&self) -> u64 {
        self.pages.first().map(|p| p.total_count).unwrap_or(0)
    }

    pub fn count_is_exact(&self) -> bool {
        self.pages.first().is_none_or(|p| p.count_is_exact)
    }

    /// `pages_loaded * page_size < total_count`, with the first page's size and count.
    pub fn has_next_page(&self) -> bool {
        match self.pages.first() {
            Some(first) if !self.exhausted => {
                has_next_page(self.pages.len() as u32, first.page_size, first.total_count)
            }
            _ => false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<&FetchRequest> {
        self.in_flight.as_ref()
    }

    pub fn empty_reason(&self) -> Option<EmptyReason> {
        self.empty
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn request(&mut self, page: u32) -> FetchRequest {
        let request = FetchRequest {
            generation: self.generation,
            filter: self.filter.clone(),
            page,
        };
        self.in_flight = Some(request.clone());
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_catalog::ApprovalStatus;
    use vitrine_core::{CategoryId, ProductId};

    fn product(id: i64) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("P{id}"),
            description: String::new(),
            category: None,
            design: None,
            status: ApprovalStatus::Approved,
            is_visible: true,
            variants: vec![],
        }
    }

    /// Page `page` of a newest-first listing of `total` products.
    fn page_of(total: u64, page: u32) -> FetchOutcome<CatalogPage> {
        let size = 12u64;
        let start = (u64::from(page) - 1) * size;
        let products = (start..(start + size).min(total))
            .map(|i| product((total - i) as i64))
            .collect();
        FetchOutcome::Ready(CatalogPage::new(products, total, true, page, 12))
    }

    fn near_bottom() -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 2500.0,
            viewport_height: 800.0,
            content_height: 3000.0,
        }
    }

    fn far_from_bottom() -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 0.0,
            viewport_height: 800.0,
            content_height: 5000.0,
        }
    }

    fn feed() -> InfiniteCatalog {
        InfiniteCatalog::new(FeedConfig::default(), CatalogFilter::default())
    }

    #[test]
    fn pagination_stops_after_the_last_page() {
        let mut feed = feed();

        let req = feed.start().unwrap();
        assert_eq!(feed.receive(&req, page_of(25, 1)), Receipt::Applied);
        assert!(feed.has_next_page());

        let req = feed.on_scroll(near_bottom()).unwrap();
        assert_eq!(req.page, 2);
        feed.receive(&req, page_of(25, 2));
        assert!(feed.has_next_page());

        let req = feed.on_scroll(near_bottom()).unwrap();
        assert_eq!(req.page, 3);
        feed.receive(&req, page_of(25, 3));
        assert!(!feed.has_next_page());
        assert!(feed.on_scroll(near_bottom()).is_none());

        assert_eq!(feed.products().count(), 25);
        assert_eq!(feed.total_count(), 25);
    }

    #[test]
    fn page_size_is_taken_from_the_received_pages() {
        let sized = |page: u32| {
            let products = (0..5).map(|i| product(i64::from(page) * 10 + i)).collect();
            FetchOutcome::Ready(CatalogPage::new(products, 12, true, page, 5))
        };
        let mut feed = feed();

        let req = feed.start().unwrap();
        feed.receive(&req, sized(1));
        assert!(feed.has_next_page());

        let req = feed.fetch_next().unwrap();
        feed.receive(&req, sized(2));
        assert!(feed.has_next_page());

        let req = feed.fetch_next().unwrap();
        assert_eq!(req.page, 3);
        feed.receive(&req, sized(3));
        assert!(!feed.has_next_page());
        assert!(feed.fetch_next().is_none());
    }

    #[test]
    fn scroll_waits_for_threshold_and_in_flight_fetch() {
        let mut feed = feed();
        let first = feed.start().unwrap();
        assert!(feed.start().is_none());
        // page 1 still in flight
        assert!(feed.on_scroll(near_bottom()).is_none());

        feed.receive(&first, page_of(25, 1));
        assert!(feed.on_scroll(far_from_bottom()).is_none());

        let second = feed.on_scroll(near_bottom()).unwrap();
        assert!(feed.is_loading());
        assert!(feed.on_scroll(near_bottom()).is_none());
        assert_eq!(feed.in_flight(), Some(&second));
    }

    #[test]
    fn filter_change_on_page_three_restarts_at_page_one() {
        let mut feed = feed();
        for page in 1..=3 {
            let req = feed.fetch_next().or_else(|| feed.start()).unwrap();
            assert_eq!(req.page, page);
            feed.receive(&req, page_of(40, page));
        }
        assert_eq!(feed.pages_loaded(), 3);

        let req = feed
            .set_filter(CatalogFilter {
                category_id: Some(CategoryId::new(7)),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(req.page, 1);
        assert_eq!(req.generation, 1);
        assert_eq!(req.filter.category_id, Some(CategoryId::new(7)));
        assert_eq!(feed.pages_loaded(), 0);
        assert_eq!(feed.products().count(), 0);
        // previous listing stays visible until the new page lands
        assert_eq!(feed.visible_products().count(), 36);

        feed.receive(&req, page_of(5, 1));
        assert_eq!(feed.visible_products().count(), 5);
        assert!(!feed.has_next_page());
    }

    #[test]
    fn late_response_from_previous_filter_is_rejected() {
        let mut feed = feed();
        let first = feed.start().unwrap();
        feed.receive(&first, page_of(40, 1));
        let old = feed.fetch_next().unwrap();

        let new = feed
            .set_filter(CatalogFilter {
                search: Some("linen".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(feed.receive(&old, page_of(40, 2)), Receipt::Stale);
        assert!(feed.is_loading());
        assert_eq!(feed.receive(&new, page_of(3, 1)), Receipt::Applied);
        assert_eq!(feed.total_count(), 3);
        // delivering the same response twice is also stale
        assert_eq!(feed.receive(&new, page_of(3, 1)), Receipt::Stale);
    }

    #[test]
    fn equivalent_filter_does_not_reset() {
        let mut feed = feed();
        let req = feed.start().unwrap();
        feed.receive(&req, page_of(25, 1));

        let same = CatalogFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(feed.set_filter(same).is_none());
        assert_eq!(feed.pages_loaded(), 1);
        assert_eq!(feed.generation(), 0);
    }

    #[test]
    fn empty_and_failed_outcomes_are_surfaced() {
        let mut feed = feed();
        let req = feed.start().unwrap();
        feed.receive(&req, FetchOutcome::Empty(EmptyReason::NoActiveEvent));
        assert_eq!(feed.empty_reason(), Some(EmptyReason::NoActiveEvent));
        assert!(!feed.has_next_page());

        let req = feed
            .set_filter(CatalogFilter {
                category_id: Some(CategoryId::new(1)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(feed.empty_reason(), None);
        feed.receive(&req, FetchOutcome::Failed("timeout".to_string()));
        assert_eq!(feed.error(), Some("timeout"));
        assert!(!feed.is_loading());
        // a failed first page can be retried
        assert!(feed.start().is_some());
    }

    #[test]
    fn empty_later_page_ends_the_feed() {
        let mut feed = feed();
        let req = feed.start().unwrap();
        feed.receive(&req, page_of(25, 1));
        let req = feed.fetch_next().unwrap();
        feed.receive(&req, FetchOutcome::Empty(EmptyReason::NoMatches));

        assert!(!feed.has_next_page());
        assert_eq!(feed.products().count(), 12);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                .. ProptestConfig::default()
            })]

            /// Property: scrolling to the end loads exactly ceil(total / 12) pages
            /// and every product once.
            #[test]
            fn scrolling_loads_every_page_once(total in 1u64..200) {
                let mut feed = feed();
                let mut req = feed.start();
                while let Some(r) = req {
                    let page = r.page;
                    prop_assert_eq!(feed.receive(&r, page_of(total, page)), Receipt::Applied);
                    req = feed.on_scroll(near_bottom());
                }

                prop_assert_eq!(feed.pages_loaded() as u64, total.div_ceil(12));
                prop_assert_eq!(feed.products().count() as u64, total);
                prop_assert!(!feed.has_next_page());
            }
        }
    }
}
