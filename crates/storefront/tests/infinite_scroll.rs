//! Drives the aggregator against the real pipeline over an in-memory catalog.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;

use vitrine_catalog::{ApprovalStatus, AvailabilityRecord, CatalogFilter, Category, Event, Product, Variant};
use vitrine_core::{CategoryId, ColorId, EventId, ProductId, SizeId, VariantId};
use vitrine_infra::source::{CatalogSeed, InMemoryCatalog};
use vitrine_infra::CatalogService;
use vitrine_storefront::{FeedConfig, InfiniteCatalog, Receipt, ScrollMetrics};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn seed() -> CatalogSeed {
    let products = (1..=25)
        .map(|id| Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            description: String::new(),
            category: Some(Category {
                id: CategoryId::new(if id % 5 == 0 { 2 } else { 1 }),
                name: "Any".to_string(),
            }),
            design: None,
            status: ApprovalStatus::Approved,
            is_visible: true,
            variants: vec![Variant {
                id: VariantId::new(id * 10),
                product_id: ProductId::new(id),
                color_id: Some(ColorId::new(1)),
                size_id: Some(SizeId::new(1)),
                currency: None,
                catalog_price: 10.0,
                promotion_price: None,
                status: ApprovalStatus::Approved,
                media: vec![],
            }],
        })
        .collect();

    CatalogSeed {
        events: vec![Event::new(
            EventId::new(1),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        )
        .unwrap()],
        availability: (1..=25)
            .map(|id| AvailabilityRecord {
                event_id: EventId::new(1),
                product_id: ProductId::new(id),
                mall_id: None,
                boutique_id: None,
            })
            .collect(),
        products,
        ..Default::default()
    }
}

fn bottom() -> ScrollMetrics {
    ScrollMetrics {
        scroll_top: 1000.0,
        viewport_height: 900.0,
        content_height: 2000.0,
    }
}

#[tokio::test]
async fn scrolling_collects_the_whole_catalog_in_order() {
    let service = CatalogService::new(Arc::new(InMemoryCatalog::from_seed(seed())), 12);
    let mut feed = InfiniteCatalog::new(FeedConfig::default(), CatalogFilter::default());

    let mut next = feed.start();
    while let Some(request) = next {
        let outcome = service.fetch_page(&request.filter, request.page, today()).await;
        assert_eq!(feed.receive(&request, outcome), Receipt::Applied);
        next = feed.on_scroll(bottom());
    }

    let ids: Vec<i64> = feed.products().map(|p| p.id.get()).collect();
    assert_eq!(ids.len(), 25);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 25);
    assert_eq!(ids.first(), Some(&25));
    assert_eq!(ids.last(), Some(&1));
    assert_eq!(feed.pages_loaded(), 3);
}

#[tokio::test]
async fn category_change_mid_scroll_restarts_with_new_results() {
    let service = CatalogService::new(Arc::new(InMemoryCatalog::from_seed(seed())), 12);
    let mut feed = InfiniteCatalog::new(FeedConfig::default(), CatalogFilter::default());

    let first = feed.start().unwrap();
    let outcome = service.fetch_page(&first.filter, first.page, today()).await;
    feed.receive(&first, outcome);
    let pending = feed.on_scroll(bottom()).unwrap();

    let restarted = feed
        .set_filter(CatalogFilter {
            category_id: Some(CategoryId::new(2)),
            ..Default::default()
        })
        .unwrap();

    // the page-2 answer of the old filter arrives after the reset
    let late = service.fetch_page(&pending.filter, pending.page, today()).await;
    assert_eq!(feed.receive(&pending, late), Receipt::Stale);

    let outcome = service.fetch_page(&restarted.filter, restarted.page, today()).await;
    assert_eq!(feed.receive(&restarted, outcome), Receipt::Applied);

    let ids: Vec<i64> = feed.products().map(|p| p.id.get()).collect();
    assert_eq!(ids, vec![25, 20, 15, 10, 5]);
    assert!(!feed.has_next_page());
}
