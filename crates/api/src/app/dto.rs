use core::str::FromStr;

use serde::{Deserialize, Serialize};

use vitrine_catalog::{CatalogFilter, Currency, ProductCard, Scope, SortKey, find_pivot, from_pivot};
use vitrine_core::{CurrencyId, DomainError, DomainResult};
use vitrine_infra::source::PriceBounds;
use vitrine_infra::{CatalogPage, FetchOutcome, FilterOptions};

// -------------------------
// Request DTOs
// -------------------------

/// `GET /shop/products` query string. Everything arrives as text so that a
/// malformed value becomes a JSON 400 rather than axum's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsParams {
    pub mall: Option<String>,
    pub boutique: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub page: Option<String>,
    pub currency: Option<String>,
}

impl ProductsParams {
    /// Filter in pivot units; price bounds are read in `display`.
    pub fn to_filter(&self, display: &Currency) -> DomainResult<CatalogFilter> {
        let mut filter = CatalogFilter {
            mall_id: parse_opt(self.mall.as_deref())?,
            boutique_id: parse_opt(self.boutique.as_deref())?,
            category_id: parse_opt(self.category.as_deref())?,
            search: non_blank(self.search.as_deref()).map(str::to_string),
            sort: match non_blank(self.sort.as_deref()) {
                Some(raw) => SortKey::from_str(raw)?,
                None => SortKey::default(),
            },
            color_id: parse_opt(self.color.as_deref())?,
            size_id: parse_opt(self.size.as_deref())?,
            ..Default::default()
        };

        let min = parse_price("min_price", self.min_price.as_deref())?;
        let max = parse_price("max_price", self.max_price.as_deref())?;
        filter.set_price_range_in(min, max, display)?;
        Ok(filter)
    }

    /// 1-based page; absent means the first page.
    pub fn page(&self) -> DomainResult<u32> {
        match non_blank(self.page.as_deref()) {
            None => Ok(1),
            Some(raw) => match raw.parse::<u32>() {
                Ok(page) if page >= 1 => Ok(page),
                _ => Err(DomainError::validation(format!(
                    "page must be a positive integer, got {raw:?}"
                ))),
            },
        }
    }
}

/// `GET /shop/filters` query string.
#[derive(Debug, Default, Deserialize)]
pub struct FiltersParams {
    pub mall: Option<String>,
    pub boutique: Option<String>,
    pub currency: Option<String>,
}

impl FiltersParams {
    pub fn scope(&self) -> DomainResult<Scope> {
        Ok(Scope::new(
            parse_opt(self.mall.as_deref())?,
            parse_opt(self.boutique.as_deref())?,
        ))
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_opt<T>(raw: Option<&str>) -> DomainResult<Option<T>>
where
    T: FromStr<Err = DomainError>,
{
    non_blank(raw).map(T::from_str).transpose()
}

fn parse_price(name: &str, raw: Option<&str>) -> DomainResult<Option<f64>> {
    non_blank(raw)
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| DomainError::validation(format!("{name} must be a number, got {v:?}")))
        })
        .transpose()
}

// -------------------------
// Display currency
// -------------------------

/// Stand-in used when no pivot currency is configured: amounts pass through unchanged.
fn unit_currency() -> Currency {
    Currency {
        id: CurrencyId::new(0),
        code: "XXX".to_string(),
        exchange_rate: 1.0,
        is_pivot: true,
        decimal_places: 2,
    }
}

/// Currency requested by `code` (case-insensitive), or the pivot when none is requested.
pub fn display_currency(currencies: &[Currency], code: Option<&str>) -> DomainResult<Currency> {
    match non_blank(code) {
        Some(code) => currencies
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("currency {code}"))),
        None => Ok(find_pivot(currencies).cloned().unwrap_or_else(unit_currency)),
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub status: &'static str,
    /// Empty reason or failure message.
    pub reason: Option<String>,
    pub products: Vec<ProductCard>,
    pub total_count: u64,
    pub count_is_exact: bool,
    pub page: u32,
    pub page_size: u32,
    pub has_next_page: bool,
    pub next_page: Option<u32>,
    pub currency: String,
    /// Active price filter echoed in the display currency.
    pub price_range: PriceRange,
}

impl ProductsResponse {
    pub fn from_outcome(
        outcome: FetchOutcome<CatalogPage>,
        filter: &CatalogFilter,
        page: u32,
        page_size: u32,
        display: &Currency,
    ) -> Self {
        let status = outcome.status();
        let reason = match &outcome {
            FetchOutcome::Ready(_) => None,
            FetchOutcome::Empty(reason) => Some(reason.as_str().to_string()),
            FetchOutcome::Failed(message) => Some(message.clone()),
        };
        let page = outcome.into_page(page, page_size);
        let (min, max) = filter.price_range_in(display);

        Self {
            status,
            reason,
            products: page
                .products
                .iter()
                .map(|p| ProductCard::from_product(p, display))
                .collect(),
            total_count: page.total_count,
            count_is_exact: page.count_is_exact,
            page: page.page,
            page_size: page.page_size,
            has_next_page: page.has_next_page,
            next_page: page.next_page,
            currency: display.code.clone(),
            price_range: PriceRange {
                min: min.map(|v| display.round(v)),
                max: max.map(|v| display.round(v)),
            },
        }
    }
}

/// Filter options with the price slider bounds moved into `display`.
pub fn options_in(outcome: FetchOutcome<FilterOptions>, display: &Currency) -> FetchOutcome<FilterOptions> {
    outcome.map(|options| FilterOptions {
        price_bounds: options.price_bounds.map(|b| PriceBounds {
            min: display.round(from_pivot(b.min, display)),
            max: display.round(from_pivot(b.max, display)),
        }),
        ..options
    })
}
