//! Catalog product query: accumulated predicates and orderings, compiled once.
//!
//! Each filter contributes one [`Predicate`]; the sort key contributes one or
//! more [`OrderSpec`]s. The compiled [`CatalogQuery`] can be rendered to SQL
//! (see [`sql`]) or evaluated directly against in-memory rows, and both paths
//! share these definitions.

pub mod sql;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use vitrine_catalog::{AvailabilityRecord, CatalogFilter, Product, ProductUniverse, Scope, SortKey};
use vitrine_core::{CategoryId, EventId, ProductId};

pub use sql::{BuiltQuery, SqlParam};

/// Product-level filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Product id belongs to the set.
    IdIn(Vec<ProductId>),
    /// `status = approved`.
    Approved,
    /// `is_visible = true`.
    Visible,
    /// Category equality.
    Category(CategoryId),
    /// Case-insensitive substring on title OR description.
    Text(String),
    /// Offered in the event under the scope (every scope component set must match).
    AvailableIn { event_id: EventId, scope: Scope },
}

impl Predicate {
    pub fn matches(&self, product: &Product, availability: &[AvailabilityRecord]) -> bool {
        match self {
            Predicate::IdIn(ids) => ids.binary_search(&product.id).is_ok(),
            Predicate::Approved => product.status.is_approved(),
            Predicate::Visible => product.is_visible,
            Predicate::Category(id) => product.category_id() == Some(*id),
            Predicate::Text(needle) => product.matches_text(needle),
            Predicate::AvailableIn { event_id, scope } => availability.iter().any(|r| {
                r.product_id == product.id && r.event_id == *event_id && scope.admits(r)
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderField {
    Id,
    /// Case-folded title.
    Title,
    /// Lowest catalog price over all variants, pivot units. Products without
    /// variants sort last in either direction.
    MinCatalogPrice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderSpec {
    pub field: OrderField,
    pub direction: Direction,
}

impl OrderSpec {
    pub const fn new(field: OrderField, direction: Direction) -> Self {
        Self { field, direction }
    }

    fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let ord = match self.field {
            OrderField::Id => a.id.cmp(&b.id),
            OrderField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            OrderField::MinCatalogPrice => {
                match (a.min_catalog_price_in_pivot(), b.min_catalog_price_in_pivot()) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    // nulls last regardless of direction
                    (Some(_), None) => return Ordering::Less,
                    (None, Some(_)) => return Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }
        };
        match self.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

fn orders_for(sort: SortKey) -> Vec<OrderSpec> {
    let primary = match sort {
        SortKey::Newest => return vec![OrderSpec::new(OrderField::Id, Direction::Desc)],
        SortKey::Alphabetical => OrderSpec::new(OrderField::Title, Direction::Asc),
        SortKey::PriceAsc => OrderSpec::new(OrderField::MinCatalogPrice, Direction::Asc),
        SortKey::PriceDesc => OrderSpec::new(OrderField::MinCatalogPrice, Direction::Desc),
    };
    // id tie-break keeps page boundaries stable
    vec![primary, OrderSpec::new(OrderField::Id, Direction::Desc)]
}

/// Offset/limit window for one 1-based page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Page `n` covers rows `[(n-1)*size, n*size)`. Page 0 is treated as page 1.
    pub fn for_page(page: u32, page_size: u32) -> Self {
        let page = u64::from(page.max(1));
        let size = u64::from(page_size);
        Self {
            offset: (page - 1) * size,
            limit: size,
        }
    }
}

/// Compiled product query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    predicates: Vec<Predicate>,
    orders: Vec<OrderSpec>,
    window: PageWindow,
}

impl CatalogQuery {
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn orders(&self) -> &[OrderSpec] {
        &self.orders
    }

    pub fn window(&self) -> PageWindow {
        self.window
    }

    /// Every predicate holds.
    pub fn matches(&self, product: &Product, availability: &[AvailabilityRecord]) -> bool {
        self.predicates.iter().all(|p| p.matches(product, availability))
    }

    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        self.orders
            .iter()
            .map(|o| o.compare(a, b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Evaluate against in-memory rows: filter, sort, count, then slice the window.
    pub fn evaluate<'a, I>(&self, products: I, availability: &[AvailabilityRecord]) -> (Vec<Product>, u64)
    where
        I: IntoIterator<Item = &'a Product>,
    {
        let mut matched: Vec<&Product> = products
            .into_iter()
            .filter(|p| self.matches(p, availability))
            .collect();
        matched.sort_by(|a, b| self.compare(a, b));

        let total = matched.len() as u64;
        let page = matched
            .into_iter()
            .skip(self.window.offset as usize)
            .take(self.window.limit as usize)
            .cloned()
            .collect();
        (page, total)
    }
}

/// Accumulates predicates and orderings for a [`CatalogQuery`].
#[derive(Debug, Clone)]
pub struct CatalogQueryBuilder {
    predicates: Vec<Predicate>,
    sort: SortKey,
    window: PageWindow,
}

impl CatalogQueryBuilder {
    /// Start from a product universe: ids in the universe, approved and visible.
    pub fn new(universe: &ProductUniverse) -> Self {
        Self {
            predicates: vec![
                Predicate::IdIn(universe.ids()),
                Predicate::Approved,
                Predicate::Visible,
            ],
            sort: SortKey::default(),
            window: PageWindow::for_page(1, 12),
        }
    }

    /// Every product-level constraint `filter` implies, plus sort and window.
    pub fn from_filter(
        universe: &ProductUniverse,
        filter: &CatalogFilter,
        page: u32,
        page_size: u32,
    ) -> Self {
        let mut builder = Self::new(universe)
            .category(filter.category_id)
            .search(filter.search_term())
            .sort(filter.sort)
            .page(page, page_size);
        if let Some(event_id) = universe.event_id() {
            builder = builder.available_in(event_id, filter.scope());
        }
        builder
    }

    pub fn category(mut self, category_id: Option<CategoryId>) -> Self {
        if let Some(id) = category_id {
            self.predicates.push(Predicate::Category(id));
        }
        self
    }

    /// Blank terms are ignored.
    pub fn search(mut self, term: Option<&str>) -> Self {
        if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
            self.predicates.push(Predicate::Text(term.to_string()));
        }
        self
    }

    /// Re-check availability with scope equality. The universe is already
    /// scoped; this keeps products listed in several scopes honest.
    pub fn available_in(mut self, event_id: EventId, scope: Scope) -> Self {
        self.predicates.push(Predicate::AvailableIn { event_id, scope });
        self
    }

    pub fn sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.window = PageWindow::for_page(page, page_size);
        self
    }

    pub fn build(self) -> CatalogQuery {
        let mut predicates = self.predicates;
        for p in &mut predicates {
            if let Predicate::IdIn(ids) = p {
                ids.sort_unstable();
                ids.dedup();
            }
        }
        CatalogQuery {
            predicates,
            orders: orders_for(self.sort),
            window: self.window,
        }
    }
}
