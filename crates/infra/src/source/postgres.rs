//! Postgres-backed catalog source.
//!
//! Product pages are rendered from the compiled [`CatalogQuery`] (see
//! [`crate::query::sql`]); each page is one statement that returns products
//! with their variants, currencies and media aggregated as JSON, followed by a
//! `COUNT(*)` over the same predicates. The facet reads are fixed statements.

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, PgPool, Postgres, Row};
use tracing::{Span, instrument};

use vitrine_catalog::{
    ApprovalStatus, AvailabilityRecord, Boutique, Category, Color, Currency, Design, Event, Mall,
    Product, Scope, Size, Variant,
};
use vitrine_core::{
    BoutiqueId, CategoryId, ColorId, CurrencyId, DesignId, EventId, MallId, ProductId, SizeId,
};

use super::{CatalogSource, PriceBounds, ProductPage, SourceError};
use crate::query::sql::{SqlParam, render_count, render_select};
use crate::query::CatalogQuery;

/// Sellable variants: approved variant of an approved, visible product in `$1`.
const SELLABLE_VARIANTS: &str = r#"
    FROM "yvariants" v
    JOIN "yproducts" p ON p."id" = v."product_id"
    LEFT JOIN "ycurrencies" cur ON cur."id" = v."currency_id"
    WHERE v."product_id" = ANY($1)
      AND v."status" = 'approved'
      AND p."status" = 'approved'
      AND p."is_visible" = TRUE
"#;

#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: Arc<PgPool>,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self), fields(event_count = tracing::field::Empty), err)]
    pub async fn load_active_events(&self, today: NaiveDate) -> Result<Vec<Event>, SourceError> {
        let rows = sqlx::query(
            r#"
            SELECT "id", "start_date", "end_date"
            FROM "yevents"
            WHERE "start_date" <= $1 AND "end_date" >= $1
            ORDER BY "start_date" DESC, "id" DESC
            "#,
        )
        .bind(today)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("active_events", e))?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let row = EventRow::from_row(&row).map_err(|e| SourceError::decode("event row", e))?;
            events.push(Event::try_from(row)?);
        }

        Span::current().record("event_count", events.len());
        Ok(events)
    }

    #[instrument(skip(self), fields(record_count = tracing::field::Empty), err)]
    pub async fn load_availability(
        &self,
        event_id: EventId,
        scope: Scope,
    ) -> Result<Vec<AvailabilityRecord>, SourceError> {
        let rows = sqlx::query(
            r#"
            SELECT "event_id", "product_id", "mall_id", "boutique_id"
            FROM "ydetailsevent"
            WHERE "event_id" = $1
              AND ($2::bigint IS NULL OR "mall_id" = $2)
              AND ($3::bigint IS NULL OR "boutique_id" = $3)
            "#,
        )
        .bind(event_id.get())
        .bind(scope.mall_id.map(MallId::get))
        .bind(scope.boutique_id.map(BoutiqueId::get))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("availability", e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(AvailabilityRecord {
                event_id: EventId::new(get(row, "event_id", "availability row")?),
                product_id: ProductId::new(get(row, "product_id", "availability row")?),
                mall_id: get::<Option<i64>>(row, "mall_id", "availability row")?.map(MallId::new),
                boutique_id: get::<Option<i64>>(row, "boutique_id", "availability row")?
                    .map(BoutiqueId::new),
            });
        }

        Span::current().record("record_count", records.len());
        Ok(records)
    }

    #[instrument(skip(self, query), fields(page_size = query.window().limit, total_count = tracing::field::Empty), err)]
    pub async fn load_products(&self, query: &CatalogQuery) -> Result<ProductPage, SourceError> {
        let select = render_select(query);
        let rows = bind_all(sqlx::query(&select.sql), &select.params)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("products", e))?;

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let row =
                ProductRow::from_row(&row).map_err(|e| SourceError::decode("product row", e))?;
            products.push(Product::try_from(row)?);
        }

        let count = render_count(query);
        let row = bind_all(sqlx::query(&count.sql), &count.params)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;
        let total: i64 = row
            .try_get(0)
            .map_err(|e| SourceError::decode("product count", e))?;
        let total_count = u64::try_from(total).unwrap_or(0);

        Span::current().record("total_count", total_count);
        Ok(ProductPage {
            products,
            total_count,
        })
    }

    #[instrument(skip(self, universe), fields(universe = universe.len()), err)]
    pub async fn load_colors(&self, universe: &[ProductId]) -> Result<Vec<Color>, SourceError> {
        let sql = format!(
            r#"SELECT DISTINCT c."id", c."name", c."hex" FROM "ycolors" c JOIN (SELECT v."color_id" {SELLABLE_VARIANTS}) s ON s."color_id" = c."id" ORDER BY c."id""#
        );
        let rows = sqlx::query(&sql)
            .bind(ids(universe))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("colors", e))?;

        rows.iter()
            .map(|row| {
                Ok(Color {
                    id: ColorId::new(get(row, "id", "color row")?),
                    name: get(row, "name", "color row")?,
                    hex: get(row, "hex", "color row")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self, universe), fields(universe = universe.len()), err)]
    pub async fn load_sizes(&self, universe: &[ProductId]) -> Result<Vec<Size>, SourceError> {
        let sql = format!(
            r#"SELECT DISTINCT z."id", z."label" FROM "ysizes" z JOIN (SELECT v."size_id" {SELLABLE_VARIANTS}) s ON s."size_id" = z."id" ORDER BY z."id""#
        );
        let rows = sqlx::query(&sql)
            .bind(ids(universe))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("sizes", e))?;

        rows.iter()
            .map(|row| {
                Ok(Size {
                    id: SizeId::new(get(row, "id", "size row")?),
                    label: get(row, "label", "size row")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self, universe), fields(universe = universe.len()), err)]
    pub async fn load_price_bounds(
        &self,
        universe: &[ProductId],
    ) -> Result<Option<PriceBounds>, SourceError> {
        let sql = format!(
            r#"SELECT MIN(s."price") AS "min", MAX(s."price") AS "max" FROM (SELECT COALESCE(v."promotion_price", v."catalog_price")::float8 / CASE WHEN cur."id" IS NULL OR cur."is_pivot" OR cur."exchange_rate" <= 0 THEN 1 ELSE cur."exchange_rate"::float8 END AS "price" {SELLABLE_VARIANTS}) s"#
        );
        let row = sqlx::query(&sql)
            .bind(ids(universe))
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("price_bounds", e))?;

        let min: Option<f64> = get(&row, "min", "price bounds")?;
        let max: Option<f64> = get(&row, "max", "price bounds")?;
        Ok(min.zip(max).map(|(min, max)| PriceBounds { min, max }))
    }

    #[instrument(skip(self, universe), fields(universe = universe.len()), err)]
    pub async fn load_categories(
        &self,
        universe: &[ProductId],
    ) -> Result<Vec<Category>, SourceError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT c."id", c."name"
            FROM "ycategories" c
            JOIN "yproducts" p ON p."category_id" = c."id"
            WHERE p."id" = ANY($1) AND p."status" = 'approved' AND p."is_visible" = TRUE
            ORDER BY c."id"
            "#,
        )
        .bind(ids(universe))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("categories", e))?;

        rows.iter()
            .map(|row| {
                Ok(Category {
                    id: CategoryId::new(get(row, "id", "category row")?),
                    name: get(row, "name", "category row")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    pub async fn load_malls(&self, event_id: EventId) -> Result<Vec<Mall>, SourceError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT m."id", m."name"
            FROM "ymalls" m
            JOIN "ydetailsevent" de ON de."mall_id" = m."id"
            WHERE de."event_id" = $1
            ORDER BY m."id"
            "#,
        )
        .bind(event_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("malls", e))?;

        rows.iter()
            .map(|row| {
                Ok(Mall {
                    id: MallId::new(get(row, "id", "mall row")?),
                    name: get(row, "name", "mall row")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    pub async fn load_boutiques(
        &self,
        event_id: EventId,
        mall_id: Option<MallId>,
    ) -> Result<Vec<Boutique>, SourceError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT b."id", b."name", b."mall_id"
            FROM "yboutiques" b
            JOIN "ydetailsevent" de ON de."boutique_id" = b."id"
            WHERE de."event_id" = $1 AND ($2::bigint IS NULL OR de."mall_id" = $2)
            ORDER BY b."id"
            "#,
        )
        .bind(event_id.get())
        .bind(mall_id.map(MallId::get))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("boutiques", e))?;

        rows.iter()
            .map(|row| {
                Ok(Boutique {
                    id: BoutiqueId::new(get(row, "id", "boutique row")?),
                    name: get(row, "name", "boutique row")?,
                    mall_id: get::<Option<i64>>(row, "mall_id", "boutique row")?.map(MallId::new),
                })
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    pub async fn load_currencies(&self) -> Result<Vec<Currency>, SourceError> {
        let rows = sqlx::query(
            r#"
            SELECT "id", "code", "exchange_rate"::float8 AS "exchange_rate", "is_pivot", "decimal_places"
            FROM "ycurrencies"
            ORDER BY "id"
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("currencies", e))?;

        rows.iter()
            .map(|row| {
                let places: i32 = get(row, "decimal_places", "currency row")?;
                Ok(Currency {
                    id: CurrencyId::new(get(row, "id", "currency row")?),
                    code: get(row, "code", "currency row")?,
                    exchange_rate: get(row, "exchange_rate", "currency row")?,
                    is_pivot: get(row, "is_pivot", "currency row")?,
                    decimal_places: u32::try_from(places)
                        .map_err(|e| SourceError::decode("currency row", e))?,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl CatalogSource for PgCatalog {
    async fn active_events(&self, today: NaiveDate) -> Result<Vec<Event>, SourceError> {
        self.load_active_events(today).await
    }

    async fn availability(
        &self,
        event_id: EventId,
        scope: Scope,
    ) -> Result<Vec<AvailabilityRecord>, SourceError> {
        self.load_availability(event_id, scope).await
    }

    async fn products(&self, query: &CatalogQuery) -> Result<ProductPage, SourceError> {
        self.load_products(query).await
    }

    async fn colors(&self, universe: &[ProductId]) -> Result<Vec<Color>, SourceError> {
        self.load_colors(universe).await
    }

    async fn sizes(&self, universe: &[ProductId]) -> Result<Vec<Size>, SourceError> {
        self.load_sizes(universe).await
    }

    async fn price_bounds(&self, universe: &[ProductId]) -> Result<Option<PriceBounds>, SourceError> {
        self.load_price_bounds(universe).await
    }

    async fn categories(&self, universe: &[ProductId]) -> Result<Vec<Category>, SourceError> {
        self.load_categories(universe).await
    }

    async fn malls(&self, event_id: EventId) -> Result<Vec<Mall>, SourceError> {
        self.load_malls(event_id).await
    }

    async fn boutiques(
        &self,
        event_id: EventId,
        mall_id: Option<MallId>,
    ) -> Result<Vec<Boutique>, SourceError> {
        self.load_boutiques(event_id, mall_id).await
    }

    async fn currencies(&self) -> Result<Vec<Currency>, SourceError> {
        self.load_currencies().await
    }
}

fn ids(universe: &[ProductId]) -> Vec<i64> {
    universe.iter().map(|id| id.get()).collect()
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::BigInt(v) => query.bind(*v),
            SqlParam::BigIntArray(v) => query.bind(v.clone()),
            SqlParam::Text(v) => query.bind(v.clone()),
        };
    }
    query
}

fn get<'r, T>(row: &'r PgRow, column: &str, what: &str) -> Result<T, SourceError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column).map_err(|e| SourceError::decode(what, e))
}

/// Map sqlx errors to [`SourceError`].
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> SourceError {
    match err {
        sqlx::Error::Database(db_err) => {
            SourceError::query(operation, format!("database error: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            SourceError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => SourceError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            SourceError::decode(operation, err)
        }
        _ => SourceError::query(operation, err.to_string()),
    }
}

impl From<sqlx::Error> for SourceError {
    fn from(err: sqlx::Error) -> Self {
        map_sqlx_error("sqlx", err)
    }
}

#[derive(Debug)]
struct EventRow {
    id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl<'r> FromRow<'r, PgRow> for EventRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
        })
    }
}

impl TryFrom<EventRow> for Event {
    type Error = SourceError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Event::new(EventId::new(row.id), row.start_date, row.end_date)
            .map_err(|e| SourceError::decode("event row", e))
    }
}

#[derive(Debug)]
struct ProductRow {
    id: i64,
    title: String,
    description: Option<String>,
    status: String,
    is_visible: bool,
    category_id: Option<i64>,
    category_name: Option<String>,
    design_id: Option<i64>,
    design_name: Option<String>,
    variants: serde_json::Value,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            status: row.try_get("status")?,
            is_visible: row.try_get("is_visible")?,
            category_id: row.try_get("category_id")?,
            category_name: row.try_get("category_name")?,
            design_id: row.try_get("design_id")?,
            design_name: row.try_get("design_name")?,
            variants: row.try_get("variants")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = SourceError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let status: ApprovalStatus = row
            .status
            .parse()
            .map_err(|e| SourceError::decode("product status", e))?;
        let variants: Vec<Variant> = serde_json::from_value(row.variants)
            .map_err(|e| SourceError::decode(format!("variants of product {}", row.id), e))?;

        Ok(Product {
            id: ProductId::new(row.id),
            title: row.title,
            description: row.description.unwrap_or_default(),
            category: row.category_id.zip(row.category_name).map(|(id, name)| Category {
                id: CategoryId::new(id),
                name,
            }),
            design: row.design_id.zip(row.design_name).map(|(id, name)| Design {
                id: DesignId::new(id),
                name,
            }),
            status,
            is_visible: row.is_visible,
            variants,
        })
    }
}
