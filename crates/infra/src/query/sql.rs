//! Postgres rendering of [`CatalogQuery`].
//!
//! Values always travel as bind parameters; identifiers are quoted.

use super::{CatalogQuery, Direction, OrderField, OrderSpec, Predicate};

/// Bind value for a rendered query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    BigInt(i64),
    BigIntArray(Vec<i64>),
    Text(String),
}

/// SQL string with `$1, $2, ...` placeholders and the values in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// Variants of `p` as a JSON array, each with its currency and media attached.
const VARIANTS_JSON: &str = r#"COALESCE((SELECT json_agg(json_build_object('id', v."id", 'product_id', v."product_id", 'color_id', v."color_id", 'size_id', v."size_id", 'catalog_price', v."catalog_price"::float8, 'promotion_price', v."promotion_price"::float8, 'status', v."status", 'currency', CASE WHEN cur."id" IS NULL THEN NULL ELSE json_build_object('id', cur."id", 'code', cur."code", 'exchange_rate', cur."exchange_rate"::float8, 'is_pivot', cur."is_pivot", 'decimal_places', cur."decimal_places") END, 'media', COALESCE((SELECT json_agg(json_build_object('url', m."url", 'is_video', m."is_video") ORDER BY m."position", m."id") FROM "ymedia" m WHERE m."variant_id" = v."id"), '[]'::json)) ORDER BY v."position", v."id") FROM "yvariants" v LEFT JOIN "ycurrencies" cur ON cur."id" = v."currency_id" WHERE v."product_id" = p."id"), '[]'::json)"#;

/// Lowest catalog price of `p` in pivot units. Unusable rates count as 1.
const MIN_PRICE_EXPR: &str = r#"(SELECT MIN(v2."catalog_price"::float8 / CASE WHEN cur2."id" IS NULL OR cur2."is_pivot" OR cur2."exchange_rate" <= 0 THEN 1 ELSE cur2."exchange_rate"::float8 END) FROM "yvariants" v2 LEFT JOIN "ycurrencies" cur2 ON cur2."id" = v2."currency_id" WHERE v2."product_id" = p."id")"#;

struct SqlBuilder {
    sql: String,
    params: Vec<SqlParam>,
}

impl SqlBuilder {
    fn new() -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    /// Bind `value` and return its placeholder index.
    fn bind(&mut self, value: SqlParam) -> usize {
        self.params.push(value);
        self.params.len()
    }

    fn push_placeholder(&mut self, index: usize) {
        self.sql.push('$');
        self.sql.push_str(&index.to_string());
    }

    fn push_param(&mut self, value: SqlParam) {
        let index = self.bind(value);
        self.push_placeholder(index);
    }

    fn push_ident(&mut self, name: &str) {
        self.sql.push('"');
        for c in name.chars() {
            if c == '"' {
                self.sql.push('"');
            }
            self.sql.push(c);
        }
        self.sql.push('"');
    }

    fn push_column(&mut self, alias: &str, name: &str) {
        self.push(alias);
        self.push(".");
        self.push_ident(name);
    }

    fn build_predicate(&mut self, predicate: &Predicate) {
        match predicate {
            Predicate::IdIn(ids) => {
                self.push_column("p", "id");
                self.push(" = ANY(");
                self.push_param(SqlParam::BigIntArray(ids.iter().map(|id| id.get()).collect()));
                self.push(")");
            }
            Predicate::Approved => {
                self.push_column("p", "status");
                self.push(" = ");
                self.push_param(SqlParam::Text("approved".to_string()));
            }
            Predicate::Visible => {
                self.push_column("p", "is_visible");
                self.push(" = TRUE");
            }
            Predicate::Category(id) => {
                self.push_column("p", "category_id");
                self.push(" = ");
                self.push_param(SqlParam::BigInt(id.get()));
            }
            Predicate::Text(needle) => {
                let index = self.bind(SqlParam::Text(format!("%{}%", escape_like(needle))));
                self.push("(");
                self.push_column("p", "title");
                self.push(" ILIKE ");
                self.push_placeholder(index);
                self.push(" OR ");
                self.push_column("p", "description");
                self.push(" ILIKE ");
                self.push_placeholder(index);
                self.push(")");
            }
            Predicate::AvailableIn { event_id, scope } => {
                self.push("EXISTS (SELECT 1 FROM ");
                self.push_ident("ydetailsevent");
                self.push(" de WHERE ");
                self.push_column("de", "product_id");
                self.push(" = ");
                self.push_column("p", "id");
                self.push(" AND ");
                self.push_column("de", "event_id");
                self.push(" = ");
                self.push_param(SqlParam::BigInt(event_id.get()));
                if let Some(mall) = scope.mall_id {
                    self.push(" AND ");
                    self.push_column("de", "mall_id");
                    self.push(" = ");
                    self.push_param(SqlParam::BigInt(mall.get()));
                }
                if let Some(boutique) = scope.boutique_id {
                    self.push(" AND ");
                    self.push_column("de", "boutique_id");
                    self.push(" = ");
                    self.push_param(SqlParam::BigInt(boutique.get()));
                }
                self.push(")");
            }
        }
    }

    fn build_where(&mut self, predicates: &[Predicate]) {
        if predicates.is_empty() {
            return;
        }
        self.push(" WHERE ");
        for (i, predicate) in predicates.iter().enumerate() {
            if i > 0 {
                self.push(" AND ");
            }
            self.build_predicate(predicate);
        }
    }

    fn build_order(&mut self, order: &OrderSpec) {
        match order.field {
            OrderField::Id => self.push_column("p", "id"),
            OrderField::Title => {
                self.push("lower(");
                self.push_column("p", "title");
                self.push(")");
            }
            OrderField::MinCatalogPrice => self.push(MIN_PRICE_EXPR),
        }
        match order.direction {
            Direction::Asc => self.push(" ASC"),
            Direction::Desc => self.push(" DESC"),
        }
        if order.field == OrderField::MinCatalogPrice {
            self.push(" NULLS LAST");
        }
    }

    fn finish(self) -> BuiltQuery {
        BuiltQuery {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Escape `%`, `_` and `\` so user text matches literally under ILIKE.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// One page of products with variants, currency, media, category and design.
pub fn render_select(query: &CatalogQuery) -> BuiltQuery {
    let mut b = SqlBuilder::new();
    b.push(r#"SELECT p."id", p."title", p."description", p."status", p."is_visible", c."id" AS category_id, c."name" AS category_name, d."id" AS design_id, d."name" AS design_name, "#);
    b.push(VARIANTS_JSON);
    b.push(" AS variants FROM ");
    b.push_ident("yproducts");
    b.push(" p LEFT JOIN ");
    b.push_ident("ycategories");
    b.push(r#" c ON c."id" = p."category_id" LEFT JOIN "#);
    b.push_ident("ydesigns");
    b.push(r#" d ON d."id" = p."design_id""#);
    b.build_where(query.predicates());

    if !query.orders().is_empty() {
        b.push(" ORDER BY ");
        for (i, order) in query.orders().iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.build_order(order);
        }
    }

    let window = query.window();
    b.push(" LIMIT ");
    b.push_param(SqlParam::BigInt(window.limit as i64));
    b.push(" OFFSET ");
    b.push_param(SqlParam::BigInt(window.offset as i64));
    b.finish()
}

/// Size of the unpaginated match set.
pub fn render_count(query: &CatalogQuery) -> BuiltQuery {
    let mut b = SqlBuilder::new();
    b.push("SELECT COUNT(*) FROM ");
    b.push_ident("yproducts");
    b.push(" p");
    b.build_where(query.predicates());
    b.finish()
}
