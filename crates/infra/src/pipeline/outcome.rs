use core::fmt;

use serde::Serialize;
use uuid::Uuid;

use vitrine_catalog::Product;

/// Time-ordered identity of one catalog fetch, recorded on its tracing span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FetchId(Uuid);

impl FetchId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FetchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FetchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a stage produced nothing. None of these are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    NoActiveEvent,
    NoAvailability,
    NoMatches,
}

impl EmptyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EmptyReason::NoActiveEvent => "no_active_event",
            EmptyReason::NoAvailability => "no_availability",
            EmptyReason::NoMatches => "no_matches",
        }
    }
}

/// Result of a pipeline stage.
///
/// Backend failures are absorbed into `Failed` rather than returned as `Err`,
/// so a caller that wants the lossy "failure looks empty" rendering can still
/// tell the two apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum FetchOutcome<T> {
    Ready(T),
    Empty(EmptyReason),
    Failed(String),
}

impl<T> FetchOutcome<T> {
    pub fn status(&self) -> &'static str {
        match self {
            FetchOutcome::Ready(_) => "ready",
            FetchOutcome::Empty(_) => "empty",
            FetchOutcome::Failed(_) => "failed",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, FetchOutcome::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            FetchOutcome::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            FetchOutcome::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Ready(value) => FetchOutcome::Ready(f(value)),
            FetchOutcome::Empty(reason) => FetchOutcome::Empty(reason),
            FetchOutcome::Failed(reason) => FetchOutcome::Failed(reason),
        }
    }
}

/// One page of post-filtered products.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogPage {
    pub products: Vec<Product>,
    /// Size of the unpaginated product match set.
    pub total_count: u64,
    /// `false` when variant filters were active: the count was taken before
    /// products without a matching variant were dropped, so it may overcount.
    pub count_is_exact: bool,
    pub page: u32,
    pub page_size: u32,
    pub has_next_page: bool,
    pub next_page: Option<u32>,
}

impl CatalogPage {
    pub fn new(
        products: Vec<Product>,
        total_count: u64,
        count_is_exact: bool,
        page: u32,
        page_size: u32,
    ) -> Self {
        let has_next_page = has_next_page(page, page_size, total_count);
        Self {
            products,
            total_count,
            count_is_exact,
            page,
            page_size,
            has_next_page,
            next_page: has_next_page.then(|| page + 1),
        }
    }

    pub fn empty(page: u32, page_size: u32) -> Self {
        Self::new(Vec::new(), 0, true, page, page_size)
    }
}

/// `page * page_size < total_count`.
pub fn has_next_page(page: u32, page_size: u32, total_count: u64) -> bool {
    u64::from(page) * u64::from(page_size) < total_count
}

impl FetchOutcome<CatalogPage> {
    /// Collapse `Empty` and `Failed` into an empty page.
    pub fn into_page(self, page: u32, page_size: u32) -> CatalogPage {
        match self {
            FetchOutcome::Ready(p) => p,
            FetchOutcome::Empty(_) | FetchOutcome::Failed(_) => CatalogPage::empty(page, page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_page_follows_total_count() {
        // 25 products, 12 per page
        assert!(CatalogPage::new(vec![], 25, true, 1, 12).has_next_page);
        assert!(CatalogPage::new(vec![], 25, true, 2, 12).has_next_page);
        let last = CatalogPage::new(vec![], 25, true, 3, 12);
        assert!(!last.has_next_page);
        assert_eq!(last.next_page, None);

        assert_eq!(CatalogPage::new(vec![], 24, true, 1, 12).next_page, Some(2));
        assert!(!CatalogPage::new(vec![], 24, true, 2, 12).has_next_page);
    }

    #[test]
    fn empty_and_failed_collapse_to_an_empty_page() {
        let failed: FetchOutcome<CatalogPage> = FetchOutcome::Failed("timeout".to_string());
        let empty: FetchOutcome<CatalogPage> = FetchOutcome::Empty(EmptyReason::NoActiveEvent);

        assert_eq!(failed.into_page(1, 12), CatalogPage::empty(1, 12));
        assert_eq!(empty.into_page(1, 12).total_count, 0);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let empty: FetchOutcome<u32> = FetchOutcome::Empty(EmptyReason::NoAvailability);
        assert_eq!(
            serde_json::to_value(&empty).unwrap(),
            serde_json::json!({"status": "empty", "data": "no_availability"})
        );
        assert_eq!(
            serde_json::to_value(FetchOutcome::Ready(3)).unwrap(),
            serde_json::json!({"status": "ready", "data": 3})
        );
    }

    #[test]
    fn fetch_ids_are_v7() {
        let id = FetchId::new();
        assert_eq!(id.as_uuid().get_version_num(), 7);
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }
}
