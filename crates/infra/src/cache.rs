//! Query result cache with stale-time semantics.
//!
//! Entries never expire on their own: once older than `max_age` they are
//! served as `Stale`, which callers use as placeholder data while refetching
//! or as a fallback when the refetch fails.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, warn};

use vitrine_catalog::{CatalogFilter, CatalogKey, Scope};

use crate::pipeline::{CatalogPage, CatalogService, FetchOutcome, FilterOptions};
use crate::source::CatalogSource;

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<V> {
    Fresh(V),
    Stale(V),
    Miss,
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct QueryCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    max_age: Duration,
    capacity: usize,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(max_age: Duration) -> Self {
        Self::with_capacity(max_age, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(max_age: Duration, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_age,
            capacity: capacity.max(1),
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn lookup(&self, key: &K, now: DateTime<Utc>) -> CacheLookup<V> {
        let Ok(entries) = self.entries.read() else {
            return CacheLookup::Miss;
        };
        match entries.get(key) {
            None => CacheLookup::Miss,
            Some(entry) if now - entry.fetched_at <= self.max_age => {
                CacheLookup::Fresh(entry.value.clone())
            }
            Some(entry) => CacheLookup::Stale(entry.value.clone()),
        }
    }

    /// Store `value`. When full, stale entries go first, then the oldest one.
    pub fn insert(&self, key: K, value: V, now: DateTime<Utc>) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let max_age = self.max_age;
            entries.retain(|_, e| now - e.fetched_at <= max_age);
            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.fetched_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: now,
            },
        );
    }

    /// Drop entries older than `max_age`. Returns how many were removed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        let max_age = self.max_age;
        entries.retain(|_, e| now - e.fetched_at <= max_age);
        before - entries.len()
    }

    pub fn invalidate_all(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [`CatalogService`] behind two caches: product pages keyed by the full
/// filter tuple plus page, and filter options keyed by scope.
///
/// Only `Ready` and `Empty` outcomes are cached. On `Failed`, a stale entry
/// for the same key is served instead when one exists.
#[derive(Debug)]
pub struct CachedCatalog<S> {
    service: CatalogService<S>,
    pages: QueryCache<CatalogKey, FetchOutcome<CatalogPage>>,
    options: QueryCache<Scope, FetchOutcome<FilterOptions>>,
}

impl<S> CachedCatalog<S>
where
    S: CatalogSource,
{
    pub fn new(service: CatalogService<S>, pages_max_age: Duration, options_max_age: Duration) -> Self {
        Self {
            service,
            pages: QueryCache::new(pages_max_age),
            options: QueryCache::new(options_max_age),
        }
    }

    pub fn service(&self) -> &CatalogService<S> {
        &self.service
    }

    pub async fn fetch_page(
        &self,
        filter: &CatalogFilter,
        page: u32,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> FetchOutcome<CatalogPage> {
        let key = filter.key(page.max(1));
        let stale = match self.pages.lookup(&key, now) {
            CacheLookup::Fresh(hit) => {
                debug!(page = key.page, "catalog page cache hit");
                return hit;
            }
            CacheLookup::Stale(previous) => Some(previous),
            CacheLookup::Miss => None,
        };

        let fetched = self.service.fetch_page(filter, page, today).await;
        match (fetched, stale) {
            (FetchOutcome::Failed(reason), Some(previous)) => {
                warn!(page = key.page, %reason, "catalog fetch failed, serving stale page");
                previous
            }
            (fetched, _) => {
                if !fetched.is_failed() {
                    self.pages.insert(key, fetched.clone(), now);
                }
                fetched
            }
        }
    }

    /// Stale or fresh cached page for `filter`, without fetching.
    pub fn placeholder(&self, filter: &CatalogFilter, page: u32, now: DateTime<Utc>) -> Option<FetchOutcome<CatalogPage>> {
        match self.pages.lookup(&filter.key(page.max(1)), now) {
            CacheLookup::Fresh(v) | CacheLookup::Stale(v) => Some(v),
            CacheLookup::Miss => None,
        }
    }

    pub async fn filter_options(
        &self,
        scope: Scope,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> FetchOutcome<FilterOptions> {
        let stale = match self.options.lookup(&scope, now) {
            CacheLookup::Fresh(hit) => {
                debug!("filter options cache hit");
                return hit;
            }
            CacheLookup::Stale(previous) => Some(previous),
            CacheLookup::Miss => None,
        };

        let fetched = self.service.filter_options(scope, today).await;
        let complete = match &fetched {
            FetchOutcome::Ready(options) => options.is_complete(),
            FetchOutcome::Empty(_) => true,
            FetchOutcome::Failed(_) => false,
        };

        if complete {
            self.options.insert(scope, fetched.clone(), now);
            return fetched;
        }
        match stale {
            Some(previous) => {
                warn!("filter options incomplete, serving stale options");
                previous
            }
            None => fetched,
        }
    }

    pub fn invalidate_all(&self) {
        self.pages.invalidate_all();
        self.options.invalidate_all();
    }
}
