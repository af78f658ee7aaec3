//! Reactive query cache
//!
//! One source of truth shared by pull-based readers (polling queries) and
//! push-based readers (live subscriptions). Entries are either replaced
//! wholesale by a push or marked stale so the next read refetches through
//! the registered fetcher. A push racing an in-flight fetch is resolved
//! last-write-wins; values are never merged.

pub mod bridge;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::error::{Result, VigilError};

pub use bridge::{DashboardBridge, Notification};

/// Capacity of the change-notification channel
const CHANGE_BUFFER_SIZE: usize = 256;

/// Identifiers of the cached queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    DashboardMetrics,
    DashboardActivity,
    DashboardCharts,
    Assets,
    Audits,
    Vulnerabilities,
    Users,
    Reports,
}

impl QueryKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKey::DashboardMetrics => "dashboard-metrics",
            QueryKey::DashboardActivity => "dashboard-activity",
            QueryKey::DashboardCharts => "dashboard-charts",
            QueryKey::Assets => "assets",
            QueryKey::Audits => "audits",
            QueryKey::Vulnerabilities => "vulnerabilities",
            QueryKey::Users => "users",
            QueryKey::Reports => "reports",
        }
    }
}

/// Produces a fresh value for one query; the refetch path of
/// invalidation
#[async_trait]
pub trait QueryFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Value>;
}

/// Adapter turning an async closure into a fetcher
pub struct FnFetcher<F>(pub F);

#[async_trait]
impl<F, Fut> QueryFetcher for FnFetcher<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Value>> + Send,
{
    async fn fetch(&self) -> Result<Value> {
        (self.0)().await
    }
}

#[derive(Clone)]
struct Entry {
    value: Value,
    stale: bool,
    updated_at: DateTime<Utc>,
}

/// The query cache
///
/// Cheap to clone; all clones share the same entries.
#[derive(Clone, Default)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    entries: DashMap<QueryKey, Entry>,
    fetchers: DashMap<QueryKey, Arc<dyn QueryFetcher>>,
    changed_tx: broadcast::Sender<QueryKey>,
}

impl Default for CacheInner {
    fn default() -> Self {
        let (changed_tx, _) = broadcast::channel(CHANGE_BUFFER_SIZE);
        Self {
            entries: DashMap::new(),
            fetchers: DashMap::new(),
            changed_tx,
        }
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the fetch function backing a query key
    pub fn register(&self, key: QueryKey, fetcher: Arc<dyn QueryFetcher>) {
        self.inner.fetchers.insert(key, fetcher);
    }

    /// Atomically replace the cached value (a full-payload push).
    /// Readers see the new value on their next read.
    pub fn push_replace(&self, key: QueryKey, value: Value) {
        trace!(key = key.as_str(), "push replace");
        self.inner.entries.insert(
            key,
            Entry {
                value,
                stale: false,
                updated_at: Utc::now(),
            },
        );
        let _ = self.inner.changed_tx.send(key);
    }

    /// Mark the entry stale; the next read refetches instead of serving
    /// the stored value
    pub fn invalidate(&self, key: QueryKey) {
        debug!(key = key.as_str(), "invalidated");
        if let Some(mut entry) = self.inner.entries.get_mut(&key) {
            entry.stale = true;
        }
        let _ = self.inner.changed_tx.send(key);
    }

    /// Read a query, fetching when the entry is missing or stale.
    ///
    /// A push landing while a fetch is in flight is not coordinated with
    /// it: whichever write completes last wins, wholesale.
    pub async fn get(&self, key: QueryKey) -> Result<Value> {
        if let Some(entry) = self.inner.entries.get(&key) {
            if !entry.stale {
                return Ok(entry.value.clone());
            }
        }

        // Clone the fetcher out before awaiting; holding a map guard
        // across the await point would block writers
        let fetcher = self
            .inner
            .fetchers
            .get(&key)
            .map(|f| f.clone())
            .ok_or_else(|| VigilError::NoFetcher(key.as_str().to_string()))?;

        let value = fetcher.fetch().await?;
        self.inner.entries.insert(
            key,
            Entry {
                value: value.clone(),
                stale: false,
                updated_at: Utc::now(),
            },
        );
        let _ = self.inner.changed_tx.send(key);
        Ok(value)
    }

    /// Typed read
    pub async fn get_as<T: DeserializeOwned>(&self, key: QueryKey) -> Result<T> {
        let value = self.get(key).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Current cached value without triggering a fetch
    pub fn peek(&self, key: QueryKey) -> Option<Value> {
        self.inner
            .entries
            .get(&key)
            .filter(|entry| !entry.stale)
            .map(|entry| entry.value.clone())
    }

    /// When the entry was last written
    pub fn updated_at(&self, key: QueryKey) -> Option<DateTime<Utc>> {
        self.inner.entries.get(&key).map(|entry| entry.updated_at)
    }

    /// Whether the entry currently needs a refetch
    pub fn is_stale(&self, key: QueryKey) -> bool {
        self.inner
            .entries
            .get(&key)
            .map_or(true, |entry| entry.stale)
    }

    /// Subscribe to change notifications, so readers re-render on every
    /// push, invalidation, or completed fetch
    pub fn changes(&self) -> broadcast::Receiver<QueryKey> {
        self.inner.changed_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct CountingFetcher {
        calls: AtomicUsize,
        value: Value,
    }

    #[async_trait]
    impl QueryFetcher for CountingFetcher {
        async fn fetch(&self) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.value.clone())
        }
    }

    #[tokio::test]
    async fn test_push_replace_serves_without_fetching() {
        let cache = QueryCache::new();
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            value: json!({"totalAssets": 1}),
        });
        cache.register(QueryKey::DashboardMetrics, fetcher.clone());

        cache.push_replace(QueryKey::DashboardMetrics, json!({"totalAssets": 50}));

        let value = cache.get(QueryKey::DashboardMetrics).await.unwrap();
        assert_eq!(value["totalAssets"], 50);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = QueryCache::new();
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            value: json!({"totalAssets": 45}),
        });
        cache.register(QueryKey::DashboardMetrics, fetcher.clone());

        cache.push_replace(QueryKey::DashboardMetrics, json!({"totalAssets": 50}));
        cache.invalidate(QueryKey::DashboardMetrics);
        assert!(cache.is_stale(QueryKey::DashboardMetrics));

        let value = cache.get(QueryKey::DashboardMetrics).await.unwrap();
        assert_eq!(value["totalAssets"], 45);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(!cache.is_stale(QueryKey::DashboardMetrics));
    }

    #[tokio::test]
    async fn test_missing_fetcher_is_an_error() {
        let cache = QueryCache::new();
        let err = cache.get(QueryKey::Assets).await.unwrap_err();
        assert!(matches!(err, VigilError::NoFetcher(_)));
    }

    struct GatedFetcher {
        gate: Arc<Notify>,
        value: Value,
    }

    #[async_trait]
    impl QueryFetcher for GatedFetcher {
        async fn fetch(&self) -> Result<Value> {
            self.gate.notified().await;
            Ok(self.value.clone())
        }
    }

    #[tokio::test]
    async fn test_fetch_completing_after_push_wins() {
        let cache = QueryCache::new();
        let gate = Arc::new(Notify::new());
        cache.register(
            QueryKey::DashboardMetrics,
            Arc::new(GatedFetcher {
                gate: gate.clone(),
                value: json!({"totalAssets": 45}),
            }),
        );

        // Poll-based fetch goes in flight (entry missing, so it fetches)
        let cache_clone = cache.clone();
        let fetch_task =
            tokio::spawn(async move { cache_clone.get(QueryKey::DashboardMetrics).await });

        tokio::task::yield_now().await;

        // Push lands while the fetch is in flight
        cache.push_replace(QueryKey::DashboardMetrics, json!({"totalAssets": 50}));

        // Fetch completes last and overwrites wholesale; no merge
        gate.notify_one();
        fetch_task.await.unwrap().unwrap();

        let value = cache.peek(QueryKey::DashboardMetrics).unwrap();
        assert_eq!(value["totalAssets"], 45);
        assert!(value.get("merged").is_none());
    }

    #[tokio::test]
    async fn test_push_completing_after_fetch_wins() {
        let cache = QueryCache::new();
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            value: json!({"totalAssets": 45}),
        });
        cache.register(QueryKey::DashboardMetrics, fetcher);

        cache.get(QueryKey::DashboardMetrics).await.unwrap();
        cache.push_replace(QueryKey::DashboardMetrics, json!({"totalAssets": 50}));

        let value = cache.peek(QueryKey::DashboardMetrics).unwrap();
        assert_eq!(value["totalAssets"], 50);
    }

    #[tokio::test]
    async fn test_changes_notify_readers() {
        let cache = QueryCache::new();
        let mut changes = cache.changes();

        cache.push_replace(QueryKey::Assets, json!([]));
        assert_eq!(changes.recv().await.unwrap(), QueryKey::Assets);

        cache.invalidate(QueryKey::Assets);
        assert_eq!(changes.recv().await.unwrap(), QueryKey::Assets);
    }

    #[tokio::test]
    async fn test_fn_fetcher_adapter() {
        let cache = QueryCache::new();
        cache.register(
            QueryKey::Users,
            Arc::new(FnFetcher(|| async { Ok(json!([{"username": "admin"}])) })),
        );

        let value = cache.get(QueryKey::Users).await.unwrap();
        assert_eq!(value[0]["username"], "admin");
    }
}
