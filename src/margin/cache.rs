//! TTL cache over a margin source.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::{normalize_symbol, MarginEntry};

use super::MarginSource;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// One fetched margin list.
struct Snapshot {
    entries: Arc<Vec<MarginEntry>>,
    by_symbol: HashMap<String, Decimal>,
    fetched_at: Instant,
}

impl Snapshot {
    fn new(entries: Vec<MarginEntry>) -> Self {
        let mut by_symbol = HashMap::with_capacity(entries.len());
        for entry in &entries {
            if !entry.is_usable() {
                debug!(symbol = %entry.symbol, margin = %entry.margin, "Skipping unusable margin");
                continue;
            }
            by_symbol.entry(entry.normalized_symbol()).or_insert(entry.margin);
        }

        Self {
            entries: Arc::new(entries),
            by_symbol,
            fetched_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Caches the margin list for `ttl`, refetching lazily once it expires.
///
/// A failed refresh falls back to the previous list when one exists.
pub struct MarginCache<S> {
    source: S,
    ttl: Duration,
    state: RwLock<Option<Arc<Snapshot>>>,
}

impl<S: MarginSource> MarginCache<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            state: RwLock::new(None),
        }
    }

    /// All margin entries as published by the source.
    pub async fn entries(&self) -> Result<Arc<Vec<MarginEntry>>> {
        Ok(self.snapshot().await?.entries.clone())
    }

    /// Leverage multiplier for a symbol, if the source lists a usable one.
    pub async fn leverage_for(&self, symbol: &str) -> Result<Option<Decimal>> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.by_symbol.get(&normalize_symbol(symbol)).copied())
    }

    /// Drop the cached list so the next lookup refetches.
    pub async fn invalidate(&self) {
        *self.state.write().await = None;
        debug!("Margin cache invalidated");
    }

    /// Whether a lookup right now would be served without fetching.
    pub async fn is_fresh(&self) -> bool {
        self.state
            .read()
            .await
            .as_ref()
            .is_some_and(|s| s.is_fresh(self.ttl))
    }

    async fn snapshot(&self) -> Result<Arc<Snapshot>> {
        if let Some(snapshot) = self.state.read().await.as_ref() {
            if snapshot.is_fresh(self.ttl) {
                return Ok(snapshot.clone());
            }
        }

        let mut state = self.state.write().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(snapshot) = state.as_ref() {
            if snapshot.is_fresh(self.ttl) {
                return Ok(snapshot.clone());
            }
        }

        match self.source.fetch_margins().await {
            Ok(entries) => {
                info!(count = entries.len(), "Refreshed margin list");
                let snapshot = Arc::new(Snapshot::new(entries));
                *state = Some(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => match state.as_ref() {
                Some(stale) => {
                    warn!(error = %e, "Margin refresh failed, serving stale list");
                    Ok(stale.clone())
                }
                None => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeSource {
        calls: Arc<AtomicUsize>,
        failing: Arc<AtomicBool>,
        entries: Vec<MarginEntry>,
    }

    #[async_trait]
    impl MarginSource for FakeSource {
        async fn fetch_margins(&self) -> Result<Vec<MarginEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("service down");
            }
            Ok(self.entries.clone())
        }
    }

    fn fake() -> (FakeSource, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let failing = Arc::new(AtomicBool::new(false));
        let source = FakeSource {
            calls: calls.clone(),
            failing: failing.clone(),
            entries: vec![
                MarginEntry::new("RELIANCE", dec!(4)),
                MarginEntry::new("tcs", dec!(3.5)),
                MarginEntry::new("SUSPENDED", Decimal::ZERO),
                MarginEntry::new("RELIANCE", dec!(2)),
            ],
        };
        (source, calls, failing)
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let (source, _, _) = fake();
        let cache = MarginCache::new(source, DEFAULT_CACHE_TTL);

        assert_eq!(cache.leverage_for(" reliance ").await.unwrap(), Some(dec!(4)));
        assert_eq!(cache.leverage_for("TCS").await.unwrap(), Some(dec!(3.5)));
        assert_eq!(cache.leverage_for("SUSPENDED").await.unwrap(), None);
        assert_eq!(cache.leverage_for("UNKNOWN").await.unwrap(), None);
        assert_eq!(cache.entries().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_serves_from_cache_within_ttl() {
        let (source, calls, _) = fake();
        let cache = MarginCache::new(source, DEFAULT_CACHE_TTL);

        assert!(!cache.is_fresh().await);
        cache.leverage_for("RELIANCE").await.unwrap();
        cache.leverage_for("TCS").await.unwrap();
        cache.entries().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_fresh().await);

        cache.invalidate().await;
        cache.leverage_for("RELIANCE").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refetches_after_expiry() {
        let (source, calls, _) = fake();
        let cache = MarginCache::new(source, Duration::ZERO);

        cache.leverage_for("RELIANCE").await.unwrap();
        cache.leverage_for("RELIANCE").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_list_survives_failed_refresh() {
        let (source, calls, failing) = fake();
        let cache = MarginCache::new(source, Duration::ZERO);

        assert_eq!(cache.leverage_for("TCS").await.unwrap(), Some(dec!(3.5)));

        failing.store(true, Ordering::SeqCst);
        assert_eq!(cache.leverage_for("TCS").await.unwrap(), Some(dec!(3.5)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_error_without_cached_list() {
        let (source, _, failing) = fake();
        failing.store(true, Ordering::SeqCst);
        let cache = MarginCache::new(source, DEFAULT_CACHE_TTL);

        assert!(cache.leverage_for("TCS").await.is_err());
    }
}
