use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::models::PredictionResult;

/// Cache key: uppercased symbol plus timeframe code, rendered `AAPL_1w`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PredictionKey {
    symbol: String,
    timeframe: String,
}

impl PredictionKey {
    pub fn new(symbol: &str, timeframe: &str) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            timeframe: timeframe.trim().to_string(),
        }
    }
}

impl std::fmt::Display for PredictionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.symbol, self.timeframe)
    }
}

/// Short-lived store of finished predictions.
#[async_trait]
pub trait PredictionCache: Send + Sync {
    /// Cached result if present and not yet expired.
    async fn get(&self, key: &PredictionKey) -> Option<PredictionResult>;

    /// Store a result for `ttl`. A later put for the same key wins.
    async fn put(&self, key: PredictionKey, result: PredictionResult, ttl: Duration);

    /// Drop expired entries and report how many were removed.
    async fn purge_expired(&self) -> usize;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: PredictionResult,
    expires_at: DateTime<Utc>,
}

/// Process-local cache
#[derive(Clone, Default)]
pub struct InMemoryPredictionCache {
    entries: Arc<DashMap<PredictionKey, CacheEntry>>,
}

impl InMemoryPredictionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PredictionCache for InMemoryPredictionCache {
    async fn get(&self, key: &PredictionKey) -> Option<PredictionResult> {
        if let Some(entry) = self.entries.get(key) {
            if Utc::now() < entry.expires_at {
                return Some(entry.result.clone());
            }
            // expired: drop the read guard before removing
            drop(entry);
            self.entries.remove(key);
        }
        None
    }

    async fn put(&self, key: PredictionKey, result: PredictionResult, ttl: Duration) {
        let entry = CacheEntry {
            result,
            expires_at: Utc::now() + ttl,
        };
        self.entries.insert(key, entry);
    }

    async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before.saturating_sub(self.entries.len())
    }
}
