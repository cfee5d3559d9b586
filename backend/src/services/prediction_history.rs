use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::prediction_queries;
use crate::errors::AppError;
use crate::models::{PredictionRecord, PredictionResult};

/// Append-only archive of generated predictions.
#[async_trait]
pub trait PredictionHistory: Send + Sync {
    async fn append(&self, result: &PredictionResult) -> Result<PredictionRecord, AppError>;

    /// Up to `limit` records for `symbol`, newest first.
    async fn recent(&self, symbol: &str, limit: usize) -> Result<Vec<PredictionRecord>, AppError>;

    async fn latest(&self, symbol: &str, timeframe: &str) -> Result<Option<PredictionRecord>, AppError>;
}

/// Records kept per (symbol, timeframe) unless told otherwise.
pub const DEFAULT_RECORDS_PER_KEY: usize = 10;

/// Used when no database is configured. Lost on restart.
///
/// Keeps at most `per_key` records for each (symbol, timeframe); appending
/// past that evicts the oldest record for the same pair. With `per_key` at
/// least the history limit, `recent` and `latest` see the same records an
/// unbounded store would return.
pub struct InMemoryPredictionHistory {
    records: RwLock<Vec<PredictionRecord>>,
    per_key: usize,
}

impl InMemoryPredictionHistory {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_RECORDS_PER_KEY)
    }

    pub fn with_limit(per_key: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            per_key: per_key.max(1),
        }
    }

    /// Number of records currently held.
    pub fn stored(&self) -> usize {
        self.records.read().len()
    }
}

impl Default for InMemoryPredictionHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PredictionHistory for InMemoryPredictionHistory {
    async fn append(&self, result: &PredictionResult) -> Result<PredictionRecord, AppError> {
        let record = PredictionRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            result: result.clone(),
        };
        let mut records = self.records.write();
        records.push(record.clone());

        let same_key = |r: &PredictionRecord| {
            r.result.symbol == result.symbol && r.result.timeframe == result.timeframe
        };
        let held = records.iter().filter(|&r| same_key(r)).count();
        if held > self.per_key {
            // insertion order is chronological, so the first match is the oldest
            if let Some(oldest) = records.iter().position(|r| same_key(r)) {
                records.remove(oldest);
            }
        }

        Ok(record)
    }

    async fn recent(&self, symbol: &str, limit: usize) -> Result<Vec<PredictionRecord>, AppError> {
        let symbol = symbol.to_uppercase();
        let records = self.records.read();

        // insertion order is chronological
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.result.symbol == symbol)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn latest(&self, symbol: &str, timeframe: &str) -> Result<Option<PredictionRecord>, AppError> {
        let symbol = symbol.to_uppercase();
        let records = self.records.read();

        Ok(records
            .iter()
            .rev()
            .find(|r| r.result.symbol == symbol && r.result.timeframe == timeframe)
            .cloned())
    }
}

/// Postgres-backed archive (`stock_predictions` table).
#[derive(Clone)]
pub struct PgPredictionHistory {
    pool: PgPool,
}

impl PgPredictionHistory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PredictionHistory for PgPredictionHistory {
    async fn append(&self, result: &PredictionResult) -> Result<PredictionRecord, AppError> {
        Ok(prediction_queries::insert_prediction(&self.pool, result).await?)
    }

    async fn recent(&self, symbol: &str, limit: usize) -> Result<Vec<PredictionRecord>, AppError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Ok(prediction_queries::fetch_recent(&self.pool, &symbol.to_uppercase(), limit).await?)
    }

    async fn latest(&self, symbol: &str, timeframe: &str) -> Result<Option<PredictionRecord>, AppError> {
        Ok(prediction_queries::fetch_latest(&self.pool, &symbol.to_uppercase(), timeframe).await?)
    }
}
