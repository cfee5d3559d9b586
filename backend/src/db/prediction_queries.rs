use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::{PredictionRecord, PredictionResult};

#[derive(Debug, FromRow)]
struct PredictionRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    payload: Json<PredictionResult>,
}

impl From<PredictionRow> for PredictionRecord {
    fn from(row: PredictionRow) -> Self {
        PredictionRecord {
            id: row.id,
            created_at: row.created_at,
            result: row.payload.0,
        }
    }
}

pub async fn insert_prediction(
    pool: &PgPool,
    result: &PredictionResult,
) -> Result<PredictionRecord, sqlx::Error> {
    let row = sqlx::query_as::<_, PredictionRow>(
        r#"
        INSERT INTO stock_predictions
            (id, symbol, timeframe, trend_direction, recommendation,
             confidence_score, expected_return_pct, payload, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, created_at, payload
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&result.symbol)
    .bind(&result.timeframe)
    .bind(result.trend_direction.to_string())
    .bind(result.recommendation.to_string())
    .bind(result.confidence_score)
    .bind(result.expected_return_pct)
    .bind(Json(result))
    .bind(result.generated_at)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// Newest first.
pub async fn fetch_recent(
    pool: &PgPool,
    symbol: &str,
    limit: i64,
) -> Result<Vec<PredictionRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PredictionRow>(
        r#"
        SELECT id, created_at, payload
        FROM stock_predictions
        WHERE symbol = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(symbol)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PredictionRecord::from).collect())
}

pub async fn fetch_latest(
    pool: &PgPool,
    symbol: &str,
    timeframe: &str,
) -> Result<Option<PredictionRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, PredictionRow>(
        r#"
        SELECT id, created_at, payload
        FROM stock_predictions
        WHERE symbol = $1 AND timeframe = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(symbol)
    .bind(timeframe)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(PredictionRecord::from))
}
