use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::{parse_symbols, MAX_SYMBOL_LEN};
use crate::errors::{AppError, PredictionError, PredictionFailed};
use crate::models::{
    PredictionRecord, PredictionRequest, PredictionResponse, StockInfo, StockList, Timeframe,
};
use crate::services::prediction_cache::PredictionKey;
use crate::services::{export_service, price_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stocks", get(list_stocks))
        .route("/stocks/info", get(get_stocks_info))
        .route("/stock/:symbol/info", get(get_stock_info))
        .route("/predict", post(generate_prediction))
        .route("/history/:symbol", get(get_prediction_history))
        .route("/download/:symbol/:timeframe", get(download_prediction))
        .route("/cache/clear", delete(clear_prediction_cache))
}

#[derive(Debug, Deserialize)]
pub struct StocksInfoQuery {
    /// Comma-separated symbols; defaults to every supported symbol
    symbols: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheClearResponse {
    message: String,
    cleared_count: usize,
}

pub async fn list_stocks(State(state): State<AppState>) -> Json<StockList> {
    info!("GET /api/prediction/stocks - {} symbols", state.config.symbols.len());
    Json(StockList {
        stocks: state.config.symbols.clone(),
    })
}

/// Unknown symbols surface as 404 here rather than 400.
fn not_found_if_missing(err: AppError) -> AppError {
    match err {
        AppError::Prediction(PredictionFailed {
            reason: PredictionError::AcquisitionFailure(msg),
            ..
        }) => AppError::NotFound(msg),
        other => other,
    }
}

pub async fn get_stock_info(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StockInfo>, AppError> {
    let symbol = symbol.trim().to_uppercase();
    info!("GET /api/prediction/stock/{}/info", symbol);

    let info = price_service::get_stock_info(state.price_provider.as_ref(), &symbol)
        .await
        .map_err(|e| {
            error!("Failed to fetch stock info for {}: {}", symbol, e);
            not_found_if_missing(e)
        })?;

    Ok(Json(info))
}

pub async fn get_stocks_info(
    Query(query): Query<StocksInfoQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StockInfo>>, AppError> {
    let symbols = match query.symbols.as_deref() {
        Some(raw) => parse_symbols(raw),
        None => state.config.symbols.clone(),
    };
    info!("GET /api/prediction/stocks/info - {} symbols", symbols.len());

    if symbols.is_empty() {
        return Err(AppError::Validation("No symbols given".to_string()));
    }

    let infos = price_service::get_stock_infos(
        state.price_provider.as_ref(),
        &state.rate_limiter,
        &symbols,
    )
    .await;

    info!("Fetched stock info for {} of {} symbols", infos.len(), symbols.len());
    Ok(Json(infos))
}

fn validate_request(state: &AppState, request: &PredictionRequest) -> Result<(String, Timeframe), AppError> {
    let symbol = request.symbol.trim().to_uppercase();

    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN {
        return Err(AppError::Validation(format!(
            "Symbol must be between 1 and {} characters",
            MAX_SYMBOL_LEN
        )));
    }

    let timeframe = Timeframe::from_code(&request.timeframe).ok_or_else(|| {
        AppError::Validation(format!(
            "Invalid timeframe '{}'. Must be one of 1d, 1w, 1m",
            request.timeframe
        ))
    })?;

    if !state.config.is_supported(&symbol) {
        return Err(AppError::Validation(format!(
            "Stock {} is not available for prediction. Available stocks: {}",
            symbol,
            state.config.symbols.join(", ")
        )));
    }

    Ok((symbol, timeframe))
}

pub async fn generate_prediction(
    State(state): State<AppState>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictionResponse>, AppError> {
    info!("POST /api/prediction/predict - {:?}", request);

    let (symbol, timeframe) = validate_request(&state, &request).map_err(|e| {
        error!("Rejected prediction request {:?}: {}", request, e);
        e
    })?;

    let key = PredictionKey::new(&symbol, timeframe.code());
    if let Some(cached) = state.prediction_cache.get(&key).await {
        info!("Returning cached prediction for {}", key);
        return Ok(Json(PredictionResponse {
            result: cached,
            prediction_id: None,
        }));
    }

    info!("Generating new prediction for {}", key);
    let series = price_service::fetch_series(
        state.price_provider.as_ref(),
        &symbol,
        state.config.lookback_days,
    )
    .await?;

    let result = state
        .engine
        .predict(&series, timeframe.code(), Utc::now().date_naive())
        .map_err(|e| {
            error!("{}", e);
            AppError::from(e)
        })?;

    let prediction_id = match state.history.append(&result).await {
        Ok(record) => {
            info!("Prediction saved with ID: {}", record.id);
            Some(record.id)
        }
        Err(e) => {
            warn!("Could not archive prediction for {}: {}", key, e);
            None
        }
    };

    state
        .prediction_cache
        .put(key.clone(), result.clone(), state.config.cache_ttl())
        .await;
    info!("Prediction cached for {}", key);

    Ok(Json(PredictionResponse { result, prediction_id }))
}

pub async fn get_prediction_history(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PredictionRecord>>, AppError> {
    let symbol = symbol.trim().to_uppercase();
    info!("GET /api/prediction/history/{}", symbol);

    let records = state
        .history
        .recent(&symbol, state.config.history_limit)
        .await
        .map_err(|e| {
            error!("Failed to fetch prediction history for {}: {}", symbol, e);
            e
        })?;

    Ok(Json(records))
}

pub async fn download_prediction(
    Path((symbol, timeframe)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let symbol = symbol.trim().to_uppercase();
    info!("GET /api/prediction/download/{}/{}", symbol, timeframe);

    let record = state
        .history
        .latest(&symbol, &timeframe)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No prediction found for {} ({})", symbol, timeframe)))?;

    let body = export_service::prediction_csv(&record)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_service::export_filename(&symbol, &timeframe)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

pub async fn clear_prediction_cache(State(state): State<AppState>) -> Json<CacheClearResponse> {
    let cleared = state.prediction_cache.purge_expired().await;
    info!("DELETE /api/prediction/cache/clear - removed {} entries", cleared);

    Json(CacheClearResponse {
        message: format!("Cleared {} expired cache entries", cleared),
        cleared_count: cleared,
    })
}
