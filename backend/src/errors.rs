use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Failure of a single analysis stage
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("Insufficient data for {stage}: need at least {required} rows, got {actual}")]
    InsufficientData {
        stage: &'static str,
        required: usize,
        actual: usize,
    },

    /// An indicator evaluated to NaN even though enough rows were present
    #[error("Invalid indicators: {0}")]
    InvalidIndicators(String),

    /// The data source returned nothing, or the symbol is unknown to it
    #[error("{0}")]
    AcquisitionFailure(String),

    #[error("Invalid price series: {0}")]
    InvalidSeries(String),
}

impl PredictionError {
    pub fn insufficient(stage: &'static str, required: usize, actual: usize) -> Self {
        PredictionError::InsufficientData { stage, required, actual }
    }
}

/// The single failure kind the prediction pipeline reports to its caller.
#[derive(Debug, Clone, Error)]
#[error("Prediction failed for {symbol}: {reason}")]
pub struct PredictionFailed {
    pub symbol: String,
    #[source]
    pub reason: PredictionError,
}

impl PredictionFailed {
    pub fn new(symbol: impl Into<String>, reason: PredictionError) -> Self {
        Self { symbol: symbol.into(), reason }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rate limited by external provider")]
    RateLimited,
    #[error("External error: {0}")]
    External(String),
    #[error(transparent)]
    Prediction(#[from] PredictionFailed),
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

fn error_response(status: StatusCode, kind: &'static str, message: impl Into<String>) -> axum::response::Response {
    (status, Json(ErrorBody { error: message.into(), kind })).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Validation(msg) => error_response(StatusCode::BAD_REQUEST, "validation_error", msg),
            AppError::Prediction(failed) => {
                error_response(StatusCode::BAD_REQUEST, "validation_error", format!("Validation error: {}", failed))
            }
            AppError::RateLimited => {
                let mut headers = HeaderMap::new();
                headers.insert("Retry-After", HeaderValue::from_static("60"));
                let body = ErrorBody { error: "Rate limited".to_string(), kind: "rate_limited" };
                (StatusCode::TOO_MANY_REQUESTS, headers, Json(body)).into_response()
            }
            AppError::External(msg) => {
                error!("External provider failure: {}", msg);
                error_response(StatusCode::BAD_GATEWAY, "server_error", "Market data provider unavailable")
            }
            AppError::Db(e) => {
                error!("Database failure: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "server_error", "Internal server error")
            }
            AppError::Internal(msg) => {
                error!("Internal failure: {}", msg);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "server_error", "Internal server error")
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        AppError::Validation(value)
    }
}
