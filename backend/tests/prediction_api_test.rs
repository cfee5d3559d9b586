//! End-to-end tests for the `/api/prediction` routes, driven through the
//! router with a deterministic in-process price source.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use financogram_backend::app::create_app;
use financogram_backend::config::AppConfig;
use financogram_backend::external::price_provider::{ExternalBar, PriceProvider, PriceProviderError};
use financogram_backend::external::synthetic::SyntheticProvider;
use financogram_backend::services::prediction_history::InMemoryPredictionHistory;
use financogram_backend::state::AppState;

/// Synthetic bars, except for a few symbols wired to fail.
struct TestProvider {
    inner: SyntheticProvider,
}

#[async_trait]
impl PriceProvider for TestProvider {
    async fn fetch_daily_bars(&self, symbol: &str, days: u32) -> Result<Vec<ExternalBar>, PriceProviderError> {
        match symbol {
            "NODATA" => Err(PriceProviderError::NotFound(symbol.to_string())),
            "DOWN" => Err(PriceProviderError::Network("connection refused".into())),
            "SHORT" => {
                let bars = self.inner.fetch_daily_bars(symbol, days).await?;
                Ok(bars.into_iter().rev().take(40).collect())
            }
            _ => self.inner.fetch_daily_bars(symbol, days).await,
        }
    }

    fn name(&self) -> &'static str {
        "test"
    }
}

fn test_app() -> Router {
    let config = AppConfig {
        symbols: ["AAPL", "MSFT", "NODATA", "DOWN", "SHORT"].iter().map(|s| s.to_string()).collect(),
        seed: Some(7),
        history_limit: 3,
        ..AppConfig::default()
    };

    let provider = TestProvider {
        inner: SyntheticProvider::ending_on(7, NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()),
    };

    let state = AppState::new(config, Arc::new(provider), Arc::new(InMemoryPredictionHistory::new()));
    create_app(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>, Option<String>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec(), disposition)
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes, _) = send(app, method, uri, body).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn predict(app: &Router, symbol: &str, timeframe: &str) -> (StatusCode, Value) {
    send_json(app, Method::POST, "/api/prediction/predict", Some(json!({ "symbol": symbol, "timeframe": timeframe }))).await
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body, _) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_list_stocks() {
    let app = test_app();
    let (status, body) = send_json(&app, Method::GET, "/api/prediction/stocks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stocks"][0], "AAPL");
    assert_eq!(body["stocks"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_predict_returns_full_result() {
    let app = test_app();
    let (status, body) = predict(&app, "aapl", "1w").await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["symbol"], "AAPL");
    assert_eq!(body["timeframe"], "1w");
    assert_eq!(body["forecastWindow"]["prices"].as_array().unwrap().len(), 7);
    assert_eq!(body["historicalWindow"]["prices"].as_array().unwrap().len(), 60);
    assert_eq!(body["modelUsed"], "trend-extrapolation");
    assert!(body["predictionId"].is_string());

    let confidence = body["confidenceScore"].as_f64().unwrap();
    assert!((0.30..=0.95).contains(&confidence));
    assert!(["UP", "DOWN", "SIDEWAYS"].contains(&body["trendDirection"].as_str().unwrap()));
    assert!(["BUY", "SELL", "HOLD"].contains(&body["recommendation"].as_str().unwrap()));
}

#[tokio::test]
async fn test_second_request_is_served_from_cache() {
    let app = test_app();
    let (_, first) = predict(&app, "MSFT", "1m").await;
    let (status, second) = predict(&app, "MSFT", "1m").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["forecastWindow"], second["forecastWindow"]);
    assert_eq!(first["generatedAt"], second["generatedAt"]);
    // cache hits are not archived again
    assert!(second.get("predictionId").is_none());

    let (_, history) = send_json(&app, Method::GET, "/api/prediction/history/MSFT", None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_request_validation() {
    let app = test_app();

    for (symbol, timeframe) in [("", "1w"), ("ABCDEFGHIJK", "1w"), ("AAPL", "3y"), ("TSLA", "1d")] {
        let (status, body) = predict(&app, symbol, timeframe).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", symbol, timeframe);
        assert_eq!(body["type"], "validation_error");
    }
}

#[tokio::test]
async fn test_pipeline_failures_are_bad_requests() {
    let app = test_app();

    let (status, body) = predict(&app, "SHORT", "1w").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("SHORT"), "{}", message);
    assert!(message.contains("Insufficient data"), "{}", message);

    let (status, _) = predict(&app, "NODATA", "1w").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = predict(&app, "DOWN", "1w").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["type"], "server_error");
}

#[tokio::test]
async fn test_history_is_newest_first_and_limited() {
    let app = test_app();
    for timeframe in ["1d", "1w", "1m"] {
        let (status, _) = predict(&app, "AAPL", timeframe).await;
        assert_eq!(status, StatusCode::OK);
    }
    // second symbol must not leak into AAPL history
    predict(&app, "MSFT", "1d").await;

    let (status, body) = send_json(&app, Method::GET, "/api/prediction/history/aapl", None).await;
    assert_eq!(status, StatusCode::OK);

    let timeframes: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["timeframe"].as_str().unwrap())
        .collect();
    assert_eq!(timeframes, vec!["1m", "1w", "1d"]);
}

#[tokio::test]
async fn test_download_csv() {
    let app = test_app();

    let (status, _, _) = send(&app, Method::GET, "/api/prediction/download/AAPL/1w", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    predict(&app, "AAPL", "1w").await;
    let (status, body, disposition) = send(&app, Method::GET, "/api/prediction/download/aapl/1w", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(disposition.unwrap(), "attachment; filename=\"AAPL_1w_prediction.csv\"");

    let csv = String::from_utf8(body).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Date,Historical Price,Predicted Price,Type");
    assert_eq!(lines.iter().filter(|l| l.ends_with(",Historical")).count(), 60);
    assert_eq!(lines.iter().filter(|l| l.ends_with(",Predicted")).count(), 7);
    assert!(lines.contains(&"Summary"));
    assert!(lines.contains(&"Symbol,AAPL"));
}

#[tokio::test]
async fn test_stock_info() {
    let app = test_app();

    let (status, body) = send_json(&app, Method::GET, "/api/prediction/stock/msft/info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "MSFT");
    assert_eq!(body["lastUpdated"], "2024-06-28");
    assert!(body["high52w"].as_f64().unwrap() >= body["currentPrice"].as_f64().unwrap());
    assert!(body["low52w"].as_f64().unwrap() <= body["currentPrice"].as_f64().unwrap());

    let (status, _) = send_json(&app, Method::GET, "/api/prediction/stock/NODATA/info", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_multi_stock_info_skips_failures() {
    let app = test_app();
    let (status, body) =
        send_json(&app, Method::GET, "/api/prediction/stocks/info?symbols=AAPL,NODATA,MSFT", None).await;

    assert_eq!(status, StatusCode::OK);
    let symbols: Vec<&str> = body.as_array().unwrap().iter().map(|i| i["symbol"].as_str().unwrap()).collect();
    assert_eq!(symbols, vec!["AAPL", "MSFT"]);
}

#[tokio::test]
async fn test_clear_cache_reports_expired_count() {
    let app = test_app();
    predict(&app, "AAPL", "1d").await;

    let (status, body) = send_json(&app, Method::DELETE, "/api/prediction/cache/clear", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clearedCount"], 0);
    assert_eq!(body["message"], "Cleared 0 expired cache entries");
}
