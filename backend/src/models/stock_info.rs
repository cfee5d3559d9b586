use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Snapshot of a symbol's latest trading day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockInfo {
    pub symbol: String,
    pub current_price: f64,

    /// Change against the previous close
    pub price_change: f64,
    pub price_change_pct: f64,

    pub volume: u64,

    #[serde(rename = "high52w")]
    pub high_52w: f64,

    #[serde(rename = "low52w")]
    pub low_52w: f64,

    pub last_updated: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockList {
    pub stocks: Vec<String>,
}
