use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// One daily OHLCV bar as reported by a market data source.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no price data found for symbol {0}")]
    NotFound(String),

    #[error("rate limited")]
    RateLimited,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Daily bars covering roughly the last `days` calendar days.
    ///
    /// Bars may arrive unordered or with duplicate dates; callers normalise.
    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<ExternalBar>, PriceProviderError>;

    fn name(&self) -> &'static str;
}
