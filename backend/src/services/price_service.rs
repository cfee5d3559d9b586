use futures::future::join_all;
use tracing::{error, info, warn};

use crate::errors::{AppError, PredictionError, PredictionFailed};
use crate::external::price_provider::{ExternalBar, PriceProvider, PriceProviderError};
use crate::models::{PriceBar, PriceSeries, StockInfo};
use crate::services::forecasting_service::round_to;
use crate::services::rate_limiter::RateLimiter;

/// Fewest bars worth handing to the analyzer.
pub const MIN_ACQUIRED_BARS: usize = 20;

/// Lookback used for the 52-week range.
pub const STOCK_INFO_LOOKBACK_DAYS: u32 = 365;

fn acquisition_failed(symbol: &str, reason: PredictionError) -> AppError {
    AppError::Prediction(PredictionFailed::new(symbol, reason))
}

fn map_provider_error(symbol: &str, err: PriceProviderError) -> AppError {
    match err {
        PriceProviderError::RateLimited => AppError::RateLimited,
        PriceProviderError::NotFound(_) => acquisition_failed(
            symbol,
            PredictionError::AcquisitionFailure(format!("No data found for symbol {}", symbol)),
        ),
        other => AppError::External(other.to_string()),
    }
}

/// Sort by date and keep the last bar reported for any repeated date.
fn normalize(mut bars: Vec<ExternalBar>) -> Vec<PriceBar> {
    bars.sort_by_key(|b| b.date);

    let mut out: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for b in bars {
        let bar = PriceBar {
            date: b.date,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
        };
        match out.last_mut() {
            Some(prev) if prev.date == bar.date => *prev = bar,
            _ => out.push(bar),
        }
    }
    out
}

async fn fetch_bars(
    provider: &dyn PriceProvider,
    symbol: &str,
    lookback_days: u32,
) -> Result<PriceSeries, AppError> {
    let raw = provider
        .fetch_daily_bars(symbol, lookback_days)
        .await
        .map_err(|e| {
            error!("{} fetch failed for {}: {}", provider.name(), symbol, e);
            map_provider_error(symbol, e)
        })?;

    let bars = normalize(raw);
    if bars.is_empty() {
        warn!("No price data returned for {}", symbol);
        return Err(acquisition_failed(
            symbol,
            PredictionError::AcquisitionFailure(format!("No data found for symbol {}", symbol)),
        ));
    }

    PriceSeries::new(symbol, bars).map_err(|e| acquisition_failed(symbol, e))
}

/// Daily bars for `symbol` over the last `lookback_days`, ready for analysis.
pub async fn fetch_series(
    provider: &dyn PriceProvider,
    symbol: &str,
    lookback_days: u32,
) -> Result<PriceSeries, AppError> {
    let symbol = symbol.trim().to_uppercase();
    info!("Fetching {} days of prices for {} from {}", lookback_days, symbol, provider.name());

    let series = fetch_bars(provider, &symbol, lookback_days).await?;
    if series.len() < MIN_ACQUIRED_BARS {
        return Err(acquisition_failed(
            &symbol,
            PredictionError::insufficient("acquisition", MIN_ACQUIRED_BARS, series.len()),
        ));
    }

    info!("Fetched {} bars for {}", series.len(), symbol);
    Ok(series)
}

/// Latest-day snapshot plus the high/low over the whole series.
pub fn summarize(series: &PriceSeries) -> Result<StockInfo, PredictionError> {
    let bars = series.bars();
    if bars.len() < 2 {
        return Err(PredictionError::insufficient("stock info", 2, bars.len()));
    }

    let last = &bars[bars.len() - 1];
    let prev = &bars[bars.len() - 2];

    let change = last.close - prev.close;
    let change_pct = if prev.close != 0.0 { change / prev.close * 100.0 } else { 0.0 };

    let high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);

    Ok(StockInfo {
        symbol: series.symbol().to_string(),
        current_price: round_to(last.close, 2),
        price_change: round_to(change, 2),
        price_change_pct: round_to(change_pct, 2),
        volume: last.volume.max(0.0).round() as u64,
        high_52w: round_to(high, 2),
        low_52w: round_to(low, 2),
        last_updated: last.date,
    })
}

pub async fn get_stock_info(provider: &dyn PriceProvider, symbol: &str) -> Result<StockInfo, AppError> {
    let symbol = symbol.trim().to_uppercase();
    let series = fetch_bars(provider, &symbol, STOCK_INFO_LOOKBACK_DAYS).await?;
    summarize(&series).map_err(|e| acquisition_failed(&symbol, e))
}

/// Stock info for several symbols at once. Symbols that fail are logged and
/// left out; order follows the input.
pub async fn get_stock_infos(
    provider: &dyn PriceProvider,
    limiter: &RateLimiter,
    symbols: &[String],
) -> Vec<StockInfo> {
    let tasks = symbols.iter().map(|symbol| async move {
        let _guard = match limiter.acquire().await {
            Ok(guard) => guard,
            Err(e) => {
                error!("Rate limiter closed while fetching {}: {}", symbol, e);
                return None;
            }
        };

        match get_stock_info(provider, symbol).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Skipping stock info for {}: {}", symbol, e);
                None
            }
        }
    });

    join_all(tasks).await.into_iter().flatten().collect()
}
