mod price_bar;
mod prediction;
mod stock_info;

pub use price_bar::{EnrichedBar, EnrichedSeries, PriceBar, PriceSeries};
pub use prediction::{
    forecast_horizon, PredictionRecord, PredictionRequest, PredictionResponse, PredictionResult,
    PriceWindow, Recommendation, Timeframe, TrendDirection, DEFAULT_FORECAST_DAYS,
};
pub use stock_info::{StockInfo, StockList};
