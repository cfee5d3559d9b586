use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Forecast length used when the caller asks for a timeframe we don't know.
pub const DEFAULT_FORECAST_DAYS: usize = 30;

/// Direction of the recent price trend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TrendDirection {
    #[serde(rename = "UP")]
    Up,

    #[serde(rename = "DOWN")]
    Down,

    #[serde(rename = "SIDEWAYS")]
    Sideways,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "UP"),
            TrendDirection::Down => write!(f, "DOWN"),
            TrendDirection::Sideways => write!(f, "SIDEWAYS"),
        }
    }
}

/// Action suggested to the user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Recommendation {
    #[serde(rename = "BUY")]
    Buy,

    #[serde(rename = "SELL")]
    Sell,

    #[serde(rename = "HOLD")]
    Hold,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::Buy => write!(f, "BUY"),
            Recommendation::Sell => write!(f, "SELL"),
            Recommendation::Hold => write!(f, "HOLD"),
        }
    }
}

/// Forecast horizon bucket requested by the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Timeframe {
    #[serde(rename = "1d")]
    OneDay,

    #[serde(rename = "1w")]
    OneWeek,

    #[serde(rename = "1m")]
    OneMonth,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::OneDay, Timeframe::OneWeek, Timeframe::OneMonth];

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1d" => Some(Timeframe::OneDay),
            "1w" => Some(Timeframe::OneWeek),
            "1m" => Some(Timeframe::OneMonth),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Timeframe::OneDay => "1d",
            Timeframe::OneWeek => "1w",
            Timeframe::OneMonth => "1m",
        }
    }

    /// Number of daily forecast steps for this bucket.
    pub fn horizon_days(&self) -> usize {
        match self {
            Timeframe::OneDay => 1,
            Timeframe::OneWeek => 7,
            Timeframe::OneMonth => 30,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Forecast steps for a raw timeframe code; unknown codes get 30 days.
pub fn forecast_horizon(timeframe: &str) -> usize {
    Timeframe::from_code(timeframe)
        .map(|t| t.horizon_days())
        .unwrap_or(DEFAULT_FORECAST_DAYS)
}

/// Parallel date/price columns, as charted by the frontend.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceWindow {
    pub dates: Vec<String>,
    pub prices: Vec<f64>,
}

impl PriceWindow {
    pub fn last_price(&self) -> Option<f64> {
        self.prices.last().copied()
    }

    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.dates
            .iter()
            .map(String::as_str)
            .zip(self.prices.iter().copied())
    }
}

/// Outcome of one trend analysis. Built once and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub symbol: String,
    pub timeframe: String,

    /// Up to 60 most recent closes after indicator warm-up
    pub historical_window: PriceWindow,

    /// One simulated price per forecast day
    pub forecast_window: PriceWindow,

    pub trend_direction: TrendDirection,

    /// Heuristic confidence in [0.30, 0.95]
    pub confidence_score: f64,

    pub recommendation: Recommendation,
    pub current_price: f64,
    pub predicted_end_price: f64,
    pub expected_return_pct: f64,
    pub model_used: String,
    pub generated_at: DateTime<Utc>,
}

/// Archived prediction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: PredictionResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionRequest {
    pub symbol: String,
    pub timeframe: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    #[serde(flatten)]
    pub result: PredictionResult,

    /// Present when the prediction was archived on this request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_id: Option<Uuid>,
}
