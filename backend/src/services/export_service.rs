use csv::WriterBuilder;

use crate::errors::AppError;
use crate::models::PredictionRecord;

const PRICE_HEADER: [&str; 4] = ["Date", "Historical Price", "Predicted Price", "Type"];

/// Download file name for a prediction export.
pub fn export_filename(symbol: &str, timeframe: &str) -> String {
    format!("{}_{}_prediction.csv", symbol.to_uppercase(), timeframe)
}

fn csv_error(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("CSV export failed: {}", e))
}

/// Render an archived prediction as CSV.
///
/// First section holds one row per historical and forecast point, with `-`
/// in the column that does not apply. After a blank line a two-column
/// `Summary` section describes the prediction.
pub fn prediction_csv(record: &PredictionRecord) -> Result<String, AppError> {
    let result = &record.result;

    let mut prices = WriterBuilder::new().flexible(true).from_writer(Vec::new());
    prices.write_record(PRICE_HEADER).map_err(csv_error)?;

    for (date, price) in result.historical_window.points() {
        let price = format!("{:.2}", price);
        prices
            .write_record([date, price.as_str(), "-", "Historical"])
            .map_err(csv_error)?;
    }
    for (date, price) in result.forecast_window.points() {
        let price = format!("{:.2}", price);
        prices
            .write_record([date, "-", price.as_str(), "Predicted"])
            .map_err(csv_error)?;
    }

    let mut out = prices.into_inner().map_err(csv_error)?;
    out.push(b'\n');

    let generated = result.generated_at;
    let summary_rows: [(&str, String); 12] = [
        ("Symbol", result.symbol.clone()),
        ("Timeframe", result.timeframe.clone()),
        ("Current Price", format!("{:.2}", result.current_price)),
        ("Predicted End Price", format!("{:.2}", result.predicted_end_price)),
        ("Expected Return %", format!("{:.2}", result.expected_return_pct)),
        ("Trend Direction", result.trend_direction.to_string()),
        ("Confidence %", format!("{:.1}", result.confidence_score * 100.0)),
        ("Recommendation", result.recommendation.to_string()),
        ("Model Used", result.model_used.clone()),
        ("Prediction Id", record.id.to_string()),
        ("Generated Date", generated.format("%Y-%m-%d").to_string()),
        ("Generated Time", generated.format("%H:%M:%S").to_string()),
    ];

    let mut summary = WriterBuilder::new().flexible(true).from_writer(out);
    summary.write_record(["Summary"]).map_err(csv_error)?;
    for (label, value) in summary_rows.iter() {
        summary.write_record([*label, value.as_str()]).map_err(csv_error)?;
    }

    let bytes = summary.into_inner().map_err(csv_error)?;
    String::from_utf8(bytes).map_err(csv_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PredictionResult, PriceWindow, Recommendation, TrendDirection};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn record() -> PredictionRecord {
        let generated_at = Utc.with_ymd_and_hms(2024, 6, 3, 14, 5, 9).unwrap();
        PredictionRecord {
            id: Uuid::new_v4(),
            created_at: generated_at,
            result: PredictionResult {
                symbol: "AAPL".to_string(),
                timeframe: "1w".to_string(),
                historical_window: PriceWindow {
                    dates: vec!["2024-05-30".into(), "2024-05-31".into()],
                    prices: vec![190.5, 191.25],
                },
                forecast_window: PriceWindow {
                    dates: vec!["2024-06-04".into()],
                    prices: vec![194.1],
                },
                trend_direction: TrendDirection::Up,
                confidence_score: 0.734,
                recommendation: Recommendation::Buy,
                current_price: 191.25,
                predicted_end_price: 194.1,
                expected_return_pct: 1.49,
                model_used: "trend-extrapolation".to_string(),
                generated_at,
            },
        }
    }

    #[test]
    fn test_price_rows_then_summary() {
        let csv = prediction_csv(&record()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Date,Historical Price,Predicted Price,Type");
        assert_eq!(lines[1], "2024-05-30,190.50,-,Historical");
        assert_eq!(lines[2], "2024-05-31,191.25,-,Historical");
        assert_eq!(lines[3], "2024-06-04,-,194.10,Predicted");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "Summary");
        assert!(lines.contains(&"Symbol,AAPL"));
        assert!(lines.contains(&"Trend Direction,UP"));
        assert!(lines.contains(&"Confidence %,73.4"));
        assert!(lines.contains(&"Generated Date,2024-06-03"));
        assert!(lines.contains(&"Generated Time,14:05:09"));
    }

    #[test]
    fn test_filename() {
        assert_eq!(export_filename("aapl", "1m"), "AAPL_1m_prediction.csv");
    }
}
