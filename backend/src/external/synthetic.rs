use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::external::price_provider::{ExternalBar, PriceProvider, PriceProviderError};

/// Offline price source: a seeded random walk over weekdays.
///
/// The walk for a symbol depends only on the seed, the symbol and the end
/// date, so repeated calls on the same day return the same bars.
pub struct SyntheticProvider {
    seed: u64,
    end: Option<NaiveDate>,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self { seed, end: None }
    }

    /// Pin the last generated bar to `end` instead of today.
    pub fn ending_on(seed: u64, end: NaiveDate) -> Self {
        Self { seed, end: Some(end) }
    }

    fn symbol_seed(&self, symbol: &str) -> u64 {
        // FNV-1a over the symbol, mixed with the configured seed
        symbol
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64 ^ self.seed, |h, b| {
                (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
            })
    }

    fn generate(&self, symbol: &str, days: u32) -> Vec<ExternalBar> {
        let end = self.end.unwrap_or_else(|| Utc::now().date_naive());
        let start = end - Duration::days(days as i64);
        let mut rng = StdRng::seed_from_u64(self.symbol_seed(symbol));

        let mut current = 50.0 + rng.random::<f64>() * 150.0;
        let mut bars = Vec::new();
        let mut date = start;

        while date <= end {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                let open = current;
                current *= 1.0 + (rng.random::<f64>() - 0.5) * 0.02;
                let spread = current * rng.random::<f64>() * 0.01;

                bars.push(ExternalBar {
                    date,
                    open,
                    high: open.max(current) + spread,
                    low: (open.min(current) - spread).max(0.01),
                    close: current,
                    volume: (1_000_000.0 + rng.random::<f64>() * 4_000_000.0).round(),
                });
            }
            date += Duration::days(1);
        }

        bars
    }
}

#[async_trait]
impl PriceProvider for SyntheticProvider {
    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<ExternalBar>, PriceProviderError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(PriceProviderError::NotFound(symbol.to_string()));
        }
        Ok(self.generate(&symbol.to_uppercase(), days))
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
