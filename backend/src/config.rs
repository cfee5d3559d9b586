use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{bail, Context};

/// Symbols offered for prediction when `PREDICTION_SYMBOLS` is unset.
pub const DEFAULT_SYMBOLS: [&str; 24] = [
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "META", "NVDA", "NFLX", "AMD", "INTC", "CRM", "ORCL",
    "ADBE", "PYPL", "UBER", "LYFT", "SPY", "QQQ", "IWM", "GLD", "SLV", "USO", "TLT", "VTI",
];

/// Shortest lookback that still yields enough trading days to survive
/// indicator warm-up (69 bars).
pub const MIN_LOOKBACK_DAYS: u32 = 100;

/// Longest symbol accepted by the prediction API.
pub const MAX_SYMBOL_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Yahoo,
    Synthetic,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "synthetic" => Ok(ProviderKind::Synthetic),
            other => bail!("Invalid PRICE_PROVIDER: {}. Must be 'yahoo' or 'synthetic'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub provider: ProviderKind,
    pub cache_ttl_secs: i64,
    pub lookback_days: u32,
    pub history_limit: usize,
    pub symbols: Vec<String>,
    pub seed: Option<u64>,
    pub max_concurrent_fetches: usize,
    pub requests_per_minute: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            provider: ProviderKind::Yahoo,
            cache_ttl_secs: 3600,
            lookback_days: 365,
            history_limit: 10,
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            seed: None,
            max_concurrent_fetches: 4,
            requests_per_minute: 120,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", name, raw, e)),
        None => Ok(None),
    }
}

/// Comma-separated symbols, trimmed and uppercased, blanks dropped.
pub fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            bind_addr: parse_env("BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            database_url: env_var("DATABASE_URL"),
            provider: parse_env("PRICE_PROVIDER")?.unwrap_or(defaults.provider),
            cache_ttl_secs: parse_env("PREDICTION_CACHE_TTL_SECS")?.unwrap_or(defaults.cache_ttl_secs),
            lookback_days: parse_env("PREDICTION_LOOKBACK_DAYS")?.unwrap_or(defaults.lookback_days),
            history_limit: parse_env("PREDICTION_HISTORY_LIMIT")?.unwrap_or(defaults.history_limit),
            symbols: env_var("PREDICTION_SYMBOLS")
                .map(|raw| parse_symbols(&raw))
                .unwrap_or(defaults.symbols),
            seed: parse_env("PREDICTION_SEED")?,
            max_concurrent_fetches: parse_env("FETCH_MAX_CONCURRENT")?
                .unwrap_or(defaults.max_concurrent_fetches),
            requests_per_minute: parse_env("FETCH_REQUESTS_PER_MINUTE")?
                .unwrap_or(defaults.requests_per_minute),
        };

        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache_ttl_secs <= 0 {
            bail!("PREDICTION_CACHE_TTL_SECS must be positive");
        }
        if self.lookback_days < MIN_LOOKBACK_DAYS {
            bail!("PREDICTION_LOOKBACK_DAYS must be at least {}", MIN_LOOKBACK_DAYS);
        }
        if self.history_limit == 0 {
            bail!("PREDICTION_HISTORY_LIMIT must be at least 1");
        }
        if self.symbols.is_empty() {
            bail!("PREDICTION_SYMBOLS must name at least one symbol");
        }
        if let Some(bad) = self.symbols.iter().find(|s| s.len() > MAX_SYMBOL_LEN) {
            bail!("symbol {} is longer than {} characters", bad, MAX_SYMBOL_LEN);
        }
        if self.max_concurrent_fetches == 0 || self.requests_per_minute == 0 {
            bail!("FETCH_MAX_CONCURRENT and FETCH_REQUESTS_PER_MINUTE must be positive");
        }
        Ok(())
    }

    pub fn is_supported(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s.eq_ignore_ascii_case(symbol))
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs)
    }
}
