use std::time::Duration;

pub const DEFAULT_SYMBOLS: [&str; 7] = ["AAPL", "GOOGL", "MSFT", "AMZN", "NVDA", "META", "TSLA"];

/// Process settings read from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub symbols: Vec<String>,
    pub fetch_interval: Duration,
    pub retention_days: usize,
    pub log_dir: Option<String>,
    pub quotes_base_url: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:5001".to_string());

        let symbols = lookup("TRACKED_SYMBOLS")
            .map(|raw| parse_symbols(&raw))
            .filter(|symbols| !symbols.is_empty())
            .unwrap_or_else(|| DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect());

        let fetch_interval_secs = lookup("FETCH_INTERVAL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(300);

        let retention_days = lookup("RETENTION_DAYS")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|days| *days > 0)
            .unwrap_or(3);

        Self {
            bind_addr,
            symbols,
            fetch_interval: Duration::from_secs(fetch_interval_secs),
            retention_days,
            log_dir: lookup("LOG_DIR").filter(|dir| !dir.is_empty()),
            quotes_base_url: lookup("QUOTES_BASE_URL").filter(|url| !url.is_empty()),
        }
    }
}

fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
