use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::sample::Sample;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Client for 5-minute quotes covering the last three sessions
#[derive(Clone)]
pub struct QuoteClient {
    client: reqwest::Client,
    base_url: String,
}

impl QuoteClient {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_base_url(YAHOO_CHART_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> anyhow::Result<Self> {
        // The chart endpoint refuses requests without a user agent
        let client = reqwest::Client::builder()
            .user_agent("cupscreener/0.1")
            .build()
            .context("failed to build quote HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch close prices at 5-minute resolution for the last 3 days
    pub async fn fetch_recent(&self, symbol: &str) -> anyhow::Result<Vec<Sample>> {
        let url = format!("{}/{}", self.base_url, symbol);

        let envelope = self
            .client
            .get(&url)
            .query(&[("range", "3d"), ("interval", "5m")])
            .send()
            .await
            .with_context(|| format!("request for {symbol} failed"))?
            .error_for_status()
            .with_context(|| format!("quote endpoint rejected {symbol}"))?
            .json::<ChartEnvelope>()
            .await
            .with_context(|| format!("malformed chart payload for {symbol}"))?;

        samples_from_chart(envelope)
    }
}

fn samples_from_chart(envelope: ChartEnvelope) -> anyhow::Result<Vec<Sample>> {
    if let Some(error) = envelope.chart.error {
        anyhow::bail!("chart error {}: {}", error.code, error.description);
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .context("chart payload has no result")?;
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|quote| quote.close)
        .unwrap_or_default();

    // Intervals without trades come back as null closes
    let samples = result
        .timestamp
        .into_iter()
        .zip(closes)
        .filter_map(|(seconds, close)| {
            let price = close.filter(|price| price.is_finite() && *price > 0.0)?;
            let timestamp = DateTime::<Utc>::from_timestamp(seconds, 0)?;
            Some(Sample::new(timestamp, price))
        })
        .collect();

    Ok(samples)
}
