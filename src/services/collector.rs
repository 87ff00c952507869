use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::business_logic::cup_handle::{CupHandleDetector, CupHandleMatch};
use crate::business_logic::detector::{Detection, PatternDetector};
use crate::services::quotes::QuoteClient;
use crate::services::sample_store::{RollingSampleStore, SampleSource};

/// Periodically refreshes the rolling store for every tracked symbol
pub struct CollectorService {
    client: QuoteClient,
    store: Arc<RollingSampleStore>,
    detector: CupHandleDetector,
    symbols: Vec<String>,
    period: Duration,
}

impl CollectorService {
    pub fn new(
        client: QuoteClient,
        store: Arc<RollingSampleStore>,
        detector: CupHandleDetector,
        symbols: Vec<String>,
        period: Duration,
    ) -> Self {
        Self {
            client,
            store,
            detector,
            symbols,
            period,
        }
    }

    /// Fetch forever; the first cycle runs immediately
    pub async fn run(&self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.collect_all().await;
        }
    }

    pub async fn collect_all(&self) {
        for symbol in &self.symbols {
            if let Err(e) = self.collect(symbol).await {
                tracing::error!("Failed to refresh {}: {:#}", symbol, e);
            }
        }

        tracing::info!(
            "Collection cycle done ({} symbols stored)",
            self.store.symbols().len()
        );
    }

    async fn collect(&self, symbol: &str) -> anyhow::Result<()> {
        let samples = self.client.fetch_recent(symbol).await?;
        let fetched = samples.len();
        let retained = self.store.ingest(symbol, samples);

        tracing::debug!(
            "[{}] fetched {} samples, {} retained",
            symbol,
            fetched,
            retained
        );

        self.log_detection(symbol);
        Ok(())
    }

    fn log_detection(&self, symbol: &str) {
        let samples = self.store.get_recent_samples(symbol);
        match self.detector.detect(&samples) {
            Ok(Detection::Match(found)) => log_match(symbol, &found),
            Ok(Detection::NoMatch(rejection)) => {
                tracing::debug!("[{}] no cup-and-handle: {:?}", symbol, rejection);
            }
            Err(e) => {
                tracing::debug!("[{}] detection skipped: {}", symbol, e);
            }
        }
    }
}

fn log_match(symbol: &str, found: &CupHandleMatch) {
    tracing::info!(
        "[{}] CUP-AND-HANDLE - rim ${:.2} at {}, cup depth {:.2}%, handle depth {:.2}%, recovery ${:.2} at {}",
        symbol,
        found.a.price,
        found.a.timestamp,
        found.cup_depth_pct,
        found.handle_depth_pct,
        found.e.price,
        found.e.timestamp
    );
}
