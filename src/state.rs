use std::sync::Arc;

use crate::business_logic::config::ThresholdConfig;
use crate::services::sample_store::SharedSampleSource;

#[derive(Clone)]
pub struct AppState {
    pub samples: SharedSampleSource,
    pub thresholds: Arc<ThresholdConfig>,
    pub symbols: Arc<Vec<String>>,
}

impl AppState {
    pub fn is_tracked(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|tracked| tracked == symbol)
    }
}
