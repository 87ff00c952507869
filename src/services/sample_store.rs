use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;

use crate::models::sample::Sample;

/// Read side of the rolling quote window
pub trait SampleSource: Send + Sync {
    /// Time-ordered, deduplicated samples covering the retained trading days
    fn get_recent_samples(&self, symbol: &str) -> Vec<Sample>;
}

pub type SharedSampleSource = Arc<dyn SampleSource>;

/// In-memory store keeping the last `retention_days` trading days per symbol
#[derive(Debug)]
pub struct RollingSampleStore {
    retention_days: usize,
    series: RwLock<HashMap<String, VecDeque<Sample>>>,
}

impl RollingSampleStore {
    pub fn new(retention_days: usize) -> Self {
        Self {
            retention_days: retention_days.max(1),
            series: RwLock::new(HashMap::new()),
        }
    }

    /// Merge freshly fetched samples for `symbol`.
    ///
    /// A sample with an already stored timestamp replaces the old one. Returns
    /// the number of samples retained afterwards.
    pub fn ingest(&self, symbol: &str, samples: Vec<Sample>) -> usize {
        let mut series = self
            .series
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let stored = series.entry(symbol.to_string()).or_default();

        let mut merged: Vec<Sample> = stored.drain(..).collect();
        merged.extend(samples);
        // Stable sort keeps arrival order among equal timestamps, so the newest wins below
        merged.sort_by_key(|sample| sample.timestamp);

        for sample in merged {
            match stored.back_mut() {
                Some(last) if last.timestamp == sample.timestamp => *last = sample,
                _ => stored.push_back(sample),
            }
        }

        evict_old_days(stored, self.retention_days);
        stored.len()
    }

    pub fn symbols(&self) -> Vec<String> {
        let series = self
            .series
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut symbols: Vec<String> = series.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

impl Default for RollingSampleStore {
    fn default() -> Self {
        Self::new(3)
    }
}

impl SampleSource for RollingSampleStore {
    fn get_recent_samples(&self, symbol: &str) -> Vec<Sample> {
        let series = self
            .series
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        series
            .get(symbol)
            .map(|stored| stored.iter().copied().collect())
            .unwrap_or_default()
    }
}

fn evict_old_days(stored: &mut VecDeque<Sample>, retention_days: usize) {
    let days: BTreeSet<NaiveDate> = stored.iter().map(trading_day).collect();
    if days.len() <= retention_days {
        return;
    }

    if let Some(first_kept) = days.iter().rev().nth(retention_days - 1).copied() {
        while stored
            .front()
            .map(|sample| trading_day(sample) < first_kept)
            .unwrap_or(false)
        {
            stored.pop_front();
        }
    }
}

fn trading_day(sample: &Sample) -> NaiveDate {
    sample.timestamp.date_naive()
}
