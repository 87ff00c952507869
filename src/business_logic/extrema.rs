use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::business_logic::config::{required_samples, EdgePolicy};
use crate::business_logic::error::PatternError;
use crate::models::sample::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtremumKind {
    Max,
    Min,
}

/// A local turning point in a sample series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Extremum {
    /// Position in the series passed to the detector
    pub index: usize,
    pub kind: ExtremumKind,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Reject series the matcher cannot reason about
pub fn check_samples(samples: &[Sample]) -> Result<(), PatternError> {
    for (index, sample) in samples.iter().enumerate() {
        if !sample.price.is_finite() || sample.price <= 0.0 {
            return Err(PatternError::InvalidSample {
                index,
                reason: "price must be finite and positive",
            });
        }
        if index > 0 && samples[index - 1].timestamp >= sample.timestamp {
            return Err(PatternError::InvalidSample {
                index,
                reason: "timestamps must be strictly increasing",
            });
        }
    }
    Ok(())
}

/// Find every strict local max/min using `window_size` neighbors per side.
///
/// Ties anywhere in the window disqualify the point. Consecutive extrema of the
/// same kind are left in place.
pub fn find_extrema(
    samples: &[Sample],
    window_size: usize,
    edges: EdgePolicy,
) -> Result<Vec<Extremum>, PatternError> {
    let need = required_samples(window_size).ok_or_else(|| {
        PatternError::InvalidConfig(format!("window_size {window_size} is too large"))
    })?;
    if samples.len() < need {
        return Err(PatternError::InsufficientData {
            need,
            got: samples.len(),
        });
    }

    let last = samples.len() - 1;
    let range = match edges {
        EdgePolicy::Include => 0..=last,
        EdgePolicy::Exclude => window_size..=last - window_size,
    };

    let mut extrema = Vec::new();
    for i in range {
        let kind = if is_local_max(samples, i, window_size) {
            ExtremumKind::Max
        } else if is_local_min(samples, i, window_size) {
            ExtremumKind::Min
        } else {
            continue;
        };

        extrema.push(Extremum {
            index: i,
            kind,
            price: samples[i].price,
            timestamp: samples[i].timestamp,
        });
    }

    Ok(extrema)
}

fn neighbors(samples: &[Sample], i: usize, window_size: usize) -> impl Iterator<Item = f64> + '_ {
    let start = i.saturating_sub(window_size);
    let end = (i + window_size).min(samples.len() - 1);
    samples[start..i]
        .iter()
        .chain(&samples[i + 1..=end])
        .map(|s| s.price)
}

fn is_local_max(samples: &[Sample], i: usize, window_size: usize) -> bool {
    let price = samples[i].price;
    neighbors(samples, i, window_size).all(|p| p < price)
}

fn is_local_min(samples: &[Sample], i: usize, window_size: usize) -> bool {
    let price = samples[i].price;
    neighbors(samples, i, window_size).all(|p| p > price)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    pub(crate) fn make_samples(prices: &[f64]) -> Vec<Sample> {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 13, 30, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, price)| Sample::new(start + Duration::minutes(5 * i as i64), *price))
            .collect()
    }

    fn indices(extrema: &[Extremum]) -> Vec<(usize, ExtremumKind)> {
        extrema.iter().map(|e| (e.index, e.kind)).collect()
    }

    #[test]
    fn too_short_series_is_insufficient() {
        let samples = make_samples(&[1.0, 2.0, 3.0, 4.0]);
        let error = find_extrema(&samples, 2, EdgePolicy::Include).unwrap_err();
        assert_eq!(error, PatternError::InsufficientData { need: 5, got: 4 });
    }

    #[test]
    fn oversized_window_is_an_error_not_a_panic() {
        let samples = make_samples(&[1.0, 3.0, 2.0, 4.0, 1.0]);
        for edges in [EdgePolicy::Include, EdgePolicy::Exclude] {
            let error = find_extrema(&samples, usize::MAX / 2 + 1, edges).unwrap_err();
            assert!(matches!(error, PatternError::InvalidConfig(_)));
        }
    }

    #[test]
    fn finds_interior_peak_and_trough() {
        let samples = make_samples(&[5.0, 6.0, 9.0, 6.0, 5.0, 3.0, 1.0, 3.0, 4.0]);
        let extrema = find_extrema(&samples, 2, EdgePolicy::Exclude).unwrap();
        assert_eq!(
            indices(&extrema),
            vec![(2, ExtremumKind::Max), (6, ExtremumKind::Min)]
        );
        assert_eq!(extrema[0].price, 9.0);
        assert_eq!(extrema[1].timestamp, samples[6].timestamp);
    }

    #[test]
    fn include_policy_classifies_endpoints() {
        let samples = make_samples(&[10.0, 8.0, 6.0, 7.0, 9.0]);
        let extrema = find_extrema(&samples, 2, EdgePolicy::Include).unwrap();
        assert_eq!(
            indices(&extrema),
            vec![
                (0, ExtremumKind::Max),
                (2, ExtremumKind::Min),
                (4, ExtremumKind::Max)
            ]
        );

        let interior = find_extrema(&samples, 2, EdgePolicy::Exclude).unwrap();
        assert_eq!(indices(&interior), vec![(2, ExtremumKind::Min)]);
    }

    #[test]
    fn plateau_is_skipped() {
        let samples = make_samples(&[1.0, 2.0, 5.0, 5.0, 2.0, 1.0, 0.5]);
        let extrema = find_extrema(&samples, 1, EdgePolicy::Exclude).unwrap();
        assert!(extrema.iter().all(|e| e.index != 2 && e.index != 3));
    }

    #[test]
    fn flat_series_has_no_extrema() {
        let samples = make_samples(&[42.0; 30]);
        let extrema = find_extrema(&samples, 5, EdgePolicy::Include).unwrap();
        assert!(extrema.is_empty());
    }

    #[test]
    fn consecutive_maxima_are_kept() {
        let samples = make_samples(&[1.0, 4.0, 2.0, 2.0, 5.0, 3.0]);
        let extrema = find_extrema(&samples, 1, EdgePolicy::Exclude).unwrap();
        assert_eq!(
            indices(&extrema),
            vec![(1, ExtremumKind::Max), (4, ExtremumKind::Max)]
        );
    }

    #[test]
    fn check_samples_rejects_bad_input() {
        let samples = make_samples(&[1.0, -2.0, 3.0]);
        assert_eq!(
            check_samples(&samples),
            Err(PatternError::InvalidSample {
                index: 1,
                reason: "price must be finite and positive"
            })
        );

        let mut samples = make_samples(&[1.0, 2.0, 3.0]);
        samples[2].timestamp = samples[1].timestamp;
        assert!(matches!(
            check_samples(&samples),
            Err(PatternError::InvalidSample { index: 2, .. })
        ));
    }
}
