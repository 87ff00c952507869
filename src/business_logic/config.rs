use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::business_logic::error::PatternError;

/// Consecutive turning-point pair, keyed the way the API exposes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum Leg {
    #[serde(rename = "a_b")]
    AB,
    #[serde(rename = "b_c")]
    BC,
    #[serde(rename = "c_d")]
    CD,
    #[serde(rename = "d_e")]
    DE,
}

impl Leg {
    pub const ALL: [Leg; 4] = [Leg::AB, Leg::BC, Leg::CD, Leg::DE];

    pub fn key(self) -> &'static str {
        match self {
            Leg::AB => "a_b",
            Leg::BC => "b_c",
            Leg::CD => "c_d",
            Leg::DE => "d_e",
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Price comparison applied to a candidate quintuple.
///
/// Depth and recovery rules are minimum fractional moves; `RimAlignment` and
/// `BreakoutReach` are maximum tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum PriceRule {
    /// (a - b) / a >= t
    #[serde(rename = "a_b")]
    CupDepth,
    /// (c - b) / b >= t
    #[serde(rename = "b_c")]
    CupRecovery,
    /// |c - a| / a <= t
    #[serde(rename = "a_c")]
    RimAlignment,
    /// (c - d) / c >= t
    #[serde(rename = "c_d")]
    HandleDepth,
    /// (e - d) / d >= t
    #[serde(rename = "d_e")]
    HandleRecovery,
    /// e within t of the lower rim, c or a
    #[serde(rename = "c_e")]
    BreakoutReach,
}

impl PriceRule {
    pub const ALL: [PriceRule; 6] = [
        PriceRule::CupDepth,
        PriceRule::CupRecovery,
        PriceRule::RimAlignment,
        PriceRule::HandleDepth,
        PriceRule::HandleRecovery,
        PriceRule::BreakoutReach,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PriceRule::CupDepth => "a_b",
            PriceRule::CupRecovery => "b_c",
            PriceRule::RimAlignment => "a_c",
            PriceRule::HandleDepth => "c_d",
            PriceRule::HandleRecovery => "d_e",
            PriceRule::BreakoutReach => "c_e",
        }
    }

    /// Tolerances pass when the measured value stays at or below the limit
    pub fn is_tolerance(self) -> bool {
        matches!(self, PriceRule::RimAlignment | PriceRule::BreakoutReach)
    }
}

impl fmt::Display for PriceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How samples near either end of the series are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    /// Compare against the window clamped to the series bounds
    #[default]
    Include,
    /// Skip the first and last `window_size` samples
    Exclude,
}

/// Which accepted candidate is returned when several validate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    #[default]
    Earliest,
    DeepestCup,
}

/// Thresholds for cup-and-handle detection.
///
/// Defaults are tuned for roughly three sessions of 5-minute samples
/// (about 222 points) and are deliberately lenient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ThresholdConfig {
    /// Neighbors on each side a turning point must beat
    pub window_size: usize,
    /// Min index spacing per leg
    #[schema(value_type = Object)]
    pub distance_thresholds: BTreeMap<Leg, usize>,
    /// Fractional price rules, each in (0, 1]
    #[schema(value_type = Object)]
    pub price_thresholds: BTreeMap<PriceRule, f64>,
    #[serde(default)]
    pub edges: EdgePolicy,
    #[serde(default)]
    pub policy: MatchPolicy,
}

pub const DEFAULT_WINDOW_SIZE: usize = 5;
pub const DEFAULT_MIN_DISTANCE: usize = 10;
pub const DEFAULT_PRICE_THRESHOLD: f64 = 0.005;

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            distance_thresholds: Leg::ALL
                .iter()
                .map(|leg| (*leg, DEFAULT_MIN_DISTANCE))
                .collect(),
            price_thresholds: PriceRule::ALL
                .iter()
                .map(|rule| (*rule, DEFAULT_PRICE_THRESHOLD))
                .collect(),
            edges: EdgePolicy::default(),
            policy: MatchPolicy::default(),
        }
    }
}

impl ThresholdConfig {
    /// Same value for every leg and every price rule
    pub fn uniform(window_size: usize, min_distance: usize, price_threshold: f64) -> Self {
        Self {
            window_size,
            distance_thresholds: Leg::ALL.iter().map(|leg| (*leg, min_distance)).collect(),
            price_thresholds: PriceRule::ALL
                .iter()
                .map(|rule| (*rule, price_threshold))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_distance(mut self, leg: Leg, min_distance: usize) -> Self {
        self.distance_thresholds.insert(leg, min_distance);
        self
    }

    pub fn with_price(mut self, rule: PriceRule, threshold: f64) -> Self {
        self.price_thresholds.insert(rule, threshold);
        self
    }

    pub fn with_edges(mut self, edges: EdgePolicy) -> Self {
        self.edges = edges;
        self
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Minimum series length the extractor accepts
    pub fn min_samples(&self) -> usize {
        required_samples(self.window_size).unwrap_or(usize::MAX)
    }

    pub fn validate(&self) -> Result<(), PatternError> {
        if self.window_size == 0 {
            return Err(PatternError::InvalidConfig(
                "window_size must be at least 1".to_string(),
            ));
        }
        if required_samples(self.window_size).is_none() {
            return Err(PatternError::InvalidConfig(format!(
                "window_size {} is too large",
                self.window_size
            )));
        }

        for leg in Leg::ALL {
            match self.distance_thresholds.get(&leg) {
                None => {
                    return Err(PatternError::InvalidConfig(format!(
                        "missing distance threshold '{leg}'"
                    )))
                }
                Some(0) => {
                    return Err(PatternError::InvalidConfig(format!(
                        "distance threshold '{leg}' must be at least 1"
                    )))
                }
                Some(_) => {}
            }
        }

        for rule in PriceRule::ALL {
            match self.price_thresholds.get(&rule) {
                None => {
                    return Err(PatternError::InvalidConfig(format!(
                        "missing price threshold '{rule}'"
                    )))
                }
                Some(value) if !value.is_finite() || *value <= 0.0 || *value > 1.0 => {
                    return Err(PatternError::InvalidConfig(format!(
                        "price threshold '{rule}' = {value} must be in (0, 1]"
                    )))
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Lookup after `validate`; a missing key reads as the strictest distance
    pub(crate) fn distance(&self, leg: Leg) -> usize {
        self.distance_thresholds.get(&leg).copied().unwrap_or(usize::MAX)
    }

    pub(crate) fn price(&self, rule: PriceRule) -> f64 {
        self.price_thresholds.get(&rule).copied().unwrap_or(f64::NAN)
    }
}

/// Samples a full window spans, `2 * window_size + 1`; `None` on overflow
pub fn required_samples(window_size: usize) -> Option<usize> {
    window_size.checked_mul(2)?.checked_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ThresholdConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_size, 5);
        assert_eq!(config.min_samples(), 11);
        assert_eq!(config.distance(Leg::CD), 10);
        assert_eq!(config.price(PriceRule::BreakoutReach), 0.005);
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = ThresholdConfig::uniform(0, 2, 0.05);
        assert!(matches!(config.validate(), Err(PatternError::InvalidConfig(_))));
    }

    #[test]
    fn oversized_window_is_rejected() {
        let config = ThresholdConfig::uniform(usize::MAX / 2 + 1, 1, 0.05);
        assert!(matches!(config.validate(), Err(PatternError::InvalidConfig(_))));
        assert_eq!(config.min_samples(), usize::MAX);

        let widest = ThresholdConfig::uniform(usize::MAX / 2, 1, 0.05);
        assert!(widest.validate().is_ok());
        assert_eq!(widest.min_samples(), usize::MAX);
    }

    #[test]
    fn zero_distance_is_rejected() {
        let config = ThresholdConfig::default().with_distance(Leg::BC, 0);
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("b_c"));
    }

    #[test]
    fn price_threshold_bounds() {
        for bad in [0.0, -0.1, 1.5, f64::NAN, f64::INFINITY] {
            let config = ThresholdConfig::default().with_price(PriceRule::HandleDepth, bad);
            assert!(config.validate().is_err(), "accepted {bad}");
        }
        let config = ThresholdConfig::default().with_price(PriceRule::HandleDepth, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_key_is_rejected() {
        let mut config = ThresholdConfig::default();
        config.price_thresholds.remove(&PriceRule::RimAlignment);
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("a_c"));

        let mut config = ThresholdConfig::default();
        config.distance_thresholds.remove(&Leg::DE);
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_from_api_keys() {
        let json = r#"{
            "window_size": 2,
            "distance_thresholds": {"a_b": 2, "b_c": 2, "c_d": 2, "d_e": 2},
            "price_thresholds": {"a_b": 0.05, "b_c": 0.05, "a_c": 0.1, "c_d": 0.05, "d_e": 0.05, "c_e": 0.05},
            "policy": "deepest_cup"
        }"#;
        let config: ThresholdConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.edges, EdgePolicy::Include);
        assert_eq!(config.policy, MatchPolicy::DeepestCup);
        assert_eq!(config.price(PriceRule::RimAlignment), 0.1);
    }
}
