use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::business_logic::config::ThresholdConfig;
use crate::business_logic::cup_handle::CupHandleMatch;
use crate::business_logic::detector::{Detection, Rejection};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CheckPatternRequest {
    #[validate(length(min = 1, max = 12))]
    #[schema(example = "AAPL")]
    pub symbol: String,
    /// Overrides the server thresholds for this call
    #[serde(default)]
    pub thresholds: Option<ThresholdConfig>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckPatternResponse {
    pub symbol: String,
    pub cup_and_handle_detected: bool,
}

/// Detailed outcome for one symbol
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PatternReport {
    pub symbol: String,
    pub sample_count: usize,
    pub cup_and_handle_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<CupHandleMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

impl PatternReport {
    pub fn new(symbol: String, sample_count: usize, detection: Detection<CupHandleMatch>) -> Self {
        let (pattern, rejection) = match detection {
            Detection::Match(found) => (Some(found), None),
            Detection::NoMatch(rejection) => (None, Some(rejection)),
        };

        Self {
            symbol,
            sample_count,
            cup_and_handle_detected: pattern.is_some(),
            pattern,
            rejection,
        }
    }
}
