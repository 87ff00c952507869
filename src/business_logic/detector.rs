use serde::Serialize;
use utoipa::ToSchema;

use crate::business_logic::config::{Leg, PriceRule};
use crate::business_logic::error::PatternError;
use crate::models::sample::Sample;

/// Outcome of a detection call that ran to completion
#[derive(Debug, Clone, PartialEq)]
pub enum Detection<M> {
    Match(M),
    NoMatch(Rejection),
}

impl<M> Detection<M> {
    pub fn is_match(&self) -> bool {
        matches!(self, Detection::Match(_))
    }

    pub fn matched(&self) -> Option<&M> {
        match self {
            Detection::Match(found) => Some(found),
            Detection::NoMatch(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Detection::Match(_) => None,
            Detection::NoMatch(rejection) => Some(rejection),
        }
    }
}

/// Why a series produced no pattern
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// No five alternating turning points exist
    NoCandidate,
    /// Handle dipped to or below the cup bottom
    ShapeViolation { cup_low: f64, handle_low: f64 },
    Distance {
        leg: Leg,
        actual: usize,
        required: usize,
    },
    Price {
        rule: PriceRule,
        actual: f64,
        limit: f64,
    },
}

/// A price-shape detector over one instrument's ordered samples
pub trait PatternDetector: Send + Sync {
    type Match;

    fn name(&self) -> &'static str;

    /// Shortest series `detect` accepts
    fn min_samples(&self) -> usize;

    fn detect(&self, samples: &[Sample]) -> Result<Detection<Self::Match>, PatternError>;
}
