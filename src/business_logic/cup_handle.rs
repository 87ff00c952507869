use serde::Serialize;
use utoipa::ToSchema;

use crate::business_logic::config::{Leg, MatchPolicy, PriceRule, ThresholdConfig};
use crate::business_logic::detector::{Detection, PatternDetector, Rejection};
use crate::business_logic::error::PatternError;
use crate::business_logic::extrema::{check_samples, find_extrema, Extremum, ExtremumKind};
use crate::models::sample::Sample;

/// Five alternating turning points: max, min, max, min, max
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub a: Extremum,
    pub b: Extremum,
    pub c: Extremum,
    pub d: Extremum,
    pub e: Extremum,
}

/// An accepted cup-and-handle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct CupHandleMatch {
    /// Left rim
    pub a: Extremum,
    /// Cup bottom
    pub b: Extremum,
    /// Right rim
    pub c: Extremum,
    /// Handle low
    pub d: Extremum,
    /// Handle recovery
    pub e: Extremum,
    /// (a - b) / a in percent
    pub cup_depth_pct: f64,
    /// (c - d) / c in percent
    pub handle_depth_pct: f64,
}

/// Cup-and-handle detector bound to one validated threshold set
#[derive(Debug, Clone)]
pub struct CupHandleDetector {
    config: ThresholdConfig,
}

impl CupHandleDetector {
    pub fn new(config: ThresholdConfig) -> Result<Self, PatternError> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl PatternDetector for CupHandleDetector {
    type Match = CupHandleMatch;

    fn name(&self) -> &'static str {
        "cup_and_handle"
    }

    fn min_samples(&self) -> usize {
        self.config.min_samples()
    }

    fn detect(&self, samples: &[Sample]) -> Result<Detection<CupHandleMatch>, PatternError> {
        find_cup_and_handle(samples, &self.config)
    }
}

/// Scan `samples` for a cup-and-handle.
///
/// Errors only on malformed input or config; a series without the pattern is
/// `Detection::NoMatch` carrying the first rejection met during the scan.
pub fn find_cup_and_handle(
    samples: &[Sample],
    config: &ThresholdConfig,
) -> Result<Detection<CupHandleMatch>, PatternError> {
    config.validate()?;
    check_samples(samples)?;

    let extrema = find_extrema(samples, config.window_size, config.edges)?;
    let mut scan = QuintupleScan::new(config);
    let mut best: Option<CupHandleMatch> = None;

    for point in &extrema {
        let Some(found) = scan.push(*point) else {
            continue;
        };
        tracing::debug!(
            "Cup-and-handle found at a={}, b={}, c={}, d={}, e={}",
            found.a.index,
            found.b.index,
            found.c.index,
            found.d.index,
            found.e.index
        );
        match config.policy {
            MatchPolicy::Earliest => return Ok(Detection::Match(found)),
            MatchPolicy::DeepestCup => {
                let deeper = best
                    .as_ref()
                    .map(|current| found.cup_depth_pct > current.cup_depth_pct)
                    .unwrap_or(true);
                if deeper {
                    best = Some(found);
                }
            }
        }
    }

    Ok(match best {
        Some(found) => Detection::Match(found),
        None => Detection::NoMatch(scan.first_rejection.unwrap_or(Rejection::NoCandidate)),
    })
}

/// Left-to-right builder of the a, b, c, d roles.
///
/// Each role holds the best point seen for it so far. A more extreme point of
/// the same kind takes over its role and clears the roles after it; a point
/// that fails a rule is skipped and only its rejection is kept. Every extremum
/// is looked at once.
#[derive(Debug)]
struct QuintupleScan<'a> {
    config: &'a ThresholdConfig,
    a: Option<Extremum>,
    b: Option<Extremum>,
    c: Option<Extremum>,
    d: Option<Extremum>,
    first_rejection: Option<Rejection>,
}

impl<'a> QuintupleScan<'a> {
    fn new(config: &'a ThresholdConfig) -> Self {
        Self {
            config,
            a: None,
            b: None,
            c: None,
            d: None,
            first_rejection: None,
        }
    }

    /// Feed the next extremum; returns a match once `point` closes one as e
    fn push(&mut self, point: Extremum) -> Option<CupHandleMatch> {
        match point.kind {
            ExtremumKind::Max => self.push_max(point),
            ExtremumKind::Min => {
                self.push_min(point);
                None
            }
        }
    }

    fn push_max(&mut self, point: Extremum) -> Option<CupHandleMatch> {
        match (self.a, self.b, self.c, self.d) {
            (None, ..) => self.restart(point),
            (Some(a), None, ..) => {
                if point.price > a.price {
                    self.restart(point);
                }
            }
            (Some(a), Some(b), None, _) => self.try_right_rim(a, b, point),
            (Some(a), Some(b), Some(c), None) => {
                if point.price > c.price {
                    self.try_right_rim(a, b, point);
                }
            }
            (Some(a), Some(b), Some(c), Some(d)) => {
                let candidate = Candidate {
                    a,
                    b,
                    c,
                    d,
                    e: point,
                };
                match validate(&candidate, self.config) {
                    Ok(found) => {
                        // The breakout can serve as the next pattern's left rim
                        self.restart(point);
                        return Some(found);
                    }
                    Err(rejection) => {
                        self.reject(rejection);
                        if point.price > c.price {
                            self.try_right_rim(a, b, point);
                        }
                    }
                }
            }
        }
        None
    }

    fn push_min(&mut self, point: Extremum) {
        match (self.a, self.b, self.c, self.d) {
            (None, ..) => {}
            (Some(a), b, None, _) => {
                if b.map_or(true, |b| point.price < b.price) {
                    self.try_cup_bottom(a, point);
                }
            }
            (Some(a), Some(b), Some(c), d) => {
                if point.price <= b.price {
                    self.reject(Rejection::ShapeViolation {
                        cup_low: b.price,
                        handle_low: point.price,
                    });
                    self.try_cup_bottom(a, point);
                } else if d.map_or(true, |d| point.price < d.price) {
                    match check_handle_low(&c, &point, self.config) {
                        Ok(()) => self.d = Some(point),
                        Err(rejection) => self.reject(rejection),
                    }
                }
            }
            // c is only ever set after b
            (Some(_), None, Some(_), _) => {}
        }
    }

    fn restart(&mut self, left_rim: Extremum) {
        self.a = Some(left_rim);
        self.b = None;
        self.c = None;
        self.d = None;
    }

    fn try_cup_bottom(&mut self, a: Extremum, point: Extremum) {
        match check_cup_bottom(&a, &point, self.config) {
            Ok(()) => {
                self.b = Some(point);
                self.c = None;
                self.d = None;
            }
            Err(rejection) => self.reject(rejection),
        }
    }

    /// A rim too far above `a` starts a new cup from it instead
    fn try_right_rim(&mut self, a: Extremum, b: Extremum, point: Extremum) {
        match check_right_rim(&a, &b, &point, self.config) {
            Ok(()) => {
                self.c = Some(point);
                self.d = None;
            }
            Err(rejection) => {
                self.reject(rejection);
                if point.price > a.price {
                    self.restart(point);
                }
            }
        }
    }

    fn reject(&mut self, rejection: Rejection) {
        tracing::trace!("Turning point rejected: {:?}", rejection);
        self.first_rejection.get_or_insert(rejection);
    }
}

fn check_cup_bottom(a: &Extremum, b: &Extremum, config: &ThresholdConfig) -> Result<(), Rejection> {
    check_distance(Leg::AB, a, b, config)?;
    check_price(PriceRule::CupDepth, (a.price - b.price) / a.price, config)
}

fn check_right_rim(
    a: &Extremum,
    b: &Extremum,
    c: &Extremum,
    config: &ThresholdConfig,
) -> Result<(), Rejection> {
    check_distance(Leg::BC, b, c, config)?;
    check_price(PriceRule::CupRecovery, (c.price - b.price) / b.price, config)?;
    check_price(PriceRule::RimAlignment, (c.price - a.price).abs() / a.price, config)
}

fn check_handle_low(c: &Extremum, d: &Extremum, config: &ThresholdConfig) -> Result<(), Rejection> {
    check_distance(Leg::CD, c, d, config)?;
    check_price(PriceRule::HandleDepth, (c.price - d.price) / c.price, config)
}

fn check_distance(
    leg: Leg,
    prev: &Extremum,
    next: &Extremum,
    config: &ThresholdConfig,
) -> Result<(), Rejection> {
    let actual = next.index - prev.index;
    let required = config.distance(leg);
    if actual < required {
        return Err(Rejection::Distance {
            leg,
            actual,
            required,
        });
    }
    Ok(())
}

fn check_price(rule: PriceRule, actual: f64, config: &ThresholdConfig) -> Result<(), Rejection> {
    let limit = config.price(rule);
    let passed = if rule.is_tolerance() {
        actual <= limit
    } else {
        actual >= limit
    };
    if !passed {
        return Err(Rejection::Price {
            rule,
            actual,
            limit,
        });
    }
    Ok(())
}

/// Check one candidate against the shape, spacing and price rules
pub fn validate(
    candidate: &Candidate,
    config: &ThresholdConfig,
) -> Result<CupHandleMatch, Rejection> {
    let Candidate { a, b, c, d, e } = *candidate;

    if d.price <= b.price {
        return Err(Rejection::ShapeViolation {
            cup_low: b.price,
            handle_low: d.price,
        });
    }

    for (leg, prev, next) in [
        (Leg::AB, &a, &b),
        (Leg::BC, &b, &c),
        (Leg::CD, &c, &d),
        (Leg::DE, &d, &e),
    ] {
        check_distance(leg, prev, next, config)?;
    }

    let rim = a.price.min(c.price);
    for (rule, actual) in [
        (PriceRule::CupDepth, (a.price - b.price) / a.price),
        (PriceRule::CupRecovery, (c.price - b.price) / b.price),
        (PriceRule::RimAlignment, (c.price - a.price).abs() / a.price),
        (PriceRule::HandleDepth, (c.price - d.price) / c.price),
        (PriceRule::HandleRecovery, (e.price - d.price) / d.price),
        (PriceRule::BreakoutReach, (rim - e.price) / rim),
    ] {
        check_price(rule, actual, config)?;
    }

    Ok(CupHandleMatch {
        a,
        b,
        c,
        d,
        e,
        cup_depth_pct: (a.price - b.price) / a.price * 100.0,
        handle_depth_pct: (c.price - d.price) / c.price * 100.0,
    })
}
