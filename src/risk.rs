//! Deterministic operational risk model.
//!
//! Additive accumulator starting at a base of 50; each adjustment that
//! fires is recorded as an auditable component and the sum is clamped to
//! 0..=100 once at the end. No randomness, no learned weights: identical
//! inputs always produce identical risk.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::BusinessProfile;
use crate::score::clamp_score;

pub const BASE_RISK: i32 = 50;

/// Fallback span used when the request omits operating hours.
pub const DEFAULT_OPEN_HOURS: &str = "08:00-22:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    Budget,
    Seating,
    OperatingHours,
    Demand,
    Competition,
}

/// Discrete contribution to the risk score, for transparent audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskComponent {
    pub factor: RiskFactor,
    pub delta: i32,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub components: Vec<RiskComponent>,
}

/// Computes the operational risk score for a business configuration.
pub fn compute_risk(
    profile: &BusinessProfile,
    budget_lakh: f64,
    seating: u32,
    open_hours: Option<&str>,
    demand: u8,
    competition: u8,
) -> RiskAssessment {
    let (budget_lo, budget_hi) = profile.budget_range;
    let (seating_lo, seating_hi) = profile.seating_range;

    let mut components = Vec::new();
    let mut risk = BASE_RISK;

    if budget_lakh < budget_lo {
        risk += 15;
        components.push(RiskComponent {
            factor: RiskFactor::Budget,
            delta: 15,
            notes: format!("budget {budget_lakh}L below typical range {budget_lo}-{budget_hi}L"),
        });
    } else if budget_lakh > budget_hi {
        risk -= 10;
        components.push(RiskComponent {
            factor: RiskFactor::Budget,
            delta: -10,
            notes: format!("budget {budget_lakh}L above typical range {budget_lo}-{budget_hi}L"),
        });
    }

    if profile.uses_seating() {
        if seating < seating_lo {
            risk += 10;
            components.push(RiskComponent {
                factor: RiskFactor::Seating,
                delta: 10,
                notes: format!("seating {seating} below typical range {seating_lo}-{seating_hi}"),
            });
        } else if seating > seating_hi {
            risk += 5;
            components.push(RiskComponent {
                factor: RiskFactor::Seating,
                delta: 5,
                notes: format!("seating {seating} above typical range {seating_lo}-{seating_hi}"),
            });
        }
    }

    let hours = open_hours.unwrap_or(DEFAULT_OPEN_HOURS);
    match parse_open_hours_span(hours) {
        Some(span) if span >= 16 => {
            risk += 13;
            components.push(RiskComponent {
                factor: RiskFactor::OperatingHours,
                delta: 13,
                notes: format!("very long operating hours ({span}h)"),
            });
        }
        Some(span) if span >= 12 => {
            risk += 8;
            components.push(RiskComponent {
                factor: RiskFactor::OperatingHours,
                delta: 8,
                notes: format!("long operating hours ({span}h)"),
            });
        }
        Some(_) => {}
        // Unparseable hours skip the adjustment entirely; no default penalty.
        None => warn!(hours, "could not parse operating hours, skipping adjustment"),
    }

    if demand <= 40 {
        risk += 10;
        components.push(RiskComponent {
            factor: RiskFactor::Demand,
            delta: 10,
            notes: format!("low demand ({demand})"),
        });
    }

    if competition >= 70 {
        risk += 12;
        components.push(RiskComponent {
            factor: RiskFactor::Competition,
            delta: 12,
            notes: format!("high competition ({competition})"),
        });
    }

    RiskAssessment {
        score: clamp_score(f64::from(risk)),
        components,
    }
}

/// Parses an `"HH:MM-HH:MM"` span into whole open hours, wrapping overnight
/// spans with `(end - start) mod 24`. Only the hour components matter.
fn parse_open_hours_span(hours: &str) -> Option<u32> {
    let (start, end) = hours.split_once('-')?;
    let start_hour = parse_hour(start)?;
    let end_hour = parse_hour(end)?;
    Some((end_hour + 24 - start_hour) % 24)
}

fn parse_hour(part: &str) -> Option<u32> {
    let hour: u32 = part.trim().split(':').next()?.trim().parse().ok()?;
    (hour < 24).then_some(hour)
}
