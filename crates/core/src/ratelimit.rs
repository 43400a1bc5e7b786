use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::RequestRecord;

pub const WINDOW_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub enabled: bool,
    pub max_cost_per_hour_usd: f64,
    pub cooldown_minutes: u32,
    /// Share of the ceiling above which the advisor escalates without rejecting.
    pub warning_ratio: f64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_cost_per_hour_usd: 5.0,
            cooldown_minutes: 20,
            warning_ratio: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateDecision {
    Allow {
        window_cost_usd: f64,
        near_limit: bool,
    },
    Reject {
        window_cost_usd: f64,
        retry_after_seconds: u64,
    },
}

impl RateDecision {
    pub fn is_rejected(&self) -> bool {
        matches!(self, RateDecision::Reject { .. })
    }
}

impl RateLimitPolicy {
    /// Start of the rolling window; records strictly after it count.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::minutes(WINDOW_MINUTES)
    }

    pub fn retry_after_seconds(&self) -> u64 {
        u64::from(self.cooldown_minutes) * 60
    }

    /// Decides on `stored_cost_usd` (already spent in the window) plus the
    /// cost of the request being evaluated.
    pub fn evaluate(&self, stored_cost_usd: f64, projected_cost_usd: f64) -> RateDecision {
        let window_cost_usd = stored_cost_usd.max(0.0) + projected_cost_usd.max(0.0);
        // Escalation still applies when rejection is switched off.
        let near_limit = window_cost_usd > self.max_cost_per_hour_usd * self.warning_ratio;
        if !self.enabled {
            return RateDecision::Allow {
                window_cost_usd,
                near_limit,
            };
        }
        if window_cost_usd > self.max_cost_per_hour_usd {
            return RateDecision::Reject {
                window_cost_usd,
                retry_after_seconds: self.retry_after_seconds(),
            };
        }
        RateDecision::Allow {
            window_cost_usd,
            near_limit,
        }
    }
}

pub fn rolling_cost(records: &[RequestRecord]) -> f64 {
    records.iter().map(|record| record.total_cost_usd).sum()
}

pub fn cooldown_suggestions() -> Vec<String> {
    [
        "Take a short break and step away from the keyboard",
        "Re-read the error message and the relevant documentation",
        "Break the problem into smaller pieces before asking again",
        "Try a cheaper model for exploratory questions",
    ]
    .iter()
    .map(|suggestion| suggestion.to_string())
    .collect()
}
