use chrono::{DateTime, Utc};

use crate::{Progress, RequestRecord, TokenUsage, parse_ts};

const STUCK_EFFICIENCY_RATIO: f64 = 0.5;
const RAPID_RETRY_SECONDS: f64 = 30.0;
const REFINING_GAP_SECONDS: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub usage: TokenUsage,
    pub at: DateTime<Utc>,
}

impl ProgressSample {
    /// Stand-in for a request whose token counts are not known yet.
    pub fn neutral(at: DateTime<Utc>) -> Self {
        Self {
            usage: TokenUsage::new(100, 200),
            at,
        }
    }
}

/// Classifies the current request against project history (newest first).
pub fn assess_progress(current: &ProgressSample, history: &[RequestRecord]) -> Progress {
    let Some(latest) = history.first() else {
        return Progress::Exploring;
    };

    let average = history
        .iter()
        .map(|record| record.token_efficiency)
        .sum::<f64>()
        / history.len() as f64;
    if average > 0.0 && current.usage.efficiency() < average * STUCK_EFFICIENCY_RATIO {
        return Progress::Stuck;
    }

    let Some(previous_at) = parse_ts(&latest.ts) else {
        return Progress::Exploring;
    };
    let gap = (current.at - previous_at).num_milliseconds() as f64 / 1000.0;
    if gap < RAPID_RETRY_SECONDS {
        Progress::Stuck
    } else if gap > REFINING_GAP_SECONDS {
        Progress::Refining
    } else {
        Progress::Exploring
    }
}
