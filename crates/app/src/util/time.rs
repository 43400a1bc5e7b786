use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};

use crate::config::RangeParams;
use crate::error::{AppError, Result};
use watchdog_core::TimeRange;

pub const DEFAULT_RANGE: &str = "7d";

/// Window length for a named range; `None` for unknown labels. `alltime`
/// reaches back to the epoch.
pub fn range_duration(label: &str) -> Option<Duration> {
    match label {
        "1h" => Some(Duration::hours(1)),
        "24h" => Some(Duration::hours(24)),
        "7d" => Some(Duration::days(7)),
        "30d" => Some(Duration::days(30)),
        _ => None,
    }
}

pub fn resolve_range(params: &RangeParams, now: DateTime<Utc>) -> Result<TimeRange> {
    if let Some(start) = params.start.as_deref() {
        let start = normalize_rfc3339_to_utc(start)?;
        let end = match params.end.as_deref() {
            Some(end) => normalize_rfc3339_to_utc(end)?,
            None => now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        if start > end {
            return Err(AppError::InvalidInput(format!(
                "range start {start} is after end {end}"
            )));
        }
        return Ok(TimeRange { start, end });
    }
    let label = params.range.as_deref().unwrap_or(DEFAULT_RANGE);
    range_from_label(label, now)
}

pub fn range_from_label(label: &str, now: DateTime<Utc>) -> Result<TimeRange> {
    let start = if label == "alltime" {
        Utc.timestamp_opt(0, 0)
            .single()
            .ok_or_else(|| AppError::InvalidInput("invalid epoch".to_string()))?
    } else {
        let duration = range_duration(label)
            .ok_or_else(|| AppError::InvalidInput(format!("unsupported range {label}")))?;
        now - duration
    };
    Ok(TimeRange {
        start: start.to_rfc3339_opts(SecondsFormat::Millis, true),
        end: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub fn normalize_rfc3339_to_utc(value: &str) -> Result<String> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .map_err(|err| AppError::InvalidInput(format!("invalid datetime: {}", err)))?;
    Ok(parsed
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).single().expect("date")
    }

    #[test]
    fn named_ranges_end_now() {
        let range = range_from_label("24h", now()).expect("range");
        assert_eq!(range.start, "2025-03-07T12:00:00.000Z");
        assert_eq!(range.end, "2025-03-08T12:00:00.000Z");

        let week = resolve_range(&RangeParams::default(), now()).expect("default");
        assert_eq!(week.start, "2025-03-01T12:00:00.000Z");

        let all = range_from_label("alltime", now()).expect("alltime");
        assert_eq!(all.start, "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn explicit_bounds_are_normalized_to_utc() {
        let params = RangeParams {
            range: Some("24h".to_string()),
            start: Some("2025-03-01T10:00:00+02:00".to_string()),
            end: None,
        };
        let range = resolve_range(&params, now()).expect("range");
        assert_eq!(range.start, "2025-03-01T08:00:00.000Z");
        assert_eq!(range.end, "2025-03-08T12:00:00.000Z");
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(range_from_label("fortnight", now()).is_err());
        let backwards = RangeParams {
            range: None,
            start: Some("2025-03-09T00:00:00Z".to_string()),
            end: Some("2025-03-08T00:00:00Z".to_string()),
        };
        assert!(resolve_range(&backwards, now()).is_err());
    }
}
