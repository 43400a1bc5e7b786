use chrono::DateTime;
use rusqlite::Row;
use watchdog_core::{FeedbackRecord, Progress, RequestRecord, TimeRange, TokenUsage};

use crate::error::Result;

pub(crate) const REQUEST_COLUMNS: &str = r#"
  id, ts, project_id, provider, model, prompt_tokens, completion_tokens,
  total_cost_usd, similarity_score, pattern_score, advisor_level,
  prompt_fingerprint, progress, token_efficiency
"#;

pub(crate) fn row_to_request(row: &Row<'_>) -> std::result::Result<RequestRecord, rusqlite::Error> {
    let progress: Option<String> = row.get(12)?;
    Ok(RequestRecord {
        id: row.get(0)?,
        ts: row.get(1)?,
        project_id: row.get(2)?,
        provider: row.get(3)?,
        model: row.get(4)?,
        usage: TokenUsage {
            prompt_tokens: row.get::<_, i64>(5)?.max(0) as u64,
            completion_tokens: row.get::<_, i64>(6)?.max(0) as u64,
        },
        total_cost_usd: row.get(7)?,
        similarity_score: row.get(8)?,
        pattern_score: row.get::<_, i64>(9)? as i32,
        advisor_level: row.get::<_, i64>(10)?.clamp(0, u8::MAX as i64) as u8,
        prompt_fingerprint: row.get(11)?,
        progress: progress.as_deref().and_then(Progress::parse),
        token_efficiency: row.get(13)?,
    })
}

pub(crate) fn row_to_feedback(
    row: &Row<'_>,
) -> std::result::Result<FeedbackRecord, rusqlite::Error> {
    Ok(FeedbackRecord {
        id: row.get(0)?,
        request_id: row.get(1)?,
        project_id: row.get(2)?,
        is_accurate: row.get::<_, i64>(3)? != 0,
        message: row.get(4)?,
        ts: row.get(5)?,
    })
}

/// Rejects ranges whose bounds are not RFC3339 timestamps before they reach
/// the text comparisons in SQL.
pub(crate) fn validate_range(range: &TimeRange) -> Result<()> {
    DateTime::parse_from_rfc3339(&range.start)?;
    DateTime::parse_from_rfc3339(&range.end)?;
    Ok(())
}

pub(crate) fn validate_project(project_id: &str) -> Result<()> {
    if project_id.trim().is_empty() {
        return Err(crate::DbError::EmptyProjectId);
    }
    Ok(())
}
