use rusqlite::params;
use watchdog_core::{RequestRecord, TimeRange};

use crate::Db;
use crate::error::Result;
use crate::helpers::{REQUEST_COLUMNS, row_to_request, validate_project, validate_range};

impl Db {
    pub fn insert_request(&self, record: &RequestRecord) -> Result<()> {
        validate_project(&record.project_id)?;
        self.conn.execute(
            r#"
            INSERT INTO request_record (
              id, ts, project_id, provider, model, prompt_tokens, completion_tokens,
              total_cost_usd, similarity_score, pattern_score, advisor_level,
              prompt_fingerprint, progress, token_efficiency
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                record.id,
                record.ts,
                record.project_id,
                record.provider,
                record.model,
                record.usage.prompt_tokens as i64,
                record.usage.completion_tokens as i64,
                record.total_cost_usd,
                record.similarity_score,
                record.pattern_score as i64,
                record.advisor_level as i64,
                record.prompt_fingerprint,
                record.progress.map(|progress| progress.as_str()),
                record.token_efficiency,
            ],
        )?;
        Ok(())
    }

    pub fn get_request(&self, id: &str) -> Result<Option<RequestRecord>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM request_record WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], row_to_request)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Up to `limit` records for the project, newest first.
    pub fn recent_requests(&self, project_id: &str, limit: usize) -> Result<Vec<RequestRecord>> {
        let sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM request_record
            WHERE project_id = ?1
            ORDER BY ts DESC, rowid DESC
            LIMIT ?2
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![project_id, limit as i64], row_to_request)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Records strictly after `since`, newest first.
    pub fn requests_since(&self, project_id: &str, since: &str) -> Result<Vec<RequestRecord>> {
        let sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM request_record
            WHERE project_id = ?1 AND ts > ?2
            ORDER BY ts DESC, rowid DESC
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![project_id, since], row_to_request)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Records with `start <= ts <= end`, newest first.
    pub fn requests_in_range(
        &self,
        project_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<RequestRecord>> {
        validate_range(range)?;
        let sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM request_record
            WHERE project_id = ?1 AND ts >= ?2 AND ts <= ?3
            ORDER BY ts DESC, rowid DESC
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![project_id, range.start, range.end], row_to_request)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Summed cost of the project's records strictly after `since`.
    pub fn window_cost(&self, project_id: &str, since: &str) -> Result<f64> {
        let total: f64 = self.conn.query_row(
            r#"
            SELECT COALESCE(SUM(total_cost_usd), 0)
            FROM request_record
            WHERE project_id = ?1 AND ts > ?2
            "#,
            params![project_id, since],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Records at or after `since` whose advisor level reached `min_level`,
    /// newest first, optionally restricted to one project.
    pub fn warnings(
        &self,
        project_id: Option<&str>,
        min_level: u8,
        since: &str,
        limit: usize,
    ) -> Result<Vec<RequestRecord>> {
        let sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM request_record
            WHERE advisor_level >= ?1 AND ts >= ?2 AND (?3 IS NULL OR project_id = ?3)
            ORDER BY ts DESC, rowid DESC
            LIMIT ?4
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![min_level as i64, since, project_id, limit as i64],
            row_to_request,
        )?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
