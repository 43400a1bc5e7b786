use rusqlite::params;
use watchdog_core::FeedbackRecord;

use crate::Db;
use crate::error::Result;
use crate::helpers::{row_to_feedback, validate_project};

impl Db {
    pub fn insert_feedback(&self, feedback: &FeedbackRecord) -> Result<()> {
        validate_project(&feedback.project_id)?;
        self.conn.execute(
            r#"
            INSERT INTO feedback (id, request_id, project_id, is_accurate, message, ts)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                feedback.id,
                feedback.request_id,
                feedback.project_id,
                feedback.is_accurate as i64,
                feedback.message,
                feedback.ts,
            ],
        )?;
        Ok(())
    }

    pub fn list_feedback(&self, project_id: &str, limit: usize) -> Result<Vec<FeedbackRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, request_id, project_id, is_accurate, message, ts
            FROM feedback
            WHERE project_id = ?1
            ORDER BY ts DESC, rowid DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![project_id, limit as i64], row_to_feedback)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
