use std::collections::BTreeMap;

use rusqlite::params;
use watchdog_core::{ProjectStats, ProjectSummary, TimeRange};

use crate::Db;
use crate::error::Result;
use crate::helpers::{validate_project, validate_range};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeCounts {
    pub requests: u64,
    pub feedback: u64,
}

impl Db {
    pub fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT project_id, COUNT(*), COALESCE(SUM(total_cost_usd), 0), MIN(ts), MAX(ts)
            FROM request_record
            GROUP BY project_id
            ORDER BY MAX(ts) DESC, project_id ASC
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ProjectSummary {
                project_id: row.get(0)?,
                request_count: row.get::<_, i64>(1)? as u64,
                total_cost_usd: row.get(2)?,
                first_seen: row.get(3)?,
                last_seen: row.get(4)?,
            })
        })?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?);
        }
        Ok(projects)
    }

    pub fn project_stats(&self, project_id: &str, range: &TimeRange) -> Result<ProjectStats> {
        validate_range(range)?;
        let (request_count, total_cost_usd, prompt_tokens, completion_tokens, avg_similarity, avg_efficiency) =
            self.conn.query_row(
                r#"
                SELECT
                  COUNT(*),
                  COALESCE(SUM(total_cost_usd), 0),
                  COALESCE(SUM(prompt_tokens), 0),
                  COALESCE(SUM(completion_tokens), 0),
                  AVG(similarity_score),
                  AVG(token_efficiency)
                FROM request_record
                WHERE project_id = ?1 AND ts >= ?2 AND ts <= ?3
                "#,
                params![project_id, range.start, range.end],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                        row.get::<_, Option<f64>>(5)?,
                    ))
                },
            )?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT advisor_level, COUNT(*)
            FROM request_record
            WHERE project_id = ?1 AND ts >= ?2 AND ts <= ?3
            GROUP BY advisor_level
            "#,
        )?;
        let rows = stmt.query_map(params![project_id, range.start, range.end], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut level_counts = BTreeMap::new();
        for row in rows {
            let (level, count) = row?;
            level_counts.insert(level.clamp(0, u8::MAX as i64) as u8, count as u64);
        }

        Ok(ProjectStats {
            project_id: project_id.to_string(),
            range: range.clone(),
            request_count: request_count as u64,
            total_cost_usd,
            prompt_tokens: prompt_tokens.max(0) as u64,
            completion_tokens: completion_tokens.max(0) as u64,
            avg_similarity,
            avg_token_efficiency: avg_efficiency,
            level_counts,
        })
    }

    /// Removes every stored row of the project in one transaction.
    pub fn purge_project(&mut self, project_id: &str) -> Result<PurgeCounts> {
        validate_project(project_id)?;
        let tx = self.conn.transaction()?;
        let feedback = tx.execute("DELETE FROM feedback WHERE project_id = ?1", params![project_id])?;
        let requests = tx.execute(
            "DELETE FROM request_record WHERE project_id = ?1",
            params![project_id],
        )?;
        tx.commit()?;
        Ok(PurgeCounts {
            requests: requests as u64,
            feedback: feedback as u64,
        })
    }
}
