use std::sync::Mutex;

use crate::RequestRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Durable history of accepted requests, scoped by project.
pub trait RequestStore {
    fn insert(&self, record: &RequestRecord) -> Result<(), StoreError>;

    /// Up to `limit` records for `project_id`, newest first.
    fn query_recent(&self, project_id: &str, limit: usize)
    -> Result<Vec<RequestRecord>, StoreError>;

    /// Records for `project_id` with a timestamp strictly after `since`
    /// (RFC3339), newest first.
    fn query_since(&self, project_id: &str, since: &str) -> Result<Vec<RequestRecord>, StoreError>;
}

/// Process-local store, handy for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<RequestRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn project_records(&self, project_id: &str) -> Result<Vec<RequestRecord>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
        let mut matching: Vec<RequestRecord> = records
            .iter()
            .filter(|record| record.project_id == project_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.ts.cmp(&a.ts));
        Ok(matching)
    }
}

impl RequestStore for MemoryStore {
    fn insert(&self, record: &RequestRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
        records.push(record.clone());
        Ok(())
    }

    fn query_recent(
        &self,
        project_id: &str,
        limit: usize,
    ) -> Result<Vec<RequestRecord>, StoreError> {
        let mut records = self.project_records(project_id)?;
        records.truncate(limit);
        Ok(records)
    }

    fn query_since(&self, project_id: &str, since: &str) -> Result<Vec<RequestRecord>, StoreError> {
        let records = self.project_records(project_id)?;
        Ok(records
            .into_iter()
            .filter(|record| record.ts.as_str() > since)
            .collect())
    }
}
