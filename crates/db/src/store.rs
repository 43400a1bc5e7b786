use watchdog_core::{RequestRecord, RequestStore, StoreError};

use crate::Db;

impl RequestStore for Db {
    fn insert(&self, record: &RequestRecord) -> Result<(), StoreError> {
        Ok(self.insert_request(record)?)
    }

    fn query_recent(
        &self,
        project_id: &str,
        limit: usize,
    ) -> Result<Vec<RequestRecord>, StoreError> {
        Ok(self.recent_requests(project_id, limit)?)
    }

    fn query_since(&self, project_id: &str, since: &str) -> Result<Vec<RequestRecord>, StoreError> {
        Ok(self.requests_since(project_id, since)?)
    }
}
