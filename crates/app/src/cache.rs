use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use watchdog_core::EfficiencyReport;

pub const DEFAULT_TTL_SECONDS: i64 = 300;

const KEY_PREFIX: &str = "efficiency";

pub fn cache_key(project_id: &str, range: &str) -> String {
    format!("{KEY_PREFIX}:{project_id}:{range}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_cached: usize,
    pub expired: usize,
    pub ttl_seconds: i64,
    pub cache_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    project_id: String,
    range: String,
}

impl CacheKey {
    fn new(project_id: &str, range: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            range: range.to_string(),
        }
    }
}

#[derive(Clone)]
struct CacheEntry {
    report: EfficiencyReport,
    stored_at: DateTime<Utc>,
}

/// Efficiency reports keyed by project and range label, expiring after the
/// TTL. Expired entries are dropped lazily on read.
#[derive(Clone)]
pub struct EfficiencyCache {
    entries: Arc<Mutex<HashMap<CacheKey, CacheEntry>>>,
    ttl: Duration,
}

impl Default for EfficiencyCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECONDS))
    }
}

impl EfficiencyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn get(&self, project_id: &str, range: &str, now: DateTime<Utc>) -> Option<EfficiencyReport> {
        let key = CacheKey::new(project_id, range);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&key)?;
        if now - entry.stored_at < self.ttl {
            return Some(entry.report.clone());
        }
        entries.remove(&key);
        None
    }

    pub fn set(&self, project_id: &str, range: &str, report: EfficiencyReport, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            CacheKey::new(project_id, range),
            CacheEntry {
                report,
                stored_at: now,
            },
        );
    }

    /// Drops everything, one project's entries, or a single project/range
    /// entry. Returns how many entries were removed.
    pub fn invalidate(&self, project_id: Option<&str>, range: Option<&str>) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        match (project_id, range) {
            (None, _) => entries.clear(),
            (Some(project_id), Some(range)) => {
                entries.remove(&CacheKey::new(project_id, range));
            }
            (Some(project_id), None) => {
                entries.retain(|key, _| key.project_id != project_id);
            }
        }
        before - entries.len()
    }

    pub fn stats(&self, now: DateTime<Utc>) -> CacheStats {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut cache_keys: Vec<String> = entries
            .keys()
            .map(|key| cache_key(&key.project_id, &key.range))
            .collect();
        cache_keys.sort();
        CacheStats {
            total_cached: entries.len(),
            expired: entries
                .values()
                .filter(|entry| now - entry.stored_at >= self.ttl)
                .count(),
            ttl_seconds: self.ttl.num_seconds(),
            cache_keys,
        }
    }
}
