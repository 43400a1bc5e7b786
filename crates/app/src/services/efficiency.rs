use chrono::{DateTime, Utc};
use tracing::debug;
use watchdog_core::{EfficiencyReport, compute_efficiency};

use crate::cache::{CacheStats, EfficiencyCache};
use crate::error::Result;
use crate::services::{SharedConfig, open_db};
use crate::util::time::{DEFAULT_RANGE, range_from_label};

#[derive(Clone)]
pub struct EfficiencyService {
    config: SharedConfig,
    cache: EfficiencyCache,
}

impl EfficiencyService {
    pub(super) fn new(config: SharedConfig, cache: EfficiencyCache) -> Self {
        Self { config, cache }
    }

    /// Report over a named range (`24h`, `7d`, `30d`, ...), served from the
    /// cache unless `no_cache` is set. Fresh results always refill the cache.
    pub fn report(
        &self,
        project_id: &str,
        range: Option<&str>,
        no_cache: bool,
    ) -> Result<EfficiencyReport> {
        self.report_at(project_id, range, no_cache, Utc::now())
    }

    pub fn report_at(
        &self,
        project_id: &str,
        range: Option<&str>,
        no_cache: bool,
        now: DateTime<Utc>,
    ) -> Result<EfficiencyReport> {
        let label = range.unwrap_or(DEFAULT_RANGE);
        let window = range_from_label(label, now)?;
        if !no_cache {
            if let Some(report) = self.cache.get(project_id, label, now) {
                debug!(project_id, range = label, "efficiency cache hit");
                return Ok(report);
            }
        }
        let db = open_db(&self.config)?;
        let records = db.requests_in_range(project_id, &window)?;
        let report = compute_efficiency(&records);
        self.cache.set(project_id, label, report.clone(), now);
        Ok(report)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats(Utc::now())
    }

    pub fn invalidate(&self, project_id: Option<&str>, range: Option<&str>) -> usize {
        self.cache.invalidate(project_id, range)
    }
}
