#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;
use watchdog_app::config::WatchdogConfig;
use watchdog_app::{
    AppState, HttpUpstream, Upstream, UpstreamError, UpstreamRequest, UpstreamResponse,
};
use watchdog_core::{RequestRecord, TokenUsage, format_ts};

pub struct TestApp {
    pub _dir: TempDir,
    pub state: AppState,
}

pub fn setup_app(settings: WatchdogConfig, upstream: Arc<dyn Upstream>) -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("app.sqlite");
    let state = AppState::with_upstream(db_path, settings, upstream);
    state.setup_db().expect("setup db");
    state.services.guard.reseed(7);
    TestApp { _dir: dir, state }
}

pub fn setup_offline(settings: WatchdogConfig) -> TestApp {
    setup_app(settings, Arc::new(UnreachableUpstream))
}

pub fn setup_with_base_url(mut settings: WatchdogConfig, base_url: String) -> TestApp {
    settings.upstream.openai_base_url = base_url;
    let upstream = HttpUpstream::new(&settings.upstream).expect("upstream client");
    setup_app(settings, Arc::new(upstream))
}

/// Fails every call, for tests that must never reach a provider.
pub struct UnreachableUpstream;

#[async_trait]
impl Upstream for UnreachableUpstream {
    async fn send(&self, _request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        Err(UpstreamError::Transport("connection refused".to_string()))
    }
}

pub fn minutes_ago(minutes: i64) -> String {
    format_ts(Utc::now() - Duration::minutes(minutes))
}

pub fn make_record(id: &str, project_id: &str, ts: &str, cost: f64) -> RequestRecord {
    RequestRecord {
        id: id.to_string(),
        ts: ts.to_string(),
        project_id: project_id.to_string(),
        provider: "openai".to_string(),
        model: "gpt-4o".to_string(),
        usage: TokenUsage::new(1000, 500),
        total_cost_usd: cost,
        similarity_score: 0.0,
        pattern_score: 0,
        advisor_level: 0,
        prompt_fingerprint: Some(format!("prompt {id}")),
        progress: None,
        token_efficiency: 0.5,
    }
}

pub fn insert_records(app: &TestApp, records: &[RequestRecord]) {
    let db = app.state.open_db().expect("open db");
    for record in records {
        db.insert_request(record).expect("insert record");
    }
}

pub fn stored_count(app: &TestApp, project_id: &str) -> usize {
    let db = app.state.open_db().expect("open db");
    db.recent_requests(project_id, 1000).expect("recent").len()
}
