#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;
use watchdog_core::{FeedbackRecord, Progress, RequestRecord, TokenUsage};
use watchdog_db::Db;

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
    pub path: PathBuf,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let mut db = Db::open(&path).expect("open db");
    db.migrate().expect("migrate db");
    TestDb {
        _dir: dir,
        db,
        path,
    }
}

pub fn make_request(id: &str, project_id: &str, ts: &str, cost: f64) -> RequestRecord {
    RequestRecord {
        id: id.to_string(),
        ts: ts.to_string(),
        project_id: project_id.to_string(),
        provider: "openai".to_string(),
        model: "gpt-4o".to_string(),
        usage: TokenUsage::new(100, 200),
        total_cost_usd: cost,
        similarity_score: 0.5,
        pattern_score: 0,
        advisor_level: 0,
        prompt_fingerprint: Some(format!("prompt {id}")),
        progress: Some(Progress::Exploring),
        token_efficiency: 2.0,
    }
}

pub fn insert_requests(db: &Db, records: &[RequestRecord]) {
    for record in records {
        db.insert_request(record).expect("insert request");
    }
}

pub fn make_feedback(id: &str, request_id: &str, project_id: &str, ts: &str) -> FeedbackRecord {
    FeedbackRecord {
        id: id.to_string(),
        request_id: request_id.to_string(),
        project_id: project_id.to_string(),
        is_accurate: true,
        message: None,
        ts: ts.to_string(),
    }
}
