mod support;

use support::{insert_requests, make_request, setup_db};
use watchdog_core::{Progress, RequestStore, TimeRange};

#[test]
fn insert_and_get_preserves_every_column() {
    let test_db = setup_db();
    let mut record = make_request("r1", "alpha", "2025-03-01T10:00:00.000Z", 0.0125);
    record.pattern_score = -3;
    record.advisor_level = 2;
    record.progress = Some(Progress::Stuck);
    record.prompt_fingerprint = Some("simhash:00000000000000ff".to_string());
    test_db.db.insert_request(&record).expect("insert");

    let loaded = test_db.db.get_request("r1").expect("get").expect("exists");
    assert_eq!(loaded, record);
    assert!(test_db.db.get_request("missing").expect("get").is_none());
}

#[test]
fn missing_progress_and_fingerprint_load_as_none() {
    let test_db = setup_db();
    let mut record = make_request("r1", "alpha", "2025-03-01T10:00:00.000Z", 0.01);
    record.progress = None;
    record.prompt_fingerprint = None;
    test_db.db.insert_request(&record).expect("insert");

    let loaded = test_db.db.get_request("r1").expect("get").expect("exists");
    assert!(loaded.progress.is_none());
    assert!(loaded.prompt_fingerprint.is_none());
}

#[test]
fn recent_requests_are_newest_first_and_project_scoped() {
    let test_db = setup_db();
    insert_requests(
        &test_db.db,
        &[
            make_request("a1", "alpha", "2025-03-01T10:00:00.000Z", 0.01),
            make_request("a2", "alpha", "2025-03-01T10:01:00.000Z", 0.01),
            make_request("b1", "beta", "2025-03-01T10:02:00.000Z", 0.01),
            make_request("a3", "alpha", "2025-03-01T10:03:00.000Z", 0.01),
        ],
    );

    let recent = test_db.db.recent_requests("alpha", 2).expect("recent");
    let ids: Vec<&str> = recent.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, vec!["a3", "a2"]);

    let beta = test_db.db.recent_requests("beta", 10).expect("recent");
    assert_eq!(beta.len(), 1);
    assert!(test_db.db.recent_requests("gamma", 10).expect("recent").is_empty());
}

#[test]
fn window_cost_excludes_the_boundary_and_other_projects() {
    let test_db = setup_db();
    insert_requests(
        &test_db.db,
        &[
            make_request("a1", "alpha", "2025-03-01T09:00:00.000Z", 1.0),
            make_request("a2", "alpha", "2025-03-01T09:30:00.000Z", 2.0),
            make_request("a3", "alpha", "2025-03-01T09:45:00.000Z", 0.5),
            make_request("b1", "beta", "2025-03-01T09:40:00.000Z", 4.0),
        ],
    );

    let cost = test_db
        .db
        .window_cost("alpha", "2025-03-01T09:00:00.000Z")
        .expect("window cost");
    assert!((cost - 2.5).abs() < 1e-9);

    let since = test_db
        .db
        .requests_since("alpha", "2025-03-01T09:00:00.000Z")
        .expect("since");
    assert_eq!(since.len(), 2);
    assert_eq!(since[0].id, "a3");

    let empty = test_db
        .db
        .window_cost("gamma", "2025-03-01T09:00:00.000Z")
        .expect("window cost");
    assert_eq!(empty, 0.0);
}

#[test]
fn range_queries_are_inclusive_and_validated() {
    let test_db = setup_db();
    insert_requests(
        &test_db.db,
        &[
            make_request("a1", "alpha", "2025-03-01T09:00:00.000Z", 1.0),
            make_request("a2", "alpha", "2025-03-01T10:00:00.000Z", 1.0),
            make_request("a3", "alpha", "2025-03-01T11:00:00.000Z", 1.0),
        ],
    );
    let range = TimeRange {
        start: "2025-03-01T09:00:00.000Z".to_string(),
        end: "2025-03-01T10:00:00.000Z".to_string(),
    };
    let records = test_db.db.requests_in_range("alpha", &range).expect("range");
    assert_eq!(records.len(), 2);

    let bad = TimeRange {
        start: "yesterday".to_string(),
        end: "2025-03-01T10:00:00.000Z".to_string(),
    };
    assert!(test_db.db.requests_in_range("alpha", &bad).is_err());
}

#[test]
fn warnings_filter_by_level_and_project() {
    let test_db = setup_db();
    let mut records = Vec::new();
    for (index, level) in [0u8, 2, 3, 1, 4].iter().enumerate() {
        let project = if index % 2 == 0 { "alpha" } else { "beta" };
        let mut record = make_request(
            &format!("r{index}"),
            project,
            &format!("2025-03-01T10:0{index}:00.000Z"),
            0.1,
        );
        record.advisor_level = *level;
        records.push(record);
    }
    insert_requests(&test_db.db, &records);

    let since = "2025-03-01T00:00:00.000Z";
    let all = test_db.db.warnings(None, 2, since, 10).expect("warnings");
    let ids: Vec<&str> = all.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, vec!["r4", "r2", "r1"]);

    let alpha = test_db.db.warnings(Some("alpha"), 2, since, 10).expect("warnings");
    let ids: Vec<&str> = alpha.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, vec!["r4", "r2"]);

    let limited = test_db.db.warnings(None, 2, since, 1).expect("warnings");
    assert_eq!(limited.len(), 1);

    let later = test_db
        .db
        .warnings(None, 2, "2025-03-01T10:03:00.000Z", 10)
        .expect("warnings");
    assert_eq!(later.len(), 1);
}

#[test]
fn empty_project_id_is_rejected() {
    let test_db = setup_db();
    let record = make_request("r1", "  ", "2025-03-01T10:00:00.000Z", 0.1);
    assert!(test_db.db.insert_request(&record).is_err());
}

#[test]
fn db_backs_the_request_store_trait() {
    let test_db = setup_db();
    let store: &dyn RequestStore = &test_db.db;
    store
        .insert(&make_request("a1", "alpha", "2025-03-01T10:00:00.000Z", 0.2))
        .expect("insert");
    store
        .insert(&make_request("a2", "alpha", "2025-03-01T10:05:00.000Z", 0.3))
        .expect("insert");

    let recent = store.query_recent("alpha", 5).expect("recent");
    assert_eq!(recent[0].id, "a2");
    let since = store
        .query_since("alpha", "2025-03-01T10:00:00.000Z")
        .expect("since");
    assert_eq!(since.len(), 1);

    let duplicate = store.insert(&make_request("a1", "alpha", "2025-03-01T10:06:00.000Z", 0.1));
    assert!(duplicate.is_err());
}
