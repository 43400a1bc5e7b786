mod support;

use support::{insert_requests, make_feedback, make_request, setup_db};
use watchdog_core::TimeRange;

fn day_range() -> TimeRange {
    TimeRange {
        start: "2025-03-01T00:00:00.000Z".to_string(),
        end: "2025-03-01T23:59:59.999Z".to_string(),
    }
}

#[test]
fn list_projects_summarises_each_project() {
    let test_db = setup_db();
    insert_requests(
        &test_db.db,
        &[
            make_request("a1", "alpha", "2025-03-01T09:00:00.000Z", 1.0),
            make_request("a2", "alpha", "2025-03-01T10:00:00.000Z", 0.5),
            make_request("b1", "beta", "2025-03-01T11:00:00.000Z", 2.0),
        ],
    );

    let projects = test_db.db.list_projects().expect("projects");
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].project_id, "beta");
    let alpha = &projects[1];
    assert_eq!(alpha.request_count, 2);
    assert!((alpha.total_cost_usd - 1.5).abs() < 1e-9);
    assert_eq!(alpha.first_seen.as_deref(), Some("2025-03-01T09:00:00.000Z"));
    assert_eq!(alpha.last_seen.as_deref(), Some("2025-03-01T10:00:00.000Z"));
}

#[test]
fn project_stats_aggregates_within_the_range() {
    let test_db = setup_db();
    let mut stuck = make_request("a2", "alpha", "2025-03-01T10:00:00.000Z", 0.5);
    stuck.advisor_level = 3;
    stuck.similarity_score = 0.9;
    stuck.token_efficiency = 1.0;
    insert_requests(
        &test_db.db,
        &[
            make_request("a1", "alpha", "2025-03-01T09:00:00.000Z", 1.0),
            stuck,
            make_request("old", "alpha", "2025-02-27T09:00:00.000Z", 9.0),
            make_request("b1", "beta", "2025-03-01T11:00:00.000Z", 2.0),
        ],
    );

    let stats = test_db
        .db
        .project_stats("alpha", &day_range())
        .expect("stats");
    assert_eq!(stats.request_count, 2);
    assert!((stats.total_cost_usd - 1.5).abs() < 1e-9);
    assert_eq!(stats.prompt_tokens, 200);
    assert_eq!(stats.completion_tokens, 400);
    assert!((stats.avg_similarity.expect("similarity") - 0.7).abs() < 1e-9);
    assert!((stats.avg_token_efficiency.expect("efficiency") - 1.5).abs() < 1e-9);
    assert_eq!(stats.level_counts.get(&0), Some(&1));
    assert_eq!(stats.level_counts.get(&3), Some(&1));
}

#[test]
fn project_stats_for_unknown_project_is_empty() {
    let test_db = setup_db();
    let stats = test_db
        .db
        .project_stats("ghost", &day_range())
        .expect("stats");
    assert_eq!(stats.request_count, 0);
    assert_eq!(stats.total_cost_usd, 0.0);
    assert!(stats.avg_similarity.is_none());
    assert!(stats.level_counts.is_empty());
}

#[test]
fn purge_removes_requests_and_feedback_of_one_project() {
    let mut test_db = setup_db();
    insert_requests(
        &test_db.db,
        &[
            make_request("a1", "alpha", "2025-03-01T09:00:00.000Z", 1.0),
            make_request("a2", "alpha", "2025-03-01T10:00:00.000Z", 0.5),
            make_request("b1", "beta", "2025-03-01T11:00:00.000Z", 2.0),
        ],
    );
    test_db
        .db
        .insert_feedback(&make_feedback("f1", "a1", "alpha", "2025-03-01T09:05:00.000Z"))
        .expect("feedback");
    test_db
        .db
        .insert_feedback(&make_feedback("f2", "b1", "beta", "2025-03-01T11:05:00.000Z"))
        .expect("feedback");

    let counts = test_db.db.purge_project("alpha").expect("purge");
    assert_eq!(counts.requests, 2);
    assert_eq!(counts.feedback, 1);

    assert!(test_db.db.recent_requests("alpha", 10).expect("recent").is_empty());
    assert_eq!(test_db.db.recent_requests("beta", 10).expect("recent").len(), 1);
    assert_eq!(test_db.db.list_feedback("beta", 10).expect("feedback").len(), 1);

    let again = test_db.db.purge_project("alpha").expect("purge");
    assert_eq!(again.requests, 0);
    assert!(test_db.db.purge_project("").is_err());
}

#[test]
fn feedback_lists_newest_first() {
    let test_db = setup_db();
    let mut second = make_feedback("f2", "a2", "alpha", "2025-03-01T10:05:00.000Z");
    second.is_accurate = false;
    second.message = Some("the nudge came too early".to_string());
    test_db
        .db
        .insert_feedback(&make_feedback("f1", "a1", "alpha", "2025-03-01T09:05:00.000Z"))
        .expect("feedback");
    test_db.db.insert_feedback(&second).expect("feedback");

    let feedback = test_db.db.list_feedback("alpha", 10).expect("feedback");
    assert_eq!(feedback.len(), 2);
    assert_eq!(feedback[0], second);
    assert!(feedback[1].is_accurate);
}
