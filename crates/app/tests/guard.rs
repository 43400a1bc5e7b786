mod support;

use chrono::Utc;
use support::{insert_records, make_record, minutes_ago, setup_offline, stored_count};
use watchdog_app::AppError;
use watchdog_app::config::WatchdogConfig;
use watchdog_app::services::{GuardRequest, Verdict};
use watchdog_app::Provider;
use watchdog_core::{AnalysisResult, ChatMessage, TokenUsage};

fn request<'a>(project_id: &'a str, messages: &'a [ChatMessage]) -> GuardRequest<'a> {
    GuardRequest {
        project_id,
        provider: Provider::OpenAi,
        model: "gpt-4o",
        messages,
    }
}

#[test]
fn spend_over_the_ceiling_is_rejected_with_retry_after() {
    let app = setup_offline(WatchdogConfig::default());
    insert_records(
        &app,
        &[
            make_record("r1", "alpha", &minutes_ago(50), 2.5),
            make_record("r2", "alpha", &minutes_ago(10), 2.4),
            make_record("old", "alpha", &minutes_ago(90), 10.0),
        ],
    );
    let messages = vec![ChatMessage::user("one more try")];
    let guard = &app.state.services.guard;

    // 200k prompt + 50k completion tokens of gpt-4o cost $1.00.
    let verdict = guard
        .evaluate(
            &request("alpha", &messages),
            &AnalysisResult::neutral(),
            TokenUsage::new(200_000, 50_000),
            Utc::now(),
        )
        .expect("evaluate");
    let Verdict::Rejected(cooldown) = verdict else {
        panic!("expected a rejection");
    };
    assert_eq!(cooldown.retry_after_seconds, 1200);
    assert!((cooldown.cost_usd - 5.9).abs() < 1e-9);
    assert!((cooldown.cost_cny - 43.07).abs() < 1e-9);
    assert!(!cooldown.message.is_empty());
    assert!(!cooldown.suggestions.is_empty());
    assert_eq!(stored_count(&app, "alpha"), 3);
}

#[test]
fn preflight_blocks_projects_already_over_the_ceiling() {
    let app = setup_offline(WatchdogConfig::default());
    insert_records(
        &app,
        &[
            make_record("r1", "alpha", &minutes_ago(30), 6.0),
            make_record("b1", "beta", &minutes_ago(30), 1.0),
        ],
    );
    let guard = &app.state.services.guard;
    let err = guard
        .preflight("alpha", Utc::now())
        .expect_err("alpha is cooling down");
    let AppError::RateLimited(cooldown) = err else {
        panic!("expected rate limit");
    };
    assert_eq!(cooldown.retry_after_seconds, 1200);
    assert!(cooldown.retry_after_seconds > 0);
    guard.preflight("beta", Utc::now()).expect("beta is fine");
}

#[test]
fn disabled_rate_limit_accepts_everything() {
    let mut settings = WatchdogConfig::default();
    settings.advisor.enable_rate_limit = false;
    let app = setup_offline(settings);
    insert_records(&app, &[make_record("r1", "alpha", &minutes_ago(5), 50.0)]);
    let messages = vec![ChatMessage::user("hello")];
    let guard = &app.state.services.guard;
    guard.preflight("alpha", Utc::now()).expect("no ceiling");
    let verdict = guard
        .evaluate(
            &request("alpha", &messages),
            &AnalysisResult::neutral(),
            TokenUsage::new(1000, 1000),
            Utc::now(),
        )
        .expect("evaluate");
    let Verdict::Accepted(assessment) = verdict else {
        panic!("expected acceptance");
    };
    // Spend past the warning band still escalates the advisor.
    assert_eq!(assessment.level, 3);
    assert!(!assessment.message.is_empty());
}

#[test]
fn accepted_requests_are_recorded_with_a_fingerprint() {
    let app = setup_offline(WatchdogConfig::default());
    let messages = vec![ChatMessage::user("Explain the borrow checker")];
    let guard = &app.state.services.guard;
    let verdict = guard
        .evaluate(
            &request("alpha", &messages),
            &AnalysisResult::neutral(),
            TokenUsage::new(1000, 500),
            Utc::now(),
        )
        .expect("evaluate");
    let Verdict::Accepted(assessment) = verdict else {
        panic!("expected acceptance");
    };
    assert_eq!(assessment.level, 0);
    assert_eq!(assessment.message, "");
    assert!((assessment.cost_usd - 0.0075).abs() < 1e-12);
    assert!((assessment.cost_cny - 0.0075 * 7.3).abs() < 1e-12);
    assert_eq!(assessment.request_id.len(), 32);

    let db = app.state.open_db().expect("open db");
    let stored = db
        .get_request(&assessment.request_id)
        .expect("get")
        .expect("recorded");
    assert_eq!(stored.project_id, "alpha");
    assert_eq!(stored.provider, "openai");
    assert!((stored.token_efficiency - 0.5).abs() < 1e-12);
    let fingerprint = stored.prompt_fingerprint.expect("fingerprint");
    assert!(fingerprint.starts_with("simhash:"), "{fingerprint}");
}

#[test]
fn spend_near_the_ceiling_raises_the_level() {
    let app = setup_offline(WatchdogConfig::default());
    insert_records(&app, &[make_record("r1", "alpha", &minutes_ago(20), 3.9)]);
    let messages = vec![ChatMessage::user("continue")];
    let verdict = app
        .state
        .services
        .guard
        .evaluate(
            &request("alpha", &messages),
            &AnalysisResult::neutral(),
            TokenUsage::new(100_000, 0),
            Utc::now(),
        )
        .expect("evaluate");
    let Verdict::Accepted(assessment) = verdict else {
        panic!("expected acceptance");
    };
    assert_eq!(assessment.level, 3);
    assert!(!assessment.message.is_empty());
    assert!((assessment.window_cost_usd - 4.15).abs() < 1e-9);
}

#[test]
fn concurrent_evaluations_admit_only_what_fits_under_the_ceiling() {
    let app = setup_offline(WatchdogConfig::default());
    insert_records(&app, &[make_record("r1", "alpha", &minutes_ago(10), 4.0)]);
    let guard = &app.state.services.guard;
    let now = Utc::now();

    let accepted = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|call| {
                scope.spawn(move || {
                    let messages = vec![ChatMessage::user(format!("parallel call {call}"))];
                    // 60k completion tokens of gpt-4o cost $0.60.
                    let verdict = guard
                        .evaluate(
                            &request("alpha", &messages),
                            &AnalysisResult::neutral(),
                            TokenUsage::new(0, 60_000),
                            now,
                        )
                        .expect("evaluate");
                    matches!(verdict, Verdict::Accepted(_))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("evaluation thread"))
            .filter(|accepted| *accepted)
            .count()
    });

    assert_eq!(accepted, 1);
    assert_eq!(stored_count(&app, "alpha"), 2);
}

#[test]
fn empty_prompt_stores_no_fingerprint() {
    let app = setup_offline(WatchdogConfig::default());
    let messages = vec![ChatMessage {
        role: "system".to_string(),
        content: "You are terse".to_string(),
    }];
    let verdict = app
        .state
        .services
        .guard
        .evaluate(
            &request("alpha", &messages),
            &AnalysisResult::neutral(),
            TokenUsage::new(0, 10),
            Utc::now(),
        )
        .expect("evaluate");
    let Verdict::Accepted(assessment) = verdict else {
        panic!("expected acceptance");
    };
    let db = app.state.open_db().expect("open db");
    let stored = db
        .get_request(&assessment.request_id)
        .expect("get")
        .expect("recorded");
    assert!(stored.prompt_fingerprint.is_none());
    assert_eq!(stored.token_efficiency, 0.0);
}

#[test]
fn analysis_of_a_missing_database_degrades_to_neutral() {
    let app = setup_offline(WatchdogConfig::default());
    std::fs::remove_file(&app.state.config.db_path).expect("remove db");
    std::fs::create_dir(&app.state.config.db_path).expect("block path");
    let messages = vec![ChatMessage::user("Same TypeError again")];
    let result = app
        .state
        .services
        .guard
        .analyze(&request("alpha", &messages), Utc::now());
    assert_eq!(result, AnalysisResult::neutral());
}
