mod support;

use chrono::{Duration, Utc};
use support::{insert_records, make_record, minutes_ago, setup_offline};
use watchdog_app::AppError;
use watchdog_app::config::WatchdogConfig;

#[test]
fn empty_project_reports_not_applicable() {
    let app = setup_offline(WatchdogConfig::default());
    let report = app
        .state
        .services
        .efficiency
        .report("ghost", None, false)
        .expect("report");
    assert_eq!(report.grade, "N/A");
    assert_eq!(report.score, 0.0);
}

#[test]
fn report_covers_only_the_requested_range() {
    let app = setup_offline(WatchdogConfig::default());
    let mut cheap = make_record("c1", "alpha", &minutes_ago(60), 0.001);
    cheap.model = "deepseek-chat".to_string();
    insert_records(
        &app,
        &[
            cheap,
            make_record("c2", "alpha", &minutes_ago(60 * 24 * 3), 0.2),
            make_record("c3", "alpha", &minutes_ago(60 * 24 * 20), 0.2),
        ],
    );
    let efficiency = &app.state.services.efficiency;

    let day = efficiency.report("alpha", Some("24h"), true).expect("day");
    assert_eq!(day.metrics.as_ref().expect("metrics").total_requests, 1);

    let week = efficiency.report("alpha", Some("7d"), true).expect("week");
    assert_eq!(week.metrics.as_ref().expect("metrics").total_requests, 2);

    let month = efficiency.report("alpha", Some("30d"), true).expect("month");
    assert_eq!(month.metrics.as_ref().expect("metrics").total_requests, 3);

    let err = efficiency
        .report("alpha", Some("fortnight"), true)
        .expect_err("unknown range");
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[test]
fn cached_reports_are_reused_until_bypassed_or_invalidated() {
    let app = setup_offline(WatchdogConfig::default());
    insert_records(&app, &[make_record("c1", "alpha", &minutes_ago(10), 0.01)]);
    let efficiency = &app.state.services.efficiency;
    let now = Utc::now();

    let first = efficiency
        .report_at("alpha", Some("7d"), false, now)
        .expect("first");
    insert_records(&app, &[make_record("c2", "alpha", &minutes_ago(5), 0.01)]);

    let cached = efficiency
        .report_at("alpha", Some("7d"), false, now + Duration::minutes(1))
        .expect("cached");
    assert_eq!(cached, first);

    let fresh = efficiency
        .report_at("alpha", Some("7d"), true, now + Duration::minutes(1))
        .expect("fresh");
    assert_eq!(fresh.metrics.as_ref().expect("metrics").total_requests, 2);

    assert_eq!(efficiency.invalidate(Some("alpha"), None), 1);
    assert_eq!(efficiency.cache_stats().total_cached, 0);
}
