//! Verdict Pipeline Test
//!
//! Feeds synthetic run data through the public classification and
//! aggregation pipeline and checks the assembled Report end to end,
//! including the fatal-navigation shape (issues but zero probe results).

use pageproof_harness::navigator::{NavStatus, NavigationOutcome};
use pageproof_harness::observer::{ConsoleEvent, ConsoleKind, NetworkEvent};
use pageproof_harness::probe::{ProbeKind, ProbeResult, ProbeStatus};
use pageproof_harness::{aggregate, classify, Report, Verdict, VerifyConfig};

fn loaded(elapsed_ms: u64) -> NavigationOutcome {
    NavigationOutcome {
        status: NavStatus::Success,
        http_status: Some(200),
        elapsed_ms,
        attempts: 1,
        failure: None,
    }
}

fn passed(name: &str, kind: ProbeKind, detail: &str) -> ProbeResult {
    ProbeResult {
        name: name.to_string(),
        kind,
        status: ProbeStatus::Passed,
        metric: None,
        detail: Some(detail.to_string()),
        location: None,
        evidence: None,
    }
}

fn assemble(
    target: &str,
    navigation: NavigationOutcome,
    probe_results: Vec<ProbeResult>,
    network_events: Vec<NetworkEvent>,
    console_events: Vec<ConsoleEvent>,
    config: &VerifyConfig,
) -> Report {
    let issues = classify(
        &navigation,
        &probe_results,
        &network_events,
        &console_events,
        config,
        target,
    );
    let verdict = aggregate(&issues);
    let total_size_bytes = network_events.iter().map(|e| e.byte_size).sum();
    Report {
        target: target.to_string(),
        timestamp: "2026-02-03T00:00:00Z".to_string(),
        navigation,
        network_events,
        console_events,
        probe_results,
        issues,
        features_working: vec![],
        verdict,
        evidence: vec![],
        document_size_bytes: None,
        total_size_bytes,
    }
}

#[test]
fn clean_run_passes() {
    let config = VerifyConfig::default();
    let probes = vec![
        passed("size-range", ProbeKind::SizeRange, "document size 230000 bytes within range"),
        passed("style-equality", ProbeKind::StyleEquality, "background-color matches rgb(245, 241, 232)"),
        passed("library:Chart.js", ProbeKind::LibraryPresence, "Chart.js loaded"),
    ];
    let network = vec![NetworkEvent {
        url: "https://site.test/plan/index.html".to_string(),
        http_status: 200,
        byte_size: 230_000,
        content_type: "text/html".to_string(),
    }];

    let report = assemble("https://site.test/plan/", loaded(1400), probes, network, vec![], &config);

    assert_eq!(report.verdict, Verdict::Pass);
    assert!(report.issues.is_empty());
    assert_eq!(report.total_size_bytes, 230_000);
}

#[test]
fn major_findings_downgrade_to_warnings() {
    let config = VerifyConfig::default();
    let console = vec![ConsoleEvent {
        kind: ConsoleKind::ConsoleError,
        message: "failed to fetch stats".to_string(),
        stack: None,
        timestamp: "2026-02-03T00:00:01Z".to_string(),
    }];

    let report = assemble("https://site.test/plan/", loaded(1400), vec![], vec![], console, &config);

    assert_eq!(report.verdict, Verdict::PassWithWarnings);
    let (critical, major, _) = report.summary_counts();
    assert_eq!(critical, 0);
    assert_eq!(major, 1);
}

#[test]
fn fatal_navigation_produces_fail_report_with_no_probes() {
    let config = VerifyConfig::default();
    let navigation = NavigationOutcome {
        status: NavStatus::Exception,
        http_status: None,
        elapsed_ms: 94_000,
        attempts: 3,
        failure: Some("net::ERR_NAME_NOT_RESOLVED".to_string()),
    };

    let report = assemble("https://gone.test/", navigation, vec![], vec![], vec![], &config);

    assert_eq!(report.verdict, Verdict::Fail);
    assert!(report.probe_results.is_empty());
    // Exactly two issues: the fatal load plus the threshold breach from
    // time spent retrying
    let (critical, major, _) = report.summary_counts();
    assert_eq!(critical, 1);
    assert_eq!(major, 1);
    assert!(report
        .issues
        .iter()
        .any(|i| i.description.contains("ERR_NAME_NOT_RESOLVED")));
}

#[test]
fn soft_http_error_keeps_probe_results_in_report() {
    let config = VerifyConfig::default();
    let navigation = NavigationOutcome {
        status: NavStatus::HttpError,
        http_status: Some(404),
        elapsed_ms: 900,
        attempts: 3,
        failure: None,
    };
    let probes = vec![passed("content-integrity", ProbeKind::ContentIntegrity, "no placeholder artifacts")];

    let report = assemble("https://site.test/plan/", navigation, probes, vec![], vec![], &config);

    // Critical page-load issue forces FAIL, but probing still happened
    assert_eq!(report.verdict, Verdict::Fail);
    assert_eq!(report.probe_results.len(), 1);
}

#[test]
fn report_json_round_trip_preserves_verdict_and_order() {
    let config = VerifyConfig::default();
    let console = vec![ConsoleEvent {
        kind: ConsoleKind::RuntimeError,
        message: "undefined is not a function".to_string(),
        stack: Some("at render (app.js:14)".to_string()),
        timestamp: "2026-02-03T00:00:02Z".to_string(),
    }];
    let network = vec![
        NetworkEvent {
            url: "https://site.test/plan/index.html".to_string(),
            http_status: 200,
            byte_size: 210_000,
            content_type: "text/html".to_string(),
        },
        NetworkEvent {
            url: "https://site.test/plan/missing.css".to_string(),
            http_status: 404,
            byte_size: 0,
            content_type: "text/html".to_string(),
        },
    ];

    let report = assemble("https://site.test/plan/", loaded(7_000), vec![], network, console, &config);
    let json = serde_json::to_string_pretty(&report).unwrap();
    let parsed: Report = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.verdict, report.verdict);
    assert_eq!(parsed.issues.len(), report.issues.len());
    for (a, b) in parsed.issues.iter().zip(report.issues.iter()) {
        assert_eq!(a.severity, b.severity);
        assert_eq!(a.category, b.category);
    }
    assert_eq!(parsed.network_events.len(), 2);
    assert_eq!(parsed.network_events[1].http_status, 404);
    // Verdict serializes in wire form
    assert!(json.contains("\"PASS_WITH_WARNINGS\""));
}
