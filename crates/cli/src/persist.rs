//! Artifact persistence
//!
//! The harness core hands over opaque evidence payloads and a structured
//! Report; this module decides file names and formats. Layout:
//!
//! ```text
//! <output>/
//!   report.json
//!   summary.md
//!   evidence/
//!     01-initial-load-<hash>.png
//!     ...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use pageproof_harness::evidence::{EvidencePayload, EvidenceRecord};
use pageproof_harness::{Report, Severity};

/// Write all run artifacts under `dir`, returning the paths written.
pub fn write_artifacts(report: &Report, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let report_path = dir.join("report.json");
    fs::write(&report_path, serde_json::to_string_pretty(report)?)?;
    written.push(report_path);

    let summary_path = dir.join("summary.md");
    fs::write(&summary_path, render_summary(report))?;
    written.push(summary_path);

    if !report.evidence.is_empty() {
        let evidence_dir = dir.join("evidence");
        fs::create_dir_all(&evidence_dir)?;
        for record in &report.evidence {
            written.push(write_evidence(record, &evidence_dir)?);
        }
    }

    Ok(written)
}

fn write_evidence(record: &EvidenceRecord, dir: &Path) -> anyhow::Result<PathBuf> {
    let (ext, bytes) = match &record.payload {
        EvidencePayload::PngBase64(data) => (
            "png",
            BASE64
                .decode(data)
                .with_context(|| format!("decoding evidence {}", record.id))?,
        ),
        EvidencePayload::HtmlFragment(html) => ("html", html.clone().into_bytes()),
        EvidencePayload::Text(text) => ("txt", text.clone().into_bytes()),
    };
    let path = dir.join(format!("{}.{}", record.id, ext));
    fs::write(&path, bytes)?;
    Ok(path)
}

/// Render the markdown run summary.
pub fn render_summary(report: &Report) -> String {
    let by_severity = |severity: Severity| -> Vec<_> {
        report
            .issues
            .iter()
            .filter(|i| i.severity == severity)
            .collect()
    };
    let critical = by_severity(Severity::Critical);
    let major = by_severity(Severity::Major);
    let minor = by_severity(Severity::Minor);

    let mut out = String::new();
    out.push_str("# PageProof Deployment Report\n\n");
    out.push_str(&format!("**Test Date**: {}\n", report.timestamp));
    out.push_str(&format!("**URL**: {}\n", report.target));
    out.push_str(&format!("**Verdict**: {}\n\n", report.verdict));

    out.push_str("## Page Load\n");
    out.push_str(&format!(
        "- HTTP Status: {}\n",
        report
            .navigation
            .http_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string())
    ));
    out.push_str(&format!("- Load Time: {}ms\n", report.navigation.elapsed_ms));
    out.push_str(&format!("- Attempts: {}\n", report.navigation.attempts));
    if let Some(size) = report.document_size_bytes {
        out.push_str(&format!("- Document Size: {}KB\n", size / 1024));
    }
    out.push_str(&format!(
        "- Total Page Size: {}KB\n\n",
        report.total_size_bytes / 1024
    ));

    out.push_str(&format!(
        "## Features Working ({})\n",
        report.features_working.len()
    ));
    for feature in &report.features_working {
        out.push_str(&format!("- ✅ {}\n", feature));
    }
    out.push('\n');

    out.push_str("## Issues Found\n");
    out.push_str(&format!("- Critical: {}\n", critical.len()));
    out.push_str(&format!("- Major: {}\n", major.len()));
    out.push_str(&format!("- Minor: {}\n", minor.len()));
    out.push_str(&format!("- **Total**: {}\n\n", report.issues.len()));

    for (heading, issues) in [
        ("### Critical Issues\n", &critical),
        ("### Major Issues\n", &major),
        ("### Minor Issues\n", &minor),
    ] {
        if issues.is_empty() {
            continue;
        }
        out.push_str(heading);
        for (idx, issue) in issues.iter().enumerate() {
            out.push_str(&format!(
                "{}. **{}**: {}\n   - Location: {}\n",
                idx + 1,
                issue.category,
                issue.description,
                issue.location
            ));
        }
        out.push('\n');
    }

    out.push_str("## Console Errors\n");
    out.push_str(&format!("- Count: {}\n", report.console_events.len()));
    if !report.console_events.is_empty() {
        out.push_str("\nFirst 5 errors:\n");
        for event in report.console_events.iter().take(5) {
            out.push_str(&format!("- {}\n", event.message));
        }
    }
    out.push('\n');

    out.push_str("## Evidence\n");
    for record in &report.evidence {
        out.push_str(&format!("- {}\n", record.id));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageproof_harness::evidence::EvidenceId;
    use pageproof_harness::navigator::{NavStatus, NavigationOutcome};
    use pageproof_harness::{Issue, IssueCategory, Verdict};

    fn sample_report() -> Report {
        Report {
            target: "https://site.test/plan/".to_string(),
            timestamp: "2026-02-03T00:00:00Z".to_string(),
            navigation: NavigationOutcome {
                status: NavStatus::Success,
                http_status: Some(200),
                elapsed_ms: 1400,
                attempts: 1,
                failure: None,
            },
            network_events: vec![],
            console_events: vec![],
            probe_results: vec![],
            issues: vec![Issue {
                severity: Severity::Major,
                category: IssueCategory::Performance,
                description: "page load time 6000ms exceeds 5000ms threshold".to_string(),
                location: "page_load".to_string(),
            }],
            features_working: vec!["no JavaScript console errors".to_string()],
            verdict: Verdict::PassWithWarnings,
            evidence: vec![EvidenceRecord {
                id: EvidenceId("01-initial-load-deadbeef".to_string()),
                label: "initial-load".to_string(),
                // base64 of a short payload; written out as a .png file
                payload: EvidencePayload::PngBase64("aGVsbG8=".to_string()),
            }],
            document_size_bytes: Some(230_000),
            total_size_bytes: 245_000,
        }
    }

    #[test]
    fn summary_contains_all_sections() {
        let summary = render_summary(&sample_report());
        assert!(summary.contains("# PageProof Deployment Report"));
        assert!(summary.contains("**Verdict**: PASS_WITH_WARNINGS"));
        assert!(summary.contains("## Page Load"));
        assert!(summary.contains("### Major Issues"));
        assert!(summary.contains("1. **performance**: page load time"));
        assert!(summary.contains("## Evidence"));
        assert!(summary.contains("01-initial-load-deadbeef"));
    }

    #[test]
    fn artifacts_land_in_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_artifacts(&sample_report(), dir.path()).unwrap();

        assert!(dir.path().join("report.json").exists());
        assert!(dir.path().join("summary.md").exists());
        let png = dir.path().join("evidence/01-initial-load-deadbeef.png");
        assert!(png.exists());
        // Evidence is decoded on the way out
        assert_eq!(fs::read(&png).unwrap(), b"hello");
        assert_eq!(written.len(), 3);
    }
}
