//! Rule-based issue classification
//!
//! A pure function from probe results and observer snapshots to
//! severity-tagged issues. All thresholds come from configuration; the
//! same inputs always yield the same issue list. Every issue traces to
//! exactly one probe result or observer accumulation.

use serde::{Deserialize, Serialize};

use crate::config::VerifyConfig;
use crate::navigator::{NavStatus, NavigationOutcome};
use crate::observer::{ConsoleEvent, NetworkEvent};
use crate::probe::{ProbeKind, ProbeResult, ProbeStatus};

/// Total severity order: critical > major > minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    PageLoad,
    Performance,
    FileSize,
    JavascriptErrors,
    ResourceLoading,
    ColorTheme,
    Content,
    Interactivity,
    Libraries,
    Data,
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IssueCategory::PageLoad => "page_load",
            IssueCategory::Performance => "performance",
            IssueCategory::FileSize => "file_size",
            IssueCategory::JavascriptErrors => "javascript_errors",
            IssueCategory::ResourceLoading => "resource_loading",
            IssueCategory::ColorTheme => "color_theme",
            IssueCategory::Content => "content",
            IssueCategory::Interactivity => "interactivity",
            IssueCategory::Libraries => "libraries",
            IssueCategory::Data => "data",
        };
        f.write_str(s)
    }
}

/// A severity-tagged finding. Only the classifier constructs these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub category: IssueCategory,
    pub description: String,
    pub location: String,
}

/// Derive the issue list for one run.
pub fn classify(
    navigation: &NavigationOutcome,
    probes: &[ProbeResult],
    network: &[NetworkEvent],
    console: &[ConsoleEvent],
    config: &VerifyConfig,
    target: &str,
) -> Vec<Issue> {
    let mut issues = Vec::new();

    match navigation.status {
        NavStatus::Success => {}
        NavStatus::HttpError => issues.push(Issue {
            severity: Severity::Critical,
            category: IssueCategory::PageLoad,
            description: format!(
                "HTTP {} - expected 200",
                navigation.http_status.unwrap_or(0)
            ),
            location: target.to_string(),
        }),
        NavStatus::Exception => issues.push(Issue {
            severity: Severity::Critical,
            category: IssueCategory::PageLoad,
            description: format!(
                "failed to load page after {} attempt(s): {}",
                navigation.attempts,
                navigation.failure.as_deref().unwrap_or("navigation threw")
            ),
            location: target.to_string(),
        }),
    }

    // Load-time issue is independent of the navigation classification
    if navigation.elapsed_ms > config.performance_threshold_ms {
        issues.push(Issue {
            severity: Severity::Major,
            category: IssueCategory::Performance,
            description: format!(
                "page load time {}ms exceeds {}ms threshold",
                navigation.elapsed_ms, config.performance_threshold_ms
            ),
            location: "page_load".to_string(),
        });
    }

    if !console.is_empty() {
        issues.push(Issue {
            severity: Severity::Major,
            category: IssueCategory::JavascriptErrors,
            description: format!("{} console error(s) detected", console.len()),
            location: "page".to_string(),
        });
    }

    let not_found: Vec<&NetworkEvent> = network.iter().filter(|e| e.http_status == 404).collect();
    if !not_found.is_empty() {
        issues.push(Issue {
            severity: Severity::Major,
            category: IssueCategory::ResourceLoading,
            description: format!("{} resource(s) failed to load (404)", not_found.len()),
            location: not_found[0].url.clone(),
        });
    }

    for probe in probes {
        if let Some(issue) = classify_probe(probe, config) {
            issues.push(issue);
        }
    }

    issues
}

fn classify_probe(probe: &ProbeResult, config: &VerifyConfig) -> Option<Issue> {
    let location = probe.location.clone().unwrap_or_else(|| probe.name.clone());
    let description = probe
        .detail
        .clone()
        .unwrap_or_else(|| format!("{} did not pass", probe.name));

    match probe.status {
        ProbeStatus::Passed | ProbeStatus::Unavailable => None,
        // An exception mid-interaction (or mid-check) is always major
        ProbeStatus::Errored => Some(Issue {
            severity: Severity::Major,
            category: category_for(probe.kind),
            description,
            location,
        }),
        ProbeStatus::Failed => {
            let severity = match probe.kind {
                ProbeKind::SizeRange => {
                    // Near-miss is major; far outside the range is critical
                    let size = probe.metric.as_ref().and_then(|m| m.as_u64());
                    match size {
                        Some(size) if size > config.size_hard_limit_bytes => Severity::Critical,
                        _ => Severity::Major,
                    }
                }
                ProbeKind::StyleEquality | ProbeKind::ForbiddenPattern => Severity::Critical,
                ProbeKind::Presence => config
                    .features
                    .iter()
                    .find(|f| probe.name == format!("presence:{}", f.name))
                    .map(|f| f.severity_on_missing)
                    .unwrap_or(Severity::Major),
                ProbeKind::ContentIntegrity => Severity::Major,
                ProbeKind::Interaction => Severity::Major,
                ProbeKind::LibraryPresence => Severity::Major,
            };
            Some(Issue {
                severity,
                category: category_for(probe.kind),
                description,
                location,
            })
        }
    }
}

fn category_for(kind: ProbeKind) -> IssueCategory {
    match kind {
        ProbeKind::SizeRange => IssueCategory::FileSize,
        ProbeKind::StyleEquality | ProbeKind::ForbiddenPattern => IssueCategory::ColorTheme,
        ProbeKind::Presence => IssueCategory::Content,
        ProbeKind::ContentIntegrity => IssueCategory::Data,
        ProbeKind::Interaction => IssueCategory::Interactivity,
        ProbeKind::LibraryPresence => IssueCategory::Libraries,
    }
}
