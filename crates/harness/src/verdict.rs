//! Verdict aggregation: a pure reduction over issue severities

use serde::{Deserialize, Serialize};

use crate::classify::{Issue, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    PassWithWarnings,
    Fail,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Pass => "PASS",
            Verdict::PassWithWarnings => "PASS_WITH_WARNINGS",
            Verdict::Fail => "FAIL",
        };
        f.write_str(s)
    }
}

/// FAIL on any critical issue, PASS_WITH_WARNINGS on any major, else
/// PASS. Minor issues never fail a run. Severity counts alone decide;
/// issue order is irrelevant.
pub fn aggregate(issues: &[Issue]) -> Verdict {
    let mut worst = None;
    for issue in issues {
        worst = Some(worst.map_or(issue.severity, |w: Severity| w.max(issue.severity)));
    }
    match worst {
        Some(Severity::Critical) => Verdict::Fail,
        Some(Severity::Major) => Verdict::PassWithWarnings,
        Some(Severity::Minor) | None => Verdict::Pass,
    }
}
