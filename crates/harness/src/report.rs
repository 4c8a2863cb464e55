//! The immutable run report handed to external consumers

use serde::{Deserialize, Serialize};

use crate::classify::Issue;
use crate::evidence::EvidenceRecord;
use crate::navigator::NavigationOutcome;
use crate::observer::{ConsoleEvent, NetworkEvent};
use crate::probe::ProbeResult;
use crate::verdict::Verdict;

/// Everything one verification run produced. Built once at run end;
/// ownership passes to the consumer (serialization, summaries, evidence
/// persistence all happen outside the core).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub target: String,
    pub timestamp: String,
    pub navigation: NavigationOutcome,
    /// Captured responses, in arrival order
    pub network_events: Vec<NetworkEvent>,
    /// Captured console/runtime errors, in arrival order
    pub console_events: Vec<ConsoleEvent>,
    /// Probe executions, in suite order
    pub probe_results: Vec<ProbeResult>,
    /// Classified findings, in derivation order
    pub issues: Vec<Issue>,
    /// Positive findings ledger (informational, never affects verdict)
    pub features_working: Vec<String>,
    pub verdict: Verdict,
    pub evidence: Vec<EvidenceRecord>,
    /// Entry document size, when its response was captured
    pub document_size_bytes: Option<u64>,
    /// Sum of all captured response bodies
    pub total_size_bytes: u64,
}

impl Report {
    /// Positive-findings ledger: passed probes plus observer-level checks
    /// that came back clean.
    pub(crate) fn features_ledger(
        probe_results: &[ProbeResult],
        network: &[NetworkEvent],
        console: &[ConsoleEvent],
    ) -> Vec<String> {
        let mut ledger: Vec<String> = probe_results
            .iter()
            .filter(|p| p.passed())
            .filter_map(|p| p.detail.clone())
            .collect();

        if console.is_empty() {
            ledger.push("no JavaScript console errors".to_string());
        }
        if !network.is_empty() && network.iter().all(|e| e.http_status != 404) {
            ledger.push("all resources loaded successfully (no 404s)".to_string());
        }
        ledger
    }

    pub fn summary_counts(&self) -> (usize, usize, usize) {
        use crate::classify::Severity;
        let count = |s: Severity| self.issues.iter().filter(|i| i.severity == s).count();
        (
            count(Severity::Critical),
            count(Severity::Major),
            count(Severity::Minor),
        )
    }
}
