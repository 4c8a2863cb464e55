//! Harness orchestration: one run, one Session, one Report
//!
//! Control flow: open session (observers live from here) → navigate with
//! retry → on a loaded document run the probe suite sequentially →
//! classify → aggregate → assemble the Report. The session is closed on
//! every path, including fatal navigation failure.

use std::time::Duration;
use tracing::{error, info, warn};

use crate::classify::classify;
use crate::config::VerifyConfig;
use crate::error::HarnessResult;
use crate::evidence::EvidencePayload;
use crate::navigator::{Attempt, Navigator};
use crate::probe::{run_suite, Probe, ProbeContext, ProbeResult};
use crate::report::Report;
use crate::session::Session;
use crate::verdict::aggregate;

pub struct Harness {
    config: VerifyConfig,
}

impl Harness {
    pub fn new(config: VerifyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Run the full verification against `target`. Errors only when the
    /// environment cannot produce a session at all; once a session is
    /// open, the run always terminates with a Report and a Verdict.
    pub async fn run(&self, target: &str) -> HarnessResult<Report> {
        let mut session = Session::open(&self.config, target).await?;
        let report = self.run_in_session(&mut session).await;
        session.close().await;

        let (critical, major, minor) = report.summary_counts();
        info!(
            verdict = ?report.verdict,
            critical, major, minor,
            features = report.features_working.len(),
            "verification complete"
        );
        Ok(report)
    }

    async fn run_in_session(&self, session: &mut Session) -> Report {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let target = session.target.clone();

        let navigator = Navigator::new(self.config.max_attempts);
        let backoff = Duration::from_millis(self.config.backoff_ms);
        let driver = &session.driver;
        let navigation = navigator
            .run(
                |_attempt| {
                    let url = target.clone();
                    async move {
                        match driver.goto(&url).await {
                            Ok(Ok(http_status)) => Attempt::Loaded { http_status },
                            Ok(Err(reason)) => Attempt::Threw(reason),
                            Err(e) => Attempt::Threw(e.to_string()),
                        }
                    }
                },
                |_attempt| tokio::time::sleep(backoff),
            )
            .await;
        info!(status = ?navigation.status, elapsed_ms = navigation.elapsed_ms, "navigation finished");

        let mut probe_results: Vec<ProbeResult> = Vec::new();
        if navigation.loaded_document() {
            if let Err(e) = session.driver.settle(self.config.settle_ms).await {
                warn!("settle wait failed: {}", e);
            }
            self.capture_page(session, "initial-load").await;

            let suite = Probe::standard_suite(&self.config);
            let mut ctx = ProbeContext {
                driver: &session.driver,
                log: &session.log,
                evidence: &mut session.evidence,
                target: &target,
            };
            probe_results = run_suite(&suite, &mut ctx).await;

            self.capture_page(session, "final-state").await;
        } else {
            error!(
                attempts = navigation.attempts,
                "navigation exhausted, skipping probes"
            );
        }

        let network_events = session.log.network_events();
        let console_events = session.log.console_events();
        let issues = classify(
            &navigation,
            &probe_results,
            &network_events,
            &console_events,
            &self.config,
            &target,
        );
        let verdict = aggregate(&issues);
        let features_working =
            Report::features_ledger(&probe_results, &network_events, &console_events);
        let document_size_bytes = session
            .log
            .document_size(&target, &self.config.entry_document);
        let total_size_bytes = session.log.total_bytes();
        let evidence = std::mem::take(&mut session.evidence).into_records();

        Report {
            target,
            timestamp,
            navigation,
            network_events,
            console_events,
            probe_results,
            issues,
            features_working,
            verdict,
            evidence,
            document_size_bytes,
            total_size_bytes,
        }
    }

    /// Full-page screenshot as evidence; a capture failure is logged,
    /// never fatal.
    async fn capture_page(&self, session: &mut Session, label: &str) {
        match session.driver.screenshot(true).await {
            Ok(shot) => {
                let id = session
                    .evidence
                    .push(label, EvidencePayload::PngBase64(shot));
                info!(evidence = %id, "captured page state");
            }
            Err(e) => warn!("screenshot '{}' failed: {}", label, e),
        }
    }
}
