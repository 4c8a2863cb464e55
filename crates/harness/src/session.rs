//! Session: one browser context + page bound to one target
//!
//! The Session owns the driver, the observer log, and the evidence store
//! for exactly one run. It is the only shared mutable resource; closing it
//! is guaranteed by the runner's cleanup path, with the driver's
//! kill-on-drop child as the backstop so no browser process leaks.

use tracing::info;

use crate::config::VerifyConfig;
use crate::driver::Driver;
use crate::error::HarnessResult;
use crate::evidence::EvidenceStore;
use crate::observer::ObserverLog;

pub struct Session {
    pub driver: Driver,
    pub log: ObserverLog,
    pub evidence: EvidenceStore,
    pub target: String,
}

impl Session {
    /// Open a session for `target`. The observer log is wired into the
    /// driver before any navigation, so redirect/retry traffic is
    /// captured from the first attempt.
    pub async fn open(config: &VerifyConfig, target: &str) -> HarnessResult<Self> {
        let log = ObserverLog::new();
        let driver = Driver::launch(config, log.clone()).await?;
        info!(target = %target, "session opened");
        Ok(Self {
            driver,
            log,
            evidence: EvidenceStore::new(),
            target: target.to_string(),
        })
    }

    /// Graceful close. Consumes the session so nothing runs against a
    /// closed browser.
    pub async fn close(self) {
        self.driver.close().await;
        info!("session closed");
    }
}
