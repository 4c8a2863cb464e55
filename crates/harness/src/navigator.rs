//! Retry-aware navigation
//!
//! The retry contract is an explicit state machine
//! `{ Attempting(n) -> Success | Attempting(n+1) | Exhausted }`, generic
//! over the attempt and backoff effects so it is testable without a
//! browser. Backoff between attempts is fixed, not exponential, and
//! retries are strictly sequential so a single observer accumulation is
//! never fed by parallel attempts.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;
use tracing::{debug, warn};

/// What a single navigation attempt produced.
#[derive(Debug, Clone)]
pub enum Attempt {
    /// A document loaded and reported this HTTP status
    Loaded { http_status: u16 },
    /// Navigation itself threw (network/DNS/timeout failure)
    Threw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavStatus {
    /// HTTP 200, the only success condition
    Success,
    /// A document loaded with a non-200 status; probes still run
    HttpError,
    /// Every attempt threw; fatal, no probes run
    Exception,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationOutcome {
    pub status: NavStatus,
    pub http_status: Option<u16>,
    /// Total wall-clock time across all attempts, including backoff
    pub elapsed_ms: u64,
    pub attempts: u32,
    #[serde(default)]
    pub failure: Option<String>,
}

impl NavigationOutcome {
    pub fn loaded_document(&self) -> bool {
        !matches!(self.status, NavStatus::Exception)
    }
}

enum RetryState {
    Attempting(u32),
    Done(Attempt, u32),
}

pub struct Navigator {
    max_attempts: u32,
}

impl Navigator {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Drive the retry state machine. `attempt(n)` performs the n-th
    /// (1-based) navigation attempt; `backoff(n)` waits between attempt
    /// n and n+1 and is never invoked after the final attempt.
    pub async fn run<A, AF, B, BF>(&self, mut attempt: A, mut backoff: B) -> NavigationOutcome
    where
        A: FnMut(u32) -> AF,
        AF: Future<Output = Attempt>,
        B: FnMut(u32) -> BF,
        BF: Future<Output = ()>,
    {
        let start = Instant::now();
        let mut state = RetryState::Attempting(1);

        let (last, attempts) = loop {
            match state {
                RetryState::Attempting(n) => {
                    debug!(attempt = n, max = self.max_attempts, "navigation attempt");
                    let result = attempt(n).await;
                    match result {
                        Attempt::Loaded { http_status: 200 } => {
                            break (Attempt::Loaded { http_status: 200 }, n);
                        }
                        other if n >= self.max_attempts => {
                            state = RetryState::Done(other, n);
                        }
                        other => {
                            match &other {
                                Attempt::Loaded { http_status } => {
                                    warn!(status = http_status, attempt = n, "non-200 response, retrying");
                                }
                                Attempt::Threw(reason) => {
                                    warn!(%reason, attempt = n, "navigation threw, retrying");
                                }
                            }
                            backoff(n).await;
                            state = RetryState::Attempting(n + 1);
                        }
                    }
                }
                RetryState::Done(last, n) => break (last, n),
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match last {
            Attempt::Loaded { http_status: 200 } => NavigationOutcome {
                status: NavStatus::Success,
                http_status: Some(200),
                elapsed_ms,
                attempts,
                failure: None,
            },
            Attempt::Loaded { http_status } => NavigationOutcome {
                status: NavStatus::HttpError,
                http_status: Some(http_status),
                elapsed_ms,
                attempts,
                failure: None,
            },
            Attempt::Threw(reason) => NavigationOutcome {
                status: NavStatus::Exception,
                http_status: None,
                elapsed_ms,
                attempts,
                failure: Some(reason),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn no_wait(counter: Arc<AtomicU32>) -> impl FnMut(u32) -> std::future::Ready<()> {
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test]
    async fn immediate_success_skips_backoff() {
        let waits = Arc::new(AtomicU32::new(0));
        let outcome = Navigator::new(3)
            .run(
                |_| std::future::ready(Attempt::Loaded { http_status: 200 }),
                no_wait(waits.clone()),
            )
            .await;

        assert_eq!(outcome.status, NavStatus::Success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(waits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn two_failures_then_success_waits_twice() {
        let waits = Arc::new(AtomicU32::new(0));
        let outcome = Navigator::new(3)
            .run(
                |n| {
                    std::future::ready(if n < 3 {
                        Attempt::Threw(format!("connection refused ({})", n))
                    } else {
                        Attempt::Loaded { http_status: 200 }
                    })
                },
                no_wait(waits.clone()),
            )
            .await;

        assert_eq!(outcome.status, NavStatus::Success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(waits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhaustion_yields_exception_outcome() {
        let waits = Arc::new(AtomicU32::new(0));
        let outcome = Navigator::new(3)
            .run(
                |_| std::future::ready(Attempt::Threw("dns failure".to_string())),
                no_wait(waits.clone()),
            )
            .await;

        assert_eq!(outcome.status, NavStatus::Exception);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.failure.as_deref(), Some("dns failure"));
        assert!(!outcome.loaded_document());
        // No backoff after the final attempt
        assert_eq!(waits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persistent_non_200_is_soft_http_error() {
        let outcome = Navigator::new(3)
            .run(
                |_| std::future::ready(Attempt::Loaded { http_status: 404 }),
                |_| std::future::ready(()),
            )
            .await;

        assert_eq!(outcome.status, NavStatus::HttpError);
        assert_eq!(outcome.http_status, Some(404));
        // A document did load, so the harness still probes
        assert!(outcome.loaded_document());
    }

    #[tokio::test]
    async fn outcome_reflects_final_attempt() {
        // throw, then 500: the run ends as a soft HTTP error
        let outcome = Navigator::new(2)
            .run(
                |n| {
                    std::future::ready(if n == 1 {
                        Attempt::Threw("reset".to_string())
                    } else {
                        Attempt::Loaded { http_status: 500 }
                    })
                },
                |_| std::future::ready(()),
            )
            .await;

        assert_eq!(outcome.status, NavStatus::HttpError);
        assert_eq!(outcome.http_status, Some(500));
    }
}
