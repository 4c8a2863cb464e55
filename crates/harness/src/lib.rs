//! PageProof Verification Harness
//!
//! This crate drives a real browser against a deployed web page and
//! renders a verdict on whether the deployment is correct:
//! - Navigates with bounded retry and fixed backoff
//! - Observes network responses and console/runtime errors for the whole
//!   session
//! - Runs a configurable probe suite (size, style, content, interaction,
//!   library checks)
//! - Classifies findings by severity and aggregates a verdict
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Harness (Rust)                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Harness::run(target) -> Report                             │
//! │    ├── Session::open() -> Driver + ObserverLog + Evidence   │
//! │    ├── Navigator::run() -> NavigationOutcome                │
//! │    ├── run_suite(Probe::standard_suite) -> [ProbeResult]    │
//! │    ├── classify() -> [Issue]                                │
//! │    └── aggregate() -> Verdict                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  VerifyConfig (YAML)                                        │
//! │    ├── retry: max_attempts, backoff_ms, timeout_ms          │
//! │    ├── thresholds: size range, perf, hard limit             │
//! │    ├── expectations: style, forbidden colors, placeholders  │
//! │    ├── features: [selectors + severity_on_missing]          │
//! │    ├── interactions: [click | hover | scroll_x]             │
//! │    └── libraries: [global symbol presence]                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod classify;
pub mod config;
pub mod driver;
pub mod error;
pub mod evidence;
pub mod navigator;
pub mod observer;
pub mod probe;
pub mod report;
pub mod runner;
pub mod session;
pub mod verdict;

pub use classify::{classify, Issue, IssueCategory, Severity};
pub use config::VerifyConfig;
pub use error::{HarnessError, HarnessResult};
pub use navigator::{NavStatus, NavigationOutcome, Navigator};
pub use probe::{Probe, ProbeResult, ProbeStatus};
pub use report::Report;
pub use runner::Harness;
pub use verdict::{aggregate, Verdict};
