//! PageProof CLI - Main Entry Point
//!
//! Verifies a deployed web page in a real browser and persists the
//! verdict, report, summary, and captured evidence.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use pageproof_harness::config::Viewport;
use pageproof_harness::{Harness, Verdict, VerifyConfig};

mod output;
mod persist;

/// PageProof - browser-based deployment verification
#[derive(Parser)]
#[command(name = "pageproof")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target URL to verify
    target: String,

    /// YAML configuration file (defaults apply when omitted)
    #[arg(long, env = "PAGEPROOF_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for report artifacts
    #[arg(long, default_value = "pageproof-out")]
    output: PathBuf,

    /// Browser engine (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<String>,

    /// Run with a visible browser window
    #[arg(long)]
    headed: bool,

    /// Viewport override, e.g. 1920x1080
    #[arg(long, value_parser = parse_viewport)]
    viewport: Option<Viewport>,

    /// Navigation attempts override
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Per-attempt navigation timeout override, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_viewport(s: &str) -> Result<Viewport, String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let width = w.parse().map_err(|_| format!("invalid width '{}'", w))?;
    let height = h.parse().map_err(|_| format!("invalid height '{}'", h))?;
    Ok(Viewport { width, height })
}

fn load_config(cli: &Cli) -> anyhow::Result<VerifyConfig> {
    let mut config = match &cli.config {
        Some(path) => VerifyConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => VerifyConfig::default(),
    };
    if let Some(browser) = &cli.browser {
        config.browser = browser.clone();
    }
    if cli.headed {
        config.headless = false;
    }
    if let Some(viewport) = cli.viewport {
        config.viewport = viewport;
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.max_attempts = max_attempts;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let config = load_config(&cli)?;
    info!(target = %cli.target, browser = %config.browser, "starting verification");

    let report = match Harness::new(config).run(&cli.target).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("❌ Harness error: {}", e);
            std::process::exit(2);
        }
    };

    let written = persist::write_artifacts(&report, &cli.output)
        .with_context(|| format!("writing artifacts to {}", cli.output.display()))?;
    for path in &written {
        info!(path = %path.display(), "artifact written");
    }

    output::print_report(&report);

    match report.verdict {
        Verdict::Pass | Verdict::PassWithWarnings => Ok(()),
        Verdict::Fail => std::process::exit(1),
    }
}
