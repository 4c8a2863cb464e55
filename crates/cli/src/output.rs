//! Console rendering for verification reports

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use pageproof_harness::{Report, Verdict};

/// Print the human-readable run summary to stdout.
pub fn print_report(report: &Report) {
    let verdict = match report.verdict {
        Verdict::Pass => "PASS".green().bold(),
        Verdict::PassWithWarnings => "PASS_WITH_WARNINGS".yellow().bold(),
        Verdict::Fail => "FAIL".red().bold(),
    };

    println!();
    println!("Target:   {}", report.target);
    println!("Verdict:  {}", verdict);
    println!(
        "Load:     {}ms over {} attempt(s), HTTP {}",
        report.navigation.elapsed_ms,
        report.navigation.attempts,
        report
            .navigation
            .http_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string()),
    );
    if let Some(size) = report.document_size_bytes {
        println!(
            "Size:     document {}KB, total {}KB",
            size / 1024,
            report.total_size_bytes / 1024
        );
    }
    println!();

    if !report.issues.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Severity", "Category", "Description", "Location"]);
        for issue in &report.issues {
            table.add_row(vec![
                issue.severity.to_string(),
                issue.category.to_string(),
                issue.description.clone(),
                issue.location.clone(),
            ]);
        }
        println!("{table}");
        println!();
    }

    println!(
        "Features working: {}",
        report.features_working.len().to_string().green()
    );
    for feature in &report.features_working {
        println!("  ✅ {}", feature);
    }
}
