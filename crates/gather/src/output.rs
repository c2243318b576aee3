//! Console output for the end of a run

use colored::Colorize;
use gather_lib::{CollectionResult, RunReport, RunTally};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Calls")]
    count: u64,
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Step")]
    step: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color an outcome name
pub fn color_outcome(outcome: CollectionResult) -> String {
    match outcome {
        CollectionResult::Written => "written".green().to_string(),
        CollectionResult::Skipped => "skipped".yellow().to_string(),
        CollectionResult::Failed => "failed".red().to_string(),
    }
}

/// Completion banner, printed whenever the stage sequence ends
pub fn print_banner(report: &RunReport) {
    let elapsed = report.finished_at - report.started_at;
    let message = format!(
        "Must-gather finished in {}s, bundle at {}",
        elapsed.num_seconds(),
        report.target.destination_dir.display()
    );
    if report.tally.is_clean() {
        print_success(&message);
    } else {
        print_warning(&format!("{} (some data is missing, see below)", message));
    }
    if !report.monitoring_collected {
        print_warning("User-workload monitoring data was not collected");
    }
}

/// Outcome counts, then every skipped or failed step
pub fn print_tally(tally: &RunTally) {
    let counts = [
        (CollectionResult::Written, tally.written),
        (CollectionResult::Skipped, tally.skipped),
        (CollectionResult::Failed, tally.failed),
    ]
    .into_iter()
    .map(|(outcome, count)| CountRow {
        outcome: color_outcome(outcome),
        count,
    })
    .collect::<Vec<_>>();
    println!("{}", Table::new(counts).with(Style::rounded()));

    if tally.records.is_empty() {
        return;
    }
    let rows: Vec<RecordRow> = tally
        .records
        .iter()
        .map(|r| RecordRow {
            outcome: color_outcome(r.outcome),
            step: r.step.to_string(),
            reason: truncate(&r.reason, 80),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > max {
        format!("{}…", line.chars().take(max).collect::<String>())
    } else {
        line.to_string()
    }
}
