//! Output formatting utilities

use crate::replay::RunReport;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table, or a JSON array of the same rows
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat, empty: &str) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", empty.yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => print_error(&format!("Failed to serialize output: {e}")),
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color a validation status
pub fn color_status(status: &str) -> String {
    match status {
        "ok" => status.green().to_string(),
        "inactive" => status.yellow().to_string(),
        "rejected" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Render a container bound, `-` when the group has no size constraint
pub fn format_bound(value: u32, constrained: bool) -> String {
    if constrained {
        value.to_string()
    } else {
        "-".to_string()
    }
}

pub fn print_report(report: &RunReport, format: OutputFormat) {
    if let OutputFormat::Json = format {
        print_json(report);
        return;
    }

    print_info(&format!(
        "Model '{}' replayed until t={:.1} ({} events, {} measurements, {} model ticks)",
        report.model,
        report.simulated_until,
        report.events_processed,
        report.measurements,
        report.model_ticks
    ));
    for rejected in &report.rejected_policies {
        print_warning(&format!("{}: {}", rejected.policy, rejected.error));
    }

    println!();
    println!("{}", "Scaling requests".bold());
    print_table(&report.requests, format, "No scaling requests");

    println!();
    println!("{}", "Target groups".bold());
    print_table(&report.target_groups, format, "No target groups");

    println!();
    print_success(&format!(
        "{} scaling requests, {} disregarded, {} waiting",
        report.requests.len(),
        report.disregarded,
        report.waiting
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bound() {
        assert_eq!(format_bound(4, true), "4");
        assert_eq!(format_bound(u32::MAX, false), "-");
    }

    #[test]
    fn test_color_status_keeps_text() {
        for status in ["ok", "inactive", "rejected", "other"] {
            assert!(color_status(status).contains(status));
        }
    }
}
