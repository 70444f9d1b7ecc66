//! Output formatting utilities

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
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
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a percentage with two decimals
pub fn format_confidence(percent: f64) -> String {
    format!("{:.2}%", percent)
}

/// Color confidence based on value
pub fn color_confidence(percent: f64) -> String {
    let formatted = format_confidence(percent);
    if percent >= 80.0 {
        formatted.green().to_string()
    } else if percent >= 60.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Red for attrition, green otherwise
pub fn color_verdict(message: &str, churn: bool) -> String {
    if churn {
        format!("⚠ {}", message).red().bold().to_string()
    } else {
        format!("✓ {}", message).green().bold().to_string()
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "ready" | "healthy" => status.green().to_string(),
        "not ready" | "unhealthy" | "unreachable" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Render a unix timestamp in UTC
pub fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}
