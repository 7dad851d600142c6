//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use kaibench::RunSummary;
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No results found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = new_table();
            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }
            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Print the response time and accuracy summary
pub fn print_summary(summary: &RunSummary, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = new_table();
            table.set_header(vec!["Metric", "Value"]);
            table.add_row(vec!["Questions".to_string(), summary.total_questions.to_string()]);
            table.add_row(vec!["Accurate".to_string(), summary.correct.to_string()]);
            table.add_row(vec![
                "Average Response Time".to_string(),
                format!("{:.2}s", summary.average_secs),
            ]);
            table.add_row(vec!["Fastest".to_string(), format!("{:.2}s", summary.min_secs)]);
            table.add_row(vec!["Slowest".to_string(), format!("{:.2}s", summary.max_secs)]);
            if let Some(slowest) = &summary.slowest {
                table.add_row(vec!["Slowest Question".to_string(), slowest.clone()]);
            }
            println!("{table}");
            println!("Kai Accuracy: {}", accuracy(summary.accuracy_percent));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary).unwrap_or_default());
        }
        OutputFormat::Plain => {
            print!("{}", summary.render_text());
        }
    }
}

fn accuracy(percent: f64) -> String {
    let text = format!("{:.2}%", percent);
    if percent >= 80.0 {
        text.green().bold().to_string()
    } else if percent >= 50.0 {
        text.yellow().bold().to_string()
    } else {
        text.red().bold().to_string()
    }
}

/// Render a verdict as a check mark
pub fn mark(accurate: bool) -> String {
    let mark = if accurate { "✓" } else { "✗" };
    mark.to_string()
}

/// Shorten long free text for table cells
pub fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max_chars {
        single_line
    } else {
        let cut: String = single_line.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}
