//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::{DateTime, Datelike, Duration, Local, Utc};
use serde::Serialize;

use readlater_core::{is_sentinel, ReadingItem, View};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single saved link
    pub fn print_item(&self, item: &ReadingItem) {
        match self.format {
            OutputFormat::Human => {
                println!("Title:    {}", item.title);
                println!("URL:      {}", item.url);
                println!("Site:     {}", item.hostname());
                println!("Category: {}", item.category);
                println!("Added:    {}", format_added_at(item.added_at, Local::now()));
            }
            OutputFormat::Json => print_json(item),
            OutputFormat::Quiet => println!("{}", item.url),
        }
    }

    /// Print the links of a view with their view positions
    pub fn print_view(&self, view: &View) {
        let items = view.items();
        match self.format {
            OutputFormat::Human => {
                if items.is_empty() {
                    let category = &view.query().category;
                    if is_sentinel(category) {
                        println!("No saved links.");
                    } else {
                        println!("No links in '{}'.", category);
                    }
                    return;
                }

                let now = Local::now();
                for (position, item) in items.iter().enumerate() {
                    let category = if item.is_uncategorized() {
                        String::new()
                    } else {
                        format!(" [{}]", item.category)
                    };
                    println!(
                        "{:>3}  {}{} | {} | {}",
                        position,
                        truncate(&item.title, 40),
                        category,
                        truncate(item.hostname(), 30),
                        format_added_at(item.added_at, now)
                    );
                }
                println!("\n{} link(s)", items.len());
            }
            OutputFormat::Json => print_json(items),
            OutputFormat::Quiet => {
                for item in items {
                    println!("{}", item.url);
                }
            }
        }
    }

    /// Print categories with their link counts, in display order
    pub fn print_categories(&self, counts: &[(String, usize)]) {
        match self.format {
            OutputFormat::Human => {
                for (position, (name, count)) in counts.iter().enumerate() {
                    println!("{:>3}  {} ({})", position, name, count);
                }
            }
            OutputFormat::Json => {
                let json: Vec<_> = counts
                    .iter()
                    .map(|(name, count)| serde_json::json!({"name": name, "count": count}))
                    .collect();
                print_json(&json);
            }
            OutputFormat::Quiet => {
                for (name, _) in counts {
                    println!("{}", name);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode JSON output: {}", e),
    }
}

/// Format when a link was saved, relative to `now`
///
/// - same day: `今天 HH:MM`
/// - the day before: `昨天`
/// - same year: `MM/DD`
/// - otherwise: `YYYY/MM/DD`
pub fn format_added_at(added_at: DateTime<Utc>, now: DateTime<Local>) -> String {
    let added = added_at.with_timezone(&Local);
    let today = now.date_naive();
    let day = added.date_naive();

    if day == today {
        return format!("今天 {}", added.format("%H:%M"));
    }
    if Some(day) == today.checked_sub_signed(Duration::days(1)) {
        return "昨天".to_string();
    }
    if day.year() == today.year() {
        added.format("%m/%d").to_string()
    } else {
        added.format("%Y/%m/%d").to_string()
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
