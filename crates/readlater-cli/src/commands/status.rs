//! Status command handler

use anyhow::Result;

use super::App;
use crate::output::{Output, OutputFormat};

/// Show store location and contents
pub fn show(app: &App, output: &Output) -> Result<()> {
    let state = app.library.snapshot()?;
    let store = &app.store;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "store": {
                        "path": store.path(),
                        "exists": store.exists(),
                        "size": store.size()
                    },
                    "counts": {
                        "links": state.list.len(),
                        "categories": state.registry.user_categories().len()
                    },
                    "last_selected_category": state.last_selected_category,
                    "duplicate_policy": app.library.policy()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", state.list.len());
        }
        OutputFormat::Human => {
            println!("readlater Status");
            println!("================");
            println!();
            println!("Storage:");
            println!("  Location: {}", store.path().display());
            if store.exists() {
                println!("  Size:     {}", format_size(store.size()));
            } else {
                println!("  Size:     (not created yet)");
            }
            println!();
            println!("Contents:");
            println!("  Links:      {}", state.list.len());
            println!("  Categories: {}", state.registry.user_categories().len());
            println!("  Selected:   {}", state.last_selected_category);
            println!();
            println!("Duplicate policy: {}", app.library.policy());
        }
    }

    Ok(())
}

/// Human-readable byte size
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
