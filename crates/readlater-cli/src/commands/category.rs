//! Category command handlers

use anyhow::{Context, Result};

use super::App;
use crate::output::Output;
use crate::prompt::confirm;

/// List categories with link counts
pub fn list(app: &App, output: &Output) -> Result<()> {
    let state = app.library.load()?;
    output.print_categories(&state.list.counts(&state.registry));
    Ok(())
}

/// Create a category; without a name the next default name is used
pub fn add(app: &App, name: Option<String>, output: &Output) -> Result<()> {
    let created = match name {
        Some(name) => app.library.create_category(&name),
        None => app.library.create_default_category(),
    }
    .context("Failed to create category")?;

    output.success(&format!("Created category '{}'", created));
    Ok(())
}

pub fn rename(app: &App, old: String, new: String, output: &Output) -> Result<()> {
    let renamed = app
        .library
        .rename_category(&old, &new)
        .context("Failed to rename category")?;

    if renamed {
        output.success(&format!("Renamed '{}' to '{}'", old, new.trim()));
    } else {
        output.message("Nothing changed.");
    }
    Ok(())
}

/// Delete a category; its links move to the sentinel
pub fn delete(app: &App, name: String, output: &Output) -> Result<()> {
    if output.should_prompt() {
        let question = format!(
            "Delete '{}'? Its links will move to '{}'.",
            name,
            readlater_core::SENTINEL_CATEGORY
        );
        if !confirm(&question)? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let moved = app
        .library
        .delete_category(&name)
        .context("Failed to delete category")?;

    output.success(&format!("Deleted '{}' ({} link(s) moved)", name, moved));
    Ok(())
}

/// Move a category between positions (position 0 is reserved)
pub fn reorder(app: &App, from: usize, to: usize, output: &Output) -> Result<()> {
    let registry = app.library.snapshot()?.registry;
    let moved = registry.name_at(from)?;
    let target = registry.name_at(to)?;

    app.library
        .reorder_categories(moved, target)
        .context("Failed to reorder categories")?;

    output.success(&format!("Moved '{}' to position {}", moved, to));
    list(app, output)
}
