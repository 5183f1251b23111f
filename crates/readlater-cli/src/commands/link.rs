//! Link command handlers

use anyhow::{Context, Result};

use readlater_core::{
    AddOutcome, DuplicatePolicy, DuplicateResolver, LinkSignal, NeverMove, SortOrder, ViewQuery,
};

use super::App;
use crate::output::Output;
use crate::prompt::{confirm, PromptResolver};

/// Save a link at the top of the list
///
/// Without `--category` the link goes into the last selected category, as the
/// popup's add button does.
pub fn add(
    app: &App,
    url: String,
    title: Option<String>,
    category: Option<String>,
    policy: Option<DuplicatePolicy>,
    output: &Output,
) -> Result<()> {
    let library = match policy {
        Some(policy) => app.library.clone().with_policy(policy),
        None => app.library.clone(),
    };
    let category = match category {
        Some(category) => category,
        None => library.last_selected_category()?,
    };
    let title = title.unwrap_or_default();

    let resolver: &dyn DuplicateResolver = if output.should_prompt() {
        &PromptResolver
    } else {
        &NeverMove
    };

    let outcome = library
        .add_link(&url, &title, &category, resolver)
        .context("Failed to save link")?;

    match outcome {
        AddOutcome::Added => {
            output.success(&format!("Saved {}", url));
            if let Some(item) = library.snapshot()?.list.get(&url) {
                output.print_item(item);
            }
        }
        AddOutcome::Moved { from, to } => {
            output.success(&format!("Moved {} from '{}' to '{}'", url, from, to));
        }
        AddOutcome::Unchanged { category } => {
            output.message(&format!("Already saved in '{}'", category));
        }
    }
    Ok(())
}

/// Save the link if missing, remove it if saved
pub fn toggle(app: &App, url: String, title: Option<String>, output: &Output) -> Result<()> {
    let signal = app
        .library
        .toggle_link(&url, title.as_deref().unwrap_or_default())
        .context("Failed to toggle link")?;

    match signal {
        LinkSignal::Added(url) => output.success(&format!("Saved {}", url)),
        LinkSignal::Removed(url) => output.success(&format!("Removed {}", url)),
    }
    Ok(())
}

/// Show the links matching a query
///
/// An explicit category is remembered for the next run; without one the
/// remembered category is used.
pub fn list(
    app: &App,
    search: Option<String>,
    category: Option<String>,
    sort: SortOrder,
    output: &Output,
) -> Result<()> {
    let category = remembered_category(app, category)?;
    let query = ViewQuery::new()
        .with_search(search.unwrap_or_default())
        .with_category(category)
        .with_sort(sort);

    let view = app.library.snapshot()?.view(&query);
    output.print_view(&view);
    Ok(())
}

/// Remove links; batches ask for confirmation first
pub fn remove(app: &App, urls: Vec<String>, output: &Output) -> Result<()> {
    if urls.len() > 1
        && output.should_prompt()
        && !confirm(&format!("Delete {} links?", urls.len()))?
    {
        println!("Cancelled.");
        return Ok(());
    }

    let removed = app
        .library
        .remove_links(&urls)
        .context("Failed to remove links")?;

    if removed.is_empty() {
        output.message("Nothing to remove.");
    } else {
        output.success(&format!("Removed {} link(s)", removed.len()));
    }
    Ok(())
}

/// Change a link's title
pub fn edit(app: &App, url: String, title: String, output: &Output) -> Result<()> {
    if app.library.edit_title(&url, &title)? {
        output.success("Title updated");
    } else {
        output.message("Nothing changed.");
    }
    Ok(())
}

/// Move links into a category
pub fn move_to(app: &App, category: String, urls: Vec<String>, output: &Output) -> Result<()> {
    let changed = app
        .library
        .recategorize(&urls, &category)
        .context("Failed to move links")?;
    output.success(&format!("Moved {} link(s) to '{}'", changed, category));
    Ok(())
}

/// Drag a link between two positions of the manually ordered view
pub fn reorder(
    app: &App,
    from: usize,
    to: usize,
    search: Option<String>,
    category: Option<String>,
    output: &Output,
) -> Result<()> {
    let category = remembered_category(app, category)?;
    let query = ViewQuery::new()
        .with_search(search.unwrap_or_default())
        .with_category(category)
        .with_sort(SortOrder::Manual);

    // Resolve positions against the view as it reads now, then commit by URL
    let view = app.library.snapshot()?.view(&query);
    app.library
        .reorder_in_view(&view, from, to)
        .context("Failed to reorder links")?;

    output.success(&format!("Moved link from position {} to {}", from, to));
    output.print_view(&app.library.snapshot()?.view(&query));
    Ok(())
}

/// Open a saved link in the default browser
pub fn open_link(app: &App, url: String, output: &Output) -> Result<()> {
    let state = app.library.snapshot()?;
    let item = state
        .list
        .get(&url)
        .ok_or_else(|| anyhow::anyhow!("No saved link with URL '{}'", url))?;

    open::that(&item.url).with_context(|| format!("Failed to open {}", item.url))?;
    output.message(&format!("Opened {}", item.title));
    Ok(())
}

/// Clear every saved link and category
pub fn clear(app: &App, output: &Output) -> Result<()> {
    if output.should_prompt() && !confirm("Delete all saved links and categories?")? {
        println!("Cancelled.");
        return Ok(());
    }

    app.library.clear().context("Failed to clear reading list")?;
    output.success("Cleared reading list");
    Ok(())
}

/// Resolve the category filter and remember an explicit choice
fn remembered_category(app: &App, category: Option<String>) -> Result<String> {
    match category {
        Some(category) => {
            app.library
                .set_last_selected_category(&category)
                .with_context(|| format!("Unknown category '{}'", category))?;
            Ok(category)
        }
        None => Ok(app.library.last_selected_category()?),
    }
}
