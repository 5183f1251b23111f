//! Live surface
//!
//! Follows the store like an open popup: re-renders whenever this or another
//! process changes the reading list or the categories.

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use readlater_core::{spawn_surface, SortOrder, SurfaceCommand, SurfaceEvent, ViewQuery};

use super::App;
use crate::output::{Output, OutputFormat};

/// Commands sent to the file poller
#[derive(Debug)]
enum PollCommand {
    Shutdown,
}

/// Run until Ctrl-C
pub async fn run(
    app: &App,
    search: Option<String>,
    category: Option<String>,
    sort: SortOrder,
    output: &Output,
) -> Result<()> {
    app.library.load()?;
    let category = match category {
        Some(category) => category,
        None => app.library.last_selected_category()?,
    };
    let query = ViewQuery::new()
        .with_search(search.unwrap_or_default())
        .with_category(category)
        .with_sort(sort);

    let mut surface = spawn_surface(app.library.clone(), query, &app.config);
    debug!(surface = %surface.id, "Watching {:?}", app.store.path());

    let poller_tx = spawn_file_poller(app);

    if output.format == OutputFormat::Human {
        println!("Watching {} (Ctrl-C to stop)", app.store.path().display());
    }

    loop {
        tokio::select! {
            event = surface.event_rx.recv() => match event {
                Some(SurfaceEvent::ViewUpdated(view)) => {
                    if output.format == OutputFormat::Human {
                        println!();
                        println!("── {} ──", view.query().category);
                    }
                    output.print_view(&view);
                }
                Some(SurfaceEvent::Error(e)) => eprintln!("⚠ {}", e),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = surface.command_tx.send(SurfaceCommand::Shutdown).await;
    let _ = poller_tx.send(PollCommand::Shutdown).await;
    Ok(())
}

/// Poll the store file so writes from other processes reach the surface
fn spawn_file_poller(app: &App) -> mpsc::Sender<PollCommand> {
    let (command_tx, mut command_rx) = mpsc::channel(1);
    let store = app.store.clone();
    let mut interval = tokio::time::interval(app.config.poll_interval());

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = store.poll_external_changes() {
                        warn!("Failed to check {:?} for changes: {}", store.path(), e);
                    }
                }
                cmd = command_rx.recv() => {
                    if matches!(cmd, Some(PollCommand::Shutdown) | None) {
                        break;
                    }
                }
            }
        }
    });

    command_tx
}
