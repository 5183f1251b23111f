//! Cross-surface sync
//!
//! Every surface (popup, settings page, a `watch` terminal) keeps its own
//! `SyncController`. The controller caches the last state it read, holds the
//! surface's query and recomputes the view whenever the store reports that the
//! reading list or the registry changed, whoever wrote it.
//!
//! Surfaces never lock each other out: the last `set` wins, and gestures that
//! span a reload resolve by URL.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::library::{Library, LibraryState};
use crate::models::{is_sentinel, SENTINEL_CATEGORY};
use crate::projection::{SortOrder, View, ViewQuery};
use crate::registry::CategoryRegistry;
use crate::storage::{ChangeSet, Subscription};

/// Whether a surface is reading the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Idle,
    Reloading,
}

/// View state of one surface
pub struct SyncController {
    id: Uuid,
    library: Library,
    query: ViewQuery,
    state: Option<LibraryState>,
    view: View,
    state_tx: watch::Sender<SurfaceState>,
}

impl SyncController {
    pub fn new(library: Library, query: ViewQuery) -> Self {
        let (state_tx, _) = watch::channel(SurfaceState::Idle);
        Self {
            id: Uuid::new_v4(),
            view: View::compute(&[], &query),
            library,
            query,
            state: None,
            state_tx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn query(&self) -> &ViewQuery {
        &self.query
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Categories as of the last reload
    pub fn registry(&self) -> Option<&CategoryRegistry> {
        self.state.as_ref().map(|state| &state.registry)
    }

    pub fn surface_state(&self) -> SurfaceState {
        *self.state_tx.borrow()
    }

    /// Watch `Idle`/`Reloading` transitions
    pub fn watch_state(&self) -> watch::Receiver<SurfaceState> {
        self.state_tx.subscribe()
    }

    /// Initial load
    pub fn mount(&mut self) -> Result<&View> {
        self.reload()?;
        Ok(&self.view)
    }

    /// React to a store notification; returns whether the view was recomputed
    ///
    /// Only the reading list and the registry affect the view.
    pub fn handle_change(&mut self, changes: &ChangeSet) -> Result<bool> {
        if !changes.touches_library() {
            return Ok(false);
        }
        self.reload()?;
        Ok(true)
    }

    /// Re-read the store and recompute
    pub fn reload(&mut self) -> Result<()> {
        self.state_tx.send_replace(SurfaceState::Reloading);
        let loaded = self.library.snapshot();
        self.state_tx.send_replace(SurfaceState::Idle);

        let state = loaded?;
        if !is_sentinel(&self.query.category) && !state.registry.contains(&self.query.category) {
            debug!(
                surface = %self.id,
                category = %self.query.category,
                "Selected category disappeared, showing all"
            );
            self.query.category = SENTINEL_CATEGORY.to_string();
        }
        self.state = Some(state);
        self.recompute();
        debug!(surface = %self.id, shown = self.view.len(), "Reloaded view");
        Ok(())
    }

    pub fn set_search(&mut self, search: impl Into<String>) -> &View {
        self.query.search = search.into();
        self.recompute();
        &self.view
    }

    /// Switch the category filter; unknown names show everything
    pub fn set_category(&mut self, category: impl Into<String>) -> &View {
        let category = category.into();
        let known = self
            .registry()
            .map(|registry| registry.contains(&category))
            .unwrap_or(false);
        self.query.category = if known {
            category
        } else {
            SENTINEL_CATEGORY.to_string()
        };
        self.recompute();
        &self.view
    }

    pub fn set_sort(&mut self, sort: SortOrder) -> &View {
        self.query.sort = sort;
        self.recompute();
        &self.view
    }

    /// Commit a drag made on the rendered view, then reload
    ///
    /// Positions refer to the view as last shown, even if the store has
    /// changed since.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<&View> {
        self.library.reorder_in_view(&self.view, from, to)?;
        self.reload()?;
        Ok(&self.view)
    }

    fn recompute(&mut self) {
        self.view = match &self.state {
            Some(state) => state.view(&self.query),
            None => View::compute(&[], &self.query),
        };
    }
}

/// Commands sent to a surface task
#[derive(Debug, Clone)]
pub enum SurfaceCommand {
    /// Update the search term (applied after the debounce delay)
    SetSearch(String),
    SetCategory(String),
    SetSort(SortOrder),
    /// Drag between two positions of the last emitted view
    Reorder { from: usize, to: usize },
    /// Re-read the store now
    Reload,
    Shutdown,
}

/// Events emitted by a surface task
#[derive(Debug, Clone)]
pub enum SurfaceEvent {
    /// The view was recomputed
    ViewUpdated(View),
    /// Reading the store failed; the previous view stays current
    Error(String),
}

/// Handle to control a running surface
pub struct SurfaceHandle {
    /// Surface identifier used in log fields
    pub id: Uuid,
    /// Send commands to the surface task
    pub command_tx: mpsc::Sender<SurfaceCommand>,
    /// Receive recomputed views
    pub event_rx: mpsc::Receiver<SurfaceEvent>,
    /// Watch the surface state
    pub state_rx: watch::Receiver<SurfaceState>,
}

/// Spawn a surface that follows the store
///
/// The task mounts immediately and emits the first view, then re-emits on
/// every relevant store change and every command.
pub fn spawn_surface(library: Library, query: ViewQuery, config: &Config) -> SurfaceHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(64);

    // Subscribe before mounting so no change between the two is missed
    let changes = library.subscribe();
    let controller = SyncController::new(library, query);
    let id = controller.id();
    let state_rx = controller.watch_state();

    tokio::spawn(surface_loop(
        controller,
        changes,
        command_rx,
        event_tx,
        config.search_debounce(),
    ));

    SurfaceHandle {
        id,
        command_tx,
        event_rx,
        state_rx,
    }
}

async fn surface_loop(
    mut controller: SyncController,
    mut changes: Subscription,
    mut command_rx: mpsc::Receiver<SurfaceCommand>,
    event_tx: mpsc::Sender<SurfaceEvent>,
    debounce: Duration,
) {
    let surface = controller.id();
    debug!(surface = %surface, "Surface started");

    let mounted = controller.mount().map(|view| view.clone());
    if !emit(&event_tx, mounted).await {
        return;
    }

    let mut pending_search: Option<String> = None;
    let debounce_timer = tokio::time::sleep(debounce);
    tokio::pin!(debounce_timer);

    loop {
        let event = tokio::select! {
            cmd = command_rx.recv() => match cmd {
                Some(SurfaceCommand::SetSearch(search)) => {
                    pending_search = Some(search);
                    debounce_timer.as_mut().reset(Instant::now() + debounce);
                    continue;
                }
                Some(SurfaceCommand::SetCategory(category)) => {
                    Ok(controller.set_category(category).clone())
                }
                Some(SurfaceCommand::SetSort(sort)) => Ok(controller.set_sort(sort).clone()),
                Some(SurfaceCommand::Reorder { from, to }) => {
                    controller.reorder(from, to).map(|view| view.clone())
                }
                Some(SurfaceCommand::Reload) => controller.reload().map(|_| controller.view().clone()),
                Some(SurfaceCommand::Shutdown) | None => break,
            },
            change = changes.recv() => match change {
                Ok(change) => match controller.handle_change(&change) {
                    Ok(true) => Ok(controller.view().clone()),
                    Ok(false) => continue,
                    Err(e) => Err(e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(surface = %surface, skipped, "Missed store notifications, reloading");
                    controller.reload().map(|_| controller.view().clone())
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut debounce_timer, if pending_search.is_some() => {
                let search = pending_search.take().unwrap_or_default();
                Ok(controller.set_search(search).clone())
            }
        };

        if !emit(&event_tx, event).await {
            break;
        }
    }

    debug!(surface = %surface, "Surface stopped");
}

/// Forward a result to the surface owner; false once nobody is listening
async fn emit(event_tx: &mpsc::Sender<SurfaceEvent>, result: Result<View>) -> bool {
    let event = match result {
        Ok(view) => SurfaceEvent::ViewUpdated(view),
        Err(e) => {
            warn!("Surface reload failed: {}", e);
            SurfaceEvent::Error(e.to_string())
        }
    };
    event_tx.send(event).await.is_ok()
}
