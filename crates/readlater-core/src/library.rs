//! Library service
//!
//! The mutation boundary shared by every surface. Each operation reads the
//! current state from the store, repairs it, applies one registry or list
//! operation, and commits every touched key in a single `set`. Validation runs
//! before the write; a failed operation writes nothing.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use readlater_core::{Library, MemoryStore, NeverMove};
//!
//! let library = Library::new(Arc::new(MemoryStore::new()));
//! library.create_category("Tech")?;
//! library.add_link("https://example.com", "Example", "Tech", &NeverMove)?;
//! assert_eq!(library.load()?.list.len(), 1);
//! # Ok::<(), readlater_core::ReadingListError>(())
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::{ReadingListError, Result, ValidationError};
use crate::models::{is_sentinel, ReadingProgress, SENTINEL_CATEGORY};
use crate::projection::{SortOrder, View, ViewQuery};
use crate::reading_list::{LinkSignal, ReadingList};
use crate::registry::CategoryRegistry;
use crate::storage::{KeyValueStore, Patch, Snapshot, StorageKey, Subscription};

/// Capacity of the link signal channel
const SIGNAL_CHANNEL_CAPACITY: usize = 32;

/// What to do when a saved URL is added again under another category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Move the existing link to the requested category
    #[default]
    MoveSilently,
    /// Ask a `DuplicateResolver` first
    Confirm,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::MoveSilently => write!(f, "move_silently"),
            DuplicatePolicy::Confirm => write!(f, "confirm"),
        }
    }
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "move" | "move_silently" => Ok(DuplicatePolicy::MoveSilently),
            "confirm" => Ok(DuplicatePolicy::Confirm),
            other => Err(format!(
                "Unknown duplicate policy '{}'. Valid options: move, confirm",
                other
            )),
        }
    }
}

/// Answers the "move this saved link?" question under `DuplicatePolicy::Confirm`
pub trait DuplicateResolver {
    /// Return true to move `url` from `existing_category` to `target_category`
    fn confirm_move(&self, url: &str, existing_category: &str, target_category: &str) -> bool;
}

/// Resolver that always accepts the move
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysMove;

impl DuplicateResolver for AlwaysMove {
    fn confirm_move(&self, _url: &str, _existing: &str, _target: &str) -> bool {
        true
    }
}

/// Resolver that always declines the move
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverMove;

impl DuplicateResolver for NeverMove {
    fn confirm_move(&self, _url: &str, _existing: &str, _target: &str) -> bool {
        false
    }
}

/// Result of `Library::add_link`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new link was saved
    Added,
    /// The link was already saved and now lives in the requested category
    Moved { from: String, to: String },
    /// The link was already saved; nothing was written
    Unchanged { category: String },
}

/// Repaired state read from the store
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryState {
    pub registry: CategoryRegistry,
    pub list: ReadingList,
    /// Remembered popup filter; the sentinel when unset or no longer valid
    pub last_selected_category: String,
    /// Whether the registry had to be seeded because none was stored
    pub first_run: bool,
}

impl LibraryState {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        let stored_categories = snapshot.categories();
        let first_run = stored_categories.is_none();
        let registry = CategoryRegistry::normalize(stored_categories.unwrap_or_default());
        let list = ReadingList::normalize(snapshot.links().unwrap_or_default(), &registry);
        let last_selected_category = snapshot
            .last_selected_category()
            .filter(|name| registry.contains(name))
            .unwrap_or_else(|| SENTINEL_CATEGORY.to_string());

        Self {
            registry,
            list,
            last_selected_category,
            first_run,
        }
    }

    /// Project the list for a surface
    pub fn view(&self, query: &ViewQuery) -> View {
        View::compute(self.list.items(), query)
    }
}

const STATE_KEYS: [StorageKey; 3] = [
    StorageKey::ReadLaterLinks,
    StorageKey::ReadLaterCategories,
    StorageKey::LastSelectedCategory,
];

/// Handle for reading and mutating the shared reading list
#[derive(Clone)]
pub struct Library {
    store: Arc<dyn KeyValueStore>,
    policy: DuplicatePolicy,
    signals: broadcast::Sender<LinkSignal>,
}

impl Library {
    /// Create a library over a store with the default duplicate policy
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);
        Self {
            store,
            policy: DuplicatePolicy::default(),
            signals,
        }
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Subscribe to store change notifications
    pub fn subscribe(&self) -> Subscription {
        self.store.subscribe()
    }

    /// Subscribe to link added/removed signals for browser chrome
    pub fn signals(&self) -> broadcast::Receiver<LinkSignal> {
        self.signals.subscribe()
    }

    /// Read and repair the current state without writing
    pub fn snapshot(&self) -> Result<LibraryState> {
        let snapshot = self.store.get(&STATE_KEYS)?;
        Ok(LibraryState::from_snapshot(&snapshot))
    }

    /// Read the current state, writing the seeded registry on first run
    ///
    /// Mutations do not need this: they seed the registry in their own write.
    pub fn load(&self) -> Result<LibraryState> {
        let state = self.snapshot()?;
        if state.first_run {
            self.commit(&state, Patch::new())?;
            info!("Seeded category registry");
        }
        Ok(state)
    }

    // ==================== Links ====================

    /// Save a link at the top of the list
    ///
    /// An already saved URL is handled per the duplicate policy: it may move to
    /// `category`, but it is never saved twice.
    pub fn add_link(
        &self,
        url: &str,
        title: &str,
        category: &str,
        resolver: &dyn DuplicateResolver,
    ) -> Result<AddOutcome> {
        let mut state = self.snapshot()?;
        require_category(&state.registry, category)?;

        let added = state.list.add(url, title, category).map(|_| ());
        match added {
            Ok(()) => {
                self.commit_links(&state)?;
                info!(url, category, "Added link");
                self.emit(LinkSignal::Added(url.to_string()));
                Ok(AddOutcome::Added)
            }
            Err(ReadingListError::Duplicate {
                existing_category, ..
            }) => {
                if existing_category == category {
                    return Ok(AddOutcome::Unchanged {
                        category: existing_category,
                    });
                }

                let approved = match self.policy {
                    DuplicatePolicy::MoveSilently => true,
                    DuplicatePolicy::Confirm => {
                        resolver.confirm_move(url, &existing_category, category)
                    }
                };
                if !approved {
                    debug!(url, "Declined moving duplicate link");
                    return Ok(AddOutcome::Unchanged {
                        category: existing_category,
                    });
                }

                state.list.recategorize(&[url], category);
                self.commit_links(&state)?;
                info!(url, from = %existing_category, to = category, "Moved duplicate link");
                Ok(AddOutcome::Moved {
                    from: existing_category,
                    to: category.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Add the link if missing, remove it if saved (keyboard shortcut / context menu)
    pub fn toggle_link(&self, url: &str, title: &str) -> Result<LinkSignal> {
        let mut state = self.snapshot()?;
        let signal = state.list.toggle(url, title, SENTINEL_CATEGORY);
        self.commit_links(&state)?;
        info!(url, action = signal.action(), "Toggled link");
        self.emit(signal.clone());
        Ok(signal)
    }

    /// Remove a link; a URL that is not saved is ignored
    pub fn remove_link(&self, url: &str) -> Result<bool> {
        Ok(!self.remove_links(&[url])?.is_empty())
    }

    /// Remove several links in one write; returns the URLs that were removed
    pub fn remove_links<S: AsRef<str>>(&self, urls: &[S]) -> Result<Vec<String>> {
        let mut state = self.snapshot()?;
        let removed = state.list.remove_many(urls);
        if removed.is_empty() {
            return Ok(removed);
        }

        self.commit_links(&state)?;
        info!(count = removed.len(), "Removed links");
        for url in &removed {
            self.emit(LinkSignal::Removed(url.clone()));
        }
        Ok(removed)
    }

    /// Rename a link; blank titles and unknown URLs are ignored
    pub fn edit_title(&self, url: &str, title: &str) -> Result<bool> {
        let mut state = self.snapshot()?;
        if !state.list.edit(url, title) {
            return Ok(false);
        }
        self.commit_links(&state)?;
        info!(url, "Edited link title");
        Ok(true)
    }

    /// Move links to a category; returns how many changed
    pub fn recategorize<S: AsRef<str>>(&self, urls: &[S], category: &str) -> Result<usize> {
        let mut state = self.snapshot()?;
        require_category(&state.registry, category)?;

        let changed = state.list.recategorize(urls, category);
        if changed > 0 {
            self.commit_links(&state)?;
            info!(count = changed, category, "Recategorized links");
        }
        Ok(changed)
    }

    /// Move `moved_url` into the place `target_url` holds in the backing list
    pub fn reorder_links(&self, moved_url: &str, target_url: &str) -> Result<()> {
        let mut state = self.snapshot()?;
        state.list.reorder_by_url(moved_url, target_url)?;
        if moved_url != target_url {
            self.commit_links(&state)?;
            info!(moved = moved_url, target = target_url, "Reordered links");
        }
        Ok(())
    }

    /// Drag `moved_url` onto `target_url` inside the view `query` selects
    ///
    /// The view is recomputed from the current state, so links another surface
    /// added since the gesture started are accounted for. Links the view hides
    /// keep their place in the backing list.
    pub fn reorder_links_in_view(
        &self,
        query: &ViewQuery,
        moved_url: &str,
        target_url: &str,
    ) -> Result<()> {
        if query.sort != SortOrder::Manual {
            return Err(ValidationError::SortedView.into());
        }

        let mut state = self.snapshot()?;
        let visible = state.view(query).urls();
        state.list.reorder_within(&visible, moved_url, target_url)?;
        if moved_url != target_url {
            self.commit_links(&state)?;
            info!(moved = moved_url, target = target_url, "Reordered links in view");
        }
        Ok(())
    }

    /// Drag from position `from` onto position `to` of a rendered view
    ///
    /// Positions are resolved to URLs against `view`, the view the gesture was
    /// made on, before the store is read again.
    pub fn reorder_in_view(&self, view: &View, from: usize, to: usize) -> Result<()> {
        let (moved, target) = view.translate_move(from, to)?;
        self.reorder_links_in_view(view.query(), &moved, &target)
    }

    // ==================== Categories ====================

    /// Create a named category at the end of the registry
    pub fn create_category(&self, name: &str) -> Result<String> {
        let mut state = self.snapshot()?;
        let created = state.registry.create(name)?;
        self.commit_categories(&state)?;
        info!(category = %created, "Created category");
        Ok(created)
    }

    /// Create a category with the next free default name
    pub fn create_default_category(&self) -> Result<String> {
        let mut state = self.snapshot()?;
        let created = state.registry.create_default();
        self.commit_categories(&state)?;
        info!(category = %created, "Created category");
        Ok(created)
    }

    /// Rename a category and every link that references it, in one write
    ///
    /// Returns false when the new name equals the old one.
    pub fn rename_category(&self, old: &str, new: &str) -> Result<bool> {
        let mut state = self.snapshot()?;
        let Some(patch) = state.registry.rename(old, new, state.list.items())? else {
            return Ok(false);
        };
        state.list.apply_category_patch(&patch);

        let mut write = Patch::new();
        write.put_categories(state.registry.names())?;
        write.put_links(state.list.items())?;
        if state.last_selected_category == old {
            write.put_last_selected_category(&patch.to)?;
        }
        self.commit(&state, write)?;

        info!(from = old, to = %patch.to, links = patch.urls.len(), "Renamed category");
        Ok(true)
    }

    /// Delete a category; its links fall back to the sentinel in the same write
    ///
    /// Returns the number of links that were re-pointed.
    pub fn delete_category(&self, name: &str) -> Result<usize> {
        let mut state = self.snapshot()?;
        let patch = state.registry.delete(name, state.list.items())?;
        state.list.apply_category_patch(&patch);

        let mut write = Patch::new();
        write.put_categories(state.registry.names())?;
        write.put_links(state.list.items())?;
        if state.last_selected_category == name {
            write.put_last_selected_category(SENTINEL_CATEGORY)?;
        }
        self.commit(&state, write)?;

        info!(category = name, links = patch.urls.len(), "Deleted category");
        Ok(patch.urls.len())
    }

    /// Move category `moved` into the place `target` holds (the sentinel stays first)
    pub fn reorder_categories(&self, moved: &str, target: &str) -> Result<()> {
        let mut state = self.snapshot()?;
        state.registry.reorder_by_name(moved, target)?;
        if moved != target {
            self.commit_categories(&state)?;
            info!(moved, target, "Reordered categories");
        }
        Ok(())
    }

    // ==================== Surface state ====================

    /// The category filter last chosen in the popup
    pub fn last_selected_category(&self) -> Result<String> {
        Ok(self.snapshot()?.last_selected_category)
    }

    pub fn set_last_selected_category(&self, category: &str) -> Result<()> {
        let state = self.snapshot()?;
        require_category(&state.registry, category)?;

        let mut patch = Patch::new();
        patch.put_last_selected_category(category)?;
        self.commit(&state, patch)?;
        debug!(category, "Remembered selected category");
        Ok(())
    }

    pub fn reading_progress(&self) -> Result<Option<ReadingProgress>> {
        Ok(self
            .store
            .get(&[StorageKey::ReadingProgress])?
            .reading_progress())
    }

    pub fn save_reading_progress(&self, progress: &ReadingProgress) -> Result<()> {
        let mut patch = Patch::new();
        patch.put_reading_progress(progress)?;
        self.store.set(patch)?;
        Ok(())
    }

    /// Reset every key to its first-run value
    pub fn clear(&self) -> Result<()> {
        let registry = CategoryRegistry::new();
        let mut patch = Patch::new();
        patch.put_links(&[])?;
        patch.put_categories(registry.names())?;
        patch.put_last_selected_category(SENTINEL_CATEGORY)?;
        patch.put(StorageKey::ReadingProgress, &Value::Null)?;
        self.store.set(patch)?;
        info!("Cleared reading list");
        Ok(())
    }

    fn commit_links(&self, state: &LibraryState) -> Result<()> {
        let mut patch = Patch::new();
        patch.put_links(state.list.items())?;
        self.commit(state, patch)
    }

    fn commit_categories(&self, state: &LibraryState) -> Result<()> {
        let mut patch = Patch::new();
        patch.put_categories(state.registry.names())?;
        self.commit(state, patch)
    }

    /// Write `patch` in one `set`, seeding the registry on first run
    fn commit(&self, state: &LibraryState, mut patch: Patch) -> Result<()> {
        if state.first_run && !patch.contains(StorageKey::ReadLaterCategories) {
            patch.put_categories(state.registry.names())?;
        }
        self.store.set(patch)?;
        Ok(())
    }

    /// Broadcast a signal; nobody listening is fine
    fn emit(&self, signal: LinkSignal) {
        let _ = self.signals.send(signal);
    }
}

/// The sentinel or an existing registry name
fn require_category(registry: &CategoryRegistry, category: &str) -> Result<()> {
    if is_sentinel(category) || registry.contains(category) {
        Ok(())
    } else {
        Err(ValidationError::UnknownCategory(category.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::cell::RefCell;

    fn library() -> (Library, MemoryStore) {
        let store = MemoryStore::new();
        (Library::new(Arc::new(store.clone())), store)
    }

    fn urls(library: &Library) -> Vec<String> {
        library
            .snapshot()
            .unwrap()
            .list
            .items()
            .iter()
            .map(|i| i.url.clone())
            .collect()
    }

    /// Records every question it is asked
    struct Recorder {
        answer: bool,
        asked: RefCell<Vec<(String, String)>>,
    }

    impl DuplicateResolver for Recorder {
        fn confirm_move(&self, _url: &str, existing: &str, target: &str) -> bool {
            self.asked
                .borrow_mut()
                .push((existing.to_string(), target.to_string()));
            self.answer
        }
    }

    #[test]
    fn test_first_load_seeds_registry() {
        let (library, store) = library();
        let state = library.load().unwrap();
        assert!(state.first_run);
        assert_eq!(state.registry.names(), &[SENTINEL_CATEGORY.to_string()]);

        let stored = store.get(&[StorageKey::ReadLaterCategories]).unwrap();
        assert_eq!(stored.categories(), Some(vec![SENTINEL_CATEGORY.to_string()]));
        assert!(!library.load().unwrap().first_run);
    }

    #[test]
    fn test_add_link_and_signal() {
        let (library, _) = library();
        let mut signals = library.signals();

        let outcome = library
            .add_link("https://a.com", "A", SENTINEL_CATEGORY, &NeverMove)
            .unwrap();
        assert_eq!(outcome, AddOutcome::Added);
        assert_eq!(
            signals.try_recv().unwrap(),
            LinkSignal::Added("https://a.com".to_string())
        );
    }

    #[test]
    fn test_add_link_rejects_unknown_category() {
        let (library, _) = library();
        let err = library
            .add_link("https://a.com", "A", "Nope", &NeverMove)
            .unwrap_err();
        assert!(matches!(
            err,
            ReadingListError::Validation(ValidationError::UnknownCategory(_))
        ));
        assert!(urls(&library).is_empty());
    }

    #[test]
    fn test_duplicate_in_same_category_is_unchanged() {
        let (library, _) = library();
        library
            .add_link("https://a.com", "A", SENTINEL_CATEGORY, &NeverMove)
            .unwrap();

        let outcome = library
            .add_link("https://a.com", "A", SENTINEL_CATEGORY, &AlwaysMove)
            .unwrap();
        assert_eq!(
            outcome,
            AddOutcome::Unchanged {
                category: SENTINEL_CATEGORY.to_string()
            }
        );
        assert_eq!(urls(&library).len(), 1);
    }

    #[test]
    fn test_duplicate_moves_silently_by_default() {
        let (library, _) = library();
        library.create_category("Tech").unwrap();
        library
            .add_link("https://a.com", "A", SENTINEL_CATEGORY, &NeverMove)
            .unwrap();

        // The resolver is not consulted under MoveSilently
        let outcome = library
            .add_link("https://a.com", "A", "Tech", &NeverMove)
            .unwrap();
        assert_eq!(
            outcome,
            AddOutcome::Moved {
                from: SENTINEL_CATEGORY.to_string(),
                to: "Tech".to_string()
            }
        );
        let state = library.snapshot().unwrap();
        assert_eq!(state.list.len(), 1);
        assert_eq!(state.list.get("https://a.com").unwrap().category, "Tech");
    }

    #[test]
    fn test_duplicate_confirm_asks_resolver() {
        let (library, _) = library();
        let library = library.with_policy(DuplicatePolicy::Confirm);
        library.create_category("Tech").unwrap();
        library
            .add_link("https://a.com", "A", SENTINEL_CATEGORY, &NeverMove)
            .unwrap();

        let decline = Recorder {
            answer: false,
            asked: RefCell::new(Vec::new()),
        };
        let outcome = library
            .add_link("https://a.com", "A", "Tech", &decline)
            .unwrap();
        assert!(matches!(outcome, AddOutcome::Unchanged { .. }));
        assert_eq!(
            decline.asked.borrow().as_slice(),
            &[(SENTINEL_CATEGORY.to_string(), "Tech".to_string())]
        );

        let accept = Recorder {
            answer: true,
            asked: RefCell::new(Vec::new()),
        };
        let outcome = library
            .add_link("https://a.com", "A", "Tech", &accept)
            .unwrap();
        assert!(matches!(outcome, AddOutcome::Moved { .. }));
    }

    #[test]
    fn test_toggle_link_emits_signals() {
        let (library, _) = library();
        let mut signals = library.signals();

        library.toggle_link("https://a.com", "A").unwrap();
        library.toggle_link("https://a.com", "A").unwrap();

        assert_eq!(signals.try_recv().unwrap().action(), "add");
        assert_eq!(signals.try_recv().unwrap().action(), "remove");
        assert!(urls(&library).is_empty());
    }

    #[test]
    fn test_remove_missing_link_writes_nothing() {
        let (library, store) = library();
        library.load().unwrap();
        let mut changes = store.subscribe();

        assert!(!library.remove_link("https://missing.com").unwrap());
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn test_remove_links_batch() {
        let (library, _) = library();
        for url in ["https://a.com", "https://b.com", "https://c.com"] {
            library.add_link(url, "", SENTINEL_CATEGORY, &NeverMove).unwrap();
        }

        let removed = library
            .remove_links(&["https://a.com", "https://c.com"])
            .unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(urls(&library), vec!["https://b.com"]);
    }

    #[test]
    fn test_edit_title() {
        let (library, _) = library();
        library
            .add_link("https://a.com", "A", SENTINEL_CATEGORY, &NeverMove)
            .unwrap();

        assert!(library.edit_title("https://a.com", "Renamed").unwrap());
        assert!(!library.edit_title("https://a.com", "  ").unwrap());
        let state = library.snapshot().unwrap();
        assert_eq!(state.list.get("https://a.com").unwrap().title, "Renamed");
    }

    #[test]
    fn test_reorder_in_view_keeps_hidden_links() {
        let (library, _) = library();
        library.create_category("Tech").unwrap();
        // Adds prepend, so add in reverse to get [a, b, c]
        library.add_link("c", "c", "Tech", &NeverMove).unwrap();
        library.add_link("b", "b", SENTINEL_CATEGORY, &NeverMove).unwrap();
        library.add_link("a", "a", "Tech", &NeverMove).unwrap();

        let query = ViewQuery::new()
            .with_category("Tech")
            .with_sort(SortOrder::Manual);
        let view = library.snapshot().unwrap().view(&query);
        library.reorder_in_view(&view, 0, 1).unwrap();
        assert_eq!(urls(&library), vec!["c", "b", "a"]);

        let sorted = ViewQuery::new().with_category("Tech");
        let view = library.snapshot().unwrap().view(&sorted);
        assert!(matches!(
            library.reorder_in_view(&view, 0, 1),
            Err(ReadingListError::Validation(ValidationError::SortedView))
        ));
        assert!(matches!(
            library.reorder_links_in_view(&sorted, "a", "c"),
            Err(ReadingListError::Validation(ValidationError::SortedView))
        ));
    }

    #[test]
    fn test_reorder_from_stale_view_moves_the_dragged_link() {
        let (library, store) = library();
        library.create_category("Tech").unwrap();
        library.add_link("c", "c", "Tech", &NeverMove).unwrap();
        library.add_link("b", "b", SENTINEL_CATEGORY, &NeverMove).unwrap();
        library.add_link("a", "a", "Tech", &NeverMove).unwrap();

        let query = ViewQuery::new()
            .with_category("Tech")
            .with_sort(SortOrder::Manual);
        let seen = library.snapshot().unwrap().view(&query);
        assert_eq!(seen.urls(), vec!["a", "c"]);

        // Another surface saves a link before the drag lands
        let other = Library::new(Arc::new(store));
        other.add_link("d", "d", "Tech", &NeverMove).unwrap();

        library.reorder_in_view(&seen, 0, 1).unwrap();
        assert_eq!(urls(&library), vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn test_reorder_links_by_url() {
        let (library, _) = library();
        for url in ["c", "b", "a"] {
            library.add_link(url, url, SENTINEL_CATEGORY, &NeverMove).unwrap();
        }

        library.reorder_links("c", "a").unwrap();
        assert_eq!(urls(&library), vec!["c", "a", "b"]);
        assert!(matches!(
            library.reorder_links("missing", "a"),
            Err(ReadingListError::Validation(ValidationError::UnknownUrl(_)))
        ));
    }

    #[test]
    fn test_reorder_categories_by_name() {
        let (library, _) = library();
        for name in ["A", "B", "C"] {
            library.create_category(name).unwrap();
        }

        library.reorder_categories("C", "A").unwrap();
        let registry = library.snapshot().unwrap().registry;
        assert_eq!(registry.names(), &["全部", "C", "A", "B"]);

        assert!(library.reorder_categories("A", SENTINEL_CATEGORY).is_err());
        assert!(library.reorder_categories("Nope", "A").is_err());
    }

    #[test]
    fn test_first_mutation_is_one_write() {
        let (library, store) = library();
        let mut changes = store.subscribe();

        library
            .add_link("https://a.com", "A", SENTINEL_CATEGORY, &NeverMove)
            .unwrap();

        let change = changes.try_recv().unwrap();
        assert!(change.contains(StorageKey::ReadLaterLinks));
        assert!(change.contains(StorageKey::ReadLaterCategories));
        assert!(changes.try_recv().is_err());
        assert!(!library.snapshot().unwrap().first_run);
    }

    #[test]
    fn test_untitled_record_survives_next_write() {
        let (library, store) = library();
        let mut patch = Patch::new();
        patch
            .put(
                StorageKey::ReadLaterLinks,
                &serde_json::json!([
                    {"url": "https://kept.com", "title": "Kept", "addedAt": "2024-01-20T08:00:00Z"},
                    {"url": "https://untitled.com", "addedAt": "2024-01-21T08:00:00Z"}
                ]),
            )
            .unwrap();
        store.set(patch).unwrap();

        library
            .add_link("https://new.com", "New", SENTINEL_CATEGORY, &NeverMove)
            .unwrap();

        assert_eq!(
            urls(&library),
            vec!["https://new.com", "https://kept.com", "https://untitled.com"]
        );
        let state = library.snapshot().unwrap();
        assert_eq!(
            state.list.get("https://untitled.com").unwrap().title,
            "https://untitled.com"
        );
    }

    #[test]
    fn test_rename_category_cascades_in_one_write() {
        let (library, store) = library();
        library.create_category("Tech").unwrap();
        library.add_link("https://a.com", "A", "Tech", &NeverMove).unwrap();
        library.set_last_selected_category("Tech").unwrap();

        let mut changes = store.subscribe();
        assert!(library.rename_category("Tech", "Code").unwrap());

        let change = changes.try_recv().unwrap();
        assert!(change.contains(StorageKey::ReadLaterLinks));
        assert!(change.contains(StorageKey::ReadLaterCategories));
        assert!(change.contains(StorageKey::LastSelectedCategory));
        assert!(changes.try_recv().is_err());

        let state = library.snapshot().unwrap();
        assert_eq!(state.list.get("https://a.com").unwrap().category, "Code");
        assert_eq!(state.last_selected_category, "Code");
    }

    #[test]
    fn test_delete_category_repoints_links() {
        let (library, _) = library();
        library.create_category("Tech").unwrap();
        library.add_link("https://a.com", "A", "Tech", &NeverMove).unwrap();
        library.add_link("https://b.com", "B", SENTINEL_CATEGORY, &NeverMove).unwrap();

        assert_eq!(library.delete_category("Tech").unwrap(), 1);

        let state = library.snapshot().unwrap();
        assert!(!state.registry.contains("Tech"));
        assert!(state.list.items().iter().all(|i| i.is_uncategorized()));
    }

    #[test]
    fn test_sentinel_cannot_be_renamed_or_deleted() {
        let (library, _) = library();
        library.create_category("Tech").unwrap();
        let before = library.snapshot().unwrap();

        assert!(matches!(
            library.rename_category(SENTINEL_CATEGORY, "All"),
            Err(ReadingListError::InvariantViolation(_))
        ));
        assert!(matches!(
            library.delete_category(SENTINEL_CATEGORY),
            Err(ReadingListError::InvariantViolation(_))
        ));
        assert_eq!(library.snapshot().unwrap(), before);
    }

    #[test]
    fn test_create_default_category_names() {
        let (library, _) = library();
        assert_eq!(library.create_default_category().unwrap(), "新分类");
        assert_eq!(library.create_default_category().unwrap(), "新分类 2");
    }

    #[test]
    fn test_last_selected_category_falls_back() {
        let (library, store) = library();
        assert_eq!(library.last_selected_category().unwrap(), SENTINEL_CATEGORY);

        let mut patch = Patch::new();
        patch.put_last_selected_category("Gone").unwrap();
        store.set(patch).unwrap();
        assert_eq!(library.last_selected_category().unwrap(), SENTINEL_CATEGORY);

        assert!(library.set_last_selected_category("Gone").is_err());
    }

    #[test]
    fn test_reading_progress_roundtrip() {
        let (library, _) = library();
        assert!(library.reading_progress().unwrap().is_none());

        let progress = ReadingProgress {
            url: "https://a.com".to_string(),
            position: 0.42,
        };
        library.save_reading_progress(&progress).unwrap();
        assert_eq!(library.reading_progress().unwrap(), Some(progress));
    }

    #[test]
    fn test_clear() {
        let (library, _) = library();
        library.create_category("Tech").unwrap();
        library.add_link("https://a.com", "A", "Tech", &NeverMove).unwrap();

        library.clear().unwrap();

        let state = library.snapshot().unwrap();
        assert!(state.list.is_empty());
        assert_eq!(state.registry.len(), 1);
        assert!(library.reading_progress().unwrap().is_none());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("move".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::MoveSilently);
        assert_eq!(
            "move-silently".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::MoveSilently
        );
        assert_eq!("Confirm".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Confirm);
        assert!("maybe".parse::<DuplicatePolicy>().is_err());
    }
}
