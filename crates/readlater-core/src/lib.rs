//! readlater core library
//!
//! Keeps a "read later" list of saved pages and the categories they are filed
//! under, shared by any number of surfaces through one key-value store.
//!
//! # Architecture
//!
//! - **Store**: a flat key-value namespace (`readLaterLinks`,
//!   `readLaterCategories`, `lastSelectedCategory`, `readingProgress`) behind
//!   the `KeyValueStore` trait. Every write notifies all subscribers.
//! - **Library**: the only place that mutates. Reads, validates, and commits
//!   every touched key in one write.
//! - **SyncController**: one per surface. Re-reads the store on change and
//!   recomputes its filtered, sorted view.
//!
//! # Quick Start
//!
//! ```text
//! let store = Arc::new(JsonFileStore::open(config.store_path())?);
//! let library = Library::new(store).with_policy(config.duplicate_policy);
//!
//! library.create_category("Tech")?;
//! library.add_link("https://example.com", "Example", "Tech", &AlwaysMove)?;
//!
//! let view = library.snapshot()?.view(&ViewQuery::new().with_category("Tech"));
//! ```
//!
//! # Modules
//!
//! - `library`: mutation boundary (main entry point)
//! - `models`: `ReadingItem` and category constants
//! - `registry`: ordered category names, sentinel first
//! - `reading_list`: ordered, URL-unique list of saved links
//! - `projection`: search/category/sort views and selection
//! - `sync`: per-surface controller and the spawned surface task
//! - `storage`: store trait, memory and JSON file backends
//! - `config`: application configuration

pub mod config;
pub mod error;
pub mod library;
pub mod models;
pub mod projection;
pub mod reading_list;
pub mod registry;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use error::{ReadingListError, Result, ValidationError};
pub use library::{
    AddOutcome, AlwaysMove, DuplicatePolicy, DuplicateResolver, Library, LibraryState, NeverMove,
};
pub use models::{
    extract_hostname, is_sentinel, ReadingItem, ReadingProgress, TextPosition,
    MAX_CATEGORY_LENGTH, SENTINEL_CATEGORY,
};
pub use projection::{project, Selection, SortOrder, View, ViewQuery};
pub use reading_list::{LinkSignal, ReadingList};
pub use registry::{CategoryPatch, CategoryRegistry};
pub use storage::{
    ChangeSet, JsonFileStore, KeyValueStore, MemoryStore, Patch, Snapshot, StorageError,
    StorageKey, Subscription,
};
pub use sync::{spawn_surface, SurfaceCommand, SurfaceEvent, SurfaceHandle, SurfaceState, SyncController};
