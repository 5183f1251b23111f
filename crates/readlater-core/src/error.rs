//! Error taxonomy for reading list and category operations
//!
//! - `Validation`: user-correctable input problems (bad category names, stale indices)
//! - `Duplicate`: the URL is already saved; the caller decides whether to move it
//! - `InvariantViolation`: an attempt to mutate the sentinel category
//! - `Storage`: the store could not be read or written
//!
//! Removing or editing a URL that no longer exists is not an error.

use thiserror::Error;

use crate::storage::StorageError;

/// Input problems the user can correct
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Category name cannot be empty")]
    EmptyName,

    #[error("Category name '{name}' is longer than {max} characters")]
    NameTooLong { name: String, max: usize },

    #[error("Category '{0}' already exists")]
    DuplicateName(String),

    #[error("Category '{0}' does not exist")]
    UnknownCategory(String),

    #[error("Index {index} is out of range for a list of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No saved link with URL '{0}'")]
    UnknownUrl(String),

    #[error("A date-sorted view cannot be reordered; switch to manual order first")]
    SortedView,
}

/// Errors returned by core operations
#[derive(Error, Debug)]
pub enum ReadingListError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("'{url}' is already saved in '{existing_category}'")]
    Duplicate {
        url: String,
        existing_category: String,
    },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, ReadingListError>;
