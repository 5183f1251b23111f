//! View projection
//!
//! Derives what a surface shows from the backing list: search filter, category
//! filter, then sort. Projection is a pure function of the backing list and the
//! query, so recomputing it never changes the result.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::models::{is_sentinel, ReadingItem, SENTINEL_CATEGORY};

/// Display order of a view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Newest first
    #[default]
    Descending,
    /// Oldest first
    Ascending,
    /// Backing list order, as arranged by drag-reorder
    Manual,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Descending => write!(f, "desc"),
            SortOrder::Ascending => write!(f, "asc"),
            SortOrder::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "desc" | "descending" | "newest" => Ok(SortOrder::Descending),
            "asc" | "ascending" | "oldest" => Ok(SortOrder::Ascending),
            "manual" => Ok(SortOrder::Manual),
            other => Err(format!(
                "Unknown sort order '{}'. Valid options: desc, asc, manual",
                other
            )),
        }
    }
}

/// Filter and sort parameters of a surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewQuery {
    pub search: String,
    pub category: String,
    pub sort: SortOrder,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: SENTINEL_CATEGORY.to_string(),
            sort: SortOrder::default(),
        }
    }
}

impl ViewQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}

/// Filter and sort the backing list
pub fn project(items: &[ReadingItem], query: &ViewQuery) -> Vec<ReadingItem> {
    let needle = query.search.trim().to_lowercase();
    let filter_category = !is_sentinel(&query.category);

    let mut shown: Vec<ReadingItem> = items
        .iter()
        .filter(|item| needle.is_empty() || item.matches(&needle))
        .filter(|item| !filter_category || item.category == query.category)
        .cloned()
        .collect();

    // sort_by is stable: equal timestamps keep backing order
    match query.sort {
        SortOrder::Descending => shown.sort_by(|a, b| b.added_at.cmp(&a.added_at)),
        SortOrder::Ascending => shown.sort_by(|a, b| a.added_at.cmp(&b.added_at)),
        SortOrder::Manual => {}
    }

    shown
}

/// Checked items of a view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    checked: BTreeSet<String>,
    select_all: bool,
}

impl Selection {
    pub fn is_checked(&self, url: &str) -> bool {
        self.checked.contains(url)
    }

    pub fn is_all_selected(&self) -> bool {
        self.select_all
    }

    pub fn len(&self) -> usize {
        self.checked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checked.is_empty()
    }

    pub fn clear(&mut self) {
        self.checked.clear();
        self.select_all = false;
    }
}

/// A computed view: the projected items plus the user's selection
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    query: ViewQuery,
    items: Vec<ReadingItem>,
    selection: Selection,
}

impl View {
    /// Project the backing list; the selection starts empty
    pub fn compute(items: &[ReadingItem], query: &ViewQuery) -> Self {
        Self {
            query: query.clone(),
            items: project(items, query),
            selection: Selection::default(),
        }
    }

    pub fn query(&self) -> &ViewQuery {
        &self.query
    }

    pub fn items(&self) -> &[ReadingItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// URL shown at a view position
    pub fn url_at(&self, index: usize) -> Result<&str> {
        self.items
            .get(index)
            .map(|item| item.url.as_str())
            .ok_or_else(|| {
                ValidationError::IndexOutOfRange {
                    index,
                    len: self.items.len(),
                }
                .into()
            })
    }

    /// URLs in view order
    pub fn urls(&self) -> Vec<String> {
        self.items.iter().map(|item| item.url.clone()).collect()
    }

    /// Turn a drag from view position `from` to `to` into a (moved, target) URL pair
    ///
    /// Only a manually ordered view can be dragged: a date-sorted view would
    /// snap the item straight back.
    pub fn translate_move(&self, from: usize, to: usize) -> Result<(String, String)> {
        if self.query.sort != SortOrder::Manual {
            return Err(ValidationError::SortedView.into());
        }
        let moved = self.url_at(from)?.to_string();
        let target = self.url_at(to)?.to_string();
        Ok((moved, target))
    }

    /// Check or uncheck one item
    ///
    /// Checking the last unchecked item turns "select all" on; unchecking any
    /// item turns it off.
    pub fn toggle(&mut self, url: &str) {
        if !self.items.iter().any(|item| item.url == url) {
            return;
        }
        if !self.selection.checked.remove(url) {
            self.selection.checked.insert(url.to_string());
        }
        self.selection.select_all = !self.items.is_empty()
            && self.selection.checked.len() == self.items.len();
    }

    /// Check every shown item, or clear the selection if all were checked
    pub fn toggle_all(&mut self) {
        if self.selection.select_all {
            self.selection.clear();
        } else {
            self.selection.checked = self.items.iter().map(|item| item.url.clone()).collect();
            self.selection.select_all = !self.items.is_empty();
        }
    }

    /// Checked URLs in view order
    pub fn selected_urls(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| self.selection.is_checked(&item.url))
            .map(|item| item.url.clone())
            .collect()
    }
}
