//! Reading list
//!
//! The backing list of saved links. Order is significant (newest additions go
//! first, drag-reorder persists) and every URL appears at most once.
//!
//! Operations on URLs that are not in the list are silent no-ops: with several
//! surfaces writing, a link removed elsewhere is expected, not an error.
//! Reorders resolve their endpoints by URL, never by indices taken from a
//! filtered view.

use std::collections::{BTreeMap, HashSet};

use crate::error::{ReadingListError, Result, ValidationError};
use crate::models::{is_sentinel, ReadingItem, SENTINEL_CATEGORY};
use crate::registry::{CategoryPatch, CategoryRegistry};

/// Signal for browser chrome (badge, context-menu label) after a link is added or removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkSignal {
    Added(String),
    Removed(String),
}

impl LinkSignal {
    pub fn url(&self) -> &str {
        match self {
            LinkSignal::Added(url) | LinkSignal::Removed(url) => url,
        }
    }

    /// Action name used by the extension's context-menu message
    pub fn action(&self) -> &'static str {
        match self {
            LinkSignal::Added(_) => "add",
            LinkSignal::Removed(_) => "remove",
        }
    }
}

/// Ordered collection of saved links with unique URLs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingList {
    items: Vec<ReadingItem>,
}

impl ReadingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from stored items, repairing what a crash or an older
    /// version may have left behind
    ///
    /// - repeated URLs: the first occurrence wins
    /// - blank or unknown categories fall back to the sentinel
    pub fn normalize(items: Vec<ReadingItem>, registry: &CategoryRegistry) -> Self {
        let mut seen = HashSet::new();
        let items = items
            .into_iter()
            .filter(|item| seen.insert(item.url.clone()))
            .map(|mut item| {
                if item.category.trim().is_empty() || !registry.contains(&item.category) {
                    item.category = SENTINEL_CATEGORY.to_string();
                }
                item
            })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[ReadingItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<ReadingItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<&ReadingItem> {
        self.items.iter().find(|item| item.url == url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.position(url).is_some()
    }

    pub fn position(&self, url: &str) -> Option<usize> {
        self.items.iter().position(|item| item.url == url)
    }

    /// Prepend a new link
    ///
    /// Fails with `Duplicate` if the URL is already saved; what to do then is
    /// the caller's decision.
    pub fn add(&mut self, url: &str, title: &str, category: &str) -> Result<&ReadingItem> {
        if let Some(existing) = self.get(url) {
            return Err(ReadingListError::Duplicate {
                url: url.to_string(),
                existing_category: existing.category.clone(),
            });
        }

        self.items
            .insert(0, ReadingItem::new(url, title).with_category(category));
        Ok(&self.items[0])
    }

    /// Remove a link; returns whether anything was removed
    pub fn remove(&mut self, url: &str) -> bool {
        match self.position(url) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every listed URL that is present; returns the removed URLs in list order
    pub fn remove_many<S: AsRef<str>>(&mut self, urls: &[S]) -> Vec<String> {
        let targets: HashSet<&str> = urls.iter().map(|u| u.as_ref()).collect();
        let mut removed = Vec::new();
        self.items.retain(|item| {
            if targets.contains(item.url.as_str()) {
                removed.push(item.url.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Replace a title in place; returns whether the title changed
    ///
    /// Unknown URLs and blank titles leave the list untouched.
    pub fn edit(&mut self, url: &str, new_title: &str) -> bool {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return false;
        }
        match self.items.iter_mut().find(|item| item.url == url) {
            Some(item) if item.title != new_title => {
                item.title = new_title.to_string();
                true
            }
            _ => false,
        }
    }

    /// Assign `target` as the category of every listed URL that is present
    ///
    /// The target is not checked against the registry; callers pass registry names.
    /// Returns the number of links whose category changed.
    pub fn recategorize<S: AsRef<str>>(&mut self, urls: &[S], target: &str) -> usize {
        let targets: HashSet<&str> = urls.iter().map(|u| u.as_ref()).collect();
        let mut changed = 0;
        for item in self
            .items
            .iter_mut()
            .filter(|item| targets.contains(item.url.as_str()))
        {
            if item.category != target {
                item.category = target.to_string();
                changed += 1;
            }
        }
        changed
    }

    /// Apply the compensating patch of a category rename or delete
    pub fn apply_category_patch(&mut self, patch: &CategoryPatch) -> usize {
        self.recategorize(&patch.urls, &patch.to)
    }

    /// Move the item at backing index `from` to backing index `to`
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.items.len();
        for index in [from, to] {
            if index >= len {
                return Err(ValidationError::IndexOutOfRange { index, len }.into());
            }
        }
        let moved = self.items.remove(from);
        self.items.insert(to, moved);
        Ok(())
    }

    /// Move `moved_url` into the position held by `target_url`
    pub fn reorder_by_url(&mut self, moved_url: &str, target_url: &str) -> Result<()> {
        let from = self.require_position(moved_url)?;
        let to = self.require_position(target_url)?;
        self.reorder(from, to)
    }

    /// Reorder started from a filtered view
    ///
    /// `visible_urls` are the links the view shows, in backing order. The
    /// moved link takes the target's place among them, and the visible links
    /// are written back into the backing slots they already occupied. Links
    /// hidden by the view keep their slots.
    pub fn reorder_within<S: AsRef<str>>(
        &mut self,
        visible_urls: &[S],
        moved_url: &str,
        target_url: &str,
    ) -> Result<()> {
        let visible: HashSet<&str> = visible_urls.iter().map(|u| u.as_ref()).collect();
        for url in [moved_url, target_url] {
            if !visible.contains(url) {
                return Err(ValidationError::UnknownUrl(url.to_string()).into());
            }
            self.require_position(url)?;
        }

        let slots: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| visible.contains(item.url.as_str()))
            .map(|(index, _)| index)
            .collect();
        let mut shown: Vec<ReadingItem> = slots.iter().map(|&i| self.items[i].clone()).collect();

        let from = shown.iter().position(|item| item.url == moved_url);
        let to = shown.iter().position(|item| item.url == target_url);
        let (Some(from), Some(to)) = (from, to) else {
            return Err(ValidationError::UnknownUrl(moved_url.to_string()).into());
        };
        let moved = shown.remove(from);
        shown.insert(to, moved);

        for (slot, item) in slots.into_iter().zip(shown) {
            self.items[slot] = item;
        }
        Ok(())
    }

    /// Remove the link if saved, otherwise add it (background shortcut / context menu)
    pub fn toggle(&mut self, url: &str, title: &str, category: &str) -> LinkSignal {
        if self.remove(url) {
            LinkSignal::Removed(url.to_string())
        } else {
            self.items
                .insert(0, ReadingItem::new(url, title).with_category(category));
            LinkSignal::Added(url.to_string())
        }
    }

    /// Number of links per category, in registry order
    ///
    /// The sentinel counts every link, matching the "All" tab.
    pub fn counts(&self, registry: &CategoryRegistry) -> Vec<(String, usize)> {
        let mut per_category: BTreeMap<&str, usize> = BTreeMap::new();
        for item in &self.items {
            *per_category.entry(item.category.as_str()).or_default() += 1;
        }

        registry
            .names()
            .iter()
            .map(|name| {
                let count = if is_sentinel(name) {
                    self.items.len()
                } else {
                    per_category.get(name.as_str()).copied().unwrap_or(0)
                };
                (name.clone(), count)
            })
            .collect()
    }

    fn require_position(&self, url: &str) -> Result<usize> {
        self.position(url)
            .ok_or_else(|| ValidationError::UnknownUrl(url.to_string()).into())
    }
}
