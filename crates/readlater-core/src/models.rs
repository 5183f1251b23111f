//! Data models for readlater
//!
//! Defines the persisted records: `ReadingItem` and `ReadingProgress`, plus the
//! category constants shared by the registry and the reading list.
//! Field names serialize in camelCase so existing stored data keeps loading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The reserved "All" category. Always first, never renamed or deleted.
pub const SENTINEL_CATEGORY: &str = "全部";

/// Maximum category name length, in characters
pub const MAX_CATEGORY_LENGTH: usize = 16;

/// Base name used when a category is created without a name
pub const DEFAULT_CATEGORY_NAME: &str = "新分类";

/// Character offsets of a text selection inside the saved page
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TextPosition {
    pub start_offset: u64,
    pub end_offset: u64,
}

/// A saved page in the reading list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingItem {
    /// The URL, unique across the list
    pub url: String,
    /// Display title; records saved without one show their URL
    #[serde(default)]
    pub title: String,
    /// When this item was saved
    pub added_at: DateTime<Utc>,
    /// Category name, or the sentinel for "uncategorized"
    #[serde(default = "default_category")]
    pub category: String,
    /// Highlighted text captured when the item was saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    /// Position of `selected_text` in the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_position: Option<TextPosition>,
}

impl ReadingItem {
    /// Create a new item in the sentinel category, stamped with the current time
    ///
    /// A blank title falls back to the URL.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        let url = url.into();
        let title = title.into();
        let title = if title.trim().is_empty() {
            url.clone()
        } else {
            title
        };
        Self {
            url,
            title,
            added_at: Utc::now(),
            category: default_category(),
            selected_text: None,
            text_position: None,
        }
    }

    /// Builder-style category assignment
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Builder-style timestamp override (for imports and tests)
    pub fn with_added_at(mut self, added_at: DateTime<Utc>) -> Self {
        self.added_at = added_at;
        self
    }

    /// Whether this item is in the sentinel category
    pub fn is_uncategorized(&self) -> bool {
        is_sentinel(&self.category)
    }

    /// Case-insensitive substring match on title OR url
    pub fn matches(&self, needle_lowercase: &str) -> bool {
        self.title.to_lowercase().contains(needle_lowercase)
            || self.url.to_lowercase().contains(needle_lowercase)
    }

    /// Host name of the URL (without `www.`), or the path for `file:///` URLs
    pub fn hostname(&self) -> &str {
        extract_hostname(&self.url)
    }
}

/// Reading position saved by the highlight/scroll feature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingProgress {
    pub url: String,
    pub position: f64,
}

/// Check whether a category name is the sentinel
pub fn is_sentinel(category: &str) -> bool {
    category == SENTINEL_CATEGORY
}

fn default_category() -> String {
    SENTINEL_CATEGORY.to_string()
}

/// Extract a display host from a URL
///
/// Falls back to the input when it does not look like a URL.
pub fn extract_hostname(url: &str) -> &str {
    if let Some(path) = url.strip_prefix("file:///") {
        return path;
    }

    let Some((_, rest)) = url.split_once("://") else {
        return url;
    };

    let authority = rest
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or(rest);
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = host.split(':').next().unwrap_or(host);
    let host = host.strip_prefix("www.").unwrap_or(host);

    if host.is_empty() {
        url
    } else {
        host
    }
}
