//! Category registry
//!
//! Ordered list of category names. Position is display order. The sentinel
//! category (`全部`) is always present, always first, and cannot be renamed,
//! deleted or moved.
//!
//! Rename and delete return a `CategoryPatch`: the links that referenced the
//! old name and the value they must take. The caller applies the patch to the
//! reading list and persists both collections in the same write.

use serde::{Deserialize, Serialize};

use crate::error::{ReadingListError, Result, ValidationError};
use crate::models::{
    is_sentinel, ReadingItem, DEFAULT_CATEGORY_NAME, MAX_CATEGORY_LENGTH, SENTINEL_CATEGORY,
};

/// Links whose category must change as a consequence of a registry operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPatch {
    /// Category the links currently reference
    pub from: String,
    /// Category the links must reference afterwards
    pub to: String,
    /// URLs of the affected links
    pub urls: Vec<String>,
}

impl CategoryPatch {
    fn collect(from: &str, to: &str, items: &[ReadingItem]) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            urls: items
                .iter()
                .filter(|item| item.category == from)
                .map(|item| item.url.clone())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Ordered category names, sentinel first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRegistry {
    names: Vec<String>,
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryRegistry {
    /// A registry holding only the sentinel
    pub fn new() -> Self {
        Self {
            names: vec![SENTINEL_CATEGORY.to_string()],
        }
    }

    /// Build a valid registry from stored data
    ///
    /// Blank and repeated names are dropped and the sentinel is moved (or
    /// inserted) at index 0. Names are otherwise kept as stored.
    pub fn normalize(raw: Vec<String>) -> Self {
        let mut names = vec![SENTINEL_CATEGORY.to_string()];
        for name in raw {
            let name = name.trim().to_string();
            if name.is_empty() || names.contains(&name) {
                continue;
            }
            names.push(name);
        }
        Self { names }
    }

    /// Category names in display order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }

    /// User-defined categories (everything after the sentinel)
    pub fn user_categories(&self) -> &[String] {
        &self.names[1..]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: the sentinel is never removed
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Name shown at a registry position
    pub fn name_at(&self, index: usize) -> Result<&str> {
        self.names.get(index).map(String::as_str).ok_or_else(|| {
            ValidationError::IndexOutOfRange {
                index,
                len: self.names.len(),
            }
            .into()
        })
    }

    /// Trim and check a proposed name against length and uniqueness rules
    pub fn validate_name(&self, name: &str) -> std::result::Result<String, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if name.chars().count() > MAX_CATEGORY_LENGTH {
            return Err(ValidationError::NameTooLong {
                name: name.to_string(),
                max: MAX_CATEGORY_LENGTH,
            });
        }
        if self.contains(name) {
            return Err(ValidationError::DuplicateName(name.to_string()));
        }
        Ok(name.to_string())
    }

    /// Append a new category; returns the stored (trimmed) name
    pub fn create(&mut self, name: &str) -> Result<String> {
        let name = self.validate_name(name)?;
        self.names.push(name.clone());
        Ok(name)
    }

    /// Append a category with the first free default name
    pub fn create_default(&mut self) -> String {
        let name = (1..)
            .map(|n| {
                if n == 1 {
                    DEFAULT_CATEGORY_NAME.to_string()
                } else {
                    format!("{} {}", DEFAULT_CATEGORY_NAME, n)
                }
            })
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| DEFAULT_CATEGORY_NAME.to_string());
        self.names.push(name.clone());
        name
    }

    /// Rename a category in place
    ///
    /// Returns `Ok(None)` when the trimmed new name equals the old one.
    /// Otherwise returns the patch rewriting `old` to the new name on `items`.
    pub fn rename(
        &mut self,
        old: &str,
        new: &str,
        items: &[ReadingItem],
    ) -> Result<Option<CategoryPatch>> {
        if is_sentinel(old) {
            return Err(ReadingListError::InvariantViolation(format!(
                "the '{}' category cannot be renamed",
                SENTINEL_CATEGORY
            )));
        }
        let index = self
            .position(old)
            .ok_or_else(|| ValidationError::UnknownCategory(old.to_string()))?;

        if new.trim() == old {
            return Ok(None);
        }
        let new = self.validate_name(new)?;

        self.names[index] = new.clone();
        Ok(Some(CategoryPatch::collect(old, &new, items)))
    }

    /// Remove a category
    ///
    /// Returns the patch moving every link in it back to the sentinel.
    pub fn delete(&mut self, name: &str, items: &[ReadingItem]) -> Result<CategoryPatch> {
        if is_sentinel(name) {
            return Err(ReadingListError::InvariantViolation(format!(
                "the '{}' category cannot be deleted",
                SENTINEL_CATEGORY
            )));
        }
        let index = self
            .position(name)
            .ok_or_else(|| ValidationError::UnknownCategory(name.to_string()))?;

        self.names.remove(index);
        Ok(CategoryPatch::collect(name, SENTINEL_CATEGORY, items))
    }

    /// Move the category at `from` to `to`; index 0 is pinned to the sentinel
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        if from == 0 || to == 0 {
            return Err(ReadingListError::InvariantViolation(format!(
                "the '{}' category must stay first",
                SENTINEL_CATEGORY
            )));
        }
        let len = self.names.len();
        for index in [from, to] {
            if index >= len {
                return Err(ValidationError::IndexOutOfRange { index, len }.into());
            }
        }

        let moved = self.names.remove(from);
        self.names.insert(to, moved);
        Ok(())
    }

    /// Move `moved` to the position currently held by `target`
    pub fn reorder_by_name(&mut self, moved: &str, target: &str) -> Result<()> {
        let from = self
            .position(moved)
            .ok_or_else(|| ValidationError::UnknownCategory(moved.to_string()))?;
        let to = self
            .position(target)
            .ok_or_else(|| ValidationError::UnknownCategory(target.to_string()))?;
        self.reorder(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(names: &[&str]) -> CategoryRegistry {
        CategoryRegistry::normalize(names.iter().map(|s| s.to_string()).collect())
    }

    fn assert_sentinel_pinned(registry: &CategoryRegistry) {
        assert_eq!(registry.names()[0], SENTINEL_CATEGORY);
        assert_eq!(
            registry
                .names()
                .iter()
                .filter(|n| n.as_str() == SENTINEL_CATEGORY)
                .count(),
            1
        );
    }

    #[test]
    fn test_new_has_only_sentinel() {
        let registry = CategoryRegistry::new();
        assert_eq!(registry.names(), &[SENTINEL_CATEGORY.to_string()]);
        assert!(registry.user_categories().is_empty());
    }

    #[test]
    fn test_normalize_repairs_stored_data() {
        let registry = registry(&["Tech", "全部", "", "Tech", " News "]);
        assert_eq!(registry.names(), &["全部", "Tech", "News"]);
    }

    #[test]
    fn test_create_trims_and_appends() {
        let mut registry = CategoryRegistry::new();
        assert_eq!(registry.create("  Tech ").unwrap(), "Tech");
        assert_eq!(registry.create("News").unwrap(), "News");
        assert_eq!(registry.names(), &["全部", "Tech", "News"]);
    }

    #[test]
    fn test_create_rejects_invalid_names() {
        let mut registry = registry(&["Tech"]);

        assert!(matches!(
            registry.create("   "),
            Err(ReadingListError::Validation(ValidationError::EmptyName))
        ));
        assert!(matches!(
            registry.create("Tech"),
            Err(ReadingListError::Validation(ValidationError::DuplicateName(_)))
        ));
        assert!(matches!(
            registry.create("全部"),
            Err(ReadingListError::Validation(ValidationError::DuplicateName(_)))
        ));
        assert!(matches!(
            registry.create("abcdefghijklmnopq"),
            Err(ReadingListError::Validation(ValidationError::NameTooLong { .. }))
        ));

        // Case-sensitive: a different case is a different name
        assert!(registry.create("tech").is_ok());
    }

    #[test]
    fn test_length_limit_counts_characters() {
        let mut registry = CategoryRegistry::new();
        // 16 CJK characters fit even though they are 48 bytes
        assert!(registry.create("一二三四五六七八九十一二三四五六").is_ok());
        assert!(registry.create("一二三四五六七八九十一二三四五六七").is_err());
    }

    #[test]
    fn test_create_default_picks_free_name() {
        let mut registry = CategoryRegistry::new();
        assert_eq!(registry.create_default(), "新分类");
        assert_eq!(registry.create_default(), "新分类 2");
        assert_eq!(registry.create_default(), "新分类 3");
    }

    #[test]
    fn test_rename_returns_patch() {
        let mut registry = registry(&["Tech", "News"]);
        let items = vec![
            ReadingItem::new("https://a.com", "A").with_category("Tech"),
            ReadingItem::new("https://b.com", "B").with_category("News"),
            ReadingItem::new("https://c.com", "C").with_category("Tech"),
        ];

        let patch = registry.rename("Tech", "Technology", &items).unwrap().unwrap();
        assert_eq!(registry.names(), &["全部", "Technology", "News"]);
        assert_eq!(patch.from, "Tech");
        assert_eq!(patch.to, "Technology");
        assert_eq!(patch.urls, vec!["https://a.com", "https://c.com"]);
    }

    #[test]
    fn test_rename_to_same_name_is_noop() {
        let mut registry = registry(&["Tech"]);
        assert_eq!(registry.rename("Tech", "  Tech ", &[]).unwrap(), None);
        assert_eq!(registry.names(), &["全部", "Tech"]);
    }

    #[test]
    fn test_rename_validation() {
        let mut registry = registry(&["Tech", "News"]);
        assert!(matches!(
            registry.rename("Tech", "News", &[]),
            Err(ReadingListError::Validation(ValidationError::DuplicateName(_)))
        ));
        assert!(matches!(
            registry.rename("Tech", "", &[]),
            Err(ReadingListError::Validation(ValidationError::EmptyName))
        ));
        assert!(matches!(
            registry.rename("Missing", "Other", &[]),
            Err(ReadingListError::Validation(ValidationError::UnknownCategory(_)))
        ));
        assert_eq!(registry.names(), &["全部", "Tech", "News"]);
    }

    #[test]
    fn test_sentinel_cannot_be_renamed_or_deleted() {
        let mut registry = registry(&["Tech"]);
        let before = registry.clone();

        assert!(matches!(
            registry.rename(SENTINEL_CATEGORY, "Everything", &[]),
            Err(ReadingListError::InvariantViolation(_))
        ));
        assert!(matches!(
            registry.rename(SENTINEL_CATEGORY, SENTINEL_CATEGORY, &[]),
            Err(ReadingListError::InvariantViolation(_))
        ));
        assert!(matches!(
            registry.delete(SENTINEL_CATEGORY, &[]),
            Err(ReadingListError::InvariantViolation(_))
        ));
        assert_eq!(registry, before);
    }

    #[test]
    fn test_delete_returns_patch_to_sentinel() {
        let mut registry = registry(&["Tech", "News"]);
        let items = vec![
            ReadingItem::new("https://a.com", "A").with_category("Tech"),
            ReadingItem::new("https://b.com", "B").with_category("News"),
        ];

        let patch = registry.delete("Tech", &items).unwrap();
        assert_eq!(registry.names(), &["全部", "News"]);
        assert_eq!(patch.to, SENTINEL_CATEGORY);
        assert_eq!(patch.urls, vec!["https://a.com"]);
    }

    #[test]
    fn test_reorder_keeps_sentinel_first() {
        let mut registry = registry(&["A", "B", "C"]);

        registry.reorder(3, 1).unwrap();
        assert_eq!(registry.names(), &["全部", "C", "A", "B"]);

        assert!(matches!(
            registry.reorder(0, 2),
            Err(ReadingListError::InvariantViolation(_))
        ));
        assert!(matches!(
            registry.reorder(2, 0),
            Err(ReadingListError::InvariantViolation(_))
        ));
        assert!(matches!(
            registry.reorder(1, 9),
            Err(ReadingListError::Validation(ValidationError::IndexOutOfRange { .. }))
        ));
        assert_sentinel_pinned(&registry);
    }

    #[test]
    fn test_name_at() {
        let registry = registry(&["A", "B"]);
        assert_eq!(registry.name_at(0).unwrap(), SENTINEL_CATEGORY);
        assert_eq!(registry.name_at(2).unwrap(), "B");
        assert!(registry.name_at(3).is_err());
    }

    #[test]
    fn test_reorder_by_name() {
        let mut registry = registry(&["A", "B", "C"]);
        registry.reorder_by_name("A", "C").unwrap();
        assert_eq!(registry.names(), &["全部", "B", "C", "A"]);

        assert!(registry.reorder_by_name("B", SENTINEL_CATEGORY).is_err());
    }

    #[test]
    fn test_sentinel_survives_operation_sequences() {
        let mut registry = CategoryRegistry::new();
        let steps: Vec<Box<dyn Fn(&mut CategoryRegistry)>> = vec![
            Box::new(|r: &mut CategoryRegistry| {
                let _ = r.create("One");
            }),
            Box::new(|r: &mut CategoryRegistry| {
                r.create_default();
            }),
            Box::new(|r: &mut CategoryRegistry| {
                let _ = r.reorder(2, 1);
            }),
            Box::new(|r: &mut CategoryRegistry| {
                let _ = r.reorder(1, 0);
            }),
            Box::new(|r: &mut CategoryRegistry| {
                let _ = r.rename("One", "全部", &[]);
            }),
            Box::new(|r: &mut CategoryRegistry| {
                let _ = r.delete("One", &[]);
            }),
            Box::new(|r: &mut CategoryRegistry| {
                let _ = r.delete(SENTINEL_CATEGORY, &[]);
            }),
            Box::new(|r: &mut CategoryRegistry| {
                let _ = r.create(SENTINEL_CATEGORY);
            }),
        ];

        for step in &steps {
            step(&mut registry);
            assert_sentinel_pinned(&registry);
        }
        for step in steps.iter().rev() {
            step(&mut registry);
            assert_sentinel_pinned(&registry);
        }
    }
}
