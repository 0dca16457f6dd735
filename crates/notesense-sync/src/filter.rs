//! Category and free-text filtering of the local store, plus the category
//! catalog the filter chips are built from.

use notesense_core::defaults;
use notesense_core::{Error, Note, Result};

/// Free-text query plus selected category tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub query: String,
    pub categories: Vec<String>,
}

impl NoteFilter {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            categories: Vec::new(),
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// True when the filter lets every note through.
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.categories.is_empty()
    }

    /// Query matches title or content (case-insensitive, whitespace kept
    /// as typed), and the note carries at least one selected category.
    pub fn matches(&self, note: &Note) -> bool {
        let query = self.query.to_lowercase();
        self.matches_lowered(note, &query)
    }

    fn matches_lowered(&self, note: &Note, query: &str) -> bool {
        let text_ok = query.is_empty()
            || note.title.to_lowercase().contains(query)
            || note.content.to_lowercase().contains(query);
        let category_ok =
            self.categories.is_empty() || self.categories.iter().any(|c| note.has_category(c));
        text_ok && category_ok
    }

    /// Subsequence of `notes` this filter accepts, in store order.
    pub fn apply<'a>(&self, notes: &'a [Note]) -> Vec<&'a Note> {
        let query = self.query.to_lowercase();
        notes
            .iter()
            .filter(|n| self.matches_lowered(n, &query))
            .collect()
    }
}

/// Filter `notes` by `query` and `selected` categories.
pub fn filter_notes<'a>(notes: &'a [Note], query: &str, selected: &[String]) -> Vec<&'a Note> {
    NoteFilter {
        query: query.to_string(),
        categories: selected.to_vec(),
    }
    .apply(notes)
}

/// Unique categories used across `notes`, in first-seen order.
pub fn collect_categories(notes: &[Note]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for category in notes.iter().flat_map(|n| n.categories.iter()) {
        if !seen.contains(category) {
            seen.push(category.clone());
        }
    }
    seen
}

/// Known category tags and the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalog {
    categories: Vec<String>,
    selected: Vec<String>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CategoryCatalog {
    /// Empty catalog.
    pub fn empty() -> Self {
        Self {
            categories: Vec::new(),
            selected: Vec::new(),
        }
    }

    /// Catalog seeded with the stock categories.
    pub fn with_defaults() -> Self {
        Self {
            categories: defaults::DEFAULT_CATEGORIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            selected: Vec::new(),
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Add a user-defined category. Rejects blank names and duplicates.
    pub fn add(&mut self, category: &str) -> Result<()> {
        let category = category.trim();
        if category.is_empty() {
            return Err(Error::InvalidInput("category name cannot be empty".to_string()));
        }
        if self.contains(category) {
            return Err(Error::InvalidInput(format!(
                "category already exists: {category}"
            )));
        }
        self.categories.push(category.to_string());
        Ok(())
    }

    /// Remove a category (and deselect it). Returns whether it existed.
    pub fn remove(&mut self, category: &str) -> bool {
        let before = self.categories.len();
        self.categories.retain(|c| c != category);
        self.selected.retain(|c| c != category);
        self.categories.len() != before
    }

    /// Learn categories used by `notes` that the catalog does not know yet.
    pub fn merge_from(&mut self, notes: &[Note]) -> usize {
        let mut added = 0;
        for category in collect_categories(notes) {
            if !self.contains(&category) {
                self.categories.push(category);
                added += 1;
            }
        }
        added
    }

    /// Flip selection of `category`. Returns whether it is now selected.
    pub fn toggle_selected(&mut self, category: &str) -> bool {
        if let Some(index) = self.selected.iter().position(|c| c == category) {
            self.selected.remove(index);
            false
        } else {
            self.selected.push(category.to_string());
            true
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Filter for `query` restricted to the selected categories.
    pub fn filter(&self, query: impl Into<String>) -> NoteFilter {
        NoteFilter::new(query).with_categories(self.selected.clone())
    }
}
