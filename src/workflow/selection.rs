// Selected test case tracking for partial export

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of selected test case ids, always a subset of the known ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionTracker {
    selected: BTreeSet<String>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select every known id
    pub fn all_of<'a>(known: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            selected: known.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_selected(&self, tc_id: &str) -> bool {
        self.selected.contains(tc_id)
    }

    /// Add the id if absent, remove it if present.
    ///
    /// Returns the new selection state of the id, or `None` when the id is
    /// not one of the known test cases.
    pub fn toggle<'a>(
        &mut self,
        tc_id: &str,
        known: impl IntoIterator<Item = &'a str>,
    ) -> Option<bool> {
        if !known.into_iter().any(|id| id == tc_id) {
            return None;
        }

        if self.selected.remove(tc_id) {
            Some(false)
        } else {
            self.selected.insert(tc_id.to_string());
            Some(true)
        }
    }

    /// Clear the selection when everything is selected, otherwise select all
    pub fn toggle_all<'a>(&mut self, known: impl IntoIterator<Item = &'a str>) {
        let known: BTreeSet<String> = known.into_iter().map(str::to_string).collect();
        if self.selected.len() == known.len() {
            self.selected.clear();
        } else {
            self.selected = known;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: [&str; 3] = ["TC1", "TC2", "TC3"];

    #[test]
    fn test_toggle_adds_and_removes() {
        let mut selection = SelectionTracker::new();
        assert_eq!(selection.toggle("TC2", KNOWN), Some(true));
        assert!(selection.is_selected("TC2"));
        assert_eq!(selection.toggle("TC2", KNOWN), Some(false));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_toggle_unknown_id_is_ignored() {
        let mut selection = SelectionTracker::new();
        assert_eq!(selection.toggle("TC9", KNOWN), None);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_toggle_all_from_partial_selects_everything() {
        let mut selection = SelectionTracker::new();
        selection.toggle("TC1", KNOWN);
        selection.toggle_all(KNOWN);
        assert_eq!(selection.len(), 3);
    }

    #[test]
    fn test_toggle_all_twice_restores_full_and_empty() {
        let mut selection = SelectionTracker::all_of(KNOWN);
        let original = selection.clone();
        selection.toggle_all(KNOWN);
        assert!(selection.is_empty());
        selection.toggle_all(KNOWN);
        assert_eq!(selection, original);

        let mut selection = SelectionTracker::new();
        selection.toggle_all(KNOWN);
        selection.toggle_all(KNOWN);
        assert!(selection.is_empty());
    }
}
