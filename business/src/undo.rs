//! Bounded history of reversible uploads.

use std::collections::VecDeque;

use log::warn;
use pasteup_services::{StateStore, UndoAction, load, save};
use serde::{Deserialize, Serialize};

/// Key of the persisted history.
pub const UNDO_HISTORY_KEY: &str = "undoHistory";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoEntry {
    pub title: String,
    pub action: UndoAction,
}

/// Oldest entries are evicted first once `limit` is exceeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoHistory {
    entries: VecDeque<UndoEntry>,
    limit: usize,
}

impl UndoHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    /// Restore the persisted history, clamped to `limit`.
    pub fn load(store: &dyn StateStore, limit: usize) -> Self {
        let entries: VecDeque<UndoEntry> = load(store, UNDO_HISTORY_KEY).unwrap_or_default();
        let mut history = Self { entries, limit };
        history.clamp();
        history
    }

    pub fn save(&self, store: &dyn StateStore) {
        if let Err(err) = save(store, UNDO_HISTORY_KEY, &self.entries) {
            warn!("UndoHistory: failed to persist: {err}");
        }
    }

    pub fn push(&mut self, entry: UndoEntry) {
        self.entries.push_back(entry);
        self.clamp();
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.clamp();
    }

    /// Entries, most recent first.
    pub fn recent_first(&self) -> impl Iterator<Item = &UndoEntry> {
        self.entries.iter().rev()
    }

    /// Remove the entry at `index` in most-recent-first order.
    pub fn take(&mut self, index: usize) -> Option<UndoEntry> {
        let position = self.entries.len().checked_sub(index.checked_add(1)?)?;
        self.entries.remove(position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn clamp(&mut self) {
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pasteup_services::{MemoryStateStore, ObjectStoreSettings};

    fn entry(n: usize) -> UndoEntry {
        UndoEntry {
            title: format!("Delete {n}.png"),
            action: UndoAction::delete_object(&ObjectStoreSettings::default(), format!("{n}.png")),
        }
    }

    fn titles(history: &UndoHistory) -> Vec<String> {
        history.recent_first().map(|e| e.title.clone()).collect()
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut history = UndoHistory::new(2);
        history.push(entry(1));
        history.push(entry(2));
        history.push(entry(3));
        assert_eq!(titles(&history), vec!["Delete 3.png", "Delete 2.png"]);
    }

    #[test]
    fn lowering_limit_clamps() {
        let mut history = UndoHistory::new(5);
        for n in 0..5 {
            history.push(entry(n));
        }
        history.set_limit(1);
        assert_eq!(titles(&history), vec!["Delete 4.png"]);
    }

    #[test]
    fn take_uses_recent_first_index() {
        let mut history = UndoHistory::new(5);
        history.push(entry(1));
        history.push(entry(2));
        history.push(entry(3));

        assert_eq!(history.take(1), Some(entry(2)));
        assert_eq!(titles(&history), vec!["Delete 3.png", "Delete 1.png"]);
        assert_eq!(history.take(7), None);
        assert_eq!(history.take(usize::MAX), None);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn persists_through_store() {
        let store = MemoryStateStore::new();
        let mut history = UndoHistory::new(3);
        history.push(entry(1));
        history.push(entry(2));
        history.save(&store);

        let restored = UndoHistory::load(&store, 1);
        assert_eq!(titles(&restored), vec!["Delete 2.png"]);
    }
}
