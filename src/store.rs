use log::info;

use crate::dedup::{DedupGuard, Verdict};
use crate::models::FeedEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Accepted,
    IdentityDuplicate,
    ContentDuplicate,
}

/// Accepted entries of one route, in load order.
///
/// Append-only between resets: nothing is evicted while the page is open.
#[derive(Debug)]
pub struct FeedStore<E> {
    entries: Vec<E>,
    next_id: Option<i64>,
    active_id: Option<i64>,
    halted: bool,
    duplicate_detected: bool,
    guard: DedupGuard,
}

impl<E> Default for FeedStore<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: None,
            active_id: None,
            halted: false,
            duplicate_detected: false,
            guard: DedupGuard,
        }
    }
}

impl<E: FeedEntry> FeedStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.next_id = None;
        self.active_id = None;
        self.halted = false;
        self.duplicate_detected = false;
    }

    pub fn append(&mut self, entry: E, next_id: Option<i64>) -> AppendOutcome {
        match self.guard.check(&entry, &self.entries) {
            Verdict::Unique => {
                self.entries.push(entry);
                self.next_id = next_id;
                AppendOutcome::Accepted
            }
            Verdict::IdentityDuplicate { existing } => {
                info!("Entry {} already loaded, stopping feed", existing);
                self.halted = true;
                AppendOutcome::IdentityDuplicate
            }
            Verdict::ContentDuplicate { existing } => {
                info!(
                    "Entry {} repeats the content of entry {}, stopping feed",
                    entry.id(),
                    existing
                );
                self.halted = true;
                self.duplicate_detected = true;
                AppendOutcome::ContentDuplicate
            }
        }
    }

    /// The fetch came back empty; keep what is shown and stop.
    pub fn mark_exhausted(&mut self) {
        self.halted = true;
    }

    pub fn has_more(&self) -> bool {
        self.next_id.is_some() && !self.halted
    }

    pub fn next_id(&self) -> Option<i64> {
        self.next_id
    }

    pub fn last_id(&self) -> Option<i64> {
        self.entries.last().map(FeedEntry::id)
    }

    pub fn duplicate_detected(&self) -> bool {
        self.duplicate_detected
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: i64) -> Option<&E> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active_id(&self) -> Option<i64> {
        self.active_id
    }

    /// Returns the newly active entry, or None if `id` is unknown or already active.
    pub fn set_active(&mut self, id: i64) -> Option<&E> {
        if self.active_id == Some(id) {
            return None;
        }
        let index = self.entries.iter().position(|e| e.id() == id)?;
        self.active_id = Some(id);
        self.entries.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::tests::entry;
    use crate::models::Entry;

    fn ids(store: &FeedStore<Entry>) -> Vec<i64> {
        store.entries().iter().map(|e| e.id).collect()
    }

    #[test]
    fn distinct_entries_append_in_order() {
        let mut store = FeedStore::new();
        for (i, id) in [100, 101, 102, 103].into_iter().enumerate() {
            let outcome = store.append(entry(id, &format!("Story {id}"), "body", "desk"), Some(id + 1));
            assert_eq!(outcome, AppendOutcome::Accepted);
            assert_eq!(store.len(), i + 1);
        }
        assert_eq!(ids(&store), vec![100, 101, 102, 103]);
        assert_eq!(store.last_id(), Some(103));
        assert_eq!(store.next_id(), Some(104));
        assert!(store.has_more());
    }

    #[test]
    fn identity_duplicate_halts_without_flag() {
        let mut store = FeedStore::new();
        store.append(entry(100, "A", "a", "x"), Some(101));
        let outcome = store.append(entry(100, "B", "b", "y"), Some(102));

        assert_eq!(outcome, AppendOutcome::IdentityDuplicate);
        assert_eq!(store.len(), 1);
        assert!(!store.has_more());
        assert!(!store.duplicate_detected());
    }

    #[test]
    fn content_duplicate_halts_and_flags() {
        let mut store = FeedStore::new();
        store.append(entry(100, "Same Story", "Same body", "x"), Some(101));
        let outcome = store.append(entry(101, "same story ", " SAME BODY", "y"), Some(102));

        assert_eq!(outcome, AppendOutcome::ContentDuplicate);
        assert_eq!(ids(&store), vec![100]);
        assert!(!store.has_more());
        assert!(store.duplicate_detected());
    }

    #[test]
    fn missing_cursor_means_no_more() {
        let mut store = FeedStore::new();
        store.append(entry(100, "A", "a", "x"), None);
        assert!(!store.has_more());
    }

    #[test]
    fn exhausted_store_reports_no_more() {
        let mut store = FeedStore::new();
        store.append(entry(100, "A", "a", "x"), Some(101));
        store.mark_exhausted();
        assert!(!store.has_more());
        assert!(!store.duplicate_detected());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut store = FeedStore::new();
        store.append(entry(100, "A", "a", "x"), Some(101));
        store.append(entry(101, "B", "b", "y"), Some(102));
        store.set_active(100);
        store.reset();

        assert!(store.is_empty());
        assert_eq!(store.next_id(), None);
        assert_eq!(store.active_id(), None);
        assert!(!store.duplicate_detected());
    }

    #[test]
    fn set_active_reports_only_changes() {
        let mut store = FeedStore::new();
        store.append(entry(100, "A", "a", "x"), Some(101));
        store.append(entry(101, "B", "b", "y"), Some(102));

        assert_eq!(store.set_active(101).map(|e| e.id), Some(101));
        assert!(store.set_active(101).is_none());
        assert!(store.set_active(555).is_none());
        assert_eq!(store.active_id(), Some(101));
    }
}
