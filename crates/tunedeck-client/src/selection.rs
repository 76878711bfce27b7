//! Selection that survives wholesale list replacement.
//!
//! Lists pushed by the server (queue, recently played, catalog pages) are
//! replaced in full every time. Selection is therefore never stored on the
//! elements: each `SelectableList` keeps the set of selected identity keys
//! and rebuilds it against every new snapshot.
//!
//! Keys must be unique within one snapshot. A collision is logged; which of
//! the colliding rows counts as selected is then unspecified.

use std::collections::HashSet;

use thiserror::Error;
use tracing::warn;
use tunedeck_proto::track::{QueueEntry, Track};

/// Stable identity of a list element.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Track {
    fn key(&self) -> &str {
        &self.path
    }
}

impl Keyed for QueueEntry {
    fn key(&self) -> &str {
        &self.queue_id
    }
}

/// Artist and album lists are plain names.
impl Keyed for String {
    fn key(&self) -> &str {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("index {index} out of range for list of {len}")]
    OutOfRange { index: usize, len: usize },
}

/// Keys of `new_items` that were selected in `old_items`.
///
/// Only the old list's selected subset is hashed, so the cost is
/// O(|old| + |new|). Running it again on its own output is a no-op.
pub fn reconcile<T, K>(
    old_items: &[T],
    old_selected: impl Fn(usize) -> bool,
    new_items: &[T],
    key_of: K,
) -> HashSet<String>
where
    K: Fn(&T) -> &str,
{
    let previously: HashSet<&str> = old_items
        .iter()
        .enumerate()
        .filter(|(i, _)| old_selected(*i))
        .map(|(_, item)| key_of(item))
        .collect();

    let mut seen = HashSet::with_capacity(new_items.len());
    let mut selected = HashSet::new();
    for item in new_items {
        let key = key_of(item);
        if !seen.insert(key) {
            warn!("duplicate list key {:?}; selection for it is unreliable", key);
        }
        if previously.contains(key) {
            selected.insert(key.to_string());
        }
    }
    selected
}

/// A server-owned list plus the client's selection over it.
#[derive(Debug, Clone)]
pub struct SelectableList<T> {
    items: Vec<T>,
    selected: HashSet<String>,
}

impl<T> Default for SelectableList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: HashSet::new(),
        }
    }
}

impl<T: Keyed> SelectableList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            selected: HashSet::new(),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Swap in a new snapshot, keeping selections whose key is still present.
    pub fn replace(&mut self, new_items: Vec<T>) {
        let selected = &self.selected;
        let kept = reconcile(
            &self.items,
            |i| selected.contains(self.items[i].key()),
            &new_items,
            |item| item.key(),
        );
        self.items = new_items;
        self.selected = kept;
    }

    fn check(&self, index: usize) -> Result<&T, SelectionError> {
        self.items.get(index).ok_or(SelectionError::OutOfRange {
            index,
            len: self.items.len(),
        })
    }

    pub fn select(&mut self, index: usize) -> Result<(), SelectionError> {
        let key = self.check(index)?.key().to_string();
        self.selected.insert(key);
        Ok(())
    }

    pub fn unselect(&mut self, index: usize) -> Result<(), SelectionError> {
        let key = self.check(index)?.key().to_string();
        self.selected.remove(&key);
        Ok(())
    }

    /// Returns the new selection state of `index`.
    pub fn toggle(&mut self, index: usize) -> Result<bool, SelectionError> {
        let key = self.check(index)?.key().to_string();
        if self.selected.remove(&key) {
            Ok(false)
        } else {
            self.selected.insert(key);
            Ok(true)
        }
    }

    /// Clear the selection and select exactly `index`.
    pub fn select_only(&mut self, index: usize) -> Result<(), SelectionError> {
        let key = self.check(index)?.key().to_string();
        self.selected.clear();
        self.selected.insert(key);
        Ok(())
    }

    pub fn is_selected(&self, index: usize) -> Result<bool, SelectionError> {
        let item = self.check(index)?;
        Ok(self.selected.contains(item.key()))
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn count_selected(&self) -> usize {
        self.items
            .iter()
            .filter(|item| self.selected.contains(item.key()))
            .count()
    }

    /// Ascending indexes of the selected elements.
    pub fn selected_indexes(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.selected.contains(item.key()))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn selected_items(&self) -> Vec<&T> {
        self.items
            .iter()
            .filter(|item| self.selected.contains(item.key()))
            .collect()
    }

    /// The single selected element, when exactly one is selected.
    pub fn current(&self) -> Option<&T> {
        let mut selected = self.selected_items().into_iter();
        match (selected.next(), selected.next()) {
            (Some(item), None) => Some(item),
            _ => None,
        }
    }
}
