//! Selection state for the editor surfaces.
//!
//! The selection is an insertion-ordered set of element ids: the set answers
//! "is this selected?", the order answers "which one is *current*?" (the most
//! recently selected id). A separate secondary cursor survives from the
//! legacy dual-select workflow and can be swapped with the primary one.
//!
//! The selection never owns elements; it holds top-level ids only and is
//! resynced against the element list after every mutation.

use indexmap::IndexSet;

use crate::model::ElementId;

/// Ordered multi-selection plus the legacy secondary cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Selected ids in insertion order; the last one is the current element.
    selected: IndexSet<ElementId>,
    /// Secondary cursor for dual-select interactions.
    current_sub: Option<ElementId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The primary cursor: the most recently selected id.
    pub fn current(&self) -> Option<ElementId> {
        self.selected.last().copied()
    }

    /// The legacy secondary cursor.
    pub fn current_sub(&self) -> Option<ElementId> {
        self.current_sub
    }

    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selected.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Selected ids in selection order.
    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.selected.iter().copied()
    }

    /// Make `id` current. Non-additive selection replaces the whole set;
    /// additive selection appends. Re-selecting an already selected id moves
    /// it to the end so it becomes current either way.
    pub fn set_current(&mut self, id: ElementId, additive: bool) {
        if !additive {
            self.selected.clear();
        }
        self.selected.shift_remove(&id);
        self.selected.insert(id);
    }

    /// Add `id` if absent, remove it if present.
    pub fn toggle(&mut self, id: ElementId) {
        if !self.selected.shift_remove(&id) {
            self.selected.insert(id);
        }
    }

    /// Replace the selection with `ids` (order preserved, duplicates folded).
    pub fn set(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        self.selected.clear();
        for id in ids {
            self.selected.insert(id);
        }
    }

    /// Append `id` without making any other change to the order.
    pub fn insert(&mut self, id: ElementId) {
        self.selected.insert(id);
    }

    /// Drop the whole selection, including the secondary cursor.
    pub fn clear(&mut self) {
        self.selected.clear();
        self.current_sub = None;
    }

    /// Swap the primary and secondary cursors. A no-op when there is no
    /// secondary cursor.
    pub fn swap_current(&mut self) {
        let Some(sub) = self.current_sub else {
            return;
        };
        self.current_sub = self.current();
        self.selected.shift_remove(&sub);
        self.selected.insert(sub);
    }

    /// Set the secondary cursor directly.
    pub fn set_current_sub(&mut self, id: Option<ElementId>) {
        self.current_sub = id;
    }

    /// Drop ids rejected by `alive`, preserving selection order. Run as the
    /// resync step of the commit pipeline.
    pub fn retain(&mut self, mut alive: impl FnMut(ElementId) -> bool) {
        self.selected.retain(|id| alive(*id));
        if let Some(sub) = self.current_sub {
            if !alive(sub) {
                self.current_sub = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_is_last_inserted() {
        let mut sel = Selection::new();
        sel.set_current(1, false);
        sel.set_current(2, true);
        sel.set_current(3, true);
        assert_eq!(sel.current(), Some(3));
        assert_eq!(sel.len(), 3);
    }

    #[test]
    fn test_reselect_moves_to_front_of_order() {
        let mut sel = Selection::new();
        sel.set_current(1, false);
        sel.set_current(2, true);
        sel.set_current(1, true);
        assert_eq!(sel.current(), Some(1));
        assert_eq!(sel.ids().collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn test_non_additive_replaces() {
        let mut sel = Selection::new();
        sel.set_current(1, false);
        sel.set_current(2, true);
        sel.set_current(9, false);
        assert_eq!(sel.ids().collect::<Vec<_>>(), vec![9]);
    }

    #[test]
    fn test_toggle() {
        let mut sel = Selection::new();
        sel.toggle(5);
        assert!(sel.is_selected(5));
        sel.toggle(5);
        assert!(!sel.is_selected(5));
        assert!(sel.is_empty());
    }

    #[test]
    fn test_swap_current() {
        let mut sel = Selection::new();
        sel.set_current(1, false);
        sel.set_current(2, true);
        sel.set_current_sub(Some(7));
        sel.swap_current();
        assert_eq!(sel.current(), Some(7));
        assert_eq!(sel.current_sub(), Some(2));
        // Without a secondary cursor the swap is a no-op.
        let mut lone = Selection::new();
        lone.set_current(1, false);
        lone.swap_current();
        assert_eq!(lone.current(), Some(1));
    }

    #[test]
    fn test_retain_scrubs_dead_ids() {
        let mut sel = Selection::new();
        sel.set(vec![1, 2, 3]);
        sel.set_current_sub(Some(2));
        sel.retain(|id| id != 2);
        assert_eq!(sel.ids().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(sel.current_sub(), None);
    }
}
