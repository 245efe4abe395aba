//! Selection tracking.
//!
//! [`SelectionTracker`] keeps the ordered list of selected items in step
//! with each item's `selected` flag, and reconciles the selection when the
//! item collection is replaced: previously selected items are matched to
//! their replacements through a [`Comparator`].
//!
//! # Example
//!
//! ```
//! use horizon_itemlist::model::{Comparator, Item, SelectionTracker};
//!
//! let mut selection = SelectionTracker::new();
//! let item = Item::labeled("a").into_ref();
//!
//! selection.add(&item);
//! assert!(item.is_selected());
//!
//! selection.remove(&item, &Comparator::default());
//! assert!(selection.is_empty());
//! ```

use std::sync::Arc;

use horizon_itemlist_core::logging::targets;

use super::compare::Comparator;
use super::item::{ItemRef, walk_tree};

/// The ordered selection set.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    items: Vec<ItemRef>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected items, in selection order.
    pub fn items(&self) -> &[ItemRef] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns `true` if `item` itself is in the set.
    pub fn contains(&self, item: &ItemRef) -> bool {
        self.items.iter().any(|s| Arc::ptr_eq(s, item))
    }

    /// Flags `item` selected and appends it unless already present.
    pub fn add(&mut self, item: &ItemRef) {
        item.set_selected(true);
        if !self.contains(item) {
            self.items.push(item.clone());
        }
    }

    /// Clears the flag of `item` and removes the first entry equal to it.
    pub fn remove(&mut self, item: &ItemRef, comparator: &Comparator) {
        item.set_selected(false);
        let position = self
            .items
            .iter()
            .position(|s| Arc::ptr_eq(s, item))
            .or_else(|| self.items.iter().position(|s| comparator.equals(s, item)));
        if let Some(position) = position {
            self.items.remove(position);
        }
    }

    /// Empties the set without touching the items' flags.
    pub fn take(&mut self) -> Vec<ItemRef> {
        std::mem::take(&mut self.items)
    }

    /// Replaces the set with the result of a traversal.
    pub fn replace(&mut self, items: Vec<ItemRef>) {
        self.items = items;
    }

    /// Replaces the set with caller-supplied items, clearing the flags of the
    /// previous ones, then reconciles it against `roots`.
    pub fn set(&mut self, items: Vec<ItemRef>, roots: Option<&[ItemRef]>, comparator: &Comparator) {
        for previous in &self.items {
            previous.set_selected(false);
        }
        self.items = items;
        self.reconcile(roots, comparator);
    }

    /// Reconciles the set against a (new) item collection.
    ///
    /// With a non-empty set, every item of `roots` equal to a selected one
    /// replaces it; selected items without a counterpart are kept. With an
    /// empty set, the set is rebuilt from the items flagged selected.
    pub fn reconcile(&mut self, roots: Option<&[ItemRef]>, comparator: &Comparator) {
        if self.items.is_empty() {
            if let Some(roots) = roots {
                walk_tree(roots, &mut |item| {
                    if item.is_selected() {
                        self.items.push(item.clone());
                    }
                });
            }
            return;
        }

        for item in &self.items {
            item.set_selected(true);
        }
        let Some(roots) = roots else {
            return;
        };

        let mut reconciled: Vec<ItemRef> = Vec::new();
        walk_tree(roots, &mut |item| {
            if let Some(previous) = self.items.iter().find(|s| comparator.equals(s, item)) {
                previous.set_selected(false);
                if !reconciled.iter().any(|r| Arc::ptr_eq(r, item)) {
                    reconciled.push(item.clone());
                }
            }
        });

        for previous in &self.items {
            if previous.is_selected() && !reconciled.iter().any(|r| Arc::ptr_eq(r, previous)) {
                reconciled.push(previous.clone());
            }
        }
        for item in &reconciled {
            item.set_selected(true);
        }

        tracing::debug!(
            target: targets::SELECTION,
            before = self.items.len(),
            after = reconciled.len(),
            "selection reconciled"
        );
        self.items = reconciled;
    }
}
