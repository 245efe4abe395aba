//! Item equality.
//!
//! Two items are equal when the first one's equality hook says so, else the
//! second one's hook (called with its owner first), else when both comparison
//! values resolve and match.
//! Items without a comparison value (no value field, no explicit value and a
//! structured payload) fall back to identity.

use std::ptr;

use super::accessor::{self, FieldAccessor};
use super::item::Item;

/// Compares items for selection reconciliation.
#[derive(Debug, Clone, Default)]
pub struct Comparator {
    value_field: Option<FieldAccessor>,
}

impl Comparator {
    /// Creates a comparator reading values through `value_field`.
    pub fn new(value_field: Option<FieldAccessor>) -> Self {
        Self { value_field }
    }

    /// The configured value field.
    pub fn value_field(&self) -> Option<&FieldAccessor> {
        self.value_field.as_ref()
    }

    /// Returns `true` if `a` and `b` denote the same logical item.
    pub fn equals(&self, a: &Item, b: &Item) -> bool {
        if let Some(equals) = a.equals_fn() {
            return equals(a, b);
        }
        if let Some(equals) = b.equals_fn() {
            return equals(b, a);
        }
        if ptr::eq(a, b) {
            return true;
        }
        match (
            accessor::item_value(a, self.value_field()),
            accessor::item_value(b, self.value_field()),
        ) {
            (Some(va), Some(vb)) => va == vb,
            _ => false,
        }
    }
}
