//! Items and item trees.
//!
//! An [`Item`] wraps an opaque JSON payload together with the view flags the
//! engine reads and writes (selection, visibility, collapse state, depth).
//! Items are shared as [`ItemRef`] (`Arc<Item>`); two references denote the
//! same item exactly when they point to the same allocation.
//!
//! Children live in named collections (the default field is `"items"`). The
//! engine resolves the configured collection once, during normalization, into
//! the item's internal children handle. An item whose handle is `Some` is a
//! node, otherwise it is a leaf.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use horizon_itemlist_core::TreeRow;
use parking_lot::RwLock;
use serde_json::Value;

use super::accessor::{self, DEFAULT_CHILDREN_FIELD};

/// A shared item handle. Identity is pointer identity.
pub type ItemRef = Arc<Item>;

/// A shared, ordered collection of items.
///
/// The engine reorders references inside a `ChildList` (sorting, drag
/// commits) but never copies the items themselves.
pub type ChildList = Arc<RwLock<Vec<ItemRef>>>;

/// Custom equality predicate attached to an item.
pub type EqualsFn = Arc<dyn Fn(&Item, &Item) -> bool + Send + Sync>;

/// Creates a new shared child list.
pub fn child_list(items: Vec<ItemRef>) -> ChildList {
    Arc::new(RwLock::new(items))
}

/// Distinguishes caller items from synthetic group nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemKind {
    /// An item supplied by the caller.
    #[default]
    Regular,
    /// A group node created by the grouping engine.
    Group,
}

/// The mutable view flags of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemState {
    /// Item is part of the selection.
    pub selected: bool,
    /// Item may be shown.
    pub visible: bool,
    /// Item can be selected.
    pub selectable: bool,
    /// Item can be collapsed.
    pub collapsible: bool,
    /// Children are hidden.
    pub collapsed: bool,
    /// Nesting depth assigned by flattening.
    pub depth: Option<usize>,
    /// Alternating-row flag assigned by flattening.
    pub odd: bool,
}

impl Default for ItemState {
    fn default() -> Self {
        Self {
            selected: false,
            visible: true,
            selectable: true,
            collapsible: true,
            collapsed: false,
            depth: None,
            odd: false,
        }
    }
}

/// A node of the item collection.
///
/// # Example
///
/// ```
/// use horizon_itemlist::model::Item;
///
/// let tree = Item::labeled("Fruits")
///     .with_children(vec![Item::labeled("Apple").into_ref(), Item::labeled("Pear").into_ref()])
///     .into_ref();
///
/// assert_eq!(tree.children_in("items").map(|c| c.read().len()), Some(2));
/// ```
pub struct Item {
    model: Value,
    value: Option<Value>,
    kind: ItemKind,
    equals: Option<EqualsFn>,
    state: RwLock<ItemState>,
    fields: RwLock<HashMap<String, ChildList>>,
    children: RwLock<Option<ChildList>>,
}

impl Item {
    /// Creates an item around a payload.
    pub fn new(model: Value) -> Self {
        Self {
            model,
            value: None,
            kind: ItemKind::Regular,
            equals: None,
            state: RwLock::new(ItemState::default()),
            fields: RwLock::new(HashMap::new()),
            children: RwLock::new(None),
        }
    }

    /// Creates an item whose payload is `{"displayName": text}`.
    pub fn labeled(text: impl Into<String>) -> Self {
        let mut model = serde_json::Map::new();
        model.insert(
            accessor::DEFAULT_TEXT_FIELD.to_string(),
            Value::String(text.into()),
        );
        Self::new(Value::Object(model))
    }

    pub(crate) fn group(model: Value, value: Value, children: Vec<ItemRef>) -> Self {
        let item = Self {
            value: Some(value),
            kind: ItemKind::Group,
            ..Self::new(model)
        };
        item.state.write().selectable = false;
        *item.children.write() = Some(child_list(children));
        item
    }

    /// Sets the explicit comparison value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Stores children under the default `"items"` field.
    pub fn with_children(self, children: Vec<ItemRef>) -> Self {
        self.with_children_in(DEFAULT_CHILDREN_FIELD, children)
    }

    /// Stores children under a named field.
    pub fn with_children_in(self, field: impl Into<String>, children: Vec<ItemRef>) -> Self {
        self.fields.write().insert(field.into(), child_list(children));
        self
    }

    /// Sets a custom equality predicate.
    ///
    /// The predicate runs while the owning view's state lock is held, for
    /// example when a reload reconciles the selection. It must not call back
    /// into the [`ItemListView`](crate::ItemListView).
    pub fn with_equals<F>(mut self, equals: F) -> Self
    where
        F: Fn(&Item, &Item) -> bool + Send + Sync + 'static,
    {
        self.equals = Some(Arc::new(equals));
        self
    }

    /// Sets the initial selection flag.
    pub fn with_selected(self, selected: bool) -> Self {
        self.state.write().selected = selected;
        self
    }

    /// Sets the initial visibility flag.
    pub fn with_visible(self, visible: bool) -> Self {
        self.state.write().visible = visible;
        self
    }

    /// Sets whether the item can be selected.
    pub fn with_selectable(self, selectable: bool) -> Self {
        self.state.write().selectable = selectable;
        self
    }

    /// Sets whether the item can be collapsed.
    pub fn with_collapsible(self, collapsible: bool) -> Self {
        self.state.write().collapsible = collapsible;
        self
    }

    /// Sets the initial collapse state.
    pub fn with_collapsed(self, collapsed: bool) -> Self {
        self.state.write().collapsed = collapsed;
        self
    }

    /// Wraps the item in a shared handle.
    pub fn into_ref(self) -> ItemRef {
        Arc::new(self)
    }

    /// The caller payload.
    pub fn model(&self) -> &Value {
        &self.model
    }

    /// The explicit comparison value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn is_group(&self) -> bool {
        self.kind == ItemKind::Group
    }

    pub(crate) fn equals_fn(&self) -> Option<&EqualsFn> {
        self.equals.as_ref()
    }

    /// A copy of the current flags.
    pub fn state(&self) -> ItemState {
        *self.state.read()
    }

    pub fn is_selected(&self) -> bool {
        self.state.read().selected
    }

    pub fn set_selected(&self, selected: bool) {
        self.state.write().selected = selected;
    }

    pub fn is_visible(&self) -> bool {
        self.state.read().visible
    }

    pub fn set_visible(&self, visible: bool) {
        self.state.write().visible = visible;
    }

    pub fn is_selectable(&self) -> bool {
        self.state.read().selectable
    }

    pub fn set_selectable(&self, selectable: bool) {
        self.state.write().selectable = selectable;
    }

    pub fn is_collapsible(&self) -> bool {
        self.state.read().collapsible
    }

    pub fn set_collapsible(&self, collapsible: bool) {
        self.state.write().collapsible = collapsible;
    }

    pub fn is_collapsed(&self) -> bool {
        self.state.read().collapsed
    }

    pub fn set_collapsed(&self, collapsed: bool) {
        self.state.write().collapsed = collapsed;
    }

    /// Depth assigned by the last flattening pass.
    pub fn depth(&self) -> Option<usize> {
        self.state.read().depth
    }

    pub(crate) fn set_depth(&self, depth: usize) {
        self.state.write().depth = Some(depth);
    }

    pub fn is_odd(&self) -> bool {
        self.state.read().odd
    }

    pub(crate) fn set_odd(&self, odd: bool) {
        self.state.write().odd = odd;
    }

    /// The children collection stored under `field`, if any.
    pub fn children_in(&self, field: &str) -> Option<ChildList> {
        self.fields.read().get(field).cloned()
    }

    /// Replaces the collection stored under `field`.
    ///
    /// Views pick the change up on their next normalization
    /// (`ItemListView::invalidate_cache`).
    pub fn set_children_in(&self, field: impl Into<String>, children: Vec<ItemRef>) {
        self.fields.write().insert(field.into(), child_list(children));
    }

    /// The resolved children handle. `Some` for nodes, `None` for leaves.
    pub fn children(&self) -> Option<ChildList> {
        self.children.read().clone()
    }

    /// A snapshot of the resolved children.
    pub fn child_items(&self) -> Option<Vec<ItemRef>> {
        self.children.read().as_ref().map(|list| list.read().clone())
    }

    /// Returns `true` if the item resolved to a node.
    pub fn has_children(&self) -> bool {
        self.children.read().is_some()
    }

    fn resolve_children(&self, field: &str) -> Option<ChildList> {
        let resolved = self.children_in(field);
        *self.children.write() = resolved.clone();
        resolved
    }
}

/// Resolves the children handle of every regular item from `field`,
/// recursively. Group nodes keep the children they were built with.
pub(crate) fn ensure_children(items: &[ItemRef], field: &str) {
    for item in items {
        if item.is_group() {
            continue;
        }
        if let Some(children) = item.resolve_children(field) {
            let snapshot = children.read().clone();
            ensure_children(&snapshot, field);
        }
    }
}

/// Depth-first search of `item` (by identity) starting at `list`.
///
/// Returns the containing list and the index inside it.
pub(crate) fn find_in_tree(item: &ItemRef, list: &ChildList) -> Option<(ChildList, usize)> {
    let snapshot = list.read().clone();
    for (index, candidate) in snapshot.iter().enumerate() {
        if Arc::ptr_eq(candidate, item) {
            return Some((Arc::clone(list), index));
        }
        if let Some(children) = candidate.children() {
            if let Some(found) = find_in_tree(item, &children) {
                return Some(found);
            }
        }
    }
    None
}

/// Visits every item reachable through resolved children, in pre-order.
pub(crate) fn walk_tree<F: FnMut(&ItemRef)>(items: &[ItemRef], visit: &mut F) {
    for item in items {
        visit(item);
        if let Some(children) = item.child_items() {
            walk_tree(&children, visit);
        }
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("model", &self.model)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("has_children", &self.has_children())
            .finish()
    }
}

impl TreeRow for Item {
    fn row_depth(&self) -> usize {
        self.depth().unwrap_or(0)
    }

    fn row_label(&self) -> String {
        accessor::item_text(self, None)
    }

    fn row_markers(&self) -> Vec<&'static str> {
        let state = self.state();
        let mut markers = Vec::new();
        if self.is_group() {
            markers.push("group");
        }
        if state.selected {
            markers.push("selected");
        }
        if state.collapsed {
            markers.push("collapsed");
        }
        if !state.visible {
            markers.push("hidden");
        }
        markers
    }
}
