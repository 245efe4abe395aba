//! The item-list view.
//!
//! [`ItemListView`] owns an item collection and the derived caches a list
//! widget renders from:
//!
//! ```text
//! items ──group──▶ grouped ──flatten──▶ flat ──filter/collapse──▶ visible
//! ```
//!
//! Each layer is rebuilt lazily on the next [`ItemListView::get_view_list`]
//! after it was invalidated. Invalidating a layer drops the layers below it
//! and never the ones above: collapsing a node only drops `visible`, sorting
//! drops `flat` and `visible`, replacing the items drops everything.
//!
//! All methods take `&self`. The state sits behind a mutex that is never
//! held across an `.await`, so a view can be shared between tasks; when two
//! loads overlap, the one that resolves last wins.
//!
//! Callbacks that run during a cache rebuild, [`FieldAccessor::computed`]
//! fields and [`Item::with_equals`](crate::Item::with_equals) predicates,
//! are called with that mutex held and must not call back into the view.
//! Interceptor hooks run outside it.
//!
//! # Example
//!
//! ```
//! use horizon_itemlist::{Item, ItemListView, ViewRequest};
//!
//! # futures_util::FutureExt::now_or_never(async {
//! let view = ItemListView::new();
//! view.set_items_now(vec![
//!     Item::labeled("Apple").into_ref(),
//!     Item::labeled("Pear").into_ref(),
//! ]);
//!
//! let list = view.get_view_list(&ViewRequest::new().with_query("pe")).await.unwrap();
//! assert_eq!(list.visible_list.len(), 1);
//! # }).unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

use futures_util::stream::{BoxStream, Stream, StreamExt};
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use serde_json::Value;

use horizon_itemlist_core::logging::{span_names, targets};
use horizon_itemlist_core::{Deferred, FlatListDebug, PerfSpan, Property, Signal, TreeFormatOptions};

use super::accessor::{self, FieldAccessor};
use super::compare::Comparator;
use super::drag::{self, DragSession};
use super::flatten;
use super::grouping::{self, GroupInfo};
use super::hooks::{Hooks, intercept};
use super::item::{self, ChildList, ItemRef, child_list};
use super::selection::SelectionTracker;
use super::sorting::{self, SortInfos};
use super::visibility::{self, Query, SearchMatcher};
use crate::config::ListViewConfig;
use crate::error::{ItemListError, Result};

/// Where a view gets its items from.
pub enum ItemSource {
    /// No items.
    None,
    /// A literal collection.
    Items(Vec<ItemRef>),
    /// A collection resolved later. Cancellation yields an empty collection.
    Deferred(Deferred<Vec<ItemRef>>),
    /// Batches appended as they arrive. `None` clears to an empty collection.
    Stream(BoxStream<'static, Option<Vec<ItemRef>>>),
}

impl ItemSource {
    /// Wraps a stream of batches.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Option<Vec<ItemRef>>> + Send + 'static,
    {
        Self::Stream(stream.boxed())
    }
}

impl From<Vec<ItemRef>> for ItemSource {
    fn from(items: Vec<ItemRef>) -> Self {
        Self::Items(items)
    }
}

impl From<Deferred<Vec<ItemRef>>> for ItemSource {
    fn from(deferred: Deferred<Vec<ItemRef>>) -> Self {
        Self::Deferred(deferred)
    }
}

impl fmt::Debug for ItemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Items(items) => f.debug_tuple("Items").field(&items.len()).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Parameters of [`ItemListView::get_view_list`].
#[derive(Debug, Clone, Default)]
pub struct ViewRequest {
    /// Field searched by the query. Defaults to the view's search field.
    pub search_field: Option<FieldAccessor>,
    pub query: Option<Query>,
    /// Reload even if the query did not change.
    pub force_refresh: bool,
    /// Row where a drag started.
    pub drag_start: Option<usize>,
    /// Row currently hovered by the drag.
    pub drag_target: Option<usize>,
    /// Keep the selection set as is instead of rebuilding it from flags.
    pub multi_select: bool,
}

impl ViewRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<Query>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_search_field(mut self, field: impl Into<FieldAccessor>) -> Self {
        self.search_field = Some(field.into());
        self
    }

    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    pub fn with_drag(mut self, start: usize, target: usize) -> Self {
        self.drag_start = Some(start);
        self.drag_target = Some(target);
        self
    }

    pub fn multi_select(mut self, multi_select: bool) -> Self {
        self.multi_select = multi_select;
        self
    }
}

/// Result of [`ItemListView::get_view_list`].
#[derive(Debug, Clone)]
pub struct ViewList {
    /// The rows to render (the drag preview while dragging).
    pub visible_list: Arc<Vec<ItemRef>>,
    pub depth_max: usize,
}

/// A row found by [`ItemListView::find_next_match`].
#[derive(Debug, Clone)]
pub struct ItemMatch {
    pub index: usize,
    pub item: ItemRef,
}

/// Position of an item among its siblings.
#[derive(Debug, Clone)]
pub struct ParentInfo {
    /// The parent node, `None` for roots.
    pub parent: Option<ItemRef>,
    /// Index in the parent's children (or among the roots).
    pub index: usize,
}

/// A cache layer, reported by [`ItemListView::cache_changed`] when dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLayer {
    /// Everything, starting from the grouped list.
    Grouped,
    /// The flat and visible lists.
    Flat,
    /// The visible list only.
    Visible,
}

#[derive(Default)]
struct ViewCache {
    grouped: Option<ChildList>,
    flat: Option<Arc<Vec<ItemRef>>>,
    visible: Option<Arc<Vec<ItemRef>>>,
    rows_count: usize,
    depth_max: usize,
}

struct ViewState {
    items: Option<ChildList>,
    cache: ViewCache,
    selection: SelectionTracker,
    last_query: Option<Query>,
    internal_query: Option<Regex>,
    group_infos: Vec<GroupInfo>,
    drag: Option<DragSession>,
    children_field: String,
    comparator: Comparator,
    text_field: Option<FieldAccessor>,
    search_field: Option<FieldAccessor>,
    hide_selected: bool,
    expand_tree_on_search: bool,
    pending: Vec<CacheLayer>,
}

impl ViewState {
    fn new(config: &ListViewConfig) -> Self {
        let mut state = Self {
            items: None,
            cache: ViewCache::default(),
            selection: SelectionTracker::new(),
            last_query: None,
            internal_query: None,
            group_infos: Vec::new(),
            drag: None,
            children_field: String::new(),
            comparator: Comparator::default(),
            text_field: None,
            search_field: None,
            hide_selected: false,
            expand_tree_on_search: true,
            pending: Vec::new(),
        };
        state.apply(config);
        state.pending.clear();
        state
    }

    fn apply(&mut self, config: &ListViewConfig) {
        self.children_field = if config.children_field.is_empty() {
            accessor::DEFAULT_CHILDREN_FIELD.to_string()
        } else {
            config.children_field.clone()
        };
        self.comparator = Comparator::new(config.value_field.as_deref().map(FieldAccessor::path));
        self.text_field = config.text_field.as_deref().map(FieldAccessor::path);
        self.search_field = config.search_field.as_deref().map(FieldAccessor::path);
        self.hide_selected = config.hide_selected;
        self.expand_tree_on_search = config.expand_tree_on_search;
        self.group_infos = config.group_infos.clone();
        self.invalidate_all();
    }

    fn roots(&self) -> Vec<ItemRef> {
        self.items
            .as_ref()
            .map(|items| items.read().clone())
            .unwrap_or_default()
    }

    fn grouped_roots(&self) -> Vec<ItemRef> {
        self.cache
            .grouped
            .as_ref()
            .map(|grouped| grouped.read().clone())
            .unwrap_or_default()
    }

    fn has_items(&self) -> bool {
        self.items.as_ref().is_some_and(|items| !items.read().is_empty())
    }

    /// Drops every layer and re-resolves children.
    fn invalidate_all(&mut self) {
        item::ensure_children(&self.roots(), &self.children_field);
        self.cache = ViewCache::default();
        self.pending.push(CacheLayer::Grouped);
    }

    fn invalidate_view(&mut self) {
        self.cache.flat = None;
        self.cache.visible = None;
        self.cache.depth_max = 0;
        self.cache.rows_count = 0;
        self.pending.push(CacheLayer::Flat);
    }

    fn invalidate_visible(&mut self) {
        self.cache.visible = None;
        self.cache.rows_count = 0;
        self.pending.push(CacheLayer::Visible);
    }

    fn ensure_grouped(&mut self) {
        if self.cache.grouped.is_some() {
            return;
        }
        let _span = PerfSpan::new(span_names::GROUPED);
        let grouped = match &self.items {
            Some(items) if !self.group_infos.is_empty() => {
                child_list(grouping::group_items(&items.read(), &self.group_infos))
            }
            Some(items) => Arc::clone(items),
            None => child_list(Vec::new()),
        };
        tracing::trace!(target: targets::CACHE, roots = grouped.read().len(), "grouped list rebuilt");
        self.cache.grouped = Some(grouped);
    }

    /// Rebuilds the flat layer if needed. Returns the unfiltered visible
    /// list computed along the way when `filtered` is false.
    fn ensure_flat(&mut self, filtered: bool, multi_select: bool) -> Option<Vec<ItemRef>> {
        if self.cache.flat.is_some() {
            return None;
        }
        self.ensure_grouped();

        let _span = PerfSpan::new(span_names::FLATTEN);
        let result = flatten::flatten(&self.grouped_roots(), self.hide_selected);
        if !multi_select {
            self.selection.replace(result.selected);
        }
        tracing::debug!(
            target: targets::CACHE,
            rows = result.flat.len(),
            depth_max = result.depth_max,
            "flat list rebuilt"
        );
        self.cache.depth_max = result.depth_max;
        self.cache.flat = Some(Arc::new(result.flat));
        (!filtered).then_some(result.visible)
    }

    fn ensure_visible(
        &mut self,
        search_field: Option<&FieldAccessor>,
        expand_tree: bool,
        multi_select: bool,
    ) -> Arc<Vec<ItemRef>> {
        if let Some(visible) = &self.cache.visible {
            return Arc::clone(visible);
        }

        let regex = self.internal_query.clone();
        let prebuilt = self.ensure_flat(regex.is_some(), multi_select);
        let visible = match (prebuilt, regex) {
            (Some(visible), None) => visible,
            (_, regex) => {
                let _span = PerfSpan::new(span_names::VISIBLE);
                let roots = self.grouped_roots();
                let result = match regex {
                    Some(regex) => {
                        let field = search_field
                            .or(self.search_field.as_ref())
                            .or(self.text_field.as_ref());
                        visibility::visible_filtered(
                            &roots,
                            SearchMatcher::new(&regex, field),
                            self.hide_selected,
                            expand_tree,
                        )
                    }
                    None => visibility::visible_unfiltered(&roots, self.hide_selected),
                };
                if !multi_select {
                    self.selection.replace(result.selected);
                }
                result.visible
            }
        };

        tracing::debug!(target: targets::CACHE, rows = visible.len(), "visible list rebuilt");
        let visible = Arc::new(visible);
        self.cache.rows_count = visible.len();
        self.cache.visible = Some(Arc::clone(&visible));
        visible
    }

    fn view_list(&mut self, drag_start: Option<usize>, drag_target: Option<usize>) -> Result<ViewList> {
        let visible = self.cache.visible.clone().unwrap_or_default();
        let depth_max = self.cache.depth_max;

        match (drag_start, drag_target) {
            (Some(start), Some(target)) if start != target => {
                let _span = PerfSpan::new(span_names::DRAG);
                let session = match self.drag.take() {
                    Some(session) => session,
                    None => DragSession::start(&visible, start).ok_or(ItemListError::InvalidDragInfo)?,
                };
                let session = self.drag.insert(session);
                session.move_to(target);
                tracing::trace!(
                    target: targets::DRAG,
                    start,
                    hovered = target,
                    current = session.current_index(),
                    "drag preview"
                );
                Ok(ViewList {
                    visible_list: Arc::new(session.list().to_vec()),
                    depth_max,
                })
            }
            _ => {
                self.drag = None;
                Ok(ViewList {
                    visible_list: visible,
                    depth_max,
                })
            }
        }
    }

    fn visible(&self, operation: &'static str) -> Result<Arc<Vec<ItemRef>>> {
        self.cache
            .visible
            .clone()
            .filter(|visible| !visible.is_empty())
            .ok_or(ItemListError::EmptyCache(operation))
    }
}

/// A hierarchical list view over a shared item collection.
pub struct ItemListView {
    state: Mutex<ViewState>,
    hooks: RwLock<Hooks>,
    loading: Property<bool>,
    cache_changed: Signal<CacheLayer>,
}

impl Default for ItemListView {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemListView {
    /// Creates an empty view with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ListViewConfig::default())
    }

    /// Creates an empty view.
    pub fn with_config(config: ListViewConfig) -> Self {
        Self {
            state: Mutex::new(ViewState::new(&config)),
            hooks: RwLock::new(Hooks::default()),
            loading: Property::new(false),
            cache_changed: Signal::new(),
        }
    }

    /// Runs `f` on the locked state, then reports dropped cache layers once
    /// the lock is released.
    fn with_state<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        let (result, pending) = {
            let mut state = self.state.lock();
            let result = f(&mut state);
            (result, std::mem::take(&mut state.pending))
        };
        for layer in pending {
            self.cache_changed.emit(layer);
        }
        result
    }

    /// Applies a configuration. Every cache is dropped.
    pub fn apply_config(&self, config: &ListViewConfig) {
        self.with_state(|st| st.apply(config));
    }

    // =========================================================================
    // Hooks and notifications
    // =========================================================================

    /// Installs the hook consulted before each reload.
    pub fn set_before_load<F>(&self, hook: F)
    where
        F: Fn(Option<Query>, Vec<ItemRef>) -> Deferred<Vec<ItemRef>> + Send + Sync + 'static,
    {
        self.hooks.write().before_load = Some(Arc::new(hook));
    }

    pub fn set_before_select<F>(&self, hook: F)
    where
        F: Fn(ItemRef) -> Deferred<ItemRef> + Send + Sync + 'static,
    {
        self.hooks.write().before_select = Some(Arc::new(hook));
    }

    pub fn set_before_unselect<F>(&self, hook: F)
    where
        F: Fn(ItemRef) -> Deferred<ItemRef> + Send + Sync + 'static,
    {
        self.hooks.write().before_unselect = Some(Arc::new(hook));
    }

    pub fn set_before_expand<F>(&self, hook: F)
    where
        F: Fn(ItemRef) -> Deferred<ItemRef> + Send + Sync + 'static,
    {
        self.hooks.write().before_expand = Some(Arc::new(hook));
    }

    pub fn set_before_collapse<F>(&self, hook: F)
    where
        F: Fn(ItemRef) -> Deferred<ItemRef> + Send + Sync + 'static,
    {
        self.hooks.write().before_collapse = Some(Arc::new(hook));
    }

    /// Removes every hook.
    pub fn clear_hooks(&self) {
        *self.hooks.write() = Hooks::default();
    }

    /// The loading indicator.
    pub fn loading(&self) -> &Property<bool> {
        &self.loading
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    /// Emitted with the new value whenever the loading indicator changes.
    pub fn loading_changed(&self) -> &Signal<bool> {
        self.loading.changed()
    }

    /// Emitted after a cache layer was dropped.
    pub fn cache_changed(&self) -> &Signal<CacheLayer> {
        &self.cache_changed
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Replaces the item collection.
    ///
    /// Literal collections apply immediately. Deferred and streamed sources
    /// clear the items and raise the loading indicator until the first
    /// answer; streamed batches are appended as they arrive.
    #[tracing::instrument(name = "set_items", skip_all, level = "debug")]
    pub async fn set_items(&self, source: ItemSource) {
        match source {
            ItemSource::None => {
                self.with_state(|st| {
                    st.items = None;
                    st.invalidate_all();
                });
                self.loading.set(false);
            }
            ItemSource::Items(items) => self.set_items_now(items),
            ItemSource::Deferred(deferred) => {
                self.begin_load();
                let loaded = deferred.await;
                self.append_items(Some(loaded.unwrap_or_default()));
            }
            ItemSource::Stream(mut stream) => {
                self.begin_load();
                let mut batches = 0usize;
                while let Some(batch) = stream.next().await {
                    batches += 1;
                    self.append_items(batch);
                }
                tracing::debug!(target: targets::LOAD, batches, "item stream completed");
                if batches == 0 {
                    self.loading.set(false);
                }
            }
        }
    }

    /// Replaces the item collection with a literal one.
    pub fn set_items_now(&self, items: Vec<ItemRef>) {
        self.with_state(|st| {
            st.items = Some(child_list(items));
            st.invalidate_all();
            let roots = st.roots();
            st.selection.reconcile(Some(roots.as_slice()), &st.comparator);
        });
        self.loading.set(false);
    }

    fn begin_load(&self) {
        self.with_state(|st| {
            st.items = None;
            st.invalidate_all();
        });
        self.loading.set(true);
    }

    fn append_items(&self, batch: Option<Vec<ItemRef>>) {
        self.with_state(|st| {
            match batch {
                Some(batch) => {
                    tracing::debug!(target: targets::LOAD, count = batch.len(), "items received");
                    if let Some(items) = &st.items {
                        items.write().extend(batch.iter().cloned());
                    } else {
                        st.items = Some(child_list(batch.clone()));
                    }
                    st.invalidate_all();
                    st.selection.reconcile(Some(batch.as_slice()), &st.comparator);
                }
                None => {
                    st.items = Some(child_list(Vec::new()));
                    st.invalidate_all();
                }
            }
        });
        self.loading.set(false);
    }

    /// A snapshot of the root items, `None` when no collection is set.
    pub fn items(&self) -> Option<Vec<ItemRef>> {
        self.with_state(|st| st.items.as_ref().map(|items| items.read().clone()))
    }

    /// The shared root list. Mutating it requires [`invalidate_cache`].
    ///
    /// [`invalidate_cache`]: Self::invalidate_cache
    pub fn root_list(&self) -> Option<ChildList> {
        self.with_state(|st| st.items.clone())
    }

    /// Drops every cache and re-resolves children.
    pub fn invalidate_cache(&self) {
        self.with_state(ViewState::invalidate_all);
    }

    /// Returns `true` once a visible list has been built.
    pub fn has_cache(&self) -> bool {
        self.with_state(|st| st.cache.visible.is_some())
    }

    pub fn flat_list(&self) -> Option<Arc<Vec<ItemRef>>> {
        self.with_state(|st| st.cache.flat.clone())
    }

    pub fn visible_list(&self) -> Option<Arc<Vec<ItemRef>>> {
        self.with_state(|st| st.cache.visible.clone())
    }

    pub fn rows_count(&self) -> usize {
        self.with_state(|st| st.cache.rows_count)
    }

    pub fn depth_max(&self) -> usize {
        self.with_state(|st| st.cache.depth_max)
    }

    /// The visible row at `index`.
    pub fn item_at(&self, index: usize) -> Option<ItemRef> {
        self.with_state(|st| st.cache.visible.as_ref().and_then(|v| v.get(index).cloned()))
    }

    /// The visible row index of `item`.
    pub fn index_of(&self, item: &ItemRef) -> Option<usize> {
        self.with_state(|st| {
            st.cache
                .visible
                .as_ref()
                .and_then(|v| v.iter().position(|row| Arc::ptr_eq(row, item)))
        })
    }

    pub fn last_query(&self) -> Option<Query> {
        self.with_state(|st| st.last_query.clone())
    }

    // =========================================================================
    // Fields
    // =========================================================================

    pub fn children_field(&self) -> String {
        self.with_state(|st| st.children_field.clone())
    }

    /// Changes the children field. An empty name restores `"items"`. Every
    /// cache is dropped.
    pub fn set_children_field(&self, field: impl Into<String>) {
        let field = field.into();
        self.with_state(|st| {
            st.children_field = if field.is_empty() {
                accessor::DEFAULT_CHILDREN_FIELD.to_string()
            } else {
                field
            };
            st.invalidate_all();
        });
    }

    pub fn hide_selected(&self) -> bool {
        self.with_state(|st| st.hide_selected)
    }

    /// Changes whether selected rows are hidden. The flat and visible lists
    /// are dropped.
    pub fn set_hide_selected(&self, hide_selected: bool) {
        self.with_state(|st| {
            if st.hide_selected != hide_selected {
                st.hide_selected = hide_selected;
                st.invalidate_view();
            }
        });
    }

    pub fn value_field(&self) -> Option<FieldAccessor> {
        self.with_state(|st| st.comparator.value_field().cloned())
    }

    pub fn set_value_field(&self, field: Option<FieldAccessor>) {
        self.with_state(|st| st.comparator = Comparator::new(field));
    }

    pub fn text_field(&self) -> Option<FieldAccessor> {
        self.with_state(|st| st.text_field.clone())
    }

    pub fn set_text_field(&self, field: Option<FieldAccessor>) {
        self.with_state(|st| {
            st.text_field = field;
            st.invalidate_visible();
        });
    }

    /// Display text of `item` through the view's text field.
    pub fn item_text(&self, item: &ItemRef) -> String {
        let field = self.text_field();
        accessor::item_text(item, field.as_ref())
    }

    /// Comparison value of `item` through the view's value field.
    pub fn item_value(&self, item: &ItemRef) -> Option<Value> {
        let field = self.value_field();
        accessor::item_value(item, field.as_ref())
    }

    /// Returns `true` if both items denote the same logical item.
    pub fn compare_items(&self, a: &ItemRef, b: &ItemRef) -> bool {
        let comparator = self.with_state(|st| st.comparator.clone());
        comparator.equals(a, b)
    }

    // =========================================================================
    // View list
    // =========================================================================

    /// Computes the rows to render.
    ///
    /// The collection is reloaded (through the before-load hook, if any)
    /// when the query changed, when there are no items or when the request
    /// forces it. A collection returned by the hook is taken as already
    /// filtered. While a drag is in progress the reordered preview is
    /// returned instead of the visible list.
    #[tracing::instrument(name = "view_list", skip_all, level = "debug")]
    pub async fn get_view_list(&self, request: &ViewRequest) -> Result<ViewList> {
        let (reload, query_changed) = self.with_state(|st| {
            let query_changed =
                st.last_query.as_ref().map(Query::as_key) != request.query.as_ref().map(Query::as_key);
            let no_items = !st.has_items();
            st.last_query = request.query.clone();
            if query_changed || no_items {
                st.internal_query = request.query.as_ref().and_then(Query::to_regex);
            }
            (request.force_refresh || query_changed || no_items, query_changed)
        });

        if reload {
            self.loading.set(true);
            let hook = self.hooks.read().before_load.clone();
            let loaded = match hook {
                Some(hook) => {
                    let selected = self.selected_items();
                    hook(request.query.clone(), selected).await
                }
                None => None,
            };
            let has_items = self.with_state(|st| {
                if let Some(items) = loaded {
                    tracing::debug!(target: targets::LOAD, count = items.len(), "items loaded");
                    st.items = Some(child_list(items));
                    st.internal_query = None;
                    st.invalidate_all();
                    let roots = st.roots();
                    st.selection.reconcile(Some(roots.as_slice()), &st.comparator);
                }
                st.invalidate_visible();
                st.items.is_some()
            });
            self.loading.set(!has_items);
        }

        self.with_state(|st| {
            let _span = PerfSpan::new(span_names::VIEW_LIST);
            let expand_tree = query_changed && st.expand_tree_on_search;
            st.ensure_visible(request.search_field.as_ref(), expand_tree, request.multi_select);
            st.view_list(request.drag_start, request.drag_target)
        })
    }

    /// Renders the visible list as an indented tree, for debugging.
    pub fn format_visible(&self, options: TreeFormatOptions) -> String {
        let visible = self.visible_list().unwrap_or_default();
        FlatListDebug::with_options(options).format(visible.as_slice())
    }

    // =========================================================================
    // Drag and drop
    // =========================================================================

    /// Snaps a hovered row index to a valid drop position for the drag
    /// started at `start`.
    pub fn compute_drag_target_index(&self, start: usize, target: usize) -> Result<usize> {
        self.with_state(|st| {
            let (list, start) = match &st.drag {
                Some(session) => (session.list().to_vec(), session.current_index()),
                None => {
                    let visible = st
                        .cache
                        .visible
                        .clone()
                        .ok_or(ItemListError::EmptyCache("compute_drag_target_index"))?;
                    (visible.to_vec(), start)
                }
            };
            Ok(drag::constrain_target_index(&list, start, target))
        })
    }

    /// Applies the drag preview to the items.
    ///
    /// Returns `Ok(false)` when no drag is in progress, there are no items,
    /// or the drop cannot be applied to the items (dragging a group node).
    #[tracing::instrument(name = "commit_drag", skip_all, level = "debug")]
    pub fn commit_drag(&self) -> Result<bool> {
        self.with_state(|st| {
            let (Some(items), Some(session)) = (st.items.clone(), st.drag.take()) else {
                return Ok(false);
            };
            let flat = st.cache.flat.clone().unwrap_or_default();
            let moved = drag::commit(&items, &flat, &session)?;
            if moved {
                st.invalidate_all();
            }
            Ok(moved)
        })
    }

    /// Drops the drag preview without touching the items.
    pub fn cancel_drag(&self) {
        self.with_state(|st| st.drag = None);
    }

    /// Returns `true` while a drag preview is active.
    pub fn is_dragging(&self) -> bool {
        self.with_state(|st| st.drag.is_some())
    }

    // =========================================================================
    // Collapse
    // =========================================================================

    /// Expands `item` unless the before-expand hook vetoes.
    pub async fn expand_item(&self, item: ItemRef) -> Option<ItemRef> {
        let hook = self.hooks.read().before_expand.clone();
        let item = intercept(hook, item).await?;
        item.set_collapsed(false);
        self.with_state(ViewState::invalidate_visible);
        Some(item)
    }

    /// Collapses `item` unless the before-collapse hook vetoes.
    pub async fn collapse_item(&self, item: ItemRef) -> Option<ItemRef> {
        let hook = self.hooks.read().before_collapse.clone();
        let item = intercept(hook, item).await?;
        item.set_collapsed(true);
        self.with_state(ViewState::invalidate_visible);
        Some(item)
    }

    /// Expands each item in turn. Returns the expanded ones.
    pub async fn expand_items(&self, items: Vec<ItemRef>) -> Vec<ItemRef> {
        let mut expanded = Vec::with_capacity(items.len());
        for item in items {
            if let Some(item) = self.expand_item(item).await {
                expanded.push(item);
            }
        }
        expanded
    }

    /// Collapses each item in turn. Returns the collapsed ones.
    pub async fn collapse_items(&self, items: Vec<ItemRef>) -> Vec<ItemRef> {
        let mut collapsed = Vec::with_capacity(items.len());
        for item in items {
            if let Some(item) = self.collapse_item(item).await {
                collapsed.push(item);
            }
        }
        collapsed
    }

    /// Toggles (or forces, with `collapse`) the collapse state of the visible
    /// row at `index`.
    pub async fn toggle_collapse(&self, index: usize, collapse: Option<bool>) -> Result<Option<ItemRef>> {
        let item = self.with_state(|st| {
            let visible = st.visible("toggle_collapse")?;
            visible.get(index).cloned().ok_or(ItemListError::ItemNotFound)
        })?;
        let collapse = collapse.unwrap_or(!item.is_collapsed());
        Ok(if collapse {
            self.collapse_item(item).await
        } else {
            self.expand_item(item).await
        })
    }

    /// Collapses or expands every collapsible node.
    pub async fn toggle_all(&self, collapsed: bool) -> Result<Vec<ItemRef>> {
        let nodes: Vec<ItemRef> = self.with_state(|st| {
            let flat = st
                .cache
                .flat
                .clone()
                .ok_or(ItemListError::EmptyCache("toggle_all"))?;
            st.invalidate_visible();
            Ok::<_, ItemListError>(
                flat.iter()
                    .filter(|item| item.has_children() && item.is_collapsible())
                    .cloned()
                    .collect(),
            )
        })?;
        Ok(if collapsed {
            self.collapse_items(nodes).await
        } else {
            self.expand_items(nodes).await
        })
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// The selected items, in selection order.
    pub fn selected_items(&self) -> Vec<ItemRef> {
        self.with_state(|st| st.selection.items().to_vec())
    }

    /// Selects `item` unless the before-select hook vetoes.
    pub async fn select_item(&self, item: ItemRef) -> Option<ItemRef> {
        let hook = self.hooks.read().before_select.clone();
        let item = intercept(hook, item).await?;
        self.with_state(|st| {
            st.selection.add(&item);
            if st.hide_selected {
                st.invalidate_visible();
            }
        });
        tracing::trace!(target: targets::SELECTION, "item selected");
        Some(item)
    }

    /// Unselects `item` unless the before-unselect hook vetoes.
    pub async fn unselect_item(&self, item: ItemRef) -> Option<ItemRef> {
        let hook = self.hooks.read().before_unselect.clone();
        let item = intercept(hook, item).await?;
        self.with_state(|st| {
            st.selection.remove(&item, &st.comparator);
            if st.hide_selected {
                st.invalidate_visible();
            }
        });
        tracing::trace!(target: targets::SELECTION, "item unselected");
        Some(item)
    }

    /// Selects each item in turn. Returns the selected ones.
    pub async fn select_items(&self, items: Vec<ItemRef>) -> Vec<ItemRef> {
        let mut selected = Vec::with_capacity(items.len());
        for item in items {
            if let Some(item) = self.select_item(item).await {
                selected.push(item);
            }
        }
        selected
    }

    /// Unselects each selected item in turn. Returns the unselected ones.
    pub async fn unselect_items(&self, items: Vec<ItemRef>) -> Vec<ItemRef> {
        let mut unselected = Vec::with_capacity(items.len());
        for item in items.into_iter().filter(|item| item.is_selected()) {
            if let Some(item) = self.unselect_item(item).await {
                unselected.push(item);
            }
        }
        unselected
    }

    /// Selects or unselects `items`. Returns the resulting selection.
    pub async fn toggle_select(&self, items: Vec<ItemRef>, selected: bool) -> Vec<ItemRef> {
        if selected {
            self.select_items(items).await;
        } else {
            self.unselect_items(items).await;
        }
        self.selected_items()
    }

    /// Unselects everything. Items whose unselection is vetoed stay selected.
    pub async fn unselect_all(&self) -> Vec<ItemRef> {
        let previous = self.with_state(|st| {
            if st.hide_selected {
                st.invalidate_visible();
            }
            st.selection.take()
        });

        let mut unselected = Vec::with_capacity(previous.len());
        for item in previous {
            if !item.is_selected() {
                continue;
            }
            match self.unselect_item(item.clone()).await {
                Some(done) => unselected.push(done),
                None => self.with_state(|st| st.selection.add(&item)),
            }
        }
        unselected
    }

    /// Replaces the selection with the visible rows between `from` and `to`
    /// (inclusive, either order; `to` defaults to `from`). Non-selectable
    /// rows are skipped. Returns the number of selected rows.
    pub async fn select_range(&self, from: usize, to: Option<usize>) -> Result<usize> {
        let visible = self.with_state(|st| st.visible("select_range"))?;
        self.unselect_all().await;

        let to = to.unwrap_or(from);
        let (low, high) = (from.min(to), from.max(to).min(visible.len() - 1));
        let range: Vec<ItemRef> = visible
            .get(low..=high)
            .unwrap_or_default()
            .iter()
            .filter(|item| item.is_selectable())
            .cloned()
            .collect();

        Ok(self.select_items(range).await.len())
    }

    /// Replaces the selection with `items`, then reconciles it against the
    /// current collection.
    pub fn set_selected_items(&self, items: Vec<ItemRef>) {
        self.with_state(|st| {
            let roots = st.items.as_ref().map(|items| items.read().clone());
            st.selection.set(items, roots.as_deref(), &st.comparator);
            if st.hide_selected {
                st.invalidate_view();
            }
        });
    }

    /// Reconciles the selection against the current collection and returns
    /// it.
    pub fn ensure_selection(&self) -> Vec<ItemRef> {
        self.with_state(|st| {
            let roots = st.items.as_ref().map(|items| items.read().clone());
            st.selection.reconcile(roots.as_deref(), &st.comparator);
            st.selection.items().to_vec()
        })
    }

    // =========================================================================
    // Search and structure
    // =========================================================================

    /// Finds the next visible row satisfying `predicate`, searching after
    /// `start` and wrapping around (from the top when `start` is `None`).
    /// The `start` row itself is never reported.
    pub fn find_next_match<F>(&self, predicate: F, start: Option<usize>) -> Result<Option<ItemMatch>>
    where
        F: Fn(&ItemRef, usize) -> bool,
    {
        let visible = self.with_state(|st| st.visible("find_next_match"))?;
        let len = visible.len();
        let order: Box<dyn Iterator<Item = usize>> = match start {
            Some(start) if start < len => Box::new((start + 1..len).chain(0..start)),
            _ => Box::new(0..len),
        };
        Ok(order
            .into_iter()
            .find(|&index| predicate(&visible[index], index))
            .map(|index| ItemMatch {
                index,
                item: visible[index].clone(),
            }))
    }

    /// Sorts the (grouped) collection in place. The flat and visible lists
    /// are dropped.
    #[tracing::instrument(name = "sort", skip_all, level = "debug")]
    pub fn sort(&self, infos: &SortInfos) -> Result<()> {
        self.with_state(|st| {
            if st.items.is_none() {
                return Err(ItemListError::NoItems);
            }
            st.ensure_grouped();
            if let Some(grouped) = &st.cache.grouped {
                sorting::sort_tree(grouped, infos);
            }
            st.invalidate_view();
            Ok(())
        })
    }

    /// Groups the collection, one level per entry. Every cache is dropped.
    pub fn group(&self, infos: Vec<GroupInfo>) {
        self.with_state(|st| {
            st.group_infos = infos;
            st.invalidate_all();
        });
    }

    /// Removes the grouping level on `info.group_by_field`.
    pub fn ungroup(&self, info: &GroupInfo) {
        self.with_state(|st| {
            st.group_infos.retain(|g| g.group_by_field != info.group_by_field);
            st.invalidate_all();
        });
    }

    pub fn group_infos(&self) -> Vec<GroupInfo> {
        self.with_state(|st| st.group_infos.clone())
    }

    /// Locates `item` among its siblings.
    pub fn get_parent_info(&self, item: &ItemRef, multi_select: bool) -> Result<ParentInfo> {
        self.with_state(|st| {
            st.ensure_flat(true, multi_select);
            let flat = st.cache.flat.clone().unwrap_or_default();
            let position = flat
                .iter()
                .position(|row| Arc::ptr_eq(row, item))
                .ok_or(ItemListError::ItemNotFound)?;
            let depth = item.depth().unwrap_or(0);

            let parent = flat[..position]
                .iter()
                .rev()
                .find(|row| row.depth().is_some_and(|d| d < depth))
                .cloned();
            let siblings = match &parent {
                Some(parent) => parent.child_items().unwrap_or_default(),
                None => st.grouped_roots(),
            };
            let index = siblings
                .iter()
                .position(|sibling| Arc::ptr_eq(sibling, item))
                .ok_or(ItemListError::ItemNotFound)?;
            Ok(ParentInfo { parent, index })
        })
    }
}

impl fmt::Debug for ItemListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ItemListView")
            .field("items", &state.items.as_ref().map(|items| items.read().len()))
            .field("rows_count", &state.cache.rows_count)
            .field("selected", &state.selection.len())
            .field("group_infos", &state.group_infos)
            .field("hooks", &*self.hooks.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::Item;

    fn state_with(labels: &[&str]) -> ViewState {
        let mut state = ViewState::new(&ListViewConfig::default());
        state.items = Some(child_list(
            labels.iter().map(|l| Item::labeled(*l).into_ref()).collect(),
        ));
        state.invalidate_all();
        state.pending.clear();
        state
    }

    #[test]
    fn test_layers_rebuild_top_down() {
        let mut state = state_with(&["a", "b"]);
        let visible = state.ensure_visible(None, false, false);

        assert_eq!(visible.len(), 2);
        assert!(state.cache.grouped.is_some());
        assert_eq!(state.cache.flat.as_ref().map(|f| f.len()), Some(2));
        assert_eq!(state.cache.rows_count, 2);

        // A valid layer is returned as is.
        let again = state.ensure_visible(None, false, false);
        assert!(Arc::ptr_eq(&visible, &again));
    }

    #[test]
    fn test_invalidation_keeps_upper_layers() {
        let mut state = state_with(&["a"]);
        state.ensure_visible(None, false, false);
        let flat = state.cache.flat.clone();

        state.invalidate_visible();
        assert!(state.cache.visible.is_none());
        assert!(state.cache.flat.is_some());

        state.invalidate_view();
        assert!(state.cache.flat.is_none());
        assert!(state.cache.grouped.is_some());
        assert!(flat.is_some());

        assert_eq!(state.pending, vec![CacheLayer::Visible, CacheLayer::Flat]);
    }

    #[test]
    fn test_ungrouped_list_is_the_root_list() {
        let mut state = state_with(&["a"]);
        state.ensure_grouped();
        let (Some(items), Some(grouped)) = (&state.items, &state.cache.grouped) else {
            panic!("layers not built");
        };
        assert!(Arc::ptr_eq(items, grouped));
    }

    #[test]
    fn test_visible_requires_rows() {
        let mut state = state_with(&[]);
        assert_eq!(
            state.visible("op").unwrap_err(),
            ItemListError::EmptyCache("op")
        );
        state.ensure_visible(None, false, false);
        assert!(state.visible("op").is_err());
    }

    #[test]
    fn test_cache_changed_emitted_after_unlock() {
        let view = Arc::new(ItemListView::new());
        let observer = Arc::clone(&view);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        view.cache_changed().connect(move |layer| {
            // Re-entering the view from a slot must not deadlock.
            let _ = observer.rows_count();
            seen_clone.lock().push(*layer);
        });

        view.set_items_now(vec![Item::labeled("a").into_ref()]);
        view.set_hide_selected(true);
        assert_eq!(*seen.lock(), vec![CacheLayer::Grouped, CacheLayer::Flat]);
    }

    #[test]
    fn test_request_builder() {
        let request = ViewRequest::new()
            .with_query("x")
            .with_drag(2, 0)
            .multi_select(true)
            .force_refresh();
        assert_eq!(request.query.as_ref().map(Query::as_key), Some("x"));
        assert_eq!((request.drag_start, request.drag_target), (Some(2), Some(0)));
        assert!(request.multi_select && request.force_refresh);
        assert_eq!(format!("{:?}", ItemSource::from(Vec::new())), "Items(0)");
    }
}
