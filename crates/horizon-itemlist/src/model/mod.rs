//! Item model and list view engine.
//!
//! This module turns a hierarchical item collection into the flat list of
//! rows a list widget renders, and keeps that list consistent with user
//! interaction: expanding and collapsing nodes, searching, selecting,
//! sorting, grouping and drag reordering.
//!
//! # Core Types
//!
//! - `Item` / `ItemRef`: a shared node with a JSON payload and view flags
//! - `FieldAccessor`: reads a field of an item (dotted path or function)
//! - `ItemListView`: owns the items and the derived caches
//!
//! # Passes
//!
//! - `grouping`: wraps items into synthetic group nodes
//! - `flatten`: pre-order walk assigning depths
//! - `visibility`: collapse rules and search filtering
//! - `sorting`: stable multi-field tree sort
//! - `drag`: live drag preview and commit
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │    Items    │────>│ ItemListView │────>│   Widget    │
//! │  (ItemRef)  │     │   (caches)   │     │ (renderer)  │
//! └─────────────┘     └──────────────┘     └─────────────┘
//!                            │  ▲
//!                    signals │  │ hooks
//!                            ▼  │
//!                     ┌──────────────┐
//!                     │    Caller    │
//!                     └──────────────┘
//! ```

pub mod accessor;
mod compare;
pub mod diacritics;
pub mod drag;
pub mod flatten;
pub mod grouping;
mod hooks;
mod item;
pub mod selection;
pub mod sorting;
mod view;
pub mod visibility;

pub use accessor::{DEFAULT_CHILDREN_FIELD, DEFAULT_TEXT_FIELD, FieldAccessor};
pub use compare::Comparator;
pub use drag::DragSession;
pub use grouping::GroupInfo;
pub use hooks::{Hooks, ItemHook, LoadHook};
pub use item::{ChildList, EqualsFn, Item, ItemKind, ItemRef, ItemState, child_list};
pub use selection::SelectionTracker;
pub use sorting::{SortInfos, SortItem, SortOrder};
pub use view::{CacheLayer, ItemListView, ItemMatch, ItemSource, ParentInfo, ViewList, ViewRequest};
pub use visibility::{Query, SearchMatcher};
