//! Horizon Item List - a hierarchical list view engine.
//!
//! Give an [`ItemListView`] a tree of items and ask it for the rows to
//! render. The view flattens the tree, honors collapsed nodes, filters on a
//! search query (case- and accent-insensitive), tracks the selection,
//! sorts, groups and previews drag reordering, caching each step until
//! something invalidates it.
//!
//! # Example
//!
//! ```
//! use horizon_itemlist::prelude::*;
//!
//! # futures_util::FutureExt::now_or_never(async {
//! let view = ItemListView::new();
//! let fruits = Item::labeled("Fruits")
//!     .with_children(vec![Item::labeled("Apple").into_ref(), Item::labeled("Pear").into_ref()])
//!     .into_ref();
//! view.set_items_now(vec![fruits.clone(), Item::labeled("Bread").into_ref()]);
//!
//! let list = view.get_view_list(&ViewRequest::new()).await.unwrap();
//! assert_eq!(list.visible_list.len(), 4);
//! assert_eq!(list.depth_max, 1);
//!
//! view.collapse_item(fruits).await;
//! let list = view.get_view_list(&ViewRequest::new()).await.unwrap();
//! assert_eq!(list.visible_list.len(), 2);
//! # }).unwrap();
//! ```

pub use horizon_itemlist_core::*;

mod config;
mod error;
pub mod model;
pub mod prelude;

pub use config::ListViewConfig;
pub use error::{ItemListError, Result};
pub use model::{
    CacheLayer, FieldAccessor, GroupInfo, Item, ItemListView, ItemMatch, ItemRef, ItemSource,
    ParentInfo, Query, SortInfos, SortOrder, ViewList, ViewRequest,
};
