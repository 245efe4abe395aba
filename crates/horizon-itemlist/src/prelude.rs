//! Prelude module for Horizon Item List.
//!
//! ```
//! use horizon_itemlist::prelude::*;
//! ```

// ============================================================================
// Signals and deferred values
// ============================================================================

pub use horizon_itemlist_core::{Deferred, Property, Signal};

// ============================================================================
// Items
// ============================================================================

pub use crate::model::{ChildList, FieldAccessor, Item, ItemRef};

// ============================================================================
// View
// ============================================================================

pub use crate::model::{
    CacheLayer, GroupInfo, ItemListView, ItemSource, Query, SortInfos, SortOrder, ViewList,
    ViewRequest,
};
pub use crate::{ItemListError, ListViewConfig};
