//! Interceptor hooks.
//!
//! A view consults an optional hook before loading, selecting, unselecting,
//! expanding or collapsing. Each hook answers with a [`Deferred`]: resolving
//! to `Some` lets the operation proceed (possibly with a substituted item),
//! resolving to `None` vetoes it.

use std::fmt;
use std::sync::Arc;

use horizon_itemlist_core::Deferred;

use super::item::ItemRef;
use super::visibility::Query;

/// Called before (re)loading: receives the query and the current selection,
/// may answer with a replacement item collection.
pub type LoadHook = Arc<dyn Fn(Option<Query>, Vec<ItemRef>) -> Deferred<Vec<ItemRef>> + Send + Sync>;

/// Called before an item operation.
pub type ItemHook = Arc<dyn Fn(ItemRef) -> Deferred<ItemRef> + Send + Sync>;

/// The set of hooks installed on a view.
#[derive(Clone, Default)]
pub struct Hooks {
    pub before_load: Option<LoadHook>,
    pub before_select: Option<ItemHook>,
    pub before_unselect: Option<ItemHook>,
    pub before_expand: Option<ItemHook>,
    pub before_collapse: Option<ItemHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_load", &self.before_load.is_some())
            .field("before_select", &self.before_select.is_some())
            .field("before_unselect", &self.before_unselect.is_some())
            .field("before_expand", &self.before_expand.is_some())
            .field("before_collapse", &self.before_collapse.is_some())
            .finish()
    }
}

/// Runs `hook` on `item`; without a hook the item passes through.
pub(crate) async fn intercept(hook: Option<ItemHook>, item: ItemRef) -> Option<ItemRef> {
    match hook {
        Some(hook) => hook(item).await,
        None => Some(item),
    }
}
