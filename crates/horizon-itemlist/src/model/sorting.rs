//! Multi-field tree sorting.
//!
//! Sorting reorders the references inside each [`ChildList`] in place and
//! recurses into node children. The sort is stable: items that compare equal
//! on every sort field keep their relative order.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::accessor::FieldAccessor;
use super::item::{ChildList, Item, ItemRef};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// One sort key.
#[derive(Debug, Clone)]
pub struct SortItem {
    pub field: FieldAccessor,
    pub order: SortOrder,
}

impl SortItem {
    pub fn new(field: impl Into<FieldAccessor>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// An ordered list of sort keys. Later keys break ties of earlier ones.
#[derive(Debug, Clone, Default)]
pub struct SortInfos {
    pub sort_items: Vec<SortItem>,
}

impl SortInfos {
    /// Sorts on a single field.
    pub fn by(field: impl Into<FieldAccessor>, order: SortOrder) -> Self {
        Self {
            sort_items: vec![SortItem::new(field, order)],
        }
    }

    /// Adds a tie-breaking key.
    pub fn then(mut self, field: impl Into<FieldAccessor>, order: SortOrder) -> Self {
        self.sort_items.push(SortItem::new(field, order));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sort_items.is_empty()
    }
}

fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(_) => 4,
    }
}

/// Compares two field values.
///
/// Missing values sort first, numbers compare numerically and strings
/// case-insensitively. Values of different kinds order by kind.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(na)), Some(Value::Number(nb))) => {
            let fa = na.as_f64().unwrap_or(0.0);
            let fb = nb.as_f64().unwrap_or(0.0);
            fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(sa)), Some(Value::String(sb))) => sa
            .to_lowercase()
            .cmp(&sb.to_lowercase())
            .then_with(|| sa.cmp(sb)),
        (Some(Value::Bool(ba)), Some(Value::Bool(bb))) => ba.cmp(bb),
        (Some(va @ (Value::Array(_) | Value::Object(_))), Some(vb)) if rank(Some(vb)) == 4 => {
            va.to_string().cmp(&vb.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Compares two items on every sort key in turn.
pub fn compare_items(a: &Item, b: &Item, infos: &SortInfos) -> Ordering {
    for key in &infos.sort_items {
        let va = key.field.resolve(a);
        let vb = key.field.resolve(b);
        let ordering = compare_values(va.as_ref(), vb.as_ref());
        let ordering = match key.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Sorts a slice of items (one level only).
pub fn sort_items(items: &mut [ItemRef], infos: &SortInfos) {
    items.sort_by(|a, b| compare_items(a, b, infos));
}

/// Sorts `list` in place, then every node's children recursively.
pub fn sort_tree(list: &ChildList, infos: &SortInfos) {
    if infos.is_empty() {
        return;
    }
    let nodes: Vec<ChildList> = {
        let mut items = list.write();
        sort_items(&mut items, infos);
        items.iter().filter_map(|item| item.children()).collect()
    };
    for children in nodes {
        if !Arc::ptr_eq(&children, list) {
            sort_tree(&children, infos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::{child_list, ensure_children};
    use crate::model::accessor::item_text;
    use serde_json::json;

    fn names(list: &[ItemRef]) -> Vec<String> {
        list.iter().map(|i| item_text(i, None)).collect()
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("A"))), Ordering::Greater);
        assert_eq!(compare_values(None, Some(&json!(0))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(false)), Some(&json!(true))), Ordering::Less);
    }

    #[test]
    fn test_multi_key_stable_sort() {
        let mut items: Vec<ItemRef> = [
            ("c", 1, "first"),
            ("a", 2, "second"),
            ("b", 1, "third"),
            ("d", 1, "fourth"),
        ]
        .into_iter()
        .map(|(name, rank, tag)| {
            Item::new(json!({"displayName": name, "rank": rank, "tag": tag})).into_ref()
        })
        .collect();

        sort_items(
            &mut items,
            &SortInfos::by("rank", SortOrder::Descending).then("displayName", SortOrder::Ascending),
        );
        assert_eq!(names(&items), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_sort_tree_recurses() {
        let node = Item::labeled("n")
            .with_children(vec![Item::labeled("z").into_ref(), Item::labeled("y").into_ref()])
            .into_ref();
        let roots = child_list(vec![Item::labeled("x").into_ref(), node.clone()]);
        ensure_children(&roots.read(), "items");

        sort_tree(&roots, &SortInfos::by("displayName", SortOrder::Descending));

        assert_eq!(names(&roots.read()), vec!["x", "n"]);
        assert_eq!(names(&node.child_items().unwrap()), vec!["z", "y"]);

        sort_tree(&roots, &SortInfos::by("displayName", SortOrder::Ascending));
        assert_eq!(names(&roots.read()), vec!["n", "x"]);
        assert_eq!(names(&node.child_items().unwrap()), vec!["y", "z"]);
    }
}
