//! Grouping of items into synthetic group nodes.
//!
//! Each [`GroupInfo`] adds one nesting level: items are partitioned by the
//! value of the group-by field, in order of first appearance, and every
//! partition becomes a group node whose children are the partition's items
//! (grouped further by the remaining infos).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::accessor::{self, DEFAULT_TEXT_FIELD, FieldAccessor};
use super::item::{Item, ItemRef};

/// Describes one grouping level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Field whose value selects the group.
    pub group_by_field: String,
    /// Field of the group node's payload holding its label. Defaults to
    /// `displayName`.
    #[serde(default)]
    pub group_text_field: Option<String>,
}

impl GroupInfo {
    pub fn new(group_by_field: impl Into<String>) -> Self {
        Self {
            group_by_field: group_by_field.into(),
            group_text_field: None,
        }
    }

    pub fn with_text_field(mut self, field: impl Into<String>) -> Self {
        self.group_text_field = Some(field.into());
        self
    }

    fn text_field(&self) -> &str {
        self.group_text_field.as_deref().unwrap_or(DEFAULT_TEXT_FIELD)
    }
}

/// Projects `items` into group nodes, one level per entry of `infos`.
///
/// The items themselves are shared, not copied. Group nodes are created
/// fresh on every call.
pub fn group_items(items: &[ItemRef], infos: &[GroupInfo]) -> Vec<ItemRef> {
    let Some((info, rest)) = infos.split_first() else {
        return items.to_vec();
    };

    let field = FieldAccessor::path(&info.group_by_field);
    let mut buckets: Vec<(Value, Vec<ItemRef>)> = Vec::new();
    for item in items {
        let key = field.resolve(item).unwrap_or(Value::Null);
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(item.clone()),
            None => buckets.push((key, vec![item.clone()])),
        }
    }

    buckets
        .into_iter()
        .map(|(key, members)| {
            let mut model = Map::new();
            model.insert(
                info.text_field().to_string(),
                Value::String(accessor::value_to_text(&key)),
            );
            model.insert("groupBy".to_string(), Value::String(info.group_by_field.clone()));
            let children = group_items(&members, rest);
            Item::group(Value::Object(model), key, children).into_ref()
        })
        .collect()
}
