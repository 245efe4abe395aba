//! Field accessors.
//!
//! Views read item payloads through a [`FieldAccessor`]: either a dotted
//! path into the JSON model (`"address.city"`) or a computed function.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::item::Item;

/// Default field holding an item's children.
pub const DEFAULT_CHILDREN_FIELD: &str = "items";

/// Default field holding an item's display text.
pub const DEFAULT_TEXT_FIELD: &str = "displayName";

type ComputeFn = Arc<dyn Fn(&Item) -> Option<Value> + Send + Sync>;

/// Resolves one field of an item.
#[derive(Clone)]
pub enum FieldAccessor {
    /// Path segments walked through nested JSON objects.
    Path(Vec<String>),
    /// A function computing the field from the item.
    Computed(ComputeFn),
}

impl FieldAccessor {
    /// Parses a dotted path.
    pub fn path(path: &str) -> Self {
        Self::Path(path.split('.').map(str::to_string).collect())
    }

    /// Wraps a function.
    ///
    /// A view calls the function while its state lock is held (search,
    /// sorting and grouping run during cache rebuilds), so it must not call
    /// back into the [`ItemListView`](crate::ItemListView) that uses it.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Item) -> Option<Value> + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// Resolves the field. A missing field and an explicit `null` both give
    /// `None`.
    pub fn resolve(&self, item: &Item) -> Option<Value> {
        let value = match self {
            Self::Path(segments) => {
                let mut current = item.model();
                for segment in segments {
                    current = current.get(segment.as_str())?;
                }
                Some(current.clone())
            }
            Self::Computed(f) => f(item),
        };
        value.filter(|v| !v.is_null())
    }

    /// Stable textual key, used to compare accessors.
    pub fn key(&self) -> String {
        match self {
            Self::Path(segments) => segments.join("."),
            Self::Computed(f) => format!("<computed {:p}>", Arc::as_ptr(f)),
        }
    }
}

impl From<&str> for FieldAccessor {
    fn from(path: &str) -> Self {
        Self::path(path)
    }
}

impl From<String> for FieldAccessor {
    fn from(path: String) -> Self {
        Self::path(&path)
    }
}

impl fmt::Debug for FieldAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(segments) => f.debug_tuple("Path").field(segments).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Converts a JSON value to display text.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// The display text of an item.
///
/// With an accessor, the resolved field (or an empty string). Without one,
/// the `displayName` field, else the payload itself when it is a scalar.
pub fn item_text(item: &Item, field: Option<&FieldAccessor>) -> String {
    if let Some(field) = field {
        return field
            .resolve(item)
            .map(|v| value_to_text(&v))
            .unwrap_or_default();
    }
    match item.model() {
        Value::Object(map) => map
            .get(DEFAULT_TEXT_FIELD)
            .map(value_to_text)
            .unwrap_or_default(),
        Value::Array(_) => String::new(),
        scalar => value_to_text(scalar),
    }
}

/// The comparison value of an item.
///
/// The value field when it resolves, else the explicit item value, else a
/// scalar payload. Object and array payloads give `None`: such items only
/// compare by identity.
pub fn item_value(item: &Item, field: Option<&FieldAccessor>) -> Option<Value> {
    field
        .and_then(|f| f.resolve(item))
        .or_else(|| item.value().cloned())
        .or_else(|| match item.model() {
            Value::Null | Value::Object(_) | Value::Array(_) => None,
            scalar => Some(scalar.clone()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_resolution() {
        let item = Item::new(json!({"address": {"city": "Lyon"}, "empty": null}));
        assert_eq!(
            FieldAccessor::path("address.city").resolve(&item),
            Some(json!("Lyon"))
        );
        assert_eq!(FieldAccessor::path("address.zip").resolve(&item), None);
        assert_eq!(FieldAccessor::path("empty").resolve(&item), None);
    }

    #[test]
    fn test_computed_accessor() {
        let upper = FieldAccessor::computed(|item| {
            Some(Value::String(item_text(item, None).to_uppercase()))
        });
        let item = Item::labeled("abc");
        assert_eq!(item_text(&item, Some(&upper)), "ABC");
    }

    #[test]
    fn test_item_text_defaults() {
        assert_eq!(item_text(&Item::labeled("Alpha"), None), "Alpha");
        assert_eq!(item_text(&Item::new(json!("plain")), None), "plain");
        assert_eq!(item_text(&Item::new(json!(12)), None), "12");
        assert_eq!(item_text(&Item::new(json!({"name": "x"})), None), "");

        let named = Item::new(json!({"name": "x"}));
        assert_eq!(item_text(&named, Some(&"name".into())), "x");
    }

    #[test]
    fn test_item_value_fallbacks() {
        let field = FieldAccessor::path("id");
        let with_id = Item::new(json!({"id": 7}));
        assert_eq!(item_value(&with_id, Some(&field)), Some(json!(7)));

        let explicit = Item::new(json!({"name": "n"})).with_value(json!("v"));
        assert_eq!(item_value(&explicit, Some(&field)), Some(json!("v")));

        let bare = Item::new(json!({"name": "n"}));
        assert_eq!(item_value(&bare, Some(&field)), None);
        assert_eq!(item_value(&Item::labeled("x"), None), None);
        assert_eq!(item_value(&Item::new(json!(["a"])), None), None);
        assert_eq!(item_value(&Item::new(json!("plain")), None), Some(json!("plain")));

        assert_eq!(item_value(&Item::new(Value::Null), None), None);
    }
}
