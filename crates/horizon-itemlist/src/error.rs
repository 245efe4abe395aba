//! Error types for item-list views.

use thiserror::Error;

/// Errors produced by item-list operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemListError {
    /// An operation needed a cache layer that has not been built yet.
    #[error("empty cache on {0}")]
    EmptyCache(&'static str),

    /// The view holds no items.
    #[error("no items to process")]
    NoItems,

    /// The item is not part of the view.
    #[error("item not found in the item list")]
    ItemNotFound,

    /// The drag session is inconsistent with the item tree.
    #[error("invalid drag information stored in cache")]
    InvalidDragInfo,

    /// A configuration could not be parsed or serialized.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for item-list operations.
pub type Result<T> = std::result::Result<T, ItemListError>;
