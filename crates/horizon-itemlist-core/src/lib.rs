//! Core primitives for Horizon item lists.
//!
//! This crate provides the building blocks the item-list engine is written
//! against:
//!
//! - **Signal/Slot System**: Type-safe change notification ([`Signal`])
//! - **Properties**: Observable values with a change signal ([`Property`])
//! - **Deferred Values**: One awaitable type for immediate, future-based and
//!   stream-based answers ([`Deferred`])
//! - **Logging**: `tracing` targets, span names and flat-list debug output
//!
//! # Signal Example
//!
//! ```
//! use horizon_itemlist_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```

pub mod deferred;
mod error;
pub mod logging;
pub mod property;
pub mod signal;

pub use deferred::Deferred;
#[cfg(feature = "tokio")]
pub use deferred::Resolver;
pub use error::{CoreError, Result};
pub use logging::{FlatListDebug, PerfSpan, TreeFormatOptions, TreeRow, TreeStyle};
pub use property::Property;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
