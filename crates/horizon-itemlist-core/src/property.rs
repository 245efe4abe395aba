//! Observable properties.
//!
//! A [`Property<T>`] stores a value together with a change signal. Setting a
//! property to a different value emits `changed`; setting it to an equal
//! value is a no-op. This is how views expose state such as the loading
//! indicator: readers call `get()`, observers connect to `changed`.
//!
//! # Example
//!
//! ```
//! use horizon_itemlist_core::Property;
//!
//! let loading = Property::new(false);
//! loading.changed().connect(|value| println!("loading = {value}"));
//!
//! assert!(loading.set(true));
//! assert!(!loading.set(true));
//! assert!(loading.get());
//! ```

use std::fmt;

use parking_lot::RwLock;

use crate::logging::targets;
use crate::signal::Signal;

/// A value with change notification.
pub struct Property<T> {
    value: RwLock<T>,
    changed: Signal<T>,
}

impl<T: Clone + 'static> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            changed: Signal::new(),
        }
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Set the value without change notification.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }

    /// The signal emitted with the new value after every change.
    pub fn changed(&self) -> &Signal<T> {
        &self.changed
    }
}

impl<T: Clone + PartialEq + 'static> Property<T> {
    /// Set the value, returning `true` if it changed.
    ///
    /// `changed` is emitted after the lock is released, so slots may read
    /// the property.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.value.write();
            if *current == value {
                tracing::trace!(target: targets::CORE, "property unchanged, skipping emit");
                return false;
            }
            *current = value.clone();
        }
        self.changed.emit(value);
        true
    }
}

impl<T: Clone + Default + 'static> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}
