//! Key-typed value injection.
//!
//! Values are looked up by [`Key`] and produced lazily by providers. Access is
//! split in two layers:
//!
//! - [`InjectedValueAccess`] is the object-safe core. It resolves an erased
//!   [`RawKey`] and hands a *requesting context* to whatever provider it runs,
//!   so providers can ask for further values through the same (possibly
//!   memoizing) access that asked them.
//! - [`InjectedValues`] adds typed lookup on top and is implemented for every
//!   access type, including `dyn InjectedValueAccess`.
//!
//! ```
//! use piston::inject::{InjectedValueStore, InjectedValues, Key, MapBackedValueStore, ValueProvider};
//!
//! let store = MapBackedValueStore::new();
//! let actor = Key::<String>::named("actor");
//! store.inject_value(actor.clone(), ValueProvider::constant("steve".to_string()));
//!
//! assert_eq!(store.injected_value(&actor).unwrap(), Some("steve".to_string()));
//! ```

mod key;
mod memoize;
mod merged;
mod store;

pub use key::{Key, RawKey};
pub use memoize::MemoizingValueAccess;
pub use merged::MergedValueAccess;
pub use store::{InjectedValueStore, MapBackedValueStore, ValueProvider};

use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// A resolved value with its type erased.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// Outcome of resolving one key: absent, present, or failed.
pub type Resolution = Result<Option<AnyValue>, ResolveError>;

/// Errors raised while resolving an injected value.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to provide value for {key}: {source}")]
    Provider {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Value stored for {key} has an unexpected type")]
    TypeMismatch { key: String },
}

/// Read-only access to injected values.
pub trait InjectedValueAccess: Send + Sync {
    /// Resolve `key`, passing `context` to any provider that needs other values.
    fn resolve(&self, key: &RawKey, context: &dyn InjectedValueAccess) -> Resolution;
}

/// Typed lookups for any [`InjectedValueAccess`].
pub trait InjectedValues {
    /// Resolve an erased key with this access as the requesting context.
    fn resolve_raw(&self, key: &RawKey) -> Resolution;

    /// Resolve `key` to a typed value.
    fn injected_value<T>(&self, key: &Key<T>) -> Result<Option<T>, ResolveError>
    where
        T: Clone + Send + Sync + 'static,
    {
        downcast_value(key.raw(), self.resolve_raw(key.raw())?)
    }
}

impl<A: InjectedValueAccess> InjectedValues for A {
    fn resolve_raw(&self, key: &RawKey) -> Resolution {
        self.resolve(key, self)
    }
}

impl<'a> InjectedValues for dyn InjectedValueAccess + 'a {
    fn resolve_raw(&self, key: &RawKey) -> Resolution {
        self.resolve(key, self)
    }
}

impl<A: InjectedValueAccess + ?Sized> InjectedValueAccess for Arc<A> {
    fn resolve(&self, key: &RawKey, context: &dyn InjectedValueAccess) -> Resolution {
        (**self).resolve(key, context)
    }
}

/// Access that never yields a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyValueAccess;

/// The empty context.
pub const EMPTY: EmptyValueAccess = EmptyValueAccess;

impl InjectedValueAccess for EmptyValueAccess {
    fn resolve(&self, _key: &RawKey, _context: &dyn InjectedValueAccess) -> Resolution {
        Ok(None)
    }
}

pub(crate) fn erase<T: Send + Sync + 'static>(value: T) -> AnyValue {
    Arc::new(value)
}

pub(crate) fn downcast_value<T>(key: &RawKey, value: Option<AnyValue>) -> Result<Option<T>, ResolveError>
where
    T: Clone + Send + Sync + 'static,
{
    match value {
        None => Ok(None),
        Some(value) => value
            .downcast_ref::<T>()
            .cloned()
            .map(Some)
            .ok_or_else(|| ResolveError::TypeMismatch {
                key: key.to_string(),
            }),
    }
}
