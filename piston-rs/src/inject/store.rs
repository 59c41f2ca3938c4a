//! Provider registration.

use super::{erase, AnyValue, InjectedValueAccess, Key, RawKey, Resolution, ResolveError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type-erased provider as stored by an [`InjectedValueStore`].
pub type RawProvider =
    Arc<dyn Fn(&dyn InjectedValueAccess) -> anyhow::Result<Option<AnyValue>> + Send + Sync>;

/// Lazily produces a value of type `T`.
///
/// The provider receives the context that requested the value, so it can
/// derive its result from other injected values.
pub struct ValueProvider<T> {
    inner: Arc<dyn Fn(&dyn InjectedValueAccess) -> anyhow::Result<Option<T>> + Send + Sync>,
}

impl<T: Clone + Send + Sync + 'static> ValueProvider<T> {
    /// Provider that always yields `value`.
    pub fn constant(value: T) -> Self {
        Self::from_fn(move |_| Ok(Some(value.clone())))
    }

    /// Provider backed by a function of the requesting context.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&dyn InjectedValueAccess) -> anyhow::Result<Option<T>> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Run the provider against `context`.
    pub fn value(&self, context: &dyn InjectedValueAccess) -> anyhow::Result<Option<T>> {
        (self.inner)(context)
    }

    pub(crate) fn erase(self) -> RawProvider {
        let inner = self.inner;
        Arc::new(
            move |context: &dyn InjectedValueAccess| -> anyhow::Result<Option<AnyValue>> {
                Ok(inner(context)?.map(erase))
            },
        )
    }
}

impl<T> Clone for ValueProvider<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Mutable extension of [`InjectedValueAccess`] that accepts providers.
pub trait InjectedValueStore: InjectedValueAccess {
    /// Register an erased provider. Re-registering a key replaces its provider.
    fn inject_raw(&self, key: RawKey, provider: RawProvider);

    /// Register a typed provider for `key`.
    fn inject_value<T>(&self, key: Key<T>, provider: ValueProvider<T>)
    where
        T: Clone + Send + Sync + 'static,
        Self: Sized,
    {
        self.inject_raw(key.raw().clone(), provider.erase());
    }
}

/// [`InjectedValueStore`] backed by a lock-protected map.
///
/// Providers are invoked without holding the lock, so a provider may query
/// the store recursively or register further providers.
#[derive(Default)]
pub struct MapBackedValueStore {
    providers: RwLock<HashMap<RawKey, RawProvider>>,
}

impl MapBackedValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding fixed, already-resolved values.
    pub fn from_resolved(values: impl IntoIterator<Item = (RawKey, Option<AnyValue>)>) -> Self {
        let providers = values
            .into_iter()
            .map(|(key, value)| {
                let provider: RawProvider = Arc::new(
                    move |_: &dyn InjectedValueAccess| -> anyhow::Result<Option<AnyValue>> {
                        Ok(value.clone())
                    },
                );
                (key, provider)
            })
            .collect();
        Self {
            providers: RwLock::new(providers),
        }
    }

    /// Whether a provider is registered for `key`.
    pub fn contains(&self, key: &RawKey) -> bool {
        self.providers.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    /// Keys with a registered provider.
    pub fn keys(&self) -> Vec<RawKey> {
        self.providers.read().keys().cloned().collect()
    }
}

impl InjectedValueAccess for MapBackedValueStore {
    fn resolve(&self, key: &RawKey, context: &dyn InjectedValueAccess) -> Resolution {
        let provider = self.providers.read().get(key).cloned();
        match provider {
            None => Ok(None),
            Some(provider) => provider(context).map_err(|source| ResolveError::Provider {
                key: key.to_string(),
                source,
            }),
        }
    }
}

impl InjectedValueStore for MapBackedValueStore {
    fn inject_raw(&self, key: RawKey, provider: RawProvider) {
        tracing::trace!(key = %key, "Provider registered");
        self.providers.write().insert(key, provider);
    }
}

impl fmt::Debug for MapBackedValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapBackedValueStore")
            .field("keys", &self.keys())
            .finish()
    }
}
