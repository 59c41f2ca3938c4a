//! Typed keys for injected and bound values.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Type-erased identity of a [`Key`].
///
/// Two raw keys are equal when both the name and the value type match.
/// The type name is carried for diagnostics only.
#[derive(Clone)]
pub struct RawKey {
    name: Option<Cow<'static, str>>,
    type_id: TypeId,
    type_name: &'static str,
}

impl RawKey {
    /// The qualifying name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The `TypeId` of the value stored under this key.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Human-readable name of the value type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for RawKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for RawKey {}

impl Hash for RawKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Debug for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Key<{}>({:?})", self.type_name, name),
            None => write!(f, "Key<{}>", self.type_name),
        }
    }
}

impl fmt::Display for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.type_name),
            None => write!(f, "{}", self.type_name),
        }
    }
}

/// Identifier for a typed slot in a value context.
///
/// # Example
///
/// ```
/// use piston::inject::Key;
///
/// let world = Key::<String>::named("world");
/// assert_eq!(world, Key::<String>::named("world"));
/// assert_ne!(world.raw(), Key::<u32>::named("world").raw());
/// ```
pub struct Key<T> {
    raw: RawKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Key<T> {
    /// Key identified by the value type alone.
    pub fn of() -> Self {
        Self::from_parts(None)
    }

    /// Key qualified by a name in addition to the value type.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::from_parts(Some(name.into()))
    }

    fn from_parts(name: Option<Cow<'static, str>>) -> Self {
        Self {
            raw: RawKey {
                name,
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
            },
            _marker: PhantomData,
        }
    }
}

impl<T> Key<T> {
    /// The erased identity of this key.
    pub fn raw(&self) -> &RawKey {
        &self.raw
    }

    pub fn name(&self) -> Option<&str> {
        self.raw.name()
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Key<T> {}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.raw, f)
    }
}

impl<T> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}
