use super::{boolean, character, from_str, share, string, ArgumentConverter, SharedConverter};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

/// Default converters by value type.
///
/// Parts that do not carry their own converter fall back to the converter
/// registered here for their value type.
#[derive(Clone, Default)]
pub struct ArgumentConverterStore {
    converters: HashMap<TypeId, SharedConverter>,
}

impl ArgumentConverterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated for `String`, the primitive numbers, `bool` and `char`.
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store.register::<String, _>(string());
        store.register::<bool, _>(boolean());
        store.register::<char, _>(character());
        store.register::<i8, _>(from_str::<i8>());
        store.register::<i16, _>(from_str::<i16>());
        store.register::<i32, _>(from_str::<i32>());
        store.register::<i64, _>(from_str::<i64>());
        store.register::<i128, _>(from_str::<i128>());
        store.register::<isize, _>(from_str::<isize>());
        store.register::<u8, _>(from_str::<u8>());
        store.register::<u16, _>(from_str::<u16>());
        store.register::<u32, _>(from_str::<u32>());
        store.register::<u64, _>(from_str::<u64>());
        store.register::<u128, _>(from_str::<u128>());
        store.register::<usize, _>(from_str::<usize>());
        store.register::<f32, _>(from_str::<f32>());
        store.register::<f64, _>(from_str::<f64>());
        store
    }

    /// Register (or replace) the default converter for `T`.
    pub fn register<T, C>(&mut self, converter: C)
    where
        T: Send + Sync + 'static,
        C: ArgumentConverter<T> + 'static,
    {
        self.converters.insert(TypeId::of::<T>(), share::<T, C>(converter));
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<T>())
    }

    /// Description of what the default converter for `T` accepts.
    pub fn describe<T: 'static>(&self) -> Option<String> {
        self.converters
            .get(&TypeId::of::<T>())
            .map(|converter| converter.describe())
    }

    pub(crate) fn get(&self, type_id: TypeId) -> Option<SharedConverter> {
        self.converters.get(&type_id).cloned()
    }
}

impl fmt::Debug for ArgumentConverterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentConverterStore")
            .field("types", &self.converters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::choice;

    #[test]
    fn test_defaults_cover_primitives() {
        let store = ArgumentConverterStore::with_defaults();
        assert!(store.contains::<String>());
        assert!(store.contains::<u64>());
        assert!(store.contains::<f32>());
        assert!(store.contains::<char>());
        assert!(!store.contains::<Vec<String>>());
        assert_eq!(store.describe::<i16>().as_deref(), Some("any integer"));
    }

    #[test]
    fn test_register_replaces_default() {
        let mut store = ArgumentConverterStore::with_defaults();
        store.register::<String, _>(choice(["north", "south"]));
        assert_eq!(store.describe::<String>().as_deref(), Some("north|south"));
    }
}
