use super::{InjectedValueAccess, RawKey, Resolution};

/// Ordered union of several accesses; the first one yielding a value wins.
pub struct MergedValueAccess<'a> {
    delegates: Vec<&'a dyn InjectedValueAccess>,
}

impl<'a> MergedValueAccess<'a> {
    pub fn new(delegates: impl IntoIterator<Item = &'a dyn InjectedValueAccess>) -> Self {
        Self {
            delegates: delegates.into_iter().collect(),
        }
    }
}

impl InjectedValueAccess for MergedValueAccess<'_> {
    fn resolve(&self, key: &RawKey, context: &dyn InjectedValueAccess) -> Resolution {
        for delegate in &self.delegates {
            if let Some(value) = delegate.resolve(key, context)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}
