//! Conversion of single input tokens into typed values.

mod builtin;
mod store;
pub mod suggestion;

pub use builtin::{
    boolean, character, choice, from_str, string, BooleanConverter, MultiKeyConverter,
    SimpleArgumentConverter,
};
pub use store::ArgumentConverterStore;

use crate::inject::{erase, AnyValue};
use std::marker::PhantomData;
use std::sync::Arc;

/// Turns one token into zero or more values of type `T`.
///
/// A converter may legitimately yield several values from one token (a
/// pattern that expands to many items), so callers always receive a `Vec`.
pub trait ArgumentConverter<T>: Send + Sync {
    fn convert(&self, token: &str) -> Result<Vec<T>, ConversionFailure>;

    /// Human-readable description of acceptable input, e.g. `any integer`.
    fn describe_acceptable_arguments(&self) -> String;

    /// Completions for a partially typed token.
    fn suggestions(&self, _partial: &str) -> Vec<String> {
        Vec::new()
    }
}

impl<T, C: ArgumentConverter<T> + ?Sized> ArgumentConverter<T> for Arc<C> {
    fn convert(&self, token: &str) -> Result<Vec<T>, ConversionFailure> {
        (**self).convert(token)
    }

    fn describe_acceptable_arguments(&self) -> String {
        (**self).describe_acceptable_arguments()
    }

    fn suggestions(&self, partial: &str) -> Vec<String> {
        (**self).suggestions(partial)
    }
}

/// A token the converter could not accept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid value '{token}'{}, acceptable values are {acceptable}", reason_hint(.reason))]
pub struct ConversionFailure {
    /// The offending input.
    pub token: String,
    /// What the converter would have accepted.
    pub acceptable: String,
    /// Why this particular token was rejected, if known.
    pub reason: Option<String>,
}

fn reason_hint(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|reason| format!(" ({reason})"))
        .unwrap_or_default()
}

impl ConversionFailure {
    pub fn new(token: impl Into<String>, acceptable: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            acceptable: acceptable.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Converter with its output type erased, as held by command parts.
pub(crate) trait ErasedConverter: Send + Sync {
    fn convert_erased(&self, token: &str) -> Result<Vec<AnyValue>, ConversionFailure>;

    fn describe(&self) -> String;

    fn suggestions(&self, partial: &str) -> Vec<String>;
}

pub(crate) type SharedConverter = Arc<dyn ErasedConverter>;

struct Erased<C, T> {
    inner: C,
    _marker: PhantomData<fn() -> T>,
}

impl<C, T> ErasedConverter for Erased<C, T>
where
    C: ArgumentConverter<T>,
    T: Send + Sync + 'static,
{
    fn convert_erased(&self, token: &str) -> Result<Vec<AnyValue>, ConversionFailure> {
        Ok(self.inner.convert(token)?.into_iter().map(erase).collect())
    }

    fn describe(&self) -> String {
        self.inner.describe_acceptable_arguments()
    }

    fn suggestions(&self, partial: &str) -> Vec<String> {
        self.inner.suggestions(partial)
    }
}

pub(crate) fn share<T, C>(converter: C) -> SharedConverter
where
    C: ArgumentConverter<T> + 'static,
    T: Send + Sync + 'static,
{
    Arc::new(Erased {
        inner: converter,
        _marker: PhantomData,
    })
}
