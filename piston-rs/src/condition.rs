//! Composable gates deciding whether a command may be invoked.

use crate::inject::InjectedValueAccess;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A host-defined predicate over the injected-value context.
///
/// Implement this on a concrete type when callers need to recover it later
/// through [`Condition::as_check`], for example to explain why it failed.
pub trait ConditionCheck: AsAny + Send + Sync {
    fn satisfied(&self, context: &dyn InjectedValueAccess) -> bool;
}

#[doc(hidden)]
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct FnCheck<F>(F);

impl<F> ConditionCheck for FnCheck<F>
where
    F: Fn(&dyn InjectedValueAccess) -> bool + Send + Sync + 'static,
{
    fn satisfied(&self, context: &dyn InjectedValueAccess) -> bool {
        (self.0)(context)
    }
}

/// Combinator structure of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    Leaf,
    Not,
    And,
    Or,
}

/// Boolean gate over an injected-value context.
///
/// ```
/// use piston::{inject::EMPTY, Condition};
///
/// assert!(Condition::FALSE.not().satisfied(&EMPTY));
/// assert!(!Condition::TRUE.and(Condition::FALSE).satisfied(&EMPTY));
/// ```
#[derive(Clone)]
pub enum Condition {
    Constant(bool),
    Check(Arc<dyn ConditionCheck>),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    pub const TRUE: Condition = Condition::Constant(true);
    pub const FALSE: Condition = Condition::Constant(false);

    /// Leaf condition from a concrete check.
    pub fn check(check: impl ConditionCheck + 'static) -> Self {
        Condition::Check(Arc::new(check))
    }

    /// Leaf condition from a closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&dyn InjectedValueAccess) -> bool + Send + Sync + 'static,
    {
        Self::check(FnCheck(f))
    }

    pub fn satisfied(&self, context: &dyn InjectedValueAccess) -> bool {
        match self {
            Condition::Constant(value) => *value,
            Condition::Check(check) => check.satisfied(context),
            Condition::Not(inner) => !inner.satisfied(context),
            Condition::And(left, right) => left.satisfied(context) && right.satisfied(context),
            Condition::Or(left, right) => left.satisfied(context) || right.satisfied(context),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Condition::Not(Box::new(self))
    }

    /// Both must hold; `other` is not evaluated when `self` fails.
    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    /// Either must hold; `other` is not evaluated when `self` holds.
    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    pub fn kind(&self) -> ConditionKind {
        match self {
            Condition::Constant(_) | Condition::Check(_) => ConditionKind::Leaf,
            Condition::Not(_) => ConditionKind::Not,
            Condition::And(..) => ConditionKind::And,
            Condition::Or(..) => ConditionKind::Or,
        }
    }

    /// Recover the concrete check behind a leaf, if it is a `C`.
    pub fn as_check<C: ConditionCheck + 'static>(&self) -> Option<&C> {
        match self {
            Condition::Check(check) => {
                let check: &dyn ConditionCheck = check.as_ref();
                check.as_any().downcast_ref::<C>()
            }
            _ => None,
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::TRUE
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Constant(value) => write!(f, "{}", value),
            Condition::Check(_) => write!(f, "Check"),
            Condition::Not(inner) => write!(f, "Not({:?})", inner),
            Condition::And(left, right) => write!(f, "And({:?}, {:?})", left, right),
            Condition::Or(left, right) => write!(f, "Or({:?}, {:?})", left, right),
        }
    }
}
