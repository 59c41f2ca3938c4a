//! Values bound by one parse, layered over the host context.

use crate::command::Command;
use crate::inject::{
    AnyValue, InjectedValueAccess, Key, MemoizingValueAccess, MergedValueAccess, RawKey,
    Resolution,
};
use crate::part::{CommandPart, Flag};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// One input token and the parts it was bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgBinding {
    /// Index of the token in the parsed input.
    pub position: usize,
    pub input: String,
    pub parts: Vec<String>,
}

/// Everything the parser bound, before it is joined with the host context.
#[derive(Debug, Default)]
pub(crate) struct Bound {
    pub(crate) values: HashMap<RawKey, Vec<AnyValue>>,
    pub(crate) present: HashSet<String>,
    pub(crate) strings: HashMap<String, Vec<String>>,
    pub(crate) bindings: Vec<ArgBinding>,
    pub(crate) trailing: Vec<String>,
    pub(crate) path: Vec<Arc<Command>>,
    pub(crate) called_names: Vec<String>,
}

impl Bound {
    pub(crate) fn bind(&mut self, position: usize, token: &str, part: &str) {
        match self.bindings.iter_mut().rev().find(|b| b.position == position) {
            Some(binding) => {
                if !binding.parts.iter().any(|p| p == part) {
                    binding.parts.push(part.to_string());
                }
            }
            None => self.bindings.push(ArgBinding {
                position,
                input: token.to_string(),
                parts: vec![part.to_string()],
            }),
        }
    }

    /// Forget what an outer level bound for the no-argument flags `command`
    /// declares itself, so each level sees only its own flags.
    pub(crate) fn shadow_flags_of(&mut self, command: &Command) {
        for part in command.parts() {
            if let CommandPart::Flag(flag) = part {
                self.values.remove(flag.key());
                self.present.remove(part.name());
                self.strings.remove(part.name());
            }
        }
    }

    pub(crate) fn path_names(&self) -> Vec<String> {
        self.path.iter().map(|c| c.name().to_string()).collect()
    }
}

/// Host context as seen by one parse: caller values shadow the manager's.
pub(crate) type InvocationContext<'a> = MemoizingValueAccess<MergedValueAccess<'a>>;

/// Bound values of a parsed command, handed to its action and listeners.
///
/// Resolves part keys from the parsed input first, then falls back to the
/// host context of the invocation. Values bound to the same key at several
/// command levels accumulate in input order, defaults after typed input.
/// No-argument flags are the exception: a sub-command declaring the same flag
/// character sees only its own flag.
pub struct CommandParameters<'a> {
    context: InvocationContext<'a>,
    bound: Bound,
    arguments: Vec<String>,
}

impl<'a> CommandParameters<'a> {
    pub(crate) fn new(context: InvocationContext<'a>, bound: Bound, arguments: Vec<String>) -> Self {
        Self {
            context,
            bound,
            arguments,
        }
    }

    /// First value bound to `key` by the input or a default.
    pub fn value<T: Clone + 'static>(&self, key: &Key<T>) -> Option<T> {
        self.bound
            .values
            .get(key.raw())?
            .first()
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Every value bound to `key`, in input order.
    pub fn values<T: Clone + 'static>(&self, key: &Key<T>) -> Vec<T> {
        self.bound
            .values
            .get(key.raw())
            .map(|values| {
                values
                    .iter()
                    .filter_map(|value| value.downcast_ref::<T>())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the part was given in the input, as opposed to defaulted.
    pub fn is_present(&self, part_name: &str) -> bool {
        self.bound.present.contains(part_name)
    }

    pub fn flag(&self, flag: char) -> bool {
        self.value(&Flag::key_for(flag)).unwrap_or(false)
    }

    /// Raw input tokens (or defaults) bound to the part.
    pub fn strings(&self, part_name: &str) -> &[String] {
        self.bound
            .strings
            .get(part_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Positional tokens no part accepted, for commands allowing trailing input.
    pub fn trailing(&self) -> &[String] {
        &self.bound.trailing
    }

    /// Matched commands, outermost first.
    pub fn command_path(&self) -> &[Arc<Command>] {
        &self.bound.path
    }

    /// The command whose action runs.
    pub fn command(&self) -> &Arc<Command> {
        // the parser never builds parameters with an empty path
        &self.bound.path[self.bound.path.len() - 1]
    }

    /// Name or alias the innermost command was invoked by.
    pub fn called_name(&self) -> &str {
        self.bound
            .called_names
            .last()
            .map(String::as_str)
            .unwrap_or_else(|| self.command().name())
    }

    /// Names as typed for each level of the path.
    pub fn called_names(&self) -> &[String] {
        &self.bound.called_names
    }

    pub fn bindings(&self) -> &[ArgBinding] {
        &self.bound.bindings
    }

    /// The full token sequence that was parsed.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Host-supplied values resolved so far in this invocation.
    pub fn host_context(&self) -> &MemoizingValueAccess<MergedValueAccess<'a>> {
        &self.context
    }
}

impl InjectedValueAccess for CommandParameters<'_> {
    fn resolve(&self, key: &RawKey, context: &dyn InjectedValueAccess) -> Resolution {
        if let Some(value) = self.bound.values.get(key).and_then(|values| values.first()) {
            return Ok(Some(Arc::clone(value)));
        }
        self.context.resolve(key, context)
    }
}

impl fmt::Debug for CommandParameters<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandParameters")
            .field("command", &self.bound.path_names())
            .field("arguments", &self.arguments)
            .field("bindings", &self.bound.bindings)
            .field("trailing", &self.bound.trailing)
            .finish_non_exhaustive()
    }
}
