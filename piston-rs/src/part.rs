//! Declarative pieces of a command's input surface.

use crate::command::Command;
use crate::converter::{share, ArgumentConverter, SharedConverter};
use crate::inject::{Key, RawKey};
use std::fmt;
use std::sync::Arc;

/// One bindable unit of a command.
#[derive(Clone)]
pub enum CommandPart {
    /// Positional value.
    Argument(Argument),
    /// Marker flag such as `-e`, bound to a `bool`.
    Flag(Flag),
    /// Flag followed by a value, such as `-m stone`.
    ArgFlag(ArgFlag),
    /// Slot naming one of several nested commands.
    SubCommand(SubCommandPart),
}

impl CommandPart {
    /// Name used in diagnostics and presence checks. Flags are named `-<char>`.
    pub fn name(&self) -> &str {
        match self {
            CommandPart::Argument(arg) => &arg.name,
            CommandPart::Flag(flag) => &flag.name,
            CommandPart::ArgFlag(flag) => &flag.name,
            CommandPart::SubCommand(sub) => &sub.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            CommandPart::Argument(arg) => &arg.description,
            CommandPart::Flag(flag) => &flag.description,
            CommandPart::ArgFlag(flag) => &flag.description,
            CommandPart::SubCommand(sub) => &sub.description,
        }
    }

    pub fn is_required(&self) -> bool {
        match self {
            CommandPart::Argument(arg) => arg.required,
            CommandPart::Flag(_) => false,
            CommandPart::ArgFlag(flag) => flag.required,
            CommandPart::SubCommand(sub) => sub.required,
        }
    }

    /// Declared defaults; always empty for flags and sub-commands.
    pub fn defaults(&self) -> &[String] {
        match self {
            CommandPart::Argument(arg) => &arg.defaults,
            CommandPart::ArgFlag(flag) => &flag.defaults,
            CommandPart::Flag(_) | CommandPart::SubCommand(_) => &[],
        }
    }

    /// Usage form, e.g. `<pattern>`, `[-e]`, `[-m <mask>]` or `<add|remove>`.
    pub fn text_representation(&self) -> String {
        match self {
            CommandPart::Argument(arg) => {
                let name = if arg.variadic {
                    format!("{}...", arg.name)
                } else {
                    arg.name.clone()
                };
                if arg.required {
                    format!("<{}>", name)
                } else {
                    format!("[{}]", name)
                }
            }
            CommandPart::Flag(flag) => format!("[-{}]", flag.flag),
            CommandPart::ArgFlag(flag) => {
                let body = format!("-{} <{}>", flag.flag, flag.argument_name);
                if flag.required {
                    body
                } else {
                    format!("[{}]", body)
                }
            }
            CommandPart::SubCommand(sub) => {
                let names = sub
                    .commands
                    .iter()
                    .map(|cmd| cmd.name())
                    .collect::<Vec<_>>()
                    .join("|");
                if sub.required {
                    format!("<{}>", names)
                } else {
                    format!("[{}]", names)
                }
            }
        }
    }

    /// Key and explicit converter of value-carrying parts.
    pub(crate) fn value_spec(&self) -> Option<(&RawKey, Option<&SharedConverter>)> {
        match self {
            CommandPart::Argument(arg) => Some((&arg.key, arg.converter.as_ref())),
            CommandPart::ArgFlag(flag) => Some((&flag.key, flag.converter.as_ref())),
            CommandPart::Flag(_) | CommandPart::SubCommand(_) => None,
        }
    }
}

impl fmt::Debug for CommandPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text_representation())
    }
}

impl fmt::Display for CommandPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text_representation())
    }
}

// ============================================================================
// Arguments
// ============================================================================

#[derive(Clone)]
pub struct Argument {
    name: String,
    description: String,
    required: bool,
    defaults: Vec<String>,
    variadic: bool,
    key: RawKey,
    converter: Option<SharedConverter>,
}

impl Argument {
    /// Start an argument bound to `key`; its name is the key's name.
    ///
    /// Arguments are required unless [`ArgumentBuilder::optional`] is called.
    pub fn builder<T>(key: Key<T>, description: impl Into<String>) -> ArgumentBuilder<T> {
        ArgumentBuilder {
            key,
            description: description.into(),
            required: true,
            defaults: Vec::new(),
            variadic: false,
            converter: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn key(&self) -> &RawKey {
        &self.key
    }
}

pub struct ArgumentBuilder<T> {
    key: Key<T>,
    description: String,
    required: bool,
    defaults: Vec<String>,
    variadic: bool,
    converter: Option<SharedConverter>,
}

impl<T: Send + Sync + 'static> ArgumentBuilder<T> {
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Default input used when the argument is absent. Only legal on optional arguments.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.defaults.push(value.into());
        self
    }

    pub fn defaults<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults.extend(values.into_iter().map(Into::into));
        self
    }

    /// Let this (last) argument consume every following token its converter accepts.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Converter for this argument, overriding the manager's default for `T`.
    pub fn converter(mut self, converter: impl ArgumentConverter<T> + 'static) -> Self {
        self.converter = Some(share::<T, _>(converter));
        self
    }

    pub fn build(self) -> CommandPart {
        let raw = self.key.raw().clone();
        CommandPart::Argument(Argument {
            name: raw.name().unwrap_or(raw.type_name()).to_string(),
            description: self.description,
            required: self.required,
            defaults: self.defaults,
            variadic: self.variadic,
            key: raw,
            converter: self.converter,
        })
    }
}

// ============================================================================
// Flags
// ============================================================================

#[derive(Clone)]
pub struct Flag {
    flag: char,
    name: String,
    description: String,
    key: RawKey,
}

impl Flag {
    pub fn new(flag: char, description: impl Into<String>) -> CommandPart {
        CommandPart::Flag(Flag {
            flag,
            name: format!("-{}", flag),
            description: description.into(),
            key: Self::key_for(flag).raw().clone(),
        })
    }

    /// Key under which the presence of `-<flag>` is bound.
    pub fn key_for(flag: char) -> Key<bool> {
        Key::named(format!("-{}", flag))
    }

    pub fn flag(&self) -> char {
        self.flag
    }

    pub fn key(&self) -> &RawKey {
        &self.key
    }
}

#[derive(Clone)]
pub struct ArgFlag {
    flag: char,
    name: String,
    argument_name: String,
    description: String,
    required: bool,
    defaults: Vec<String>,
    key: RawKey,
    converter: Option<SharedConverter>,
}

impl ArgFlag {
    /// Start a value-taking flag. It is optional unless [`ArgFlagBuilder::required`] is called.
    pub fn builder<T>(flag: char, key: Key<T>, description: impl Into<String>) -> ArgFlagBuilder<T> {
        ArgFlagBuilder {
            flag,
            argument_name: None,
            key,
            description: description.into(),
            required: false,
            defaults: Vec::new(),
            converter: None,
        }
    }

    pub fn flag(&self) -> char {
        self.flag
    }

    pub fn argument_name(&self) -> &str {
        &self.argument_name
    }

    pub fn key(&self) -> &RawKey {
        &self.key
    }
}

pub struct ArgFlagBuilder<T> {
    flag: char,
    argument_name: Option<String>,
    key: Key<T>,
    description: String,
    required: bool,
    defaults: Vec<String>,
    converter: Option<SharedConverter>,
}

impl<T: Send + Sync + 'static> ArgFlagBuilder<T> {
    /// Placeholder shown in usage; defaults to the key's name.
    pub fn argument_name(mut self, name: impl Into<String>) -> Self {
        self.argument_name = Some(name.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.defaults.push(value.into());
        self
    }

    pub fn converter(mut self, converter: impl ArgumentConverter<T> + 'static) -> Self {
        self.converter = Some(share::<T, _>(converter));
        self
    }

    pub fn build(self) -> CommandPart {
        let raw = self.key.raw().clone();
        let argument_name = self
            .argument_name
            .unwrap_or_else(|| raw.name().unwrap_or("value").to_string());
        CommandPart::ArgFlag(ArgFlag {
            flag: self.flag,
            name: format!("-{}", self.flag),
            argument_name,
            description: self.description,
            required: self.required,
            defaults: self.defaults,
            key: raw,
            converter: self.converter,
        })
    }
}

// ============================================================================
// Sub-commands
// ============================================================================

#[derive(Clone)]
pub struct SubCommandPart {
    name: String,
    description: String,
    required: bool,
    commands: Vec<Arc<Command>>,
}

impl SubCommandPart {
    /// Start a sub-command slot. It is required unless made optional.
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> SubCommandPartBuilder {
        SubCommandPartBuilder {
            name: name.into(),
            description: description.into(),
            required: true,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[Arc<Command>] {
        &self.commands
    }
}

pub struct SubCommandPartBuilder {
    name: String,
    description: String,
    required: bool,
    commands: Vec<Arc<Command>>,
}

impl SubCommandPartBuilder {
    pub fn command(mut self, command: impl Into<Arc<Command>>) -> Self {
        self.commands.push(command.into());
        self
    }

    pub fn commands<I, C>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Arc<Command>>,
    {
        self.commands.extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn build(self) -> CommandPart {
        CommandPart::SubCommand(SubCommandPart {
            name: self.name,
            description: self.description,
            required: self.required,
            commands: self.commands,
        })
    }
}
