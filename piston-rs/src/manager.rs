//! Command registry and dispatch.

use crate::command::{Command, CommandBuilder};
use crate::converter::{ArgumentConverter, ArgumentConverterStore};
use crate::error::{CommandBuildError, CommandError, ExecutionError, ParseError};
use crate::inject::{
    InjectedValueAccess, InjectedValueStore, Key, MapBackedValueStore, MemoizingValueAccess,
    MergedValueAccess, ValueProvider, EMPTY,
};
use crate::listener::CommandCallListener;
use crate::parameters::CommandParameters;
use crate::parser::Parser;
use crate::suggestion::{self, Suggestion};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static PARSE_IDS: AtomicU64 = AtomicU64::new(1);

/// Parsing behaviour shared by every command of a manager.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// `--` stops flag matching for the rest of the current command level.
    pub flag_terminator: bool,

    /// Short flags may be combined into one token, as in `-em`.
    pub combined_flags: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            flag_terminator: true,
            combined_flags: true,
        }
    }
}

/// A fully parsed command, ready to run.
pub struct BoundInvocation<'a> {
    parameters: CommandParameters<'a>,
    listeners: &'a [Arc<dyn CommandCallListener>],
}

impl<'a> BoundInvocation<'a> {
    pub fn command(&self) -> &Arc<Command> {
        self.parameters.command()
    }

    pub fn parameters(&self) -> &CommandParameters<'a> {
        &self.parameters
    }

    pub fn into_parameters(self) -> CommandParameters<'a> {
        self.parameters
    }

    /// Run the action, notifying listeners before and after.
    pub fn invoke(self) -> Result<i32, ExecutionError> {
        let command = Arc::clone(self.parameters.command());
        let parameters = &self.parameters;

        for listener in self.listeners {
            listener.before_call(&command, parameters);
        }

        match (command.action())(parameters) {
            Ok(result) => {
                for listener in self.listeners {
                    listener.after_call(&command, parameters, result);
                }
                Ok(result)
            }
            Err(error) => {
                tracing::warn!(command = %command.name(), error = %error, "Command action failed");
                for listener in self.listeners {
                    listener.after_throw(&command, parameters, &error);
                }
                Err(ExecutionError {
                    command_path: parameters
                        .command_path()
                        .iter()
                        .map(|c| c.name().to_string())
                        .collect(),
                    source: error,
                })
            }
        }
    }
}

impl fmt::Debug for BoundInvocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundInvocation")
            .field("parameters", &self.parameters)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Registry of top-level commands plus the host's injected values.
///
/// Registration takes `&mut self` and is meant for setup; parsing and
/// execution take `&self` and can run from many threads at once.
///
/// ```
/// use piston::{Argument, CommandManager, Flag, Key};
///
/// let pattern = Key::<String>::named("pattern");
/// let mut manager = CommandManager::new();
/// manager
///     .register("copy", |cmd| {
///         let pattern = pattern.clone();
///         cmd.part(Flag::new('e', "Copy entities"))
///             .part(Argument::builder(pattern.clone(), "Blocks to copy").build())
///             .action(move |params| {
///                 assert_eq!(params.value(&pattern).as_deref(), Some("stone"));
///                 Ok(if params.flag('e') { 2 } else { 1 })
///             });
///     })
///     .unwrap();
///
/// assert_eq!(manager.execute(&["copy", "-e", "stone"]).unwrap(), 2);
/// assert_eq!(manager.execute(&["copy", "stone"]).unwrap(), 1);
/// ```
pub struct CommandManager {
    commands: HashMap<String, Arc<Command>>,
    injected: MapBackedValueStore,
    converters: ArgumentConverterStore,
    listeners: Vec<Arc<dyn CommandCallListener>>,
    config: ManagerConfig,
}

impl CommandManager {
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        Self {
            commands: HashMap::new(),
            injected: MapBackedValueStore::new(),
            converters: ArgumentConverterStore::with_defaults(),
            listeners: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Builder for a command to pass to [`register_command`](Self::register_command).
    pub fn new_command(&self, name: impl Into<String>) -> CommandBuilder {
        CommandBuilder::new(name)
    }

    /// Build a command named `name` and register it under its name and aliases.
    ///
    /// A name already in use is taken over by the new command.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        configure: F,
    ) -> Result<Arc<Command>, CommandBuildError>
    where
        F: FnOnce(&mut CommandBuilder),
    {
        let mut builder = CommandBuilder::new(name);
        configure(&mut builder);
        self.register_command(builder.build()?)
    }

    /// Register a built command under its name and aliases.
    ///
    /// Fails if any part, including parts of nested commands, has a value
    /// type with neither an explicit nor a default converter.
    pub fn register_command(
        &mut self,
        command: impl Into<Arc<Command>>,
    ) -> Result<Arc<Command>, CommandBuildError> {
        let command = command.into();
        self.check_converters(&command)?;

        for name in command.all_names() {
            if let Some(previous) = self.commands.insert(name.to_string(), Arc::clone(&command)) {
                if !Arc::ptr_eq(&previous, &command) {
                    tracing::debug!(name, replaced = %previous.name(), "Command name taken over");
                }
            }
        }

        tracing::info!(command = %command.name(), aliases = ?command.aliases(), "Command registered");
        Ok(command)
    }

    fn check_converters(&self, command: &Command) -> Result<(), CommandBuildError> {
        let mut missing = None;
        command.walk(&mut |cmd: &Command| {
            if missing.is_some() {
                return;
            }
            for part in cmd.parts() {
                if let Some((key, None)) = part.value_spec() {
                    if self.converters.get(key.type_id()).is_none() {
                        missing = Some(CommandBuildError::MissingConverter {
                            command: cmd.name().to_string(),
                            part: part.text_representation(),
                            type_name: key.type_name(),
                        });
                        return;
                    }
                }
            }
        });
        missing.map_or(Ok(()), Err)
    }

    /// Remove the command registered as `name`, together with all its other names.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<Command>> {
        let command = self.commands.remove(name)?;
        self.commands.retain(|_, other| !Arc::ptr_eq(other, &command));
        tracing::info!(command = %command.name(), "Command unregistered");
        Some(command)
    }

    pub fn command(&self, name: &str) -> Option<&Arc<Command>> {
        self.commands.get(name)
    }

    /// Every distinct registered command, sorted by name.
    pub fn commands(&self) -> Vec<Arc<Command>> {
        let mut commands: Vec<Arc<Command>> = Vec::new();
        for command in self.commands.values() {
            if !commands.iter().any(|c| Arc::ptr_eq(c, command)) {
                commands.push(Arc::clone(command));
            }
        }
        commands.sort_by(|a, b| a.name().cmp(b.name()));
        commands
    }

    /// Every registered name and alias, sorted.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Set the default converter for parts of type `T`.
    pub fn register_converter<T, C>(&mut self, converter: C)
    where
        T: Send + Sync + 'static,
        C: ArgumentConverter<T> + 'static,
    {
        self.converters.register::<T, C>(converter);
    }

    pub fn converters(&self) -> &ArgumentConverterStore {
        &self.converters
    }

    /// Provide a host value to every parse, behind the caller's own context.
    pub fn inject_value<T>(&self, key: Key<T>, provider: ValueProvider<T>)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.injected.inject_value(key, provider);
    }

    pub fn injected_values(&self) -> &MapBackedValueStore {
        &self.injected
    }

    pub fn add_listener(&mut self, listener: impl CommandCallListener + 'static) {
        self.listeners.push(Arc::new(listener));
    }

    /// Match `tokens` against the registry and bind every part.
    ///
    /// Values in `context` shadow values injected into the manager.
    pub fn parse<'a, S: AsRef<str>>(
        &'a self,
        context: &'a dyn InjectedValueAccess,
        tokens: &[S],
    ) -> Result<BoundInvocation<'a>, ParseError> {
        let tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        let span = tracing::debug_span!("parse", id = PARSE_IDS.fetch_add(1, Ordering::Relaxed));
        let _entered = span.enter();

        let root = self.root_command(&tokens)?;
        let host = self.invocation_context(context);
        let bound = {
            let mut parser = Parser::new(&self.converters, &self.config, &host, &tokens, root)?;
            parser.consume_all()?;
            parser.finish()?
        };
        tracing::debug!(path = ?bound.path_names(), bindings = bound.bindings.len(), "Parsed");

        Ok(BoundInvocation {
            parameters: CommandParameters::new(host, bound, tokens),
            listeners: &self.listeners,
        })
    }

    /// Parse and run `tokens` without caller-supplied values.
    pub fn execute<S: AsRef<str>>(&self, tokens: &[S]) -> Result<i32, CommandError> {
        self.execute_with(&EMPTY, tokens)
    }

    /// Parse and run `tokens`, resolving injected values from `context` first.
    pub fn execute_with<S: AsRef<str>>(
        &self,
        context: &dyn InjectedValueAccess,
        tokens: &[S],
    ) -> Result<i32, CommandError> {
        let invocation = self.parse(context, tokens)?;
        Ok(invocation.invoke()?)
    }

    /// Completions for the last token of `tokens`. Never fails.
    pub fn suggest<S: AsRef<str>>(
        &self,
        context: &dyn InjectedValueAccess,
        tokens: &[S],
    ) -> Vec<Suggestion> {
        let tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        let host = self.invocation_context(context);

        if tokens.len() <= 1 {
            let input = tokens.first().map(String::as_str).unwrap_or("");
            return suggestion::command_names(&self.commands, &host, input);
        }

        let (prefix, last) = tokens.split_at(tokens.len() - 1);
        let Ok(root) = self.root_command(prefix) else {
            return Vec::new();
        };
        let mut parser = match Parser::new(&self.converters, &self.config, &host, prefix, root) {
            Ok(parser) => parser,
            Err(err) => {
                tracing::trace!(error = %err, "No suggestions");
                return Vec::new();
            }
        };
        if let Err(err) = parser.consume_all() {
            tracing::trace!(error = %err, "No suggestions");
            return Vec::new();
        }
        suggestion::for_last_token(&parser, &last[0], prefix.len())
    }

    fn root_command(&self, tokens: &[String]) -> Result<Arc<Command>, ParseError> {
        let first = tokens.first().ok_or(ParseError::EmptyInput)?;
        self.commands
            .get(first)
            .cloned()
            .ok_or_else(|| ParseError::UnknownCommand {
                path: Vec::new(),
                name: first.clone(),
                options: self.command_names(),
            })
    }

    fn invocation_context<'a>(
        &'a self,
        context: &'a dyn InjectedValueAccess,
    ) -> MemoizingValueAccess<MergedValueAccess<'a>> {
        MemoizingValueAccess::wrap(MergedValueAccess::new([
            context,
            &self.injected as &dyn InjectedValueAccess,
        ]))
    }
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandManager")
            .field("commands", &self.command_names())
            .field("injected", &self.injected)
            .field("converters", &self.converters)
            .field("listeners", &self.listeners.len())
            .field("config", &self.config)
            .finish()
    }
}
