//! Token-by-token binding of input against a command tree.
//!
//! The parser walks the tokens once. At every command level it decides, per
//! token, whether the token is a flag group, the value of an argument-taking
//! flag, a positional argument, or the name of a sub-command. Entering a
//! command (top level or nested) evaluates its condition first; leaving a
//! level checks required parts and applies defaults.

use crate::command::Command;
use crate::converter::{ArgumentConverterStore, ConversionFailure, SharedConverter};
use crate::error::ParseError;
use crate::inject::{erase, AnyValue, InjectedValueAccess};
use crate::manager::ManagerConfig;
use crate::parameters::Bound;
use crate::part::CommandPart;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// Parsing state of the innermost command reached so far.
struct Level {
    command: Arc<Command>,
    /// Index into the command's argument list of the next unbound argument.
    next_argument: usize,
    flags_enabled: bool,
    open_variadic: Option<usize>,
    last_failed_optional: Option<(String, ConversionFailure)>,
    /// Parts of this command that received input.
    filled: HashSet<usize>,
    /// Argument-taking flag whose value had not been typed yet.
    pending_flag: Option<usize>,
}

impl Level {
    fn new(command: Arc<Command>) -> Self {
        Self {
            command,
            next_argument: 0,
            flags_enabled: true,
            open_variadic: None,
            last_failed_optional: None,
            filled: HashSet::new(),
            pending_flag: None,
        }
    }
}

pub(crate) struct Parser<'p> {
    converters: &'p ArgumentConverterStore,
    config: &'p ManagerConfig,
    context: &'p dyn InjectedValueAccess,
    tokens: &'p [String],
    position: usize,
    bound: Bound,
    level: Level,
}

impl<'p> Parser<'p> {
    /// Enter `root`, which was named by the first token.
    pub(crate) fn new(
        converters: &'p ArgumentConverterStore,
        config: &'p ManagerConfig,
        context: &'p dyn InjectedValueAccess,
        tokens: &'p [String],
        root: Arc<Command>,
    ) -> Result<Self, ParseError> {
        let called = tokens.first().cloned().unwrap_or_else(|| root.name().to_string());
        let mut parser = Self {
            converters,
            config,
            context,
            tokens,
            position: 1,
            bound: Bound::default(),
            level: Level::new(Arc::clone(&root)),
        };
        parser.enter(root, called)?;
        Ok(parser)
    }

    /// Bind every remaining token.
    pub(crate) fn consume_all(&mut self) -> Result<(), ParseError> {
        let tokens = self.tokens;
        while self.position < tokens.len() {
            let position = self.position;
            let token = tokens[position].as_str();
            self.position += 1;

            if self.level.flags_enabled && self.config.flag_terminator && token == "--" {
                trace!(position, "flag matching disabled");
                self.level.flags_enabled = false;
            } else if self.is_flag_group(token) {
                self.consume_flags(position, token)?;
            } else {
                self.consume_positional(position, token)?;
            }
        }
        Ok(())
    }

    /// Close the innermost level and hand over everything bound.
    pub(crate) fn finish(mut self) -> Result<Bound, ParseError> {
        self.close_level(false)?;
        Ok(self.bound)
    }

    fn path(&self) -> Vec<String> {
        self.bound.path_names()
    }

    fn enter(&mut self, command: Arc<Command>, called: String) -> Result<(), ParseError> {
        self.bound.path.push(Arc::clone(&command));
        self.bound.called_names.push(called);
        if !command.condition().satisfied(self.context) {
            debug!(command = %command.name(), "condition not satisfied");
            return Err(ParseError::ConditionFailed { path: self.path() });
        }
        trace!(command = %command.name(), "entered command");
        self.bound.shadow_flags_of(&command);
        self.level = Level::new(command);
        Ok(())
    }

    fn is_flag_group(&self, token: &str) -> bool {
        is_flag_group(&self.level.command, self.config, self.level.flags_enabled, token)
    }

    fn consume_flags(&mut self, position: usize, token: &str) -> Result<(), ParseError> {
        let command = Arc::clone(&self.level.command);
        let tokens = self.tokens;
        let flags: Vec<char> = token.chars().skip(1).collect();

        for (offset, flag) in flags.iter().enumerate() {
            let Some(&index) = command.layout().flags.get(flag) else {
                continue;
            };
            let part = &command.parts()[index];
            match part {
                CommandPart::Flag(marker) => {
                    trace!(flag = %flag, "flag set");
                    self.bound
                        .values
                        .insert(marker.key().clone(), vec![erase(true)]);
                    self.mark_present(index, part, position, token);
                }
                CommandPart::ArgFlag(_) => {
                    if offset + 1 < flags.len() {
                        return Err(ParseError::MisplacedArgFlag {
                            path: self.path(),
                            flag: *flag,
                        });
                    }
                    self.bound.bind(position, token, part.name());
                    if self.position >= tokens.len() {
                        debug!(flag = %flag, "flag value missing");
                        self.level.pending_flag = Some(index);
                        return Ok(());
                    }
                    // the next token is the value even when it looks like a flag
                    let value_position = self.position;
                    self.position += 1;
                    let value = tokens[value_position].as_str();
                    let values = self
                        .convert(part, value)
                        .map_err(|failure| self.conversion_failed(part, failure))?;
                    self.store(index, part, value_position, value, values);
                }
                CommandPart::Argument(_) | CommandPart::SubCommand(_) => {}
            }
        }
        Ok(())
    }

    fn consume_positional(&mut self, position: usize, token: &str) -> Result<(), ParseError> {
        let command = Arc::clone(&self.level.command);
        let layout = command.layout();

        if let Some(index) = self.level.open_variadic {
            let part = &command.parts()[index];
            match self.convert(part, token) {
                Ok(values) => {
                    self.store(index, part, position, token, values);
                    return Ok(());
                }
                Err(failure) => {
                    trace!(token, "variadic argument closed");
                    self.level.open_variadic = None;
                    self.level.last_failed_optional = Some((part.text_representation(), failure));
                }
            }
        }

        let names_sub_command = layout.sub_command_table.contains_key(token);
        while let Some(&index) = layout.arguments.get(self.level.next_argument) {
            let part = &command.parts()[index];
            let variadic = matches!(part, CommandPart::Argument(arg) if arg.is_variadic());

            if part.is_required() {
                let values = self
                    .convert(part, token)
                    .map_err(|failure| self.conversion_failed(part, failure))?;
                self.level.next_argument += 1;
                self.store(index, part, position, token, values);
                if variadic {
                    self.level.open_variadic = Some(index);
                }
                return Ok(());
            }

            if names_sub_command || !self.optional_has_room(position) {
                trace!(part = %part.name(), "optional argument skipped");
                self.level.next_argument += 1;
                continue;
            }

            match self.convert(part, token) {
                Ok(values) => {
                    self.level.next_argument += 1;
                    self.store(index, part, position, token, values);
                    if variadic {
                        self.level.open_variadic = Some(index);
                    }
                    return Ok(());
                }
                Err(failure) => {
                    trace!(part = %part.name(), token, "optional argument rejected token");
                    self.level.next_argument += 1;
                    self.level.last_failed_optional = Some((part.text_representation(), failure));
                }
            }
        }

        if let Some(sub_index) = layout.sub_commands {
            if let Some(sub) = layout.sub_command_table.get(token) {
                return self.enter_sub_command(sub_index, Arc::clone(sub), position, token);
            }
        }

        if let Some(flag) = self.undeclared_flag(token) {
            return Err(ParseError::NoSuchFlag {
                path: self.path(),
                flag,
            });
        }

        if let Some(sub_index) = layout.sub_commands {
            if command.parts()[sub_index].is_required() {
                return Err(ParseError::UnknownCommand {
                    path: self.path(),
                    name: token.to_string(),
                    options: sub_command_names(&command, sub_index),
                });
            }
        }

        if command.allows_trailing_input() {
            trace!(token, "trailing input");
            self.bound.trailing.push(token.to_string());
            return Ok(());
        }

        if let Some((part, failure)) = self.level.last_failed_optional.take() {
            return Err(ParseError::ConversionFailed {
                path: self.path(),
                part,
                failure,
            });
        }

        Err(ParseError::UnknownArgument {
            path: self.path(),
            token: token.to_string(),
        })
    }

    fn enter_sub_command(
        &mut self,
        part_index: usize,
        sub: Arc<Command>,
        position: usize,
        token: &str,
    ) -> Result<(), ParseError> {
        self.close_level(true)?;
        let command = Arc::clone(&self.level.command);
        let part = &command.parts()[part_index];
        self.bound.present.insert(part.name().to_string());
        self.bound
            .strings
            .entry(part.name().to_string())
            .or_default()
            .push(token.to_string());
        self.bound.bind(position, token, part.name());
        debug!(parent = %command.name(), command = %sub.name(), "sub-command selected");
        self.enter(sub, token.to_string())
    }

    /// Whether an optional argument may take the token at `from` and still
    /// leave enough positional tokens for the required parts after it.
    fn optional_has_room(&self, from: usize) -> bool {
        let command = &self.level.command;
        let layout = command.layout();
        let required_after = layout
            .arguments
            .iter()
            .skip(self.level.next_argument + 1)
            .filter(|&&index| command.parts()[index].is_required())
            .count()
            + layout
                .sub_commands
                .filter(|&index| command.parts()[index].is_required())
                .map_or(0, |_| 1);
        self.count_positional(from) > required_after
    }

    fn count_positional(&self, from: usize) -> usize {
        let command = &self.level.command;
        let mut flags_enabled = self.level.flags_enabled;
        let mut count = 0;
        let mut tokens = self.tokens.iter().skip(from);
        while let Some(token) = tokens.next() {
            if flags_enabled && self.config.flag_terminator && token == "--" {
                flags_enabled = false;
            } else if is_flag_group(command, self.config, flags_enabled, token) {
                let takes_value = token
                    .chars()
                    .last()
                    .and_then(|flag| command.layout().flags.get(&flag))
                    .is_some_and(|&index| matches!(command.parts()[index], CommandPart::ArgFlag(_)));
                if takes_value {
                    tokens.next();
                }
            } else {
                count += 1;
            }
        }
        count
    }

    /// First undeclared flag of a token that looks like a flag group.
    fn undeclared_flag(&self, token: &str) -> Option<char> {
        if !self.level.flags_enabled {
            return None;
        }
        let rest = token.strip_prefix('-')?;
        if !rest.chars().next()?.is_alphabetic() {
            return None;
        }
        let flags = &self.level.command.layout().flags;
        rest.chars().find(|flag| !flags.contains_key(flag))
    }

    /// Check required parts of the innermost level and apply defaults.
    fn close_level(&mut self, sub_command_chosen: bool) -> Result<(), ParseError> {
        let command = Arc::clone(&self.level.command);
        let parts = command.parts();
        let flags = parts
            .iter()
            .enumerate()
            .filter(|(_, p)| matches!(p, CommandPart::Flag(_) | CommandPart::ArgFlag(_)));
        let arguments = parts
            .iter()
            .enumerate()
            .filter(|(_, p)| matches!(p, CommandPart::Argument(_)));

        for (index, part) in flags.chain(arguments) {
            if self.level.filled.contains(&index) {
                continue;
            }
            if let CommandPart::Flag(marker) = part {
                self.bound
                    .values
                    .entry(marker.key().clone())
                    .or_insert_with(|| vec![erase(false)]);
                continue;
            }
            if part.is_required() {
                return Err(ParseError::MissingRequiredPart {
                    path: self.path(),
                    part: part.text_representation(),
                });
            }
            self.apply_defaults(part)?;
        }

        if let Some(index) = command.layout().sub_commands {
            if !sub_command_chosen && parts[index].is_required() {
                return Err(ParseError::MissingRequiredPart {
                    path: self.path(),
                    part: parts[index].text_representation(),
                });
            }
        }
        Ok(())
    }

    fn apply_defaults(&mut self, part: &CommandPart) -> Result<(), ParseError> {
        let Some((key, _)) = part.value_spec() else {
            return Ok(());
        };
        if part.defaults().is_empty() {
            return Ok(());
        }
        let mut values = Vec::new();
        for default in part.defaults() {
            values.extend(
                self.convert(part, default)
                    .map_err(|failure| self.conversion_failed(part, failure))?,
            );
        }
        debug!(part = %part.name(), defaults = ?part.defaults(), "defaults applied");
        self.bound.values.entry(key.clone()).or_default().extend(values);
        self.bound
            .strings
            .entry(part.name().to_string())
            .or_default()
            .extend(part.defaults().iter().cloned());
        Ok(())
    }

    pub(crate) fn converter_for(&self, part: &CommandPart) -> Option<SharedConverter> {
        let (key, explicit) = part.value_spec()?;
        explicit
            .cloned()
            .or_else(|| self.converters.get(key.type_id()))
    }

    fn convert(&self, part: &CommandPart, token: &str) -> Result<Vec<AnyValue>, ConversionFailure> {
        match self.converter_for(part) {
            Some(converter) => converter.convert_erased(token),
            None => {
                let type_name = part.value_spec().map_or("?", |(key, _)| key.type_name());
                Err(ConversionFailure::new(token, "nothing")
                    .with_reason(format!("no converter registered for {}", type_name)))
            }
        }
    }

    fn conversion_failed(&self, part: &CommandPart, failure: ConversionFailure) -> ParseError {
        ParseError::ConversionFailed {
            path: self.path(),
            part: part.text_representation(),
            failure,
        }
    }

    fn store(
        &mut self,
        index: usize,
        part: &CommandPart,
        position: usize,
        token: &str,
        values: Vec<AnyValue>,
    ) {
        trace!(part = %part.name(), token, count = values.len(), "bound");
        if let Some((key, _)) = part.value_spec() {
            self.bound.values.entry(key.clone()).or_default().extend(values);
        }
        self.bound
            .strings
            .entry(part.name().to_string())
            .or_default()
            .push(token.to_string());
        self.mark_present(index, part, position, token);
    }

    fn mark_present(&mut self, index: usize, part: &CommandPart, position: usize, token: &str) {
        self.level.filled.insert(index);
        self.bound.present.insert(part.name().to_string());
        self.bound.bind(position, token, part.name());
    }

    // State inspected by the completion engine after a partial parse.

    pub(crate) fn current_command(&self) -> &Arc<Command> {
        &self.level.command
    }

    pub(crate) fn flags_enabled(&self) -> bool {
        self.level.flags_enabled
    }

    pub(crate) fn context(&self) -> &'p dyn InjectedValueAccess {
        self.context
    }

    pub(crate) fn is_filled(&self, index: usize) -> bool {
        self.level.filled.contains(&index)
    }

    /// Argument-taking flag still waiting for its value.
    pub(crate) fn pending_flag(&self) -> Option<&CommandPart> {
        self.level
            .pending_flag
            .map(|index| &self.level.command.parts()[index])
    }

    /// Positional parts that could take the next token, in order: an open
    /// variadic argument, the following arguments up to and including the
    /// next required one, then the sub-command slot if it is reachable.
    pub(crate) fn positional_candidates(&self) -> Vec<&CommandPart> {
        let command = &self.level.command;
        let layout = command.layout();
        let mut candidates = Vec::new();
        if let Some(index) = self.level.open_variadic {
            candidates.push(&command.parts()[index]);
        }
        let mut reached_end = true;
        for &index in layout.arguments.iter().skip(self.level.next_argument) {
            let part = &command.parts()[index];
            candidates.push(part);
            if part.is_required() {
                reached_end = false;
                break;
            }
        }
        if reached_end {
            if let Some(index) = layout.sub_commands {
                candidates.push(&command.parts()[index]);
            }
        }
        candidates
    }
}

fn is_flag_group(command: &Command, config: &ManagerConfig, flags_enabled: bool, token: &str) -> bool {
    if !flags_enabled {
        return false;
    }
    let Some(rest) = token.strip_prefix('-') else {
        return false;
    };
    let count = rest.chars().count();
    if count == 0 || (count > 1 && !config.combined_flags) {
        return false;
    }
    let flags = &command.layout().flags;
    rest.chars().all(|flag| flags.contains_key(&flag))
}

fn sub_command_names(command: &Command, part_index: usize) -> Vec<String> {
    match &command.parts()[part_index] {
        CommandPart::SubCommand(sub) => sub
            .commands()
            .iter()
            .map(|c| c.name().to_string())
            .collect(),
        _ => Vec::new(),
    }
}
