//! Immutable command definitions and their builder.

use crate::condition::Condition;
use crate::error::CommandBuildError;
use crate::parameters::CommandParameters;
use crate::part::CommandPart;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Action invoked with the bound parameters of a fully parsed command.
pub type Action = Arc<dyn Fn(&CommandParameters<'_>) -> anyhow::Result<i32> + Send + Sync>;

/// A built command. Never mutated once built; share it through `Arc`.
pub struct Command {
    name: String,
    aliases: Vec<String>,
    description: String,
    footer: Option<String>,
    parts: Vec<CommandPart>,
    condition: Condition,
    action: Action,
    allow_trailing_input: bool,
    layout: Layout,
}

/// Lookup tables derived from the part list.
pub(crate) struct Layout {
    pub(crate) flags: HashMap<char, usize>,
    pub(crate) arguments: Vec<usize>,
    pub(crate) sub_commands: Option<usize>,
    pub(crate) sub_command_table: HashMap<String, Arc<Command>>,
}

impl Command {
    pub fn builder(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Name followed by every alias.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn footer(&self) -> Option<&str> {
        self.footer.as_deref()
    }

    pub fn parts(&self) -> &[CommandPart] {
        &self.parts
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn allows_trailing_input(&self) -> bool {
        self.allow_trailing_input
    }

    /// One-line usage, e.g. `copy [-e] [-m <mask>] <pattern>`.
    pub fn usage(&self) -> String {
        std::iter::once(self.name.clone())
            .chain(self.parts.iter().map(CommandPart::text_representation))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Nested command reachable from this one by `name` (or alias).
    pub fn sub_command(&self, name: &str) -> Option<&Arc<Command>> {
        self.layout.sub_command_table.get(name)
    }

    /// Builder pre-filled with this command's definition.
    pub fn to_builder(&self) -> CommandBuilder {
        CommandBuilder {
            name: self.name.clone(),
            aliases: self.aliases.clone(),
            description: self.description.clone(),
            footer: self.footer.clone(),
            parts: self.parts.clone(),
            condition: self.condition.clone(),
            action: Some(Arc::clone(&self.action)),
            allow_trailing_input: self.allow_trailing_input,
        }
    }

    pub(crate) fn layout(&self) -> &Layout {
        &self.layout
    }

    /// This command and every nested command, depth first.
    pub(crate) fn walk(&self, visit: &mut dyn FnMut(&Command)) {
        visit(self);
        if let Some(index) = self.layout.sub_commands {
            if let CommandPart::SubCommand(sub) = &self.parts[index] {
                for command in sub.commands() {
                    command.walk(visit);
                }
            }
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("parts", &self.parts)
            .field("condition", &self.condition)
            .finish_non_exhaustive()
    }
}

/// Mutable builder for [`Command`].
///
/// Setters take `&mut self` so the builder can be configured both in a chain
/// and through the configurator closure of [`CommandManager::register`].
///
/// ```
/// use piston::{Argument, Command, Flag, Key};
///
/// let pattern = Key::<String>::named("pattern");
/// let command = Command::builder("copy")
///     .alias("cp")
///     .description("Copy the selection")
///     .part(Flag::new('e', "Copy entities"))
///     .part(Argument::builder(pattern, "Blocks to copy").build())
///     .action(|_| Ok(1))
///     .build()
///     .unwrap();
///
/// assert_eq!(command.usage(), "copy [-e] <pattern>");
/// ```
///
/// [`CommandManager::register`]: crate::CommandManager::register
#[derive(Clone)]
pub struct CommandBuilder {
    name: String,
    aliases: Vec<String>,
    description: String,
    footer: Option<String>,
    parts: Vec<CommandPart>,
    condition: Condition,
    action: Option<Action>,
    allow_trailing_input: bool,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            footer: None,
            parts: Vec::new(),
            condition: Condition::TRUE,
            action: None,
            allow_trailing_input: false,
        }
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn alias(&mut self, alias: impl Into<String>) -> &mut Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(&mut self, aliases: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    pub fn footer(&mut self, footer: impl Into<String>) -> &mut Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn part(&mut self, part: CommandPart) -> &mut Self {
        self.parts.push(part);
        self
    }

    pub fn parts(&mut self, parts: impl IntoIterator<Item = CommandPart>) -> &mut Self {
        self.parts.extend(parts);
        self
    }

    pub fn condition(&mut self, condition: Condition) -> &mut Self {
        self.condition = condition;
        self
    }

    pub fn action<F>(&mut self, action: F) -> &mut Self
    where
        F: Fn(&CommandParameters<'_>) -> anyhow::Result<i32> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Collect unmatched positional tokens instead of rejecting them.
    pub fn allow_trailing_input(&mut self, allow: bool) -> &mut Self {
        self.allow_trailing_input = allow;
        self
    }

    /// Validate the part list and produce the immutable command.
    ///
    /// Commands without an action succeed with code `0`.
    pub fn build(&self) -> Result<Command, CommandBuildError> {
        let name = self.name.clone();
        for candidate in std::iter::once(&self.name).chain(&self.aliases) {
            if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
                return Err(CommandBuildError::InvalidName {
                    name: candidate.clone(),
                });
            }
        }

        let layout = self.validate()?;
        let action = self
            .action
            .clone()
            .unwrap_or_else(|| Arc::new(|_: &CommandParameters<'_>| -> anyhow::Result<i32> { Ok(0) }));

        Ok(Command {
            name,
            aliases: self.aliases.clone(),
            description: self.description.clone(),
            footer: self.footer.clone(),
            parts: self.parts.clone(),
            condition: self.condition.clone(),
            action,
            allow_trailing_input: self.allow_trailing_input,
            layout,
        })
    }

    fn validate(&self) -> Result<Layout, CommandBuildError> {
        let command = &self.name;
        let mut layout = Layout {
            flags: HashMap::new(),
            arguments: Vec::new(),
            sub_commands: None,
            sub_command_table: HashMap::new(),
        };
        let mut names = HashSet::new();
        let mut seen_optional = false;
        let mut seen_variadic = false;

        for (index, part) in self.parts.iter().enumerate() {
            let is_flag = matches!(part, CommandPart::Flag(_) | CommandPart::ArgFlag(_));
            if !is_flag && !names.insert(part.name().to_string()) {
                return Err(CommandBuildError::DuplicatePart {
                    command: command.clone(),
                    part: part.name().to_string(),
                });
            }
            if layout.sub_commands.is_some() {
                return Err(CommandBuildError::SubCommandNotLast {
                    command: command.clone(),
                });
            }
            if !part.defaults().is_empty() && part.is_required() {
                return Err(CommandBuildError::DefaultOnRequired {
                    command: command.clone(),
                    part: part.text_representation(),
                });
            }

            match part {
                CommandPart::Argument(arg) => {
                    if seen_variadic {
                        return Err(CommandBuildError::VariadicNotLast {
                            command: command.clone(),
                            part: part.text_representation(),
                        });
                    }
                    if part.is_required() && seen_optional {
                        return Err(CommandBuildError::RequiredAfterOptional {
                            command: command.clone(),
                            part: part.text_representation(),
                        });
                    }
                    seen_optional |= !part.is_required();
                    seen_variadic |= arg.is_variadic();
                    layout.arguments.push(index);
                }
                CommandPart::Flag(flag) => {
                    register_flag(&mut layout, command, flag.flag(), index)?;
                }
                CommandPart::ArgFlag(flag) => {
                    register_flag(&mut layout, command, flag.flag(), index)?;
                }
                CommandPart::SubCommand(sub) => {
                    if sub.commands().is_empty() {
                        return Err(CommandBuildError::EmptySubCommands {
                            command: command.clone(),
                            part: part.name().to_string(),
                        });
                    }
                    for candidate in sub.commands() {
                        for alias in candidate.all_names() {
                            let previous = layout
                                .sub_command_table
                                .insert(alias.to_string(), Arc::clone(candidate));
                            if previous.is_some() {
                                return Err(CommandBuildError::DuplicateSubCommand {
                                    command: command.clone(),
                                    name: alias.to_string(),
                                });
                            }
                        }
                    }
                    layout.sub_commands = Some(index);
                }
            }
        }

        Ok(layout)
    }
}

fn register_flag(
    layout: &mut Layout,
    command: &str,
    flag: char,
    index: usize,
) -> Result<(), CommandBuildError> {
    if flag == '-' || flag.is_whitespace() {
        return Err(CommandBuildError::InvalidFlag {
            command: command.to_string(),
            flag,
        });
    }
    if layout.flags.insert(flag, index).is_some() {
        return Err(CommandBuildError::DuplicateFlag {
            command: command.to_string(),
            flag,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::Key;
    use crate::part::{ArgFlag, Argument, Flag, SubCommandPart};

    fn pattern() -> CommandPart {
        Argument::builder(Key::<String>::named("pattern"), "Pattern").build()
    }

    fn count() -> CommandPart {
        Argument::builder(Key::<u32>::named("count"), "Count")
            .optional()
            .build()
    }

    #[test]
    fn test_usage_lists_parts_in_order() {
        let command = Command::builder("copy")
            .part(Flag::new('e', "Entities"))
            .part(ArgFlag::builder('m', Key::<String>::named("mask"), "Mask").build())
            .part(pattern())
            .build()
            .unwrap();
        assert_eq!(command.usage(), "copy [-e] [-m <mask>] <pattern>");
        assert_eq!(command.layout().flags.len(), 2);
        assert_eq!(command.layout().arguments, vec![2]);
    }

    #[test]
    fn test_required_after_optional_rejected() {
        let err = Command::builder("bad")
            .part(count())
            .part(pattern())
            .build()
            .unwrap_err();
        assert!(matches!(err, CommandBuildError::RequiredAfterOptional { .. }));
    }

    #[test]
    fn test_default_on_required_rejected() {
        let part = Argument::builder(Key::<String>::named("x"), "")
            .default_value("y")
            .build();
        let err = Command::builder("bad").part(part).build().unwrap_err();
        assert!(matches!(err, CommandBuildError::DefaultOnRequired { .. }));
    }

    #[test]
    fn test_duplicate_flag_rejected() {
        let err = Command::builder("bad")
            .part(Flag::new('e', "one"))
            .part(ArgFlag::builder('e', Key::<String>::named("e2"), "two").build())
            .build()
            .unwrap_err();
        assert!(matches!(err, CommandBuildError::DuplicateFlag { flag: 'e', .. }));
    }

    #[test]
    fn test_dash_is_not_a_flag() {
        let err = Command::builder("bad")
            .part(Flag::new('-', "dash"))
            .build()
            .unwrap_err();
        assert!(matches!(err, CommandBuildError::InvalidFlag { .. }));
    }

    #[test]
    fn test_variadic_must_be_last_argument() {
        let files = Argument::builder(Key::<String>::named("files"), "")
            .variadic()
            .build();
        let err = Command::builder("bad")
            .part(files)
            .part(pattern())
            .build()
            .unwrap_err();
        assert!(matches!(err, CommandBuildError::VariadicNotLast { .. }));
    }

    #[test]
    fn test_sub_command_part_rules() {
        let leaf = Command::builder("sub").build().unwrap();
        let slot = SubCommandPart::builder("action", "Action")
            .command(leaf)
            .build();

        let err = Command::builder("bad")
            .part(slot.clone())
            .part(pattern())
            .build()
            .unwrap_err();
        assert!(matches!(err, CommandBuildError::SubCommandNotLast { .. }));

        let empty = SubCommandPart::builder("action", "Action").build();
        let err = Command::builder("bad").part(empty).build().unwrap_err();
        assert!(matches!(err, CommandBuildError::EmptySubCommands { .. }));

        let ok = Command::builder("test").part(slot).build().unwrap();
        assert!(ok.sub_command("sub").is_some());
        assert_eq!(ok.usage(), "test <sub>");
    }

    #[test]
    fn test_invalid_names_rejected() {
        assert!(Command::builder("").build().is_err());
        assert!(Command::builder("two words").build().is_err());
        assert!(Command::builder("ok").alias("no t").build().is_err());
    }

    #[test]
    fn test_to_builder_round_trip() {
        let command = Command::builder("copy")
            .alias("cp")
            .footer("See also: paste")
            .part(pattern())
            .build()
            .unwrap();
        let rebuilt = command.to_builder().alias("c").build().unwrap();
        assert_eq!(rebuilt.aliases(), ["cp", "c"]);
        assert_eq!(rebuilt.footer(), Some("See also: paste"));
        assert_eq!(rebuilt.usage(), command.usage());
    }
}
