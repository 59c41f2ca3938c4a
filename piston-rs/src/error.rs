//! Error taxonomy.
//!
//! Parse errors are user-fixable and map to exit code 1; execution failures
//! come from host code and map to exit code 101.

use crate::converter::ConversionFailure;

/// A command definition that can never be parsed correctly.
#[derive(Debug, thiserror::Error)]
pub enum CommandBuildError {
    #[error("Invalid command name '{name}': names must be non-empty and contain no whitespace")]
    InvalidName { name: String },

    #[error("Command '{command}': required argument {part} follows an optional argument")]
    RequiredAfterOptional { command: String, part: String },

    #[error("Command '{command}': {part} is required and cannot declare defaults")]
    DefaultOnRequired { command: String, part: String },

    #[error("Command '{command}': variadic argument must be the last argument, found {part} after it")]
    VariadicNotLast { command: String, part: String },

    #[error("Command '{command}': flag '-{flag}' is declared twice")]
    DuplicateFlag { command: String, flag: char },

    #[error("Command '{command}': '{flag}' cannot be used as a flag")]
    InvalidFlag { command: String, flag: char },

    #[error("Command '{command}': part '{part}' is declared twice")]
    DuplicatePart { command: String, part: String },

    #[error("Command '{command}': the sub-command part must be the last part")]
    SubCommandNotLast { command: String },

    #[error("Command '{command}': sub-command part '{part}' has no commands")]
    EmptySubCommands { command: String, part: String },

    #[error("Command '{command}': sub-command name '{name}' is used twice")]
    DuplicateSubCommand { command: String, name: String },

    #[error("Command '{command}': no converter for {part} (type {type_name})")]
    MissingConverter {
        command: String,
        part: String,
        type_name: &'static str,
    },
}

/// Input that does not match the registered commands.
///
/// Every variant except [`ParseError::EmptyInput`] carries the path of command
/// names that was matched before the failure.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No command given")]
    EmptyInput,

    #[error("Unknown command '{name}'{}", options_hint(.options))]
    UnknownCommand {
        path: Vec<String>,
        name: String,
        options: Vec<String>,
    },

    #[error("You are not permitted to use '{}'", .path.join(" "))]
    ConditionFailed { path: Vec<String> },

    #[error("Missing {part} for '{}'", .path.join(" "))]
    MissingRequiredPart { path: Vec<String>, part: String },

    #[error("{failure} for {part}")]
    ConversionFailed {
        path: Vec<String>,
        part: String,
        failure: ConversionFailure,
    },

    #[error("Too many arguments for '{}': unexpected '{token}'", .path.join(" "))]
    UnknownArgument { path: Vec<String>, token: String },

    #[error("Unknown flag '-{flag}' for '{}'", .path.join(" "))]
    NoSuchFlag { path: Vec<String>, flag: char },

    #[error("Flag '-{flag}' takes a value and must be last in a combined flag group")]
    MisplacedArgFlag { path: Vec<String>, flag: char },
}

fn options_hint(options: &[String]) -> String {
    if options.is_empty() {
        String::new()
    } else {
        format!(", expected one of {}", options.join(", "))
    }
}

impl ParseError {
    /// Command names matched before the failure, outermost first.
    pub fn command_path(&self) -> &[String] {
        match self {
            ParseError::EmptyInput => &[],
            ParseError::UnknownCommand { path, .. }
            | ParseError::ConditionFailed { path }
            | ParseError::MissingRequiredPart { path, .. }
            | ParseError::ConversionFailed { path, .. }
            | ParseError::UnknownArgument { path, .. }
            | ParseError::NoSuchFlag { path, .. }
            | ParseError::MisplacedArgFlag { path, .. } => path,
        }
    }

    /// Usage form of the part that failed, when one is identified.
    pub fn part(&self) -> Option<&str> {
        match self {
            ParseError::MissingRequiredPart { part, .. }
            | ParseError::ConversionFailed { part, .. } => Some(part),
            _ => None,
        }
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::EmptyInput => "empty_input",
            ParseError::UnknownCommand { .. } => "unknown_command",
            ParseError::ConditionFailed { .. } => "condition_failed",
            ParseError::MissingRequiredPart { .. } => "missing_required_part",
            ParseError::ConversionFailed { .. } => "conversion_failed",
            ParseError::UnknownArgument { .. } => "unknown_argument",
            ParseError::NoSuchFlag { .. } => "no_such_flag",
            ParseError::MisplacedArgFlag { .. } => "misplaced_arg_flag",
        }
    }
}

/// The action of a successfully parsed command failed.
#[derive(Debug, thiserror::Error)]
#[error("Command '{}' failed: {source}", .command_path.join(" "))]
pub struct ExecutionError {
    pub command_path: Vec<String>,
    #[source]
    pub source: anyhow::Error,
}

/// Outcome of [`CommandManager::execute`](crate::CommandManager::execute) when no exit code was produced.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl CommandError {
    /// 1 for user-fixable input errors, 101 for failures inside the action.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Parse(_) => 1,
            CommandError::Execution(_) => 101,
        }
    }
}
