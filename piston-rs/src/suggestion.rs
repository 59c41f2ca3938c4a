//! Completion of partially typed input.

use crate::command::Command;
use crate::converter::suggestion::limit_by_prefix;
use crate::inject::InjectedValueAccess;
use crate::parser::Parser;
use crate::part::CommandPart;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// A completion for one input token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// Replacement text for the token.
    pub suggestion: String,
    /// Index of the token the suggestion replaces.
    pub replaced_argument: usize,
}

impl Suggestion {
    pub fn new(suggestion: impl Into<String>, replaced_argument: usize) -> Self {
        Self {
            suggestion: suggestion.into(),
            replaced_argument,
        }
    }
}

fn complete(
    choices: impl IntoIterator<Item = String>,
    input: &str,
    index: usize,
) -> Vec<Suggestion> {
    let mut choices: Vec<String> = choices.into_iter().collect();
    choices.sort();
    choices.dedup();
    limit_by_prefix(choices, input)
        .into_iter()
        .map(|choice| Suggestion::new(choice, index))
        .collect()
}

/// Top-level names whose command may currently be used.
pub(crate) fn command_names(
    commands: &HashMap<String, Arc<Command>>,
    context: &dyn InjectedValueAccess,
    input: &str,
) -> Vec<Suggestion> {
    let usable = commands
        .iter()
        .filter(|(_, command)| command.condition().satisfied(context))
        .map(|(name, _)| name.clone());
    complete(usable, input, 0)
}

/// Completions for `last`, given a parser that consumed every token before it.
pub(crate) fn for_last_token(parser: &Parser<'_>, last: &str, index: usize) -> Vec<Suggestion> {
    let command = parser.current_command();

    if let Some(part) = parser.pending_flag() {
        return converter_suggestions(parser, part, last, index);
    }

    if parser.flags_enabled() && last.starts_with('-') {
        let flags = unused_flags(parser, command);
        if !flags.is_empty() {
            let choices = flags
                .iter()
                .filter(|flag| !last.contains(**flag))
                .map(|flag| format!("{}{}", last, flag));
            let valid = last == "-"
                || last
                    .chars()
                    .skip(1)
                    .all(|c| command.layout().flags.contains_key(&c));
            if valid && !ends_with_arg_flag(command, last) {
                return complete(choices, last, index);
            }
        }
    }

    let mut suggestions = Vec::new();
    for part in parser.positional_candidates() {
        match part {
            CommandPart::SubCommand(sub) => {
                let names = sub
                    .commands()
                    .iter()
                    .filter(|candidate| candidate.condition().satisfied(parser.context()))
                    .flat_map(|candidate| {
                        candidate.all_names().map(String::from).collect::<Vec<_>>()
                    });
                suggestions.extend(complete(names, last, index));
            }
            _ => suggestions.extend(converter_suggestions(parser, part, last, index)),
        }
    }
    suggestions.dedup();
    suggestions
}

fn converter_suggestions(
    parser: &Parser<'_>,
    part: &CommandPart,
    last: &str,
    index: usize,
) -> Vec<Suggestion> {
    parser
        .converter_for(part)
        .map(|converter| {
            converter
                .suggestions(last)
                .into_iter()
                .map(|s| Suggestion::new(s, index))
                .collect()
        })
        .unwrap_or_default()
}

fn unused_flags(parser: &Parser<'_>, command: &Command) -> Vec<char> {
    let mut flags: Vec<(usize, char)> = command
        .layout()
        .flags
        .iter()
        .filter(|&(_, &index)| !parser.is_filled(index))
        .map(|(&flag, &index)| (index, flag))
        .collect();
    flags.sort();
    flags.into_iter().map(|(_, flag)| flag).collect()
}

fn ends_with_arg_flag(command: &Command, token: &str) -> bool {
    token
        .chars()
        .last()
        .and_then(|flag| command.layout().flags.get(&flag))
        .is_some_and(|&index| matches!(command.parts()[index], CommandPart::ArgFlag(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_sorts_and_filters() {
        let suggestions = complete(
            ["paste".to_string(), "copy".to_string(), "clip".to_string()],
            "c",
            0,
        );
        assert_eq!(
            suggestions,
            vec![Suggestion::new("clip", 0), Suggestion::new("copy", 0)]
        );
    }

    #[test]
    fn test_suggestion_serializes() {
        let json = serde_json::to_value(Suggestion::new("stone", 3)).unwrap();
        assert_eq!(json["suggestion"], "stone");
        assert_eq!(json["replaced_argument"], 3);
    }
}
