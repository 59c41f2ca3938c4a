//! Clipboard demo commands.

use anyhow::Context;
use piston::inject::InjectedValues;
use piston::{
    converter, ArgFlag, Argument, Command, CommandBuildError, CommandManager, Condition, Flag, Key,
    ManagerConfig, ValueProvider,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// One copied selection.
#[derive(Debug, Clone)]
pub struct Entry {
    pub pattern: String,
    pub mask: Option<String>,
    pub entities: bool,
}

/// Shared clipboard, injected into every invocation.
#[derive(Debug, Clone, Default)]
pub struct Clipboard(Arc<Mutex<Vec<Entry>>>);

impl Clipboard {
    fn with<R>(&self, f: impl FnOnce(&mut Vec<Entry>) -> R) -> R {
        f(&mut self.0.lock())
    }
}

pub fn clipboard_key() -> Key<Clipboard> {
    Key::named("clipboard")
}

pub fn actor_key() -> Key<String> {
    Key::named("actor")
}

fn clipboard(params: &piston::CommandParameters<'_>) -> anyhow::Result<Clipboard> {
    params
        .injected_value(&clipboard_key())?
        .context("no clipboard available")
}

fn not_guest() -> Condition {
    Condition::from_fn(|ctx| {
        ctx.injected_value(&actor_key())
            .ok()
            .flatten()
            .is_some_and(|actor| actor != "guest")
    })
}

/// Manager with `copy`, `paste` and `clip` registered against `board`.
pub fn build_manager(
    config: ManagerConfig,
    board: Clipboard,
    actor: String,
) -> Result<CommandManager, CommandBuildError> {
    let mut manager = CommandManager::with_config(config);
    manager.inject_value(clipboard_key(), ValueProvider::constant(board));
    manager.inject_value(actor_key(), ValueProvider::constant(actor));

    manager.register_command(copy()?)?;
    manager.register_command(paste()?)?;
    manager.register_command(clip()?)?;
    Ok(manager)
}

fn copy() -> Result<Command, CommandBuildError> {
    let pattern = Key::<String>::named("pattern");
    let mask = Key::<String>::named("mask");
    let (pattern_key, mask_key) = (pattern.clone(), mask.clone());

    Command::builder("copy")
        .alias("cp")
        .description("Copy blocks matching a pattern to the clipboard")
        .part(Flag::new('e', "Also copy entities"))
        .part(
            ArgFlag::builder('m', mask, "Only copy blocks matching this mask")
                .converter(converter::choice(["stone", "dirt", "sand", "air"]))
                .build(),
        )
        .part(Argument::builder(pattern, "Blocks to copy").build())
        .action(move |params| {
            let entry = Entry {
                pattern: params.value(&pattern_key).unwrap_or_default(),
                mask: params.value(&mask_key),
                entities: params.flag('e'),
            };
            println!("Copied {}", entry.pattern);
            clipboard(params)?.with(|entries| entries.push(entry));
            Ok(0)
        })
        .build()
}

fn paste() -> Result<Command, CommandBuildError> {
    let count = Key::<u32>::named("count");
    let rotate = Key::<i32>::named("rotate");
    let (count_key, rotate_key) = (count.clone(), rotate.clone());

    Command::builder("paste")
        .description("Paste the most recent clipboard entry")
        .footer("Fails when the clipboard is empty.")
        .part(Flag::new('a', "Skip air blocks"))
        .part(
            ArgFlag::builder('r', rotate, "Rotate by degrees")
                .argument_name("degrees")
                .default_value("0")
                .build(),
        )
        .part(
            Argument::builder(count, "Number of copies")
                .optional()
                .default_value("1")
                .build(),
        )
        .action(move |params| {
            let entry = clipboard(params)?
                .with(|entries| entries.last().cloned())
                .context("clipboard is empty")?;
            let copies = params.value(&count_key).unwrap_or(1);
            let degrees = params.value(&rotate_key).unwrap_or_default();
            for _ in 0..copies {
                println!(
                    "Pasted {}{}{} rotated {} degrees{}",
                    entry.pattern,
                    entry.mask.as_deref().map(|m| format!(" masked by {m}")).unwrap_or_default(),
                    if entry.entities { " with entities" } else { "" },
                    degrees,
                    if params.flag('a') { ", skipping air" } else { "" },
                );
            }
            Ok(0)
        })
        .build()
}

fn clip() -> Result<Command, CommandBuildError> {
    let show = Command::builder("show")
        .alias("list")
        .description("List clipboard entries")
        .action(|params| {
            let entries = clipboard(params)?.with(|entries| entries.clone());
            if entries.is_empty() {
                println!("Clipboard is empty");
            }
            for (index, entry) in entries.iter().enumerate() {
                println!("{index}: {}", entry.pattern);
            }
            Ok(0)
        })
        .build()?;

    let clear = Command::builder("clear")
        .description("Empty the clipboard")
        .condition(not_guest())
        .action(|params| {
            let removed = clipboard(params)?.with(|entries| entries.drain(..).count());
            println!("Removed {removed} entries");
            Ok(0)
        })
        .build()?;

    Command::builder("clip")
        .description("Inspect or clear the clipboard")
        .part(
            piston::SubCommandPart::builder("action", "What to do with the clipboard")
                .command(show)
                .command(clear)
                .build(),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use piston::CommandError;

    fn manager(actor: &str) -> (CommandManager, Clipboard) {
        let board = Clipboard::default();
        let manager =
            build_manager(ManagerConfig::default(), board.clone(), actor.to_string()).unwrap();
        (manager, board)
    }

    #[test]
    fn test_copy_then_paste() {
        let (manager, board) = manager("console");
        assert_eq!(manager.execute(&["cp", "-em", "dirt", "stone"]).unwrap(), 0);
        assert_eq!(manager.execute(&["paste", "-r", "90", "2"]).unwrap(), 0);

        let entries = board.with(|entries| entries.clone());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mask.as_deref(), Some("dirt"));
        assert!(entries[0].entities);
    }

    #[test]
    fn test_paste_on_empty_clipboard_fails_in_action() {
        let (manager, _) = manager("console");
        let err = manager.execute(&["paste"]).unwrap_err();
        assert!(matches!(err, CommandError::Execution(_)));
        assert_eq!(err.exit_code(), 101);
    }

    #[test]
    fn test_guest_cannot_clear() {
        let (manager, _) = manager("guest");
        let err = manager.execute(&["clip", "clear"]).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert_eq!(manager.execute(&["clip", "list"]).unwrap(), 0);
    }
}
