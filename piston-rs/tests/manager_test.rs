//! End-to-end parsing and dispatch through `CommandManager`.

use parking_lot::Mutex;
use piston::converter::choice;
use piston::inject::InjectedValues;
use piston::{
    ArgFlag, Argument, Command, CommandCallListener, CommandError, CommandManager,
    CommandParameters, Condition, ConditionCheck, Flag, InjectedValueAccess, InjectedValueStore,
    Key, MapBackedValueStore, ParseError, SubCommandPart, Suggestion, ValueProvider, EMPTY,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn pattern() -> Key<String> {
    Key::named("pattern")
}

fn mask() -> Key<String> {
    Key::named("mask")
}

fn count() -> Key<u32> {
    Key::named("count")
}

/// `copy [-e] [-m <mask>] <pattern>` returning 1 when `-e` is set.
fn copy_manager() -> CommandManager {
    let mut manager = CommandManager::new();
    manager
        .register("copy", |cmd| {
            cmd.alias("cp")
                .part(Flag::new('e', "Copy entities"))
                .part(
                    ArgFlag::builder('m', mask(), "Source mask")
                        .converter(choice(["stone", "dirt", "sand"]))
                        .build(),
                )
                .part(Argument::builder(pattern(), "Blocks to copy").build())
                .action(|params| Ok(if params.flag('e') { 1 } else { 0 }));
        })
        .unwrap();
    manager
}

fn parse_err(manager: &CommandManager, input: &str) -> ParseError {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    match manager.parse(&EMPTY, &tokens) {
        Ok(invocation) => panic!("expected failure, parsed {:?}", invocation),
        Err(err) => err,
    }
}

#[test]
fn test_flag_and_required_argument() {
    let manager = copy_manager();

    let invocation = manager.parse(&EMPTY, &["copy", "-e", "stone"]).unwrap();
    let params = invocation.parameters();
    assert_eq!(params.value(&pattern()).as_deref(), Some("stone"));
    assert!(params.flag('e'));
    assert!(params.is_present("-e"));
    assert!(params.is_present("pattern"));

    let invocation = manager.parse(&EMPTY, &["copy", "stone"]).unwrap();
    assert!(!invocation.parameters().flag('e'));
    assert!(!invocation.parameters().is_present("-e"));

    match parse_err(&manager, "copy") {
        ParseError::MissingRequiredPart { path, part } => {
            assert_eq!(path, vec!["copy"]);
            assert_eq!(part, "<pattern>");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_execute_returns_action_code() {
    let manager = copy_manager();
    assert_eq!(manager.execute(&["cp", "-e", "stone"]).unwrap(), 1);
    assert_eq!(manager.execute(&["copy", "stone"]).unwrap(), 0);

    let err = manager.execute(&["copy"]).unwrap_err();
    assert!(matches!(err, CommandError::Parse(_)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_called_name_and_bindings() {
    let manager = copy_manager();
    let invocation = manager.parse(&EMPTY, &["cp", "-em", "dirt", "stone"]).unwrap();
    let params = invocation.parameters();

    assert_eq!(params.called_name(), "cp");
    assert_eq!(params.command().name(), "copy");
    assert_eq!(params.value(&mask()).as_deref(), Some("dirt"));
    assert_eq!(params.strings("-m"), ["dirt"]);

    let bound: Vec<(&str, Vec<&str>)> = params
        .bindings()
        .iter()
        .map(|b| (b.input.as_str(), b.parts.iter().map(String::as_str).collect()))
        .collect();
    assert_eq!(
        bound,
        vec![
            ("-em", vec!["-e", "-m"]),
            ("dirt", vec!["-m"]),
            ("stone", vec!["pattern"]),
        ]
    );
}

#[test]
fn test_false_condition_always_fails() {
    let mut manager = CommandManager::new();
    manager
        .register("locked", |cmd| {
            cmd.condition(Condition::FALSE)
                .part(Argument::builder(pattern(), "").build());
        })
        .unwrap();

    for input in ["locked stone", "locked", "locked a b c"] {
        match parse_err(&manager, input) {
            ParseError::ConditionFailed { path } => assert_eq!(path, vec!["locked"]),
            other => panic!("unexpected {other:?} for {input}"),
        }
    }
}

#[test]
fn test_sub_command_condition_attributed_to_sub() {
    let sub = Command::builder("sub")
        .condition(Condition::FALSE)
        .build()
        .unwrap();
    let mut manager = CommandManager::new();
    manager
        .register("test", |cmd| {
            cmd.condition(Condition::TRUE)
                .part(SubCommandPart::builder("action", "").command(sub).build());
        })
        .unwrap();

    match parse_err(&manager, "test sub") {
        ParseError::ConditionFailed { path } => assert_eq!(path, vec!["test", "sub"]),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_round_trip_binding() {
    let target = Key::<String>::named("target");
    let files = Key::<String>::named("files");

    let mut manager = CommandManager::new();
    manager
        .register("paste", |cmd| {
            cmd.part(Flag::new('a', "Skip air"))
                .part(ArgFlag::builder('r', Key::<i64>::named("rotate"), "Rotation").build())
                .part(Argument::builder(target.clone(), "Target").build())
                .part(Argument::builder(count(), "Copies").optional().build())
                .part(
                    Argument::builder(files.clone(), "Files")
                        .optional()
                        .variadic()
                        .build(),
                );
        })
        .unwrap();

    let invocation = manager
        .parse(&EMPTY, &["paste", "-a", "-r", "-90", "here", "3", "x.schem", "y.schem"])
        .unwrap();
    let params = invocation.parameters();
    assert!(params.flag('a'));
    assert_eq!(params.value(&Key::<i64>::named("rotate")), Some(-90));
    assert_eq!(params.value(&target).as_deref(), Some("here"));
    assert_eq!(params.value(&count()), Some(3));
    assert_eq!(params.values(&files), vec!["x.schem", "y.schem"]);
    assert!(params.trailing().is_empty());
}

#[test]
fn test_defaults_fill_missing_optionals() {
    let mut manager = CommandManager::new();
    manager
        .register("paste", |cmd| {
            cmd.part(
                ArgFlag::builder('m', mask(), "Mask")
                    .default_value("air")
                    .build(),
            )
            .part(
                Argument::builder(count(), "Copies")
                    .optional()
                    .default_value("1")
                    .build(),
            );
        })
        .unwrap();

    let invocation = manager.parse(&EMPTY, &["paste"]).unwrap();
    let params = invocation.parameters();
    assert_eq!(params.value(&count()), Some(1));
    assert_eq!(params.value(&mask()).as_deref(), Some("air"));
    assert!(!params.is_present("count"));
    assert_eq!(params.strings("count"), ["1"]);
}

#[test]
fn test_typed_flag_value_survives_argument_default() {
    let mut manager = CommandManager::new();
    manager
        .register("copy", |cmd| {
            cmd.part(ArgFlag::builder('m', mask(), "Mask").build()).part(
                Argument::builder(mask(), "Fallback mask")
                    .optional()
                    .default_value("air")
                    .build(),
            );
        })
        .unwrap();

    let invocation = manager.parse(&EMPTY, &["copy", "-m", "dirt"]).unwrap();
    let params = invocation.parameters();
    assert_eq!(params.value(&mask()).as_deref(), Some("dirt"));
    assert_eq!(params.values(&mask()), vec!["dirt", "air"]);
    assert_eq!(params.strings("-m"), ["dirt"]);
    assert_eq!(params.strings("mask"), ["air"]);

    let invocation = manager.parse(&EMPTY, &["copy"]).unwrap();
    assert_eq!(invocation.parameters().values(&mask()), vec!["air"]);
}

#[test]
fn test_values_from_several_levels_accumulate() {
    let item = Key::<String>::named("item");
    let more = Command::builder("more")
        .part(
            Argument::builder(item.clone(), "Extra item")
                .optional()
                .default_value("air")
                .build(),
        )
        .build()
        .unwrap();
    let mut manager = CommandManager::new();
    {
        let item = item.clone();
        manager
            .register("give", |cmd| {
                cmd.part(Argument::builder(item, "Item").build())
                    .part(SubCommandPart::builder("then", "").optional().command(more).build());
            })
            .unwrap();
    }

    let invocation = manager.parse(&EMPTY, &["give", "stone", "more", "dirt"]).unwrap();
    assert_eq!(invocation.parameters().values(&item), vec!["stone", "dirt"]);

    let invocation = manager.parse(&EMPTY, &["give", "stone", "more"]).unwrap();
    assert_eq!(invocation.parameters().values(&item), vec!["stone", "air"]);
}

#[test]
fn test_sub_command_sees_only_its_own_flag() {
    let sub = Command::builder("sub")
        .part(Flag::new('e', "Sub-command flag"))
        .action(|params| {
            let set = i32::from(params.flag('e'));
            let present = if params.is_present("-e") { 10 } else { 0 };
            Ok(set + present)
        })
        .build()
        .unwrap();
    let mut manager = CommandManager::new();
    manager
        .register("test", |cmd| {
            cmd.part(Flag::new('e', "Parent flag"))
                .part(SubCommandPart::builder("action", "").command(sub).build());
        })
        .unwrap();

    assert_eq!(manager.execute(&["test", "-e", "sub"]).unwrap(), 0);
    assert_eq!(manager.execute(&["test", "sub", "-e"]).unwrap(), 11);
    assert_eq!(manager.execute(&["test", "-e", "sub", "-e"]).unwrap(), 11);
    assert_eq!(manager.execute(&["test", "sub"]).unwrap(), 0);
}

#[test]
fn test_unknown_command_and_unknown_argument() {
    let manager = copy_manager();

    match parse_err(&manager, "cut stone") {
        ParseError::UnknownCommand { path, name, options } => {
            assert!(path.is_empty());
            assert_eq!(name, "cut");
            assert_eq!(options, vec!["copy", "cp"]);
        }
        other => panic!("unexpected {other:?}"),
    }

    match parse_err(&manager, "copy stone dirt") {
        ParseError::UnknownArgument { path, token } => {
            assert_eq!(path, vec!["copy"]);
            assert_eq!(token, "dirt");
        }
        other => panic!("unexpected {other:?}"),
    }

    assert!(matches!(
        manager.parse(&EMPTY, &[] as &[&str]).unwrap_err(),
        ParseError::EmptyInput
    ));
}

#[test]
fn test_conversion_failure_names_part() {
    let manager = copy_manager();
    match parse_err(&manager, "copy -m gravel stone") {
        ParseError::ConversionFailed { path, part, failure } => {
            assert_eq!(path, vec!["copy"]);
            assert_eq!(part, "[-m <mask>]");
            assert_eq!(failure.token, "gravel");
            assert_eq!(failure.acceptable, "stone|dirt|sand");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_trailing_input() {
    let mut manager = CommandManager::new();
    manager
        .register("say", |cmd| {
            cmd.part(Argument::builder(Key::<String>::named("target"), "").build())
                .allow_trailing_input(true);
        })
        .unwrap();

    let invocation = manager.parse(&EMPTY, &["say", "all", "hello", "there"]).unwrap();
    assert_eq!(invocation.parameters().trailing(), ["hello", "there"]);
}

#[test]
fn test_multi_level_commands() {
    let slot = Key::<String>::named("slot");
    let show = Command::builder("show")
        .alias("s")
        .part(Flag::new('v', "Verbose"))
        .action(|params| Ok(if params.flag('v') { 11 } else { 10 }))
        .build()
        .unwrap();
    let clear = Command::builder("clear").action(|_| Ok(20)).build().unwrap();

    let mut manager = CommandManager::new();
    manager
        .register("clip", |cmd| {
            cmd.part(
                Argument::builder(slot.clone(), "Slot")
                    .optional()
                    .default_value("main")
                    .build(),
            )
            .part(
                SubCommandPart::builder("action", "")
                    .command(show)
                    .command(clear)
                    .build(),
            );
        })
        .unwrap();

    assert_eq!(manager.execute(&["clip", "s", "-v"]).unwrap(), 11);
    assert_eq!(manager.execute(&["clip", "other", "clear"]).unwrap(), 20);

    let invocation = manager.parse(&EMPTY, &["clip", "show"]).unwrap();
    let params = invocation.parameters();
    let path: Vec<&str> = params.command_path().iter().map(|c| c.name()).collect();
    assert_eq!(path, vec!["clip", "show"]);
    assert_eq!(params.value(&slot).as_deref(), Some("main"));

    match parse_err(&manager, "clip") {
        ParseError::MissingRequiredPart { part, .. } => assert_eq!(part, "<show|clear>"),
        other => panic!("unexpected {other:?}"),
    }
}

#[derive(Clone, Default)]
struct RecordingListener {
    events: Arc<Mutex<Vec<String>>>,
}

impl CommandCallListener for RecordingListener {
    fn before_call(&self, command: &Command, _parameters: &CommandParameters<'_>) {
        self.events.lock().push(format!("before {}", command.name()));
    }

    fn after_call(&self, command: &Command, _parameters: &CommandParameters<'_>, result: i32) {
        self.events
            .lock()
            .push(format!("after {} = {}", command.name(), result));
    }

    fn after_throw(
        &self,
        command: &Command,
        _parameters: &CommandParameters<'_>,
        error: &anyhow::Error,
    ) {
        self.events
            .lock()
            .push(format!("throw {}: {}", command.name(), error));
    }
}

#[test]
fn test_listeners_observe_success_and_failure() {
    let listener = RecordingListener::default();
    let mut manager = CommandManager::new();
    manager.add_listener(listener.clone());
    manager
        .register("ok", |cmd| {
            cmd.action(|_| Ok(7));
        })
        .unwrap();
    manager
        .register("fail", |cmd| {
            cmd.action(|_| Err(anyhow::anyhow!("clipboard is empty")));
        })
        .unwrap();

    assert_eq!(manager.execute(&["ok"]).unwrap(), 7);
    let err = manager.execute(&["fail"]).unwrap_err();
    assert_eq!(err.exit_code(), 101);
    match err {
        CommandError::Execution(execution) => {
            assert_eq!(execution.command_path, vec!["fail"]);
            assert_eq!(execution.source.to_string(), "clipboard is empty");
        }
        other => panic!("unexpected {other:?}"),
    }

    // parse failures never reach listeners
    assert!(manager.execute(&["ok", "extra"]).is_err());

    assert_eq!(
        *listener.events.lock(),
        vec![
            "before ok",
            "after ok = 7",
            "before fail",
            "throw fail: clipboard is empty",
        ]
    );
}

#[test]
fn test_injected_values_reach_actions_and_conditions() {
    let actor = Key::<String>::named("actor");
    let mut manager = CommandManager::new();
    manager.inject_value(actor.clone(), ValueProvider::constant("server".to_string()));

    let condition_actor = actor.clone();
    let action_actor = actor.clone();
    manager
        .register("whoami", |cmd| {
            cmd.condition(Condition::from_fn(move |ctx| {
                ctx.injected_value(&condition_actor)
                    .ok()
                    .flatten()
                    .is_some_and(|name| name != "guest")
            }))
            .action(move |params| {
                let name = params.injected_value(&action_actor)?.unwrap_or_default();
                Ok(name.len() as i32)
            });
        })
        .unwrap();

    assert_eq!(manager.execute(&["whoami"]).unwrap(), 6);

    // caller values shadow the manager's
    let caller = MapBackedValueStore::new();
    caller.inject_value(actor.clone(), ValueProvider::constant("alexandra".to_string()));
    assert_eq!(manager.execute_with(&caller, &["whoami"]).unwrap(), 9);

    let guest = MapBackedValueStore::new();
    guest.inject_value(actor, ValueProvider::constant("guest".to_string()));
    assert!(matches!(
        manager.execute_with(&guest, &["whoami"]).unwrap_err(),
        CommandError::Parse(ParseError::ConditionFailed { .. })
    ));
}

#[test]
fn test_host_values_resolved_once_per_invocation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let world = Key::<String>::named("world");
    let manager = {
        let mut manager = CommandManager::new();
        let counter = Arc::clone(&calls);
        manager.inject_value(
            world.clone(),
            ValueProvider::from_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Some("overworld".to_string()))
            }),
        );
        let world = world.clone();
        manager
            .register("where", |cmd| {
                let gate = world.clone();
                cmd.condition(Condition::from_fn(move |ctx| {
                    matches!(ctx.injected_value(&gate), Ok(Some(_)))
                }))
                .action(move |params| {
                    let first = params.injected_value(&world)?;
                    let second = params.injected_value(&world)?;
                    assert_eq!(first, second);
                    Ok(0)
                });
            })
            .unwrap();
        manager
    };

    manager.execute(&["where"]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    manager.execute(&["where"]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

struct RequiresPermission(&'static str);

impl ConditionCheck for RequiresPermission {
    fn satisfied(&self, context: &dyn InjectedValueAccess) -> bool {
        context
            .injected_value(&Key::<Vec<String>>::named("permissions"))
            .ok()
            .flatten()
            .is_some_and(|granted| granted.iter().any(|p| p == self.0))
    }
}

#[test]
fn test_condition_introspection_after_failure() {
    let mut manager = CommandManager::new();
    manager
        .register("wipe", |cmd| {
            cmd.condition(Condition::check(RequiresPermission("clip.wipe")));
        })
        .unwrap();

    let err = parse_err(&manager, "wipe");
    assert!(matches!(err, ParseError::ConditionFailed { .. }));

    let command = manager.command("wipe").unwrap();
    let permission = command.condition().as_check::<RequiresPermission>().unwrap();
    assert_eq!(permission.0, "clip.wipe");

    let granted = MapBackedValueStore::new();
    granted.inject_value(
        Key::<Vec<String>>::named("permissions"),
        ValueProvider::constant(vec!["clip.wipe".to_string()]),
    );
    assert_eq!(manager.execute_with(&granted, &["wipe"]).unwrap(), 0);
}

#[test]
fn test_suggestions() {
    let mut manager = copy_manager();
    manager
        .register("clip", |cmd| {
            cmd.part(
                SubCommandPart::builder("action", "")
                    .command(Command::builder("show").build().unwrap())
                    .command(Command::builder("clear").build().unwrap())
                    .build(),
            );
        })
        .unwrap();
    manager
        .register("admin", |cmd| {
            cmd.condition(Condition::FALSE);
        })
        .unwrap();

    let names = |s: Vec<Suggestion>| s.into_iter().map(|s| s.suggestion).collect::<Vec<_>>();

    assert_eq!(names(manager.suggest(&EMPTY, &["c"])), vec!["clip", "copy", "cp"]);
    assert!(names(manager.suggest(&EMPTY, &[""])).iter().all(|n| n != "admin"));

    assert_eq!(names(manager.suggest(&EMPTY, &["clip", "c"])), vec!["clear"]);

    let flags = manager.suggest(&EMPTY, &["copy", "-"]);
    assert_eq!(names(flags.clone()), vec!["-e", "-m"]);
    assert!(flags.iter().all(|s| s.replaced_argument == 1));

    assert_eq!(names(manager.suggest(&EMPTY, &["copy", "-e"])), vec!["-em"]);
    assert_eq!(names(manager.suggest(&EMPTY, &["copy", "-m", "s"])), vec!["stone", "sand"]);
    assert_eq!(names(manager.suggest(&EMPTY, &["copy", "-e", "-m", "d"])), vec!["dirt"]);

    assert!(manager.suggest(&EMPTY, &["nothing", "x"]).is_empty());
    assert!(manager.suggest(&EMPTY, &["copy", "a", "b", ""]).is_empty());
}
