//! # Piston: command definition, parsing and dispatch
//!
//! Declare commands from typed parts, gate them with conditions, and run
//! them against tokenized input with host values injected by key.
//!
//! ## Core Principles
//!
//! - **Typed keys**: every argument and every host value lives under a [`Key<T>`]
//! - **Immutable definitions**: commands are validated once when built and never change
//! - **Lazy injection**: host values are computed on demand, at most once per invocation
//! - **Typed failures**: malformed input and failing actions are distinct errors
//!
//! ## Quick Start
//!
//! ```
//! use piston::{ArgFlag, Argument, CommandManager, Condition, Flag, Key, ValueProvider};
//! use piston::inject::InjectedValues;
//!
//! let actor = Key::<String>::named("actor");
//! let pattern = Key::<String>::named("pattern");
//! let mask = Key::<String>::named("mask");
//!
//! let mut manager = CommandManager::new();
//! manager.inject_value(actor.clone(), ValueProvider::constant("alex".to_string()));
//!
//! manager
//!     .register("copy", |cmd| {
//!         let (actor, pattern) = (actor.clone(), pattern.clone());
//!         cmd.alias("cp")
//!             .description("Copy the selection to the clipboard")
//!             .part(Flag::new('e', "Also copy entities"))
//!             .part(ArgFlag::builder('m', mask.clone(), "Source mask").build())
//!             .part(Argument::builder(pattern.clone(), "Blocks to copy").build())
//!             .condition(Condition::from_fn(|ctx| {
//!                 ctx.injected_value(&Key::<String>::named("actor"))
//!                     .ok()
//!                     .flatten()
//!                     .is_some()
//!             }))
//!             .action(move |params| {
//!                 let who = params.injected_value(&actor)?.unwrap_or_default();
//!                 let what = params.value(&pattern).unwrap_or_default();
//!                 println!("{who} copied {what}");
//!                 Ok(0)
//!             });
//!     })
//!     .unwrap();
//!
//! assert_eq!(manager.execute(&["cp", "-e", "stone"]).unwrap(), 0);
//! assert!(manager.execute(&["copy"]).is_err());
//! ```

pub mod command;
pub mod condition;
pub mod converter;
pub mod error;
pub mod inject;
pub mod listener;
pub mod manager;
pub mod parameters;
mod parser;
pub mod part;
pub mod report;
pub mod suggestion;
pub mod tracing_support;

// Re-export commonly used items
pub use command::{Action, Command, CommandBuilder};
pub use condition::{Condition, ConditionCheck, ConditionKind};
pub use converter::{ArgumentConverter, ArgumentConverterStore, ConversionFailure};
pub use error::{CommandBuildError, CommandError, ExecutionError, ParseError};
pub use inject::{
    InjectedValueAccess, InjectedValueStore, InjectedValues, Key, MapBackedValueStore,
    MemoizingValueAccess, ValueProvider, EMPTY,
};
pub use listener::{CommandCallListener, TracingListener};
pub use manager::{BoundInvocation, CommandManager, ManagerConfig};
pub use parameters::{ArgBinding, CommandParameters};
pub use part::{ArgFlag, Argument, CommandPart, Flag, SubCommandPart};
pub use report::ErrorReport;
pub use suggestion::Suggestion;

#[cfg(feature = "tracing")]
pub use tracing_support::{init_subscriber, init_subscriber_with_config};
pub use tracing_support::{TracingConfig, TracingFormat};
