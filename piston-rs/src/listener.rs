//! Hooks around action invocation.

use crate::command::Command;
use crate::parameters::CommandParameters;

/// Observer of command invocations, for cross-cutting concerns such as
/// auditing or timing.
///
/// All hooks default to doing nothing. They run on the invoking thread, in
/// registration order.
pub trait CommandCallListener: Send + Sync {
    /// Called right before the action runs.
    fn before_call(&self, _command: &Command, _parameters: &CommandParameters<'_>) {}

    /// Called after the action returned `result`.
    fn after_call(&self, _command: &Command, _parameters: &CommandParameters<'_>, _result: i32) {}

    /// Called after the action failed, before the failure reaches the caller.
    fn after_throw(
        &self,
        _command: &Command,
        _parameters: &CommandParameters<'_>,
        _error: &anyhow::Error,
    ) {
    }
}

/// Listener that logs every invocation through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl CommandCallListener for TracingListener {
    fn before_call(&self, command: &Command, parameters: &CommandParameters<'_>) {
        tracing::info!(
            command = %command.name(),
            called = %parameters.called_name(),
            arguments = ?parameters.arguments(),
            "Invoking command"
        );
    }

    fn after_call(&self, command: &Command, _parameters: &CommandParameters<'_>, result: i32) {
        tracing::debug!(command = %command.name(), result, "Command finished");
    }

    fn after_throw(&self, command: &Command, _parameters: &CommandParameters<'_>, error: &anyhow::Error) {
        tracing::warn!(command = %command.name(), error = %error, "Command failed");
    }
}
