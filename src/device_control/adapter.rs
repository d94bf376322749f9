//! The capability contract every vendor adapter implements.

use futures::FutureExt;
use futures::future::BoxFuture;

use super::types::{AdapterDescriptor, CommandResult, Target};
use crate::error::ControlError;

/// Full replacement for HTTP command delivery, used by in-process adapters
pub trait CommandHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        command: &'a str,
        target: &'a Target,
    ) -> BoxFuture<'a, Result<CommandResult, ControlError>>;
}

/// One projector family's control protocol
pub trait ProjectorAdapter: Send + Sync {
    fn descriptor(&self) -> &AdapterDescriptor;

    fn id(&self) -> &str {
        &self.descriptor().id
    }

    /// Query power state; `true` when the projector is on
    fn query_status<'a>(
        &'a self,
        _http: &'a reqwest::Client,
        _target: &'a Target,
    ) -> BoxFuture<'a, Result<bool, ControlError>> {
        let reason = format!("{} has no status query", self.id());
        async move { Err(ControlError::status_unavailable(reason)) }.boxed()
    }

    /// Query the current input source; `None` when no source is known
    fn query_source<'a>(
        &'a self,
        _http: &'a reqwest::Client,
        _target: &'a Target,
    ) -> BoxFuture<'a, Result<Option<String>, ControlError>> {
        let reason = format!("{} has no source query", self.id());
        async move { Err(ControlError::status_unavailable(reason)) }.boxed()
    }

    fn command_override(&self) -> Option<&dyn CommandHandler> {
        None
    }

    /// Whether network discovery should probe for this adapter
    fn discoverable(&self) -> bool {
        true
    }
}
