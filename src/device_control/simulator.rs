//! In-process projector that answers the Christie command table from
//! in-memory state instead of the network. Each host address gets its own
//! simulated device.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::adapter::{CommandHandler, ProjectorAdapter};
use super::christie::ChristieProjector;
use super::types::{AdapterDescriptor, CommandKind, CommandResult, HttpMethod, Target};
use crate::error::ControlError;

/// State of one simulated projector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedState {
    pub power_on: bool,
    pub source: String,
    pub features: HashMap<String, bool>,
}

/// In-memory projector adapter
pub struct SimulatedProjector {
    descriptor: AdapterDescriptor,
    latency: Duration,
    initial_power: bool,
    devices: Mutex<HashMap<String, SimulatedState>>,
}

impl SimulatedProjector {
    pub const ID: &'static str = "test_projector";
    const INITIAL_SOURCE: &'static str = "HDMI 1";

    pub fn new() -> Self {
        Self {
            descriptor: ChristieProjector::command_table(Self::ID, HttpMethod::Internal),
            latency: Duration::from_millis(500),
            initial_power: false,
            devices: Mutex::new(HashMap::new()),
        }
    }

    /// Delay applied to every handled command
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_initial_power(mut self, power_on: bool) -> Self {
        self.initial_power = power_on;
        self
    }

    fn initial_state(&self) -> SimulatedState {
        SimulatedState {
            power_on: self.initial_power,
            source: Self::INITIAL_SOURCE.to_string(),
            features: self
                .descriptor
                .commands_of_kind(CommandKind::Feature)
                .into_iter()
                .map(|name| (name.to_string(), false))
                .collect(),
        }
    }

    fn devices(&self) -> MutexGuard<'_, HashMap<String, SimulatedState>> {
        self.devices.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the simulated device at `host`
    pub fn state(&self, host: &str) -> SimulatedState {
        self.devices()
            .get(host)
            .cloned()
            .unwrap_or_else(|| self.initial_state())
    }

    fn source_for_command(command: &str) -> Option<&'static str> {
        match command {
            "HDMI1" => Some("HDMI 1"),
            "HDMI2" => Some("HDMI 2"),
            "HDBASET" => Some("HDBaseT"),
            "COMPUTER1" => Some("Computer 1"),
            _ => None,
        }
    }

    fn apply(&self, command: &str, host: &str) -> Result<CommandResult, ControlError> {
        let spec = self
            .descriptor
            .command(command)
            .ok_or_else(|| ControlError::UnknownCommand {
                adapter: self.descriptor.id.clone(),
                command: command.to_string(),
            })?;

        let mut devices = self.devices();
        let state = devices
            .entry(host.to_string())
            .or_insert_with(|| self.initial_state());

        match (spec.kind, command) {
            (CommandKind::Power, "power_on") => state.power_on = true,
            (CommandKind::Power, _) => state.power_on = false,
            (CommandKind::Source, _) => {
                if !state.power_on {
                    return Err(ControlError::command_failed("Projector is not powered on"));
                }
                if let Some(source) = Self::source_for_command(command) {
                    state.source = source.to_string();
                }
            }
            _ => {
                let enabled = state.features.entry(command.to_string()).or_insert(false);
                *enabled = !*enabled;
            }
        }

        Ok(CommandResult::ok(format!("Simulated {} on {}", command, host)))
    }
}

impl Default for SimulatedProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHandler for SimulatedProjector {
    fn handle<'a>(
        &'a self,
        command: &'a str,
        target: &'a Target,
    ) -> BoxFuture<'a, Result<CommandResult, ControlError>> {
        async move {
            tokio::time::sleep(self.latency).await;
            self.apply(command, &target.host)
        }
        .boxed()
    }
}

impl ProjectorAdapter for SimulatedProjector {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn query_status<'a>(
        &'a self,
        _http: &'a reqwest::Client,
        target: &'a Target,
    ) -> BoxFuture<'a, Result<bool, ControlError>> {
        let power_on = self.state(&target.host).power_on;
        async move { Ok(power_on) }.boxed()
    }

    fn query_source<'a>(
        &'a self,
        _http: &'a reqwest::Client,
        target: &'a Target,
    ) -> BoxFuture<'a, Result<Option<String>, ControlError>> {
        let state = self.state(&target.host);
        async move { Ok(state.power_on.then_some(state.source)) }.boxed()
    }

    fn command_override(&self) -> Option<&dyn CommandHandler> {
        Some(self)
    }

    fn discoverable(&self) -> bool {
        false
    }
}
