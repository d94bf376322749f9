//! Device handle. Binds a discovered device record to its adapter and
//! serializes every command sent to that device.

use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Mutex;

use super::adapter::ProjectorAdapter;
use super::engine;
use super::reconciler::{self, DEFAULT_MAX_ATTEMPTS};
use super::registry::AdapterRegistry;
use super::types::{CommandResult, Credentials, Target};
use crate::error::ControlError;
use crate::results::DeviceRecord;

/// User-editable connection settings for a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    pub ip: String,
    pub projector_type: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// One controllable projector
pub struct Projector {
    record: DeviceRecord,
    adapter: Arc<dyn ProjectorAdapter>,
    client: Client,
    max_attempts: usize,
    command_lock: Mutex<()>,
}

impl Projector {
    pub fn new(
        record: DeviceRecord,
        registry: &AdapterRegistry,
        client: Client,
    ) -> Result<Self, ControlError> {
        let adapter = registry.load(&record.projector_type)?;
        Ok(Self {
            record,
            adapter,
            client,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            command_lock: Mutex::new(()),
        })
    }

    /// Cycle-key presses allowed per source change
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn record(&self) -> &DeviceRecord {
        &self.record
    }

    pub fn adapter(&self) -> &dyn ProjectorAdapter {
        self.adapter.as_ref()
    }

    fn credentials(&self) -> Credentials {
        let default = self.adapter.descriptor().login();
        let pick = |custom: &Option<String>, fallback: String| {
            custom
                .as_ref()
                .filter(|value| !value.is_empty())
                .cloned()
                .unwrap_or(fallback)
        };
        Credentials {
            username: pick(&self.record.username, default.username),
            password: pick(&self.record.password, default.password),
        }
    }

    /// Address and effective credentials for this device
    pub fn target(&self) -> Target {
        Target::new(&self.record.ip, self.credentials())
    }

    pub async fn execute(&self, command: &str) -> Result<CommandResult, ControlError> {
        let _guard = self.command_lock.lock().await;
        tracing::info!(device = self.record.display_name(), command, "sending command");
        engine::execute(&self.client, self.adapter.as_ref(), command, &self.target()).await
    }

    pub async fn on(&self) -> Result<CommandResult, ControlError> {
        self.execute("power_on").await
    }

    pub async fn off(&self) -> Result<CommandResult, ControlError> {
        self.execute("power_off").await
    }

    /// Power state, failing with `StatusUnavailable` when it cannot be read
    pub async fn status(&self) -> Result<bool, ControlError> {
        engine::status(&self.client, self.adapter.as_ref(), &self.target()).await
    }

    /// Power state, reporting off when it cannot be read
    pub async fn is_on(&self) -> bool {
        match self.status().await {
            Ok(on) => on,
            Err(e) => {
                tracing::warn!(
                    device = self.record.display_name(),
                    error = %e,
                    "power state unknown"
                );
                false
            }
        }
    }

    /// Current input, `None` when off or unreadable
    pub async fn source(&self) -> Option<String> {
        match engine::current_source(&self.client, self.adapter.as_ref(), &self.target()).await {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(device = self.record.display_name(), error = %e, "source unknown");
                None
            }
        }
    }

    /// Press a feature or toggle key
    pub async fn toggle(&self, feature: &str) -> Result<CommandResult, ControlError> {
        let descriptor = self.adapter.descriptor();
        if !descriptor.has_command(feature) {
            return Err(ControlError::UnknownCommand {
                adapter: descriptor.id.clone(),
                command: feature.to_string(),
            });
        }
        self.execute(feature).await
    }

    pub async fn set_source(&self, source: &str) -> Result<bool, ControlError> {
        self.set_source_with_attempts(source, self.max_attempts).await
    }

    /// Drive the device to `source`, holding the command lock for the whole
    /// reconciliation
    pub async fn set_source_with_attempts(
        &self,
        source: &str,
        max_attempts: usize,
    ) -> Result<bool, ControlError> {
        let _guard = self.command_lock.lock().await;
        tracing::info!(device = self.record.display_name(), source, "setting source");
        reconciler::set_source(
            &self.client,
            self.adapter.as_ref(),
            &self.target(),
            source,
            max_attempts,
        )
        .await
    }

    pub fn get_targets(&self, cycle_command: &str) -> Vec<String> {
        reconciler::get_targets(self.adapter.descriptor(), cycle_command)
    }

    pub fn selectable_sources(&self) -> Vec<String> {
        reconciler::selectable_sources(self.adapter.descriptor())
    }

    pub fn feature_commands(&self) -> Vec<String> {
        reconciler::feature_commands(self.adapter.descriptor())
    }

    /// Replace address, type and credential overrides. Nothing changes when
    /// the new type cannot be loaded.
    pub fn apply_settings(
        &mut self,
        settings: DeviceSettings,
        registry: &AdapterRegistry,
    ) -> Result<(), ControlError> {
        if settings.ip.trim().is_empty() {
            return Err(ControlError::InvalidSettings("address is empty".to_string()));
        }
        let adapter = registry.load(&settings.projector_type)?;

        self.adapter = adapter;
        self.record.ip = settings.ip.trim().to_string();
        self.record.projector_type = settings.projector_type;
        self.record.username = settings.username.filter(|value| !value.is_empty());
        self.record.password = settings.password.filter(|value| !value.is_empty());

        tracing::info!(
            device = self.record.display_name(),
            projector_type = %self.record.projector_type,
            "settings applied"
        );
        Ok(())
    }
}
