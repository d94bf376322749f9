//! Shared types for projector control. Defines command tables, adapter
//! descriptors, credentials, targets and command result structures used
//! across all vendor adapters.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// Placeholder in header values replaced by the target host address
pub const HOST_PLACEHOLDER: &str = "{ip}";

/// What a command does, used to group commands for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Power,
    Source,
    SourceCycle,
    Feature,
    Toggle,
    Action,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Power => write!(f, "power"),
            CommandKind::Source => write!(f, "source"),
            CommandKind::SourceCycle => write!(f, "source_cycle"),
            CommandKind::Feature => write!(f, "feature"),
            CommandKind::Toggle => write!(f, "toggle"),
            CommandKind::Action => write!(f, "action"),
        }
    }
}

/// How a command is delivered to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    /// Handled in-process by the adapter's command override
    Internal,
}

/// A command parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Literal(String),
    /// Rendered as the epoch milliseconds at resolve time
    CurrentTimestampMillis,
}

impl ParamValue {
    pub fn literal(value: impl Into<String>) -> Self {
        ParamValue::Literal(value.into())
    }

    pub fn render(&self, now_ms: i64) -> Cow<'_, str> {
        match self {
            ParamValue::Literal(value) => Cow::Borrowed(value),
            ParamValue::CurrentTimestampMillis => Cow::Owned(now_ms.to_string()),
        }
    }
}

/// One entry of a vendor command table
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub kind: CommandKind,
    pub method: HttpMethod,
    pub duplicate: bool,
    pub path: String,
    pub params: Vec<(String, ParamValue)>,
    pub kv_joiner: String,
    pub param_joiner: String,
}

impl CommandSpec {
    pub fn new(kind: CommandKind, method: HttpMethod, path: &str) -> Self {
        Self {
            kind,
            method,
            duplicate: false,
            path: path.to_string(),
            params: Vec::new(),
            kv_joiner: "=".to_string(),
            param_joiner: "&".to_string(),
        }
    }

    pub fn with_joiners(mut self, kv_joiner: &str, param_joiner: &str) -> Self {
        self.kv_joiner = kv_joiner.to_string();
        self.param_joiner = param_joiner.to_string();
        self
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), ParamValue::literal(value)));
        self
    }

    pub fn with_timestamp(mut self, key: &str) -> Self {
        self.params.push((key.to_string(), ParamValue::CurrentTimestampMillis));
        self
    }

    /// Mark the command as needing a second send after the settle delay
    pub fn duplicated(mut self) -> Self {
        self.duplicate = true;
        self
    }

    /// Serialize the parameters into the path
    pub fn render_path(&self, now_ms: i64) -> String {
        let mut path = self.path.clone();
        for (key, value) in &self.params {
            path.push_str(key);
            path.push_str(&self.kv_joiner);
            path.push_str(&value.render(now_ms));
            path.push_str(&self.param_joiner);
        }
        if !self.param_joiner.is_empty() && path.ends_with(&self.param_joiner) {
            path.truncate(path.len() - self.param_joiner.len());
        }
        path
    }
}

/// HTTP basic credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

/// Host address plus the credentials used to reach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub credentials: Credentials,
}

impl Target {
    pub fn new(host: &str, credentials: Credentials) -> Self {
        Self {
            host: host.to_string(),
            credentials,
        }
    }
}

/// Static description of one projector family's control surface
#[derive(Debug, Clone)]
pub struct AdapterDescriptor {
    pub id: String,
    pub control_page: Option<String>,
    pub default_login: Option<Credentials>,
    pub headers: Vec<(String, String)>,
    pub commands: Vec<(String, CommandSpec)>,
    /// Human-readable source name to the cycle command that reaches it
    pub cycle_targets: Vec<(String, String)>,
}

impl AdapterDescriptor {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            control_page: None,
            default_login: None,
            headers: Vec::new(),
            commands: Vec::new(),
            cycle_targets: Vec::new(),
        }
    }

    pub fn with_control_page(mut self, path: &str) -> Self {
        self.control_page = Some(path.to_string());
        self
    }

    pub fn with_default_login(mut self, username: &str, password: &str) -> Self {
        self.default_login = Some(Credentials::new(username, password));
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_command(mut self, name: &str, spec: CommandSpec) -> Self {
        self.commands.push((name.to_string(), spec));
        self
    }

    pub fn with_cycle_target(mut self, source: &str, cycle_command: &str) -> Self {
        self.cycle_targets
            .push((source.to_string(), cycle_command.to_string()));
        self
    }

    pub fn command(&self, name: &str) -> Option<&CommandSpec> {
        self.commands
            .iter()
            .find(|(command, _)| command == name)
            .map(|(_, spec)| spec)
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.command(name).is_some()
    }

    /// Names of all commands of the given kind, in table order
    pub fn commands_of_kind(&self, kind: CommandKind) -> Vec<&str> {
        self.commands
            .iter()
            .filter(|(_, spec)| spec.kind == kind)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn cycle_command_for(&self, source: &str) -> Option<&str> {
        self.cycle_targets
            .iter()
            .find(|(name, _)| name == source)
            .map(|(_, command)| command.as_str())
    }

    /// Header list with the host placeholder rendered
    pub fn render_headers(&self, host: &str) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.clone(), value.replace(HOST_PLACEHOLDER, host)))
            .collect()
    }

    /// Credentials to use when a device has no override
    pub fn login(&self) -> Credentials {
        self.default_login
            .clone()
            .unwrap_or_else(|| Credentials::new("", ""))
    }

    /// An adapter missing its control page or default login cannot be probed
    /// or driven
    pub fn validate(&self) -> Result<(), ControlError> {
        match self.control_page.as_deref() {
            None | Some("") => {
                return Err(ControlError::InvalidAdapter {
                    id: self.id.clone(),
                    reason: "missing control page".to_string(),
                });
            }
            Some(_) => {}
        }
        if self.default_login.is_none() {
            return Err(ControlError::InvalidAdapter {
                id: self.id.clone(),
                reason: "missing default login".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
