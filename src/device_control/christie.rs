//! Christie web-control adapter. Commands are register writes posted to
//! `webctrl.cgi.elf`; power and input state are read back as JSON.

use futures::FutureExt;
use futures::future::BoxFuture;

use super::adapter::ProjectorAdapter;
use super::engine::{device_url, http_request};
use super::types::{AdapterDescriptor, CommandKind, CommandSpec, HttpMethod, Target};
use crate::error::ControlError;

/// Christie HTTP control implementation
pub struct ChristieProjector {
    descriptor: AdapterDescriptor,
}

impl ChristieProjector {
    pub const ID: &'static str = "christie";
    const CONTROL_PAGE: &'static str = "/html/remote.html";
    const CONTROL_PATH: &'static str = "/cgi-bin/webctrl.cgi.elf?&";
    const KEY_REGISTER: u16 = 0x1213;
    const POWER_REGISTER: u16 = 0x6000;
    const INPUT_REGISTER: u16 = 0x2000;

    pub fn new() -> Self {
        Self {
            descriptor: Self::command_table(Self::ID, HttpMethod::Post),
        }
    }

    fn key(kind: CommandKind, method: HttpMethod, code: u16) -> CommandSpec {
        CommandSpec::new(kind, method, Self::CONTROL_PATH)
            .with_joiners(":", ",")
            .with_param("p", "1")
            .with_param("c", Self::KEY_REGISTER.to_string())
            .with_param("v", "2")
            .with_param("v", code.to_string())
    }

    /// The Christie remote key table, sent with `method`
    pub fn command_table(id: &str, method: HttpMethod) -> AdapterDescriptor {
        AdapterDescriptor::new(id)
            .with_control_page(Self::CONTROL_PAGE)
            .with_default_login("user", "1978")
            .with_command("power_on", Self::key(CommandKind::Power, method, 0x001D))
            .with_command("power_off", Self::key(CommandKind::Power, method, 0x001E))
            .with_command("HDBASET", Self::key(CommandKind::Source, method, 0x001F))
            .with_command("HDMI1", Self::key(CommandKind::Source, method, 0x0012))
            .with_command("HDMI2", Self::key(CommandKind::Source, method, 0x000F))
            .with_command("COMPUTER1", Self::key(CommandKind::Source, method, 0x0010))
            .with_command("FREEZE", Self::key(CommandKind::Feature, method, 0x00B4))
            .with_command("MUTE", Self::key(CommandKind::Feature, method, 0x0052))
            .with_command("BLANK", Self::key(CommandKind::Feature, method, 0x0041))
    }

    fn query_path(register: u16) -> String {
        format!("{}p:{},c:{},v:0", Self::CONTROL_PATH, 0x02, register)
    }

    async fn read_register(
        &self,
        http: &reqwest::Client,
        target: &Target,
        register: u16,
    ) -> Result<serde_json::Value, ControlError> {
        let url = device_url(&target.host, &Self::query_path(register), None)?;
        let response = http_request(
            http,
            HttpMethod::Post,
            url,
            &self.descriptor.render_headers(&target.host),
            Some(&target.credentials),
        )?
        .send()
        .await
        .map_err(|e| ControlError::status_unavailable(format!("{}: {}", target.host, e)))?;

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ControlError::status_unavailable(format!("{}: {}", target.host, e)))
    }

    /// `true` when the register reply is `[{"val": [1]}]`
    pub fn parse_power(reply: &serde_json::Value) -> Result<bool, ControlError> {
        let values = reply
            .get(0)
            .and_then(|entry| entry.get("val"))
            .and_then(|val| val.as_array())
            .ok_or_else(|| ControlError::status_unavailable("power reply has no val field"))?;

        Ok(values.len() == 1 && values[0].as_i64() == Some(1))
    }

    pub fn parse_source(reply: &serde_json::Value) -> Result<Option<String>, ControlError> {
        let code = reply
            .get(0)
            .and_then(|entry| entry.get("val"))
            .and_then(|val| val.get(0))
            .and_then(|code| code.as_i64())
            .ok_or_else(|| ControlError::status_unavailable("input reply has no val field"))?;

        Ok(Self::source_name(code).map(str::to_string))
    }

    fn source_name(code: i64) -> Option<&'static str> {
        match code {
            3 => Some("HDMI 1"),
            13 => Some("HDMI 2"),
            14 => Some("HDMI 3"),
            16 => Some("HDMI 4"),
            8 => Some("DVI-I"),
            9 => Some("DVI-D"),
            17 => Some("HDBaseT"),
            18 => Some("SDI"),
            19 => Some("DisplayPort"),
            _ => None,
        }
    }
}

impl Default for ChristieProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectorAdapter for ChristieProjector {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn query_status<'a>(
        &'a self,
        http: &'a reqwest::Client,
        target: &'a Target,
    ) -> BoxFuture<'a, Result<bool, ControlError>> {
        async move {
            let reply = self.read_register(http, target, Self::POWER_REGISTER).await?;
            Self::parse_power(&reply)
        }
        .boxed()
    }

    fn query_source<'a>(
        &'a self,
        http: &'a reqwest::Client,
        target: &'a Target,
    ) -> BoxFuture<'a, Result<Option<String>, ControlError>> {
        async move {
            let reply = self.read_register(http, target, Self::INPUT_REGISTER).await?;
            Self::parse_source(&reply)
        }
        .boxed()
    }
}
