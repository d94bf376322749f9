//! Epson web-remote adapter. Remote keys are sent to `directsend` with a
//! cache-busting timestamp; inputs are selected with cycle keys and state is
//! scraped from the `webconf` status page.

use futures::FutureExt;
use futures::future::BoxFuture;

use super::adapter::ProjectorAdapter;
use super::engine::{device_url, http_request};
use super::types::{AdapterDescriptor, CommandKind, CommandSpec, HttpMethod, Target};
use crate::error::ControlError;

/// Epson web remote implementation
pub struct EpsonProjector {
    descriptor: AdapterDescriptor,
}

impl EpsonProjector {
    pub const ID: &'static str = "epson";
    const CONTROL_PAGE: &'static str = "/cgi-bin/webconf";
    const KEY_PATH: &'static str = "/cgi-bin/directsend?";
    const STATUS_PAGE: &'static str = "05";
    const STANDBY_MARKER: &'static str = "The projector is currently on standby";
    const SOURCE_MARKER: &'static str = "Source";
    /// Byte window after the source label holding the input name
    const SOURCE_OFFSET: std::ops::Range<usize> = 155..165;

    pub fn new() -> Self {
        let descriptor = AdapterDescriptor::new(Self::ID)
            .with_control_page(Self::CONTROL_PAGE)
            .with_default_login("EPSONWEB", "ADMIN")
            .with_header("Referer", "http://{ip}/cgi-bin/webconf")
            .with_command("power_on", Self::key(CommandKind::Power, "3B"))
            // Power off asks for confirmation; the second press confirms it.
            .with_command("power_off", Self::key(CommandKind::Power, "3B").duplicated())
            .with_command("OTHER", Self::key(CommandKind::SourceCycle, "43"))
            .with_command("VIDEO", Self::key(CommandKind::SourceCycle, "46"))
            .with_command("USB", Self::key(CommandKind::SourceCycle, "85"))
            .with_command("LAN", Self::key(CommandKind::SourceCycle, "8A"))
            .with_command("BLANK", Self::key(CommandKind::Toggle, "3E"))
            .with_command("FREEZE", Self::key(CommandKind::Toggle, "47"))
            .with_command("SEARCH", Self::key(CommandKind::Action, "67"))
            .with_cycle_target("HDMI1", "VIDEO")
            .with_cycle_target("HDMI 1", "VIDEO")
            .with_cycle_target("HDMI2", "VIDEO")
            .with_cycle_target("HDMI 2", "VIDEO")
            .with_cycle_target("S-Video", "VIDEO")
            .with_cycle_target("SVIDEO", "VIDEO")
            .with_cycle_target("Video", "VIDEO")
            .with_cycle_target("VIDEO", "VIDEO")
            .with_cycle_target("Computer1", "OTHER")
            .with_cycle_target("Computer 1", "OTHER")
            .with_cycle_target("COMPUTER1", "OTHER")
            .with_cycle_target("Computer2", "OTHER")
            .with_cycle_target("Computer 2", "OTHER")
            .with_cycle_target("COMPUTER2", "OTHER")
            .with_cycle_target("USB", "USB")
            .with_cycle_target("USB Display", "USB")
            .with_cycle_target("USBDISPLAY", "USB")
            .with_cycle_target("LAN", "LAN");

        Self { descriptor }
    }

    fn key(kind: CommandKind, code: &str) -> CommandSpec {
        CommandSpec::new(kind, HttpMethod::Get, Self::KEY_PATH)
            .with_param("KEY", code)
            .with_timestamp("_")
    }

    async fn fetch_status_page(
        &self,
        http: &reqwest::Client,
        target: &Target,
    ) -> Result<String, ControlError> {
        let url = device_url(&target.host, Self::CONTROL_PAGE, None)?;
        let response = http_request(
            http,
            HttpMethod::Post,
            url,
            &self.descriptor.render_headers(&target.host),
            Some(&target.credentials),
        )?
        .form(&[("page", Self::STATUS_PAGE)])
        .send()
        .await
        .map_err(|e| ControlError::status_unavailable(format!("{}: {}", target.host, e)))?;

        if !response.status().is_success() {
            return Err(ControlError::status_unavailable(format!(
                "{} returned status: {}",
                target.host,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ControlError::status_unavailable(format!("{}: {}", target.host, e)))
    }

    pub fn parse_power(page: &str) -> bool {
        !page.contains(Self::STANDBY_MARKER)
    }

    /// Input name from the status page; `None` while in standby
    pub fn parse_source(page: &str) -> Result<Option<String>, ControlError> {
        if page.contains(Self::STANDBY_MARKER) {
            return Ok(None);
        }

        let label = page
            .find(Self::SOURCE_MARKER)
            .ok_or_else(|| ControlError::status_unavailable("status page has no source field"))?;

        let bytes = page.as_bytes();
        let start = (label + Self::SOURCE_OFFSET.start).min(bytes.len());
        let end = (label + Self::SOURCE_OFFSET.end).min(bytes.len());
        let window = String::from_utf8_lossy(&bytes[start..end]);

        let source = window
            .trim_matches(' ')
            .split('<')
            .next()
            .unwrap_or_default()
            .to_string();

        if source.is_empty() {
            Ok(None)
        } else {
            Ok(Some(source))
        }
    }
}

impl Default for EpsonProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectorAdapter for EpsonProjector {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn query_status<'a>(
        &'a self,
        http: &'a reqwest::Client,
        target: &'a Target,
    ) -> BoxFuture<'a, Result<bool, ControlError>> {
        async move {
            let page = self.fetch_status_page(http, target).await?;
            Ok(Self::parse_power(&page))
        }
        .boxed()
    }

    fn query_source<'a>(
        &'a self,
        http: &'a reqwest::Client,
        target: &'a Target,
    ) -> BoxFuture<'a, Result<Option<String>, ControlError>> {
        async move {
            let page = self.fetch_status_page(http, target).await?;
            Self::parse_source(&page)
        }
        .boxed()
    }
}
