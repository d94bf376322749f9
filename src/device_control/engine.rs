//! Command engine. Resolves command-table entries into HTTP requests, sends
//! them with the declared method, and handles duplicate-send latching.
//! Status and source queries are delegated to the adapter and any failure
//! they hit is contained as `StatusUnavailable`.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use url::Url;

use super::adapter::ProjectorAdapter;
use super::types::{AdapterDescriptor, CommandResult, Credentials, HttpMethod, Target};
use crate::error::ControlError;

/// Wait between a command and the next send or read
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// A fully resolved command request
#[derive(Debug, Clone)]
pub struct Request {
    pub method: HttpMethod,
    /// Target URL with the basic-auth credentials embedded
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub credentials: Option<Credentials>,
}

impl Request {
    /// Path and query, as sent on the wire
    pub fn path(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }

    /// Request builder with the embedded credentials moved into an
    /// `Authorization` header
    pub fn builder(&self, client: &Client) -> Result<RequestBuilder, ControlError> {
        let mut bare = self.url.clone();
        let _ = bare.set_username("");
        let _ = bare.set_password(None);
        http_request(
            client,
            self.method,
            bare,
            &self.headers,
            self.credentials.as_ref(),
        )
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Build `http://host/path`, embedding credentials when given
pub fn device_url(
    host: &str,
    path: &str,
    credentials: Option<&Credentials>,
) -> Result<Url, ControlError> {
    let mut url = Url::parse(&format!("http://{}{}", host, path))
        .map_err(|e| ControlError::command_failed(format!("invalid URL for {}: {}", host, e)))?;

    if let Some(credentials) = credentials
        && !credentials.username.is_empty()
    {
        let embedded = url.set_username(&credentials.username).is_ok()
            && url.set_password(Some(&credentials.password)).is_ok();
        if !embedded {
            return Err(ControlError::command_failed(format!(
                "cannot embed credentials for {}",
                host
            )));
        }
    }

    Ok(url)
}

/// Build a request with headers and optional basic auth applied
pub fn http_request(
    client: &Client,
    method: HttpMethod,
    url: Url,
    headers: &[(String, String)],
    credentials: Option<&Credentials>,
) -> Result<RequestBuilder, ControlError> {
    let mut builder = match method {
        HttpMethod::Get => client.get(url),
        HttpMethod::Post => client.post(url),
        HttpMethod::Internal => {
            return Err(ControlError::command_failed(
                "internal command has no HTTP transport",
            ));
        }
    };

    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    if let Some(credentials) = credentials {
        builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
    }

    Ok(builder)
}

/// Resolve a command against the current clock
pub fn resolve(
    descriptor: &AdapterDescriptor,
    command: &str,
    target: &Target,
) -> Result<Request, ControlError> {
    resolve_at(descriptor, command, target, now_millis())
}

/// Resolve a command for a fixed point in time
pub fn resolve_at(
    descriptor: &AdapterDescriptor,
    command: &str,
    target: &Target,
    now_ms: i64,
) -> Result<Request, ControlError> {
    let spec = descriptor
        .command(command)
        .ok_or_else(|| ControlError::UnknownCommand {
            adapter: descriptor.id.clone(),
            command: command.to_string(),
        })?;

    let path = spec.render_path(now_ms);
    let url = device_url(&target.host, &path, Some(&target.credentials))?;

    Ok(Request {
        method: spec.method,
        url,
        headers: descriptor.render_headers(&target.host),
        credentials: Some(target.credentials.clone()).filter(|c| !c.username.is_empty()),
    })
}

/// Execute a command, resending once after the settle delay when the
/// command table marks it as duplicated
pub async fn execute(
    client: &Client,
    adapter: &dyn ProjectorAdapter,
    command: &str,
    target: &Target,
) -> Result<CommandResult, ControlError> {
    if let Some(handler) = adapter.command_override() {
        tracing::debug!(adapter = adapter.id(), command, host = %target.host, "handled in-process");
        return handler.handle(command, target).await;
    }

    let descriptor = adapter.descriptor();
    let spec = descriptor
        .command(command)
        .ok_or_else(|| ControlError::UnknownCommand {
            adapter: descriptor.id.clone(),
            command: command.to_string(),
        })?;

    let mut result = send_once(client, descriptor, command, target).await?;

    if spec.duplicate {
        tokio::time::sleep(SETTLE_DELAY).await;
        result = send_once(client, descriptor, command, target).await?;
    }

    Ok(result)
}

async fn send_once(
    client: &Client,
    descriptor: &AdapterDescriptor,
    command: &str,
    target: &Target,
) -> Result<CommandResult, ControlError> {
    let request = resolve(descriptor, command, target)?;
    tracing::debug!(
        adapter = %descriptor.id,
        command,
        host = %target.host,
        path = %request.path(),
        "sending command"
    );

    let response = request.builder(client)?.send().await.map_err(|e| {
        ControlError::command_failed(format!("{} to {}: {}", command, target.host, e))
    })?;

    let status = response.status();
    if status.is_success() {
        Ok(CommandResult::ok(format!("Sent {} to {}", command, target.host)))
    } else {
        tracing::warn!(adapter = %descriptor.id, command, %status, "device rejected command");
        Ok(CommandResult::failed(format!(
            "{} returned status: {}",
            target.host, status
        )))
    }
}

/// Power state as reported by the adapter
pub async fn status(
    client: &Client,
    adapter: &dyn ProjectorAdapter,
    target: &Target,
) -> Result<bool, ControlError> {
    adapter
        .query_status(client, target)
        .await
        .map_err(contain_query_error)
}

/// Current input source as reported by the adapter
pub async fn current_source(
    client: &Client,
    adapter: &dyn ProjectorAdapter,
    target: &Target,
) -> Result<Option<String>, ControlError> {
    adapter
        .query_source(client, target)
        .await
        .map_err(contain_query_error)
}

fn contain_query_error(error: ControlError) -> ControlError {
    match error {
        ControlError::StatusUnavailable { .. } => error,
        other => ControlError::status_unavailable(other.to_string()),
    }
}
