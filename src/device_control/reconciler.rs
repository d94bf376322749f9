//! Source reconciliation. Drives a projector to a requested input either with
//! a direct source command or by pressing a cycle key and re-polling until
//! the device reports the target, bounded by an attempt counter.

use reqwest::Client;

use super::adapter::ProjectorAdapter;
use super::engine::{self, SETTLE_DELAY};
use super::types::{AdapterDescriptor, CommandKind, Target};
use crate::error::ControlError;

pub const DEFAULT_MAX_ATTEMPTS: usize = 12;

/// Vendor-agnostic spellings of direct source commands
const SOURCE_ALIASES: &[(&str, &str)] = &[
    ("HDMI 1", "HDMI1"),
    ("HDMI 2", "HDMI2"),
    ("HDBaseT", "HDBASET"),
    ("Computer 1", "COMPUTER1"),
];

fn same_source(current: Option<&str>, target: &str) -> bool {
    current.is_some_and(|current| current.to_lowercase() == target.to_lowercase())
}

fn normalize_target(name: &str) -> String {
    name.to_lowercase().replace(' ', "")
}

async fn read_source(
    client: &Client,
    adapter: &dyn ProjectorAdapter,
    target: &Target,
) -> Option<String> {
    match engine::current_source(client, adapter, target).await {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!(
                adapter = adapter.id(),
                host = %target.host,
                error = %e,
                "source unreadable"
            );
            None
        }
    }
}

/// Command that selects `source` directly, if the adapter has one
pub fn direct_source_command<'a>(
    descriptor: &AdapterDescriptor,
    source: &'a str,
) -> Option<&'a str> {
    if descriptor.has_command(source) {
        return Some(source);
    }
    SOURCE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == source)
        .map(|(_, command)| *command)
        .filter(|command| descriptor.has_command(command))
}

/// Drive the projector to `source`. Returns whether the device reached it
/// (cycle keys) or accepted the command (direct sources).
pub async fn set_source(
    client: &Client,
    adapter: &dyn ProjectorAdapter,
    target: &Target,
    source: &str,
    max_attempts: usize,
) -> Result<bool, ControlError> {
    let current = read_source(client, adapter, target).await;
    if same_source(current.as_deref(), source) {
        tracing::debug!(adapter = adapter.id(), host = %target.host, source, "already on source");
        return Ok(true);
    }

    let descriptor = adapter.descriptor();

    if let Some(cycle_command) = descriptor.cycle_command_for(source) {
        for attempt in 1..=max_attempts {
            let current = read_source(client, adapter, target).await;
            if same_source(current.as_deref(), source) {
                tracing::info!(
                    adapter = adapter.id(),
                    host = %target.host,
                    source,
                    attempt,
                    "source reached"
                );
                return Ok(true);
            }

            tracing::debug!(
                adapter = adapter.id(),
                host = %target.host,
                current = current.as_deref().unwrap_or("none"),
                source,
                attempt,
                "pressing {}",
                cycle_command
            );
            match engine::execute(client, adapter, cycle_command, target).await {
                Ok(result) if !result.success => {
                    tracing::warn!(
                        host = %target.host,
                        message = %result.message,
                        "cycle key rejected"
                    );
                }
                Ok(_) => {}
                Err(ControlError::CommandFailed { reason }) => {
                    tracing::warn!(host = %target.host, %reason, "cycle key failed");
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(SETTLE_DELAY).await;
        }

        let current = read_source(client, adapter, target).await;
        let reached = same_source(current.as_deref(), source);
        if !reached {
            tracing::warn!(
                adapter = adapter.id(),
                host = %target.host,
                source,
                max_attempts,
                "source not reached"
            );
        }
        return Ok(reached);
    }

    let command = direct_source_command(descriptor, source).ok_or_else(|| {
        ControlError::UnknownSource {
            adapter: descriptor.id.clone(),
            source_name: source.to_string(),
        }
    })?;

    let result = engine::execute(client, adapter, command, target).await?;
    Ok(result.success)
}

/// Source names reached through `cycle_command`, de-duplicated ignoring case
/// and spaces, in first-seen order
pub fn get_targets(descriptor: &AdapterDescriptor, cycle_command: &str) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    for (name, command) in &descriptor.cycle_targets {
        if command != cycle_command {
            continue;
        }
        let key = normalize_target(name);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        targets.push(name.clone());
    }
    targets
}

/// Every source name a user can pick: direct source commands plus the
/// targets of each cycle key, in command-table order
pub fn selectable_sources(descriptor: &AdapterDescriptor) -> Vec<String> {
    let mut sources = Vec::new();
    for (name, spec) in &descriptor.commands {
        match spec.kind {
            CommandKind::Source => sources.push(name.clone()),
            CommandKind::SourceCycle => sources.extend(get_targets(descriptor, name)),
            _ => {}
        }
    }
    sources
}

/// Feature and toggle commands, in command-table order
pub fn feature_commands(descriptor: &AdapterDescriptor) -> Vec<String> {
    descriptor
        .commands
        .iter()
        .filter(|(_, spec)| matches!(spec.kind, CommandKind::Feature | CommandKind::Toggle))
        .map(|(name, _)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_control::adapter::CommandHandler;
    use crate::device_control::types::{CommandResult, CommandSpec, Credentials, HttpMethod};
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use std::sync::Mutex;

    /// Scripted device: every command advances one step through `ring`
    /// unless the device is stuck
    struct ScriptedProjector {
        descriptor: AdapterDescriptor,
        ring: Vec<&'static str>,
        position: Mutex<Option<usize>>,
        sent: Mutex<Vec<String>>,
        stuck: bool,
        failing_reads: Mutex<usize>,
    }

    impl ScriptedProjector {
        fn new(ring: Vec<&'static str>, start: Option<usize>) -> Self {
            let descriptor = AdapterDescriptor::new("scripted")
                .with_control_page("/")
                .with_default_login("u", "p")
                .with_command(
                    "VIDEO",
                    CommandSpec::new(CommandKind::SourceCycle, HttpMethod::Internal, "/"),
                )
                .with_command(
                    "LAN",
                    CommandSpec::new(CommandKind::SourceCycle, HttpMethod::Internal, "/"),
                )
                .with_command(
                    "HDMI1",
                    CommandSpec::new(CommandKind::Source, HttpMethod::Internal, "/"),
                )
                .with_command(
                    "BLANK",
                    CommandSpec::new(CommandKind::Toggle, HttpMethod::Internal, "/"),
                )
                .with_cycle_target("HDMI1", "VIDEO")
                .with_cycle_target("HDMI 1", "VIDEO")
                .with_cycle_target("HDMI2", "VIDEO")
                .with_cycle_target("Video", "VIDEO")
                .with_cycle_target("LAN", "LAN");
            Self {
                descriptor,
                ring,
                position: Mutex::new(start),
                sent: Mutex::new(Vec::new()),
                stuck: false,
                failing_reads: Mutex::new(0),
            }
        }

        fn stuck(mut self) -> Self {
            self.stuck = true;
            self
        }

        /// Fail the next `count` source reads
        fn failing_reads(self, count: usize) -> Self {
            *self.failing_reads.lock().unwrap() = count;
            self
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl CommandHandler for ScriptedProjector {
        fn handle<'a>(
            &'a self,
            command: &'a str,
            _target: &'a Target,
        ) -> BoxFuture<'a, Result<CommandResult, ControlError>> {
            async move {
                self.sent.lock().unwrap().push(command.to_string());
                if !self.stuck {
                    let mut position = self.position.lock().unwrap();
                    *position = Some(position.map_or(0, |p| (p + 1) % self.ring.len()));
                }
                Ok(CommandResult::ok(command))
            }
            .boxed()
        }
    }

    impl ProjectorAdapter for ScriptedProjector {
        fn descriptor(&self) -> &AdapterDescriptor {
            &self.descriptor
        }

        fn query_source<'a>(
            &'a self,
            _http: &'a Client,
            _target: &'a Target,
        ) -> BoxFuture<'a, Result<Option<String>, ControlError>> {
            async move {
                let mut failing = self.failing_reads.lock().unwrap();
                if *failing > 0 {
                    *failing -= 1;
                    return Err(ControlError::status_unavailable("read timed out"));
                }
                let position = *self.position.lock().unwrap();
                Ok(position.map(|p| self.ring[p].to_string()))
            }
            .boxed()
        }

        fn command_override(&self) -> Option<&dyn CommandHandler> {
            Some(self)
        }
    }

    fn target() -> Target {
        Target::new("10.0.0.20", Credentials::new("u", "p"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_on_source_sends_nothing() {
        let projector = ScriptedProjector::new(vec!["HDMI 1", "HDMI 2"], Some(0));
        let client = Client::new();

        assert!(set_source(&client, &projector, &target(), "HDMI 1", 12).await.unwrap());
        assert!(set_source(&client, &projector, &target(), "HDMI 1", 12).await.unwrap());
        assert!(projector.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_until_source_reached() {
        let projector = ScriptedProjector::new(vec!["HDMI1", "HDMI2", "Video"], Some(0));

        let reached = set_source(&Client::new(), &projector, &target(), "Video", 12)
            .await
            .unwrap();

        assert!(reached);
        assert_eq!(projector.sent(), vec!["VIDEO", "VIDEO"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_compare_ignores_case() {
        let projector = ScriptedProjector::new(vec!["LAN"], None);

        let reached = set_source(&Client::new(), &projector, &target(), "LAN", 12)
            .await
            .unwrap();
        assert!(reached);
        assert_eq!(projector.sent(), vec!["LAN"]);

        let projector = ScriptedProjector::new(vec!["hdmi2", "VIDEO"], Some(1));
        let reached = set_source(&Client::new(), &projector, &target(), "Video", 12)
            .await
            .unwrap();
        assert!(reached);
        assert!(projector.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_gives_up_after_max_attempts() {
        let projector = ScriptedProjector::new(vec!["HDMI 1"], Some(0)).stuck();

        let started = tokio::time::Instant::now();
        let reached = set_source(&Client::new(), &projector, &target(), "LAN", 12)
            .await
            .unwrap();

        assert!(!reached);
        assert_eq!(projector.sent().len(), 12);
        assert!(projector.sent().iter().all(|c| c == "LAN"));
        assert!(started.elapsed() >= SETTLE_DELAY * 12);
        assert!(started.elapsed() < SETTLE_DELAY * 13);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_source_keeps_cycling() {
        // The entry read and the first loop read both fail.
        let projector =
            ScriptedProjector::new(vec!["HDMI1", "HDMI2", "Video"], Some(0)).failing_reads(2);

        let reached = set_source(&Client::new(), &projector, &target(), "Video", 12)
            .await
            .unwrap();

        assert!(reached);
        assert_eq!(projector.sent(), vec!["VIDEO", "VIDEO"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_readable_source_is_not_reached() {
        let projector = ScriptedProjector::new(vec!["HDMI1", "Video"], Some(0)).failing_reads(100);

        let reached = set_source(&Client::new(), &projector, &target(), "Video", 3)
            .await
            .unwrap();

        assert!(!reached);
        assert_eq!(projector.sent(), vec!["VIDEO", "VIDEO", "VIDEO"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_source_uses_alias() {
        // Without cycle mappings "HDMI 1" resolves through the alias table.
        let mut direct = ScriptedProjector::new(vec!["HDBaseT"], Some(0));
        direct.descriptor.cycle_targets.clear();
        let accepted = set_source(&Client::new(), &direct, &target(), "HDMI 1", 12)
            .await
            .unwrap();
        assert!(accepted);
        assert_eq!(direct.sent(), vec!["HDMI1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_source() {
        let projector = ScriptedProjector::new(vec!["HDMI 1"], Some(0));

        let result = set_source(&Client::new(), &projector, &target(), "SDI", 12).await;
        assert!(matches!(
            result,
            Err(ControlError::UnknownSource { ref source_name, .. }) if source_name == "SDI"
        ));
        assert!(projector.sent().is_empty());
    }

    #[test]
    fn test_get_targets_deduplicates_first_seen() {
        let projector = ScriptedProjector::new(vec![], None);
        assert_eq!(
            get_targets(&projector.descriptor, "VIDEO"),
            vec!["HDMI1", "HDMI2", "Video"]
        );
        assert_eq!(get_targets(&projector.descriptor, "LAN"), vec!["LAN"]);
        assert!(get_targets(&projector.descriptor, "USB").is_empty());
    }

    #[test]
    fn test_selectable_sources_and_features() {
        let projector = ScriptedProjector::new(vec![], None);
        assert_eq!(
            selectable_sources(&projector.descriptor),
            vec!["HDMI1", "HDMI2", "Video", "LAN", "HDMI1"]
        );
        assert_eq!(feature_commands(&projector.descriptor), vec!["BLANK"]);
    }

    #[test]
    fn test_direct_source_command_prefers_literal() {
        let projector = ScriptedProjector::new(vec![], None);
        assert_eq!(direct_source_command(&projector.descriptor, "HDMI1"), Some("HDMI1"));
        assert_eq!(direct_source_command(&projector.descriptor, "HDMI 1"), Some("HDMI1"));
        assert_eq!(direct_source_command(&projector.descriptor, "HDMI 2"), None);
    }
}
