//! HTTP fingerprinting. A host is alive when anything answers on its web
//! port; it matches an adapter when the adapter's control page exists, with
//! confidence depending on whether the default login opens it.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};

use super::{AddressState, ProbeMatch, ProbeOutcome, select_best};
use crate::config::DiscoveryConfig;
use crate::device_control::engine::{device_url, http_request};
use crate::device_control::{HttpMethod, ProjectorAdapter};

/// Liveness check and per-adapter probe for one host at a time
#[derive(Clone)]
pub struct ProjectorProbe {
    client: Client,
    ping_timeout: Duration,
    probe_timeout: Duration,
}

impl ProjectorProbe {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            client: Client::new(),
            ping_timeout: config.ping_timeout(),
            probe_timeout: config.probe_timeout(),
        }
    }

    /// Any HTTP response on `/` counts as alive
    pub async fn is_alive(&self, host: &str) -> bool {
        let Ok(url) = device_url(host, "/", None) else {
            return false;
        };
        self.client
            .get(url)
            .timeout(self.ping_timeout)
            .send()
            .await
            .is_ok()
    }

    async fn fetch_control_page(
        &self,
        adapter: &dyn ProjectorAdapter,
        host: &str,
        authenticated: bool,
    ) -> Option<StatusCode> {
        let descriptor = adapter.descriptor();
        let page = descriptor.control_page.as_deref()?;
        let url = device_url(host, page, None).ok()?;
        let login = descriptor.login();
        let credentials = authenticated.then_some(&login);

        http_request(
            &self.client,
            HttpMethod::Get,
            url,
            &descriptor.render_headers(host),
            credentials,
        )
        .ok()?
        .timeout(self.probe_timeout)
        .send()
        .await
        .ok()
        .map(|response| response.status())
    }

    /// Classify `host` against one adapter
    pub async fn probe_adapter(&self, adapter: &dyn ProjectorAdapter, host: &str) -> ProbeOutcome {
        let found = |credentials| ProbeMatch {
            ip: host.to_string(),
            projector_type: adapter.id().to_string(),
            credentials,
        };

        match self.fetch_control_page(adapter, host, false).await {
            Some(StatusCode::OK) => {
                ProbeOutcome::HighConfidence(found(Some(adapter.descriptor().login())))
            }
            Some(StatusCode::UNAUTHORIZED) => {
                match self.fetch_control_page(adapter, host, true).await {
                    Some(StatusCode::OK) => {
                        ProbeOutcome::HighConfidence(found(Some(adapter.descriptor().login())))
                    }
                    Some(StatusCode::UNAUTHORIZED) | None => {
                        ProbeOutcome::LowConfidence(found(None))
                    }
                    Some(status) => {
                        tracing::debug!(
                            adapter = adapter.id(),
                            host,
                            %status,
                            "unexpected login reply"
                        );
                        ProbeOutcome::NoMatch
                    }
                }
            }
            _ => ProbeOutcome::NoMatch,
        }
    }

    /// Liveness check, then adapters in order until one matches with high
    /// confidence
    pub async fn probe_address(
        &self,
        adapters: &[Arc<dyn ProjectorAdapter>],
        host: &str,
    ) -> (AddressState, ProbeOutcome) {
        if !self.is_alive(host).await {
            tracing::trace!(host, "no response");
            return (AddressState::Dead, ProbeOutcome::NoMatch);
        }

        let mut outcomes = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let outcome = self.probe_adapter(adapter.as_ref(), host).await;
            tracing::debug!(host, adapter = adapter.id(), ?outcome, "probed");
            let high = outcome.is_high();
            outcomes.push(outcome);
            if high {
                break;
            }
        }

        (AddressState::Live, select_best(outcomes))
    }
}
