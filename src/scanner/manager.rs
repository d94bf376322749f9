//! Sweep orchestration. Probes a range of addresses with a bounded number of
//! concurrent tasks, tracks progress, and honours a stop signal between
//! addresses.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::{RwLock, Semaphore};

use super::probe::ProjectorProbe;
use super::{AddressReport, AddressState, ProbeOutcome};
use crate::config::DiscoveryConfig;
use crate::device_control::AdapterRegistry;
use crate::error::DiscoveryError;
use crate::results::DiscoveryResult;

/// Sweep status for progress reporting
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStatus {
    pub running: bool,
    pub progress_percent: u8,
    pub addresses_total: u32,
    pub addresses_probed: u32,
    pub matches_found: u32,
    pub last_scan_time: Option<i64>,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default)]
pub struct Sweep {
    pub result: DiscoveryResult,
    /// Addresses a stop request left unprobed
    pub skipped: Vec<String>,
}

/// Runs discovery sweeps against the registry's probe targets
pub struct DiscoveryManager {
    registry: AdapterRegistry,
    config: DiscoveryConfig,
    status: Arc<RwLock<ScanStatus>>,
    stop_signal: Arc<AtomicBool>,
}

impl DiscoveryManager {
    pub fn new(registry: AdapterRegistry, config: DiscoveryConfig) -> Self {
        Self {
            registry,
            config,
            status: Arc::new(RwLock::new(ScanStatus::default())),
            stop_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub async fn get_status(&self) -> ScanStatus {
        self.status.read().await.clone()
    }

    /// Abandon addresses not yet started; results collected so far are kept
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Flag shared with signal handlers; setting it stops the sweep
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop_signal.clone()
    }

    /// Sweep `prefix.start ..= prefix.end`
    pub async fn run(
        &self,
        prefix: &str,
        start: u8,
        end: u8,
    ) -> Result<Sweep, DiscoveryError> {
        if start > end {
            return Err(DiscoveryError::InvalidRange { start, end });
        }

        let hosts: Vec<String> = (start..=end)
            .map(|octet| self.config.host_for(&format!("{}.{}", prefix, octet)))
            .collect();

        let reports = self.probe_hosts(hosts).await?;
        let skipped = skipped_hosts(&reports);
        Ok(Sweep {
            result: collect_results(reports),
            skipped,
        })
    }

    /// Probe an explicit host list, returning one report per host in input
    /// order
    pub async fn probe_hosts(
        &self,
        hosts: Vec<String>,
    ) -> Result<Vec<AddressReport>, DiscoveryError> {
        {
            let mut status = self.status.write().await;
            if status.running {
                return Err(DiscoveryError::AlreadyRunning);
            }
            status.running = true;
            status.progress_percent = 0;
            status.addresses_total = hosts.len().min(u32::MAX as usize) as u32;
            status.addresses_probed = 0;
            status.matches_found = 0;
        }

        let adapters = Arc::new(self.registry.probe_targets());
        let probe = ProjectorProbe::new(&self.config);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let total = hosts.len();

        tracing::info!(
            addresses = total,
            adapters = adapters.len(),
            max_concurrent = self.config.max_concurrent,
            "starting discovery"
        );

        let mut handles = Vec::with_capacity(total);
        for host in &hosts {
            let host = host.clone();
            let sem = semaphore.clone();
            let adapters = adapters.clone();
            let probe = probe.clone();
            let stop_signal = self.stop_signal.clone();
            let status = self.status.clone();

            handles.push(tokio::spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else {
                    return (AddressState::Skipped, ProbeOutcome::NoMatch);
                };
                if stop_signal.load(Ordering::SeqCst) {
                    return (AddressState::Skipped, ProbeOutcome::NoMatch);
                }

                let (state, outcome) = probe.probe_address(&adapters, &host).await;

                let mut s = status.write().await;
                s.addresses_probed = s.addresses_probed.saturating_add(1);
                if outcome != ProbeOutcome::NoMatch {
                    s.matches_found = s.matches_found.saturating_add(1);
                }
                let percent = (s.addresses_probed as usize)
                    .saturating_mul(100)
                    .checked_div(total.max(1))
                    .unwrap_or(0)
                    .min(100);
                s.progress_percent = percent as u8;

                (state, outcome)
            }));
        }

        let mut reports = Vec::with_capacity(total);
        for (host, handle) in hosts.into_iter().zip(handles) {
            let (state, outcome) = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(host = %host, error = %e, "probe task failed");
                    (AddressState::Skipped, ProbeOutcome::NoMatch)
                }
            };
            reports.push(AddressReport {
                host,
                state,
                outcome,
            });
        }

        let skipped = reports
            .iter()
            .filter(|r| r.state == AddressState::Skipped)
            .count();
        if skipped > 0 {
            tracing::info!(skipped, "discovery stopped early");
        }

        {
            let mut s = self.status.write().await;
            s.running = false;
            s.last_scan_time = Some(chrono::Utc::now().timestamp());
            if skipped == 0 {
                s.progress_percent = 100;
            }
        }
        self.stop_signal.store(false, Ordering::SeqCst);

        Ok(reports)
    }
}

/// Hosts that were never probed
pub fn skipped_hosts(reports: &[AddressReport]) -> Vec<String> {
    reports
        .iter()
        .filter(|r| r.state == AddressState::Skipped)
        .map(|r| r.host.clone())
        .collect()
}

/// Fold per-address reports into a result set, keeping address order
pub fn collect_results(reports: Vec<AddressReport>) -> DiscoveryResult {
    let mut result = DiscoveryResult::new();
    for report in reports {
        if result.record(report.outcome) {
            tracing::info!(host = %report.host, "projector found");
        }
    }
    result
}
