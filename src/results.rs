//! Persisted discovery results. The file is the hand-off between a sweep
//! and device control, so fields this crate does not know about are kept
//! as they were found.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::device_control::Credentials;
use crate::error::StoreError;
use crate::scanner::{ProbeMatch, ProbeOutcome};

/// One discovered projector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub ip: String,
    pub projector_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceRecord {
    pub fn new(ip: &str, projector_type: &str) -> Self {
        Self {
            ip: ip.to_string(),
            projector_type: projector_type.to_string(),
            name: None,
            username: None,
            password: None,
            extra: Map::new(),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.username = Some(credentials.username);
        self.password = Some(credentials.password);
        self
    }

    /// Name to show for the device, falling back to its address
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.ip)
    }
}

impl From<ProbeMatch> for DeviceRecord {
    fn from(found: ProbeMatch) -> Self {
        let record = DeviceRecord::new(&found.ip, &found.projector_type);
        match found.credentials {
            Some(credentials) => record.with_credentials(credentials),
            None => record,
        }
    }
}

/// Output of one discovery sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    #[serde(default)]
    pub resolved: Vec<DeviceRecord>,
    #[serde(default)]
    pub unauthorized: Vec<DeviceRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DiscoveryResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a probe outcome. Returns false when nothing was added, either
    /// because the outcome is `NoMatch` or the address is already listed.
    pub fn record(&mut self, outcome: ProbeOutcome) -> bool {
        let (found, high) = match outcome {
            ProbeOutcome::NoMatch => return false,
            ProbeOutcome::LowConfidence(found) => (found, false),
            ProbeOutcome::HighConfidence(found) => (found, true),
        };

        if self.contains(&found.ip) {
            tracing::debug!(ip = %found.ip, "address already recorded");
            return false;
        }

        if high {
            self.resolved.push(found.into());
        } else {
            let mut record = DeviceRecord::from(found);
            record.username = None;
            record.password = None;
            self.unauthorized.push(record);
        }
        true
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.find(ip).is_some()
    }

    pub fn find(&self, ip: &str) -> Option<&DeviceRecord> {
        self.all().find(|record| record.ip == ip)
    }

    /// Resolved entries followed by unauthorized ones
    pub fn all(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.resolved.iter().chain(self.unauthorized.iter())
    }

    pub fn len(&self) -> usize {
        self.resolved.len() + self.unauthorized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep user-assigned names and unknown fields from a previous sweep
    /// for addresses found again, and keep previous entries for the
    /// `unprobed` addresses as they were
    pub fn carry_over_from(&mut self, previous: &DiscoveryResult, unprobed: &[String]) {
        for record in self.resolved.iter_mut().chain(self.unauthorized.iter_mut()) {
            let Some(old) = previous.find(&record.ip) else {
                continue;
            };
            if record.name.is_none() {
                record.name = old.name.clone();
            }
            for (key, value) in &old.extra {
                record
                    .extra
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }

        let is_unprobed = |record: &&DeviceRecord| unprobed.contains(&record.ip);
        let kept: Vec<DeviceRecord> = previous
            .resolved
            .iter()
            .filter(is_unprobed)
            .filter(|record| !self.contains(&record.ip))
            .cloned()
            .collect();
        self.resolved.extend(kept);
        let kept: Vec<DeviceRecord> = previous
            .unauthorized
            .iter()
            .filter(is_unprobed)
            .filter(|record| !self.contains(&record.ip))
            .cloned()
            .collect();
        self.unauthorized.extend(kept);

        for (key, value) in &previous.extra {
            self.extra
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the file if it exists, otherwise an empty result
    pub fn load_or_default(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let encoded = serde_json::to_string_pretty(self)?;
        std::fs::write(path, encoded).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), devices = self.len(), "saved discovery results");
        Ok(())
    }
}
