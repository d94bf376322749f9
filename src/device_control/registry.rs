//! Registry of installed projector adapters, keyed by type identifier.

use std::sync::Arc;

use super::adapter::ProjectorAdapter;
use super::christie::ChristieProjector;
use super::epson::EpsonProjector;
use super::simulator::SimulatedProjector;
use crate::error::ControlError;

/// Ordered set of adapters with unique identifiers
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn ProjectorAdapter>>,
}

impl AdapterRegistry {
    /// The adapters shipped with the crate
    pub fn builtin() -> Self {
        let adapters: Vec<Arc<dyn ProjectorAdapter>> = vec![
            Arc::new(ChristieProjector::new()),
            Arc::new(EpsonProjector::new()),
            Arc::new(SimulatedProjector::new()),
        ];
        Self::from_adapters(adapters)
    }

    /// Build a registry from explicit adapters; the first adapter with a
    /// given identifier wins
    pub fn from_adapters(candidates: Vec<Arc<dyn ProjectorAdapter>>) -> Self {
        let mut adapters: Vec<Arc<dyn ProjectorAdapter>> = Vec::with_capacity(candidates.len());
        for adapter in candidates {
            if adapters.iter().any(|existing| existing.id() == adapter.id()) {
                tracing::warn!(adapter = adapter.id(), "duplicate adapter identifier ignored");
                continue;
            }
            adapters.push(adapter);
        }
        Self { adapters }
    }

    /// Registered identifiers in registration order
    pub fn list(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.id().to_string()).collect()
    }

    fn find(&self, id: &str) -> Option<&Arc<dyn ProjectorAdapter>> {
        self.adapters.iter().find(|a| a.id() == id)
    }

    /// Load a usable adapter by identifier
    pub fn load(&self, id: &str) -> Result<Arc<dyn ProjectorAdapter>, ControlError> {
        let adapter = self
            .find(id)
            .ok_or_else(|| ControlError::UnknownAdapter(id.to_string()))?;
        adapter.descriptor().validate()?;
        Ok(adapter.clone())
    }

    /// Valid adapters that discovery should probe for, in registry order
    pub fn probe_targets(&self) -> Vec<Arc<dyn ProjectorAdapter>> {
        self.adapters
            .iter()
            .filter(|adapter| match adapter.descriptor().validate() {
                Ok(()) => adapter.discoverable(),
                Err(e) => {
                    tracing::warn!(adapter = adapter.id(), error = %e, "skipping adapter");
                    false
                }
            })
            .cloned()
            .collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
