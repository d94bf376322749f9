pub mod manager;
pub mod probe;

use serde::Serialize;

use crate::device_control::Credentials;

/// A host that answered an adapter's control page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeMatch {
    pub ip: String,
    pub projector_type: String,
    /// Default login that opened the control page; `None` when it was refused
    pub credentials: Option<Credentials>,
}

/// Classification of one host against one adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    NoMatch,
    /// The control page exists but the default login was refused
    LowConfidence(ProbeMatch),
    /// The control page opened, with or without the default login
    HighConfidence(ProbeMatch),
}

impl ProbeOutcome {
    pub fn is_high(&self) -> bool {
        matches!(self, ProbeOutcome::HighConfidence(_))
    }
}

/// Reduce per-adapter outcomes (in registry order) to one: the first high
/// confidence match, else the first low confidence match
pub fn select_best(outcomes: impl IntoIterator<Item = ProbeOutcome>) -> ProbeOutcome {
    outcomes
        .into_iter()
        .fold(ProbeOutcome::NoMatch, |best, outcome| match (&best, &outcome) {
            (ProbeOutcome::HighConfidence(_), _) => best,
            (_, ProbeOutcome::HighConfidence(_)) => outcome,
            (ProbeOutcome::NoMatch, ProbeOutcome::LowConfidence(_)) => outcome,
            _ => best,
        })
}

/// What happened to an address during a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressState {
    Dead,
    Live,
    /// Not started before the sweep was stopped
    Skipped,
}

impl std::fmt::Display for AddressState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressState::Dead => write!(f, "dead"),
            AddressState::Live => write!(f, "live"),
            AddressState::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of sweeping one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressReport {
    pub host: String,
    pub state: AddressState,
    pub outcome: ProbeOutcome,
}
