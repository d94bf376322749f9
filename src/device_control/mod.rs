mod adapter;
mod christie;
mod controller;
pub mod engine;
mod epson;
pub mod reconciler;
mod registry;
mod simulator;
mod types;

pub use adapter::{CommandHandler, ProjectorAdapter};
pub use christie::ChristieProjector;
pub use controller::{DeviceSettings, Projector};
pub use epson::EpsonProjector;
pub use reconciler::DEFAULT_MAX_ATTEMPTS;
pub use registry::AdapterRegistry;
pub use simulator::{SimulatedProjector, SimulatedState};
pub use types::{
    AdapterDescriptor, CommandKind, CommandResult, CommandSpec, Credentials, HttpMethod,
    ParamValue, Target,
};
