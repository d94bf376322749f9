//! Command-line front end: discovery sweeps and one-shot device commands.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{self, ControlConfig, DiscoveryConfig};
use crate::device_control::{AdapterRegistry, Projector};
use crate::error::AppError;
use crate::results::{DeviceRecord, DiscoveryResult};
use crate::scanner::manager::DiscoveryManager;

#[derive(Parser)]
#[command(name = "projector_control", about = "Discover and control networked projectors")]
pub struct Cli {
    /// Discovery results file (defaults to $PROJECTOR_DATA_PATH or data.json)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Timeout for device commands and status queries
    #[arg(long, global = true, default_value_t = 3000)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sweep an address range for projectors and save the results
    Discover {
        /// First three octets of the range
        #[arg(long, default_value = "192.168.0")]
        network: String,

        #[arg(long, default_value_t = 0)]
        start: u8,

        #[arg(long, default_value_t = 254)]
        end: u8,

        /// HTTP port, when the projectors do not listen on 80
        #[arg(long)]
        port: Option<u16>,

        /// Addresses probed at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Where to write the results (defaults to the data file)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List installed projector types
    Adapters,

    /// Control one projector
    Device {
        #[command(flatten)]
        select: DeviceSelector,

        #[command(subcommand)]
        action: DeviceAction,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct DeviceSelector {
    /// Device address
    #[arg(long, conflicts_with = "index")]
    pub ip: Option<String>,

    /// Projector type, for an address not in the results file
    #[arg(long = "type", requires = "ip")]
    pub projector_type: Option<String>,

    /// Position in the results file, resolved entries first
    #[arg(long)]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerState {
    On,
    Off,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DeviceAction {
    /// Switch the projector on or off
    Power { state: PowerState },
    /// Print the power state
    Status,
    /// Print the current input source
    Source,
    /// Switch to an input source
    SetSource {
        name: String,
        /// Cycle-key presses before giving up
        #[arg(long)]
        attempts: Option<usize>,
    },
    /// Send a raw command from the projector's command table
    Send { command: String },
    /// List the sources a cycle command steps through
    Targets { cycle_command: String },
    /// List selectable sources and feature commands
    Sources,
}

/// Pick the device record a command applies to
pub fn select_device(
    select: &DeviceSelector,
    results: &DiscoveryResult,
) -> Result<DeviceRecord, AppError> {
    if let Some(ip) = &select.ip {
        if let Some(record) = results.find(ip) {
            let mut record = record.clone();
            if let Some(projector_type) = &select.projector_type {
                record.projector_type = projector_type.clone();
            }
            return Ok(record);
        }
        return match &select.projector_type {
            Some(projector_type) => Ok(DeviceRecord::new(ip, projector_type)),
            None => Err(AppError::NoDevice(format!(
                "{} is not in the results file; pass --type",
                ip
            ))),
        };
    }

    if let Some(index) = select.index {
        return results.all().nth(index).cloned().ok_or_else(|| {
            AppError::NoDevice(format!(
                "index {} out of range ({} devices)",
                index,
                results.len()
            ))
        });
    }

    Err(AppError::NoDevice("pass --ip or --index".to_string()))
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    let data = cli.data.clone().unwrap_or_else(config::data_path);
    let registry = AdapterRegistry::builtin();

    match cli.command {
        Command::Discover {
            network,
            start,
            end,
            port,
            concurrency,
            output,
        } => {
            let mut config = DiscoveryConfig::from_env().with_port(port);
            if let Some(concurrency) = concurrency {
                config = config.with_max_concurrent(concurrency);
            }
            let output = output.unwrap_or(data);
            discover(registry, config, &network, start, end, &output).await
        }
        Command::Adapters => {
            for id in registry.list() {
                println!("{}", id);
            }
            Ok(())
        }
        Command::Device { select, action } => {
            let control = ControlConfig {
                request_timeout_ms: cli.timeout_ms,
                ..ControlConfig::default()
            };
            let results = DiscoveryResult::load_or_default(&data)?;
            let record = select_device(&select, &results)?;
            let projector = Projector::new(record, &registry, control.build_client()?)?
                .with_max_attempts(control.max_attempts);
            device_action(&projector, action).await
        }
    }
}

async fn discover(
    registry: AdapterRegistry,
    config: DiscoveryConfig,
    network: &str,
    start: u8,
    end: u8,
    output: &Path,
) -> Result<(), AppError> {
    let manager = DiscoveryManager::new(registry, config);

    let stop = manager.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
        tracing::warn!(error = %e, "cannot install interrupt handler");
    }

    let sweep = manager.run(network, start, end).await?;
    let mut result = sweep.result;

    match DiscoveryResult::load_or_default(output) {
        Ok(previous) => result.carry_over_from(&previous, &sweep.skipped),
        Err(e) => tracing::warn!(error = %e, "previous results not carried over"),
    }
    result.save(output)?;

    for record in &result.resolved {
        println!("{}\t{}\t{}", record.ip, record.projector_type, record.display_name());
    }
    for record in &result.unauthorized {
        println!("{}\t{}\tlogin refused", record.ip, record.projector_type);
    }
    println!(
        "{} resolved, {} unauthorized, saved to {}",
        result.resolved.len(),
        result.unauthorized.len(),
        output.display()
    );
    Ok(())
}

async fn device_action(projector: &Projector, action: DeviceAction) -> Result<(), AppError> {
    match action {
        DeviceAction::Power { state } => {
            let result = match state {
                PowerState::On => projector.on().await?,
                PowerState::Off => projector.off().await?,
            };
            println!("{}", result.message);
        }
        DeviceAction::Status => {
            let on = projector.status().await?;
            println!("{}", if on { "on" } else { "off" });
        }
        DeviceAction::Source => match projector.source().await {
            Some(source) => println!("{}", source),
            None => println!("unknown"),
        },
        DeviceAction::SetSource { name, attempts } => {
            let reached = match attempts {
                Some(attempts) => projector.set_source_with_attempts(&name, attempts).await?,
                None => projector.set_source(&name).await?,
            };
            if reached {
                println!("source set to {}", name);
            } else {
                println!("source {} not reached", name);
            }
        }
        DeviceAction::Send { command } => {
            let result = projector.execute(&command).await?;
            println!("{}", result.message);
        }
        DeviceAction::Targets { cycle_command } => {
            for target in projector.get_targets(&cycle_command) {
                println!("{}", target);
            }
        }
        DeviceAction::Sources => {
            println!("sources: {}", projector.selectable_sources().join(", "));
            println!("features: {}", projector.feature_commands().join(", "));
        }
    }
    Ok(())
}
