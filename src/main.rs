mod config;
mod gateway;
mod session;

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use joystick::discovery::{SwitchHandle, find_manual_control_switch};
use joystick::dispatcher::{DispatchError, round_command};
use joystick::shaper::MovementVector;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::config::{ConfigError, ControlSettings};
use crate::gateway::{Gateway, GatewayError, ValetudoGateway};
use crate::session::{HostEvent, SessionClosed};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("robot exposes no manual control capability")]
    NoManualControlSwitch,
    #[error("invalid movement command: {0}")]
    Command(#[from] DispatchError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Session(#[from] SessionClosed),
}

#[derive(Parser, Debug)]
#[command(name = "valetudo-control", about = "Drive a Valetudo robot from the command line")]
struct Cli {
    /// Robot address, with or without scheme.
    #[arg(long, env = "VALETUDO_URL")]
    url: String,

    #[arg(long, env = "VALETUDO_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "VALETUDO_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Log every request and decision.
    #[arg(long, env = "VALETUDO_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Battery, manual control and water usage at a glance.
    Status,
    Battery,
    /// Return to the dock.
    Dock,
    /// Play the locate sound.
    Locate,
    /// Send a single movement command.
    Send {
        #[arg(long, allow_hyphen_values = true)]
        velocity: f64,
        #[arg(long, allow_hyphen_values = true)]
        angle: f64,
    },
    Manual(ManualCommand),
    Water(WaterCommand),
    /// Run a control session fed by JSON host events on stdin, one per line.
    Drive,
}

#[derive(Args, Debug)]
struct ManualCommand {
    #[command(subcommand)]
    command: ManualSubcommand,
}

#[derive(Subcommand, Debug)]
enum ManualSubcommand {
    On,
    Off,
    Status,
}

#[derive(Args, Debug)]
struct WaterCommand {
    #[command(subcommand)]
    command: WaterSubcommand,
}

#[derive(Subcommand, Debug)]
enum WaterSubcommand {
    Get,
    Set { preset: String },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    let level = if cli.debug { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();

    let gateway = ValetudoGateway::new(&cli.url, cli.username, cli.password)?;
    info!(url = gateway.base_url(), "using robot");

    match cli.command {
        Command::Status => print_json(&gateway::fetch_status(&gateway).await),
        Command::Battery => print_json(&gateway.battery_level().await?),
        Command::Dock => {
            gateway.dock().await?;
            println!("ok");
            Ok(())
        }
        Command::Locate => {
            gateway.play_sound().await?;
            println!("ok");
            Ok(())
        }
        Command::Send { velocity, angle } => run_send(&gateway, velocity, angle).await,
        Command::Manual(manual) => run_manual(&gateway, manual).await,
        Command::Water(water) => run_water(&gateway, water).await,
        Command::Drive => run_drive(Arc::new(gateway)).await,
    }
}

async fn run_send(gateway: &dyn Gateway, velocity: f64, angle: f64) -> Result<(), CliError> {
    let requested = MovementVector::new(velocity, angle);
    if !requested.is_finite() {
        return Err(DispatchError::NonFinite { velocity, angle }.into());
    }
    let settings = ControlSettings::from_env()?;
    let command = round_command(requested, settings.dispatch.velocity_epsilon);
    gateway.send_movement_command(command).await?;
    print_json(&command)
}

async fn run_manual(gateway: &dyn Gateway, manual: ManualCommand) -> Result<(), CliError> {
    let switch = manual_control_switch(gateway).await?;
    match manual.command {
        ManualSubcommand::On => gateway.set_manual_control_state(&switch, true).await?,
        ManualSubcommand::Off => gateway.set_manual_control_state(&switch, false).await?,
        ManualSubcommand::Status => {}
    }
    let enabled = gateway.get_manual_control_state(&switch).await?;
    print_json(&serde_json::json!({ "switch": switch.id(), "enabled": enabled }))
}

async fn run_water(gateway: &dyn Gateway, water: WaterCommand) -> Result<(), CliError> {
    if let WaterSubcommand::Set { preset } = water.command {
        gateway.set_water_usage_preset(&preset).await?;
    }
    print_json(&gateway.get_water_usage_preset().await?)
}

async fn manual_control_switch(gateway: &dyn Gateway) -> Result<SwitchHandle, CliError> {
    let entities = gateway.list_switches().await?;
    find_manual_control_switch(&entities).ok_or(CliError::NoManualControlSwitch)
}

/// Feed stdin into a control session until EOF or Ctrl-C, printing each status change.
async fn run_drive(gateway: Arc<dyn Gateway>) -> Result<(), CliError> {
    let settings = ControlSettings::from_env()?;
    let session = session::spawn_session(gateway, settings);
    let mut status = session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let outcome = loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(CliError::Io(e)),
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<HostEvent>(trimmed) {
                    Ok(HostEvent::Shutdown) => break Ok(()),
                    Ok(event) => {
                        if let Err(e) = session.send(event).await {
                            break Err(e.into());
                        }
                    }
                    Err(e) => warn!(error = %e, line = trimmed, "skipping malformed host event"),
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                if let Err(e) = print_json(&session.status()) {
                    break Err(e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break Ok(());
            }
        }
    };

    // Always unmount so the robot receives its final stop.
    session.shutdown().await;
    outcome
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string(value)?;
    println!("{rendered}");
    Ok(())
}
