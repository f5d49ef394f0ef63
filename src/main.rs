//! Temperature controller CLI
//!
//! A command-line interface (CLI) application for a temperature controller
//! that speaks the framed ASCII protocol over a serial line.
//!
//! This tool allows users to:
//! - Read the current temperature and the active setpoint.
//! - Switch the controller to the computer setpoint source and write a setpoint.
//! - Switch the controller output on or off.
//! - Run a demonstration loop that commands a setpoint and prints readings.
//!
//! The CLI leverages the `tempctl_lib` crate for the protocol and client operations.

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use std::panic;
use tempctl_lib::client::TemperatureController;
use tempctl_lib::transport::Transport;

mod commandline;
mod config;

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}

/// Starts logging to stderr. `RUST_LOG` overrides the verbosity flags.
/// Panics are logged under the `panic` target before the default hook runs.
fn logging_init(loglevel: LevelFilter) -> Result<LoggerHandle> {
    let handle = Logger::try_with_env_or_str(loglevel.as_str())
        .with_context(|| format!("Invalid log specification {loglevel}"))?
        .start()
        .with_context(|| "Cannot start logger")?;

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let thread = std::thread::current();
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| String::from("unknown location"));
        error!(
            target: "panic",
            "tempctl aborted in thread {} at {location}: {}",
            thread.name().unwrap_or("unnamed"),
            panic_message(info.payload())
        );
        default_hook(info);
    }));
    Ok(handle)
}

macro_rules! print_temperature {
    ($device:expr) => {
        let temperature = $device
            .get_temperature()
            .with_context(|| "Cannot read temperature")?;
        println!("Temperature (°C): {temperature:.2}")
    };
}

macro_rules! print_setpoint {
    ($device:expr) => {
        let setpoint = $device
            .get_setpoint()
            .with_context(|| "Cannot read setpoint")?;
        println!("Setpoint (°C): {setpoint:.2}")
    };
}

fn set_setpoint<T: Transport>(controller: &mut TemperatureController<T>, value: f32) -> Result<()> {
    controller
        .enable_computer_setpoint()
        .with_context(|| "Cannot enable computer setpoint")?;
    controller
        .set_setpoint(value)
        .with_context(|| format!("Failed to set setpoint to {value} °C"))
}

fn run_daemon<T: Transport>(
    controller: &mut TemperatureController<T>,
    daemon_config: &config::DaemonConfig,
) -> Result<()> {
    info!("Starting daemon mode: {daemon_config:?}");
    if let Some(setpoint) = daemon_config.setpoint {
        set_setpoint(controller, setpoint)?;
        println!("Setpoint set to {setpoint} °C.");
    }
    if daemon_config.power_on {
        controller
            .power(true)
            .with_context(|| "Cannot switch output on")?;
        println!("Output switched on.");
    }
    loop {
        debug!("Daemon: Reading temperature and setpoint...");
        print_temperature!(controller);
        print_setpoint!(controller);
        std::thread::sleep(daemon_config.poll_interval);
    }
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter())?;
    info!(
        "Temperature controller CLI started. Log level: {}",
        args.verbose.log_level_filter()
    );

    let daemon_config = match &args.command {
        commandline::CliCommands::Daemon {
            poll_interval,
            setpoint,
            power_on,
            config_file,
        } => Some(match config_file {
            Some(path) => config::DaemonConfig::load(path)?,
            None => config::DaemonConfig {
                poll_interval: *poll_interval,
                setpoint: *setpoint,
                power_on: *power_on,
                serial: None,
            },
        }),
        _ => None,
    };

    let settings = daemon_config
        .as_ref()
        .and_then(|config| config.serial)
        .unwrap_or_else(|| args.serial_settings());
    info!(
        "Opening {} (Baud: {}, timeout: {:?}, byte delay: {:?})...",
        args.device, settings.baud_rate, settings.timeout, settings.byte_delay
    );
    let mut controller = TemperatureController::open(&args.device, &settings)
        .with_context(|| format!("Cannot open serial port {}", args.device))?;

    match &args.command {
        commandline::CliCommands::Daemon { .. } => {
            if let Some(daemon_config) = &daemon_config {
                run_daemon(&mut controller, daemon_config)?;
            }
        }
        commandline::CliCommands::Read => {
            info!("Executing: Read Temperature");
            print_temperature!(controller);
        }
        commandline::CliCommands::ReadSetpoint => {
            info!("Executing: Read Setpoint");
            print_setpoint!(controller);
        }
        commandline::CliCommands::ReadAll => {
            info!("Executing: Read All Values");
            print_temperature!(controller);
            print_setpoint!(controller);
        }
        commandline::CliCommands::EnableComputerSetpoint => {
            info!("Executing: Enable Computer Setpoint");
            controller
                .enable_computer_setpoint()
                .with_context(|| "Cannot enable computer setpoint")?;
            println!("Controller now accepts setpoints from the serial line.");
        }
        commandline::CliCommands::SetSetpoint { value } => {
            info!("Executing: Set Setpoint to {value} °C");
            set_setpoint(&mut controller, *value)?;
            println!("Setpoint set to {value} °C successfully.");
        }
        commandline::CliCommands::Power { state } => {
            info!("Executing: Power {state:?}");
            controller
                .power(state.is_on())
                .with_context(|| format!("Failed to switch output {state:?}"))?;
            println!("Output switched {state:?}.");
        }
    }

    controller.close();
    Ok(())
}
