use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::path::PathBuf;
use std::time::Duration;
use tempctl_lib::transport;

fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

pub(crate) fn parse_degree_celsius(s: &str) -> Result<f32, String> {
    let value = s
        .parse::<f32>()
        .map_err(|e| format!("Invalid temperature value format: {e}"))?;
    tempctl_lib::protocol::centi_degrees_encode(value).map_err(|e| e.to_string())?;
    Ok(value)
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    pub fn is_on(self) -> bool {
        self == PowerState::On
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Run the demonstration loop: optionally command a setpoint, then
    /// print temperature and setpoint at a fixed interval.
    #[clap(verbatim_doc_comment)]
    Daemon {
        /// Interval between readings (e.g., "10s", "1m").
        #[arg(value_parser = humantime::parse_duration, short, long, default_value = "2sec")]
        poll_interval: Duration,

        /// Setpoint in °C to command before polling.
        /// Enables the computer setpoint source first.
        #[arg(short, long, allow_negative_numbers = true, value_parser = parse_degree_celsius, verbatim_doc_comment)]
        setpoint: Option<f32>,

        /// Switch the controller output on before polling.
        #[arg(long)]
        power_on: bool,

        /// YAML file with the daemon settings.
        /// Replaces --poll-interval, --setpoint and --power-on when given,
        /// and the serial options when it has a `serial` section.
        #[arg(short, long, verbatim_doc_comment)]
        config_file: Option<PathBuf>,
    },

    /// Read and display the current temperature of the primary sensor.
    Read,

    /// Read and display the setpoint the controller regulates to.
    ReadSetpoint,

    /// Read and display temperature and setpoint.
    ReadAll,

    /// Make the controller accept setpoints from the serial line
    /// instead of its front panel.
    #[clap(verbatim_doc_comment)]
    EnableComputerSetpoint,

    /// Set the fixed setpoint in °C.
    /// Enables the computer setpoint source first.
    /// The value is not checked against the controller's limits.
    #[clap(verbatim_doc_comment)]
    SetSetpoint {
        /// Setpoint in degrees Celsius (°C), with up to two decimals.
        /// Example: "23.45", "-10".
        #[arg(allow_negative_numbers = true, value_parser = parse_degree_celsius, verbatim_doc_comment)]
        value: f32,
    },

    /// Switch the controller output on or off.
    Power {
        #[arg(value_enum)]
        state: PowerState,
    },
}

const fn about_text() -> &'static str {
    "Temperature controller CLI - Read and control a temperature controller over its serial protocol."
}

#[derive(Parser, Debug)]
#[command(name="tempctl", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is warn.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// Serial port device name.
    /// Examples: "/dev/ttyUSB0" (Linux), "COM3" (Windows).
    #[arg(global = true, short, long, default_value_t = default_device_name(), verbatim_doc_comment)]
    pub device: String,

    /// Baud rate for serial communication.
    #[arg(global = true, long, default_value_t = transport::DEFAULT_BAUD_RATE)]
    pub baud_rate: u32,

    /// Serial I/O timeout for read/write operations.
    /// Examples: "1s", "500ms".
    #[arg(global = true, long, default_value = "500ms", value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub timeout: Duration,

    /// Pause after every transmitted byte.
    /// The controller loses bytes that arrive in bursts.
    #[arg(global = true, long, default_value = "1ms", value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub byte_delay: Duration,

    #[command(subcommand)]
    pub command: CliCommands,
}

impl CliArgs {
    pub fn serial_settings(&self) -> transport::SerialSettings {
        transport::SerialSettings {
            baud_rate: self.baud_rate,
            timeout: self.timeout,
            byte_delay: self.byte_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }

    #[test]
    fn parse_set_setpoint() {
        let args = CliArgs::try_parse_from(["tempctl", "set-setpoint", "-10.5"]).unwrap();
        assert_eq!(args.command, CliCommands::SetSetpoint { value: -10.5 });
        assert_eq!(args.serial_settings(), transport::SerialSettings::default());
    }

    #[test]
    fn parse_global_options() {
        let args = CliArgs::try_parse_from([
            "tempctl",
            "power",
            "on",
            "--device",
            "/dev/ttyS1",
            "--timeout",
            "1s",
            "--byte-delay",
            "2ms",
        ])
        .unwrap();
        assert_eq!(args.device, "/dev/ttyS1");
        assert_eq!(args.command, CliCommands::Power { state: PowerState::On });
        assert_eq!(args.serial_settings().timeout, Duration::from_secs(1));
        assert_eq!(args.serial_settings().byte_delay, Duration::from_millis(2));
    }

    #[test]
    fn reject_invalid_setpoint() {
        assert!(CliArgs::try_parse_from(["tempctl", "set-setpoint", "warm"]).is_err());
        assert!(CliArgs::try_parse_from(["tempctl", "set-setpoint", "1e9"]).is_err());
    }
}
