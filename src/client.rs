//! Typed operations on a single temperature controller.
//!
//! [`TemperatureController`] owns the transport for the lifetime of the
//! connection. It is either Open (transport held) or Closed (transport
//! released). Closing is one-way: [`TemperatureController::close`] may be
//! called any number of times but releases the transport only once, and
//! dropping the controller closes it on every exit path.
//!
//! # Example
//!
//! ```no_run
//! use tempctl_lib::client::TemperatureController;
//! use tempctl_lib::transport::SerialSettings;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut controller = TemperatureController::open("/dev/ttyUSB0", &SerialSettings::default())?;
//!     controller.enable_computer_setpoint()?;
//!     controller.set_setpoint(25.0)?;
//!     println!("Temperature: {:.2} °C", controller.get_temperature()?);
//!     Ok(())
//! }
//! ```
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::protocol::{self as proto, Command};
use crate::transport::Transport;
use std::time::Duration;

/// Synchronous client for the temperature controller.
///
/// All methods block for the duration of one transaction. A failed
/// transaction leaves the connection open, retrying is up to the caller.
#[derive(Debug)]
pub struct TemperatureController<T: Transport> {
    executor: Option<Executor<T>>,
    computer_setpoint: bool,
}

#[cfg(feature = "serial")]
impl TemperatureController<Box<dyn tokio_serial::SerialPort>> {
    /// Opens the serial port and creates an open controller on it.
    ///
    /// # Arguments
    ///
    /// * `device` - Serial port device name, e.g. `/dev/ttyUSB0` or `COM3`.
    /// * `settings` - Baud rate, timeout and pause between transmitted bytes.
    pub fn open(device: &str, settings: &crate::transport::SerialSettings) -> Result<Self> {
        let port = crate::transport::open(device, settings)?;
        Ok(Self::with_byte_delay(port, settings.byte_delay))
    }
}

impl<T: Transport> TemperatureController<T> {
    /// Creates an open controller that pauses 1 ms after every transmitted byte.
    pub fn new(transport: T) -> Self {
        Self::from_executor(Executor::new(transport))
    }

    /// Creates an open controller with a custom pause after every transmitted byte.
    pub fn with_byte_delay(transport: T, byte_delay: Duration) -> Self {
        Self::from_executor(Executor::with_byte_delay(transport, byte_delay))
    }

    fn from_executor(executor: Executor<T>) -> Self {
        Self {
            executor: Some(executor),
            computer_setpoint: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.executor.is_some()
    }

    /// Releases the transport. Further operations fail with [`Error::ConnectionClosed`].
    pub fn close(&mut self) {
        if let Some(executor) = self.executor.take() {
            log::debug!("Closing controller connection");
            drop(executor.into_inner());
        }
    }

    /// Runs one raw transaction and returns the reply payload.
    ///
    /// `value_hex` must be 8 hex digits, otherwise [`Error::MalformedFrame`] is
    /// returned and nothing is sent.
    pub fn execute(&mut self, command: Command, value_hex: &str) -> Result<String> {
        self.executor
            .as_mut()
            .ok_or(Error::ConnectionClosed)?
            .execute(command, value_hex)
    }

    fn read_degrees(&mut self, command: Command) -> Result<f32> {
        let payload = self.execute(command, proto::ZERO_PAYLOAD)?;
        proto::centi_degrees_decode(&payload)
    }

    /// Makes the controller take its setpoint from this connection instead of
    /// its front panel. Required once per connection before [`Self::set_setpoint`].
    pub fn enable_computer_setpoint(&mut self) -> Result<()> {
        self.execute(Command::DefineSetpointSource, proto::ZERO_PAYLOAD)?;
        self.computer_setpoint = true;
        Ok(())
    }

    /// Whether [`Self::enable_computer_setpoint`] succeeded on this connection.
    pub fn is_computer_setpoint_enabled(&self) -> bool {
        self.computer_setpoint
    }

    /// Switches the controller output on or off.
    pub fn power(&mut self, on: bool) -> Result<()> {
        self.execute(Command::PowerOnOff, &proto::encode_value(i32::from(on)))?;
        Ok(())
    }

    /// Reads the primary sensor in degrees Celsius (°C).
    pub fn get_temperature(&mut self) -> Result<f32> {
        self.read_degrees(Command::ReadInput1)
    }

    /// Reads the setpoint the controller regulates to in degrees Celsius (°C).
    pub fn get_setpoint(&mut self) -> Result<f32> {
        self.read_degrees(Command::ReadDesiredControlValue)
    }

    /// Writes the fixed setpoint in degrees Celsius (°C), rounded to 0.01 °C.
    ///
    /// The value is not checked against the controller's limits.
    ///
    /// # Errors
    ///
    /// [`Error::ComputerSetpointDisabled`] if [`Self::enable_computer_setpoint`]
    /// has not succeeded on this connection; nothing is sent in that case.
    pub fn set_setpoint(&mut self, temperature: f32) -> Result<()> {
        if !self.is_open() {
            return Err(Error::ConnectionClosed);
        }
        if !self.computer_setpoint {
            return Err(Error::ComputerSetpointDisabled);
        }
        let value = proto::centi_degrees_encode(temperature)?;
        self.execute(Command::WriteFixedSetpoint, &proto::encode_value(value))?;
        Ok(())
    }
}
