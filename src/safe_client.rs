//! Thread-safe handle to one controller connection.
//!
//! The controller itself is strictly single-threaded. `SafeClient` puts it
//! behind a mutex so clones can be handed to several threads; each call holds
//! the lock for exactly one transaction, so requests never interleave on the line.
//!
//! ## Example
//!
//! ```no_run
//! use tempctl_lib::{safe_client::SafeClient, transport::SerialSettings};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SafeClient::open("/dev/ttyUSB0", &SerialSettings::default())?;
//!
//!     let mut poller = client.clone();
//!     let handle = std::thread::spawn(move || poller.get_temperature());
//!
//!     let mut client = client;
//!     println!("Setpoint: {} °C", client.get_setpoint()?);
//!     println!("Temperature: {} °C", handle.join().expect("poller panicked")?);
//!     Ok(())
//! }
//! ```

use crate::{client::TemperatureController, error::Result, protocol::Command, transport::Transport};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Synchronous, shareable client for the temperature controller.
#[derive(Debug)]
pub struct SafeClient<T: Transport> {
    controller: Arc<Mutex<TemperatureController<T>>>,
}

impl<T: Transport> Clone for SafeClient<T> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
        }
    }
}

#[cfg(feature = "serial")]
impl SafeClient<Box<dyn tokio_serial::SerialPort>> {
    /// Opens the serial port and wraps the new controller.
    pub fn open(device: &str, settings: &crate::transport::SerialSettings) -> Result<Self> {
        Ok(Self::new(TemperatureController::open(device, settings)?))
    }
}

impl<T: Transport> SafeClient<T> {
    /// Creates a new `SafeClient` owning the given controller.
    pub fn new(controller: TemperatureController<T>) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
        }
    }

    /// Creates a new `SafeClient` from a shared controller.
    pub fn from_shared(controller: Arc<Mutex<TemperatureController<T>>>) -> Self {
        Self { controller }
    }

    /// Clones the shared controller.
    pub fn clone_shared(&self) -> Arc<Mutex<TemperatureController<T>>> {
        self.controller.clone()
    }

    // Poisoning is ignored, every transaction starts from a fresh frame.
    fn lock(&self) -> MutexGuard<'_, TemperatureController<T>> {
        self.controller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_open()
    }

    /// Closes the connection for every clone.
    pub fn close(&mut self) {
        self.lock().close()
    }

    /// Runs one raw transaction and returns the reply payload.
    pub fn execute(&mut self, command: Command, value_hex: &str) -> Result<String> {
        self.lock().execute(command, value_hex)
    }

    /// Makes the controller accept setpoints from this connection.
    pub fn enable_computer_setpoint(&mut self) -> Result<()> {
        self.lock().enable_computer_setpoint()
    }

    /// Switches the controller output on or off.
    pub fn power(&mut self, on: bool) -> Result<()> {
        self.lock().power(on)
    }

    /// Reads the primary sensor in degrees Celsius (°C).
    pub fn get_temperature(&mut self) -> Result<f32> {
        self.lock().get_temperature()
    }

    /// Reads the active setpoint in degrees Celsius (°C).
    pub fn get_setpoint(&mut self) -> Result<f32> {
        self.lock().get_setpoint()
    }

    /// Writes the fixed setpoint in degrees Celsius (°C).
    pub fn set_setpoint(&mut self, temperature: f32) -> Result<()> {
        self.lock().set_setpoint(temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol as proto;
    use crate::transport::mock::MockTransport;
    use crate::Error;
    use assert_matches::assert_matches;
    use std::time::Duration;

    #[test]
    fn transactions_from_threads_do_not_interleave() {
        let mock = MockTransport::new();
        for _ in 0..8 {
            mock.push_reply(&proto::build_reply_frame("00001e00"));
        }
        let client = SafeClient::new(TemperatureController::with_byte_delay(
            mock.clone(),
            Duration::ZERO,
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mut client = client.clone();
                std::thread::spawn(move || client.get_temperature())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 76.8);
        }

        let request = proto::build_frame(proto::DEVICE_ADDRESS, Command::ReadInput1, proto::ZERO_PAYLOAD);
        assert_eq!(mock.written(), request.repeat(8));
    }

    #[test]
    fn close_applies_to_all_clones() {
        let mut client = SafeClient::new(TemperatureController::new(MockTransport::new()));
        let mut other = client.clone();
        assert!(other.is_open());
        client.close();
        assert!(!other.is_open());
        assert_matches!(other.get_setpoint(), Err(Error::ConnectionClosed));
    }

    #[test]
    fn shared_controller() {
        let mock = MockTransport::new();
        mock.push_reply(&proto::build_reply_frame(proto::ZERO_PAYLOAD));
        mock.push_reply(&proto::build_reply_frame("000009c4"));
        let client = SafeClient::new(TemperatureController::with_byte_delay(mock.clone(), Duration::ZERO));
        let mut from_shared = SafeClient::from_shared(client.clone_shared());

        from_shared.enable_computer_setpoint().unwrap();
        assert!(client.clone_shared().lock().unwrap().is_computer_setpoint_enabled());
        from_shared.set_setpoint(25.0).unwrap();
        assert!(mock.written().ends_with(b"*001c000009c4b4\r"));
    }
}
