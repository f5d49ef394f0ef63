//! A library for driving a thermoelectric temperature controller over its
//! framed ASCII serial protocol.
//!
//! Every exchange is one transaction: a request frame is written byte by byte
//! with a short pause after each byte, then the reply is read up to its
//! terminator, validated and decoded.
//!
//! This crate provides two ways to talk to the controller:
//!
//! 1.  **Controller client**: [`client::TemperatureController`] owns the
//!     transport and exposes typed operations (read temperature, read and
//!     write the setpoint, power, setpoint source). [`safe_client::SafeClient`]
//!     wraps it for sharing between threads.
//!
//! 2.  **Low-level building blocks**: the frame codec in [`protocol`] and the
//!     transaction [`executor::Executor`] for raw commands.
//!
//! ## Features
//!
//! - **Protocol Implementation**: Frame building, checksum and reply validation.
//! - **Strongly-Typed API**: Commands are a closed enum, temperatures are °C.
//! - **Pluggable Transport**: The `serial` feature drives a real serial port,
//!   any other type implementing [`transport::Transport`] works too.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tempctl_lib::{client::TemperatureController, transport::SerialSettings};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut controller = TemperatureController::open("/dev/ttyUSB0", &SerialSettings::default())?;
//!
//!     let temperature = controller.get_temperature()?;
//!     println!("Current temperature: {temperature:.2} °C");
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod executor;
pub mod protocol;
pub mod safe_client;
pub mod transport;

pub use error::{Error, Result};
