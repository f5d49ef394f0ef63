//! Byte-stream transport used by the transaction executor.
//!
//! With the `serial` feature the controller's serial port is a [`Transport`],
//! opened with the fixed 8N1 line settings.
use std::io::{self, Read, Write};
use std::time::Duration;

/// The primitives the protocol engine needs from the line.
pub trait Transport {
    /// Writes and flushes a single byte.
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Appends bytes to `buf` until `terminator` was read or the read timed out.
    ///
    /// A timeout is not an error, the caller gets whatever arrived so far.
    /// Returns the number of bytes appended.
    fn read_until(&mut self, terminator: u8, buf: &mut Vec<u8>) -> io::Result<usize>;

    /// Drops every byte already received but not yet read, such as a reply
    /// that arrived after its transaction timed out.
    fn discard_input(&mut self) -> io::Result<()>;
}

/// Writes and flushes one byte on a blocking stream.
pub fn write_byte<W: Write + ?Sized>(writer: &mut W, byte: u8) -> io::Result<()> {
    writer.write_all(&[byte])?;
    writer.flush()
}

/// Reads one byte at a time until `terminator`, end of stream or a read timeout.
pub fn read_until<R: Read + ?Sized>(
    reader: &mut R,
    terminator: u8,
    buf: &mut Vec<u8>,
) -> io::Result<usize> {
    let start = buf.len();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                buf.push(byte[0]);
                if byte[0] == terminator {
                    break;
                }
            }
            Err(err) if matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                log::trace!("Read timed out after {} bytes", buf.len() - start);
                break;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(buf.len() - start)
}

#[cfg(feature = "serial")]
impl Transport for Box<dyn tokio_serial::SerialPort> {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        write_byte(self, byte)
    }

    fn read_until(&mut self, terminator: u8, buf: &mut Vec<u8>) -> io::Result<usize> {
        read_until(self, terminator, buf)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        (**self).clear(tokio_serial::ClearBuffer::Input)?;
        Ok(())
    }
}

/// The default baud rate of the controller.
pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// The default time to wait for reply bytes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);
/// The default pause after every transmitted byte.
pub const DEFAULT_BYTE_DELAY: Duration = Duration::from_millis(1);

/// Line and pacing settings of a controller connection.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    /// Read and write timeout of the port.
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub timeout: Duration,
    /// Pause after every transmitted byte, the controller drops bytes sent in bursts.
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub byte_delay: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
            byte_delay: DEFAULT_BYTE_DELAY,
        }
    }
}

/// The parity used for serial communication.
#[cfg(feature = "serial")]
pub const PARITY: &tokio_serial::Parity = &tokio_serial::Parity::None;
/// The number of stop bits used for serial communication.
#[cfg(feature = "serial")]
pub const STOP_BITS: &tokio_serial::StopBits = &tokio_serial::StopBits::One;
/// The number of data bits used for serial communication.
#[cfg(feature = "serial")]
pub const DATA_BITS: &tokio_serial::DataBits = &tokio_serial::DataBits::Eight;

/// Creates a `tokio_serial::SerialPortBuilder` with the controller's line settings.
///
/// # Arguments
///
/// * `device` - The path to the serial port device (e.g., `/dev/ttyUSB0`).
/// * `settings` - Baud rate and timeout of the port.
#[cfg(feature = "serial")]
pub fn serial_port_builder(device: &str, settings: &SerialSettings) -> tokio_serial::SerialPortBuilder {
    tokio_serial::new(device, settings.baud_rate)
        .parity(*PARITY)
        .stop_bits(*STOP_BITS)
        .data_bits(*DATA_BITS)
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(settings.timeout)
}

/// Opens the serial port as a blocking stream.
#[cfg(feature = "serial")]
pub fn open(
    device: &str,
    settings: &SerialSettings,
) -> crate::Result<Box<dyn tokio_serial::SerialPort>> {
    log::debug!(
        "Opening {device} at {} baud, timeout {:?}",
        settings.baud_rate,
        settings.timeout
    );
    Ok(serial_port_builder(device, settings).open()?)
}
