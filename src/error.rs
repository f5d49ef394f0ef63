//! Error types shared by the codec, the transaction executor and the clients.

/// Represents all possible errors that can occur while talking to the controller.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The reply was too short, had the wrong start or end marker, or carried
    /// non-hex content. A read that timed out before the terminator looks the same.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// The reply was well formed but its checksum does not match its content.
    #[error("Checksum mismatch: expected {expected}, received {received}")]
    ChecksumMismatch { expected: String, received: String },

    /// The value cannot be represented as a 32-bit centi-degree payload.
    #[error("Value {0} out of range")]
    ValueOutOfRange(f32),

    /// `set_setpoint` was called before `enable_computer_setpoint` succeeded
    /// on this connection.
    #[error("Computer setpoint source is not enabled")]
    ComputerSetpointDisabled,

    /// The connection was already closed.
    #[error("Connection is closed")]
    ConnectionClosed,

    /// Wraps transport I/O errors unchanged.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wraps `tokio_serial::Error` raised while opening the port.
    #[cfg(feature = "serial")]
    #[error(transparent)]
    Serial(#[from] tokio_serial::Error),
}

/// The result type for controller operations.
pub type Result<T> = std::result::Result<T, Error>;
