//! Wire format of the controller's framed ASCII protocol.
//!
//! A request frame is `*` + address + opcode + payload + checksum + `\r`.
//! The payload is a 32-bit two's-complement value written as 8 lowercase hex
//! digits and the checksum is the byte sum (mod 256) of everything between
//! the start marker and the checksum, written as 2 lowercase hex digits.
//!
//! The controller answers with `*` + body + checksum + `^`, where the body
//! ends with the 8-digit payload.
use crate::error::{Error, Result};
use std::fmt;

pub const START_OF_FRAME: u8 = b'*';
pub const END_OF_REQUEST: u8 = b'\r';
/// Terminator of every reply, the receiver reads until it sees this byte.
pub const END_OF_REPLY: u8 = b'^';

pub const DEVICE_ADDRESS: &str = "00";
pub const PAYLOAD_LEN: usize = 8;
pub const CHECKSUM_LEN: usize = 2;
pub const REQUEST_FRAME_LEN: usize = 1 + DEVICE_ADDRESS.len() + 2 + PAYLOAD_LEN + CHECKSUM_LEN + 1;
pub const MIN_REPLY_FRAME_LEN: usize = 1 + PAYLOAD_LEN + CHECKSUM_LEN + 1;
/// Length of a reply body that echoes address and opcode before the payload.
pub const ECHOED_BODY_LEN: usize = DEVICE_ADDRESS.len() + 2 + PAYLOAD_LEN;
pub const ZERO_PAYLOAD: &str = "00000000";

/// The controller reports and accepts temperatures in hundredths of a degree.
pub const CENTI_DEGREES_PER_DEGREE: f32 = 100.0;

/// Commands understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Read the primary sensor (input 1).
    ReadInput1,
    /// Read the setpoint the controller is currently regulating to.
    ReadDesiredControlValue,
    /// Write the fixed setpoint used when the computer is the setpoint source.
    WriteFixedSetpoint,
    /// Select where the setpoint comes from, `0` selects the computer.
    DefineSetpointSource,
    /// Switch the output on (`1`) or off (`0`).
    PowerOnOff,
}

impl Command {
    /// The two character opcode sent on the wire.
    pub const fn opcode(&self) -> &'static str {
        match self {
            Command::ReadInput1 => "01",
            Command::ReadDesiredControlValue => "03",
            Command::WriteFixedSetpoint => "1c",
            Command::DefineSetpointSource => "29",
            Command::PowerOnOff => "2d",
        }
    }

    const fn name(&self) -> &'static str {
        match self {
            Command::ReadInput1 => "read input 1",
            Command::ReadDesiredControlValue => "read desired control value",
            Command::WriteFixedSetpoint => "write fixed setpoint",
            Command::DefineSetpointSource => "define setpoint source",
            Command::PowerOnOff => "power on/off",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.opcode())
    }
}

/// Encodes a signed value as 8 lowercase hex digits of its 32-bit two's complement.
pub fn encode_value(value: i32) -> String {
    format!("{:08x}", value as u32)
}

/// Decodes an 8 digit hex payload back into a signed 32-bit value.
pub fn decode_value(payload: &str) -> Result<i32> {
    if payload.len() != PAYLOAD_LEN || !payload.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::MalformedFrame(format!(
            "payload {payload:?} is not {PAYLOAD_LEN} hex digits"
        )));
    }
    u32::from_str_radix(payload, 16)
        .map(|value| value as i32)
        .map_err(|err| Error::MalformedFrame(format!("payload {payload:?}: {err}")))
}

/// Sum of all bytes modulo 256, as 2 lowercase hex digits.
pub fn checksum(data: &str) -> String {
    let sum = data.bytes().fold(0u8, |acc, byte| acc.wrapping_add(byte));
    format!("{sum:02x}")
}

/// Builds a complete request frame.
///
/// `value_hex` is expected to be an 8 digit payload as produced by [`encode_value`].
pub fn build_frame(address: &str, command: Command, value_hex: &str) -> Vec<u8> {
    debug_assert_eq!(value_hex.len(), PAYLOAD_LEN);
    let body = format!("{address}{}{value_hex}", command.opcode());
    let mut frame = Vec::with_capacity(body.len() + CHECKSUM_LEN + 2);
    frame.push(START_OF_FRAME);
    frame.extend_from_slice(body.as_bytes());
    frame.extend_from_slice(checksum(&body).as_bytes());
    frame.push(END_OF_REQUEST);
    frame
}

/// Builds the reply the controller sends for a payload.
pub fn build_reply_frame(value_hex: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(MIN_REPLY_FRAME_LEN);
    frame.push(START_OF_FRAME);
    frame.extend_from_slice(value_hex.as_bytes());
    frame.extend_from_slice(checksum(value_hex).as_bytes());
    frame.push(END_OF_REPLY);
    frame
}

/// Validates the reply to `command` and returns its 8 digit payload in lowercase.
///
/// The body between the start marker and the checksum is either the bare
/// payload or the payload prefixed with the echoed address and opcode, which
/// must match [`DEVICE_ADDRESS`] and `command`. The checksum is recomputed
/// over the whole body and compared case-insensitively.
pub fn parse_frame(raw: &[u8], command: Command) -> Result<String> {
    if raw.len() < MIN_REPLY_FRAME_LEN {
        return Err(Error::MalformedFrame(format!(
            "expected at least {MIN_REPLY_FRAME_LEN} bytes, got {}",
            raw.len()
        )));
    }
    if raw[0] != START_OF_FRAME {
        return Err(Error::MalformedFrame(format!(
            "expected start marker {:?}, got {:?}",
            START_OF_FRAME as char, raw[0] as char
        )));
    }
    let last = raw[raw.len() - 1];
    if last != END_OF_REPLY {
        return Err(Error::MalformedFrame(format!(
            "expected end marker {:?}, got {:?}",
            END_OF_REPLY as char, last as char
        )));
    }

    let content = std::str::from_utf8(&raw[1..raw.len() - 1])
        .ok()
        .filter(|content| content.is_ascii())
        .ok_or_else(|| Error::MalformedFrame(String::from("reply is not ASCII")))?;
    let (body, received) = content.split_at(content.len() - CHECKSUM_LEN);

    if body.len() != PAYLOAD_LEN && body.len() != ECHOED_BODY_LEN {
        return Err(Error::MalformedFrame(format!(
            "reply body has {} characters, expected {PAYLOAD_LEN} or {ECHOED_BODY_LEN}",
            body.len()
        )));
    }

    let expected = checksum(body);
    if !expected.eq_ignore_ascii_case(received) {
        return Err(Error::ChecksumMismatch {
            expected,
            received: received.to_string(),
        });
    }

    let (prefix, payload) = body.split_at(body.len() - PAYLOAD_LEN);
    if !prefix.is_empty() {
        let (address, opcode) = prefix.split_at(DEVICE_ADDRESS.len());
        if !address.eq_ignore_ascii_case(DEVICE_ADDRESS)
            || !opcode.eq_ignore_ascii_case(command.opcode())
        {
            return Err(Error::MalformedFrame(format!(
                "reply echoes {prefix:?}, expected {DEVICE_ADDRESS}{} for {command}",
                command.opcode()
            )));
        }
    }

    decode_value(payload)?;
    Ok(payload.to_ascii_lowercase())
}

/// Converts a centi-degree payload into degrees.
pub fn centi_degrees_decode(payload: &str) -> Result<f32> {
    Ok(decode_value(payload)? as f32 / CENTI_DEGREES_PER_DEGREE)
}

/// Converts degrees into centi-degrees, rounding to the nearest integer.
///
/// Only checks that the value fits the 32-bit payload, device limits are
/// left to the controller.
pub fn centi_degrees_encode(value: f32) -> Result<i32> {
    let scaled = (value * CENTI_DEGREES_PER_DEGREE).round();
    if !scaled.is_finite() || scaled < i32::MIN as f32 || scaled >= i32::MAX as f32 {
        return Err(Error::ValueOutOfRange(value));
    }
    Ok(scaled as i32)
}
