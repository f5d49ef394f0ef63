//! One request/response exchange with the controller.
use crate::error::Result;
use crate::protocol::{self as proto, Command};
use crate::transport::{Transport, DEFAULT_BYTE_DELAY};
use std::time::Duration;

/// Runs paced, strictly serialized transactions over a transport.
#[derive(Debug)]
pub struct Executor<T: Transport> {
    transport: T,
    byte_delay: Duration,
}

impl<T: Transport> Executor<T> {
    /// Creates an executor with the default pause of [`DEFAULT_BYTE_DELAY`] after every byte.
    pub fn new(transport: T) -> Self {
        Self::with_byte_delay(transport, DEFAULT_BYTE_DELAY)
    }

    pub fn with_byte_delay(transport: T, byte_delay: Duration) -> Self {
        Self {
            transport,
            byte_delay,
        }
    }

    pub fn byte_delay(&self) -> Duration {
        self.byte_delay
    }

    /// Writes the frame one byte at a time, pausing after each byte.
    pub fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        log::trace!("TX {:?}", String::from_utf8_lossy(frame));
        for &byte in frame {
            self.transport.write_byte(byte)?;
            if !self.byte_delay.is_zero() {
                std::thread::sleep(self.byte_delay);
            }
        }
        Ok(())
    }

    /// Reads until the reply terminator or the transport's timeout.
    ///
    /// On timeout the bytes received so far are returned, possibly none.
    pub fn receive(&mut self) -> Result<Vec<u8>> {
        let mut reply = Vec::with_capacity(proto::MIN_REPLY_FRAME_LEN);
        self.transport.read_until(proto::END_OF_REPLY, &mut reply)?;
        log::trace!("RX {:?}", String::from_utf8_lossy(&reply));
        Ok(reply)
    }

    /// Sends `command` with `value_hex` and returns the validated reply payload.
    ///
    /// `value_hex` must be 8 hex digits. Anything else fails with
    /// [`Error::MalformedFrame`](crate::Error::MalformedFrame) before a byte is written.
    /// Input still pending from an earlier exchange is discarded first, so a late
    /// reply is never taken as the answer to this request.
    pub fn execute(&mut self, command: Command, value_hex: &str) -> Result<String> {
        let value_hex = proto::encode_value(proto::decode_value(value_hex)?);
        log::debug!("Executing {command} with payload {value_hex}");
        let frame = proto::build_frame(proto::DEVICE_ADDRESS, command, &value_hex);
        self.transport.discard_input()?;
        self.transmit(&frame)?;
        let reply = self.receive()?;
        proto::parse_frame(&reply, command).inspect_err(|err| log::warn!("{command} rejected: {err}"))
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use crate::Error;
    use assert_matches::assert_matches;
    use std::io;
    use std::time::Instant;

    #[test]
    fn transmit_writes_each_byte_separately() {
        let mock = MockTransport::new();
        let mut executor = Executor::with_byte_delay(mock.clone(), Duration::ZERO);
        let frame = proto::build_frame(proto::DEVICE_ADDRESS, Command::ReadInput1, proto::ZERO_PAYLOAD);
        executor.transmit(&frame).unwrap();
        assert_eq!(mock.written(), frame);
        assert_eq!(mock.write_calls(), proto::REQUEST_FRAME_LEN);
    }

    #[test]
    fn transmit_paces_bytes() {
        let mock = MockTransport::new();
        let mut executor = Executor::with_byte_delay(mock, Duration::from_millis(2));
        let started = Instant::now();
        executor.transmit(b"*0001").unwrap();
        assert!(started.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn default_byte_delay() {
        let executor = Executor::new(MockTransport::new());
        assert_eq!(executor.byte_delay(), Duration::from_millis(1));
    }

    #[test]
    fn execute_returns_payload() {
        let mock = MockTransport::with_reply(&proto::build_reply_frame("00001e00"));
        let mut executor = Executor::with_byte_delay(mock.clone(), Duration::ZERO);
        let payload = executor.execute(Command::ReadInput1, proto::ZERO_PAYLOAD).unwrap();
        assert_eq!(payload, "00001e00");
        assert_eq!(mock.written(), b"*00010000000041\r");
    }

    #[test]
    fn execute_without_reply_is_malformed() {
        let mut executor = Executor::with_byte_delay(MockTransport::new(), Duration::ZERO);
        assert_matches!(
            executor.execute(Command::ReadInput1, proto::ZERO_PAYLOAD),
            Err(Error::MalformedFrame(..))
        );
    }

    #[test]
    fn execute_with_truncated_reply_is_malformed() {
        let mock = MockTransport::with_reply(b"*00001e");
        let mut executor = Executor::with_byte_delay(mock, Duration::ZERO);
        assert_matches!(
            executor.execute(Command::ReadInput1, proto::ZERO_PAYLOAD),
            Err(Error::MalformedFrame(..))
        );
    }

    #[test]
    fn execute_with_corrupted_reply_is_checksum_mismatch() {
        let mock = MockTransport::with_reply(b"*00001e01b6^");
        let mut executor = Executor::with_byte_delay(mock, Duration::ZERO);
        assert_matches!(
            executor.execute(Command::ReadInput1, proto::ZERO_PAYLOAD),
            Err(Error::ChecksumMismatch { .. })
        );
    }

    #[test]
    fn execute_rejects_invalid_payload_before_sending() {
        let mock = MockTransport::with_reply(&proto::build_reply_frame("00000001"));
        let mut executor = Executor::with_byte_delay(mock.clone(), Duration::ZERO);
        for value_hex in ["1", "zzzzzzzz", "", "000000001", "+0000001"] {
            assert_matches!(
                executor.execute(Command::PowerOnOff, value_hex),
                Err(Error::MalformedFrame(..)),
                "payload {value_hex:?}"
            );
        }
        assert!(mock.written().is_empty());
        assert_eq!(mock.discards(), 0);
    }

    #[test]
    fn execute_sends_lowercase_payload() {
        let mock = MockTransport::with_reply(&proto::build_reply_frame("000009c4"));
        let mut executor = Executor::with_byte_delay(mock.clone(), Duration::ZERO);
        assert_eq!(
            executor.execute(Command::WriteFixedSetpoint, "000009C4").unwrap(),
            "000009c4"
        );
        assert_eq!(mock.written(), b"*001c000009c4b4\r");
    }

    #[test]
    fn execute_discards_stale_input() {
        let mock = MockTransport::new();
        mock.push_line(b"*00002710");
        mock.push_line(&proto::build_reply_frame("00002710"));
        mock.push_reply(&proto::build_reply_frame("00001e00"));
        let mut executor = Executor::with_byte_delay(mock.clone(), Duration::ZERO);
        assert_eq!(
            executor.execute(Command::ReadInput1, proto::ZERO_PAYLOAD).unwrap(),
            "00001e00"
        );
        assert_eq!(mock.discards(), 1);
        assert_eq!(mock.line_len(), 0);
    }

    #[test]
    fn execute_rejects_reply_echoing_other_command() {
        let body = "000300001e00";
        let reply = format!("*{body}{}^", proto::checksum(body));
        let mock = MockTransport::with_reply(reply.as_bytes());
        let mut executor = Executor::with_byte_delay(mock, Duration::ZERO);
        assert_matches!(
            executor.execute(Command::ReadInput1, proto::ZERO_PAYLOAD),
            Err(Error::MalformedFrame(..))
        );
    }

    #[test]
    fn execute_propagates_transport_errors() {
        let mock = MockTransport::new();
        mock.fail_writes(io::ErrorKind::TimedOut);
        let mut executor = Executor::with_byte_delay(mock, Duration::ZERO);
        assert_matches!(
            executor.execute(Command::PowerOnOff, "00000001"),
            Err(Error::Io(err)) if err.kind() == io::ErrorKind::TimedOut
        );
    }
}
