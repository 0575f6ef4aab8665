//! Serialized request/response exchange with one PSU.

use crate::hid::{Endpoints, Frame, HidError, Result};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

// Default timeout for each interrupt transfer
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Everything that may only be touched by the exchange holding the lock.
struct Channel<E> {
    endpoints: E,
    buf: Frame,
}

/// One device's command channel.
///
/// At most one exchange is in flight at a time. A caller that finds the
/// channel taken gets [`HidError::Busy`] instead of waiting.
pub struct Transport<E: Endpoints> {
    channel: Mutex<Channel<E>>,
    timeout: Duration,
}

impl<E: Endpoints> Transport<E> {
    pub fn new(endpoints: E) -> Self {
        Self {
            channel: Mutex::new(Channel {
                endpoints,
                buf: Frame::zeroed(),
            }),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-transfer timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Write `command`, then read the response.
    ///
    /// Never retries. The lock is released when the guard drops, on success
    /// and on every error path.
    pub fn exchange(&self, command: &Frame) -> Result<Frame> {
        let mut guard = self.channel.try_lock().map_err(|_| HidError::Busy)?;
        let channel = &mut *guard;

        channel.buf = *command;
        if let Err(err) = channel.endpoints.write_frame(&channel.buf, self.timeout) {
            debug!("Failed to send request {:?}: {}", command, err);
            return Err(err);
        }

        channel.buf.clear();
        if let Err(err) = channel.endpoints.read_frame(&mut channel.buf, self.timeout) {
            debug!("Failed to get response to {:?}: {}", command, err);
            return Err(err);
        }

        Ok(channel.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::mock::{Fault, Gate, MockPsu};
    use crate::hid::{opcodes, Command};
    use std::sync::Arc;
    use std::thread;

    fn temp_frame() -> Frame {
        Frame::command(Command::read(opcodes::READ_TEMPERATURE_1))
    }

    #[test]
    fn test_exchange_returns_response() {
        let psu = MockPsu::new();
        psu.set_linear11(opcodes::READ_TEMPERATURE_1, 0x0AD6);
        let transport = Transport::new(psu.clone());

        let response = transport.exchange(&temp_frame()).unwrap();
        assert_eq!(response.opcode(), opcodes::READ_TEMPERATURE_1);
        assert_eq!(&response.payload()[..2], &[0xD6, 0x0A]);
        assert_eq!(psu.written(), vec![(0x03, 0x8D, 0x00)]);
    }

    #[test]
    fn test_write_failure_releases_lock() {
        let psu = MockPsu::new();
        psu.set_linear11(opcodes::READ_TEMPERATURE_1, 0x0AD6);
        psu.push_fault(Fault::WriteError);
        let transport = Transport::new(psu.clone());

        let err = transport.exchange(&temp_frame()).unwrap_err();
        assert!(matches!(err, HidError::Timeout(_)));

        // A failed exchange must not stall the next one
        assert!(transport.exchange(&temp_frame()).is_ok());
    }

    #[test]
    fn test_read_failure_releases_lock() {
        let psu = MockPsu::new();
        psu.set_linear11(opcodes::READ_TEMPERATURE_1, 0x0AD6);
        psu.push_fault(Fault::ReadError);
        let transport = Transport::new(psu.clone());

        let err = transport.exchange(&temp_frame()).unwrap_err();
        assert!(matches!(err, HidError::Disconnected));
        assert!(transport.exchange(&temp_frame()).is_ok());
    }

    #[test]
    fn test_concurrent_exchange_is_busy() {
        let psu = MockPsu::new();
        psu.set_linear11(opcodes::READ_TEMPERATURE_1, 0x0AD6);
        psu.set_linear11(opcodes::READ_FAN_SPEED_1, 0x1032);
        let gate = Gate::new();
        psu.set_gate(gate.clone());
        let transport = Arc::new(Transport::new(psu.clone()));

        let first = {
            let transport = transport.clone();
            thread::spawn(move || transport.exchange(&temp_frame()))
        };

        // First exchange is now parked inside its write
        gate.entered.wait();
        let fan = Frame::command(Command::read(opcodes::READ_FAN_SPEED_1));
        assert!(matches!(transport.exchange(&fan), Err(HidError::Busy)));
        gate.release.wait();

        let response = first.join().unwrap().unwrap();
        assert_eq!(response.opcode(), opcodes::READ_TEMPERATURE_1);
        assert_eq!(&response.payload()[..2], &[0xD6, 0x0A]);

        // The busy caller never reached the device
        assert_eq!(psu.written(), vec![(0x03, 0x8D, 0x00)]);
        assert!(transport.exchange(&fan).is_ok());
    }

    #[test]
    fn test_custom_timeout() {
        let transport = Transport::new(MockPsu::new()).with_timeout(Duration::from_millis(50));
        assert_eq!(transport.timeout(), Duration::from_millis(50));
    }
}
