//! Command/response protocol on top of [`Transport`].
//!
//! A response is trusted only if it echoes the requested opcode. A mismatch
//! means the device rejected the request; the client then resyncs with one
//! IDENTIFY handshake and repeats the request once:
//!
//! ```text
//! Sending --match--> Done
//!    |
//!  mismatch
//!    v
//! Recovering --handshake ok--> Retrying --match--> Done
//!                                  |
//!                               mismatch --> NoData
//! ```

use crate::hid::{Command, Endpoints, Frame, HidError, Result, Transport, PAYLOAD_SIZE};
use crate::linear11;
use tracing::debug;

enum State {
    Sending,
    Recovering,
    Retrying,
    Done(Frame),
}

pub struct ProtocolClient<E: Endpoints> {
    transport: Transport<E>,
}

impl<E: Endpoints> ProtocolClient<E> {
    pub fn new(transport: Transport<E>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport<E> {
        &self.transport
    }

    fn exchange(&self, command: Command) -> Result<Frame> {
        self.transport.exchange(&Frame::command(command))
    }

    /// Send `command` and copy `out.len()` payload bytes of the validated
    /// response into `out`.
    ///
    /// Transport errors are returned as-is. An opcode mismatch triggers at
    /// most one handshake and one retry; a second mismatch is `NoData`.
    pub fn send_recv(&self, command: Command, out: &mut [u8]) -> Result<()> {
        if out.len() > PAYLOAD_SIZE {
            return Err(HidError::InvalidWidth(out.len()));
        }

        let mut state = State::Sending;
        let response = loop {
            state = match state {
                State::Sending => {
                    let response = self.exchange(command)?;
                    if response.opcode() == command.opcode {
                        State::Done(response)
                    } else {
                        debug!(
                            "Opcode 0x{:02X} answered with 0x{:02X}, resyncing",
                            command.opcode,
                            response.opcode()
                        );
                        State::Recovering
                    }
                }
                State::Recovering => {
                    // Only the transfer has to succeed; the reply is discarded
                    self.exchange(Command::IDENTIFY)?;
                    State::Retrying
                }
                State::Retrying => {
                    let response = self.exchange(command)?;
                    if response.opcode() != command.opcode {
                        debug!(
                            "Opcode 0x{:02X} still answered with 0x{:02X}",
                            command.opcode,
                            response.opcode()
                        );
                        return Err(HidError::NoData {
                            opcode: command.opcode,
                        });
                    }
                    State::Done(response)
                }
                State::Done(response) => break response,
            };
        };

        out.copy_from_slice(&response.payload()[..out.len()]);
        Ok(())
    }

    /// Raw little-endian 16-bit field.
    pub fn read_u16(&self, command: Command) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.send_recv(command, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Raw little-endian 32-bit field.
    pub fn read_u32(&self, command: Command) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.send_recv(command, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// LINEAR11 field scaled to integer units. See [`linear11::decode`].
    pub fn read_linear11(&self, command: Command, scale: i64) -> Result<i64> {
        let word = self.read_u16(command)?;
        Ok(linear11::decode(word, scale))
    }

    /// NUL-terminated ASCII field.
    pub fn read_string(&self, command: Command) -> Result<String> {
        let mut buf = [0u8; PAYLOAD_SIZE];
        self.send_recv(command, &mut buf)?;

        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        Ok(String::from_utf8_lossy(&buf[..end]).trim_end().to_string())
    }
}
