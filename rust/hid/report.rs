//! Corsair PSU HID frame layout
//!
//! Every exchange moves one 64-byte frame in each direction.
//!
//! Command:
//!   0      - Page (logical sub-target, e.g. the rail selector)
//!   1      - Opcode
//!   2      - Operand (usually 0)
//!   3-63   - Zero
//!
//! Response:
//!   0      - Unused
//!   1      - Echo of the opcode actually serviced
//!   2-63   - Result payload (2-byte LINEAR11, 4-byte LE integer or ASCII)

use strum::{Display, EnumIter, EnumString};

pub const FRAME_SIZE: usize = 64;
pub const PAYLOAD_OFFSET: usize = 2;
pub const PAYLOAD_SIZE: usize = FRAME_SIZE - PAYLOAD_OFFSET;

/// Pages of the command space.
pub mod pages {
    pub const RAIL_SELECT: u8 = 0x02;
    pub const TELEMETRY: u8 = 0x03;
    pub const IDENTIFY: u8 = 0xFE;
}

/// Opcodes, mostly borrowed from PMBus.
pub mod opcodes {
    pub const RAIL_SELECT: u8 = 0x00;
    pub const IDENTIFY: u8 = 0x03;
    pub const READ_VIN: u8 = 0x88;
    pub const READ_VOUT: u8 = 0x8B;
    pub const READ_IOUT: u8 = 0x8C;
    pub const READ_TEMPERATURE_1: u8 = 0x8D;
    pub const READ_TEMPERATURE_2: u8 = 0x8E;
    pub const READ_FAN_SPEED_1: u8 = 0x90;
    pub const READ_POUT: u8 = 0x96;
    pub const MFR_ID: u8 = 0x99;
    pub const MFR_MODEL: u8 = 0x9A;
    pub const TOTAL_UPTIME: u8 = 0xD1;
    pub const CURRENT_UPTIME: u8 = 0xD2;
    pub const OCP_MODE: u8 = 0xD8;
    pub const TOTAL_POWER: u8 = 0xEE;
    pub const FAN_CONTROL_MODE: u8 = 0xF0;
}

/// Output rails that share the per-rail telemetry opcodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Rail {
    #[strum(serialize = "12v")]
    V12,
    #[strum(serialize = "5v")]
    V5,
    #[strum(serialize = "3.3v")]
    V3_3,
}

impl Rail {
    /// Operand of the rail select command.
    pub fn index(self) -> u8 {
        match self {
            Rail::V12 => 0,
            Rail::V5 => 1,
            Rail::V3_3 => 2,
        }
    }
}

/// Three-byte address of one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Command {
    pub page: u8,
    pub opcode: u8,
    pub operand: u8,
}

impl Command {
    /// Hello/identify. Answers with the device name and resyncs the device
    /// after an error response.
    pub const IDENTIFY: Command = Command::new(pages::IDENTIFY, opcodes::IDENTIFY, 0x00);

    pub const fn new(page: u8, opcode: u8, operand: u8) -> Self {
        Self {
            page,
            opcode,
            operand,
        }
    }

    /// Telemetry read on the default page.
    pub const fn read(opcode: u8) -> Self {
        Self::new(pages::TELEMETRY, opcode, 0x00)
    }

    /// Point subsequent per-rail reads at `rail`.
    pub fn select_rail(rail: Rail) -> Self {
        Self::new(pages::RAIL_SELECT, opcodes::RAIL_SELECT, rail.index())
    }
}

/// One 64-byte HID frame, used for both directions.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    buf: [u8; FRAME_SIZE],
}

impl Frame {
    pub const fn zeroed() -> Self {
        Self {
            buf: [0u8; FRAME_SIZE],
        }
    }

    pub fn command(command: Command) -> Self {
        let mut frame = Self::zeroed();
        frame.set_command(command);
        frame
    }

    /// Overwrite with `command`, zeroing the trailing bytes.
    pub fn set_command(&mut self, command: Command) {
        self.buf.fill(0);
        self.buf[0] = command.page;
        self.buf[1] = command.opcode;
        self.buf[2] = command.operand;
    }

    pub fn clear(&mut self) {
        self.buf.fill(0);
    }

    pub fn page(&self) -> u8 {
        self.buf[0]
    }

    /// Requested opcode on a command, echoed opcode on a response.
    pub fn opcode(&self) -> u8 {
        self.buf[1]
    }

    pub fn operand(&self) -> u8 {
        self.buf[2]
    }

    /// Response payload, bytes 2..64.
    pub fn payload(&self) -> &[u8] {
        &self.buf[PAYLOAD_OFFSET..]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buf[PAYLOAD_OFFSET..]
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.buf
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8; FRAME_SIZE] {
        &mut self.buf
    }

    /// Fill from a received transfer. Short reads leave the tail zeroed.
    pub fn load(&mut self, data: &[u8]) {
        self.buf.fill(0);
        let len = data.len().min(FRAME_SIZE);
        self.buf[..len].copy_from_slice(&data[..len]);
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only the header and the first few payload bytes are ever interesting
        write!(
            f,
            "Frame({:02X} {:02X} {:02X} | {:02X?}..)",
            self.buf[0],
            self.buf[1],
            self.buf[2],
            &self.buf[3..8]
        )
    }
}
