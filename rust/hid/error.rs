//! Error types for HID operations

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HidError {
    #[error("Device busy: another exchange is in flight")]
    Busy,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("USB error: {0}")]
    UsbError(#[from] nusb::Error),

    #[error("Transfer error: {0}")]
    TransferError(#[from] nusb::transfer::TransferError),

    #[error("Transfer timed out after {0:?}")]
    Timeout(Duration),

    #[error("Device disconnected")]
    Disconnected,

    #[error("No data for opcode 0x{opcode:02X}")]
    NoData { opcode: u8 },

    #[error("Invalid result width: {0} (max {max})", max = crate::hid::PAYLOAD_SIZE)]
    InvalidWidth(usize),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Unknown {field} value: {value}")]
    UnknownMode { field: &'static str, value: u32 },
}

/// Coarse classification of a failure, as seen by a sensor consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lock contention. Retry on the next poll.
    Busy,
    /// Transfer failed or timed out.
    Io,
    /// The device had nothing valid for the request.
    NoData,
    /// The request is not implemented.
    Unsupported,
}

impl HidError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HidError::Busy => ErrorKind::Busy,
            HidError::NoData { .. } | HidError::UnknownMode { .. } => ErrorKind::NoData,
            HidError::Unsupported(_) | HidError::InvalidWidth(_) => ErrorKind::Unsupported,
            HidError::DeviceNotFound(_)
            | HidError::UsbError(_)
            | HidError::TransferError(_)
            | HidError::Timeout(_)
            | HidError::Disconnected => ErrorKind::Io,
        }
    }
}

#[cfg(feature = "python")]
impl From<HidError> for pyo3::PyErr {
    fn from(err: HidError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyBlockingIOError, PyNotImplementedError, PyOSError};

        match err.kind() {
            ErrorKind::Busy => PyBlockingIOError::new_err(err.to_string()),
            ErrorKind::Unsupported => PyNotImplementedError::new_err(err.to_string()),
            _ => PyOSError::new_err(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, HidError>;
