//! Corsair RMi/HXi power supply telemetry over USB HID
//!
//! - LINEAR11 decoding of PMBus-style telemetry words
//! - Serialized 64-byte interrupt exchanges (nusb)
//! - Opcode-validated request/response with one resync retry
//! - Fixed sensor channel table in canonical integer units
//! - Optional Python bindings (`python` feature)

pub mod hid;
pub mod linear11;
pub mod psu;

#[cfg(feature = "python")]
mod python;

pub use hid::{enumerate_devices, DeviceInfo, ErrorKind, HidError, Rail, Result};
pub use psu::{Attribute, Channel, Identity, PowerSupply, Reading, SensorType};
