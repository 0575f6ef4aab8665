//! USB HID access to Corsair power supplies via nusb
//!
//! Layered bottom-up: [`Endpoints`] moves raw frames, [`Transport`]
//! serializes exchanges, [`ProtocolClient`] validates and decodes them.

pub mod device_info;
pub mod endpoints;
pub mod enumerate;
pub mod error;
pub mod protocol;
pub mod report;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use device_info::{model_name, DeviceInfo, CORSAIR_VENDOR_ID, SUPPORTED_MODELS};
pub use endpoints::{Endpoints, NusbEndpoints};
pub use enumerate::enumerate_devices;
pub use error::{ErrorKind, HidError, Result};
pub use protocol::ProtocolClient;
pub use report::{opcodes, pages, Command, Frame, Rail, FRAME_SIZE, PAYLOAD_SIZE};
pub use transport::{Transport, DEFAULT_TIMEOUT};
