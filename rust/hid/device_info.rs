//! PSU device information from enumeration

#[cfg(feature = "python")]
use pyo3::prelude::*;

pub const CORSAIR_VENDOR_ID: u16 = 0x1B1C;

/// Product IDs of the RMi/HXi families that speak this protocol.
pub const SUPPORTED_MODELS: &[(u16, &str)] = &[
    (0x1C0A, "RM650i"),
    (0x1C0B, "RM750i"),
    (0x1C0C, "RM850i"),
    (0x1C0D, "RM1000i"),
    (0x1C04, "HX650i"),
    (0x1C05, "HX750i"),
    (0x1C06, "HX850i"),
    (0x1C07, "HX1000i"),
    (0x1C08, "HX1200i"),
];

/// Marketing name for a supported product ID.
pub fn model_name(product_id: u16) -> Option<&'static str> {
    SUPPORTED_MODELS
        .iter()
        .find(|(pid, _)| *pid == product_id)
        .map(|(_, name)| *name)
}

pub fn is_supported(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == CORSAIR_VENDOR_ID && model_name(product_id).is_some()
}

/// PSU information from enumeration.
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface_number: u8,
    pub manufacturer_string: String,
    pub product_string: String,
    pub serial_number: String,

    // Internal: device identifiers for opening
    pub bus_number: u8,
    pub device_address: u8,
}

impl DeviceInfo {
    /// Model name from the product ID table.
    pub fn model(&self) -> Option<&'static str> {
        model_name(self.product_id)
    }

    /// Unique path identifier for this device (bus:addr:interface)
    pub fn path(&self) -> String {
        format!(
            "{:03}:{:03}:{:02}",
            self.bus_number, self.device_address, self.interface_number
        )
    }

    #[cfg(target_os = "linux")]
    pub fn from_nusb(dev: &nusb::DeviceInfo, interface: u8) -> Self {
        Self {
            vendor_id: dev.vendor_id(),
            product_id: dev.product_id(),
            interface_number: interface,
            manufacturer_string: dev.manufacturer_string().unwrap_or_default().to_string(),
            product_string: dev.product_string().unwrap_or_default().to_string(),
            serial_number: dev.serial_number().unwrap_or_default().to_string(),
            bus_number: dev.busnum(),
            device_address: dev.device_address(),
        }
    }

    #[cfg(not(target_os = "linux"))]
    pub fn from_nusb(dev: &nusb::DeviceInfo, interface: u8) -> Self {
        Self {
            vendor_id: dev.vendor_id(),
            product_id: dev.product_id(),
            interface_number: interface,
            manufacturer_string: dev.manufacturer_string().unwrap_or_default().to_string(),
            product_string: dev.product_string().unwrap_or_default().to_string(),
            serial_number: dev.serial_number().unwrap_or_default().to_string(),
            bus_number: 0, // Not available on non-Linux
            device_address: dev.device_address(),
        }
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl DeviceInfo {
    fn __repr__(&self) -> String {
        format!(
            "DeviceInfo(model={}, product_id=0x{:04x}, path={})",
            self.model().unwrap_or("unknown"),
            self.product_id,
            self.path()
        )
    }

    #[getter(model)]
    fn py_model(&self) -> Option<&'static str> {
        self.model()
    }

    #[getter(path)]
    fn py_path(&self) -> String {
        self.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(product_id: u16) -> DeviceInfo {
        DeviceInfo {
            vendor_id: CORSAIR_VENDOR_ID,
            product_id,
            interface_number: 0,
            manufacturer_string: String::new(),
            product_string: String::new(),
            serial_number: String::new(),
            bus_number: 1,
            device_address: 12,
        }
    }

    #[test]
    fn test_model_lookup() {
        assert_eq!(model_name(0x1C0A), Some("RM650i"));
        assert_eq!(model_name(0x1C08), Some("HX1200i"));
        assert_eq!(model_name(0x1C00), None);
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported(0x1B1C, 0x1C06));
        assert!(!is_supported(0x1532, 0x1C06));
        assert!(!is_supported(0x1B1C, 0x0C10));
    }

    #[test]
    fn test_path_format() {
        assert_eq!(info(0x1C0A).path(), "001:012:00");
        assert_eq!(info(0x1C0A).model(), Some("RM650i"));
    }
}
