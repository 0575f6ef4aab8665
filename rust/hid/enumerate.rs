//! PSU enumeration

use crate::hid::device_info::is_supported;
use crate::hid::{DeviceInfo, Result};
use nusb::descriptors::ConfigurationDescriptor;
use nusb::MaybeFuture;
use tracing::debug;

/// Enumerate the HID interfaces of attached Corsair RMi/HXi power supplies.
pub fn enumerate_devices() -> Result<Vec<DeviceInfo>> {
    let mut results = Vec::new();

    for dev_info in nusb::list_devices().wait()? {
        if !is_supported(dev_info.vendor_id(), dev_info.product_id()) {
            continue;
        }

        let device: nusb::Device = match dev_info.open().wait() {
            Ok(d) => d,
            Err(err) => {
                debug!(
                    "Skipping PSU {:04x}:{:04x}: {}",
                    dev_info.vendor_id(),
                    dev_info.product_id(),
                    err
                );
                continue;
            }
        };

        let config: ConfigurationDescriptor = match device.active_configuration() {
            Ok(c) => c,
            Err(_) => continue,
        };

        // Find HID interfaces (class 0x03)
        for iface in config.interfaces() {
            let iface_num = iface.interface_number();

            for alt in iface.alt_settings() {
                if alt.class() == 0x03 {
                    results.push(DeviceInfo::from_nusb(&dev_info, iface_num));
                    break; // Only add once per interface
                }
            }
        }
    }

    // Sort by bus:addr:interface for consistent ordering
    results.sort_by(|a, b| {
        (a.bus_number, a.device_address, a.interface_number).cmp(&(
            b.bus_number,
            b.device_address,
            b.interface_number,
        ))
    });

    Ok(results)
}
