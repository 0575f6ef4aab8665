//! Interrupt endpoint pair of a Corsair PSU.
//!
//! The PSU takes commands on interrupt OUT (0x01) and answers on
//! interrupt IN (0x81). Transfers use nusb's blocking completion wait, so
//! callers see plain blocking calls with a bounded wait and no runtime of
//! their own. Both transfer buffers are allocated once and reused.

use crate::hid::{DeviceInfo, Frame, HidError, Result, FRAME_SIZE};
use nusb::descriptors::TransferType;
use nusb::transfer::{Buffer, Completion, Direction, In, Interrupt, Out, TransferError};
use nusb::MaybeFuture;
use std::time::Duration;
use tracing::debug;

// Fallback addresses if the descriptors do not list an interrupt pair
const DEFAULT_EP_OUT: u8 = 0x01;
const DEFAULT_EP_IN: u8 = 0x81;

/// Raw frame pipe underneath a [`Transport`](crate::hid::Transport).
///
/// Implementations block for at most `timeout` per call and never retry.
pub trait Endpoints: Send {
    /// Send one full frame.
    fn write_frame(&mut self, frame: &Frame, timeout: Duration) -> Result<()>;

    /// Receive one frame into `frame`.
    fn read_frame(&mut self, frame: &mut Frame, timeout: Duration) -> Result<()>;
}

/// Interrupt endpoints of a claimed PSU interface.
pub struct NusbEndpoints {
    ep_out: nusb::Endpoint<Interrupt, Out>,
    ep_in: nusb::Endpoint<Interrupt, In>,
    // Handed to the OS for each transfer and returned with its completion
    out_buf: Option<Buffer>,
    in_buf: Option<Buffer>,
    // Keeps the claim alive for as long as the endpoints are in use
    _interface: nusb::Interface,
}

fn matches_info(dev_info: &nusb::DeviceInfo, info: &DeviceInfo) -> bool {
    #[cfg(target_os = "linux")]
    {
        dev_info.busnum() == info.bus_number && dev_info.device_address() == info.device_address
    }
    #[cfg(not(target_os = "linux"))]
    {
        dev_info.device_address() == info.device_address
            && dev_info.vendor_id() == info.vendor_id
            && dev_info.product_id() == info.product_id
    }
}

impl NusbEndpoints {
    /// Open the device described by `info` and claim its HID interface.
    pub fn open(info: &DeviceInfo) -> Result<Self> {
        let dev_info = nusb::list_devices()
            .wait()?
            .find(|d| matches_info(d, info))
            .ok_or_else(|| HidError::DeviceNotFound(format!("{:?}", info)))?;

        let device = dev_info.open().wait()?;
        // On Linux, detach hid-generic before claiming
        #[cfg(target_os = "linux")]
        let interface = device
            .detach_and_claim_interface(info.interface_number)
            .wait()?;
        #[cfg(not(target_os = "linux"))]
        let interface = device.claim_interface(info.interface_number).wait()?;

        Self::from_interface(interface)
    }

    /// Wrap an already claimed interface.
    pub fn from_interface(interface: nusb::Interface) -> Result<Self> {
        let (out_addr, in_addr) = Self::find_endpoints(&interface);
        debug!(
            "Using interrupt endpoints OUT 0x{:02X} / IN 0x{:02X}",
            out_addr, in_addr
        );

        let ep_out = interface.endpoint::<Interrupt, Out>(out_addr)?;
        let ep_in = interface.endpoint::<Interrupt, In>(in_addr)?;

        let out_buf = ep_out.allocate(FRAME_SIZE);
        let in_buf = ep_in.allocate(FRAME_SIZE);

        Ok(Self {
            ep_out,
            ep_in,
            out_buf: Some(out_buf),
            in_buf: Some(in_buf),
            _interface: interface,
        })
    }

    /// Locate the interrupt OUT and IN endpoints from the interface descriptors.
    fn find_endpoints(interface: &nusb::Interface) -> (u8, u8) {
        let mut ep_out: Option<u8> = None;
        let mut ep_in: Option<u8> = None;

        for iface_desc in interface.descriptors() {
            for ep in iface_desc.endpoints() {
                if ep.transfer_type() == TransferType::Interrupt {
                    let addr = ep.address();
                    match ep.direction() {
                        Direction::In if ep_in.is_none() => ep_in = Some(addr),
                        Direction::Out if ep_out.is_none() => ep_out = Some(addr),
                        _ => {}
                    }
                }
            }
        }

        (
            ep_out.unwrap_or(DEFAULT_EP_OUT),
            ep_in.unwrap_or(DEFAULT_EP_IN),
        )
    }
}

/// Map a completed transfer's status onto the crate error.
///
/// nusb reports a transfer cancelled on timeout as `Cancelled`.
fn check_status(completion: &Completion, timeout: Duration) -> Result<()> {
    match completion.status {
        Ok(()) => Ok(()),
        Err(TransferError::Cancelled) => Err(HidError::Timeout(timeout)),
        Err(TransferError::Disconnected) => Err(HidError::Disconnected),
        Err(e) => Err(HidError::TransferError(e)),
    }
}

impl Endpoints for NusbEndpoints {
    fn write_frame(&mut self, frame: &Frame, timeout: Duration) -> Result<()> {
        let mut buffer = self
            .out_buf
            .take()
            .unwrap_or_else(|| self.ep_out.allocate(FRAME_SIZE));
        buffer.clear();
        buffer.extend_from_slice(frame.as_bytes());

        // Cancels and reaps on timeout, so nothing is left pending
        let completion = self.ep_out.transfer_blocking(buffer, timeout);
        let status = check_status(&completion, timeout);
        self.out_buf = Some(completion.buffer);
        status
    }

    fn read_frame(&mut self, frame: &mut Frame, timeout: Duration) -> Result<()> {
        let mut buffer = self
            .in_buf
            .take()
            .unwrap_or_else(|| self.ep_in.allocate(FRAME_SIZE));
        buffer.clear();
        buffer.set_requested_len(FRAME_SIZE);

        let completion = self.ep_in.transfer_blocking(buffer, timeout);
        let status = check_status(&completion, timeout);
        if status.is_ok() {
            frame.load(&completion.buffer);
        }
        self.in_buf = Some(completion.buffer);
        status
    }
}
