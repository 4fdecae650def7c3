//! libusb transport
//!
//! Claims the vendor-class interface of a GUD device and issues the
//! vendor/interface control requests and bulk OUT transfers the driver
//! needs. The kernel driver is detached first when one is bound.

use std::time::Duration;

use gud_protocol::setup::{REQUEST_TYPE_IN, REQUEST_TYPE_OUT};
use gud_protocol::Request;
use log::{debug, info, warn};
use rusb::{Context, Device, DeviceHandle, Direction, TransferType, UsbContext};
use thiserror::Error;

use crate::error::TransportError;
use crate::traits::Transport;

/// Vendor/product ids of known GUD gadgets
pub const KNOWN_IDS: [(u16, u16); 2] = [(0x1d50, 0x614d), (0x16d0, 0x10a9)];

const CLASS_VENDOR_SPEC: u8 = 0xff;

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("no GUD device found")]
    NotFound,
    #[error("device has no vendor interface with a bulk OUT endpoint")]
    NoInterface,
    #[error(transparent)]
    Usb(#[from] rusb::Error),
}

/// GUD interface on a libusb device handle
pub struct RusbTransport {
    handle: DeviceHandle<Context>,
    interface: u8,
    endpoint: u8,
    timeout: Duration,
    reattach: bool,
}

impl RusbTransport {
    /// Open the first attached device with a known GUD id
    pub fn open_first(timeout: Duration) -> Result<Self, OpenError> {
        let context = Context::new()?;
        let device = context
            .devices()?
            .iter()
            .find(|d| {
                d.device_descriptor().is_ok_and(|desc| {
                    KNOWN_IDS.contains(&(desc.vendor_id(), desc.product_id()))
                })
            })
            .ok_or(OpenError::NotFound)?;
        Self::open(device, timeout)
    }

    /// Claim the GUD interface of `device`
    pub fn open(device: Device<Context>, timeout: Duration) -> Result<Self, OpenError> {
        let (interface, endpoint) = find_interface(&device)?;
        let mut handle = device.open()?;

        let reattach = handle.kernel_driver_active(interface).unwrap_or(false);
        if reattach {
            debug!("detaching kernel driver from interface {}", interface);
            handle.detach_kernel_driver(interface)?;
        }
        handle.claim_interface(interface)?;

        info!(
            "claimed GUD interface {} on bus {} device {}, bulk OUT {:#04x}",
            interface,
            device.bus_number(),
            device.address(),
            endpoint
        );
        Ok(Self {
            handle,
            interface,
            endpoint,
            timeout,
            reattach,
        })
    }

    pub fn bus_number(&self) -> u8 {
        self.handle.device().bus_number()
    }

    pub fn address(&self) -> u8 {
        self.handle.device().address()
    }
}

fn find_interface(device: &Device<Context>) -> Result<(u8, u8), OpenError> {
    let config = device.active_config_descriptor()?;
    for interface in config.interfaces() {
        for desc in interface.descriptors() {
            if desc.class_code() != CLASS_VENDOR_SPEC {
                continue;
            }
            let bulk_out = desc.endpoint_descriptors().find(|ep| {
                ep.direction() == Direction::Out && ep.transfer_type() == TransferType::Bulk
            });
            if let Some(ep) = bulk_out {
                return Ok((desc.interface_number(), ep.address()));
            }
        }
    }
    Err(OpenError::NoInterface)
}

impl From<rusb::Error> for TransportError {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Pipe => TransportError::Stall,
            rusb::Error::Timeout => TransportError::Timeout,
            rusb::Error::NoDevice => TransportError::Disconnected,
            other => TransportError::Io(other.to_string()),
        }
    }
}

impl Transport for RusbTransport {
    fn control_in(
        &mut self,
        request: Request,
        value: u16,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        Ok(self.handle.read_control(
            REQUEST_TYPE_IN,
            request.to_byte(),
            value,
            self.interface as u16,
            buf,
            self.timeout,
        )?)
    }

    fn control_out(
        &mut self,
        request: Request,
        value: u16,
        data: &[u8],
    ) -> Result<usize, TransportError> {
        Ok(self.handle.write_control(
            REQUEST_TYPE_OUT,
            request.to_byte(),
            value,
            self.interface as u16,
            data,
            self.timeout,
        )?)
    }

    fn bulk_out(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        Ok(self.handle.write_bulk(self.endpoint, data, self.timeout)?)
    }
}

impl Drop for RusbTransport {
    fn drop(&mut self) {
        if let Err(err) = self.handle.release_interface(self.interface) {
            warn!("release interface {}: {}", self.interface, err);
        }
        if self.reattach {
            let _ = self.handle.attach_kernel_driver(self.interface);
        }
    }
}
