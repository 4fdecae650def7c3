//! USB SETUP packet for GUD vendor requests
//!
//! All GUD requests are vendor requests addressed to the interface:
//! ```text
//! bmRequestType = DIR | TYPE_VENDOR (0x40) | RECIP_INTERFACE (0x01)
//! bRequest      = request code
//! wValue        = connector index (0 otherwise)
//! wIndex        = interface number
//! wLength       = data stage length
//! ```

use crate::request::Request;
use crate::wire::{Reader, Wire, WireError, Writer};

pub const USB_DIR_IN: u8 = 0x80;
pub const USB_TYPE_MASK: u8 = 0x60;
pub const USB_TYPE_VENDOR: u8 = 0x40;
pub const USB_RECIP_MASK: u8 = 0x1f;
pub const USB_RECIP_INTERFACE: u8 = 0x01;

/// bmRequestType for a GUD IN request
pub const REQUEST_TYPE_IN: u8 = USB_DIR_IN | USB_TYPE_VENDOR | USB_RECIP_INTERFACE;
/// bmRequestType for a GUD OUT request
pub const REQUEST_TYPE_OUT: u8 = USB_TYPE_VENDOR | USB_RECIP_INTERFACE;

/// 8-byte control SETUP packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    /// SETUP for a GUD request on `interface`
    pub fn gud(request: Request, value: u16, interface: u16, length: u16) -> Self {
        Self {
            request_type: if request.is_in() {
                REQUEST_TYPE_IN
            } else {
                REQUEST_TYPE_OUT
            },
            request: request.to_byte(),
            value,
            index: interface,
            length,
        }
    }

    pub fn is_in(&self) -> bool {
        self.request_type & USB_DIR_IN != 0
    }

    /// Vendor request addressed to an interface
    pub fn is_vendor_interface(&self) -> bool {
        self.request_type & USB_TYPE_MASK == USB_TYPE_VENDOR
            && self.request_type & USB_RECIP_MASK == USB_RECIP_INTERFACE
    }

    /// The GUD request this packet carries, if any
    pub fn gud_request(&self) -> Option<Request> {
        if self.is_vendor_interface() {
            Request::from_byte(self.request)
        } else {
            None
        }
    }
}

impl Wire for SetupPacket {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::require(bytes, Self::SIZE)?;
        Ok(Self {
            request_type: r.u8()?,
            request: r.u8()?,
            value: r.u16()?,
            index: r.u16()?,
            length: r.u16()?,
        })
    }

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, WireError> {
        let mut w = Writer::require(buffer, Self::SIZE)?;
        w.u8(self.request_type)?;
        w.u8(self.request)?;
        w.u16(self.value)?;
        w.u16(self.index)?;
        w.u16(self.length)?;
        Ok(w.position())
    }
}
