//! Connector descriptors and status
//!
//! GET_CONNECTORS returns an array of 5-byte descriptors: connector type (u8)
//! followed by flags (u32). GET_CONNECTOR_STATUS returns one status byte:
//! ```text
//! bit 7      bits 1:0
//! CHANGED    DISCONNECTED=0 / CONNECTED=1 / UNKNOWN=2
//! ```

use bitflags::bitflags;
use core::fmt;

use crate::wire::{Reader, Wire, WireError, Writer};

pub const CONNECTOR_TYPE_PANEL: u8 = 0;
pub const CONNECTOR_TYPE_VGA: u8 = 1;
pub const CONNECTOR_TYPE_COMPOSITE: u8 = 2;
pub const CONNECTOR_TYPE_SVIDEO: u8 = 3;
pub const CONNECTOR_TYPE_COMPONENT: u8 = 4;
pub const CONNECTOR_TYPE_DVI: u8 = 5;
pub const CONNECTOR_TYPE_DISPLAYPORT: u8 = 6;
pub const CONNECTOR_TYPE_HDMI: u8 = 7;

pub const CONNECTOR_STATUS_DISCONNECTED: u8 = 0x00;
pub const CONNECTOR_STATUS_CONNECTED: u8 = 0x01;
pub const CONNECTOR_STATUS_UNKNOWN: u8 = 0x02;
pub const CONNECTOR_STATUS_CONNECTED_MASK: u8 = 0x03;
pub const CONNECTOR_STATUS_CHANGED: u8 = 0x80;

/// Physical connector type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectorType {
    Panel,
    Vga,
    Composite,
    SVideo,
    Component,
    Dvi,
    DisplayPort,
    Hdmi,
}

impl ConnectorType {
    /// Parse a type byte; unknown types fall back to `Panel`
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            CONNECTOR_TYPE_VGA => ConnectorType::Vga,
            CONNECTOR_TYPE_COMPOSITE => ConnectorType::Composite,
            CONNECTOR_TYPE_SVIDEO => ConnectorType::SVideo,
            CONNECTOR_TYPE_COMPONENT => ConnectorType::Component,
            CONNECTOR_TYPE_DVI => ConnectorType::Dvi,
            CONNECTOR_TYPE_DISPLAYPORT => ConnectorType::DisplayPort,
            CONNECTOR_TYPE_HDMI => ConnectorType::Hdmi,
            _ => ConnectorType::Panel,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            ConnectorType::Panel => CONNECTOR_TYPE_PANEL,
            ConnectorType::Vga => CONNECTOR_TYPE_VGA,
            ConnectorType::Composite => CONNECTOR_TYPE_COMPOSITE,
            ConnectorType::SVideo => CONNECTOR_TYPE_SVIDEO,
            ConnectorType::Component => CONNECTOR_TYPE_COMPONENT,
            ConnectorType::Dvi => CONNECTOR_TYPE_DVI,
            ConnectorType::DisplayPort => CONNECTOR_TYPE_DISPLAYPORT,
            ConnectorType::Hdmi => CONNECTOR_TYPE_HDMI,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ConnectorType::Panel => "Panel",
            ConnectorType::Vga => "VGA",
            ConnectorType::Composite => "Composite",
            ConnectorType::SVideo => "S-Video",
            ConnectorType::Component => "Component",
            ConnectorType::Dvi => "DVI",
            ConnectorType::DisplayPort => "DisplayPort",
            ConnectorType::Hdmi => "HDMI",
        }
    }
}

bitflags! {
    /// Connector capability flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConnectorFlags: u32 {
        /// Host should poll GET_CONNECTOR_STATUS
        const POLL_STATUS = 1 << 0;
        const INTERLACE = 1 << 1;
        const DOUBLESCAN = 1 << 2;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConnectorFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ConnectorFlags({=u32:#x})", self.bits())
    }
}

/// One entry of the GET_CONNECTORS reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectorDescriptor {
    pub connector_type: ConnectorType,
    pub flags: ConnectorFlags,
}

impl Wire for ConnectorDescriptor {
    const SIZE: usize = 5;

    fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::require(bytes, Self::SIZE)?;
        Ok(Self {
            connector_type: ConnectorType::from_byte(r.u8()?),
            flags: ConnectorFlags::from_bits_retain(r.u32()?),
        })
    }

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, WireError> {
        let mut w = Writer::require(buffer, Self::SIZE)?;
        w.u8(self.connector_type.to_byte())?;
        w.u32(self.flags.bits())?;
        Ok(w.position())
    }
}

/// Link state of a connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Link {
    Disconnected,
    Connected,
    Unknown,
}

/// Decoded GET_CONNECTOR_STATUS byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectorStatus {
    pub link: Link,
    /// Something changed since the last status read (hotplug, new EDID)
    pub changed: bool,
}

impl ConnectorStatus {
    pub const DISCONNECTED: Self = Self {
        link: Link::Disconnected,
        changed: false,
    };

    /// Reserved link values read as `Unknown`
    pub fn from_byte(byte: u8) -> Self {
        let link = match byte & CONNECTOR_STATUS_CONNECTED_MASK {
            CONNECTOR_STATUS_DISCONNECTED => Link::Disconnected,
            CONNECTOR_STATUS_CONNECTED => Link::Connected,
            _ => Link::Unknown,
        };
        Self {
            link,
            changed: byte & CONNECTOR_STATUS_CHANGED != 0,
        }
    }

    pub fn to_byte(self) -> u8 {
        let link = match self.link {
            Link::Disconnected => CONNECTOR_STATUS_DISCONNECTED,
            Link::Connected => CONNECTOR_STATUS_CONNECTED,
            Link::Unknown => CONNECTOR_STATUS_UNKNOWN,
        };
        if self.changed {
            link | CONNECTOR_STATUS_CHANGED
        } else {
            link
        }
    }

    pub fn connected(self) -> bool {
        self.link == Link::Connected
    }
}

impl fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let link = match self.link {
            Link::Disconnected => "disconnected",
            Link::Connected => "connected",
            Link::Unknown => "unknown",
        };
        f.write_str(link)?;
        if self.changed {
            f.write_str(" changed")?;
        }
        Ok(())
    }
}
