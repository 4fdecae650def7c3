//! Display descriptor returned by GET_DESCRIPTOR
//!
//! Layout (30 bytes):
//! ```text
//! ┌───────┬─────────┬───────┬─────────────┬─────────────────┬───────────┬───────────┬────────────┬────────────┐
//! │ magic │ version │ flags │ compression │ max_buffer_size │ min_width │ max_width │ min_height │ max_height │
//! │ u32   │ u8      │ u32   │ u8          │ u32             │ u32       │ u32       │ u32        │ u32        │
//! └───────┴─────────┴───────┴─────────────┴─────────────────┴───────────┴───────────┴────────────┴────────────┘
//! ```

use bitflags::bitflags;
use core::fmt;

use crate::wire::{Reader, Wire, WireError, Writer};

/// Magic value identifying a GUD display
pub const DISPLAY_MAGIC: u32 = 0x1d50_614d;

bitflags! {
    /// Display capability flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DisplayFlags: u32 {
        /// Host must read status after every SET request
        const STATUS_ON_SET = 1 << 0;
        /// Device can only take whole-framebuffer updates
        const FULL_UPDATE = 1 << 1;
    }
}

bitflags! {
    /// Supported compression schemes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Compression: u8 {
        /// LZ4 block format, no size prefix
        const LZ4 = 1 << 0;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DisplayFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "DisplayFlags({=u32:#x})", self.bits())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Compression {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Compression({=u8:#x})", self.bits())
    }
}

/// How the device reports the outcome of requests.
///
/// Selected from the descriptor once; every transfer then follows the same
/// code path with this one switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusSignaling {
    /// Status is read only after a stall
    OnDemand,
    /// Status is read after every SET request, and after a stall
    OnEverySet,
}

/// Reasons a descriptor is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorError {
    /// Magic does not identify a GUD display
    BadMagic(u32),
    /// Version 0 is not a valid protocol version
    BadVersion,
    /// Maximum width or height is zero
    ZeroSize,
    /// Minimum width exceeds maximum width
    WidthRange { min: u32, max: u32 },
    /// Minimum height exceeds maximum height
    HeightRange { min: u32, max: u32 },
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::BadMagic(magic) => write!(f, "bad magic {:#010x}", magic),
            DescriptorError::BadVersion => f.write_str("version 0"),
            DescriptorError::ZeroSize => f.write_str("zero maximum size"),
            DescriptorError::WidthRange { min, max } => {
                write!(f, "min_width {} > max_width {}", min, max)
            }
            DescriptorError::HeightRange { min, max } => {
                write!(f, "min_height {} > max_height {}", min, max)
            }
        }
    }
}

impl core::error::Error for DescriptorError {}

/// Device capability summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayDescriptor {
    pub magic: u32,
    pub version: u8,
    pub flags: DisplayFlags,
    pub compression: Compression,
    /// Largest SET_BUFFER payload the device accepts, 0 means no limit
    pub max_buffer_size: u32,
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
}

impl DisplayDescriptor {
    /// Check magic, version and size ranges
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.magic != DISPLAY_MAGIC {
            return Err(DescriptorError::BadMagic(self.magic));
        }
        if self.version == 0 {
            return Err(DescriptorError::BadVersion);
        }
        if self.max_width == 0 || self.max_height == 0 {
            return Err(DescriptorError::ZeroSize);
        }
        if self.min_width > self.max_width {
            return Err(DescriptorError::WidthRange {
                min: self.min_width,
                max: self.max_width,
            });
        }
        if self.min_height > self.max_height {
            return Err(DescriptorError::HeightRange {
                min: self.min_height,
                max: self.max_height,
            });
        }
        Ok(())
    }

    pub fn status_signaling(&self) -> StatusSignaling {
        if self.flags.contains(DisplayFlags::STATUS_ON_SET) {
            StatusSignaling::OnEverySet
        } else {
            StatusSignaling::OnDemand
        }
    }

    pub fn status_reported_on_every_set(&self) -> bool {
        self.status_signaling() == StatusSignaling::OnEverySet
    }

    /// Device only accepts whole-framebuffer updates
    pub fn full_update(&self) -> bool {
        self.flags.contains(DisplayFlags::FULL_UPDATE)
    }

    pub fn supports_lz4(&self) -> bool {
        self.compression.contains(Compression::LZ4)
    }
}

impl Wire for DisplayDescriptor {
    const SIZE: usize = 30;

    fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::require(bytes, Self::SIZE)?;
        Ok(Self {
            magic: r.u32()?,
            version: r.u8()?,
            flags: DisplayFlags::from_bits_retain(r.u32()?),
            compression: Compression::from_bits_retain(r.u8()?),
            max_buffer_size: r.u32()?,
            min_width: r.u32()?,
            max_width: r.u32()?,
            min_height: r.u32()?,
            max_height: r.u32()?,
        })
    }

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, WireError> {
        let mut w = Writer::require(buffer, Self::SIZE)?;
        w.u32(self.magic)?;
        w.u8(self.version)?;
        w.u32(self.flags.bits())?;
        w.u8(self.compression.bits())?;
        w.u32(self.max_buffer_size)?;
        w.u32(self.min_width)?;
        w.u32(self.max_width)?;
        w.u32(self.min_height)?;
        w.u32(self.max_height)?;
        Ok(w.position())
    }
}
