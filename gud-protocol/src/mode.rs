//! Display timing modes returned by GET_CONNECTOR_MODES
//!
//! Layout (24 bytes): clock (kHz, u32), hdisplay, hsync_start, hsync_end,
//! htotal, vdisplay, vsync_start, vsync_end, vtotal (u16 each), flags (u32).

use bitflags::bitflags;
use core::fmt;

use crate::wire::{Reader, Wire, WireError, Writer};

bitflags! {
    /// Mode flags, DRM compatible
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModeFlags: u32 {
        const PHSYNC = 1 << 0;
        const NHSYNC = 1 << 1;
        const PVSYNC = 1 << 2;
        const NVSYNC = 1 << 3;
        const INTERLACE = 1 << 4;
        const DBLSCAN = 1 << 5;
        const CSYNC = 1 << 6;
        const PCSYNC = 1 << 7;
        const NCSYNC = 1 << 8;
        const HSKEW = 1 << 9;
        /// Mode the device prefers
        const PREFERRED = 1 << 10;
        const DBLCLK = 1 << 12;
        const CLKDIV2 = 1 << 13;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ModeFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ModeFlags({=u32:#x})", self.bits())
    }
}

/// A display timing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayMode {
    /// Pixel clock in kHz
    pub clock: u32,
    pub hdisplay: u16,
    pub hsync_start: u16,
    pub hsync_end: u16,
    pub htotal: u16,
    pub vdisplay: u16,
    pub vsync_start: u16,
    pub vsync_end: u16,
    pub vtotal: u16,
    pub flags: ModeFlags,
}

impl DisplayMode {
    /// Build a mode with no blanking from a size and refresh rate
    pub fn from_size(width: u16, height: u16, refresh: u32) -> Self {
        Self {
            clock: width as u32 * height as u32 * refresh / 1000,
            hdisplay: width,
            hsync_start: width,
            hsync_end: width,
            htotal: width,
            vdisplay: height,
            vsync_start: height,
            vsync_end: height,
            vtotal: height,
            flags: ModeFlags::empty(),
        }
    }

    pub fn preferred(&self) -> bool {
        self.flags.contains(ModeFlags::PREFERRED)
    }

    pub fn interlaced(&self) -> bool {
        self.flags.contains(ModeFlags::INTERLACE)
    }

    /// Vertical refresh rate in Hz, rounded down
    pub fn vrefresh(&self) -> u32 {
        let total = self.htotal as u64 * self.vtotal as u64;
        if total == 0 {
            return 0;
        }
        let mut refresh = self.clock as u64 * 1000 / total;
        if self.flags.contains(ModeFlags::INTERLACE) {
            refresh *= 2;
        }
        if self.flags.contains(ModeFlags::DBLSCAN) {
            refresh /= 2;
        }
        refresh as u32
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{}", self.hdisplay, self.vdisplay, self.vrefresh())?;
        if self.interlaced() {
            f.write_str("i")?;
        }
        Ok(())
    }
}

impl Wire for DisplayMode {
    const SIZE: usize = 24;

    fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::require(bytes, Self::SIZE)?;
        Ok(Self {
            clock: r.u32()?,
            hdisplay: r.u16()?,
            hsync_start: r.u16()?,
            hsync_end: r.u16()?,
            htotal: r.u16()?,
            vdisplay: r.u16()?,
            vsync_start: r.u16()?,
            vsync_end: r.u16()?,
            vtotal: r.u16()?,
            flags: ModeFlags::from_bits_retain(r.u32()?),
        })
    }

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, WireError> {
        let mut w = Writer::require(buffer, Self::SIZE)?;
        w.u32(self.clock)?;
        w.u16(self.hdisplay)?;
        w.u16(self.hsync_start)?;
        w.u16(self.hsync_end)?;
        w.u16(self.htotal)?;
        w.u16(self.vdisplay)?;
        w.u16(self.vsync_start)?;
        w.u16(self.vsync_end)?;
        w.u16(self.vtotal)?;
        w.u32(self.flags.bits())?;
        Ok(w.position())
    }
}
