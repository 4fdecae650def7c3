//! Pixel formats
//!
//! Codes follow the Linux DRM fourcc ordering used by the gadget driver,
//! compressed into one byte. Sub-byte formats pack pixels MSB first.

use core::fmt;

pub const FORMAT_R1: u8 = 0x01;
pub const FORMAT_XRGB1111: u8 = 0x20;
pub const FORMAT_RGB332: u8 = 0x30;
pub const FORMAT_RGB565: u8 = 0x40;
pub const FORMAT_RGB888: u8 = 0x50;
pub const FORMAT_XRGB8888: u8 = 0x80;
pub const FORMAT_ARGB8888: u8 = 0x81;

/// Wire pixel encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelFormat {
    /// 1-bit monochrome, 8 pixels per byte
    R1,
    /// 3-bit color in a nibble, 2 pixels per byte
    Xrgb1111,
    Rgb332,
    Rgb565,
    Rgb888,
    Xrgb8888,
    Argb8888,
}

/// Format code not in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnknownFormat(pub u8);

impl fmt::Display for UnknownFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown pixel format {:#04x}", self.0)
    }
}

impl core::error::Error for UnknownFormat {}

impl PixelFormat {
    pub const ALL: [PixelFormat; 7] = [
        PixelFormat::R1,
        PixelFormat::Xrgb1111,
        PixelFormat::Rgb332,
        PixelFormat::Rgb565,
        PixelFormat::Rgb888,
        PixelFormat::Xrgb8888,
        PixelFormat::Argb8888,
    ];

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            FORMAT_R1 => Some(PixelFormat::R1),
            FORMAT_XRGB1111 => Some(PixelFormat::Xrgb1111),
            FORMAT_RGB332 => Some(PixelFormat::Rgb332),
            FORMAT_RGB565 => Some(PixelFormat::Rgb565),
            FORMAT_RGB888 => Some(PixelFormat::Rgb888),
            FORMAT_XRGB8888 => Some(PixelFormat::Xrgb8888),
            FORMAT_ARGB8888 => Some(PixelFormat::Argb8888),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            PixelFormat::R1 => FORMAT_R1,
            PixelFormat::Xrgb1111 => FORMAT_XRGB1111,
            PixelFormat::Rgb332 => FORMAT_RGB332,
            PixelFormat::Rgb565 => FORMAT_RGB565,
            PixelFormat::Rgb888 => FORMAT_RGB888,
            PixelFormat::Xrgb8888 => FORMAT_XRGB8888,
            PixelFormat::Argb8888 => FORMAT_ARGB8888,
        }
    }

    /// Storage bits per pixel, including padding bits
    pub fn bits_per_pixel(self) -> usize {
        match self {
            PixelFormat::R1 => 1,
            PixelFormat::Xrgb1111 => 4,
            PixelFormat::Rgb332 => 8,
            PixelFormat::Rgb565 => 16,
            PixelFormat::Rgb888 => 24,
            PixelFormat::Xrgb8888 | PixelFormat::Argb8888 => 32,
        }
    }

    /// Horizontal alignment in pixels so a rectangle starts on a byte boundary
    pub fn pixel_alignment(self) -> u32 {
        match self {
            PixelFormat::R1 => 8,
            PixelFormat::Xrgb1111 => 2,
            _ => 1,
        }
    }

    /// Bytes per row of `width` pixels, partial trailing bytes included
    pub fn pitch(self, width: u32) -> usize {
        (width as usize * self.bits_per_pixel()).div_ceil(8)
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::R1 => "R1",
            PixelFormat::Xrgb1111 => "XRGB1111",
            PixelFormat::Rgb332 => "RGB332",
            PixelFormat::Rgb565 => "RGB565",
            PixelFormat::Rgb888 => "RGB888",
            PixelFormat::Xrgb8888 => "XRGB8888",
            PixelFormat::Argb8888 => "ARGB8888",
        }
    }
}

impl TryFrom<u8> for PixelFormat {
    type Error = UnknownFormat;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        PixelFormat::from_byte(byte).ok_or(UnknownFormat(byte))
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_roundtrip() {
        for format in PixelFormat::ALL {
            assert_eq!(PixelFormat::try_from(format.to_byte()), Ok(format));
        }
        assert_eq!(PixelFormat::try_from(0x42), Err(UnknownFormat(0x42)));
    }

    #[test]
    fn test_pitch() {
        assert_eq!(PixelFormat::R1.pitch(8), 1);
        assert_eq!(PixelFormat::R1.pitch(9), 2);
        assert_eq!(PixelFormat::R1.pitch(100), 13);
        assert_eq!(PixelFormat::Xrgb1111.pitch(3), 2);
        assert_eq!(PixelFormat::Rgb332.pitch(7), 7);
        assert_eq!(PixelFormat::Rgb565.pitch(320), 640);
        assert_eq!(PixelFormat::Rgb888.pitch(10), 30);
        assert_eq!(PixelFormat::Xrgb8888.pitch(1920), 7680);
    }

    #[test]
    fn test_alignment() {
        assert_eq!(PixelFormat::R1.pixel_alignment(), 8);
        assert_eq!(PixelFormat::Xrgb1111.pixel_alignment(), 2);
        assert_eq!(PixelFormat::Rgb565.pixel_alignment(), 1);
    }
}
