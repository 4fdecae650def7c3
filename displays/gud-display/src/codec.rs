//! Image region → wire pixel encoding
//!
//! Every format is encoded row by row. Sub-byte formats (R1, XRGB1111) pack
//! pixels MSB first and flush a partial trailing byte at the end of each
//! row, so a row always occupies `PixelFormat::pitch(width)` bytes.

use alloc::vec::Vec;
use core::fmt;

use gud_protocol::PixelFormat;

use crate::image::{Color, Image};
use crate::rect::Rect;

/// Codec errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// Region extends past the image
    OutOfBounds { rect: Rect, width: u32, height: u32 },
    /// Pixel data length does not match the dimensions
    SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::OutOfBounds {
                rect,
                width,
                height,
            } => write!(f, "region {} outside {}x{} image", rect, width, height),
            CodecError::SizeMismatch { expected, actual } => {
                write!(f, "expected {} bytes of pixel data, got {}", expected, actual)
            }
        }
    }
}

impl core::error::Error for CodecError {}

/// Encoded pixels together with the region they cover
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Region actually encoded, after byte alignment
    pub rect: Rect,
    pub data: Vec<u8>,
}

/// Bytes needed for a `width` x `height` region
pub fn encoded_len(format: PixelFormat, width: u32, height: u32) -> usize {
    format.pitch(width) * height as usize
}

/// Encode `rect` of `image` as `format`.
///
/// The region is first widened to whole bytes of the format (see
/// `Rect::align_to`); the returned `Encoded::rect` reports the widened region.
pub fn encode(image: &Image, rect: Rect, format: PixelFormat) -> Result<Encoded, CodecError> {
    let mut data = Vec::new();
    let rect = encode_into(image, rect, format, &mut data)?;
    Ok(Encoded { rect, data })
}

/// Append the encoding of `rect` to `out`, returning the aligned region
pub fn encode_into(
    image: &Image,
    rect: Rect,
    format: PixelFormat,
    out: &mut Vec<u8>,
) -> Result<Rect, CodecError> {
    if !image.bounds().contains(&rect) {
        return Err(CodecError::OutOfBounds {
            rect,
            width: image.width(),
            height: image.height(),
        });
    }

    let rect = rect.align_to(format, image.width());
    out.reserve(encoded_len(format, rect.width, rect.height));

    for y in rect.y..rect.bottom() {
        let row = image.span(rect.x, y, rect.width);
        match format {
            PixelFormat::R1 => pack_bits(row, 1, out, |p| p.luma() & 1),
            PixelFormat::Xrgb1111 => pack_bits(row, 4, out, |p| {
                (p.r >> 7) << 2 | (p.g >> 7) << 1 | p.b >> 7
            }),
            PixelFormat::Rgb332 => {
                out.extend(row.iter().map(|p| (p.r >> 5) << 5 | (p.g >> 5) << 2 | p.b >> 6));
            }
            PixelFormat::Rgb565 => {
                for p in row {
                    let value = (p.r as u16 >> 3) << 11 | (p.g as u16 >> 2) << 5 | p.b as u16 >> 3;
                    out.extend_from_slice(&value.to_le_bytes());
                }
            }
            PixelFormat::Rgb888 => {
                for p in row {
                    out.extend_from_slice(&[p.b, p.g, p.r]);
                }
            }
            PixelFormat::Xrgb8888 => {
                for p in row {
                    out.extend_from_slice(&[p.b, p.g, p.r, 0]);
                }
            }
            PixelFormat::Argb8888 => {
                for p in row {
                    out.extend_from_slice(&[p.b, p.g, p.r, p.a]);
                }
            }
        }
    }

    Ok(rect)
}

/// Pack `bits`-wide values MSB first, flushing the partial byte at row end
fn pack_bits(row: &[Color], bits: u32, out: &mut Vec<u8>, value: impl Fn(&Color) -> u8) {
    let per_byte = (8 / bits) as usize;
    for chunk in row.chunks(per_byte) {
        let mut byte = 0u8;
        for (i, pixel) in chunk.iter().enumerate() {
            let shift = 8 - bits * (i as u32 + 1);
            byte |= value(pixel) << shift;
        }
        out.push(byte);
    }
}
