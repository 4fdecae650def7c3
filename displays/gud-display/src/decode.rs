//! Wire pixels → RGB expansion
//!
//! Used to verify encodings. Channels are expanded by shifting the stored
//! bits back to the top of the byte, so a decoded channel is always the
//! largest multiple of the quantization step not above the source value.
//! R1 decodes to black or white; XRGB1111 channels decode to 0 or 0x80.

use alloc::vec::Vec;

use gud_protocol::PixelFormat;

use crate::codec::{encoded_len, CodecError};
use crate::image::Color;

/// Decode a packed `width` x `height` region
pub fn decode(
    format: PixelFormat,
    data: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<Color>, CodecError> {
    let expected = encoded_len(format, width, height);
    if data.len() != expected {
        return Err(CodecError::SizeMismatch {
            expected,
            actual: data.len(),
        });
    }

    let pitch = format.pitch(width);
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    if pitch == 0 {
        return Ok(pixels);
    }

    for row in data.chunks_exact(pitch) {
        for x in 0..width as usize {
            pixels.push(decode_pixel(format, row, x));
        }
    }
    Ok(pixels)
}

fn decode_pixel(format: PixelFormat, row: &[u8], x: usize) -> Color {
    match format {
        PixelFormat::R1 => {
            let bit = row[x / 8] >> (7 - x % 8) & 1;
            if bit != 0 {
                Color::WHITE
            } else {
                Color::BLACK
            }
        }
        PixelFormat::Xrgb1111 => {
            let nibble = row[x / 2] >> (4 - 4 * (x % 2)) & 0x0f;
            Color::rgb(
                (nibble >> 2 & 1) << 7,
                (nibble >> 1 & 1) << 7,
                (nibble & 1) << 7,
            )
        }
        PixelFormat::Rgb332 => {
            let v = row[x];
            Color::rgb(v & 0xe0, (v >> 2 & 0x07) << 5, (v & 0x03) << 6)
        }
        PixelFormat::Rgb565 => {
            let v = u16::from_le_bytes([row[2 * x], row[2 * x + 1]]);
            Color::rgb(
                ((v >> 11) << 3) as u8,
                ((v >> 5 & 0x3f) << 2) as u8,
                ((v & 0x1f) << 3) as u8,
            )
        }
        PixelFormat::Rgb888 => {
            let p = &row[3 * x..3 * x + 3];
            Color::rgb(p[2], p[1], p[0])
        }
        PixelFormat::Xrgb8888 => {
            let p = &row[4 * x..4 * x + 4];
            Color::rgb(p[2], p[1], p[0])
        }
        PixelFormat::Argb8888 => {
            let p = &row[4 * x..4 * x + 4];
            Color::rgba(p[2], p[1], p[0], p[3])
        }
    }
}
