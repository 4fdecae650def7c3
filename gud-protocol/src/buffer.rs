//! SET_BUFFER request
//!
//! Announces the rectangle and size of the bulk transfer that follows.
//!
//! Layout (25 bytes):
//! ```text
//! ┌─────┬─────┬───────┬────────┬────────┬─────────────┬───────────────────┐
//! │ x   │ y   │ width │ height │ length │ compression │ compressed_length │
//! │ u32 │ u32 │ u32   │ u32    │ u32    │ u8          │ u32               │
//! └─────┴─────┴───────┴────────┴────────┴─────────────┴───────────────────┘
//! ```
//! `length` is the uncompressed size. `compressed_length` is only meaningful
//! when `compression` is non-zero and is then the size of the bulk transfer.

use core::fmt;

use crate::descriptor::Compression;
use crate::wire::{Reader, Wire, WireError, Writer};

/// Header for one framebuffer chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetBuffer {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub length: u32,
    pub compression: Compression,
    pub compressed_length: u32,
}

impl SetBuffer {
    /// Bytes carried by the following bulk transfer
    pub fn transfer_length(&self) -> u32 {
        if self.compression.is_empty() {
            self.length
        } else {
            self.compressed_length
        }
    }

    /// Uncompressed over transferred size, 1.0 when uncompressed
    pub fn compression_ratio(&self) -> f32 {
        let sent = self.transfer_length();
        if sent == 0 {
            return 1.0;
        }
        self.length as f32 / sent as f32
    }
}

impl fmt::Display for SetBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{}) {}x{} len={}",
            self.x, self.y, self.width, self.height, self.length
        )?;
        if !self.compression.is_empty() {
            write!(
                f,
                " compressed={} ({:.1}x)",
                self.compressed_length,
                self.compression_ratio()
            )?;
        }
        Ok(())
    }
}

impl Wire for SetBuffer {
    const SIZE: usize = 25;

    fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::require(bytes, Self::SIZE)?;
        Ok(Self {
            x: r.u32()?,
            y: r.u32()?,
            width: r.u32()?,
            height: r.u32()?,
            length: r.u32()?,
            compression: Compression::from_bits_retain(r.u8()?),
            compressed_length: r.u32()?,
        })
    }

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, WireError> {
        let mut w = Writer::require(buffer, Self::SIZE)?;
        w.u32(self.x)?;
        w.u32(self.y)?;
        w.u32(self.width)?;
        w.u32(self.height)?;
        w.u32(self.length)?;
        w.u8(self.compression.bits())?;
        w.u32(self.compressed_length)?;
        Ok(w.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let req = SetBuffer {
            x: 1,
            y: 2,
            width: 3,
            height: 4,
            length: 5,
            compression: Compression::LZ4,
            compressed_length: 6,
        };
        let mut buffer = [0u8; SetBuffer::SIZE];
        assert_eq!(req.encode(&mut buffer).unwrap(), 25);
        assert_eq!(
            buffer,
            [1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0, 5, 0, 0, 0, 1, 6, 0, 0, 0]
        );
        assert_eq!(SetBuffer::decode(&buffer).unwrap(), req);
    }

    #[test]
    fn test_transfer_length() {
        let mut req = SetBuffer {
            x: 0,
            y: 0,
            width: 100,
            height: 10,
            length: 2000,
            compression: Compression::empty(),
            compressed_length: 0,
        };
        assert_eq!(req.transfer_length(), 2000);
        assert_eq!(req.compression_ratio(), 1.0);

        req.compression = Compression::LZ4;
        req.compressed_length = 500;
        assert_eq!(req.transfer_length(), 500);
        assert_eq!(req.compression_ratio(), 4.0);
    }
}
