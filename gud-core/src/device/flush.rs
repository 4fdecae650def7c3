//! Framebuffer flush planning
//!
//! A damaged rectangle is aligned, split into bands that fit the device
//! transfer buffer and encoded band by band. Each band is optionally LZ4
//! compressed; the compressed form is kept only when it is strictly smaller.

use gud_display::Rect;
use gud_protocol::{Compression, SetBuffer};

/// Outcome of one flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    /// Region sent after alignment (the full frame on full-update devices)
    pub rect: Rect,
    /// Number of SET_BUFFER/bulk pairs
    pub chunks: usize,
    /// Uncompressed pixel bytes
    pub raw_bytes: usize,
    /// Bytes actually sent over bulk
    pub sent_bytes: usize,
}

impl FlushReport {
    /// Uncompressed over sent bytes
    pub fn compression_ratio(&self) -> f64 {
        if self.sent_bytes == 0 {
            return 1.0;
        }
        self.raw_bytes as f64 / self.sent_bytes as f64
    }
}

/// Rows per band so one band fits `max_buffer` bytes
pub(crate) fn max_lines(max_buffer: usize, pitch: usize) -> u32 {
    if pitch == 0 {
        return u32::MAX;
    }
    (max_buffer / pitch).min(u32::MAX as usize) as u32
}

/// One band ready for the wire
#[derive(Debug)]
pub(crate) struct Chunk {
    pub header: SetBuffer,
    pub payload: Vec<u8>,
}

impl Chunk {
    /// Build the header for `raw` pixels of `rect`, compressing if it helps
    pub fn new(rect: Rect, raw: Vec<u8>, lz4: bool) -> Self {
        let mut header = SetBuffer {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            length: raw.len() as u32,
            compression: Compression::empty(),
            compressed_length: 0,
        };

        if lz4 {
            let compressed = lz4_flex::block::compress(&raw);
            if compressed.len() < raw.len() {
                header.compression = Compression::LZ4;
                header.compressed_length = compressed.len() as u32;
                return Self {
                    header,
                    payload: compressed,
                };
            }
        }

        Self {
            header,
            payload: raw,
        }
    }
}
