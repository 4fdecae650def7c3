//! Little-endian field access for packed wire structures.
//!
//! Every GUD structure is read and written through a [`Reader`] or
//! [`Writer`] cursor so field order on the wire is spelled out explicitly
//! instead of relying on struct layout.

use core::fmt;
use heapless::Vec;

/// Errors that can occur while decoding or encoding wire structures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireError {
    /// Input ended before the structure was complete
    Truncated { needed: usize, available: usize },
    /// Array payload length is not a multiple of the element size
    Misaligned { len: usize, element: usize },
    /// More elements than the protocol limit allows
    TooMany { limit: usize },
    /// Output buffer too small for encoding
    BufferTooSmall,
    /// Fixed-size name field is not valid UTF-8
    InvalidName,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Truncated { needed, available } => {
                write!(f, "truncated: need {} bytes, have {}", needed, available)
            }
            WireError::Misaligned { len, element } => {
                write!(f, "length {} is not a multiple of {}", len, element)
            }
            WireError::TooMany { limit } => write!(f, "more than {} elements", limit),
            WireError::BufferTooSmall => f.write_str("output buffer too small"),
            WireError::InvalidName => f.write_str("name is not valid UTF-8"),
        }
    }
}

impl core::error::Error for WireError {}

/// A fixed-size packed structure
pub trait Wire: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Decode from the first `SIZE` bytes of `bytes`
    fn decode(bytes: &[u8]) -> Result<Self, WireError>;

    /// Encode into `buffer`, returning the number of bytes written
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, WireError>;
}

/// Decode a packed array of `T`.
///
/// The payload must be an exact multiple of `T::SIZE` and hold at most `N`
/// elements.
pub fn decode_array<T: Wire, const N: usize>(bytes: &[u8]) -> Result<Vec<T, N>, WireError> {
    if bytes.len() % T::SIZE != 0 {
        return Err(WireError::Misaligned {
            len: bytes.len(),
            element: T::SIZE,
        });
    }

    let mut items = Vec::new();
    for chunk in bytes.chunks_exact(T::SIZE) {
        items
            .push(T::decode(chunk)?)
            .map_err(|_| WireError::TooMany { limit: N })?;
    }
    Ok(items)
}

/// Cursor over a little-endian byte slice
#[derive(Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Start reading at offset 0
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Fail early if fewer than `len` bytes are present in total
    pub fn require(bytes: &'a [u8], len: usize) -> Result<Self, WireError> {
        if bytes.len() < len {
            return Err(WireError::Truncated {
                needed: len,
                available: bytes.len(),
            });
        }
        Ok(Self::new(bytes))
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos + len;
        if end > self.bytes.len() {
            return Err(WireError::Truncated {
                needed: end,
                available: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, WireError> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn u32(&mut self) -> Result<u32, WireError> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn u64(&mut self) -> Result<u64, WireError> {
        self.array().map(u64::from_le_bytes)
    }
}

/// Cursor writing little-endian fields into a byte buffer
#[derive(Debug)]
pub struct Writer<'a> {
    buffer: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    /// Fail early if the buffer cannot hold `len` bytes
    pub fn require(buffer: &'a mut [u8], len: usize) -> Result<Self, WireError> {
        if buffer.len() < len {
            return Err(WireError::BufferTooSmall);
        }
        Ok(Self { buffer, pos: 0 })
    }

    /// Number of bytes written so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn bytes(&mut self, data: &[u8]) -> Result<(), WireError> {
        let end = self.pos + data.len();
        if end > self.buffer.len() {
            return Err(WireError::BufferTooSmall);
        }
        self.buffer[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    pub fn u8(&mut self, value: u8) -> Result<(), WireError> {
        self.bytes(&[value])
    }

    pub fn u16(&mut self, value: u16) -> Result<(), WireError> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u32(&mut self, value: u32) -> Result<(), WireError> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u64(&mut self, value: u64) -> Result<(), WireError> {
        self.bytes(&value.to_le_bytes())
    }
}
