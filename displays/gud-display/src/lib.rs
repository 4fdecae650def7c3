//! Source framebuffer and pixel codec for GUD displays
//!
//! This crate provides:
//! - `Image`, an owned RGBA framebuffer with damage tracking
//! - `Rect` geometry, byte alignment and band splitting
//! - `encode` to turn a region of an `Image` into any GUD wire pixel format
//! - `decode` to expand wire pixels back to RGB for verification
//!
//! # Wire formats
//!
//! ```text
//! XRGB8888  B G R X          ARGB8888  B G R A          RGB888  B G R
//! RGB565    u16 LE rrrrrggg gggbbbbb                    RGB332  rrrgggbb
//! XRGB1111  two pixels per byte, high nibble first (0rgb 0rgb)
//! R1        eight pixels per byte, MSB first, bit = luma & 1
//! ```
//!
//! Sub-byte formats never split a byte between two updates, so regions are
//! widened to whole bytes before encoding.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod codec;
pub mod decode;
pub mod image;
pub mod rect;

// Re-export key types
pub use codec::{encode, encode_into, encoded_len, CodecError, Encoded};
pub use decode::decode;
pub use image::{Color, Image};
pub use rect::{Bands, Rect};
