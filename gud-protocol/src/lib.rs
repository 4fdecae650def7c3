//! GUD (Generic USB Display) Protocol Catalog
//!
//! This crate defines the vendor-specific USB protocol spoken between a host
//! and a GUD display. Everything here is a bit-exact wire definition: request
//! codes, status codes, capability flags and the packed little-endian
//! structures carried in control transfers.
//!
//! # Protocol Overview
//!
//! The host talks to a single vendor-class interface:
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────────┐
//! │ control IN   │ GET_DESCRIPTOR, GET_FORMATS, GET_CONNECTOR_*, ...│
//! │ control OUT  │ SET_BUFFER, SET_STATE_CHECK/COMMIT, SET_*_ENABLE │
//! │ bulk OUT     │ framebuffer payload following SET_BUFFER         │
//! └──────────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! A failed request stalls the control endpoint; the host then issues
//! GET_STATUS to learn why. Devices advertising `STATUS_ON_SET` expect the
//! host to read the status after every OUT request as well.
//!
//! All structures are tightly packed and little-endian. Each one has an
//! explicit `encode`/`decode` pair through the [`Wire`] trait.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod buffer;
pub mod connector;
pub mod descriptor;
pub mod format;
pub mod mode;
pub mod property;
pub mod request;
pub mod setup;
pub mod state;
pub mod status;
pub mod tv;
pub mod wire;

pub use buffer::SetBuffer;
pub use connector::{ConnectorDescriptor, ConnectorFlags, ConnectorStatus, ConnectorType, Link};
pub use descriptor::{
    Compression, DescriptorError, DisplayDescriptor, DisplayFlags, StatusSignaling, DISPLAY_MAGIC,
};
pub use format::{PixelFormat, UnknownFormat};
pub use mode::{DisplayMode, ModeFlags};
pub use property::{PropertyId, PropertyReq, Rotation};
pub use request::Request;
pub use setup::SetupPacket;
pub use state::StateReq;
pub use status::Status;
pub use tv::{decode_tv_mode_names, TvModeName};
pub use wire::{decode_array, Wire, WireError};
