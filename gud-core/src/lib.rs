//! Host-side driver for GUD displays
//!
//! This crate contains the device logic that sits between a USB transport
//! and an application drawing into a framebuffer:
//!
//! - Transport trait (control IN/OUT, bulk OUT) and an optional libusb backend
//! - Device lifecycle state machine
//! - Descriptor, format, property and connector enumeration with caching
//! - Pipeline state check/commit
//! - Framebuffer flushing with band splitting and LZ4 compression
//! - Status polling and stall handling
//!
//! # Example
//!
//! ```no_run
//! # fn demo<T: gud_core::Transport>(transport: T) -> gud_core::Result<()> {
//! use gud_core::{Device, DisplayState, DriverConfig};
//! use gud_display::{Color, Image};
//!
//! let mut device = Device::open(transport, DriverConfig::default())?;
//! let state = device.preferred_state(0)?;
//! device.apply(&state)?;
//!
//! let mut image = Image::filled(state.width(), state.height(), Color::WHITE);
//! device.flush_damage(&mut image)?;
//! device.close()
//! # }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod device;
pub mod error;
pub mod state;
pub mod traits;

#[cfg(feature = "rusb")]
pub mod usb;

#[cfg(test)]
pub(crate) mod mock;

pub use config::DriverConfig;
pub use device::{Connector, Device, DisplayState, FlushReport, Property, PropertySet};
pub use error::{Error, Result, TransportError};
pub use state::{DeviceEvent, DeviceState};
pub use traits::Transport;

#[cfg(feature = "rusb")]
pub use usb::{OpenError, RusbTransport};
