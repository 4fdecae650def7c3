//! GUD traffic monitor
//!
//! Reconstructs GUD transactions from the kernel's usbmon binary interface:
//!
//! ```text
//! /dev/usbmonN ──> Record ──> UrbPairer ──> Urb ──> Reconstructor ──> Observation
//!   (mmap ring)    (header +    (submit +             (transfers,        (printed)
//!                   payload)     complete)             flushes, stats)
//! ```
//!
//! The reconstructor follows one device. It is either configured by device
//! number or discovered from the first GUD GET_DESCRIPTOR seen on the bus.

#![deny(unsafe_code)]

pub mod config;
pub mod decode;
pub mod error;
pub mod flush;
pub mod reconstruct;
pub mod session;
#[allow(unsafe_code)]
pub mod signal;
pub mod stats;
pub mod transfer;
pub mod urb;
#[allow(unsafe_code)]
pub mod usbmon;

pub use config::MonitorConfig;
pub use error::{ConfigError, MonitorError, Result};
pub use flush::Flush;
pub use reconstruct::{Anomaly, Observation, Reconstructor};
pub use session::Session;
pub use stats::{FlushStat, Stats};
pub use transfer::{Outcome, Transfer};
pub use urb::{Urb, UrbPairer};
pub use usbmon::{EventSource, Fetch, Record, Replay, UsbmonDevice};
