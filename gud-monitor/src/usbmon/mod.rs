//! usbmon binary interface
//!
//! Records come from an [`EventSource`]: the live ring in [`device`] or a
//! [`Replay`] of records captured earlier.

pub mod device;
pub mod header;

use std::collections::VecDeque;

pub use device::{RingStats, UsbmonDevice};
pub use header::{EventType, MonHeader, Micros, XferType, HEADER_SIZE};

use crate::error::Result;

/// One header with the payload captured after it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: MonHeader,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub enum Fetch {
    Event(Record),
    /// Cancellation was requested, no more events follow
    Cancelled,
}

pub trait EventSource {
    /// Block until the next record or a cancellation
    fn next_event(&mut self) -> Result<Fetch>;

    /// Kernel count of records lost to a full ring
    fn dropped(&mut self) -> Option<u32> {
        None
    }
}

/// Feeds stored records, then reports cancellation
#[derive(Debug, Default)]
pub struct Replay {
    records: VecDeque<Record>,
}

impl Replay {
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }
}

impl EventSource for Replay {
    fn next_event(&mut self) -> Result<Fetch> {
        Ok(self
            .records
            .pop_front()
            .map_or(Fetch::Cancelled, Fetch::Event))
    }
}
