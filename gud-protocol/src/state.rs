//! SET_STATE_CHECK payload
//!
//! Layout: mode (24 bytes), format (u8), connector index (u8), then any
//! number of 10-byte properties. SET_STATE_COMMIT carries no payload and
//! applies the state from the last successful check.

use heapless::Vec;

use crate::format::PixelFormat;
use crate::mode::DisplayMode;
use crate::property::PropertyReq;
use crate::request::{CONNECTOR_PROPERTIES_MAX_NUM, PROPERTIES_MAX_NUM};
use crate::wire::{decode_array, Reader, Wire, WireError, Writer};

/// Device properties plus connector properties
pub const STATE_MAX_PROPERTIES: usize = PROPERTIES_MAX_NUM + CONNECTOR_PROPERTIES_MAX_NUM;

/// Fixed part of the payload
pub const STATE_HEADER_SIZE: usize = DisplayMode::SIZE + 2;

/// Largest possible SET_STATE_CHECK payload
pub const STATE_MAX_SIZE: usize = STATE_HEADER_SIZE + STATE_MAX_PROPERTIES * PropertyReq::SIZE;

/// Pipeline state sent for validation
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateReq {
    pub mode: DisplayMode,
    /// Raw format code
    pub format: u8,
    pub connector: u8,
    pub properties: Vec<PropertyReq, STATE_MAX_PROPERTIES>,
}

impl StateReq {
    pub fn new(mode: DisplayMode, format: PixelFormat, connector: u8) -> Self {
        Self {
            mode,
            format: format.to_byte(),
            connector,
            properties: Vec::new(),
        }
    }

    pub fn push_property(&mut self, prop: PropertyReq) -> Result<(), WireError> {
        self.properties.push(prop).map_err(|_| WireError::TooMany {
            limit: STATE_MAX_PROPERTIES,
        })
    }

    pub fn encoded_len(&self) -> usize {
        STATE_HEADER_SIZE + self.properties.len() * PropertyReq::SIZE
    }

    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, WireError> {
        let mut w = Writer::require(buffer, self.encoded_len())?;
        let mut mode = [0u8; DisplayMode::SIZE];
        self.mode.encode(&mut mode)?;
        w.bytes(&mode)?;
        w.u8(self.format)?;
        w.u8(self.connector)?;
        let mut prop = [0u8; PropertyReq::SIZE];
        for property in &self.properties {
            property.encode(&mut prop)?;
            w.bytes(&prop)?;
        }
        Ok(w.position())
    }

    /// Encode into a heapless Vec sized for the largest state
    pub fn encode_to_vec(&self) -> Result<Vec<u8, STATE_MAX_SIZE>, WireError> {
        let mut buffer = [0u8; STATE_MAX_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| WireError::BufferTooSmall)?;
        Ok(vec)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::require(bytes, STATE_HEADER_SIZE)?;
        let mode = DisplayMode::decode(r.take(DisplayMode::SIZE)?)?;
        let format = r.u8()?;
        let connector = r.u8()?;
        let properties = decode_array(r.remaining())?;
        Ok(Self {
            mode,
            format,
            connector,
            properties,
        })
    }
}
