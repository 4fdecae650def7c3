//! Driver error taxonomy
//!
//! Device status codes, transport failures, descriptor rejection and local
//! validation errors share one enum so callers can match on the kind.

use gud_display::CodecError;
use gud_protocol::{DescriptorError, PixelFormat, Request, Status, WireError};
use thiserror::Error;

use crate::state::DeviceState;

/// Failures reported by a `Transport`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("endpoint stalled")]
    Stall,
    #[error("transfer timed out")]
    Timeout,
    #[error("device disconnected")]
    Disconnected,
    #[error("usb i/o error: {0}")]
    Io(String),
}

/// Driver errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("{request}: device busy (status {code})")]
    Busy { request: Request, code: u8 },

    #[error("{request}: request not supported (status {code})")]
    RequestNotSupported { request: Request, code: u8 },

    #[error("{request}: protocol error (status {code})")]
    ProtocolError { request: Request, code: u8 },

    #[error("{request}: invalid parameter (status {code})")]
    InvalidParameter { request: Request, code: u8 },

    #[error("{request}: device error (status {code})")]
    DeviceError { request: Request, code: u8 },

    /// The device stalled but GET_STATUS says the request succeeded
    #[error("{request}: endpoint stalled but status reads OK")]
    StallWithoutStatus { request: Request },

    #[error("{request}: device took {actual} of {expected} bytes")]
    ShortTransfer {
        request: Request,
        expected: usize,
        actual: usize,
    },

    #[error("{request}: malformed reply: {source}")]
    Reply {
        request: Request,
        #[source]
        source: WireError,
    },

    #[error("{request}: cannot encode request: {source}")]
    Encode {
        request: Request,
        #[source]
        source: WireError,
    },

    #[error("{request}: {source}")]
    Transport {
        request: Request,
        #[source]
        source: TransportError,
    },

    #[error("bulk transfer failed: {0}")]
    Bulk(#[source] TransportError),

    #[error("no usable device: {0}")]
    NoDevice(#[from] DescriptorError),

    #[error("no usable device: descriptor reply is {0} bytes")]
    ShortDescriptor(usize),

    #[error("no usable device: no supported pixel formats")]
    NoFormats,

    #[error("operation not allowed while {0:?}")]
    InvalidLifecycle(DeviceState),

    #[error("no connector {0}")]
    NoSuchConnector(usize),

    #[error("pixel format {0} not advertised by the device")]
    UnsupportedFormat(PixelFormat),

    #[error("mode {0} not offered by connector {1}")]
    UnknownMode(String, usize),

    #[error("connector {0} offers no modes")]
    NoModes(usize),

    #[error("property {0} not present")]
    UnknownProperty(u16),

    #[error("property {id}: value {value:#x} outside supported {supported:#x}")]
    InvalidPropertyValue { id: u16, value: u64, supported: u64 },

    #[error("state was not checked before commit")]
    NotChecked,

    #[error("image is {actual:?}, mode needs {expected:?}")]
    ImageSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("a row of {pitch} bytes does not fit the {max_buffer} byte transfer buffer")]
    BufferTooSmall { pitch: usize, max_buffer: usize },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl Error {
    /// Map a non-OK status byte to its error kind
    pub fn from_status(request: Request, code: u8) -> Option<Self> {
        match Status::from_byte(code) {
            Status::Ok => None,
            Status::Busy => Some(Error::Busy { request, code }),
            Status::RequestNotSupported => Some(Error::RequestNotSupported { request, code }),
            Status::ProtocolError => Some(Error::ProtocolError { request, code }),
            Status::InvalidParameter => Some(Error::InvalidParameter { request, code }),
            Status::Error => Some(Error::DeviceError { request, code }),
        }
    }

    /// Device status behind this error, if it came from GET_STATUS
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::Busy { code, .. }
            | Error::RequestNotSupported { code, .. }
            | Error::ProtocolError { code, .. }
            | Error::InvalidParameter { code, .. }
            | Error::DeviceError { code, .. } => Some(Status::from_byte(*code)),
            _ => None,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
