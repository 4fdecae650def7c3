//! Status codes returned by GET_STATUS

pub const STATUS_OK: u8 = 0x00;
pub const STATUS_BUSY: u8 = 0x01;
pub const STATUS_REQUEST_NOT_SUPPORTED: u8 = 0x02;
pub const STATUS_PROTOCOL_ERROR: u8 = 0x03;
pub const STATUS_INVALID_PARAMETER: u8 = 0x04;
pub const STATUS_ERROR: u8 = 0x05;

/// Result of the last request as reported by the device.
///
/// The status persists until the next request completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Ok,
    /// Device is busy with a previous request
    Busy,
    RequestNotSupported,
    ProtocolError,
    InvalidParameter,
    /// Generic failure, also used for every code above 5
    Error,
}

impl Status {
    /// Parse a status byte; anything at or above 5 collapses to `Error`
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            STATUS_OK => Status::Ok,
            STATUS_BUSY => Status::Busy,
            STATUS_REQUEST_NOT_SUPPORTED => Status::RequestNotSupported,
            STATUS_PROTOCOL_ERROR => Status::ProtocolError,
            STATUS_INVALID_PARAMETER => Status::InvalidParameter,
            _ => Status::Error,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Status::Ok => STATUS_OK,
            Status::Busy => STATUS_BUSY,
            Status::RequestNotSupported => STATUS_REQUEST_NOT_SUPPORTED,
            Status::ProtocolError => STATUS_PROTOCOL_ERROR,
            Status::InvalidParameter => STATUS_INVALID_PARAMETER,
            Status::Error => STATUS_ERROR,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    pub fn name(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Busy => "BUSY",
            Status::RequestNotSupported => "REQUEST_NOT_SUPPORTED",
            Status::ProtocolError => "PROTOCOL_ERROR",
            Status::InvalidParameter => "INVALID_PARAMETER",
            Status::Error => "ERROR",
        }
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
