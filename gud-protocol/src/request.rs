//! Vendor request codes and protocol limits
//!
//! Requests are divided into two categories:
//! - GET_* (device → host): control IN, reply carries a structure or array
//! - SET_* (host → device): control OUT, payload carries the argument
//!
//! Connector requests pass the connector index in `wValue`.

// Request codes: status and descriptor
pub const REQ_GET_STATUS: u8 = 0x00;
pub const REQ_GET_DESCRIPTOR: u8 = 0x01;
pub const REQ_SET_VERSION: u8 = 0x30;

// Request codes: formats and properties
pub const REQ_GET_FORMATS: u8 = 0x40;
pub const REQ_GET_PROPERTIES: u8 = 0x41;

// Request codes: connectors
pub const REQ_GET_CONNECTORS: u8 = 0x50;
pub const REQ_GET_CONNECTOR_PROPERTIES: u8 = 0x51;
pub const REQ_GET_CONNECTOR_TV_MODE_VALUES: u8 = 0x52;
pub const REQ_SET_CONNECTOR_FORCE_DETECT: u8 = 0x53;
pub const REQ_GET_CONNECTOR_STATUS: u8 = 0x54;
pub const REQ_GET_CONNECTOR_MODES: u8 = 0x55;
pub const REQ_GET_CONNECTOR_EDID: u8 = 0x56;

// Request codes: framebuffer and pipeline state
pub const REQ_SET_BUFFER: u8 = 0x60;
pub const REQ_SET_STATE_CHECK: u8 = 0x61;
pub const REQ_SET_STATE_COMMIT: u8 = 0x62;
pub const REQ_SET_CONTROLLER_ENABLE: u8 = 0x63;
pub const REQ_SET_DISPLAY_ENABLE: u8 = 0x64;

/// Maximum number of pixel formats a device may report
pub const FORMATS_MAX_NUM: usize = 32;
/// Maximum number of device properties
pub const PROPERTIES_MAX_NUM: usize = 32;
/// Maximum number of connectors
pub const CONNECTORS_MAX_NUM: usize = 32;
/// Maximum number of properties per connector
pub const CONNECTOR_PROPERTIES_MAX_NUM: usize = 32;
/// Maximum number of modes per connector
pub const CONNECTOR_MAX_NUM_MODES: usize = 128;
/// Maximum EDID size in bytes
pub const CONNECTOR_MAX_EDID_LEN: usize = 2048;
/// EDID data comes in blocks of this size
pub const EDID_BLOCK_LEN: usize = 128;
/// Length of one NUL-padded TV mode name
pub const TV_MODE_NAME_LEN: usize = 16;
/// Maximum number of TV mode names
pub const TV_MODE_MAX_NUM: usize = 16;

/// GUD vendor requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    GetStatus,
    GetDescriptor,
    /// Legacy version negotiation, not sent by current hosts
    SetVersion,
    GetFormats,
    GetProperties,
    GetConnectors,
    GetConnectorProperties,
    GetConnectorTvModeValues,
    SetConnectorForceDetect,
    GetConnectorStatus,
    GetConnectorModes,
    GetConnectorEdid,
    SetBuffer,
    SetStateCheck,
    SetStateCommit,
    SetControllerEnable,
    SetDisplayEnable,
}

impl Request {
    /// Every known request, in code order
    pub const ALL: [Request; 17] = [
        Request::GetStatus,
        Request::GetDescriptor,
        Request::SetVersion,
        Request::GetFormats,
        Request::GetProperties,
        Request::GetConnectors,
        Request::GetConnectorProperties,
        Request::GetConnectorTvModeValues,
        Request::SetConnectorForceDetect,
        Request::GetConnectorStatus,
        Request::GetConnectorModes,
        Request::GetConnectorEdid,
        Request::SetBuffer,
        Request::SetStateCheck,
        Request::SetStateCommit,
        Request::SetControllerEnable,
        Request::SetDisplayEnable,
    ];

    /// Parse a bRequest value
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            REQ_GET_STATUS => Some(Request::GetStatus),
            REQ_GET_DESCRIPTOR => Some(Request::GetDescriptor),
            REQ_SET_VERSION => Some(Request::SetVersion),
            REQ_GET_FORMATS => Some(Request::GetFormats),
            REQ_GET_PROPERTIES => Some(Request::GetProperties),
            REQ_GET_CONNECTORS => Some(Request::GetConnectors),
            REQ_GET_CONNECTOR_PROPERTIES => Some(Request::GetConnectorProperties),
            REQ_GET_CONNECTOR_TV_MODE_VALUES => Some(Request::GetConnectorTvModeValues),
            REQ_SET_CONNECTOR_FORCE_DETECT => Some(Request::SetConnectorForceDetect),
            REQ_GET_CONNECTOR_STATUS => Some(Request::GetConnectorStatus),
            REQ_GET_CONNECTOR_MODES => Some(Request::GetConnectorModes),
            REQ_GET_CONNECTOR_EDID => Some(Request::GetConnectorEdid),
            REQ_SET_BUFFER => Some(Request::SetBuffer),
            REQ_SET_STATE_CHECK => Some(Request::SetStateCheck),
            REQ_SET_STATE_COMMIT => Some(Request::SetStateCommit),
            REQ_SET_CONTROLLER_ENABLE => Some(Request::SetControllerEnable),
            REQ_SET_DISPLAY_ENABLE => Some(Request::SetDisplayEnable),
            _ => None,
        }
    }

    /// Convert to the bRequest value
    pub fn to_byte(self) -> u8 {
        match self {
            Request::GetStatus => REQ_GET_STATUS,
            Request::GetDescriptor => REQ_GET_DESCRIPTOR,
            Request::SetVersion => REQ_SET_VERSION,
            Request::GetFormats => REQ_GET_FORMATS,
            Request::GetProperties => REQ_GET_PROPERTIES,
            Request::GetConnectors => REQ_GET_CONNECTORS,
            Request::GetConnectorProperties => REQ_GET_CONNECTOR_PROPERTIES,
            Request::GetConnectorTvModeValues => REQ_GET_CONNECTOR_TV_MODE_VALUES,
            Request::SetConnectorForceDetect => REQ_SET_CONNECTOR_FORCE_DETECT,
            Request::GetConnectorStatus => REQ_GET_CONNECTOR_STATUS,
            Request::GetConnectorModes => REQ_GET_CONNECTOR_MODES,
            Request::GetConnectorEdid => REQ_GET_CONNECTOR_EDID,
            Request::SetBuffer => REQ_SET_BUFFER,
            Request::SetStateCheck => REQ_SET_STATE_CHECK,
            Request::SetStateCommit => REQ_SET_STATE_COMMIT,
            Request::SetControllerEnable => REQ_SET_CONTROLLER_ENABLE,
            Request::SetDisplayEnable => REQ_SET_DISPLAY_ENABLE,
        }
    }

    /// True for requests whose data stage flows device → host
    pub fn is_in(self) -> bool {
        matches!(
            self,
            Request::GetStatus
                | Request::GetDescriptor
                | Request::GetFormats
                | Request::GetProperties
                | Request::GetConnectors
                | Request::GetConnectorProperties
                | Request::GetConnectorTvModeValues
                | Request::GetConnectorStatus
                | Request::GetConnectorModes
                | Request::GetConnectorEdid
        )
    }

    /// Protocol name of the request
    pub fn name(self) -> &'static str {
        match self {
            Request::GetStatus => "GET_STATUS",
            Request::GetDescriptor => "GET_DESCRIPTOR",
            Request::SetVersion => "SET_VERSION",
            Request::GetFormats => "GET_FORMATS",
            Request::GetProperties => "GET_PROPERTIES",
            Request::GetConnectors => "GET_CONNECTORS",
            Request::GetConnectorProperties => "GET_CONNECTOR_PROPERTIES",
            Request::GetConnectorTvModeValues => "GET_CONNECTOR_TV_MODE_VALUES",
            Request::SetConnectorForceDetect => "SET_CONNECTOR_FORCE_DETECT",
            Request::GetConnectorStatus => "GET_CONNECTOR_STATUS",
            Request::GetConnectorModes => "GET_CONNECTOR_MODES",
            Request::GetConnectorEdid => "GET_CONNECTOR_EDID",
            Request::SetBuffer => "SET_BUFFER",
            Request::SetStateCheck => "SET_STATE_CHECK",
            Request::SetStateCommit => "SET_STATE_COMMIT",
            Request::SetControllerEnable => "SET_CONTROLLER_ENABLE",
            Request::SetDisplayEnable => "SET_DISPLAY_ENABLE",
        }
    }
}

impl core::fmt::Display for Request {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
