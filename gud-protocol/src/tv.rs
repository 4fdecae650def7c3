//! TV mode names returned by GET_CONNECTOR_TV_MODE_VALUES
//!
//! The reply is an array of 16-byte NUL-padded names. The TV_MODE property
//! value is an index into this list.

use heapless::{String, Vec};

use crate::request::{TV_MODE_MAX_NUM, TV_MODE_NAME_LEN};
use crate::wire::WireError;

/// One TV mode name
pub type TvModeName = String<TV_MODE_NAME_LEN>;

/// Decode the packed name array
pub fn decode_tv_mode_names(bytes: &[u8]) -> Result<Vec<TvModeName, TV_MODE_MAX_NUM>, WireError> {
    if bytes.len() % TV_MODE_NAME_LEN != 0 {
        return Err(WireError::Misaligned {
            len: bytes.len(),
            element: TV_MODE_NAME_LEN,
        });
    }

    let mut names = Vec::new();
    for raw in bytes.chunks_exact(TV_MODE_NAME_LEN) {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let text = core::str::from_utf8(&raw[..end]).map_err(|_| WireError::InvalidName)?;
        let mut name = TvModeName::new();
        name.push_str(text).map_err(|_| WireError::InvalidName)?;
        names.push(name).map_err(|_| WireError::TooMany {
            limit: TV_MODE_MAX_NUM,
        })?;
    }
    Ok(names)
}
