//! Human-readable request payloads

use std::fmt;

use gud_protocol::{
    decode_tv_mode_names, ConnectorDescriptor, ConnectorStatus, DisplayDescriptor, DisplayMode,
    PixelFormat, PropertyReq, Request, SetBuffer, StateReq, Status, Wire,
};

/// Bytes shown before the hex dump is cut short
const HEX_LIMIT: usize = 32;

/// Request payload rendered according to its request code
pub struct Payload<'a> {
    pub request: Request,
    pub data: &'a [u8],
}

impl<'a> Payload<'a> {
    pub fn new(request: Request, data: &'a [u8]) -> Self {
        Self { request, data }
    }
}

pub struct Hex<'a>(pub &'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().take(HEX_LIMIT).enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        if self.0.len() > HEX_LIMIT {
            write!(f, " ... ({} bytes)", self.0.len())?;
        }
        Ok(())
    }
}

fn list<T: Wire>(
    f: &mut fmt::Formatter<'_>,
    data: &[u8],
    item: impl Fn(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    if data.len() % T::SIZE != 0 {
        return write!(f, "{}", Hex(data));
    }
    for (i, chunk) in data.chunks_exact(T::SIZE).enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        match T::decode(chunk) {
            Ok(value) => item(f, &value)?,
            Err(_) => write!(f, "{}", Hex(chunk))?,
        }
    }
    Ok(())
}

fn format_name(f: &mut fmt::Formatter<'_>, code: u8) -> fmt::Result {
    match PixelFormat::from_byte(code) {
        Some(format) => write!(f, "{}", format),
        None => write!(f, "{:#04x}", code),
    }
}

impl fmt::Display for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data;
        match self.request {
            Request::GetStatus => match data.first() {
                Some(&code) => write!(f, "{}", Status::from_byte(code)),
                None => f.write_str("-"),
            },
            Request::GetDescriptor => match DisplayDescriptor::decode(data) {
                Ok(desc) => write!(
                    f,
                    "magic={:#010x} version={} flags={:#x} compression={:#x} \
                     max_buffer_size={} width={}-{} height={}-{}",
                    desc.magic,
                    desc.version,
                    desc.flags.bits(),
                    desc.compression.bits(),
                    desc.max_buffer_size,
                    desc.min_width,
                    desc.max_width,
                    desc.min_height,
                    desc.max_height
                ),
                Err(_) => write!(f, "{}", Hex(data)),
            },
            Request::GetFormats => {
                for (i, &code) in data.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    format_name(f, code)?;
                }
                Ok(())
            }
            Request::GetProperties | Request::GetConnectorProperties => {
                list::<PropertyReq>(f, data, |f, prop| write!(f, "{}", prop))
            }
            Request::GetConnectors => list::<ConnectorDescriptor>(f, data, |f, c| {
                write!(f, "{} flags={:#x}", c.connector_type.name(), c.flags.bits())
            }),
            Request::GetConnectorStatus => match data.first() {
                Some(&status) => write!(f, "{}", ConnectorStatus::from_byte(status)),
                None => f.write_str("-"),
            },
            Request::GetConnectorModes => {
                list::<DisplayMode>(f, data, |f, mode| write!(f, "{}", mode))
            }
            Request::GetConnectorEdid => write!(f, "{} bytes", data.len()),
            Request::GetConnectorTvModeValues => match decode_tv_mode_names(data) {
                Ok(names) => {
                    for (i, name) in names.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        f.write_str(name)?;
                    }
                    Ok(())
                }
                Err(_) => write!(f, "{}", Hex(data)),
            },
            Request::SetStateCheck => match StateReq::decode(data) {
                Ok(state) => {
                    write!(f, "mode={} format=", state.mode)?;
                    format_name(f, state.format)?;
                    write!(f, " connector={}", state.connector)?;
                    for prop in &state.properties {
                        write!(f, ", {}", prop)?;
                    }
                    Ok(())
                }
                Err(_) => write!(f, "{}", Hex(data)),
            },
            Request::SetBuffer => match SetBuffer::decode(data) {
                Ok(header) => write!(f, "{}", header),
                Err(_) => write!(f, "{}", Hex(data)),
            },
            Request::SetControllerEnable | Request::SetDisplayEnable => match data {
                [value] => write!(f, "enable={}", value),
                _ => write!(f, "{}", Hex(data)),
            },
            _ => write!(f, "{}", Hex(data)),
        }
    }
}
