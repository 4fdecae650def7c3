//! In-memory GUD device for driver tests
//!
//! Behaves like the gadget: a failing request stalls and leaves its status
//! for the following GET_STATUS, a successful one resets the status to OK.

use std::collections::{HashMap, HashSet};

use gud_protocol::{
    ConnectorDescriptor, ConnectorFlags, ConnectorType, DisplayDescriptor, DisplayFlags,
    DisplayMode, ModeFlags, PixelFormat, PropertyId, PropertyReq, Request, Rotation, Wire,
    Compression, DISPLAY_MAGIC,
};

use crate::error::TransportError;
use crate::traits::Transport;

#[derive(Debug, Clone)]
pub struct MockConnector {
    pub descriptor: ConnectorDescriptor,
    pub status: u8,
    pub modes: Vec<DisplayMode>,
    pub edid: Vec<u8>,
    pub properties: Vec<PropertyReq>,
    pub tv_modes: Vec<&'static str>,
}

/// One request as seen by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logged {
    pub request: Request,
    pub value: u16,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct MockDevice {
    pub descriptor: DisplayDescriptor,
    pub formats: Vec<u8>,
    pub properties: Vec<PropertyReq>,
    pub connectors: Vec<MockConnector>,
    /// Status returned by the next GET_STATUS
    pub status: u8,
    /// Requests that stall and leave this status code
    pub fail: HashMap<Request, u8>,
    /// Requests that stall but leave status OK
    pub stall_ok: HashSet<Request>,
    /// Number of upcoming bulk transfers that time out
    pub bulk_failures: usize,
    pub log: Vec<Logged>,
    pub bulk: Vec<Vec<u8>>,
}

pub fn preferred_mode() -> DisplayMode {
    let mut mode = DisplayMode::from_size(320, 240, 60);
    mode.flags = ModeFlags::PREFERRED;
    mode
}

impl MockDevice {
    /// 320x240 panel speaking RGB565/XRGB8888 with LZ4
    pub fn new() -> Self {
        Self {
            descriptor: DisplayDescriptor {
                magic: DISPLAY_MAGIC,
                version: 1,
                flags: DisplayFlags::empty(),
                compression: Compression::LZ4,
                max_buffer_size: 0,
                min_width: 320,
                max_width: 320,
                min_height: 240,
                max_height: 240,
            },
            formats: vec![
                PixelFormat::Rgb565.to_byte(),
                PixelFormat::Xrgb8888.to_byte(),
            ],
            properties: vec![
                PropertyReq::new(PropertyId::Rotation, 0x3f),
                PropertyReq::new(PropertyId::BacklightBrightness, 100),
            ],
            connectors: vec![MockConnector {
                descriptor: ConnectorDescriptor {
                    connector_type: ConnectorType::Panel,
                    flags: ConnectorFlags::empty(),
                },
                status: 0x01,
                modes: vec![DisplayMode::from_size(160, 120, 60), preferred_mode()],
                edid: vec![0; 128],
                properties: vec![],
                tv_modes: vec![],
            }],
            status: 0,
            fail: HashMap::new(),
            stall_ok: HashSet::new(),
            bulk_failures: 0,
            log: Vec::new(),
            bulk: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: DisplayFlags) -> Self {
        self.descriptor.flags = flags;
        self
    }

    pub fn with_max_buffer(mut self, size: u32) -> Self {
        self.descriptor.max_buffer_size = size;
        self
    }

    /// Rotation support limited to `supported`
    pub fn with_rotation(mut self, supported: Rotation) -> Self {
        self.properties[0].val = supported.bits();
        self
    }

    /// Requests logged with this code
    pub fn requests(&self, request: Request) -> Vec<&Logged> {
        self.log.iter().filter(|l| l.request == request).collect()
    }

    pub fn count(&self, request: Request) -> usize {
        self.requests(request).len()
    }

    /// Requests in order, GET_STATUS included
    pub fn sequence(&self) -> Vec<Request> {
        self.log.iter().map(|l| l.request).collect()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        self.bulk.clear();
    }

    fn connector(&self, value: u16) -> Option<&MockConnector> {
        self.connectors.get(value as usize)
    }

    fn reply(&mut self, request: Request, value: u16) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        match request {
            Request::GetDescriptor => {
                let mut buf = [0u8; DisplayDescriptor::SIZE];
                self.descriptor.encode(&mut buf).ok()?;
                out.extend_from_slice(&buf);
            }
            Request::GetFormats => out.extend_from_slice(&self.formats),
            Request::GetProperties => push_props(&mut out, &self.properties),
            Request::GetConnectors => {
                for c in &self.connectors {
                    let mut buf = [0u8; ConnectorDescriptor::SIZE];
                    c.descriptor.encode(&mut buf).ok()?;
                    out.extend_from_slice(&buf);
                }
            }
            Request::GetConnectorStatus => {
                let connector = self.connectors.get_mut(value as usize)?;
                out.push(connector.status);
                // The changed bit is cleared once read
                connector.status &= !0x80;
            }
            Request::GetConnectorModes => {
                for mode in &self.connector(value)?.modes {
                    let mut buf = [0u8; DisplayMode::SIZE];
                    mode.encode(&mut buf).ok()?;
                    out.extend_from_slice(&buf);
                }
            }
            Request::GetConnectorEdid => out.extend_from_slice(&self.connector(value)?.edid),
            Request::GetConnectorProperties => {
                push_props(&mut out, &self.connector(value)?.properties)
            }
            Request::GetConnectorTvModeValues => {
                for name in &self.connector(value)?.tv_modes {
                    let mut raw = [0u8; 16];
                    raw[..name.len()].copy_from_slice(name.as_bytes());
                    out.extend_from_slice(&raw);
                }
            }
            _ => return None,
        }
        Some(out)
    }

    fn outcome(&mut self, request: Request) -> Result<(), TransportError> {
        if let Some(&code) = self.fail.get(&request) {
            self.status = code;
            return Err(TransportError::Stall);
        }
        if self.stall_ok.contains(&request) {
            self.status = 0;
            return Err(TransportError::Stall);
        }
        self.status = 0;
        Ok(())
    }
}

fn push_props(out: &mut Vec<u8>, props: &[PropertyReq]) {
    for prop in props {
        let mut buf = [0u8; PropertyReq::SIZE];
        if prop.encode(&mut buf).is_ok() {
            out.extend_from_slice(&buf);
        }
    }
}

impl Transport for MockDevice {
    fn control_in(
        &mut self,
        request: Request,
        value: u16,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.log.push(Logged {
            request,
            value,
            data: Vec::new(),
        });

        if request == Request::GetStatus {
            buf[0] = self.status;
            return Ok(1);
        }

        self.outcome(request)?;
        let Some(reply) = self.reply(request, value) else {
            self.status = 2;
            return Err(TransportError::Stall);
        };
        let len = reply.len().min(buf.len());
        buf[..len].copy_from_slice(&reply[..len]);
        Ok(len)
    }

    fn control_out(
        &mut self,
        request: Request,
        value: u16,
        data: &[u8],
    ) -> Result<usize, TransportError> {
        self.log.push(Logged {
            request,
            value,
            data: data.to_vec(),
        });
        self.outcome(request)?;
        if request == Request::SetConnectorForceDetect {
            if let Some(connector) = self.connectors.get_mut(value as usize) {
                connector.status |= 0x80;
            }
        }
        Ok(data.len())
    }

    fn bulk_out(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if self.bulk_failures > 0 {
            self.bulk_failures -= 1;
            return Err(TransportError::Timeout);
        }
        self.bulk.push(data.to_vec());
        Ok(data.len())
    }
}
