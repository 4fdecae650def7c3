//! usbmon binary record header
//!
//! `struct mon_bin_hdr` as the kernel writes it into the ring, in native
//! byte order:
//!
//! ```text
//!  0  id           u64     URB tag, shared by submission and completion
//!  8  type         u8      'S' submit, 'C' complete, 'E' error, '@' filler
//!  9  xfer_type    u8      0 iso, 1 interrupt, 2 control, 3 bulk
//! 10  epnum        u8      endpoint with direction bit 0x80
//! 11  devnum       u8
//! 12  busnum       u16
//! 14  flag_setup   u8      0 when setup is valid
//! 15  flag_data    u8      0 when data follows the header
//! 16  ts_sec       i64
//! 24  ts_usec      i32
//! 28  status       i32     negative errno
//! 32  len_urb      u32
//! 36  len_cap      u32     bytes captured after the header
//! 40  setup        [u8; 8]
//! 48  interval     i32
//! 52  start_frame  i32
//! 56  xfer_flags   u32
//! 60  ndesc        u32
//! ```

use gud_protocol::{SetupPacket, Wire};

use crate::error::{MonitorError, Result};

pub const HEADER_SIZE: usize = 64;

/// Microseconds since the epoch
pub type Micros = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Submit,
    Complete,
    Error,
    Filler,
}

impl EventType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'S' => Some(EventType::Submit),
            b'C' => Some(EventType::Complete),
            b'E' => Some(EventType::Error),
            b'@' => Some(EventType::Filler),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            EventType::Submit => b'S',
            EventType::Complete => b'C',
            EventType::Error => b'E',
            EventType::Filler => b'@',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XferType {
    Isochronous,
    Interrupt,
    Control,
    Bulk,
}

impl XferType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(XferType::Isochronous),
            1 => Some(XferType::Interrupt),
            2 => Some(XferType::Control),
            3 => Some(XferType::Bulk),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            XferType::Isochronous => 0,
            XferType::Interrupt => 1,
            XferType::Control => 2,
            XferType::Bulk => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonHeader {
    pub id: u64,
    /// Raw event type byte
    pub kind: u8,
    pub xfer_type: u8,
    pub epnum: u8,
    pub devnum: u8,
    pub busnum: u16,
    pub flag_setup: u8,
    pub flag_data: u8,
    pub ts_sec: i64,
    pub ts_usec: i32,
    pub status: i32,
    pub len_urb: u32,
    pub len_cap: u32,
    pub setup: [u8; 8],
    pub interval: i32,
    pub start_frame: i32,
    pub xfer_flags: u32,
    pub ndesc: u32,
}

fn field<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}

impl MonHeader {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(MonitorError::Truncated {
                needed: HEADER_SIZE,
                available: bytes.len(),
            });
        }
        Ok(Self {
            id: u64::from_ne_bytes(field(bytes, 0)),
            kind: bytes[8],
            xfer_type: bytes[9],
            epnum: bytes[10],
            devnum: bytes[11],
            busnum: u16::from_ne_bytes(field(bytes, 12)),
            flag_setup: bytes[14],
            flag_data: bytes[15],
            ts_sec: i64::from_ne_bytes(field(bytes, 16)),
            ts_usec: i32::from_ne_bytes(field(bytes, 24)),
            status: i32::from_ne_bytes(field(bytes, 28)),
            len_urb: u32::from_ne_bytes(field(bytes, 32)),
            len_cap: u32::from_ne_bytes(field(bytes, 36)),
            setup: field(bytes, 40),
            interval: i32::from_ne_bytes(field(bytes, 48)),
            start_frame: i32::from_ne_bytes(field(bytes, 52)),
            xfer_flags: u32::from_ne_bytes(field(bytes, 56)),
            ndesc: u32::from_ne_bytes(field(bytes, 60)),
        })
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..8].copy_from_slice(&self.id.to_ne_bytes());
        out[8] = self.kind;
        out[9] = self.xfer_type;
        out[10] = self.epnum;
        out[11] = self.devnum;
        out[12..14].copy_from_slice(&self.busnum.to_ne_bytes());
        out[14] = self.flag_setup;
        out[15] = self.flag_data;
        out[16..24].copy_from_slice(&self.ts_sec.to_ne_bytes());
        out[24..28].copy_from_slice(&self.ts_usec.to_ne_bytes());
        out[28..32].copy_from_slice(&self.status.to_ne_bytes());
        out[32..36].copy_from_slice(&self.len_urb.to_ne_bytes());
        out[36..40].copy_from_slice(&self.len_cap.to_ne_bytes());
        out[40..48].copy_from_slice(&self.setup);
        out[48..52].copy_from_slice(&self.interval.to_ne_bytes());
        out[52..56].copy_from_slice(&self.start_frame.to_ne_bytes());
        out[56..60].copy_from_slice(&self.xfer_flags.to_ne_bytes());
        out[60..64].copy_from_slice(&self.ndesc.to_ne_bytes());
        out
    }

    pub fn event_type(&self) -> Option<EventType> {
        EventType::from_byte(self.kind)
    }

    pub fn transfer_type(&self) -> Option<XferType> {
        XferType::from_byte(self.xfer_type)
    }

    pub fn is_submission(&self) -> bool {
        self.kind == b'S'
    }

    pub fn is_filler(&self) -> bool {
        self.kind == b'@'
    }

    pub fn is_in(&self) -> bool {
        self.epnum & 0x80 != 0
    }

    pub fn has_setup(&self) -> bool {
        self.flag_setup == 0
    }

    pub fn has_data(&self) -> bool {
        self.flag_data == 0
    }

    pub fn setup_packet(&self) -> Option<SetupPacket> {
        if !self.has_setup() {
            return None;
        }
        SetupPacket::decode(&self.setup).ok()
    }

    pub fn timestamp(&self) -> Micros {
        self.ts_sec * 1_000_000 + self.ts_usec as i64
    }

    /// Same endpoint on the same device
    pub fn same_pipe(&self, other: &MonHeader) -> bool {
        self.xfer_type == other.xfer_type
            && self.epnum == other.epnum
            && self.devnum == other.devnum
            && self.busnum == other.busnum
    }
}

impl core::fmt::Display for MonHeader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:016x} {} {}:{}:{:02x} t={} status={} len={}/{}",
            self.id,
            self.kind as char,
            self.busnum,
            self.devnum,
            self.epnum,
            self.xfer_type,
            self.status,
            self.len_urb,
            self.len_cap
        )
    }
}
