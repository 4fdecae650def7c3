//! Control transfers rebuilt from URBs
//!
//! A transfer starts from its control URB. IN requests usually resolve
//! right away; OUT requests wait for the GET_STATUS read that follows them,
//! or for the next transfer to supersede them.

use std::fmt;

use gud_protocol::{Request, SetupPacket, Status, StatusSignaling};

use crate::decode::{Hex, Payload};
use crate::urb::Urb;
use crate::usbmon::Micros;

/// Completion status of a stalled endpoint
pub const EPIPE: i32 = -libc::EPIPE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    InProgress,
    Ok,
    /// Non-OK status byte read from the device
    Status(u8),
    /// URB error with no status explaining it
    Failed(i32),
    /// No status read followed on a device that reports after every SET
    MissingStatus,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Outcome::InProgress => f.write_str("in progress"),
            Outcome::Ok => f.write_str("OK"),
            Outcome::Status(code) => write!(f, "{} ({})", Status::from_byte(code), code),
            Outcome::Failed(EPIPE) => f.write_str("stalled"),
            Outcome::Failed(status) => write!(f, "URB error {}", status),
            Outcome::MissingStatus => f.write_str("missing status"),
        }
    }
}

/// Status read issued after a stall or a SET request
pub fn is_status_read(urb: &Urb) -> bool {
    urb.setup
        .is_some_and(|setup| setup.is_in() && setup.gud_request() == Some(Request::GetStatus))
}

#[derive(Debug, Clone)]
pub struct Transfer {
    pub urb: Urb,
    pub setup: SetupPacket,
    pub outcome: Outcome,
    pub status_urb: Option<Urb>,
}

impl Transfer {
    /// None when the URB carries no setup packet
    pub fn new(urb: Urb) -> Option<Self> {
        let setup = urb.setup?;
        let outcome = match urb.status {
            EPIPE => Outcome::InProgress,
            0 if setup.is_in() => Outcome::Ok,
            0 => Outcome::InProgress,
            status => Outcome::Failed(status),
        };
        Some(Self {
            urb,
            setup,
            outcome,
            status_urb: None,
        })
    }

    pub fn request(&self) -> Option<Request> {
        self.setup.gud_request()
    }

    pub fn is_in(&self) -> bool {
        self.setup.is_in()
    }

    pub fn is_done(&self) -> bool {
        self.outcome != Outcome::InProgress
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == Outcome::Ok
    }

    /// Resolve from the status read that followed
    pub fn add_status(&mut self, status: Urb) {
        self.outcome = match (status.status, status.data.first()) {
            (0, Some(&code)) if code != 0 => Outcome::Status(code),
            (0, _) if self.urb.status == 0 => Outcome::Ok,
            (0, _) => Outcome::Failed(self.urb.status),
            (err, _) => Outcome::Failed(err),
        };
        self.status_urb = Some(status);
    }

    /// Resolve a transfer that never got its status read
    pub fn supersede(&mut self, signaling: StatusSignaling) {
        if self.is_done() {
            return;
        }
        self.outcome = match (self.urb.status, signaling) {
            (0, StatusSignaling::OnDemand) if !self.is_in() => Outcome::Ok,
            (0, StatusSignaling::OnEverySet) if !self.is_in() => Outcome::MissingStatus,
            (status, _) => Outcome::Failed(status),
        };
    }

    pub fn start(&self) -> Micros {
        self.urb.start
    }

    /// End of the status read when there was one
    pub fn end(&self) -> Micros {
        self.status_urb.as_ref().map_or(self.urb.end, |s| s.end)
    }

    pub fn duration_ms(&self) -> f64 {
        (self.end() - self.start()) as f64 / 1000.0
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let request = self.request();
        match request {
            Some(request) => write!(f, "{}", request)?,
            None => write!(f, "request {:#04x}", self.setup.request)?,
        }
        if (0x51..=0x56).contains(&self.setup.request) {
            write!(f, "[{}]", self.setup.value)?;
        }
        f.write_str(": ")?;
        if self.is_ok() {
            match request {
                Some(request) => write!(f, "{}", Payload::new(request, &self.urb.data))?,
                None => write!(f, "{}", Hex(&self.urb.data))?,
            }
        } else {
            write!(f, "{}", self.outcome)?;
        }
        write!(f, " ({:.3} ms)", self.duration_ms())
    }
}
