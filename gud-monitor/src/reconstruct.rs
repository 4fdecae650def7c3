//! Transaction reconstruction
//!
//! Turns the URB stream of one device into GUD transfers and flushes:
//!
//! ```text
//! control URB ──> Transfer ──(status read)──> done ──> Observation::Transfer
//!                    │
//!                    └─ SET_BUFFER done ──(next bulk OUT)──> Observation::Flush
//! ```
//!
//! URBs that cannot be placed are reported as anomalies and skipped.

use std::fmt;

use gud_protocol::{DisplayDescriptor, Request, SetBuffer, StatusSignaling, Wire};
use log::{debug, info, trace, warn};

use crate::config::MonitorConfig;
use crate::flush::Flush;
use crate::stats::Stats;
use crate::transfer::{is_status_read, Outcome, Transfer};
use crate::urb::{Dropped, Urb};
use crate::usbmon::XferType;

#[derive(Debug, Clone)]
pub enum Anomaly {
    /// Status read with no transfer waiting for it
    DanglingStatus(Urb),
    /// Bulk OUT with no SET_BUFFER before it
    DanglingBulk(Urb),
    /// SET_BUFFER never followed by its bulk transfer
    DanglingSetBuffer(Transfer),
    /// OUT request never followed by its status read
    MissingStatus(Transfer),
    /// Record the pairer could not match
    Dropped {
        record: Dropped,
        /// Kernel drop counter at the time
        kernel_dropped: Option<u32>,
    },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::DanglingStatus(urb) => write!(f, "dangling status read: {}", urb),
            Anomaly::DanglingBulk(urb) => write!(f, "dangling bulk transfer: {}", urb),
            Anomaly::DanglingSetBuffer(t) => write!(f, "dangling SET_BUFFER: {}", t),
            Anomaly::MissingStatus(t) => write!(f, "{}", t),
            Anomaly::Dropped {
                record,
                kernel_dropped,
            } => {
                write!(f, "{}", record)?;
                if let Some(count) = kernel_dropped {
                    write!(f, " (kernel dropped {})", count)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Observation {
    Discovered {
        busnum: u16,
        devnum: u8,
        descriptor: Option<DisplayDescriptor>,
    },
    Transfer(Transfer),
    Flush(Flush),
    Anomaly(Anomaly),
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::Discovered {
                busnum,
                devnum,
                descriptor,
            } => {
                write!(f, "Found GUD device {:03}:{:03}", busnum, devnum)?;
                if let Some(desc) = descriptor {
                    write!(f, ", status {:?}", desc.status_signaling())?;
                }
                Ok(())
            }
            Observation::Transfer(transfer) => write!(f, "{}", transfer),
            Observation::Flush(flush) => write!(f, "{}", flush),
            Observation::Anomaly(anomaly) => write!(f, "{}", anomaly),
        }
    }
}

pub struct Reconstructor {
    busnum: Option<u16>,
    devnum: Option<u8>,
    signaling: StatusSignaling,
    /// OUT or stalled transfer waiting for its status
    pending: Option<Transfer>,
    /// Completed SET_BUFFER waiting for its bulk transfer
    set_buffer: Option<(Transfer, SetBuffer)>,
    stats: Stats,
}

impl Reconstructor {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            busnum: (config.busnum != 0).then_some(config.busnum),
            devnum: config.devnum,
            signaling: StatusSignaling::OnDemand,
            pending: None,
            set_buffer: None,
            stats: Stats::new(config.wait_threshold()),
        }
    }

    /// Status convention to assume until a descriptor is seen
    pub fn with_signaling(mut self, signaling: StatusSignaling) -> Self {
        self.signaling = signaling;
        self
    }

    pub fn devnum(&self) -> Option<u8> {
        self.devnum
    }

    pub fn signaling(&self) -> StatusSignaling {
        self.signaling
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn into_stats(self) -> Stats {
        self.stats
    }

    fn follows(&self, urb: &Urb) -> bool {
        self.devnum == Some(urb.devnum) && self.busnum.map_or(true, |bus| bus == urb.busnum)
    }

    pub fn push(&mut self, urb: Urb) -> Vec<Observation> {
        let mut out = Vec::new();
        self.discover(&urb, &mut out);
        if !self.follows(&urb) {
            return out;
        }
        match urb.xfer_type {
            XferType::Control => self.control(urb, &mut out),
            XferType::Bulk if !urb.is_in() => self.bulk(urb, &mut out),
            _ => trace!("ignoring {}", urb),
        }
        out
    }

    /// Resolve whatever is still open at the end of a capture
    pub fn finish(&mut self) -> Vec<Observation> {
        let mut out = Vec::new();
        self.supersede(&mut out);
        self.drop_set_buffer(&mut out);
        out
    }

    fn discover(&mut self, urb: &Urb, out: &mut Vec<Observation>) {
        let is_descriptor = urb.status == 0
            && urb.len as usize == DisplayDescriptor::SIZE
            && urb
                .setup
                .is_some_and(|s| s.is_in() && s.gud_request() == Some(Request::GetDescriptor));
        if !is_descriptor {
            return;
        }

        let descriptor = DisplayDescriptor::decode(&urb.data).ok();
        if self.devnum.is_none() {
            info!("following device {}:{}", urb.busnum, urb.devnum);
            self.devnum = Some(urb.devnum);
            self.busnum = Some(urb.busnum);
            out.push(Observation::Discovered {
                busnum: urb.busnum,
                devnum: urb.devnum,
                descriptor,
            });
        } else if !self.follows(urb) {
            return;
        }
        if let Some(desc) = descriptor {
            self.signaling = desc.status_signaling();
            debug!("status signaling {:?}", self.signaling);
        }
    }

    fn control(&mut self, urb: Urb, out: &mut Vec<Observation>) {
        if is_status_read(&urb) {
            match self.pending.take() {
                Some(mut transfer) => {
                    transfer.add_status(urb);
                    self.done(transfer, out);
                }
                None => {
                    debug!("dangling status read {}", urb);
                    out.push(Observation::Anomaly(Anomaly::DanglingStatus(urb)));
                }
            }
            return;
        }

        self.supersede(out);
        self.drop_set_buffer(out);
        match Transfer::new(urb) {
            Some(transfer) if transfer.is_done() => self.done(transfer, out),
            Some(transfer) => self.pending = Some(transfer),
            None => {}
        }
    }

    fn bulk(&mut self, urb: Urb, out: &mut Vec<Observation>) {
        self.supersede(out);
        let Some((ctrl, header)) = self.set_buffer.take() else {
            debug!("dangling bulk {}", urb);
            out.push(Observation::Anomaly(Anomaly::DanglingBulk(urb)));
            return;
        };

        let flush = Flush {
            ctrl,
            header,
            bulk: urb,
        };
        if flush.is_short() {
            warn!(
                "bulk carried {} bytes, SET_BUFFER announced {}",
                flush.bulk.len,
                flush.header.transfer_length()
            );
        }
        if flush.bulk.status == 0 {
            self.stats.add(&flush);
        }
        out.push(Observation::Flush(flush));
    }

    fn supersede(&mut self, out: &mut Vec<Observation>) {
        if let Some(mut transfer) = self.pending.take() {
            transfer.supersede(self.signaling);
            self.done(transfer, out);
        }
    }

    fn drop_set_buffer(&mut self, out: &mut Vec<Observation>) {
        if let Some((ctrl, _)) = self.set_buffer.take() {
            debug!("SET_BUFFER without bulk transfer");
            out.push(Observation::Anomaly(Anomaly::DanglingSetBuffer(ctrl)));
        }
    }

    fn done(&mut self, transfer: Transfer, out: &mut Vec<Observation>) {
        if transfer.outcome == Outcome::MissingStatus {
            out.push(Observation::Anomaly(Anomaly::MissingStatus(transfer)));
            return;
        }
        if transfer.is_ok() && transfer.request() == Some(Request::SetBuffer) {
            if let Ok(header) = SetBuffer::decode(&transfer.urb.data) {
                self.drop_set_buffer(out);
                self.set_buffer = Some((transfer, header));
                return;
            }
        }
        out.push(Observation::Transfer(transfer));
    }
}
