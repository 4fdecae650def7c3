//! Submission/completion pairing
//!
//! usbmon reports every URB twice: once when submitted and once when it
//! completes, both tagged with the same id. [`UrbPairer`] joins the two into
//! an [`Urb`] and drops records that cannot be joined.

use std::collections::HashMap;
use std::fmt;

use gud_protocol::SetupPacket;
use log::trace;

use crate::usbmon::{Micros, MonHeader, Record, XferType};

/// A completed USB request block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Urb {
    pub id: u64,
    pub xfer_type: XferType,
    pub epnum: u8,
    pub devnum: u8,
    pub busnum: u16,
    /// Present on every control URB
    pub setup: Option<SetupPacket>,
    pub start: Micros,
    pub end: Micros,
    /// Completion status, negative errno
    pub status: i32,
    /// Bytes actually transferred
    pub len: u32,
    /// Captured payload, OUT data from the submission or IN data from the completion
    pub data: Vec<u8>,
}

impl Urb {
    pub fn is_in(&self) -> bool {
        self.epnum & 0x80 != 0
    }

    pub fn is_control(&self) -> bool {
        self.xfer_type == XferType::Control
    }

    pub fn is_bulk_out(&self) -> bool {
        self.xfer_type == XferType::Bulk && !self.is_in()
    }

    pub fn duration(&self) -> Micros {
        self.end - self.start
    }
}

impl fmt::Display for Urb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "URB {:016x} {:?} {}:{}:{:02x} status={} len={}",
            self.id, self.xfer_type, self.busnum, self.devnum, self.epnum, self.status, self.len
        )?;
        if let Some(setup) = &self.setup {
            write!(
                f,
                " setup={:02x} {:02x} {:04x} {:04x} {}",
                setup.request_type, setup.request, setup.value, setup.index, setup.length
            )?;
        }
        write!(f, " {:.3} ms", self.duration() as f64 / 1000.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Submission whose completion came from a different pipe
    CompletionMismatch,
    /// Completion whose submission came from a different pipe
    SubmissionMismatch,
    MissingSetup,
    UnknownTransferType,
    /// Completion never preceded by its submission
    NoSubmission,
    /// Submission replaced before it completed
    NoCompletion,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DropReason::CompletionMismatch => "did not match the next header",
            DropReason::SubmissionMismatch => "did not match the previous header",
            DropReason::MissingSetup => "missing SETUP data",
            DropReason::UnknownTransferType => "unknown transfer type",
            DropReason::NoSubmission => "no submission",
            DropReason::NoCompletion => "no completion",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dropped {
    pub header: MonHeader,
    pub reason: DropReason,
}

impl fmt::Display for Dropped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dropped {}: {}", self.header, self.reason)
    }
}

#[derive(Debug)]
pub enum Paired {
    /// Record stored until its partner shows up
    Pending,
    /// Filler record
    Skipped,
    Urb(Urb),
    Dropped(Vec<Dropped>),
}

#[derive(Debug, Default)]
pub struct UrbPairer {
    pending: HashMap<u64, MonHeader>,
    data: HashMap<u64, Vec<u8>>,
}

impl UrbPairer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records waiting for a partner
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn push(&mut self, record: Record) -> Paired {
        let Record { header, data } = record;
        if header.is_filler() {
            return Paired::Skipped;
        }

        if header.is_submission() {
            self.data.remove(&header.id);
            if header.has_data() {
                self.data.insert(header.id, data);
            }
            return match self.pending.insert(header.id, header) {
                Some(stale) => Paired::Dropped(vec![Self::stale(stale)]),
                None => Paired::Pending,
            };
        }

        if header.has_data() {
            self.data.insert(header.id, data);
        }

        let Some(submit) = self.pending.remove(&header.id) else {
            trace!("lone completion {}", header);
            self.pending.insert(header.id, header);
            return Paired::Pending;
        };
        if !submit.is_submission() {
            self.pending.insert(header.id, header);
            return Paired::Dropped(vec![Self::stale(submit)]);
        }

        let drop_both = |this: &mut Self, first: DropReason, second: DropReason| {
            this.data.remove(&header.id);
            Paired::Dropped(vec![
                Dropped {
                    header: submit,
                    reason: first,
                },
                Dropped {
                    header,
                    reason: second,
                },
            ])
        };

        if !submit.same_pipe(&header) {
            return drop_both(
                self,
                DropReason::CompletionMismatch,
                DropReason::SubmissionMismatch,
            );
        }
        let Some(xfer_type) = header.transfer_type() else {
            return drop_both(
                self,
                DropReason::UnknownTransferType,
                DropReason::UnknownTransferType,
            );
        };
        let setup = if xfer_type == XferType::Control {
            match submit.setup_packet() {
                Some(setup) => Some(setup),
                None => {
                    return drop_both(self, DropReason::MissingSetup, DropReason::MissingSetup)
                }
            }
        } else {
            None
        };

        Paired::Urb(Urb {
            id: header.id,
            xfer_type,
            epnum: header.epnum,
            devnum: header.devnum,
            busnum: header.busnum,
            setup,
            start: submit.timestamp(),
            end: header.timestamp(),
            status: header.status,
            len: header.len_urb,
            data: self.data.remove(&header.id).unwrap_or_default(),
        })
    }

    fn stale(header: MonHeader) -> Dropped {
        let reason = if header.is_submission() {
            DropReason::NoCompletion
        } else {
            DropReason::NoSubmission
        };
        Dropped { header, reason }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    pub(crate) fn record(id: u64, kind: u8, xfer_type: u8, epnum: u8, ts_us: i64) -> Record {
        Record {
            header: MonHeader {
                id,
                kind,
                xfer_type,
                epnum,
                devnum: 4,
                busnum: 1,
                flag_setup: b'-',
                flag_data: b'<',
                ts_sec: ts_us / 1_000_000,
                ts_usec: (ts_us % 1_000_000) as i32,
                status: 0,
                len_urb: 0,
                len_cap: 0,
                setup: [0; 8],
                interval: 0,
                start_frame: 0,
                xfer_flags: 0,
                ndesc: 0,
            },
            data: Vec::new(),
        }
    }

    fn with_data(mut record: Record, data: &[u8]) -> Record {
        record.header.flag_data = 0;
        record.header.len_cap = data.len() as u32;
        record.header.len_urb = data.len() as u32;
        record.data = data.to_vec();
        record
    }

    fn with_setup(mut record: Record, setup: [u8; 8]) -> Record {
        record.header.flag_setup = 0;
        record.header.setup = setup;
        record
    }

    #[test]
    fn test_bulk_pair() {
        let mut pairer = UrbPairer::new();
        let submit = with_data(record(1, b'S', 3, 0x01, 1_000), &[1, 2, 3]);
        let mut complete = record(1, b'C', 3, 0x01, 1_250);
        complete.header.len_urb = 3;

        assert!(matches!(pairer.push(submit), Paired::Pending));
        let Paired::Urb(urb) = pairer.push(complete) else {
            panic!("expected an URB");
        };
        assert!(urb.is_bulk_out());
        assert_eq!(urb.duration(), 250);
        assert_eq!(urb.len, 3);
        assert_eq!(urb.data, [1, 2, 3]);
        assert_eq!(pairer.pending(), 0);
    }

    #[test]
    fn test_control_in_takes_completion_data() {
        let mut pairer = UrbPairer::new();
        let setup = [0xc1, 0x40, 0, 0, 0, 0, 32, 0];
        pairer.push(with_setup(record(7, b'S', 2, 0x80, 0), setup));
        let Paired::Urb(urb) = pairer.push(with_data(record(7, b'C', 2, 0x80, 90), &[0x40, 0x80]))
        else {
            panic!("expected an URB");
        };
        assert!(urb.is_in());
        assert_eq!(urb.setup.unwrap().request, 0x40);
        assert_eq!(urb.data, [0x40, 0x80]);
    }

    #[test]
    fn test_mismatch_drops_both() {
        let mut pairer = UrbPairer::new();
        pairer.push(record(9, b'S', 3, 0x01, 0));
        let Paired::Dropped(dropped) = pairer.push(record(9, b'C', 3, 0x02, 10)) else {
            panic!("expected a drop");
        };
        assert_eq!(dropped.len(), 2);
        assert_eq!(dropped[0].reason, DropReason::CompletionMismatch);
        assert!(dropped[0].header.is_submission());
        assert_eq!(dropped[1].reason, DropReason::SubmissionMismatch);
        assert_eq!(pairer.pending(), 0);
    }

    #[test]
    fn test_control_without_setup_dropped() {
        let mut pairer = UrbPairer::new();
        pairer.push(record(3, b'S', 2, 0x00, 0));
        let Paired::Dropped(dropped) = pairer.push(record(3, b'C', 2, 0x00, 10)) else {
            panic!("expected a drop");
        };
        assert!(dropped.iter().all(|d| d.reason == DropReason::MissingSetup));
        assert_eq!(dropped[0].to_string().rsplit(": ").next(), Some("missing SETUP data"));
    }

    #[test]
    fn test_lone_completion_never_becomes_urb() {
        let mut pairer = UrbPairer::new();
        assert!(matches!(pairer.push(record(5, b'C', 3, 0x01, 0)), Paired::Pending));
        assert_eq!(pairer.pending(), 1);

        // A second completion for the same id retires the first
        let Paired::Dropped(dropped) = pairer.push(record(5, b'C', 3, 0x01, 5)) else {
            panic!("expected a drop");
        };
        assert_eq!(dropped[0].reason, DropReason::NoSubmission);
        assert_eq!(pairer.pending(), 1);

        // A submission replaces it, and its completion pairs normally
        let Paired::Dropped(dropped) = pairer.push(record(5, b'S', 3, 0x01, 10)) else {
            panic!("expected a drop");
        };
        assert_eq!(dropped[0].reason, DropReason::NoSubmission);
        assert!(matches!(pairer.push(record(5, b'C', 3, 0x01, 20)), Paired::Urb(_)));
    }

    #[test]
    fn test_filler_skipped() {
        let mut pairer = UrbPairer::new();
        assert!(matches!(pairer.push(record(0, b'@', 0, 0, 0)), Paired::Skipped));
        assert_eq!(pairer.pending(), 0);
    }

    #[test]
    fn test_resubmission_reports_lost_completion() {
        let mut pairer = UrbPairer::new();
        pairer.push(record(2, b'S', 3, 0x01, 0));
        let Paired::Dropped(dropped) = pairer.push(record(2, b'S', 3, 0x01, 5)) else {
            panic!("expected a drop");
        };
        assert_eq!(dropped[0].reason, DropReason::NoCompletion);
    }

    proptest! {
        #[test]
        fn prop_different_pipes_never_pair(
            xfer_type in prop_oneof![Just(0u8), Just(1u8), Just(3u8)],
            epnum in any::<u8>(),
            devnum in any::<u8>(),
            busnum in any::<u16>(),
            field in 0usize..4,
            delta in 1u8..=255,
        ) {
            let mut submit = record(5, b'S', xfer_type, epnum, 0);
            submit.header.devnum = devnum;
            submit.header.busnum = busnum;
            let mut complete = submit.clone();
            complete.header.kind = b'C';
            match field {
                0 => complete.header.xfer_type = xfer_type.wrapping_add(delta),
                1 => complete.header.epnum = epnum.wrapping_add(delta),
                2 => complete.header.devnum = devnum.wrapping_add(delta),
                _ => complete.header.busnum = busnum.wrapping_add(delta as u16),
            }

            let mut pairer = UrbPairer::new();
            prop_assert!(matches!(pairer.push(submit.clone()), Paired::Pending));
            let Paired::Dropped(dropped) = pairer.push(complete) else {
                return Err(TestCaseError::fail("records on different pipes paired"));
            };
            let reasons: Vec<_> = dropped.iter().map(|d| d.reason).collect();
            prop_assert_eq!(
                reasons,
                vec![DropReason::CompletionMismatch, DropReason::SubmissionMismatch]
            );
            prop_assert_eq!(pairer.pending(), 0);

            let mut same = submit.clone();
            same.header.kind = b'C';
            pairer.push(submit);
            prop_assert!(matches!(pairer.push(same), Paired::Urb(_)));
        }
    }
}
