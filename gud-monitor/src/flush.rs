//! SET_BUFFER transfer joined with its bulk payload

use std::fmt;

use gud_protocol::SetBuffer;

use crate::transfer::Transfer;
use crate::urb::Urb;

#[derive(Debug, Clone)]
pub struct Flush {
    pub ctrl: Transfer,
    pub header: SetBuffer,
    pub bulk: Urb,
}

impl Flush {
    /// Bulk transfer carried a different byte count than announced
    pub fn is_short(&self) -> bool {
        self.bulk.len != self.header.transfer_length()
    }

    pub fn bulk_ms(&self) -> f64 {
        self.bulk.duration() as f64 / 1000.0
    }

    pub fn total_ms(&self) -> f64 {
        (self.bulk.end - self.ctrl.start()) as f64 / 1000.0
    }
}

impl fmt::Display for Flush {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = &self.header;
        write!(
            f,
            "Flush: {}x{}+{}+{} length={}",
            h.width, h.height, h.x, h.y, h.length
        )?;
        if !h.compression.is_empty() {
            write!(
                f,
                "/{} ({:.1})",
                h.compressed_length,
                h.compression_ratio()
            )?;
        }
        write!(
            f,
            " ({:.3} + {:.3} = {:.3} ms)",
            self.ctrl.duration_ms(),
            self.bulk_ms(),
            self.total_ms()
        )?;
        if self.is_short() {
            write!(f, " bulk {} bytes", self.bulk.len)?;
        }
        Ok(())
    }
}
