//! USB transport abstraction
//!
//! Provides the three transfer kinds a GUD device needs. Implementations
//! address the vendor interface themselves; the driver only supplies the
//! request code, `wValue` and the data stage.

use gud_protocol::Request;

use crate::error::TransportError;

/// Blocking USB transport to one claimed GUD interface
pub trait Transport {
    /// Vendor control IN request
    ///
    /// Returns the number of bytes the device actually sent, which may be
    /// less than `buf.len()`. A protocol stall is `TransportError::Stall`.
    fn control_in(
        &mut self,
        request: Request,
        value: u16,
        buf: &mut [u8],
    ) -> Result<usize, TransportError>;

    /// Vendor control OUT request
    ///
    /// Returns the number of bytes accepted.
    fn control_out(
        &mut self,
        request: Request,
        value: u16,
        data: &[u8],
    ) -> Result<usize, TransportError>;

    /// Bulk OUT transfer of framebuffer data
    fn bulk_out(&mut self, data: &[u8]) -> Result<usize, TransportError>;
}
