//! Hardware abstraction traits
//!
//! These traits define the interface between the driver logic and the USB
//! stack. Implementations live behind feature flags (libusb) or in tests.

mod transport;

pub use transport::Transport;
