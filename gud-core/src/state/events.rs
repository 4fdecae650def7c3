//! Events that trigger lifecycle transitions

/// Events that can trigger lifecycle transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Transport claimed the vendor interface
    InterfaceClaimed,
    /// Descriptor, formats, properties and connectors were read
    Enumerated,
    /// SET_STATE_COMMIT succeeded
    Committed,
    /// SET_DISPLAY_ENABLE(1) succeeded
    DisplayEnabled,
    /// SET_DISPLAY_ENABLE(0) succeeded
    DisplayDisabled,
    /// Host released the device
    Released,
    /// Transport reported the device gone
    Lost,
}
