//! Lifecycle state definition
//!
//! Every device operation checks the lifecycle first; requests are only
//! issued in states where they make sense.

use super::events::DeviceEvent;

/// Device lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// No interface claimed
    Disconnected,
    /// Interface claimed, nothing read yet
    Configured,
    /// Capabilities enumerated, no pipeline state committed
    Ready,
    /// State committed and display on
    Enabled,
    /// State committed, display off
    Disabled,
    /// Released by the host; terminal
    TornDown,
}

impl DeviceState {
    /// Check if requests may be sent at all
    pub fn is_live(&self) -> bool {
        !matches!(self, DeviceState::Disconnected | DeviceState::TornDown)
    }

    /// Check if capabilities may be (re)read
    pub fn can_enumerate(&self) -> bool {
        matches!(self, DeviceState::Configured | DeviceState::Ready)
    }

    /// Check if a pipeline state may be checked or committed
    pub fn can_commit(&self) -> bool {
        matches!(
            self,
            DeviceState::Ready | DeviceState::Enabled | DeviceState::Disabled
        )
    }

    /// Check if a committed pipeline state exists
    pub fn has_active_state(&self) -> bool {
        matches!(self, DeviceState::Enabled | DeviceState::Disabled)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: DeviceEvent) -> Self {
        use DeviceEvent::*;
        use DeviceState::*;

        match (self, event) {
            // Nothing leaves TornDown
            (TornDown, _) => TornDown,

            (Disconnected, InterfaceClaimed) => Configured,

            (Configured, Enumerated) => Ready,
            (Ready, Enumerated) => Ready,

            // First commit configures the pipeline with the display still off
            (Ready, Committed) => Disabled,
            (Enabled, Committed) => Enabled,
            (Disabled, Committed) => Disabled,

            (Disabled, DisplayEnabled) => Enabled,
            (Enabled, DisplayDisabled) => Disabled,

            (_, Released) => TornDown,
            (_, Lost) => Disconnected,

            // Default: stay in current state
            _ => self,
        }
    }
}
