//! Device lifecycle state machine

mod events;
mod machine;

pub use events::DeviceEvent;
pub use machine::DeviceState;
