//! Connector cache
//!
//! Descriptors are read once at enumeration. Modes, EDID, properties and TV
//! mode names are filled lazily. Modes and EDID are dropped again whenever a
//! status read reports a change.

use gud_protocol::{ConnectorDescriptor, ConnectorStatus, ConnectorType, DisplayMode, TvModeName};

use super::property::PropertySet;

/// One physical output of the device
#[derive(Debug, Clone)]
pub struct Connector {
    index: usize,
    descriptor: ConnectorDescriptor,
    /// Last status read, None before the first read
    status: Option<ConnectorStatus>,
    pub(crate) modes: Option<Vec<DisplayMode>>,
    /// Empty when the device has no (valid) EDID
    pub(crate) edid: Option<Vec<u8>>,
    pub(crate) properties: Option<PropertySet>,
    pub(crate) tv_modes: Option<Vec<TvModeName>>,
}

impl Connector {
    pub fn new(index: usize, descriptor: ConnectorDescriptor) -> Self {
        Self {
            index,
            descriptor,
            status: None,
            modes: None,
            edid: None,
            properties: None,
            tv_modes: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn connector_type(&self) -> ConnectorType {
        self.descriptor.connector_type
    }

    pub fn descriptor(&self) -> &ConnectorDescriptor {
        &self.descriptor
    }

    pub fn status(&self) -> Option<ConnectorStatus> {
        self.status
    }

    pub fn connected(&self) -> bool {
        self.status.is_some_and(|s| s.connected())
    }

    /// Cached modes, if fetched
    pub fn modes(&self) -> Option<&[DisplayMode]> {
        self.modes.as_deref()
    }

    /// Cached EDID, None when not fetched or absent
    pub fn edid(&self) -> Option<&[u8]> {
        self.edid.as_deref().filter(|edid| !edid.is_empty())
    }

    /// Cached properties, if fetched
    pub fn properties(&self) -> Option<&PropertySet> {
        self.properties.as_ref()
    }

    /// A changed bit or a different link state means the caches are stale
    pub fn needs_refresh(&self, status: ConnectorStatus) -> bool {
        status.changed || self.status.map(|s| s.link) != Some(status.link)
    }

    /// Record a status read, dropping stale caches.
    ///
    /// Returns true if modes and EDID must be refetched.
    pub(crate) fn record_status(&mut self, status: ConnectorStatus) -> bool {
        let refresh = self.needs_refresh(status);
        self.status = Some(status);
        if refresh {
            self.modes = None;
            self.edid = None;
        }
        refresh
    }

    /// Preferred mode, falling back to the first one
    pub fn preferred_mode(&self) -> Option<&DisplayMode> {
        let modes = self.modes.as_ref()?;
        modes.iter().find(|m| m.preferred()).or_else(|| modes.first())
    }
}

impl std::fmt::Display for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.connector_type().name(), self.index)?;
        if let Some(status) = self.status {
            write!(f, " {}", status)?;
        }
        if let Some(modes) = &self.modes {
            write!(f, " {} modes", modes.len())?;
        }
        Ok(())
    }
}
