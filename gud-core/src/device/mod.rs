//! GUD device driver
//!
//! `Device` owns a transport and walks the device through its lifecycle:
//! enumeration fills the descriptor, format, property and connector caches,
//! `check`/`commit` configure the pipeline, and `flush` pushes framebuffer
//! damage over SET_BUFFER + bulk.
//!
//! Every control request goes through one completion path. A stall, or any
//! OUT request on a device that reports status on every set, is followed by
//! GET_STATUS and a non-OK code becomes a typed error.

mod connector;
mod flush;
mod pipeline;
mod property;

pub use connector::Connector;
pub use flush::FlushReport;
pub use pipeline::DisplayState;
pub use property::{Property, PropertySet};

use gud_display::{CodecError, Image, Rect};
use gud_protocol::request::{
    CONNECTORS_MAX_NUM, CONNECTOR_MAX_EDID_LEN, CONNECTOR_MAX_NUM_MODES,
    CONNECTOR_PROPERTIES_MAX_NUM, EDID_BLOCK_LEN, FORMATS_MAX_NUM, PROPERTIES_MAX_NUM,
    TV_MODE_MAX_NUM, TV_MODE_NAME_LEN,
};
use gud_protocol::{
    decode_array, decode_tv_mode_names, ConnectorDescriptor, ConnectorStatus, DisplayDescriptor,
    DisplayMode, PixelFormat, PropertyId, PropertyReq, Request, SetBuffer, StateReq, Status,
    TvModeName, Wire,
};
use log::{debug, info, trace, warn};

use crate::config::DriverConfig;
use crate::error::{Error, Result, TransportError};
use crate::state::{DeviceEvent, DeviceState};
use crate::traits::Transport;

use flush::{max_lines, Chunk};

/// One GUD display behind a claimed interface
pub struct Device<T: Transport> {
    transport: T,
    config: DriverConfig,
    lifecycle: DeviceState,
    descriptor: Option<DisplayDescriptor>,
    formats: Option<Vec<PixelFormat>>,
    properties: Option<PropertySet>,
    connectors: Option<Vec<Connector>>,
    /// Last successfully checked state, consumed by commit
    checked: Option<StateReq>,
    active: Option<DisplayState>,
    /// Send SET_BUFFER before the next bulk even on full-update devices
    resync: bool,
}

impl<T: Transport> Device<T> {
    /// Wrap a transport whose interface is already claimed
    pub fn new(transport: T, config: DriverConfig) -> Self {
        let mut device = Self {
            transport,
            config,
            lifecycle: DeviceState::Disconnected,
            descriptor: None,
            formats: None,
            properties: None,
            connectors: None,
            checked: None,
            active: None,
            resync: false,
        };
        device.apply_event(DeviceEvent::InterfaceClaimed);
        device
    }

    /// Enumerate and enable the controller
    pub fn open(transport: T, config: DriverConfig) -> Result<Self> {
        let mut device = Self::new(transport, config);
        device.enumerate()?;
        device.controller_enable(true)?;
        Ok(device)
    }

    pub fn lifecycle(&self) -> DeviceState {
        self.lifecycle
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn descriptor(&self) -> Option<&DisplayDescriptor> {
        self.descriptor.as_ref()
    }

    /// Formats advertised by the device, unknown codes removed
    pub fn formats(&self) -> Option<&[PixelFormat]> {
        self.formats.as_deref()
    }

    pub fn properties(&self) -> Option<&PropertySet> {
        self.properties.as_ref()
    }

    pub fn connectors(&self) -> Option<&[Connector]> {
        self.connectors.as_deref()
    }

    pub fn connector(&self, index: usize) -> Option<&Connector> {
        self.connectors.as_ref()?.get(index)
    }

    /// Committed pipeline state
    pub fn active_state(&self) -> Option<&DisplayState> {
        self.active.as_ref()
    }

    /// Effective SET_BUFFER limit
    pub fn max_buffer_size(&self) -> usize {
        let device_max = self.descriptor.map_or(0, |d| d.max_buffer_size);
        self.config.max_buffer_size(device_max)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn apply_event(&mut self, event: DeviceEvent) {
        let next = self.lifecycle.transition(event);
        if next != self.lifecycle {
            info!("lifecycle {:?} -> {:?} on {:?}", self.lifecycle, next, event);
        }
        self.lifecycle = next;
    }

    fn require(&self, allowed: bool) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(Error::InvalidLifecycle(self.lifecycle))
        }
    }

    fn transport_error(&mut self, request: Request, source: TransportError) -> Error {
        if source == TransportError::Disconnected {
            self.apply_event(DeviceEvent::Lost);
        }
        Error::Transport { request, source }
    }

    // Transfers

    fn get(&mut self, request: Request, index: usize, buf: &mut [u8]) -> Result<usize> {
        self.require(self.lifecycle.is_live())?;
        let value = w_value(index)?;
        let outcome = self.transport.control_in(request, value, buf);
        trace!("{} [{}] -> {:?}", request, value, outcome);
        self.complete(request, outcome, false)
    }

    fn set(&mut self, request: Request, index: usize, data: &[u8]) -> Result<()> {
        self.require(self.lifecycle.is_live())?;
        let value = w_value(index)?;
        let outcome = self.transport.control_out(request, value, data);
        trace!("{} [{}] {} bytes -> {:?}", request, value, data.len(), outcome);
        let len = self.complete(request, outcome, true)?;
        if len != data.len() {
            return Err(Error::ShortTransfer {
                request,
                expected: data.len(),
                actual: len,
            });
        }
        Ok(())
    }

    fn complete(
        &mut self,
        request: Request,
        outcome: core::result::Result<usize, TransportError>,
        is_set: bool,
    ) -> Result<usize> {
        match outcome {
            Ok(len) => {
                let on_every_set = self
                    .descriptor
                    .is_some_and(|d| d.status_reported_on_every_set());
                if is_set && on_every_set {
                    let code = self.read_status()?;
                    if let Some(err) = Error::from_status(request, code) {
                        return Err(err);
                    }
                }
                Ok(len)
            }
            Err(TransportError::Stall) => {
                let code = self.read_status()?;
                debug!("{} stalled, status {}", request, Status::from_byte(code));
                Err(Error::from_status(request, code)
                    .unwrap_or(Error::StallWithoutStatus { request }))
            }
            Err(source) => Err(self.transport_error(request, source)),
        }
    }

    fn read_status(&mut self) -> Result<u8> {
        let request = Request::GetStatus;
        let mut buf = [0u8; 1];
        let len = self
            .transport
            .control_in(request, 0, &mut buf)
            .map_err(|source| self.transport_error(request, source))?;
        if len != 1 {
            return Err(Error::ShortTransfer {
                request,
                expected: 1,
                actual: len,
            });
        }
        Ok(buf[0])
    }

    /// Read the status of the last request
    pub fn status(&mut self) -> Result<Status> {
        self.require(self.lifecycle.is_live())?;
        self.read_status().map(Status::from_byte)
    }

    fn get_array<W: Wire, const N: usize>(
        &mut self,
        request: Request,
        index: usize,
    ) -> Result<Vec<W>> {
        let mut buf = vec![0u8; N * W::SIZE];
        let len = self.get(request, index, &mut buf)?;
        let items = decode_array::<W, N>(&buf[..len])
            .map_err(|source| Error::Reply { request, source })?;
        Ok(items.into_iter().collect())
    }

    // Enumeration

    /// Read and validate the display descriptor
    pub fn fetch_descriptor(&mut self) -> Result<DisplayDescriptor> {
        let request = Request::GetDescriptor;
        let mut buf = [0u8; DisplayDescriptor::SIZE];
        let len = self.get(request, 0, &mut buf)?;
        if len < DisplayDescriptor::SIZE {
            return Err(Error::ShortDescriptor(len));
        }
        let descriptor =
            DisplayDescriptor::decode(&buf).map_err(|source| Error::Reply { request, source })?;
        descriptor.validate()?;

        debug!(
            "descriptor v{} flags {:?} compression {:?} max buffer {} size {}x{}..{}x{}",
            descriptor.version,
            descriptor.flags,
            descriptor.compression,
            descriptor.max_buffer_size,
            descriptor.min_width,
            descriptor.min_height,
            descriptor.max_width,
            descriptor.max_height,
        );
        self.descriptor = Some(descriptor);
        Ok(descriptor)
    }

    /// Read all device capabilities and connector states
    pub fn enumerate(&mut self) -> Result<()> {
        self.require(self.lifecycle.can_enumerate())?;

        let descriptor = self.fetch_descriptor()?;
        info!(
            "GUD display, status {:?}, {}",
            descriptor.status_signaling(),
            if descriptor.full_update() {
                "full updates only"
            } else {
                "partial updates"
            }
        );

        let mut raw = [0u8; FORMATS_MAX_NUM];
        let len = self.get(Request::GetFormats, 0, &mut raw)?;
        let mut formats = Vec::with_capacity(len);
        for &code in &raw[..len] {
            match PixelFormat::from_byte(code) {
                Some(format) => formats.push(format),
                None => warn!("skipping unknown pixel format {:#04x}", code),
            }
        }
        if formats.is_empty() {
            return Err(Error::NoFormats);
        }
        debug!("formats {:?}", formats);
        self.formats = Some(formats);

        let props = self.get_array::<PropertyReq, PROPERTIES_MAX_NUM>(Request::GetProperties, 0)?;
        debug!("{} device properties", props.len());
        self.properties = Some(PropertySet::from_wire(&props));

        let count = self.enumerate_connectors()?;
        for index in 0..count {
            self.update_connector(index)?;
        }

        self.apply_event(DeviceEvent::Enumerated);
        Ok(())
    }

    /// Read the connector array, dropping every connector cache
    pub fn enumerate_connectors(&mut self) -> Result<usize> {
        let descriptors = self
            .get_array::<ConnectorDescriptor, CONNECTORS_MAX_NUM>(Request::GetConnectors, 0)?;
        let connectors: Vec<Connector> = descriptors
            .into_iter()
            .enumerate()
            .map(|(index, descriptor)| Connector::new(index, descriptor))
            .collect();
        for connector in &connectors {
            debug!("connector {} flags {:?}", connector, connector.descriptor().flags);
        }
        let count = connectors.len();
        self.connectors = Some(connectors);
        Ok(count)
    }

    fn cached(&self, index: usize) -> Result<&Connector> {
        self.connectors
            .as_ref()
            .ok_or(Error::InvalidLifecycle(self.lifecycle))?
            .get(index)
            .ok_or(Error::NoSuchConnector(index))
    }

    fn cached_mut(&mut self, index: usize) -> Result<&mut Connector> {
        let lifecycle = self.lifecycle;
        self.connectors
            .as_mut()
            .ok_or(Error::InvalidLifecycle(lifecycle))?
            .get_mut(index)
            .ok_or(Error::NoSuchConnector(index))
    }

    /// Poll a connector, refetching modes and EDID when it changed
    pub fn update_connector(&mut self, index: usize) -> Result<ConnectorStatus> {
        self.cached(index)?;

        let request = Request::GetConnectorStatus;
        let mut buf = [0u8; 1];
        let len = self.get(request, index, &mut buf)?;
        if len != 1 {
            return Err(Error::ShortTransfer {
                request,
                expected: 1,
                actual: len,
            });
        }
        let status = ConnectorStatus::from_byte(buf[0]);

        if self.cached_mut(index)?.record_status(status) {
            debug!("connector {}: {}, refreshing", index, status);
            if status.connected() {
                let modes = self.fetch_modes(index)?;
                let edid = self.fetch_edid(index)?;
                let connector = self.cached_mut(index)?;
                connector.modes = Some(modes);
                connector.edid = Some(edid);
            }
        }
        Ok(status)
    }

    /// Ask the device to probe the connector, then poll it
    pub fn force_detect(&mut self, index: usize) -> Result<ConnectorStatus> {
        self.cached(index)?;
        self.set(Request::SetConnectorForceDetect, index, &[])?;
        self.update_connector(index)
    }

    fn fetch_modes(&mut self, index: usize) -> Result<Vec<DisplayMode>> {
        let modes = self
            .get_array::<DisplayMode, CONNECTOR_MAX_NUM_MODES>(Request::GetConnectorModes, index)?;
        debug!("connector {}: {} modes", index, modes.len());
        Ok(modes)
    }

    fn fetch_edid(&mut self, index: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; CONNECTOR_MAX_EDID_LEN];
        let len = self.get(Request::GetConnectorEdid, index, &mut buf)?;
        if len % EDID_BLOCK_LEN != 0 {
            warn!("connector {}: ignoring EDID of {} bytes", index, len);
            return Ok(Vec::new());
        }
        buf.truncate(len);
        Ok(buf)
    }

    /// Connector modes, fetched on first use
    pub fn connector_modes(&mut self, index: usize) -> Result<&[DisplayMode]> {
        if self.cached(index)?.modes.is_none() {
            let modes = self.fetch_modes(index)?;
            self.cached_mut(index)?.modes = Some(modes);
        }
        Ok(self.cached(index)?.modes.as_deref().unwrap_or_default())
    }

    /// Connector EDID, fetched on first use; None when absent or malformed
    pub fn connector_edid(&mut self, index: usize) -> Result<Option<&[u8]>> {
        if self.cached(index)?.edid.is_none() {
            let edid = self.fetch_edid(index)?;
            self.cached_mut(index)?.edid = Some(edid);
        }
        Ok(self.cached(index)?.edid())
    }

    /// Connector properties, fetched on first use
    pub fn connector_properties(&mut self, index: usize) -> Result<&PropertySet> {
        if self.cached(index)?.properties.is_none() {
            let props = self.get_array::<PropertyReq, CONNECTOR_PROPERTIES_MAX_NUM>(
                Request::GetConnectorProperties,
                index,
            )?;
            self.cached_mut(index)?.properties = Some(PropertySet::from_wire(&props));
        }
        let connector = self.cached(index)?;
        Ok(connector.properties.as_ref().unwrap_or(&EMPTY_PROPERTIES))
    }

    /// Names behind the connector's TV mode property values
    pub fn tv_mode_values(&mut self, index: usize) -> Result<&[TvModeName]> {
        if !self.connector_properties(index)?.contains(PropertyId::TvMode) {
            return Err(Error::UnknownProperty(PropertyId::TvMode.to_u16()));
        }
        if self.cached(index)?.tv_modes.is_none() {
            let request = Request::GetConnectorTvModeValues;
            let mut buf = vec![0u8; TV_MODE_MAX_NUM * TV_MODE_NAME_LEN];
            let len = self.get(request, index, &mut buf)?;
            let names = decode_tv_mode_names(&buf[..len])
                .map_err(|source| Error::Reply { request, source })?;
            self.cached_mut(index)?.tv_modes = Some(names.into_iter().collect());
        }
        Ok(self.cached(index)?.tv_modes.as_deref().unwrap_or_default())
    }

    // Properties

    /// Change a device property for the next check
    pub fn set_property(&mut self, id: PropertyId, value: u64) -> Result<()> {
        let lifecycle = self.lifecycle;
        self.properties
            .as_mut()
            .ok_or(Error::InvalidLifecycle(lifecycle))?
            .set(id, value)
    }

    /// Change a connector property for the next check
    pub fn set_connector_property(&mut self, index: usize, id: PropertyId, value: u64) -> Result<()> {
        self.connector_properties(index)?;
        match self.cached_mut(index)?.properties.as_mut() {
            Some(props) => props.set(id, value),
            None => Err(Error::UnknownProperty(id.to_u16())),
        }
    }

    // Pipeline state

    fn build_state(&mut self, state: &DisplayState) -> Result<StateReq> {
        let request = Request::SetStateCheck;
        let advertised = self
            .formats
            .as_ref()
            .is_some_and(|formats| formats.contains(&state.format));
        if !advertised {
            return Err(Error::UnsupportedFormat(state.format));
        }

        let index = state.connector;
        let wire_index = u8::try_from(index).map_err(|_| Error::NoSuchConnector(index))?;
        if !self.connector_modes(index)?.contains(&state.mode) {
            return Err(Error::UnknownMode(state.mode.to_string(), index));
        }

        let mut props: Vec<PropertyReq> = self
            .properties
            .as_ref()
            .map(|set| set.to_wire().collect())
            .unwrap_or_default();
        props.extend(self.connector_properties(index)?.to_wire());

        let mut req = StateReq::new(state.mode, state.format, wire_index);
        for prop in props {
            req.push_property(prop)
                .map_err(|source| Error::Encode { request, source })?;
        }
        Ok(req)
    }

    /// Ask the device to validate `state` without applying it
    pub fn check(&mut self, state: &DisplayState) -> Result<()> {
        self.require(self.lifecycle.can_commit())?;
        self.checked = None;

        let request = Request::SetStateCheck;
        let req = self.build_state(state)?;
        let payload = req
            .encode_to_vec()
            .map_err(|source| Error::Encode { request, source })?;
        self.set(request, 0, &payload)?;

        debug!("checked {} with {} properties", state, req.properties.len());
        self.checked = Some(req);
        Ok(())
    }

    /// Apply the state passed to the last successful `check`
    pub fn commit(&mut self, state: &DisplayState) -> Result<()> {
        self.require(self.lifecycle.can_commit())?;
        let req = self.build_state(state)?;
        if self.checked.take().as_ref() != Some(&req) {
            return Err(Error::NotChecked);
        }
        self.set(Request::SetStateCommit, 0, &[])?;

        info!("committed {}", state);
        self.active = Some(*state);
        self.apply_event(DeviceEvent::Committed);
        Ok(())
    }

    /// Check and commit, turning the display on the first time
    pub fn apply(&mut self, state: &DisplayState) -> Result<()> {
        let first = self.lifecycle == DeviceState::Ready;
        self.check(state)?;
        self.commit(state)?;
        if first {
            self.display_enable(true)?;
        }
        Ok(())
    }

    /// Preferred mode of a connector in the first advertised format
    pub fn preferred_state(&mut self, index: usize) -> Result<DisplayState> {
        let format = self
            .formats
            .as_ref()
            .and_then(|formats| formats.first().copied())
            .ok_or(Error::NoFormats)?;
        let modes = self.connector_modes(index)?;
        let mode = modes
            .iter()
            .find(|m| m.preferred())
            .or_else(|| modes.first())
            .copied()
            .ok_or(Error::NoModes(index))?;
        Ok(DisplayState::new(mode, format, index))
    }

    pub fn controller_enable(&mut self, enable: bool) -> Result<()> {
        self.set(Request::SetControllerEnable, 0, &[enable as u8])
    }

    pub fn display_enable(&mut self, enable: bool) -> Result<()> {
        self.require(self.lifecycle.has_active_state())?;
        self.set(Request::SetDisplayEnable, 0, &[enable as u8])?;
        self.apply_event(if enable {
            DeviceEvent::DisplayEnabled
        } else {
            DeviceEvent::DisplayDisabled
        });
        Ok(())
    }

    // Flushing

    /// Send `rect` of `image` to the device.
    ///
    /// The image must match the committed mode. Full-update devices always
    /// receive the whole frame.
    pub fn flush(&mut self, image: &Image, rect: Rect) -> Result<FlushReport> {
        self.require(self.lifecycle.has_active_state())?;
        let Some(state) = self.active else {
            return Err(Error::InvalidLifecycle(self.lifecycle));
        };

        let expected = (state.width(), state.height());
        let actual = (image.width(), image.height());
        if expected != actual {
            return Err(Error::ImageSize { expected, actual });
        }

        let full = self.descriptor.is_some_and(|d| d.full_update());
        let rect = if full { image.bounds() } else { rect };
        if rect.is_empty() {
            return Ok(FlushReport {
                rect,
                ..FlushReport::default()
            });
        }
        if !image.bounds().contains(&rect) {
            return Err(CodecError::OutOfBounds {
                rect,
                width: image.width(),
                height: image.height(),
            }
            .into());
        }

        let format = state.format;
        let rect = rect.align_to(format, image.width());
        let pitch = format.pitch(rect.width);
        let max_buffer = self.max_buffer_size();
        let lines = max_lines(max_buffer, pitch);
        if lines == 0 {
            return Err(Error::BufferTooSmall { pitch, max_buffer });
        }

        let lz4 = self.config.compression
            && self.descriptor.is_some_and(|d| d.supports_lz4())
            && !full;

        let mut report = FlushReport {
            rect,
            ..FlushReport::default()
        };
        for band in rect.bands(lines) {
            let encoded = gud_display::encode(image, band, format)?;
            let raw_bytes = encoded.data.len();
            let chunk = Chunk::new(encoded.rect, encoded.data, lz4);
            self.send_chunk(&chunk, full)?;

            report.chunks += 1;
            report.raw_bytes += raw_bytes;
            report.sent_bytes += chunk.payload.len();
        }

        trace!(
            "flushed {} in {} chunks, {} -> {} bytes",
            rect,
            report.chunks,
            report.raw_bytes,
            report.sent_bytes
        );
        Ok(report)
    }

    fn send_chunk(&mut self, chunk: &Chunk, full: bool) -> Result<()> {
        let request = Request::SetBuffer;
        if !full || self.resync {
            let mut header = [0u8; SetBuffer::SIZE];
            chunk
                .header
                .encode(&mut header)
                .map_err(|source| Error::Encode { request, source })?;
            self.set(request, 0, &header)?;
        }

        match self.transport.bulk_out(&chunk.payload) {
            Ok(len) if len == chunk.payload.len() => {
                self.resync = false;
                Ok(())
            }
            Ok(len) => {
                warn!("short bulk transfer, {} of {} bytes", len, chunk.payload.len());
                self.resync = true;
                Err(Error::ShortTransfer {
                    request,
                    expected: chunk.payload.len(),
                    actual: len,
                })
            }
            Err(source) => {
                warn!("bulk transfer failed: {}", source);
                self.resync = true;
                if source == TransportError::Disconnected {
                    self.apply_event(DeviceEvent::Lost);
                }
                Err(Error::Bulk(source))
            }
        }
    }

    /// Flush and clear the image's damage; the damage is kept on failure
    pub fn flush_damage(&mut self, image: &mut Image) -> Result<Option<FlushReport>> {
        let Some(rect) = image.take_damage() else {
            return Ok(None);
        };
        match self.flush(image, rect) {
            Ok(report) => Ok(Some(report)),
            Err(err) => {
                image.mark_damaged(rect);
                Err(err)
            }
        }
    }

    /// Turn the display and controller off and release the device.
    ///
    /// The device is torn down even if the device rejects the requests; the
    /// first error is returned.
    pub fn close(&mut self) -> Result<()> {
        if self.lifecycle == DeviceState::TornDown {
            return Ok(());
        }

        let mut result = Ok(());
        if self.lifecycle == DeviceState::Enabled {
            result = self.display_enable(false);
        }
        if self.lifecycle.is_live() {
            let controller = self.controller_enable(false);
            if result.is_ok() {
                result = controller;
            }
        }

        self.checked = None;
        self.active = None;
        self.apply_event(DeviceEvent::Released);
        result
    }
}

static EMPTY_PROPERTIES: PropertySet = PropertySet::new();

fn w_value(index: usize) -> Result<u16> {
    u16::try_from(index).map_err(|_| Error::NoSuchConnector(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{preferred_mode, MockDevice};
    use gud_display::Color;
    use gud_protocol::{Compression, DisplayFlags, Rotation};

    fn device(mock: MockDevice) -> Device<MockDevice> {
        let mut device = Device::new(mock, DriverConfig::default());
        device.enumerate().unwrap();
        device
    }

    fn rgb565() -> DisplayState {
        DisplayState::new(preferred_mode(), PixelFormat::Rgb565, 0)
    }

    fn enabled(mock: MockDevice) -> Device<MockDevice> {
        let mut device = device(mock);
        device.apply(&rgb565()).unwrap();
        device.transport_mut().clear_log();
        device
    }

    #[test]
    fn test_enumerate() {
        let device = device(MockDevice::new());
        assert_eq!(device.lifecycle(), DeviceState::Ready);
        assert_eq!(
            device.formats().unwrap(),
            &[PixelFormat::Rgb565, PixelFormat::Xrgb8888]
        );
        assert_eq!(device.properties().unwrap().len(), 2);

        let connector = device.connector(0).unwrap();
        assert!(connector.connected());
        assert_eq!(connector.modes().unwrap().len(), 2);
        assert_eq!(connector.edid().unwrap().len(), 128);
        assert_eq!(
            device.transport().sequence(),
            vec![
                Request::GetDescriptor,
                Request::GetFormats,
                Request::GetProperties,
                Request::GetConnectors,
                Request::GetConnectorStatus,
                Request::GetConnectorModes,
                Request::GetConnectorEdid,
            ]
        );
    }

    #[test]
    fn test_unknown_format_skipped() {
        let mut mock = MockDevice::new();
        mock.formats = vec![0x99, PixelFormat::R1.to_byte()];
        let device = device(mock);
        assert_eq!(device.formats().unwrap(), &[PixelFormat::R1]);
    }

    #[test]
    fn test_no_known_formats() {
        let mut mock = MockDevice::new();
        mock.formats = vec![0x99];
        let mut device = Device::new(mock, DriverConfig::default());
        assert!(matches!(device.enumerate(), Err(Error::NoFormats)));
        assert_eq!(device.lifecycle(), DeviceState::Configured);
    }

    #[test]
    fn test_invalid_descriptor() {
        let mut mock = MockDevice::new();
        mock.descriptor.min_width = 400;
        let mut device = Device::new(mock, DriverConfig::default());
        assert!(matches!(device.enumerate(), Err(Error::NoDevice(_))));

        let mut mock = MockDevice::new();
        mock.descriptor.magic = 0;
        let mut device = Device::new(mock, DriverConfig::default());
        assert!(matches!(device.fetch_descriptor(), Err(Error::NoDevice(_))));
    }

    #[test]
    fn test_on_demand_status_only_after_stall() {
        let mut device = device(MockDevice::new());
        device.transport_mut().clear_log();
        device.controller_enable(true).unwrap();
        assert_eq!(device.transport().count(Request::GetStatus), 0);
    }

    #[test]
    fn test_on_every_set_reads_status() {
        let mut device = device(MockDevice::new().with_flags(DisplayFlags::STATUS_ON_SET));
        device.transport_mut().clear_log();
        device.controller_enable(true).unwrap();
        assert_eq!(
            device.transport().sequence(),
            vec![Request::SetControllerEnable, Request::GetStatus]
        );

        // IN requests never poll status on success
        device.transport_mut().clear_log();
        device.update_connector(0).unwrap();
        assert_eq!(device.transport().count(Request::GetStatus), 0);
    }

    #[test]
    fn test_status_codes_map_to_errors() {
        for (code, status) in [
            (1, Status::Busy),
            (2, Status::RequestNotSupported),
            (3, Status::ProtocolError),
            (4, Status::InvalidParameter),
            (5, Status::Error),
            (0x42, Status::Error),
        ] {
            let mut device = device(MockDevice::new());
            device
                .transport_mut()
                .fail
                .insert(Request::SetControllerEnable, code);
            let err = device.controller_enable(true).unwrap_err();
            assert_eq!(err.status(), Some(status), "code {code}");
        }
    }

    #[test]
    fn test_stall_with_ok_status() {
        let mut device = device(MockDevice::new());
        device
            .transport_mut()
            .stall_ok
            .insert(Request::SetControllerEnable);
        assert!(matches!(
            device.controller_enable(true),
            Err(Error::StallWithoutStatus {
                request: Request::SetControllerEnable
            })
        ));
    }

    #[test]
    fn test_status_read() {
        let mut device = device(MockDevice::new());
        device.transport_mut().status = 1;
        assert_eq!(device.status().unwrap(), Status::Busy);
    }

    #[test]
    fn test_check_rejects_unadvertised_format() {
        let mut device = device(MockDevice::new());
        device.transport_mut().clear_log();
        let state = DisplayState::new(preferred_mode(), PixelFormat::R1, 0);
        assert!(matches!(
            device.check(&state),
            Err(Error::UnsupportedFormat(PixelFormat::R1))
        ));
        assert!(device.transport().log.is_empty());
    }

    #[test]
    fn test_check_rejects_foreign_mode_and_connector() {
        let mut device = device(MockDevice::new());
        let state = DisplayState::new(DisplayMode::from_size(800, 600, 60), PixelFormat::Rgb565, 0);
        assert!(matches!(device.check(&state), Err(Error::UnknownMode(_, 0))));

        let state = DisplayState::new(preferred_mode(), PixelFormat::Rgb565, 3);
        assert!(matches!(device.check(&state), Err(Error::NoSuchConnector(3))));
    }

    #[test]
    fn test_check_payload() {
        let mut device = device(MockDevice::new());
        device.transport_mut().clear_log();
        device.check(&rgb565()).unwrap();

        let logged = device.transport().requests(Request::SetStateCheck);
        let req = StateReq::decode(&logged[0].data).unwrap();
        assert_eq!(req.mode, preferred_mode());
        assert_eq!(req.format, PixelFormat::Rgb565.to_byte());
        assert_eq!(req.connector, 0);
        // Rotation goes out as its value, not the supported mask
        assert_eq!(
            req.properties.as_slice(),
            &[
                PropertyReq::new(PropertyId::BacklightBrightness, 100),
                PropertyReq::new(PropertyId::Rotation, Rotation::ROTATE_0.bits()),
            ]
        );
    }

    #[test]
    fn test_commit_requires_check() {
        let mut device = device(MockDevice::new());
        assert!(matches!(device.commit(&rgb565()), Err(Error::NotChecked)));

        device.check(&rgb565()).unwrap();
        let other = DisplayState::new(preferred_mode(), PixelFormat::Xrgb8888, 0);
        assert!(matches!(device.commit(&other), Err(Error::NotChecked)));

        // A mismatched commit consumes the check
        assert!(matches!(device.commit(&rgb565()), Err(Error::NotChecked)));
        assert_eq!(device.lifecycle(), DeviceState::Ready);
    }

    #[test]
    fn test_failed_check_is_not_committable() {
        let mut device = device(MockDevice::new());
        device.transport_mut().fail.insert(Request::SetStateCheck, 4);
        assert!(matches!(
            device.check(&rgb565()),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(device.commit(&rgb565()), Err(Error::NotChecked)));
    }

    #[test]
    fn test_property_change_invalidates_check() {
        let mut device = device(MockDevice::new());
        device.check(&rgb565()).unwrap();
        device
            .set_property(PropertyId::BacklightBrightness, 10)
            .unwrap();
        assert!(matches!(device.commit(&rgb565()), Err(Error::NotChecked)));
    }

    #[test]
    fn test_apply_enables_display_once() {
        let mut device = device(MockDevice::new());
        device.transport_mut().clear_log();
        device.apply(&rgb565()).unwrap();
        assert_eq!(device.lifecycle(), DeviceState::Enabled);
        assert_eq!(device.active_state(), Some(&rgb565()));
        assert_eq!(
            device.transport().sequence(),
            vec![
                Request::GetConnectorProperties,
                Request::SetStateCheck,
                Request::SetStateCommit,
                Request::SetDisplayEnable,
            ]
        );
        assert!(device.transport().requests(Request::SetStateCommit)[0]
            .data
            .is_empty());

        device.transport_mut().clear_log();
        let other = DisplayState::new(preferred_mode(), PixelFormat::Xrgb8888, 0);
        device.apply(&other).unwrap();
        assert_eq!(device.transport().count(Request::SetDisplayEnable), 0);
        assert_eq!(device.lifecycle(), DeviceState::Enabled);
    }

    #[test]
    fn test_display_toggle() {
        let mut device = enabled(MockDevice::new());
        device.display_enable(false).unwrap();
        assert_eq!(device.lifecycle(), DeviceState::Disabled);
        assert_eq!(device.transport().requests(Request::SetDisplayEnable)[0].data, vec![0]);
        device.display_enable(true).unwrap();
        assert_eq!(device.lifecycle(), DeviceState::Enabled);
    }

    #[test]
    fn test_display_enable_needs_commit() {
        let mut device = device(MockDevice::new());
        assert!(matches!(
            device.display_enable(true),
            Err(Error::InvalidLifecycle(DeviceState::Ready))
        ));
    }

    #[test]
    fn test_changed_connector_refetches() {
        let mut device = device(MockDevice::new());
        device.transport_mut().clear_log();

        device.update_connector(0).unwrap();
        assert_eq!(device.transport().count(Request::GetConnectorModes), 0);

        device.transport_mut().connectors[0].status |= 0x80;
        device.transport_mut().connectors[0].modes = vec![DisplayMode::from_size(64, 48, 30)];
        device.update_connector(0).unwrap();
        assert_eq!(device.transport().count(Request::GetConnectorModes), 1);
        assert_eq!(device.transport().count(Request::GetConnectorEdid), 1);
        assert_eq!(device.connector(0).unwrap().modes().unwrap()[0].hdisplay, 64);
    }

    #[test]
    fn test_force_detect() {
        let mut device = device(MockDevice::new());
        device.transport_mut().clear_log();
        let status = device.force_detect(0).unwrap();
        assert!(status.changed);
        assert_eq!(
            device.transport().sequence(),
            vec![
                Request::SetConnectorForceDetect,
                Request::GetConnectorStatus,
                Request::GetConnectorModes,
                Request::GetConnectorEdid,
            ]
        );
    }

    #[test]
    fn test_disconnected_connector() {
        let mut mock = MockDevice::new();
        mock.connectors[0].status = 0;
        let mut device = device(mock);
        assert!(!device.connector(0).unwrap().connected());
        assert_eq!(device.transport().count(Request::GetConnectorModes), 0);
        // Modes are still fetched on demand
        assert_eq!(device.connector_modes(0).unwrap().len(), 2);
    }

    #[test]
    fn test_bad_edid_length_treated_as_absent() {
        let mut mock = MockDevice::new();
        mock.connectors[0].edid = vec![0; 100];
        let mut device = device(mock);
        assert!(device.connector(0).unwrap().edid().is_none());
        assert!(device.connector_edid(0).unwrap().is_none());
    }

    #[test]
    fn test_rotation_validation() {
        let mut device = device(
            MockDevice::new().with_rotation(Rotation::ROTATE_0 | Rotation::ROTATE_180),
        );
        device
            .set_property(PropertyId::Rotation, Rotation::ROTATE_180.bits())
            .unwrap();
        assert!(matches!(
            device.set_property(PropertyId::Rotation, Rotation::ROTATE_90.bits()),
            Err(Error::InvalidPropertyValue { .. })
        ));
        assert!(matches!(
            device.set_property(PropertyId::TvHue, 1),
            Err(Error::UnknownProperty(11))
        ));
    }

    #[test]
    fn test_connector_properties_and_tv_modes() {
        let mut mock = MockDevice::new();
        mock.connectors[0].properties = vec![PropertyReq::new(PropertyId::TvMode, 0)];
        mock.connectors[0].tv_modes = vec!["NTSC", "PAL"];
        let mut device = device(mock);

        let names = device.tv_mode_values(0).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names[1].as_str(), "PAL");

        device
            .set_connector_property(0, PropertyId::TvMode, 1)
            .unwrap();
        device.check(&rgb565()).unwrap();
        let logged = device.transport().requests(Request::SetStateCheck);
        let req = StateReq::decode(&logged[0].data).unwrap();
        assert_eq!(
            req.properties.last(),
            Some(&PropertyReq::new(PropertyId::TvMode, 1))
        );
    }

    #[test]
    fn test_tv_modes_need_property() {
        let mut device = device(MockDevice::new());
        assert!(matches!(
            device.tv_mode_values(0),
            Err(Error::UnknownProperty(5))
        ));
    }

    #[test]
    fn test_flush_bands() {
        let mut mock = MockDevice::new().with_max_buffer(1000);
        mock.descriptor.compression = Compression::empty();
        let mut device = enabled(mock);

        let image = Image::filled(320, 240, Color::WHITE);
        // 100 px of RGB565 is 200 bytes per row, so 5 rows per band
        let report = device.flush(&image, Rect::new(0, 0, 100, 12)).unwrap();
        assert_eq!(report.chunks, 3);
        assert_eq!(report.raw_bytes, 2400);
        assert_eq!(report.sent_bytes, 2400);

        let headers: Vec<SetBuffer> = device
            .transport()
            .requests(Request::SetBuffer)
            .iter()
            .map(|l| SetBuffer::decode(&l.data).unwrap())
            .collect();
        let ys: Vec<u32> = headers.iter().map(|h| h.y).collect();
        assert_eq!(ys, vec![0, 5, 10]);
        assert_eq!(headers[2].height, 2);
        assert!(headers.iter().all(|h| h.compression.is_empty()));
        let sizes: Vec<usize> = device.transport().bulk.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![1000, 1000, 400]);
    }

    #[test]
    fn test_flush_compresses_uniform_image() {
        let mut device = enabled(MockDevice::new());
        let image = Image::filled(320, 240, Color::rgb(0x10, 0x20, 0x30));
        let report = device.flush(&image, image.bounds()).unwrap();
        assert_eq!(report.chunks, 1);
        assert!(report.sent_bytes < report.raw_bytes);

        let header = SetBuffer::decode(&device.transport().requests(Request::SetBuffer)[0].data)
            .unwrap();
        assert_eq!(header.compression, Compression::LZ4);
        assert_eq!(header.length, 320 * 240 * 2);
        assert_eq!(header.compressed_length as usize, device.transport().bulk[0].len());
    }

    #[test]
    fn test_flush_tiny_rect_sent_raw() {
        let mut device = enabled(MockDevice::new());
        let mut image = Image::new(320, 240);
        image.set_pixel(10, 10, Color::rgb(0x12, 0x34, 0x56));
        let report = device.flush(&image, Rect::new(10, 10, 1, 1)).unwrap();
        assert_eq!(report.sent_bytes, 2);

        let header = SetBuffer::decode(&device.transport().requests(Request::SetBuffer)[0].data)
            .unwrap();
        assert!(header.compression.is_empty());
        assert_eq!(header.compressed_length, 0);
    }

    #[test]
    fn test_flush_compression_disabled_by_config() {
        let mut device = Device::new(
            MockDevice::new(),
            DriverConfig {
                compression: false,
                ..DriverConfig::default()
            },
        );
        device.enumerate().unwrap();
        device.apply(&rgb565()).unwrap();
        let image = Image::new(320, 240);
        let report = device.flush(&image, image.bounds()).unwrap();
        assert_eq!(report.sent_bytes, report.raw_bytes);
    }

    #[test]
    fn test_full_update_omits_header() {
        let mut device = enabled(MockDevice::new().with_flags(DisplayFlags::FULL_UPDATE));
        let image = Image::filled(320, 240, Color::WHITE);
        let report = device.flush(&image, Rect::new(5, 5, 2, 2)).unwrap();

        assert_eq!(report.rect, image.bounds());
        assert_eq!(device.transport().count(Request::SetBuffer), 0);
        // Never compressed
        assert_eq!(device.transport().bulk[0].len(), 320 * 240 * 2);
    }

    #[test]
    fn test_full_update_resyncs_after_bulk_failure() {
        let mut device = enabled(MockDevice::new().with_flags(DisplayFlags::FULL_UPDATE));
        let image = Image::new(320, 240);

        device.transport_mut().bulk_failures = 1;
        assert!(matches!(
            device.flush(&image, image.bounds()),
            Err(Error::Bulk(TransportError::Timeout))
        ));

        device.flush(&image, image.bounds()).unwrap();
        assert_eq!(device.transport().count(Request::SetBuffer), 1);

        device.flush(&image, image.bounds()).unwrap();
        assert_eq!(device.transport().count(Request::SetBuffer), 1);
    }

    #[test]
    fn test_flush_aligns_r1() {
        let mut mock = MockDevice::new();
        mock.formats = vec![PixelFormat::R1.to_byte()];
        let mut device = device(mock);
        let state = DisplayState::new(preferred_mode(), PixelFormat::R1, 0);
        device.apply(&state).unwrap();

        let image = Image::new(320, 240);
        let report = device.flush(&image, Rect::new(3, 0, 100, 1)).unwrap();
        assert_eq!(report.rect, Rect::new(0, 0, 104, 1));
        assert_eq!(report.raw_bytes, 13);
    }

    #[test]
    fn test_flush_validation() {
        let mut device = device(MockDevice::new());
        let image = Image::new(320, 240);
        assert!(matches!(
            device.flush(&image, image.bounds()),
            Err(Error::InvalidLifecycle(DeviceState::Ready))
        ));

        device.apply(&rgb565()).unwrap();
        assert!(matches!(
            device.flush(&Image::new(10, 10), Rect::new(0, 0, 1, 1)),
            Err(Error::ImageSize { .. })
        ));
        assert!(matches!(
            device.flush(&image, Rect::new(300, 0, 40, 1)),
            Err(Error::Codec(CodecError::OutOfBounds { .. }))
        ));
        assert!(matches!(
            device.flush(&image, Rect::new(8, 0, u32::MAX, 1)),
            Err(Error::Codec(CodecError::OutOfBounds { .. }))
        ));

        let report = device.flush(&image, Rect::new(0, 0, 0, 0)).unwrap();
        assert_eq!(report.chunks, 0);
    }

    #[test]
    fn test_row_larger_than_buffer() {
        let mut device = enabled(MockDevice::new().with_max_buffer(100));
        let image = Image::new(320, 240);
        assert!(matches!(
            device.flush(&image, image.bounds()),
            Err(Error::BufferTooSmall {
                pitch: 640,
                max_buffer: 100
            })
        ));
    }

    #[test]
    fn test_max_buffer_cap() {
        let device = device(MockDevice::new());
        assert_eq!(device.max_buffer_size(), 4 * 1024 * 1024);
        let device = self::device(MockDevice::new().with_max_buffer(8192));
        assert_eq!(device.max_buffer_size(), 8192);
    }

    #[test]
    fn test_flush_damage() {
        let mut device = enabled(MockDevice::new());
        let mut image = Image::new(320, 240);
        assert!(device.flush_damage(&mut image).unwrap().is_none());

        image.fill_rect(Rect::new(10, 10, 4, 4), Color::WHITE);
        let report = device.flush_damage(&mut image).unwrap().unwrap();
        assert_eq!(report.rect, Rect::new(10, 10, 4, 4));
        assert!(!image.is_damaged());

        image.fill_rect(Rect::new(0, 0, 2, 2), Color::WHITE);
        device.transport_mut().bulk_failures = 1;
        assert!(device.flush_damage(&mut image).is_err());
        assert!(image.is_damaged());
    }

    #[test]
    fn test_close() {
        let mut device = enabled(MockDevice::new());
        device.close().unwrap();
        assert_eq!(device.lifecycle(), DeviceState::TornDown);
        assert_eq!(
            device.transport().sequence(),
            vec![Request::SetDisplayEnable, Request::SetControllerEnable]
        );
        assert!(matches!(
            device.controller_enable(true),
            Err(Error::InvalidLifecycle(DeviceState::TornDown))
        ));
        device.close().unwrap();
    }

    #[test]
    fn test_close_reports_first_error() {
        let mut device = enabled(MockDevice::new());
        device.transport_mut().fail.insert(Request::SetDisplayEnable, 5);
        assert!(matches!(device.close(), Err(Error::DeviceError { .. })));
        assert_eq!(device.lifecycle(), DeviceState::TornDown);
        assert_eq!(device.transport().count(Request::SetControllerEnable), 1);
    }

    #[test]
    fn test_disconnect_moves_to_disconnected() {
        struct Gone;
        impl Transport for Gone {
            fn control_in(&mut self, _: Request, _: u16, _: &mut [u8]) -> core::result::Result<usize, TransportError> {
                Err(TransportError::Disconnected)
            }
            fn control_out(&mut self, _: Request, _: u16, _: &[u8]) -> core::result::Result<usize, TransportError> {
                Err(TransportError::Disconnected)
            }
            fn bulk_out(&mut self, _: &[u8]) -> core::result::Result<usize, TransportError> {
                Err(TransportError::Disconnected)
            }
        }

        let mut device = Device::new(Gone, DriverConfig::default());
        assert!(matches!(
            device.enumerate(),
            Err(Error::Transport {
                source: TransportError::Disconnected,
                ..
            })
        ));
        assert_eq!(device.lifecycle(), DeviceState::Disconnected);
    }

    #[test]
    fn test_open() {
        let device = Device::open(MockDevice::new(), DriverConfig::default()).unwrap();
        assert_eq!(device.lifecycle(), DeviceState::Ready);
        assert_eq!(
            device.transport().requests(Request::SetControllerEnable)[0].data,
            vec![1]
        );
    }
}
