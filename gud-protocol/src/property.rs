//! Properties returned by GET_PROPERTIES / GET_CONNECTOR_PROPERTIES
//!
//! Each entry is 10 bytes: property id (u16) followed by value (u64). The
//! same layout is used inside the SET_STATE_CHECK payload.

use bitflags::bitflags;
use core::fmt;

use crate::wire::{Reader, Wire, WireError, Writer};

pub const PROP_TV_LEFT_MARGIN: u16 = 1;
pub const PROP_TV_RIGHT_MARGIN: u16 = 2;
pub const PROP_TV_TOP_MARGIN: u16 = 3;
pub const PROP_TV_BOTTOM_MARGIN: u16 = 4;
pub const PROP_TV_MODE: u16 = 5;
pub const PROP_TV_BRIGHTNESS: u16 = 6;
pub const PROP_TV_CONTRAST: u16 = 7;
pub const PROP_TV_FLICKER_REDUCTION: u16 = 8;
pub const PROP_TV_OVERSCAN: u16 = 9;
pub const PROP_TV_SATURATION: u16 = 10;
pub const PROP_TV_HUE: u16 = 11;
pub const PROP_BACKLIGHT_BRIGHTNESS: u16 = 12;
pub const PROP_ROTATION: u16 = 50;

/// Known property identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PropertyId {
    TvLeftMargin,
    TvRightMargin,
    TvTopMargin,
    TvBottomMargin,
    /// Index into the TV mode name list
    TvMode,
    TvBrightness,
    TvContrast,
    TvFlickerReduction,
    TvOverscan,
    TvSaturation,
    TvHue,
    BacklightBrightness,
    /// Plane rotation; the device reports its supported bits as the value
    Rotation,
}

impl PropertyId {
    pub fn from_u16(id: u16) -> Option<Self> {
        match id {
            PROP_TV_LEFT_MARGIN => Some(PropertyId::TvLeftMargin),
            PROP_TV_RIGHT_MARGIN => Some(PropertyId::TvRightMargin),
            PROP_TV_TOP_MARGIN => Some(PropertyId::TvTopMargin),
            PROP_TV_BOTTOM_MARGIN => Some(PropertyId::TvBottomMargin),
            PROP_TV_MODE => Some(PropertyId::TvMode),
            PROP_TV_BRIGHTNESS => Some(PropertyId::TvBrightness),
            PROP_TV_CONTRAST => Some(PropertyId::TvContrast),
            PROP_TV_FLICKER_REDUCTION => Some(PropertyId::TvFlickerReduction),
            PROP_TV_OVERSCAN => Some(PropertyId::TvOverscan),
            PROP_TV_SATURATION => Some(PropertyId::TvSaturation),
            PROP_TV_HUE => Some(PropertyId::TvHue),
            PROP_BACKLIGHT_BRIGHTNESS => Some(PropertyId::BacklightBrightness),
            PROP_ROTATION => Some(PropertyId::Rotation),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            PropertyId::TvLeftMargin => PROP_TV_LEFT_MARGIN,
            PropertyId::TvRightMargin => PROP_TV_RIGHT_MARGIN,
            PropertyId::TvTopMargin => PROP_TV_TOP_MARGIN,
            PropertyId::TvBottomMargin => PROP_TV_BOTTOM_MARGIN,
            PropertyId::TvMode => PROP_TV_MODE,
            PropertyId::TvBrightness => PROP_TV_BRIGHTNESS,
            PropertyId::TvContrast => PROP_TV_CONTRAST,
            PropertyId::TvFlickerReduction => PROP_TV_FLICKER_REDUCTION,
            PropertyId::TvOverscan => PROP_TV_OVERSCAN,
            PropertyId::TvSaturation => PROP_TV_SATURATION,
            PropertyId::TvHue => PROP_TV_HUE,
            PropertyId::BacklightBrightness => PROP_BACKLIGHT_BRIGHTNESS,
            PropertyId::Rotation => PROP_ROTATION,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PropertyId::TvLeftMargin => "TV_LEFT_MARGIN",
            PropertyId::TvRightMargin => "TV_RIGHT_MARGIN",
            PropertyId::TvTopMargin => "TV_TOP_MARGIN",
            PropertyId::TvBottomMargin => "TV_BOTTOM_MARGIN",
            PropertyId::TvMode => "TV_MODE",
            PropertyId::TvBrightness => "TV_BRIGHTNESS",
            PropertyId::TvContrast => "TV_CONTRAST",
            PropertyId::TvFlickerReduction => "TV_FLICKER_REDUCTION",
            PropertyId::TvOverscan => "TV_OVERSCAN",
            PropertyId::TvSaturation => "TV_SATURATION",
            PropertyId::TvHue => "TV_HUE",
            PropertyId::BacklightBrightness => "BACKLIGHT_BRIGHTNESS",
            PropertyId::Rotation => "ROTATION",
        }
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Rotation property bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Rotation: u64 {
        const ROTATE_0 = 1 << 0;
        const ROTATE_90 = 1 << 1;
        const ROTATE_180 = 1 << 2;
        const ROTATE_270 = 1 << 3;
        const REFLECT_X = 1 << 4;
        const REFLECT_Y = 1 << 5;
    }
}

impl Rotation {
    /// Bits selecting the angle; exactly one must be set
    pub const ANGLES: Rotation = Rotation::ROTATE_0
        .union(Rotation::ROTATE_90)
        .union(Rotation::ROTATE_180)
        .union(Rotation::ROTATE_270);

    /// Value is a subset of `supported` and names exactly one angle
    pub fn is_valid_for(self, supported: Rotation) -> bool {
        supported.contains(self) && self.intersection(Rotation::ANGLES).bits().count_ones() == 1
    }
}

/// One property id/value pair as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PropertyReq {
    pub prop: u16,
    pub val: u64,
}

impl PropertyReq {
    pub fn new(prop: PropertyId, val: u64) -> Self {
        Self {
            prop: prop.to_u16(),
            val,
        }
    }

    pub fn id(&self) -> Option<PropertyId> {
        PropertyId::from_u16(self.prop)
    }
}

impl fmt::Display for PropertyReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{} = {} ({:#x})", id, self.val, self.val),
            None => write!(f, "{} = {} ({:#x})", self.prop, self.val, self.val),
        }
    }
}

impl Wire for PropertyReq {
    const SIZE: usize = 10;

    fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::require(bytes, Self::SIZE)?;
        Ok(Self {
            prop: r.u16()?,
            val: r.u64()?,
        })
    }

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, WireError> {
        let mut w = Writer::require(buffer, Self::SIZE)?;
        w.u16(self.prop)?;
        w.u64(self.val)?;
        Ok(w.position())
    }
}
