//! Device and connector properties
//!
//! Properties are kept in a map keyed by their wire id. Values are changed
//! locally and only reach the device through the next state check.

use std::collections::BTreeMap;

use gud_protocol::{PropertyId, PropertyReq, Rotation};

use crate::error::{Error, Result};

/// One property as enumerated from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property {
    /// Wire id, which may be unknown to this driver
    pub id: u16,
    /// Value sent with the next state check
    pub value: u64,
    /// Supported bits, for properties whose enumerated value is a mask
    pub supported: Option<u64>,
}

impl Property {
    /// Interpret an enumerated entry.
    ///
    /// For rotation the device reports the supported bits; the initial value
    /// is then `ROTATE_0`.
    pub fn from_wire(req: &PropertyReq) -> Self {
        match req.id() {
            Some(PropertyId::Rotation) => Self {
                id: req.prop,
                value: Rotation::ROTATE_0.bits(),
                supported: Some(req.val),
            },
            _ => Self {
                id: req.prop,
                value: req.val,
                supported: None,
            },
        }
    }

    pub fn known_id(&self) -> Option<PropertyId> {
        PropertyId::from_u16(self.id)
    }

    fn validate(&self, value: u64) -> Result<()> {
        let Some(supported) = self.supported else {
            return Ok(());
        };
        let valid = match self.known_id() {
            Some(PropertyId::Rotation) => Rotation::from_bits_retain(value)
                .is_valid_for(Rotation::from_bits_retain(supported)),
            _ => value & !supported == 0,
        };
        if valid {
            Ok(())
        } else {
            Err(Error::InvalidPropertyValue {
                id: self.id,
                value,
                supported,
            })
        }
    }

    pub fn to_wire(&self) -> PropertyReq {
        PropertyReq {
            prop: self.id,
            val: self.value,
        }
    }
}

/// Properties of one owner (the device or a connector), keyed by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    props: BTreeMap<u16, Property>,
}

impl PropertySet {
    pub const fn new() -> Self {
        Self {
            props: BTreeMap::new(),
        }
    }

    pub fn from_wire(reqs: &[PropertyReq]) -> Self {
        let props = reqs
            .iter()
            .map(|req| (req.prop, Property::from_wire(req)))
            .collect();
        Self { props }
    }

    pub fn get(&self, id: PropertyId) -> Option<&Property> {
        self.props.get(&id.to_u16())
    }

    pub fn contains(&self, id: PropertyId) -> bool {
        self.props.contains_key(&id.to_u16())
    }

    /// Change a value locally; rejects unknown ids and values outside the mask
    pub fn set(&mut self, id: PropertyId, value: u64) -> Result<()> {
        let prop = self
            .props
            .get_mut(&id.to_u16())
            .ok_or(Error::UnknownProperty(id.to_u16()))?;
        prop.validate(value)?;
        prop.value = value;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.props.values()
    }

    /// Entries as sent in SET_STATE_CHECK, in id order
    pub fn to_wire(&self) -> impl Iterator<Item = PropertyReq> + '_ {
        self.props.values().map(Property::to_wire)
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }
}
