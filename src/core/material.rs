use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    config::{DEFAULT_FRICTION, DEFAULT_RESTITUTION},
    error::MaterialError,
};

/// Surface material tag attached to a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialTag(pub u32);

impl MaterialTag {
    pub const DEFAULT: MaterialTag = MaterialTag(0);
}

impl Default for MaterialTag {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Friction/restitution used when two surfaces touch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactMaterial {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for ContactMaterial {
    fn default() -> Self {
        Self {
            friction: DEFAULT_FRICTION,
            restitution: DEFAULT_RESTITUTION,
        }
    }
}

impl ContactMaterial {
    pub fn new(friction: f32, restitution: f32) -> Result<Self, MaterialError> {
        let material = Self {
            friction,
            restitution,
        };
        material.validate()?;
        Ok(material)
    }

    pub fn validate(&self) -> Result<(), MaterialError> {
        if !(self.friction.is_finite() && self.friction >= 0.0) {
            return Err(MaterialError::InvalidFriction(self.friction));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(MaterialError::InvalidRestitution(self.restitution));
        }
        Ok(())
    }
}

/// Maps unordered material pairs to contact coefficients.
#[derive(Debug, Clone, Default)]
pub struct ContactMaterialTable {
    pairs: HashMap<(MaterialTag, MaterialTag), ContactMaterial>,
    default: ContactMaterial,
}

impl ContactMaterialTable {
    pub fn new(default: ContactMaterial) -> Self {
        Self {
            pairs: HashMap::new(),
            default,
        }
    }

    fn key(a: MaterialTag, b: MaterialTag) -> (MaterialTag, MaterialTag) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Stores the coefficients for `(a, b)`, replacing and returning any previous entry.
    pub fn insert(
        &mut self,
        a: MaterialTag,
        b: MaterialTag,
        material: ContactMaterial,
    ) -> Result<Option<ContactMaterial>, MaterialError> {
        material.validate()?;
        Ok(self.pairs.insert(Self::key(a, b), material))
    }

    pub fn remove(&mut self, a: MaterialTag, b: MaterialTag) -> Option<ContactMaterial> {
        self.pairs.remove(&Self::key(a, b))
    }

    /// Coefficients for the pair, falling back to the default material.
    pub fn lookup(&self, a: MaterialTag, b: MaterialTag) -> ContactMaterial {
        self.pairs
            .get(&Self::key(a, b))
            .copied()
            .unwrap_or(self.default)
    }

    pub fn default_material(&self) -> ContactMaterial {
        self.default
    }

    pub fn set_default(&mut self, material: ContactMaterial) -> Result<(), MaterialError> {
        material.validate()?;
        self.default = material;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
