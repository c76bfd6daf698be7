//! Layers and the per-channel mix rules used to stack them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnimError, Result};
use crate::strip::Strip;
use crate::value::Pose;

/// Arithmetic used to blend a layer's pose into the composite below it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixMode {
    /// Interpolate the composite toward the layer value by influence.
    #[default]
    Replace,
    /// Discard the composite; take the layer value scaled by influence.
    Override,
    Add,
    Subtract,
    Multiply,
}

impl MixMode {
    pub const ALL: [MixMode; 5] = [
        MixMode::Replace,
        MixMode::Override,
        MixMode::Add,
        MixMode::Subtract,
        MixMode::Multiply,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MixMode::Replace => "replace",
            MixMode::Override => "override",
            MixMode::Add => "add",
            MixMode::Subtract => "subtract",
            MixMode::Multiply => "multiply",
        }
    }

    /// Blend one channel. `acc` is `None` when nothing below animated it.
    #[inline]
    pub fn apply(&self, acc: Option<f32>, value: f32, influence: f32) -> f32 {
        let Some(acc) = acc else {
            return value * influence;
        };
        match self {
            MixMode::Replace => acc + (value - acc) * influence,
            MixMode::Override => value * influence,
            MixMode::Add => acc + value * influence,
            MixMode::Subtract => acc - value * influence,
            MixMode::Multiply => acc * (value * influence),
        }
    }
}

impl FromStr for MixMode {
    type Err = AnimError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        MixMode::ALL
            .into_iter()
            .find(|m| m.as_str() == lower)
            .ok_or_else(|| AnimError::InvalidArgument(format!("unknown mix mode '{s}'")))
    }
}

impl fmt::Display for MixMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, weighted compositing unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    influence: f32,
    pub mix_mode: MixMode,
    strips: Vec<Strip>,
}

impl Layer {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            influence: 1.0,
            mix_mode: MixMode::Replace,
            strips: Vec::new(),
        }
    }

    #[inline]
    pub fn influence(&self) -> f32 {
        self.influence
    }

    /// Caller validates; see `AnimationData::set_influence`.
    pub(crate) fn set_influence_unchecked(&mut self, influence: f32) {
        self.influence = influence;
    }

    #[inline]
    pub fn strips(&self) -> &[Strip] {
        &self.strips
    }

    #[inline]
    pub fn strip(&self, index: usize) -> Option<&Strip> {
        self.strips.get(index)
    }

    #[inline]
    pub fn strip_mut(&mut self, index: usize) -> Option<&mut Strip> {
        self.strips.get_mut(index)
    }

    pub(crate) fn push_strip(&mut self, strip: Strip) -> &mut Strip {
        self.strips.push(strip);
        let last = self.strips.len() - 1;
        &mut self.strips[last]
    }

    pub(crate) fn remove_strip_at(&mut self, index: usize) -> Option<Strip> {
        (index < self.strips.len()).then(|| self.strips.remove(index))
    }

    /// Blend `layer_pose` into `acc` channel by channel using this layer's mode and influence.
    pub fn blend_into(&self, acc: &mut Pose, layer_pose: Pose) {
        for (key, value) in layer_pose.iter() {
            match acc.get_mut(key) {
                Some(slot) => *slot = self.mix_mode.apply(Some(*slot), value, self.influence),
                None => acc.set(key.clone(), self.mix_mode.apply(None, value, self.influence)),
            }
        }
    }
}
