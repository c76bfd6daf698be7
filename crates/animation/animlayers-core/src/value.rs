//! Evaluated animation values.
//!
//! A [`Pose`] maps animated channels (property path + array index) to a float.
//! The empty pose is the identity every composition starts from.

use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// One animated property channel, e.g. `location[0]`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ChannelKey {
    pub path: String,
    pub array_index: u32,
}

impl ChannelKey {
    pub fn new(path: impl Into<String>, array_index: u32) -> Self {
        Self {
            path: path.into(),
            array_index,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.path, self.array_index)
    }
}

/// Per-channel values produced by a strip, a layer, or a whole composition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    values: HashMap<ChannelKey, f32>,
}

impl Pose {
    /// The identity pose (no channels animated).
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, array_index: u32, value: f32) -> Self {
        self.set(ChannelKey::new(path, array_index), value);
        self
    }

    #[inline]
    pub fn set(&mut self, key: ChannelKey, value: f32) {
        self.values.insert(key, value);
    }

    #[inline]
    pub fn get(&self, path: &str, array_index: u32) -> Option<f32> {
        self.values.get(&ChannelKey::new(path, array_index)).copied()
    }

    #[inline]
    pub fn get_key(&self, key: &ChannelKey) -> Option<f32> {
        self.values.get(key).copied()
    }

    pub(crate) fn get_mut(&mut self, key: &ChannelKey) -> Option<&mut f32> {
        self.values.get_mut(key)
    }

    /// Overwrite this pose's channels with `other`'s.
    pub fn merge_from(&mut self, other: Pose) {
        self.values.extend(other.values);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelKey, f32)> {
        self.values.iter().map(|(k, v)| (k, *v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of evaluating a binding.
#[derive(Clone, Debug, PartialEq)]
pub enum Evaluation {
    /// The binding has no (live) animation resource.
    NoAnimation,
    Pose(Pose),
}

impl Evaluation {
    pub fn pose(&self) -> Option<&Pose> {
        match self {
            Evaluation::Pose(p) => Some(p),
            Evaluation::NoAnimation => None,
        }
    }

    pub fn into_pose(self) -> Option<Pose> {
        match self {
            Evaluation::Pose(p) => Some(p),
            Evaluation::NoAnimation => None,
        }
    }

    pub fn is_no_animation(&self) -> bool {
        matches!(self, Evaluation::NoAnimation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites_shared_channels() {
        let mut a = Pose::identity().with("location", 0, 1.0).with("location", 1, 2.0);
        let b = Pose::identity().with("location", 1, 5.0);
        a.merge_from(b);
        assert_eq!(a.get("location", 0), Some(1.0));
        assert_eq!(a.get("location", 1), Some(5.0));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn channel_key_display() {
        assert_eq!(ChannelKey::new("rotation_euler", 2).to_string(), "rotation_euler[2]");
    }
}
