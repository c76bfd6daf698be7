//! Identifiers and simple allocators for core entities.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of an [`AnimationResource`](crate::animation::AnimationResource).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub Uuid);

impl ResourceId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of an animated object (the owner of a binding).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub u32);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner#{}", self.0)
    }
}

/// Resource-unique strip handle. Evaluators key their payload on it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StripId(pub u32);

/// Stable index of an output. Never reused within one resource.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct OutputIndex(pub u32);

impl fmt::Display for OutputIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Monotonic allocator for OwnerId, StripId, and OutputIndex.
///
/// Output indices start at 1 so that a zeroed index never names a live output.
#[derive(Clone, Default, Debug)]
pub struct IdAllocator {
    next_owner: u32,
    next_strip: u32,
    last_output: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_owner(&mut self) -> OwnerId {
        let id = OwnerId(self.next_owner);
        self.next_owner = self.next_owner.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_strip(&mut self) -> StripId {
        let id = StripId(self.next_strip);
        self.next_strip = self.next_strip.wrapping_add(1);
        id
    }

    /// Output indices must never wrap: a wrapped index could alias a removed output.
    #[inline]
    pub fn alloc_output(&mut self) -> OutputIndex {
        self.last_output = self
            .last_output
            .checked_add(1)
            .expect("output stable index space exhausted");
        OutputIndex(self.last_output)
    }

    /// Highest output index handed out so far (0 when none).
    #[inline]
    pub fn last_output(&self) -> OutputIndex {
        OutputIndex(self.last_output)
    }
}
