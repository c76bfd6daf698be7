//! Strips: time-ranged contributors inside a layer.
//!
//! Only the envelope is modeled here. What a strip contributes is decided by a
//! [`StripEvaluator`](crate::engine::StripEvaluator) keyed on [`StripId`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnimError, Result};
use crate::ids::StripId;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StripKind {
    #[default]
    Keyframe,
}

impl FromStr for StripKind {
    type Err = AnimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "keyframe" => Ok(StripKind::Keyframe),
            other => Err(AnimError::InvalidArgument(format!(
                "unknown strip type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for StripKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StripKind::Keyframe => f.write_str("KEYFRAME"),
        }
    }
}

/// A strip is a potential contributor at scene time `t` when
/// `frame_start <= t - frame_offset <= frame_end`.
///
/// The frame fields are public so display code can write them directly;
/// [`Strip::resize`] is the validated way to change the range. Ranges written
/// directly are re-checked at evaluation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Strip {
    id: StripId,
    kind: StripKind,
    pub frame_start: f32,
    pub frame_end: f32,
    pub frame_offset: f32,
}

impl Strip {
    /// New strips are infinite and unshifted.
    pub(crate) fn new(id: StripId, kind: StripKind) -> Self {
        Self {
            id,
            kind,
            frame_start: f32::NEG_INFINITY,
            frame_end: f32::INFINITY,
            frame_offset: 0.0,
        }
    }

    #[inline]
    pub fn id(&self) -> StripId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> StripKind {
        self.kind
    }

    pub fn resize(&mut self, frame_start: f32, frame_end: f32) -> Result<()> {
        if frame_start.is_nan() || frame_end.is_nan() {
            return Err(AnimError::InvalidArgument(
                "strip range must not be NaN".into(),
            ));
        }
        if frame_end < frame_start {
            return Err(AnimError::InvalidArgument(format!(
                "strip end {frame_end} is before its start {frame_start}"
            )));
        }
        self.frame_start = frame_start;
        self.frame_end = frame_end;
        Ok(())
    }

    pub fn set_frame_offset(&mut self, frame_offset: f32) -> Result<()> {
        if !frame_offset.is_finite() {
            return Err(AnimError::InvalidArgument(format!(
                "strip offset must be finite, got {frame_offset}"
            )));
        }
        self.frame_offset = frame_offset;
        Ok(())
    }

    /// True when the range cannot contain any frame.
    pub fn is_malformed(&self) -> bool {
        self.frame_start.is_nan()
            || self.frame_end.is_nan()
            || self.frame_offset.is_nan()
            || self.frame_end < self.frame_start
    }

    /// Strip-local time for scene time `frame_time`.
    #[inline]
    pub fn local_time(&self, frame_time: f32) -> f32 {
        frame_time - self.frame_offset
    }

    pub fn contains_frame(&self, frame_time: f32) -> bool {
        let local = self.local_time(frame_time);
        self.frame_start <= local && local <= self.frame_end
    }

    /// Whether `frame_time` is (within float precision) the strip's last frame.
    pub fn is_last_frame(&self, frame_time: f32) -> bool {
        let local = self.local_time(frame_time);
        if self.frame_end.is_infinite() {
            return local == self.frame_end;
        }
        let tolerance = f32::EPSILON * self.frame_end.abs().max(1.0);
        (local - self.frame_end).abs() <= tolerance
    }
}
