// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised while editing motions.

use crate::keyframe::{KeyframeId, KeyframeKind};
use thiserror::Error;

/// Motion editing errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    /// Keyframe kind does not match the track kind
    #[error("Cannot store a {found:?} keyframe in a {expected:?} track")]
    KindMismatch {
        /// Kind required by the track
        expected: KeyframeKind,
        /// Kind of the rejected keyframe
        found: KeyframeKind,
    },

    /// Track is locked against edits
    #[error("Track is locked: {0}")]
    TrackLocked(String),

    /// Another keyframe already sits at the target frame
    #[error("Frame {0} already holds a keyframe")]
    FrameOccupied(u32),

    /// An edit would move a keyframe before frame 0
    #[error("Keyframe would move before frame 0")]
    NegativeFrame,

    /// An edit would move a keyframe past the last addressable frame
    #[error("Keyframe would move past the last frame")]
    FrameOutOfRange,

    /// Keyframe not found
    #[error("Keyframe not found: {0:?}")]
    KeyframeNotFound(KeyframeId),

    /// Scale factor is not a positive finite number
    #[error("Invalid scale factor: {0}")]
    InvalidScale(f32),
}

/// Result type for motion operations
pub type Result<T> = std::result::Result<T, MotionError>;
