// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe motion model for VPVM.
//!
//! This crate provides the data model of motion editing:
//! - Bone tracks (translation + orientation)
//! - Morph tracks (weights)
//! - Camera tracks (look-at, angle, distance, field of view)
//! - Light tracks (color, direction)
//!
//! ## Architecture
//!
//! The model is built on:
//! - Tracks of frame-indexed keyframes, one keyframe per frame
//! - Per-channel Bezier interpolation with named presets
//! - Motions grouping the tracks of one model
//! - A timeline holding cursor, selection and clipboard
//! - Playback control

pub mod binding;
pub mod error;
pub mod interpolation;
pub mod keyframe;
pub mod motion;
pub mod playback;
pub mod timeline;
pub mod track;

pub use binding::{mirror_name, ModelId, TrackTarget};
pub use error::{MotionError, Result};
pub use interpolation::{ControlPoint, Interpolation, InterpolationCurve, InterpolationPreset};
pub use keyframe::{
    BoneInterpolation, BoneValue, CameraInterpolation, CameraValue, InterpolationChannel, Keyframe,
    KeyframeId, KeyframeKind, KeyframeValue, LightValue, MorphValue,
};
pub use motion::{Motion, MotionId, DEFAULT_FRAME_RATE};
pub use playback::{PlaybackController, PlaybackState};
pub use timeline::{Clipboard, ClipboardEntry, KeyframeRef, PastedKeyframe, Timeline};
pub use track::{FrameRange, Track, TrackId};
