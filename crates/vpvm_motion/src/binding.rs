// SPDX-License-Identifier: MIT OR Apache-2.0
//! What a track animates: a model's bone or morph, the camera or the light.

use crate::keyframe::KeyframeKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Model ID for binding motions to loaded models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelId(pub Uuid);

impl ModelId {
    /// Create a new random model ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new()
    }
}

/// Binding of a track to the parameter it animates
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackTarget {
    /// Bone of the motion's model
    Bone {
        /// Bone name
        name: String,
    },
    /// Morph of the motion's model
    Morph {
        /// Morph name
        name: String,
    },
    /// Scene camera
    Camera,
    /// Scene light
    Light,
}

impl TrackTarget {
    /// Bind to a bone
    pub fn bone(name: impl Into<String>) -> Self {
        Self::Bone { name: name.into() }
    }

    /// Bind to a morph
    pub fn morph(name: impl Into<String>) -> Self {
        Self::Morph { name: name.into() }
    }

    /// Kind of keyframe this target accepts
    pub fn kind(&self) -> KeyframeKind {
        match self {
            Self::Bone { .. } => KeyframeKind::Bone,
            Self::Morph { .. } => KeyframeKind::Morph,
            Self::Camera => KeyframeKind::Camera,
            Self::Light => KeyframeKind::Light,
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        match self {
            Self::Bone { name } | Self::Morph { name } => name,
            Self::Camera => "Camera",
            Self::Light => "Light",
        }
    }

    /// Left/right counterpart of a bone target
    ///
    /// Returns the target unchanged when it has no side.
    pub fn mirrored(&self) -> Self {
        match self {
            Self::Bone { name } => Self::Bone {
                name: mirror_name(name),
            },
            other => other.clone(),
        }
    }
}

const SIDE_WORDS: [(&str, &str); 4] = [
    ("左", "右"),
    ("Left", "Right"),
    ("left", "right"),
    ("LEFT", "RIGHT"),
];

const SIDE_SUFFIXES: [(&str, &str); 3] = [("_L", "_R"), (".L", ".R"), ("_l", "_r")];

/// Swap the side marker of a bone name
pub fn mirror_name(name: &str) -> String {
    for (left, right) in SIDE_WORDS {
        if name.contains(left) {
            return name.replace(left, right);
        }
        if name.contains(right) {
            return name.replace(right, left);
        }
    }
    for (left, right) in SIDE_SUFFIXES {
        if let Some(stem) = name.strip_suffix(left) {
            return format!("{stem}{right}");
        }
        if let Some(stem) = name.strip_suffix(right) {
            return format!("{stem}{left}");
        }
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_name() {
        assert_eq!(mirror_name("左腕"), "右腕");
        assert_eq!(mirror_name("右足ＩＫ"), "左足ＩＫ");
        assert_eq!(mirror_name("LeftArm"), "RightArm");
        assert_eq!(mirror_name("hand_R"), "hand_L");
        assert_eq!(mirror_name("センター"), "センター");
    }

    #[test]
    fn test_mirrored_target() {
        assert_eq!(TrackTarget::bone("左ひじ").mirrored(), TrackTarget::bone("右ひじ"));
        assert_eq!(TrackTarget::morph("まばたき").mirrored(), TrackTarget::morph("まばたき"));
        assert_eq!(TrackTarget::Camera.mirrored(), TrackTarget::Camera);
    }
}
