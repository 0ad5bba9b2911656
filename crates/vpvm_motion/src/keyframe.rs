// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions for bone, morph, camera and light tracks.

use crate::interpolation::{Interpolation, InterpolationCurve, InterpolationPreset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyframeId(pub Uuid);

impl KeyframeId {
    /// Create a new random keyframe ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KeyframeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of animatable parameter a keyframe records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyframeKind {
    /// Bone transform
    Bone,
    /// Morph weight
    Morph,
    /// Camera pose
    Camera,
    /// Light color and direction
    Light,
}

impl KeyframeKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bone => "Bone",
            Self::Morph => "Morph",
            Self::Camera => "Camera",
            Self::Light => "Light",
        }
    }
}

/// Interpolated parameter a curve can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterpolationChannel {
    /// Translation / look-at X
    X,
    /// Translation / look-at Y
    Y,
    /// Translation / look-at Z
    Z,
    /// Bone rotation
    Rotation,
    /// Camera angle
    Angle,
    /// Camera distance
    Distance,
    /// Camera field of view
    Fov,
    /// Morph weight
    Weight,
    /// Every channel of the keyframe
    All,
}

/// Per-channel curves of a bone keyframe
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoneInterpolation {
    /// Translation X
    pub x: InterpolationCurve,
    /// Translation Y
    pub y: InterpolationCurve,
    /// Translation Z
    pub z: InterpolationCurve,
    /// Rotation
    pub rotation: InterpolationCurve,
}

impl BoneInterpolation {
    /// Same curve on every channel
    pub fn uniform(curve: InterpolationCurve) -> Self {
        Self {
            x: curve,
            y: curve,
            z: curve,
            rotation: curve,
        }
    }
}

/// Per-channel curves of a camera keyframe
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraInterpolation {
    /// Look-at X
    pub x: InterpolationCurve,
    /// Look-at Y
    pub y: InterpolationCurve,
    /// Look-at Z
    pub z: InterpolationCurve,
    /// Angle
    pub angle: InterpolationCurve,
    /// Distance
    pub distance: InterpolationCurve,
    /// Field of view
    pub fov: InterpolationCurve,
}

impl CameraInterpolation {
    /// Same curve on every channel
    pub fn uniform(curve: InterpolationCurve) -> Self {
        Self {
            x: curve,
            y: curve,
            z: curve,
            angle: curve,
            distance: curve,
            fov: curve,
        }
    }
}

/// Bone pose at a keyframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneValue {
    /// Local translation
    pub translation: [f32; 3],
    /// Local orientation quaternion (x, y, z, w)
    pub orientation: [f32; 4],
    /// Curves of the segment ending at this keyframe
    pub interpolation: BoneInterpolation,
    /// Whether physics drives the bone from this keyframe on
    pub physics_enabled: bool,
}

impl Default for BoneValue {
    fn default() -> Self {
        Self {
            translation: [0.0, 0.0, 0.0],
            orientation: [0.0, 0.0, 0.0, 1.0],
            interpolation: BoneInterpolation::default(),
            physics_enabled: true,
        }
    }
}

/// Morph weight at a keyframe
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MorphValue {
    /// Weight in `[0, 1]`
    pub weight: f32,
    /// Curve of the segment ending at this keyframe
    pub interpolation: InterpolationCurve,
}

impl MorphValue {
    /// Create a morph value, clamping the weight
    pub fn new(weight: f32) -> Self {
        Self {
            weight: weight.clamp(0.0, 1.0),
            interpolation: InterpolationCurve::linear(),
        }
    }
}

/// Camera pose at a keyframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraValue {
    /// Point the camera orbits
    pub look_at: [f32; 3],
    /// Euler angle in radians
    pub angle: [f32; 3],
    /// Distance from the look-at point
    pub distance: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Perspective (true) or orthographic projection
    pub perspective: bool,
    /// Curves of the segment ending at this keyframe
    pub interpolation: CameraInterpolation,
}

impl Default for CameraValue {
    fn default() -> Self {
        Self {
            look_at: [0.0, 10.0, 0.0],
            angle: [0.0, 0.0, 0.0],
            distance: 45.0,
            fov: 30.0,
            perspective: true,
            interpolation: CameraInterpolation::default(),
        }
    }
}

/// Light state at a keyframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightValue {
    /// Linear RGB color
    pub color: [f32; 3],
    /// Direction the light shines towards
    pub direction: [f32; 3],
}

impl Default for LightValue {
    fn default() -> Self {
        Self {
            color: [0.6, 0.6, 0.6],
            direction: [-0.5, -1.0, 0.5],
        }
    }
}

/// Value stored in a keyframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeyframeValue {
    /// Bone transform
    Bone(BoneValue),
    /// Morph weight
    Morph(MorphValue),
    /// Camera pose
    Camera(CameraValue),
    /// Light state
    Light(LightValue),
}

impl KeyframeValue {
    /// Kind of this value
    pub fn kind(&self) -> KeyframeKind {
        match self {
            Self::Bone(_) => KeyframeKind::Bone,
            Self::Morph(_) => KeyframeKind::Morph,
            Self::Camera(_) => KeyframeKind::Camera,
            Self::Light(_) => KeyframeKind::Light,
        }
    }

    /// Blend towards `next` by linear progress `t`
    ///
    /// The curves stored on `next` shape the segment. Returns `None` when
    /// the kinds differ.
    pub fn interpolate(&self, next: &KeyframeValue, t: f32) -> Option<KeyframeValue> {
        let t = t.clamp(0.0, 1.0);
        match (self, next) {
            (KeyframeValue::Bone(a), KeyframeValue::Bone(b)) => {
                let curves = &b.interpolation;
                let amounts = [
                    curves.x.evaluate(t),
                    curves.y.evaluate(t),
                    curves.z.evaluate(t),
                ];
                Some(KeyframeValue::Bone(BoneValue {
                    translation: Interpolation::lerp_vec3_per_axis(a.translation, b.translation, amounts),
                    orientation: Interpolation::slerp(
                        a.orientation,
                        b.orientation,
                        curves.rotation.evaluate(t),
                    ),
                    interpolation: b.interpolation,
                    physics_enabled: a.physics_enabled,
                }))
            }
            (KeyframeValue::Morph(a), KeyframeValue::Morph(b)) => Some(KeyframeValue::Morph(MorphValue {
                weight: Interpolation::lerp(a.weight, b.weight, b.interpolation.evaluate(t)),
                interpolation: b.interpolation,
            })),
            (KeyframeValue::Camera(a), KeyframeValue::Camera(b)) => {
                let curves = &b.interpolation;
                let amounts = [
                    curves.x.evaluate(t),
                    curves.y.evaluate(t),
                    curves.z.evaluate(t),
                ];
                Some(KeyframeValue::Camera(CameraValue {
                    look_at: Interpolation::lerp_vec3_per_axis(a.look_at, b.look_at, amounts),
                    angle: Interpolation::lerp_vec3(a.angle, b.angle, curves.angle.evaluate(t)),
                    distance: Interpolation::lerp(a.distance, b.distance, curves.distance.evaluate(t)),
                    fov: Interpolation::lerp(a.fov, b.fov, curves.fov.evaluate(t)),
                    perspective: a.perspective,
                    interpolation: b.interpolation,
                }))
            }
            (KeyframeValue::Light(a), KeyframeValue::Light(b)) => Some(KeyframeValue::Light(LightValue {
                color: Interpolation::lerp_vec3(a.color, b.color, t),
                direction: Interpolation::lerp_vec3(a.direction, b.direction, t),
            })),
            _ => None,
        }
    }

    /// Assign a preset curve to one channel
    ///
    /// Returns `false` when the channel does not exist on this kind.
    pub fn apply_preset(&mut self, preset: InterpolationPreset, channel: InterpolationChannel) -> bool {
        self.set_curve(preset.curve(), channel)
    }

    /// Assign a curve to one channel
    ///
    /// Returns `false` when the channel does not exist on this kind.
    pub fn set_curve(&mut self, curve: InterpolationCurve, channel: InterpolationChannel) -> bool {
        use InterpolationChannel as C;

        match self {
            KeyframeValue::Bone(bone) => {
                let curves = &mut bone.interpolation;
                match channel {
                    C::X => curves.x = curve,
                    C::Y => curves.y = curve,
                    C::Z => curves.z = curve,
                    C::Rotation => curves.rotation = curve,
                    C::All => *curves = BoneInterpolation::uniform(curve),
                    _ => return false,
                }
            }
            KeyframeValue::Morph(morph) => match channel {
                C::Weight | C::All => morph.interpolation = curve,
                _ => return false,
            },
            KeyframeValue::Camera(camera) => {
                let curves = &mut camera.interpolation;
                match channel {
                    C::X => curves.x = curve,
                    C::Y => curves.y = curve,
                    C::Z => curves.z = curve,
                    C::Angle => curves.angle = curve,
                    C::Distance => curves.distance = curve,
                    C::Fov => curves.fov = curve,
                    C::All => *curves = CameraInterpolation::uniform(curve),
                    _ => return false,
                }
            }
            KeyframeValue::Light(_) => return false,
        }
        true
    }

    /// Get the curve on one channel, if the kind has it
    pub fn curve(&self, channel: InterpolationChannel) -> Option<InterpolationCurve> {
        use InterpolationChannel as C;

        match (self, channel) {
            (KeyframeValue::Bone(b), C::X) => Some(b.interpolation.x),
            (KeyframeValue::Bone(b), C::Y) => Some(b.interpolation.y),
            (KeyframeValue::Bone(b), C::Z) => Some(b.interpolation.z),
            (KeyframeValue::Bone(b), C::Rotation) => Some(b.interpolation.rotation),
            (KeyframeValue::Morph(m), C::Weight) => Some(m.interpolation),
            (KeyframeValue::Camera(c), C::X) => Some(c.interpolation.x),
            (KeyframeValue::Camera(c), C::Y) => Some(c.interpolation.y),
            (KeyframeValue::Camera(c), C::Z) => Some(c.interpolation.z),
            (KeyframeValue::Camera(c), C::Angle) => Some(c.interpolation.angle),
            (KeyframeValue::Camera(c), C::Distance) => Some(c.interpolation.distance),
            (KeyframeValue::Camera(c), C::Fov) => Some(c.interpolation.fov),
            _ => None,
        }
    }

    /// Mirror a bone pose across the model's YZ plane
    pub fn mirrored(&self) -> KeyframeValue {
        match self {
            KeyframeValue::Bone(bone) => {
                let [tx, ty, tz] = bone.translation;
                let [qx, qy, qz, qw] = bone.orientation;
                KeyframeValue::Bone(BoneValue {
                    translation: [-tx, ty, tz],
                    orientation: [qx, -qy, -qz, qw],
                    ..bone.clone()
                })
            }
            other => other.clone(),
        }
    }

    /// Get as bone value if possible
    pub fn as_bone(&self) -> Option<&BoneValue> {
        match self {
            KeyframeValue::Bone(v) => Some(v),
            _ => None,
        }
    }

    /// Get as morph weight if possible
    pub fn as_weight(&self) -> Option<f32> {
        match self {
            KeyframeValue::Morph(v) => Some(v.weight),
            _ => None,
        }
    }

    /// Get as camera value if possible
    pub fn as_camera(&self) -> Option<&CameraValue> {
        match self {
            KeyframeValue::Camera(v) => Some(v),
            _ => None,
        }
    }

    /// Get as light value if possible
    pub fn as_light(&self) -> Option<&LightValue> {
        match self {
            KeyframeValue::Light(v) => Some(v),
            _ => None,
        }
    }
}

/// A keyframe in a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Unique keyframe ID
    pub id: KeyframeId,
    /// Frame position on the timeline
    pub frame_index: u32,
    /// Value at this keyframe
    pub value: KeyframeValue,
}

impl Keyframe {
    /// Create a new keyframe
    pub fn new(frame_index: u32, value: KeyframeValue) -> Self {
        Self {
            id: KeyframeId::new(),
            frame_index,
            value,
        }
    }

    /// Create a bone keyframe
    pub fn bone(frame_index: u32, translation: [f32; 3], orientation: [f32; 4]) -> Self {
        Self::new(
            frame_index,
            KeyframeValue::Bone(BoneValue {
                translation,
                orientation: Interpolation::normalize_quat(orientation),
                ..BoneValue::default()
            }),
        )
    }

    /// Create a morph keyframe
    pub fn morph(frame_index: u32, weight: f32) -> Self {
        Self::new(frame_index, KeyframeValue::Morph(MorphValue::new(weight)))
    }

    /// Create a camera keyframe
    pub fn camera(frame_index: u32, value: CameraValue) -> Self {
        Self::new(frame_index, KeyframeValue::Camera(value))
    }

    /// Create a light keyframe
    pub fn light(frame_index: u32, color: [f32; 3], direction: [f32; 3]) -> Self {
        Self::new(frame_index, KeyframeValue::Light(LightValue { color, direction }))
    }

    /// Apply a preset to every channel
    pub fn with_preset(mut self, preset: InterpolationPreset) -> Self {
        self.value.apply_preset(preset, InterpolationChannel::All);
        self
    }

    /// Kind of this keyframe
    pub fn kind(&self) -> KeyframeKind {
        self.value.kind()
    }
}
