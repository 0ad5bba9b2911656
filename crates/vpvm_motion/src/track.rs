// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track definitions: the ordered keyframes of one animated parameter.

use crate::binding::TrackTarget;
use crate::error::{MotionError, Result};
use crate::keyframe::{Keyframe, KeyframeId, KeyframeKind, KeyframeValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub Uuid);

impl TrackId {
    /// Create a new random track ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// Inclusive range of frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRange {
    /// First frame
    pub start: u32,
    /// Last frame
    pub end: u32,
}

impl FrameRange {
    /// Create a range, swapping the bounds if needed
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// Whether a frame lies inside the range
    pub fn contains(&self, frame: u32) -> bool {
        (self.start..=self.end).contains(&frame)
    }

    /// Number of frames covered
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Ranges always cover at least one frame
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A track in a motion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrackData")]
pub struct Track {
    /// Unique track ID
    pub id: TrackId,
    /// Animated parameter
    pub target: TrackTarget,
    /// Keyframes, sorted by frame with one keyframe per frame
    keyframes: Vec<Keyframe>,
    /// Whether the track is muted during evaluation
    pub muted: bool,
    /// Whether the track rejects edits
    pub locked: bool,
}

/// Serialized form of a track, checked before it becomes a [`Track`]
#[derive(Deserialize)]
#[serde(rename = "Track")]
struct TrackData {
    id: TrackId,
    target: TrackTarget,
    keyframes: Vec<Keyframe>,
    muted: bool,
    locked: bool,
}

impl TryFrom<TrackData> for Track {
    type Error = MotionError;

    fn try_from(data: TrackData) -> Result<Self> {
        let mut track = Track::from_keyframes(data.target, data.keyframes)?;
        track.id = data.id;
        track.muted = data.muted;
        track.locked = data.locked;
        Ok(track)
    }
}

impl Track {
    /// Build a track from keyframes in any order
    ///
    /// Fails on keyframes of another kind or two keyframes on one frame.
    pub fn from_keyframes(target: TrackTarget, mut keyframes: Vec<Keyframe>) -> Result<Self> {
        let expected = target.kind();
        if let Some(found) = keyframes.iter().map(Keyframe::kind).find(|k| *k != expected) {
            return Err(MotionError::KindMismatch { expected, found });
        }
        keyframes.sort_by_key(|k| k.frame_index);
        if let Some(pair) = keyframes.windows(2).find(|w| w[0].frame_index == w[1].frame_index) {
            return Err(MotionError::FrameOccupied(pair[0].frame_index));
        }

        let mut track = Track::new(target);
        track.keyframes = keyframes;
        Ok(track)
    }

    /// Create a new track
    pub fn new(target: TrackTarget) -> Self {
        Self {
            id: TrackId::new(),
            target,
            keyframes: Vec::new(),
            muted: false,
            locked: false,
        }
    }

    /// Track name
    pub fn name(&self) -> &str {
        self.target.name()
    }

    /// Kind of keyframe this track stores
    pub fn kind(&self) -> KeyframeKind {
        self.target.kind()
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(MotionError::TrackLocked(self.name().to_string()));
        }
        Ok(())
    }

    fn index_of(&self, frame_index: u32) -> std::result::Result<usize, usize> {
        self.keyframes.binary_search_by_key(&frame_index, |k| k.frame_index)
    }

    /// Insert a keyframe, replacing the one at the same frame
    ///
    /// Returns the replaced keyframe.
    pub fn register(&mut self, keyframe: Keyframe) -> Result<Option<Keyframe>> {
        self.ensure_unlocked()?;
        if keyframe.kind() != self.kind() {
            return Err(MotionError::KindMismatch {
                expected: self.kind(),
                found: keyframe.kind(),
            });
        }

        match self.index_of(keyframe.frame_index) {
            Ok(idx) => Ok(Some(std::mem::replace(&mut self.keyframes[idx], keyframe))),
            Err(idx) => {
                self.keyframes.insert(idx, keyframe);
                Ok(None)
            }
        }
    }

    /// Remove the keyframe at a frame
    pub fn remove_at(&mut self, frame_index: u32) -> Result<Option<Keyframe>> {
        self.ensure_unlocked()?;
        Ok(self
            .index_of(frame_index)
            .ok()
            .map(|idx| self.keyframes.remove(idx)))
    }

    /// Remove a keyframe by ID
    pub fn remove(&mut self, keyframe_id: KeyframeId) -> Result<Keyframe> {
        self.ensure_unlocked()?;
        let idx = self
            .keyframes
            .iter()
            .position(|k| k.id == keyframe_id)
            .ok_or(MotionError::KeyframeNotFound(keyframe_id))?;
        Ok(self.keyframes.remove(idx))
    }

    /// Remove every keyframe
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_unlocked()?;
        self.keyframes.clear();
        Ok(())
    }

    /// Get keyframe at frame (if exists)
    pub fn keyframe_at(&self, frame_index: u32) -> Option<&Keyframe> {
        self.index_of(frame_index).ok().map(|idx| &self.keyframes[idx])
    }

    /// Edit the value of the keyframe at a frame in place
    ///
    /// Returns `None` when no keyframe sits at the frame.
    pub fn update_value_at<R>(
        &mut self,
        frame_index: u32,
        edit: impl FnOnce(&mut KeyframeValue) -> R,
    ) -> Result<Option<R>> {
        self.ensure_unlocked()?;
        let Ok(idx) = self.index_of(frame_index) else {
            return Ok(None);
        };
        let mut value = self.keyframes[idx].value.clone();
        let result = edit(&mut value);
        if value.kind() != self.kind() {
            return Err(MotionError::KindMismatch {
                expected: self.kind(),
                found: value.kind(),
            });
        }
        self.keyframes[idx].value = value;
        Ok(Some(result))
    }

    /// Get keyframe by ID
    pub fn keyframe(&self, keyframe_id: KeyframeId) -> Option<&Keyframe> {
        self.keyframes.iter().find(|k| k.id == keyframe_id)
    }

    /// Get all keyframes
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Get keyframes in a frame range
    pub fn keyframes_in_range(&self, range: FrameRange) -> &[Keyframe] {
        let start = self.keyframes.partition_point(|k| k.frame_index < range.start);
        let end = self.keyframes.partition_point(|k| k.frame_index <= range.end);
        &self.keyframes[start..end]
    }

    /// Keyframe at or before a frame, and the first one after it
    pub fn closest(&self, frame_index: u32) -> (Option<&Keyframe>, Option<&Keyframe>) {
        let idx = self.keyframes.partition_point(|k| k.frame_index <= frame_index);
        let prev = idx.checked_sub(1).map(|i| &self.keyframes[i]);
        (prev, self.keyframes.get(idx))
    }

    /// Evaluate the track value at a (fractional) frame
    pub fn evaluate(&self, frame: f32) -> Option<KeyframeValue> {
        let first = self.keyframes.first()?;
        let idx = self.keyframes.partition_point(|k| (k.frame_index as f32) <= frame);

        if idx == 0 {
            return Some(first.value.clone());
        }
        let prev = &self.keyframes[idx - 1];
        let Some(next) = self.keyframes.get(idx) else {
            return Some(prev.value.clone());
        };
        if prev.frame_index as f32 == frame {
            return Some(prev.value.clone());
        }

        let span = (next.frame_index - prev.frame_index) as f32;
        let t = (frame - prev.frame_index as f32) / span;
        prev.value.interpolate(&next.value, t)
    }

    /// Move keyframe to a new frame
    pub fn move_keyframe(&mut self, keyframe_id: KeyframeId, new_frame: u32) -> Result<()> {
        self.ensure_unlocked()?;
        let idx = self
            .keyframes
            .iter()
            .position(|k| k.id == keyframe_id)
            .ok_or(MotionError::KeyframeNotFound(keyframe_id))?;
        if self.keyframes[idx].frame_index == new_frame {
            return Ok(());
        }
        if self.keyframe_at(new_frame).is_some() {
            return Err(MotionError::FrameOccupied(new_frame));
        }

        let mut keyframe = self.keyframes.remove(idx);
        keyframe.frame_index = new_frame;
        let insert_at = self.keyframes.partition_point(|k| k.frame_index < new_frame);
        self.keyframes.insert(insert_at, keyframe);
        Ok(())
    }

    /// Shift every keyframe at or after `from_frame` by `delta` frames
    pub fn shift(&mut self, from_frame: u32, delta: i64) -> Result<()> {
        self.ensure_unlocked()?;
        if delta == 0 {
            return Ok(());
        }

        let split = self.keyframes.partition_point(|k| k.frame_index < from_frame);
        let mut shifted = Vec::with_capacity(self.keyframes.len() - split);
        for keyframe in &self.keyframes[split..] {
            let target = i64::from(keyframe.frame_index) + delta;
            if target < 0 {
                return Err(MotionError::NegativeFrame);
            }
            let target = u32::try_from(target).map_err(|_| MotionError::FrameOutOfRange)?;
            shifted.push(target);
        }
        if let Some(&lowest) = shifted.first() {
            if let Some(collision) = self.keyframes[..split].iter().find(|k| k.frame_index >= lowest) {
                return Err(MotionError::FrameOccupied(collision.frame_index));
            }
        }

        for (keyframe, target) in self.keyframes[split..].iter_mut().zip(shifted) {
            keyframe.frame_index = target;
        }
        Ok(())
    }

    /// Stretch the keyframes of a range by `factor`, anchored at the range start
    ///
    /// Keyframes after the range move with its end. When rounding lands two
    /// keyframes on the same frame, the later one wins. Returns the number
    /// of keyframes dropped that way.
    pub fn scale(&mut self, range: FrameRange, factor: f32) -> Result<usize> {
        self.ensure_unlocked()?;
        if !factor.is_finite() || factor <= 0.0 {
            return Err(MotionError::InvalidScale(factor));
        }

        let scale_offset = |offset: u32| -> Result<u32> {
            let scaled = (offset as f64 * f64::from(factor)).round();
            let frame = f64::from(range.start) + scaled;
            if frame > f64::from(u32::MAX) {
                return Err(MotionError::FrameOutOfRange);
            }
            Ok(frame as u32)
        };
        let new_end = scale_offset(range.end - range.start)?;
        let tail_delta = i64::from(new_end) - i64::from(range.end);

        let targets = self
            .keyframes
            .iter()
            .map(|keyframe| {
                let frame = keyframe.frame_index;
                if range.contains(frame) {
                    scale_offset(frame - range.start)
                } else if frame > range.end {
                    u32::try_from(i64::from(frame) + tail_delta)
                        .map_err(|_| MotionError::FrameOutOfRange)
                } else {
                    Ok(frame)
                }
            })
            .collect::<Result<Vec<u32>>>()?;

        let before = self.keyframes.len();
        let mut rebuilt = BTreeMap::new();
        for (mut keyframe, target) in std::mem::take(&mut self.keyframes).into_iter().zip(targets) {
            keyframe.frame_index = target;
            rebuilt.insert(target, keyframe);
        }
        self.keyframes = rebuilt.into_values().collect();
        Ok(before - self.keyframes.len())
    }

    /// Get the duration (frame of last keyframe)
    pub fn duration(&self) -> u32 {
        self.keyframes.last().map(|k| k.frame_index).unwrap_or(0)
    }

    /// Get keyframe count
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// Whether the track has no keyframes
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::InterpolationPreset;
    use approx::assert_relative_eq;

    fn morph_track(frames: &[(u32, f32)]) -> Track {
        let mut track = Track::new(TrackTarget::morph("あ"));
        for &(frame, weight) in frames {
            track.register(Keyframe::morph(frame, weight)).unwrap();
        }
        track
    }

    fn frames(track: &Track) -> Vec<u32> {
        track.keyframes().iter().map(|k| k.frame_index).collect()
    }

    #[test]
    fn test_register_keeps_order_and_replaces() {
        let mut track = morph_track(&[(30, 1.0), (0, 0.0), (15, 0.5)]);
        assert_eq!(frames(&track), vec![0, 15, 30]);

        let old = track.register(Keyframe::morph(15, 0.25)).unwrap();
        assert_eq!(old.and_then(|k| k.value.as_weight()), Some(0.5));
        assert_eq!(track.len(), 3);
        assert_eq!(track.keyframe_at(15).and_then(|k| k.value.as_weight()), Some(0.25));
    }

    #[test]
    fn test_register_rejects_other_kind() {
        let mut track = morph_track(&[]);
        let err = track
            .register(Keyframe::bone(0, [0.0; 3], [0.0, 0.0, 0.0, 1.0]))
            .unwrap_err();
        assert_eq!(
            err,
            MotionError::KindMismatch {
                expected: KeyframeKind::Morph,
                found: KeyframeKind::Bone
            }
        );
    }

    #[test]
    fn test_locked_track_rejects_edits() {
        let mut track = morph_track(&[(0, 0.0)]);
        track.locked = true;
        assert!(matches!(track.register(Keyframe::morph(5, 1.0)), Err(MotionError::TrackLocked(_))));
        assert!(matches!(track.remove_at(0), Err(MotionError::TrackLocked(_))));
        assert!(matches!(track.shift(0, 3), Err(MotionError::TrackLocked(_))));
        assert_eq!(track.len(), 1);
    }

    #[test]
    fn test_evaluate_holds_outside_and_interpolates_inside() {
        let track = morph_track(&[(10, 0.2), (20, 1.0)]);
        assert_eq!(track.evaluate(0.0).and_then(|v| v.as_weight()), Some(0.2));
        assert_eq!(track.evaluate(10.0).and_then(|v| v.as_weight()), Some(0.2));
        assert_eq!(track.evaluate(99.0).and_then(|v| v.as_weight()), Some(1.0));
        let mid = track.evaluate(15.0).and_then(|v| v.as_weight()).unwrap();
        assert_relative_eq!(mid, 0.6, epsilon = 1.0e-5);
        let fractional = track.evaluate(12.5).and_then(|v| v.as_weight()).unwrap();
        assert_relative_eq!(fractional, 0.4, epsilon = 1.0e-5);
        assert!(Track::new(TrackTarget::Light).evaluate(0.0).is_none());
    }

    #[test]
    fn test_evaluate_uses_preset_of_next_keyframe() {
        let mut track = morph_track(&[(0, 0.0)]);
        track
            .register(Keyframe::morph(10, 1.0).with_preset(InterpolationPreset::SCurve))
            .unwrap();
        let early = track.evaluate(2.0).and_then(|v| v.as_weight()).unwrap();
        assert!(early < 0.2);
    }

    #[test]
    fn test_closest() {
        let track = morph_track(&[(0, 0.0), (10, 1.0)]);
        let (prev, next) = track.closest(5);
        assert_eq!(prev.map(|k| k.frame_index), Some(0));
        assert_eq!(next.map(|k| k.frame_index), Some(10));
        let (prev, next) = track.closest(10);
        assert_eq!(prev.map(|k| k.frame_index), Some(10));
        assert!(next.is_none());
    }

    #[test]
    fn test_move_keyframe() {
        let mut track = morph_track(&[(0, 0.0), (10, 1.0), (20, 0.5)]);
        let id = track.keyframe_at(20).unwrap().id;
        track.move_keyframe(id, 5).unwrap();
        assert_eq!(frames(&track), vec![0, 5, 10]);
        assert_eq!(track.move_keyframe(id, 10), Err(MotionError::FrameOccupied(10)));
    }

    #[test]
    fn test_shift() {
        let mut track = morph_track(&[(0, 0.0), (10, 1.0), (20, 0.5)]);
        track.shift(10, 5).unwrap();
        assert_eq!(frames(&track), vec![0, 15, 25]);
        track.shift(15, -14).unwrap();
        assert_eq!(frames(&track), vec![0, 1, 11]);
        assert_eq!(track.shift(1, -1), Err(MotionError::FrameOccupied(0)));
        assert_eq!(track.shift(0, -1), Err(MotionError::NegativeFrame));
        assert_eq!(frames(&track), vec![0, 1, 11]);
    }

    #[test]
    fn test_update_value_at() {
        let mut track = morph_track(&[(0, 0.0), (10, 1.0)]);
        let applied = track
            .update_value_at(10, |value| {
                value.apply_preset(InterpolationPreset::SCurve, crate::keyframe::InterpolationChannel::Weight)
            })
            .unwrap();
        assert_eq!(applied, Some(true));
        assert_eq!(track.update_value_at(5, |_| ()).unwrap(), None);

        let err = track
            .update_value_at(0, |value| *value = KeyframeValue::Light(Default::default()))
            .unwrap_err();
        assert!(matches!(err, MotionError::KindMismatch { .. }));
        assert_eq!(track.keyframe_at(0).and_then(|k| k.value.as_weight()), Some(0.0));
    }

    #[test]
    fn test_keyframes_in_range() {
        let track = morph_track(&[(0, 0.0), (10, 1.0), (20, 0.5), (30, 0.1)]);
        let found: Vec<u32> = track
            .keyframes_in_range(FrameRange::new(20, 10))
            .iter()
            .map(|k| k.frame_index)
            .collect();
        assert_eq!(found, vec![10, 20]);
    }

    #[test]
    fn test_scale() {
        let mut track = morph_track(&[(0, 0.0), (10, 1.0), (20, 0.5), (30, 0.1)]);
        let dropped = track.scale(FrameRange::new(10, 20), 2.0).unwrap();
        assert_eq!(dropped, 0);
        assert_eq!(frames(&track), vec![0, 10, 30, 40]);

        let dropped = track.scale(FrameRange::new(0, 10), 0.01).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(frames(&track), vec![0, 20, 30]);
        assert_eq!(track.keyframe_at(0).and_then(|k| k.value.as_weight()), Some(1.0));
        assert_eq!(track.scale(FrameRange::new(0, 1), 0.0), Err(MotionError::InvalidScale(0.0)));
    }

    #[test]
    fn test_scale_overflow_keeps_keyframes() {
        let mut track = morph_track(&[(0, 0.0), (10, 1.0), (u32::MAX - 5, 0.5)]);
        assert_eq!(
            track.scale(FrameRange::new(0, 10), 2.0),
            Err(MotionError::FrameOutOfRange)
        );
        assert_eq!(frames(&track), vec![0, 10, u32::MAX - 5]);
    }

    #[test]
    fn test_shift_past_last_frame() {
        let mut track = morph_track(&[(0, 0.0), (u32::MAX - 1, 1.0)]);
        assert_eq!(track.shift(1, 2), Err(MotionError::FrameOutOfRange));
        assert_eq!(frames(&track), vec![0, u32::MAX - 1]);
    }

    #[test]
    fn test_from_keyframes_sorts_and_validates() {
        let track = Track::from_keyframes(
            TrackTarget::morph("あ"),
            vec![Keyframe::morph(30, 1.0), Keyframe::morph(0, 0.0)],
        )
        .unwrap();
        assert_eq!(frames(&track), vec![0, 30]);
        assert_eq!(track.keyframe_at(30).and_then(|k| k.value.as_weight()), Some(1.0));

        let duplicate = Track::from_keyframes(
            TrackTarget::morph("あ"),
            vec![Keyframe::morph(0, 0.0), Keyframe::morph(0, 1.0)],
        );
        assert_eq!(duplicate.unwrap_err(), MotionError::FrameOccupied(0));

        let mixed = Track::from_keyframes(
            TrackTarget::morph("あ"),
            vec![Keyframe::morph(0, 0.0), Keyframe::light(15, [1.0; 3], [0.0, -1.0, 0.0])],
        );
        assert_eq!(
            mixed.unwrap_err(),
            MotionError::KindMismatch {
                expected: KeyframeKind::Morph,
                found: KeyframeKind::Light
            }
        );
    }

    #[test]
    fn test_deserialize_rejects_broken_track() {
        let track = morph_track(&[(0, 0.0), (30, 1.0)]);
        let data = |keyframes: Vec<Keyframe>| TrackData {
            id: track.id,
            target: track.target.clone(),
            keyframes,
            muted: false,
            locked: true,
        };

        let restored = Track::try_from(data(track.keyframes().iter().rev().cloned().collect())).unwrap();
        assert_eq!(restored.id, track.id);
        assert!(restored.locked);
        assert_eq!(frames(&restored), vec![0, 30]);

        let mut keyframes = track.keyframes().to_vec();
        keyframes.push(Keyframe::light(15, [1.0; 3], [0.0, -1.0, 0.0]));
        assert!(Track::try_from(data(keyframes)).is_err());
    }
}
