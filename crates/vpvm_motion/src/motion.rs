// SPDX-License-Identifier: MIT OR Apache-2.0
//! Motion containing the tracks of one model, or of the camera and light.

use crate::binding::{ModelId, TrackTarget};
use crate::keyframe::KeyframeValue;
use crate::track::{Track, TrackId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default motion frame rate
pub const DEFAULT_FRAME_RATE: f32 = 30.0;

/// Unique identifier for a motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MotionId(pub Uuid);

impl MotionId {
    /// Create a new random motion ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MotionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A motion: an ordered set of tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    /// Unique motion ID
    pub id: MotionId,
    /// Motion name
    pub name: String,
    /// Model the bone and morph tracks drive (`None` for camera/light motions)
    pub model: Option<ModelId>,
    /// Tracks in this motion
    tracks: IndexMap<TrackId, Track>,
    /// Frame rate
    pub frame_rate: f32,
}

impl Motion {
    /// Create a new motion
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: MotionId::new(),
            name: name.into(),
            model: None,
            tracks: IndexMap::new(),
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }

    /// Create a motion bound to a model
    pub fn for_model(name: impl Into<String>, model: ModelId) -> Self {
        Self {
            model: Some(model),
            ..Self::new(name)
        }
    }

    /// Add a track
    pub fn add_track(&mut self, track: Track) -> TrackId {
        let id = track.id;
        self.tracks.insert(id, track);
        id
    }

    /// Remove a track, keeping the order of the others
    pub fn remove_track(&mut self, track_id: TrackId) -> Option<Track> {
        self.tracks.shift_remove(&track_id)
    }

    /// Position of a track in display order
    pub fn track_position(&self, track_id: TrackId) -> Option<usize> {
        self.tracks.get_index_of(&track_id)
    }

    /// Put a track back at `position`, or drop it when `track` is `None`
    ///
    /// A track that still exists is replaced in place.
    pub fn restore_track(&mut self, track_id: TrackId, position: usize, track: Option<Track>) {
        match track {
            Some(track) if self.tracks.contains_key(&track_id) => {
                self.tracks.insert(track_id, track);
            }
            Some(track) => {
                let position = position.min(self.tracks.len());
                self.tracks.shift_insert(position, track_id, track);
            }
            None => {
                self.tracks.shift_remove(&track_id);
            }
        }
    }

    /// Get a track
    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// Get a mutable track
    pub fn track_mut(&mut self, track_id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(&track_id)
    }

    /// Find the track animating a target
    pub fn find_track(&self, target: &TrackTarget) -> Option<&Track> {
        self.tracks.values().find(|t| &t.target == target)
    }

    /// Get the track animating a target, creating it on demand
    pub fn track_for(&mut self, target: &TrackTarget) -> &mut Track {
        let existing = self
            .tracks
            .values()
            .find(|t| &t.target == target)
            .map(|t| t.id);
        let id = match existing {
            Some(id) => id,
            None => self.add_track(Track::new(target.clone())),
        };
        &mut self.tracks[&id]
    }

    /// Get all tracks
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Get all tracks mutably
    pub fn tracks_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.tracks.values_mut()
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Total keyframes over every track
    pub fn keyframe_count(&self) -> usize {
        self.tracks.values().map(Track::len).sum()
    }

    /// Last frame holding a keyframe
    pub fn max_frame_index(&self) -> u32 {
        self.tracks.values().map(Track::duration).max().unwrap_or(0)
    }

    /// Evaluate every unmuted track at a frame
    pub fn evaluate(&self, frame: f32) -> Vec<(TrackId, KeyframeValue)> {
        self.tracks
            .values()
            .filter(|t| !t.muted)
            .filter_map(|t| t.evaluate(frame).map(|value| (t.id, value)))
            .collect()
    }

    /// Convert a frame position to seconds
    pub fn frame_to_seconds(&self, frame: f32) -> f32 {
        frame / self.frame_rate
    }

    /// Convert seconds to a frame position
    pub fn seconds_to_frame(&self, seconds: f32) -> f32 {
        seconds * self.frame_rate
    }
}

impl Default for Motion {
    fn default() -> Self {
        Self::new("Untitled Motion")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::Keyframe;

    #[test]
    fn test_track_for_creates_once() {
        let mut motion = Motion::new("dance");
        let target = TrackTarget::bone("センター");
        let first = motion.track_for(&target).id;
        let second = motion.track_for(&target).id;
        assert_eq!(first, second);
        assert_eq!(motion.track_count(), 1);
    }

    #[test]
    fn test_counts_and_duration() {
        let mut motion = Motion::new("dance");
        motion.track_for(&TrackTarget::morph("あ")).register(Keyframe::morph(40, 1.0)).unwrap();
        let bone = motion.track_for(&TrackTarget::bone("頭"));
        bone.register(Keyframe::bone(0, [0.0; 3], [0.0, 0.0, 0.0, 1.0])).unwrap();
        bone.register(Keyframe::bone(10, [0.0; 3], [0.0, 0.0, 0.0, 1.0])).unwrap();
        assert_eq!(motion.keyframe_count(), 3);
        assert_eq!(motion.max_frame_index(), 40);
    }

    #[test]
    fn test_evaluate_skips_muted() {
        let mut motion = Motion::new("face");
        motion.track_for(&TrackTarget::morph("あ")).register(Keyframe::morph(0, 1.0)).unwrap();
        let muted = motion.track_for(&TrackTarget::morph("い"));
        muted.register(Keyframe::morph(0, 1.0)).unwrap();
        muted.muted = true;
        assert_eq!(motion.evaluate(0.0).len(), 1);
    }

    #[test]
    fn test_restore_track_keeps_order() {
        let mut motion = Motion::new("order");
        let a = motion.add_track(Track::new(TrackTarget::bone("a")));
        let b = motion.add_track(Track::new(TrackTarget::bone("b")));
        let position = motion.track_position(a).unwrap();
        let removed = motion.remove_track(a);
        motion.restore_track(a, position, removed);
        let order: Vec<TrackId> = motion.tracks().map(|t| t.id).collect();
        assert_eq!(order, vec![a, b]);
        motion.restore_track(b, 0, None);
        assert_eq!(motion.track_count(), 1);
    }

    #[test]
    fn test_time_conversion() {
        let motion = Motion::new("t");
        assert_eq!(motion.frame_to_seconds(60.0), 2.0);
        assert_eq!(motion.seconds_to_frame(0.5), 15.0);
    }
}
