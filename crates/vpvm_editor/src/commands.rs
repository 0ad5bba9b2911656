// SPDX-License-Identifier: MIT OR Apache-2.0
//! Motion editing commands for undo/redo support.
//!
//! A command mutates one motion. The editor runs it against a copy of the
//! motion, diffs the tracks it touched and stores the before/after track
//! snapshots in the history. A failing command therefore never leaves a
//! half-applied edit behind.

use crate::history::{HistoryError, Operation, OperationID, StateSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vpvm_motion::{
    FrameRange, InterpolationChannel, InterpolationPreset, Keyframe, KeyframeKind, KeyframeRef,
    Motion, MotionError, MotionId, PastedKeyframe, Track, TrackId, TrackTarget,
};

/// Trait for motion edits that can be undone/redone
pub trait MotionCommand: Send + Sync {
    /// Get a description of this command
    fn description(&self) -> String;

    /// Motion the command edits
    fn motion(&self) -> MotionId;

    /// Execute the command
    fn execute(&self, motion: &mut Motion) -> Result<(), CommandError>;
}

/// Error type for command execution
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// History error
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// Motion edit rejected
    #[error(transparent)]
    Motion(#[from] MotionError),

    /// Motion not found
    #[error("Motion not found: {0:?}")]
    MotionNotFound(MotionId),

    /// Track not found
    #[error("Track not found: {0:?}")]
    TrackNotFound(TrackId),

    /// No motion is active in the editor
    #[error("No active motion")]
    NoActiveMotion,

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Stored state of one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    /// Track ID
    pub track_id: TrackId,
    /// Position of the track in the motion
    pub position: usize,
    /// Track contents, `None` when the track does not exist
    pub track: Option<Track>,
}

/// Track snapshots of one motion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSnapshot {
    /// Motion the tracks belong to
    pub motion: MotionId,
    /// Snapshots of the affected tracks
    pub tracks: Vec<TrackSnapshot>,
}

impl MotionSnapshot {
    /// Write the snapshot back into a motion
    pub fn restore(&self, motion: &mut Motion) {
        for snapshot in self.tracks.iter().filter(|s| s.track.is_none()) {
            motion.restore_track(snapshot.track_id, snapshot.position, None);
        }
        let mut present: Vec<&TrackSnapshot> =
            self.tracks.iter().filter(|s| s.track.is_some()).collect();
        present.sort_by_key(|s| s.position);
        for snapshot in present {
            motion.restore_track(snapshot.track_id, snapshot.position, snapshot.track.clone());
        }
    }
}

/// Snapshot the tracks that differ between two versions of a motion
///
/// Returns `None` when nothing changed.
pub fn diff_tracks(before: &Motion, after: &Motion) -> Option<(MotionSnapshot, MotionSnapshot)> {
    let mut changed: Vec<TrackId> = after
        .tracks()
        .filter(|t| before.track(t.id) != Some(t))
        .map(|t| t.id)
        .collect();
    changed.extend(
        before
            .tracks()
            .filter(|t| after.track(t.id).is_none())
            .map(|t| t.id),
    );
    if changed.is_empty() {
        return None;
    }

    let snapshot = |motion: &Motion, other: &Motion| MotionSnapshot {
        motion: motion.id,
        tracks: changed
            .iter()
            .map(|&id| TrackSnapshot {
                track_id: id,
                position: motion
                    .track_position(id)
                    .or_else(|| other.track_position(id))
                    .unwrap_or(0),
                track: motion.track(id).cloned(),
            })
            .collect(),
    };
    Some((snapshot(before, after), snapshot(after, before)))
}

/// Build the history operation for an executed command
///
/// Returns `None` when the command changed nothing.
pub fn to_operation(
    id: OperationID,
    description: String,
    before: &Motion,
    after: &Motion,
) -> Result<Option<Operation>, CommandError> {
    let Some((before, after)) = diff_tracks(before, after) else {
        return Ok(None);
    };
    Ok(Some(Operation::new(
        id,
        description,
        StateSnapshot::from_value(&before)?,
        StateSnapshot::from_value(&after)?,
    )))
}

fn check_target(motion: &Motion, target: &TrackTarget) -> Result<(), CommandError> {
    let model_kind = matches!(target.kind(), KeyframeKind::Bone | KeyframeKind::Morph);
    if model_kind != motion.model.is_some() {
        return Err(CommandError::InvalidOperation(format!(
            "{} track '{}' does not belong in motion '{}'",
            target.kind().name(),
            target.name(),
            motion.name
        )));
    }
    Ok(())
}

fn track_mut(motion: &mut Motion, track_id: TrackId) -> Result<&mut Track, CommandError> {
    motion
        .track_mut(track_id)
        .ok_or(CommandError::TrackNotFound(track_id))
}

fn group_by_track(keyframes: &[KeyframeRef]) -> BTreeMap<TrackId, Vec<u32>> {
    let mut grouped: BTreeMap<TrackId, Vec<u32>> = BTreeMap::new();
    for r in keyframes {
        grouped.entry(r.track).or_default().push(r.frame_index);
    }
    for frames in grouped.values_mut() {
        frames.sort_unstable();
        frames.dedup();
    }
    grouped
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Command to insert or replace keyframes, creating tracks on demand
#[derive(Debug, Clone)]
pub struct RegisterKeyframesCommand {
    /// Edited motion
    pub motion: MotionId,
    /// Keyframes and the parameters they animate
    pub keyframes: Vec<PastedKeyframe>,
}

impl RegisterKeyframesCommand {
    /// Create a new register command
    pub fn new(motion: MotionId, keyframes: Vec<PastedKeyframe>) -> Self {
        Self { motion, keyframes }
    }

    /// Register a single keyframe
    pub fn single(motion: MotionId, target: TrackTarget, keyframe: Keyframe) -> Self {
        Self::new(motion, vec![PastedKeyframe { target, keyframe }])
    }
}

impl MotionCommand for RegisterKeyframesCommand {
    fn description(&self) -> String {
        format!("Register {} keyframe{}", self.keyframes.len(), plural(self.keyframes.len()))
    }

    fn motion(&self) -> MotionId {
        self.motion
    }

    fn execute(&self, motion: &mut Motion) -> Result<(), CommandError> {
        for pasted in &self.keyframes {
            check_target(motion, &pasted.target)?;
            motion
                .track_for(&pasted.target)
                .register(pasted.keyframe.clone())?;
        }
        Ok(())
    }
}

/// Command to delete keyframes
#[derive(Debug, Clone)]
pub struct RemoveKeyframesCommand {
    /// Edited motion
    pub motion: MotionId,
    /// Keyframes to delete
    pub keyframes: Vec<KeyframeRef>,
}

impl RemoveKeyframesCommand {
    /// Create a new remove command
    pub fn new(motion: MotionId, keyframes: Vec<KeyframeRef>) -> Self {
        Self { motion, keyframes }
    }
}

impl MotionCommand for RemoveKeyframesCommand {
    fn description(&self) -> String {
        format!("Delete {} keyframe{}", self.keyframes.len(), plural(self.keyframes.len()))
    }

    fn motion(&self) -> MotionId {
        self.motion
    }

    fn execute(&self, motion: &mut Motion) -> Result<(), CommandError> {
        for (track_id, frames) in group_by_track(&self.keyframes) {
            let track = track_mut(motion, track_id)?;
            for frame in frames {
                track.remove_at(frame)?;
            }
        }
        Ok(())
    }
}

/// Command to move keyframes by a frame delta
#[derive(Debug, Clone)]
pub struct MoveKeyframesCommand {
    /// Edited motion
    pub motion: MotionId,
    /// Keyframes to move
    pub keyframes: Vec<KeyframeRef>,
    /// Frames to move by
    pub delta: i64,
}

impl MoveKeyframesCommand {
    /// Create a new move command
    pub fn new(motion: MotionId, keyframes: Vec<KeyframeRef>, delta: i64) -> Self {
        Self {
            motion,
            keyframes,
            delta,
        }
    }

    /// Where the moved keyframes end up
    pub fn moved_refs(&self) -> Vec<KeyframeRef> {
        self.keyframes
            .iter()
            .filter_map(|r| {
                let frame = u32::try_from(i64::from(r.frame_index) + self.delta).ok()?;
                Some(KeyframeRef::new(r.track, frame))
            })
            .collect()
    }
}

impl MotionCommand for MoveKeyframesCommand {
    fn description(&self) -> String {
        format!("Move {} keyframe{}", self.keyframes.len(), plural(self.keyframes.len()))
    }

    fn motion(&self) -> MotionId {
        self.motion
    }

    fn execute(&self, motion: &mut Motion) -> Result<(), CommandError> {
        if self.delta == 0 {
            return Ok(());
        }
        for (track_id, frames) in group_by_track(&self.keyframes) {
            let track = track_mut(motion, track_id)?;
            let mut lifted = Vec::with_capacity(frames.len());
            for frame in frames {
                if let Some(keyframe) = track.remove_at(frame)? {
                    lifted.push(keyframe);
                }
            }
            for mut keyframe in lifted {
                let target = i64::from(keyframe.frame_index) + self.delta;
                if target < 0 {
                    return Err(MotionError::NegativeFrame.into());
                }
                let target = u32::try_from(target).map_err(|_| MotionError::FrameOutOfRange)?;
                if track.keyframe_at(target).is_some() {
                    return Err(MotionError::FrameOccupied(target).into());
                }
                keyframe.frame_index = target;
                track.register(keyframe)?;
            }
        }
        Ok(())
    }
}

/// Command to apply an interpolation preset to keyframes
#[derive(Debug, Clone)]
pub struct SetInterpolationCommand {
    /// Edited motion
    pub motion: MotionId,
    /// Keyframes whose incoming segment is reshaped
    pub keyframes: Vec<KeyframeRef>,
    /// Preset to apply
    pub preset: InterpolationPreset,
    /// Channel(s) to change
    pub channel: InterpolationChannel,
}

impl SetInterpolationCommand {
    /// Create a new interpolation command
    pub fn new(
        motion: MotionId,
        keyframes: Vec<KeyframeRef>,
        preset: InterpolationPreset,
        channel: InterpolationChannel,
    ) -> Self {
        Self {
            motion,
            keyframes,
            preset,
            channel,
        }
    }
}

impl MotionCommand for SetInterpolationCommand {
    fn description(&self) -> String {
        format!("Set interpolation: {}", self.preset.name())
    }

    fn motion(&self) -> MotionId {
        self.motion
    }

    fn execute(&self, motion: &mut Motion) -> Result<(), CommandError> {
        for (track_id, frames) in group_by_track(&self.keyframes) {
            let track = track_mut(motion, track_id)?;
            for frame in frames {
                track.update_value_at(frame, |value| value.apply_preset(self.preset, self.channel))?;
            }
        }
        Ok(())
    }
}

/// Command to insert an empty frame, pushing later keyframes back
#[derive(Debug, Clone)]
pub struct InsertFrameCommand {
    /// Edited motion
    pub motion: MotionId,
    /// Frame to insert at
    pub frame: u32,
}

impl InsertFrameCommand {
    /// Create a new insert-frame command
    pub fn new(motion: MotionId, frame: u32) -> Self {
        Self { motion, frame }
    }
}

impl MotionCommand for InsertFrameCommand {
    fn description(&self) -> String {
        format!("Insert frame {}", self.frame)
    }

    fn motion(&self) -> MotionId {
        self.motion
    }

    fn execute(&self, motion: &mut Motion) -> Result<(), CommandError> {
        for track in motion.tracks_mut().filter(|t| !t.locked) {
            track.shift(self.frame, 1)?;
        }
        Ok(())
    }
}

/// Command to delete a frame, removing its keyframes and pulling later ones forward
#[derive(Debug, Clone)]
pub struct DeleteFrameCommand {
    /// Edited motion
    pub motion: MotionId,
    /// Frame to delete
    pub frame: u32,
}

impl DeleteFrameCommand {
    /// Create a new delete-frame command
    pub fn new(motion: MotionId, frame: u32) -> Self {
        Self { motion, frame }
    }
}

impl MotionCommand for DeleteFrameCommand {
    fn description(&self) -> String {
        format!("Delete frame {}", self.frame)
    }

    fn motion(&self) -> MotionId {
        self.motion
    }

    fn execute(&self, motion: &mut Motion) -> Result<(), CommandError> {
        for track in motion.tracks_mut().filter(|t| !t.locked) {
            track.remove_at(self.frame)?;
            if let Some(next) = self.frame.checked_add(1) {
                track.shift(next, -1)?;
            }
        }
        Ok(())
    }
}

/// Command to stretch or compress the keyframes of a frame range
#[derive(Debug, Clone)]
pub struct ScaleKeyframesCommand {
    /// Edited motion
    pub motion: MotionId,
    /// Range to scale
    pub range: FrameRange,
    /// Scale factor
    pub factor: f32,
}

impl ScaleKeyframesCommand {
    /// Create a new scale command
    pub fn new(motion: MotionId, range: FrameRange, factor: f32) -> Self {
        Self {
            motion,
            range,
            factor,
        }
    }
}

impl MotionCommand for ScaleKeyframesCommand {
    fn description(&self) -> String {
        format!(
            "Scale frames {}-{} by {}",
            self.range.start, self.range.end, self.factor
        )
    }

    fn motion(&self) -> MotionId {
        self.motion
    }

    fn execute(&self, motion: &mut Motion) -> Result<(), CommandError> {
        let mut dropped = 0;
        for track in motion.tracks_mut().filter(|t| !t.locked) {
            dropped += track.scale(self.range, self.factor)?;
        }
        if dropped > 0 {
            tracing::debug!("Scaling merged {} keyframes", dropped);
        }
        Ok(())
    }
}

/// Command to add an empty track
#[derive(Debug, Clone)]
pub struct AddTrackCommand {
    /// Edited motion
    pub motion: MotionId,
    /// Parameter the new track animates
    pub target: TrackTarget,
}

impl AddTrackCommand {
    /// Create a new add-track command
    pub fn new(motion: MotionId, target: TrackTarget) -> Self {
        Self { motion, target }
    }
}

impl MotionCommand for AddTrackCommand {
    fn description(&self) -> String {
        format!("Add track {}", self.target.name())
    }

    fn motion(&self) -> MotionId {
        self.motion
    }

    fn execute(&self, motion: &mut Motion) -> Result<(), CommandError> {
        check_target(motion, &self.target)?;
        if motion.find_track(&self.target).is_some() {
            return Err(CommandError::InvalidOperation(format!(
                "Track '{}' already exists",
                self.target.name()
            )));
        }
        motion.add_track(Track::new(self.target.clone()));
        Ok(())
    }
}

/// Command to remove a track with all its keyframes
#[derive(Debug, Clone)]
pub struct RemoveTrackCommand {
    /// Edited motion
    pub motion: MotionId,
    /// Track to remove
    pub track: TrackId,
}

impl RemoveTrackCommand {
    /// Create a new remove-track command
    pub fn new(motion: MotionId, track: TrackId) -> Self {
        Self { motion, track }
    }
}

impl MotionCommand for RemoveTrackCommand {
    fn description(&self) -> String {
        "Remove track".to_string()
    }

    fn motion(&self) -> MotionId {
        self.motion
    }

    fn execute(&self, motion: &mut Motion) -> Result<(), CommandError> {
        let track = motion
            .track(self.track)
            .ok_or(CommandError::TrackNotFound(self.track))?;
        if track.locked {
            return Err(MotionError::TrackLocked(track.name().to_string()).into());
        }
        motion.remove_track(self.track);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpvm_motion::ModelId;

    fn motion() -> (Motion, TrackId) {
        let mut motion = Motion::for_model("dance", ModelId::new());
        let track = motion.track_for(&TrackTarget::bone("センター"));
        for frame in [0, 10, 20] {
            track
                .register(Keyframe::bone(frame, [frame as f32, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]))
                .unwrap();
        }
        let id = track.id;
        (motion, id)
    }

    fn frames(motion: &Motion, track: TrackId) -> Vec<u32> {
        motion
            .track(track)
            .unwrap()
            .keyframes()
            .iter()
            .map(|k| k.frame_index)
            .collect()
    }

    #[test]
    fn test_register_creates_track() {
        let (mut motion, _) = motion();
        let command =
            RegisterKeyframesCommand::single(motion.id, TrackTarget::morph("まばたき"), Keyframe::morph(5, 1.0));
        command.execute(&mut motion).unwrap();
        assert_eq!(motion.track_count(), 2);
        assert_eq!(command.description(), "Register 1 keyframe");
    }

    #[test]
    fn test_register_rejects_camera_in_model_motion() {
        let (mut motion, _) = motion();
        let command = RegisterKeyframesCommand::single(
            motion.id,
            TrackTarget::Camera,
            Keyframe::camera(0, Default::default()),
        );
        assert!(matches!(
            command.execute(&mut motion),
            Err(CommandError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_move_keyframes_together() {
        let (mut motion, track) = motion();
        let refs = vec![KeyframeRef::new(track, 0), KeyframeRef::new(track, 10)];
        let command = MoveKeyframesCommand::new(motion.id, refs, 10);
        command.execute(&mut motion).unwrap_err();

        let (mut motion, track) = self::motion();
        let refs = vec![KeyframeRef::new(track, 10), KeyframeRef::new(track, 20)];
        let command = MoveKeyframesCommand::new(motion.id, refs, 5);
        command.execute(&mut motion).unwrap();
        assert_eq!(frames(&motion, track), vec![0, 15, 25]);
        assert_eq!(
            command.moved_refs(),
            vec![KeyframeRef::new(track, 15), KeyframeRef::new(track, 25)]
        );
    }

    #[test]
    fn test_move_rejects_negative() {
        let (mut motion, track) = motion();
        let command = MoveKeyframesCommand::new(motion.id, vec![KeyframeRef::new(track, 10)], -11);
        assert!(matches!(
            command.execute(&mut motion),
            Err(CommandError::Motion(MotionError::NegativeFrame))
        ));
    }

    #[test]
    fn test_insert_and_delete_frame() {
        let (mut motion, track) = motion();
        InsertFrameCommand::new(motion.id, 5).execute(&mut motion).unwrap();
        assert_eq!(frames(&motion, track), vec![0, 11, 21]);
        DeleteFrameCommand::new(motion.id, 11).execute(&mut motion).unwrap();
        assert_eq!(frames(&motion, track), vec![0, 20]);
    }

    #[test]
    fn test_frame_edits_skip_locked_tracks() {
        let (mut motion, track) = motion();
        let locked = motion.track_for(&TrackTarget::bone("頭"));
        locked
            .register(Keyframe::bone(10, [0.0; 3], [0.0, 0.0, 0.0, 1.0]))
            .unwrap();
        locked.locked = true;
        let locked = locked.id;

        InsertFrameCommand::new(motion.id, 5).execute(&mut motion).unwrap();
        assert_eq!(frames(&motion, track), vec![0, 11, 21]);
        DeleteFrameCommand::new(motion.id, 11).execute(&mut motion).unwrap();
        assert_eq!(frames(&motion, track), vec![0, 20]);
        ScaleKeyframesCommand::new(motion.id, FrameRange::new(0, 20), 2.0)
            .execute(&mut motion)
            .unwrap();
        assert_eq!(frames(&motion, track), vec![0, 40]);
        assert_eq!(frames(&motion, locked), vec![10]);

        let command = RemoveTrackCommand::new(motion.id, locked);
        assert!(matches!(
            command.execute(&mut motion),
            Err(CommandError::Motion(MotionError::TrackLocked(_)))
        ));
    }

    #[test]
    fn test_frame_edits_past_last_frame_fail() {
        let (mut motion, track) = motion();
        motion
            .track_mut(track)
            .unwrap()
            .register(Keyframe::bone(u32::MAX, [0.0; 3], [0.0, 0.0, 0.0, 1.0]))
            .unwrap();
        assert!(matches!(
            InsertFrameCommand::new(motion.id, 5).execute(&mut motion),
            Err(CommandError::Motion(MotionError::FrameOutOfRange))
        ));
        assert!(matches!(
            ScaleKeyframesCommand::new(motion.id, FrameRange::new(0, 20), 2.0).execute(&mut motion),
            Err(CommandError::Motion(MotionError::FrameOutOfRange))
        ));
        assert_eq!(frames(&motion, track), vec![0, 10, 20, u32::MAX]);
    }

    #[test]
    fn test_set_interpolation() {
        let (mut motion, track) = motion();
        let command = SetInterpolationCommand::new(
            motion.id,
            vec![KeyframeRef::new(track, 10)],
            InterpolationPreset::SCurve,
            InterpolationChannel::Rotation,
        );
        command.execute(&mut motion).unwrap();
        let value = &motion.track(track).unwrap().keyframe_at(10).unwrap().value;
        assert_eq!(
            value.curve(InterpolationChannel::Rotation),
            Some(InterpolationPreset::SCurve.curve())
        );
        assert_eq!(
            value.curve(InterpolationChannel::X),
            Some(InterpolationPreset::Linear.curve())
        );
    }

    #[test]
    fn test_add_duplicate_track_fails() {
        let (mut motion, _) = motion();
        let command = AddTrackCommand::new(motion.id, TrackTarget::bone("センター"));
        assert!(command.execute(&mut motion).is_err());
    }

    #[test]
    fn test_diff_and_restore_removed_track() {
        let (original, track) = motion();
        let mut edited = original.clone();
        edited.add_track(Track::new(TrackTarget::bone("頭")));
        RemoveTrackCommand::new(edited.id, track).execute(&mut edited).unwrap();

        let (before, after) = diff_tracks(&original, &edited).unwrap();
        assert_eq!(before.tracks.len(), 2);

        let mut restored = edited.clone();
        before.restore(&mut restored);
        assert_eq!(restored, original);
        after.restore(&mut restored);
        assert_eq!(restored, edited);
    }

    #[test]
    fn test_unchanged_motion_has_no_operation() {
        let (motion, _) = motion();
        let id = crate::history::History::new().begin_operation();
        let op = to_operation(id, "noop".to_string(), &motion, &motion).unwrap();
        assert!(op.is_none());
    }
}
