// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline editing state.
//!
//! Features:
//! - Current frame index
//! - Keyframe selection and frame range selection
//! - Copy and (mirrored) paste planning
//!
//! The timeline never mutates a motion itself: it computes which keyframes
//! an operation touches and the editor applies that through undoable
//! commands.

use crate::binding::TrackTarget;
use crate::keyframe::{Keyframe, KeyframeValue};
use crate::motion::Motion;
use crate::track::{FrameRange, TrackId};
use serde::{Deserialize, Serialize};

/// Reference to a keyframe by track and frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyframeRef {
    /// Owning track
    pub track: TrackId,
    /// Frame of the keyframe
    pub frame_index: u32,
}

impl KeyframeRef {
    /// Create a keyframe reference
    pub fn new(track: TrackId, frame_index: u32) -> Self {
        Self { track, frame_index }
    }
}

/// Copied keyframe, positioned relative to the earliest copied frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardEntry {
    /// Where the keyframe came from
    pub target: TrackTarget,
    /// Frames after the start of the copied block
    pub offset: u32,
    /// Copied value
    pub value: KeyframeValue,
}

/// Keyframes copied from a motion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clipboard {
    /// Copied keyframes
    pub entries: Vec<ClipboardEntry>,
}

impl Clipboard {
    /// Whether nothing was copied
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of copied keyframes
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A keyframe the paste operation will register
#[derive(Debug, Clone, PartialEq)]
pub struct PastedKeyframe {
    /// Destination parameter
    pub target: TrackTarget,
    /// Keyframe to register
    pub keyframe: Keyframe,
}

/// Timeline editing state
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    /// Frame under the cursor
    pub current_frame: u32,
    /// Selected keyframes, in selection order
    selection: Vec<KeyframeRef>,
    /// Selected frame range
    pub range: Option<FrameRange>,
    /// Last copied keyframes
    clipboard: Clipboard,
}

impl Timeline {
    /// Create an empty timeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the cursor to a frame
    pub fn seek(&mut self, frame: u32) {
        self.current_frame = frame;
    }

    /// Move the cursor by a number of frames, stopping at 0
    pub fn step(&mut self, delta: i64) {
        let target = (i64::from(self.current_frame) + delta).clamp(0, i64::from(u32::MAX));
        self.current_frame = target as u32;
    }

    /// Currently selected keyframe references
    pub fn selection(&self) -> &[KeyframeRef] {
        &self.selection
    }

    /// Whether a keyframe is selected
    pub fn is_selected(&self, keyframe: &KeyframeRef) -> bool {
        self.selection.contains(keyframe)
    }

    /// Add a keyframe to the selection (idempotent)
    pub fn select(&mut self, keyframe: KeyframeRef) {
        if !self.is_selected(&keyframe) {
            self.selection.push(keyframe);
        }
    }

    /// Remove a keyframe from the selection
    pub fn deselect(&mut self, keyframe: &KeyframeRef) {
        self.selection.retain(|k| k != keyframe);
    }

    /// Toggle a keyframe in the selection
    pub fn toggle(&mut self, keyframe: KeyframeRef) {
        if self.is_selected(&keyframe) {
            self.deselect(&keyframe);
        } else {
            self.select(keyframe);
        }
    }

    /// Clear the selection
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Replace the selection
    pub fn set_selection(&mut self, selection: Vec<KeyframeRef>) {
        self.selection.clear();
        for keyframe in selection {
            self.select(keyframe);
        }
    }

    /// Select every keyframe of unlocked tracks inside a frame range
    pub fn select_range(&mut self, motion: &Motion, range: FrameRange) {
        self.range = Some(range);
        self.selection = motion
            .tracks()
            .filter(|t| !t.locked)
            .flat_map(|t| {
                t.keyframes_in_range(range)
                    .iter()
                    .map(move |k| KeyframeRef::new(t.id, k.frame_index))
            })
            .collect();
    }

    /// Select every keyframe of unlocked tracks
    pub fn select_all(&mut self, motion: &Motion) {
        self.select_range(motion, FrameRange::new(0, u32::MAX));
        self.range = None;
    }

    /// Drop references to keyframes that no longer exist
    pub fn prune(&mut self, motion: &Motion) {
        self.selection.retain(|r| {
            motion
                .track(r.track)
                .is_some_and(|t| t.keyframe_at(r.frame_index).is_some())
        });
    }

    /// Resolve the selection against a motion, skipping stale references
    pub fn selected_keyframes<'a>(&self, motion: &'a Motion) -> Vec<(TrackId, &'a Keyframe)> {
        self.selection
            .iter()
            .filter_map(|r| {
                let track = motion.track(r.track)?;
                track.keyframe_at(r.frame_index).map(|k| (track.id, k))
            })
            .collect()
    }

    /// Copy the selected keyframes
    ///
    /// Returns the number of keyframes copied.
    pub fn copy(&mut self, motion: &Motion) -> usize {
        let selected = self.selected_keyframes(motion);
        let Some(base) = selected.iter().map(|(_, k)| k.frame_index).min() else {
            return 0;
        };

        let mut entries: Vec<ClipboardEntry> = selected
            .into_iter()
            .filter_map(|(track_id, keyframe)| {
                let track = motion.track(track_id)?;
                Some(ClipboardEntry {
                    target: track.target.clone(),
                    offset: keyframe.frame_index - base,
                    value: keyframe.value.clone(),
                })
            })
            .collect();
        entries.sort_by_key(|e| e.offset);

        self.clipboard = Clipboard { entries };
        tracing::debug!("Copied {} keyframes", self.clipboard.len());
        self.clipboard.len()
    }

    /// Last copied keyframes
    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    /// Keyframes a paste at the current frame would register
    ///
    /// With `reversed`, bone keyframes land on the opposite-side bone with
    /// a mirrored pose.
    pub fn paste_plan(&self, reversed: bool) -> Vec<PastedKeyframe> {
        self.clipboard
            .entries
            .iter()
            .filter_map(|entry| {
                let frame = self.current_frame.checked_add(entry.offset)?;
                let (target, value) = if reversed {
                    (entry.target.mirrored(), entry.value.mirrored())
                } else {
                    (entry.target.clone(), entry.value.clone())
                };
                Some(PastedKeyframe {
                    target,
                    keyframe: Keyframe::new(frame, value),
                })
            })
            .collect()
    }
}
