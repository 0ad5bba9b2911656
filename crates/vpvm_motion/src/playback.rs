// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback of a motion over wall-clock time.

use crate::keyframe::KeyframeValue;
use crate::motion::Motion;
use crate::track::{FrameRange, TrackId};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Stopped
    #[default]
    Stopped,
    /// Playing forward
    Playing,
    /// Paused
    Paused,
    /// Playing in reverse
    Reverse,
}

/// Playback controller for motions
#[derive(Debug, Clone)]
pub struct PlaybackController {
    /// Current playback position in frames
    pub frame: f32,
    /// Playback state
    pub state: PlaybackState,
    /// Playback speed multiplier
    pub speed: f32,
    /// Range to loop over
    pub loop_range: Option<FrameRange>,
}

impl PlaybackController {
    /// Create a new playback controller
    pub fn new() -> Self {
        Self {
            frame: 0.0,
            state: PlaybackState::Stopped,
            speed: 1.0,
            loop_range: None,
        }
    }

    /// Update playback with delta time in seconds
    pub fn update(&mut self, delta_seconds: f32, motion: &Motion) {
        let step = motion.seconds_to_frame(delta_seconds) * self.speed;
        match self.state {
            PlaybackState::Playing => {
                self.frame += step;
                self.check_bounds(motion);
            }
            PlaybackState::Reverse => {
                self.frame -= step;
                self.check_bounds_reverse(motion);
            }
            PlaybackState::Paused | PlaybackState::Stopped => {}
        }
    }

    fn bounds(&self, motion: &Motion) -> (f32, f32) {
        match self.loop_range {
            Some(range) => (range.start as f32, range.end as f32),
            None => (0.0, motion.max_frame_index() as f32),
        }
    }

    /// Check and handle end of motion
    fn check_bounds(&mut self, motion: &Motion) {
        let (start, end) = self.bounds(motion);
        if self.frame < end {
            return;
        }
        if self.loop_range.is_some() && end > start {
            self.frame = start + (self.frame - end) % (end - start);
        } else {
            self.frame = end;
            self.state = PlaybackState::Stopped;
        }
    }

    /// Check and handle reverse playback bounds
    fn check_bounds_reverse(&mut self, motion: &Motion) {
        let (start, end) = self.bounds(motion);
        if self.frame > start {
            return;
        }
        if self.loop_range.is_some() && end > start {
            self.frame = end - (start - self.frame) % (end - start);
        } else {
            self.frame = start;
            self.state = PlaybackState::Stopped;
        }
    }

    /// Play from current position
    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    /// Pause playback
    pub fn pause(&mut self) {
        if self.is_playing() {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stop and reset to beginning
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.frame = self.loop_range.map(|r| r.start as f32).unwrap_or(0.0);
    }

    /// Toggle play/pause
    pub fn toggle(&mut self) {
        match self.state {
            PlaybackState::Playing | PlaybackState::Reverse => self.pause(),
            PlaybackState::Paused | PlaybackState::Stopped => self.play(),
        }
    }

    /// Play in reverse
    pub fn play_reverse(&mut self) {
        self.state = PlaybackState::Reverse;
    }

    /// Seek to a frame
    pub fn seek(&mut self, frame: f32) {
        self.frame = frame.max(0.0);
    }

    /// Set loop range
    pub fn set_loop_range(&mut self, range: FrameRange) {
        self.loop_range = Some(range);
    }

    /// Clear loop range
    pub fn clear_loop_range(&mut self) {
        self.loop_range = None;
    }

    /// Is currently playing (forward or reverse)
    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing | PlaybackState::Reverse)
    }

    /// Whole frame under the playhead
    pub fn current_frame(&self) -> u32 {
        self.frame.floor() as u32
    }

    /// Evaluate all tracks at the playhead
    pub fn evaluate(&self, motion: &Motion) -> Vec<(TrackId, KeyframeValue)> {
        motion.evaluate(self.frame)
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}
