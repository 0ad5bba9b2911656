// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor state management.
//!
//! This module ties the project, the timeline and the undo/redo history
//! together. Every motion edit goes through [`EditorState::apply`].

use crate::commands::{
    to_operation, CommandError, DeleteFrameCommand, InsertFrameCommand, MotionCommand,
    MotionSnapshot, MoveKeyframesCommand, RegisterKeyframesCommand, RemoveKeyframesCommand,
    ScaleKeyframesCommand, SetInterpolationCommand,
};
use crate::config::EditorConfig;
use crate::history::{History, HistoryError, OperationGroup};
use crate::project::{self, Project, ProjectError};
use std::path::{Path, PathBuf};
use vpvm_motion::{
    FrameRange, InterpolationChannel, InterpolationPreset, Keyframe, KeyframeRef, KeyframeValue, ModelId,
    Motion, MotionId, PlaybackController, Timeline, TrackId, TrackTarget,
};

/// Main editor state
pub struct EditorState {
    /// Project being edited
    pub project: Project,

    /// Current project file path
    pub project_path: Option<PathBuf>,

    /// Undo/redo history
    pub history: History,

    /// Cursor, selection and clipboard
    pub timeline: Timeline,

    /// Playback of the active motion
    pub playback: PlaybackController,

    /// Motion shown in the timeline
    pub active_motion: Option<MotionId>,

    /// Editor configuration
    pub config: EditorConfig,

    /// Whether the project changed outside of the undo history
    dirty: bool,
}

impl EditorState {
    /// Create a new editor state with an empty project
    pub fn new(config: EditorConfig) -> Self {
        let mut project = Project::default();
        project.set_frame_rate(config.frame_rate);
        Self::with_project(project, config)
    }

    /// Create an editor state for an existing project
    pub fn with_project(project: Project, config: EditorConfig) -> Self {
        let mut state = Self {
            project: Project::default(),
            project_path: None,
            history: History::with_max_depth(config.history_depth),
            timeline: Timeline::new(),
            playback: PlaybackController::new(),
            active_motion: None,
            config,
            dirty: false,
        };
        state.replace_project(project, None);
        state
    }

    /// Replace the project with an empty one
    pub fn new_project(&mut self, name: &str) {
        let mut project = Project::new(name);
        project.set_frame_rate(self.config.frame_rate);
        self.replace_project(project, None);
        tracing::info!("Created new project: {}", name);
    }

    fn replace_project(&mut self, project: Project, path: Option<PathBuf>) {
        self.project = project;
        self.project_path = path;
        self.history.clear();
        self.timeline = Timeline::new();
        self.playback = PlaybackController::new();
        self.playback.loop_range = self.project.play_settings.loop_range;
        self.active_motion = self
            .project
            .models_in_render_order()
            .first()
            .and_then(|m| self.project.motions_for_model(m.id).next())
            .or_else(|| self.project.motions().next())
            .map(|m| m.id);
        self.dirty = false;
    }

    /// Open a project file
    pub fn open(&mut self, path: &Path) -> Result<(), ProjectError> {
        let project = Project::load(path)?;
        tracing::info!("Opened project: {} at {:?}", project.metadata.name, path);
        self.replace_project(project, Some(path.to_path_buf()));
        self.config.add_recent(path.to_path_buf());
        Ok(())
    }

    /// Save to the current project file
    pub fn save(&mut self) -> Result<(), ProjectError> {
        let path = self.project_path.clone().ok_or(ProjectError::NoPath)?;
        self.save_as(&path)
    }

    /// Save to a specific path
    pub fn save_as(&mut self, path: &Path) -> Result<(), ProjectError> {
        self.project.save(path, self.config.pretty_project_files)?;
        self.project_path = Some(path.to_path_buf());
        self.history.mark_clean();
        self.dirty = false;
        self.config.add_recent(path.to_path_buf());

        tracing::info!("Saved project to {:?}", path);
        Ok(())
    }

    /// Check if the project has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty || !self.history.is_clean()
    }

    /// Project name for the window title
    pub fn project_name(&self) -> &str {
        &self.project.metadata.name
    }

    /// Add a model with an empty motion and make that motion active
    pub fn add_model(&mut self, name: &str, path: impl Into<PathBuf>) -> ModelId {
        let id = self.project.add_model(name, path);
        self.active_motion = self.project.motions_for_model(id).next().map(|m| m.id);
        self.timeline.clear_selection();
        self.dirty = true;
        id
    }

    /// Remove a model and its motions
    ///
    /// Edits of the removed motions can no longer be undone, so the history
    /// is cleared.
    pub fn remove_model(&mut self, id: ModelId) -> bool {
        if self.project.remove_model(id).is_none() {
            return false;
        }
        if self.active_motion.is_some_and(|m| self.project.motion(m).is_none()) {
            self.active_motion = self.project.motions().next().map(|m| m.id);
            self.timeline.clear_selection();
        }
        self.history.clear();
        self.dirty = true;
        true
    }

    /// Loop playback over a frame range, or play once with `None`
    ///
    /// The range is stored in the project.
    pub fn set_loop_range(&mut self, range: Option<FrameRange>) {
        if self.project.play_settings.loop_range != range {
            self.project.play_settings.loop_range = range;
            self.dirty = true;
        }
        self.playback.loop_range = range;
    }

    /// The motion shown in the timeline
    pub fn active_motion(&self) -> Option<&Motion> {
        self.active_motion.and_then(|id| self.project.motion(id))
    }

    /// Switch the timeline to another motion
    pub fn set_active_motion(&mut self, id: MotionId) -> Result<(), CommandError> {
        if self.project.motion(id).is_none() {
            return Err(CommandError::MotionNotFound(id));
        }
        self.active_motion = Some(id);
        self.timeline.clear_selection();
        Ok(())
    }

    fn active_motion_id(&self) -> Result<MotionId, CommandError> {
        self.active_motion
            .filter(|id| self.project.motion(*id).is_some())
            .ok_or(CommandError::NoActiveMotion)
    }

    /// Execute a command and record it in the history
    ///
    /// Returns whether the command changed anything. A failing command
    /// leaves the project untouched.
    pub fn apply(&mut self, command: &dyn MotionCommand) -> Result<bool, CommandError> {
        let motion_id = command.motion();
        let motion = self
            .project
            .motion(motion_id)
            .ok_or(CommandError::MotionNotFound(motion_id))?;
        let description = command.description();

        let mut edited = motion.clone();
        if let Err(e) = command.execute(&mut edited) {
            tracing::warn!("{} failed: {}", description, e);
            return Err(e);
        }

        let op_id = self.history.begin_operation();
        let Some(operation) = to_operation(op_id, description.clone(), motion, &edited)? else {
            tracing::debug!("{} changed nothing", description);
            return Ok(false);
        };
        let mut group = OperationGroup::new(op_id, description);
        group.add_operation(operation);
        self.history.commit(group);

        if let Some(motion) = self.project.motion_mut(motion_id) {
            *motion = edited;
        }
        self.prune_selection();
        Ok(true)
    }

    /// Undo the last edit, returning its description
    ///
    /// The history entry is only consumed once its snapshots decode and
    /// every motion they touch still exists.
    pub fn undo(&mut self) -> Result<String, CommandError> {
        let group = self.history.next_undo().ok_or(HistoryError::NothingToUndo)?;
        let snapshots = group
            .operations
            .iter()
            .rev()
            .map(|op| op.before.to_value())
            .collect::<Result<Vec<MotionSnapshot>, HistoryError>>()?;
        self.restore(&snapshots)?;

        let group = self.history.undo()?;
        self.prune_selection();
        tracing::info!("Undo: {}", group.description);
        Ok(group.description)
    }

    /// Redo the last undone edit, returning its description
    pub fn redo(&mut self) -> Result<String, CommandError> {
        let group = self.history.next_redo().ok_or(HistoryError::NothingToRedo)?;
        let snapshots = group
            .operations
            .iter()
            .map(|op| op.after.to_value())
            .collect::<Result<Vec<MotionSnapshot>, HistoryError>>()?;
        self.restore(&snapshots)?;

        let group = self.history.redo()?;
        self.prune_selection();
        tracing::info!("Redo: {}", group.description);
        Ok(group.description)
    }

    fn restore(&mut self, snapshots: &[MotionSnapshot]) -> Result<(), CommandError> {
        if let Some(missing) = snapshots
            .iter()
            .find(|s| self.project.motion(s.motion).is_none())
        {
            return Err(CommandError::MotionNotFound(missing.motion));
        }
        for snapshot in snapshots {
            if let Some(motion) = self.project.motion_mut(snapshot.motion) {
                snapshot.restore(motion);
            }
        }
        Ok(())
    }

    fn prune_selection(&mut self) {
        if let Some(motion) = self.active_motion.and_then(|id| self.project.motion(id)) {
            self.timeline.prune(motion);
        }
    }

    /// Register a keyframe at the current frame with the default preset
    pub fn register_current(
        &mut self,
        target: TrackTarget,
        value: KeyframeValue,
    ) -> Result<bool, CommandError> {
        let motion = self.active_motion_id()?;
        let keyframe = Keyframe::new(self.timeline.current_frame, value)
            .with_preset(self.config.default_preset);
        self.apply(&RegisterKeyframesCommand::single(motion, target, keyframe))
    }

    /// Delete the selected keyframes
    pub fn delete_selected(&mut self) -> Result<bool, CommandError> {
        let motion = self.active_motion_id()?;
        let selection = self.timeline.selection().to_vec();
        if selection.is_empty() {
            return Ok(false);
        }
        let changed = self.apply(&RemoveKeyframesCommand::new(motion, selection))?;
        self.timeline.clear_selection();
        Ok(changed)
    }

    /// Copy the selected keyframes, returning how many were copied
    pub fn copy(&mut self) -> usize {
        match self.active_motion.and_then(|id| self.project.motion(id)) {
            Some(motion) => self.timeline.copy(motion),
            None => 0,
        }
    }

    /// Paste copied keyframes at the current frame
    ///
    /// With `reversed`, left and right bones are swapped. The pasted
    /// keyframes become the selection.
    pub fn paste(&mut self, reversed: bool) -> Result<bool, CommandError> {
        let motion_id = self.active_motion_id()?;
        let plan = self.timeline.paste_plan(reversed);
        if plan.is_empty() {
            return Ok(false);
        }

        let pasted: Vec<(TrackTarget, u32)> = plan
            .iter()
            .map(|p| (p.target.clone(), p.keyframe.frame_index))
            .collect();
        let changed = self.apply(&RegisterKeyframesCommand::new(motion_id, plan))?;

        if let Some(motion) = self.project.motion(motion_id) {
            let selection: Vec<KeyframeRef> = pasted
                .iter()
                .filter_map(|(target, frame)| {
                    motion
                        .find_track(target)
                        .map(|t| KeyframeRef::new(t.id, *frame))
                })
                .collect();
            self.timeline.set_selection(selection);
        }
        Ok(changed)
    }

    /// Apply an interpolation preset to the selected keyframes
    pub fn apply_preset_to_selection(
        &mut self,
        preset: InterpolationPreset,
        channel: InterpolationChannel,
    ) -> Result<bool, CommandError> {
        let motion = self.active_motion_id()?;
        let selection = self.timeline.selection().to_vec();
        if selection.is_empty() {
            return Ok(false);
        }
        self.apply(&SetInterpolationCommand::new(motion, selection, preset, channel))
    }

    /// Move the selected keyframes by a frame delta, keeping them selected
    pub fn move_selection(&mut self, delta: i64) -> Result<bool, CommandError> {
        let motion = self.active_motion_id()?;
        let selection = self.timeline.selection().to_vec();
        if selection.is_empty() || delta == 0 {
            return Ok(false);
        }
        let command = MoveKeyframesCommand::new(motion, selection, delta);
        let changed = self.apply(&command)?;
        self.timeline.set_selection(command.moved_refs());
        self.prune_selection();
        Ok(changed)
    }

    /// Insert an empty frame at the current frame
    pub fn insert_frame(&mut self) -> Result<bool, CommandError> {
        let motion = self.active_motion_id()?;
        self.apply(&InsertFrameCommand::new(motion, self.timeline.current_frame))
    }

    /// Delete the current frame
    pub fn delete_frame(&mut self) -> Result<bool, CommandError> {
        let motion = self.active_motion_id()?;
        self.apply(&DeleteFrameCommand::new(motion, self.timeline.current_frame))
    }

    /// Scale the keyframes of the selected frame range
    pub fn scale_range(&mut self, factor: f32) -> Result<bool, CommandError> {
        let motion = self.active_motion_id()?;
        let range = self
            .timeline
            .range
            .ok_or_else(|| CommandError::InvalidOperation("No frame range selected".to_string()))?;
        self.apply(&ScaleKeyframesCommand::new(motion, range, factor))
    }

    /// Evaluate the active motion at a (fractional) frame
    pub fn sample(&self, frame: f32) -> Vec<(TrackId, KeyframeValue)> {
        self.active_motion()
            .map(|m| m.evaluate(frame))
            .unwrap_or_default()
    }

    /// Advance playback and move the timeline cursor with it
    pub fn tick(&mut self, delta_seconds: f32) {
        let Some(motion) = self.active_motion.and_then(|id| self.project.motion(id)) else {
            return;
        };
        if self.playback.is_playing() {
            self.playback.update(delta_seconds, motion);
            self.timeline.seek(self.playback.current_frame());
        }
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

/// Create a project on disk and open it in a new editor state
pub fn create_and_open(dir: &Path, name: &str, config: EditorConfig) -> Result<EditorState, ProjectError> {
    let (project, path) = project::create_project(dir, name, config.frame_rate)?;
    let mut state = EditorState::with_project(project, config);
    state.project_path = Some(path.clone());
    state.config.add_recent(path);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::RemoveTrackCommand;
    use vpvm_motion::{BoneValue, MorphValue};

    fn state() -> EditorState {
        let mut state = EditorState::default();
        state.add_model("Miku", "models/miku.pmx");
        state
    }

    fn bone(x: f32) -> KeyframeValue {
        KeyframeValue::Bone(BoneValue {
            translation: [x, 0.0, 0.0],
            ..BoneValue::default()
        })
    }

    fn keyframe_count(state: &EditorState) -> usize {
        state.active_motion().map(Motion::keyframe_count).unwrap_or(0)
    }

    #[test]
    fn test_register_undo_redo() {
        let mut state = state();
        state.timeline.seek(10);
        assert!(state.register_current(TrackTarget::bone("センター"), bone(1.0)).unwrap());
        assert_eq!(keyframe_count(&state), 1);
        assert!(state.is_dirty());

        assert_eq!(state.undo().unwrap(), "Register 1 keyframe");
        assert_eq!(keyframe_count(&state), 0);
        assert_eq!(state.active_motion().map(Motion::track_count), Some(0));

        state.redo().unwrap();
        assert_eq!(keyframe_count(&state), 1);
        assert!(matches!(
            state.redo(),
            Err(CommandError::History(HistoryError::NothingToRedo))
        ));
    }

    #[test]
    fn test_default_preset_applied() {
        let mut state = state();
        state.config.default_preset = InterpolationPreset::SCurve;
        state.register_current(TrackTarget::morph("あ"), KeyframeValue::Morph(MorphValue::new(0.5))).unwrap();
        let motion = state.active_motion().unwrap();
        let track = motion.find_track(&TrackTarget::morph("あ")).unwrap();
        assert_eq!(
            track.keyframe_at(0).unwrap().value.curve(InterpolationChannel::Weight),
            Some(InterpolationPreset::SCurve.curve())
        );
    }

    #[test]
    fn test_failed_command_leaves_project_untouched() {
        let mut state = state();
        let before = state.project.clone();
        let result = state.register_current(
            TrackTarget::Camera,
            KeyframeValue::Camera(Default::default()),
        );
        assert!(result.is_err());
        assert_eq!(state.project, before);
        assert!(!state.history.can_undo());
    }

    #[test]
    fn test_copy_paste_reversed() {
        let mut state = state();
        state.timeline.seek(0);
        state.register_current(TrackTarget::bone("左腕"), bone(2.0)).unwrap();
        let motion = state.active_motion().unwrap();
        let track = motion.find_track(&TrackTarget::bone("左腕")).unwrap().id;
        state.timeline.select(KeyframeRef::new(track, 0));
        assert_eq!(state.copy(), 1);

        state.timeline.seek(30);
        assert!(state.paste(true).unwrap());
        let motion = state.active_motion().unwrap();
        let right = motion.find_track(&TrackTarget::bone("右腕")).unwrap();
        let pasted = right.keyframe_at(30).unwrap();
        assert_eq!(pasted.value.as_bone().map(|b| b.translation[0]), Some(-2.0));
        assert_eq!(state.timeline.selection(), &[KeyframeRef::new(right.id, 30)]);
    }

    #[test]
    fn test_delete_selected_and_move() {
        let mut state = state();
        for frame in [0, 10, 20] {
            state.timeline.seek(frame);
            state.register_current(TrackTarget::bone("頭"), bone(frame as f32)).unwrap();
        }
        let track = state.active_motion().unwrap().find_track(&TrackTarget::bone("頭")).unwrap().id;

        state.timeline.select(KeyframeRef::new(track, 20));
        state.move_selection(5).unwrap();
        assert_eq!(state.timeline.selection(), &[KeyframeRef::new(track, 25)]);

        assert!(state.delete_selected().unwrap());
        assert_eq!(keyframe_count(&state), 2);
        assert!(state.timeline.selection().is_empty());

        state.undo().unwrap();
        state.undo().unwrap();
        let frames: Vec<u32> = state
            .active_motion()
            .unwrap()
            .track(track)
            .unwrap()
            .keyframes()
            .iter()
            .map(|k| k.frame_index)
            .collect();
        assert_eq!(frames, vec![0, 10, 20]);
    }

    #[test]
    fn test_no_active_motion() {
        let mut state = state();
        state.active_motion = None;
        assert!(matches!(
            state.register_current(TrackTarget::bone("頭"), bone(0.0)),
            Err(CommandError::NoActiveMotion)
        ));
    }

    #[test]
    fn test_failed_undo_keeps_history_entry() {
        let mut state = state();
        state.register_current(TrackTarget::bone("頭"), bone(0.0)).unwrap();
        let motion = state.project.remove_motion(state.active_motion.unwrap()).unwrap();

        assert!(matches!(state.undo(), Err(CommandError::MotionNotFound(_))));
        assert!(state.history.can_undo());
        assert!(!state.history.can_redo());

        state.project.add_motion(motion).unwrap();
        assert_eq!(state.undo().unwrap(), "Register 1 keyframe");
        assert_eq!(keyframe_count(&state), 0);
    }

    #[test]
    fn test_remove_track_undo() {
        let mut state = state();
        for frame in [0, 10] {
            state.timeline.seek(frame);
            state.register_current(TrackTarget::bone("頭"), bone(frame as f32)).unwrap();
        }
        state.register_current(TrackTarget::bone("首"), bone(0.0)).unwrap();
        let before = state.active_motion().unwrap().clone();
        let head = before.find_track(&TrackTarget::bone("頭")).unwrap().id;
        state.timeline.select(KeyframeRef::new(head, 10));

        let motion = state.active_motion.unwrap();
        assert!(state.apply(&RemoveTrackCommand::new(motion, head)).unwrap());
        assert!(state.active_motion().unwrap().track(head).is_none());
        assert!(state.timeline.selection().is_empty());

        assert_eq!(state.undo().unwrap(), "Remove track");
        assert_eq!(state.active_motion(), Some(&before));
        state.redo().unwrap();
        assert_eq!(state.active_motion().map(Motion::track_count), Some(1));
    }

    #[test]
    fn test_configured_frame_rate_and_loop_range() {
        let config = EditorConfig {
            frame_rate: 60.0,
            ..EditorConfig::default()
        };
        let mut state = EditorState::new(config);
        state.add_model("Miku", "models/miku.pmx");
        assert!(state.project.motions().all(|m| m.frame_rate == 60.0));

        state.set_loop_range(Some(FrameRange::new(10, 20)));
        assert!(state.is_dirty());
        let project = state.project.clone();
        let reopened = EditorState::with_project(project, EditorConfig::default());
        assert_eq!(reopened.playback.loop_range, Some(FrameRange::new(10, 20)));
        assert_eq!(reopened.active_motion().map(|m| m.name.as_str()), Some("Miku"));
    }

    #[test]
    fn test_remove_model_clears_history() {
        let mut state = state();
        let model = state.project.models().next().unwrap().id;
        state.register_current(TrackTarget::bone("頭"), bone(0.0)).unwrap();
        assert!(state.remove_model(model));
        assert!(!state.history.can_undo());
        assert_eq!(state.active_motion().map(|m| m.name.as_str()), Some("Camera"));
    }
}
