// SPDX-License-Identifier: MIT OR Apache-2.0
//! Project files.
//!
//! A project holds the scene being animated:
//! - Project metadata (name, author, description)
//! - Loaded models and their render order
//! - Motions for each model, plus the camera/light motion
//! - Camera, light, physics and playback settings
//!
//! Projects are stored as RON with a format version.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use vpvm_motion::{CameraValue, FrameRange, LightValue, ModelId, Motion, MotionId, DEFAULT_FRAME_RATE};

/// Current project format version
pub const PROJECT_FORMAT_VERSION: u32 = 1;

/// Project file extension
pub const PROJECT_EXTENSION: &str = "vpvm";

/// Project file name inside a project directory
pub const PROJECT_FILE_NAME: &str = "project.vpvm";

/// Name of the motion created for camera and light
pub const CAMERA_MOTION_NAME: &str = "Camera";

/// Project errors
#[derive(Debug, Error)]
pub enum ProjectError {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed project file
    #[error("Failed to parse project: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Project could not be written
    #[error("Failed to serialize project: {0}")]
    Serialize(#[from] ron::Error),

    /// Project written by a newer version
    #[error("Project version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest readable version
        supported: u32,
    },

    /// Model not found
    #[error("Model not found: {0:?}")]
    UnknownModel(ModelId),

    /// Render order does not list every model exactly once
    #[error("Render order must list every model exactly once")]
    InvalidRenderOrder,

    /// The editor has no file to save to
    #[error("Project has no file path")]
    NoPath,
}

/// Result type for project operations
pub type Result<T> = std::result::Result<T, ProjectError>;

/// Project metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Project name
    pub name: String,
    /// Author name
    #[serde(default)]
    pub author: String,
    /// Project description
    #[serde(default)]
    pub description: String,
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            name: "Untitled Project".to_string(),
            author: String::new(),
            description: String::new(),
        }
    }
}

/// A model placed in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Model ID
    pub id: ModelId,
    /// Display name
    pub name: String,
    /// Model file, relative to the project directory when possible
    pub path: PathBuf,
    /// Whether the model is drawn
    pub visible: bool,
    /// Position in the draw order (0 draws first)
    pub render_order: usize,
    /// Outline width
    pub edge_width: f32,
}

/// Scene camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Camera pose used when no camera keyframe exists
    pub pose: CameraValue,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            pose: CameraValue::default(),
            near: 0.5,
            far: 10_000.0,
        }
    }
}

/// Scene light settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSettings {
    /// Light used when no light keyframe exists
    pub light: LightValue,
    /// Whether shadows are drawn
    pub shadow_enabled: bool,
    /// Shadow draw distance
    pub shadow_distance: f32,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            light: LightValue::default(),
            shadow_enabled: true,
            shadow_distance: 8_875.0,
        }
    }
}

/// Physics simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsSettings {
    /// Whether physics runs during playback
    pub enabled: bool,
    /// Gravity vector
    pub gravity: [f32; 3],
    /// Whether a ground plane collides with rigid bodies
    pub ground: bool,
    /// Fixed timestep for the simulation
    pub fixed_timestep: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            gravity: [0.0, -9.8, 0.0],
            ground: true,
            fixed_timestep: 1.0 / 60.0,
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaySettings {
    /// Frames played in a loop, `None` to play once to the end
    pub loop_range: Option<FrameRange>,
    /// Frames per second of the project's motions
    pub frame_rate: f32,
}

impl Default for PlaySettings {
    fn default() -> Self {
        Self {
            loop_range: None,
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename = "Project")]
struct ProjectHeader {
    version: u32,
}

/// A complete project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// File format version
    pub version: u32,
    /// Project metadata
    pub metadata: ProjectMetadata,
    /// Models by ID, in load order
    models: IndexMap<ModelId, ModelEntry>,
    /// Motions by ID
    motions: IndexMap<MotionId, Motion>,
    /// Camera settings
    #[serde(default)]
    pub camera: CameraSettings,
    /// Light settings
    #[serde(default)]
    pub light: LightSettings,
    /// Physics settings
    #[serde(default)]
    pub physics: PhysicsSettings,
    /// Playback settings
    #[serde(default)]
    pub play_settings: PlaySettings,
}

impl Default for Project {
    fn default() -> Self {
        Self::new("Untitled Project")
    }
}

impl Project {
    /// Create a project holding only the camera/light motion
    pub fn new(name: impl Into<String>) -> Self {
        let mut project = Self {
            version: PROJECT_FORMAT_VERSION,
            metadata: ProjectMetadata {
                name: name.into(),
                ..ProjectMetadata::default()
            },
            models: IndexMap::new(),
            motions: IndexMap::new(),
            camera: CameraSettings::default(),
            light: LightSettings::default(),
            physics: PhysicsSettings::default(),
            play_settings: PlaySettings::default(),
        };
        let camera = Motion::new(CAMERA_MOTION_NAME);
        project.motions.insert(camera.id, camera);
        project
    }

    /// Add a model and an empty motion for it
    pub fn add_model(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> ModelId {
        let id = ModelId::new();
        let name = name.into();
        let mut motion = Motion::for_model(name.clone(), id);
        motion.frame_rate = self.play_settings.frame_rate;
        self.models.insert(
            id,
            ModelEntry {
                id,
                name,
                path: path.into(),
                visible: true,
                render_order: self.models.len(),
                edge_width: 1.0,
            },
        );
        self.motions.insert(motion.id, motion);
        id
    }

    /// Change the frame rate of the project and of every motion in it
    pub fn set_frame_rate(&mut self, frame_rate: f32) {
        self.play_settings.frame_rate = frame_rate;
        for motion in self.motions.values_mut() {
            motion.frame_rate = frame_rate;
        }
    }

    /// Remove a model together with the motions bound to it
    pub fn remove_model(&mut self, id: ModelId) -> Option<ModelEntry> {
        let removed = self.models.shift_remove(&id)?;
        self.motions.retain(|_, m| m.model != Some(id));

        let mut order: Vec<ModelId> = self.models.keys().copied().collect();
        order.sort_by_key(|id| self.models[id].render_order);
        for (index, id) in order.iter().enumerate() {
            if let Some(model) = self.models.get_mut(id) {
                model.render_order = index;
            }
        }
        Some(removed)
    }

    /// Get a model
    pub fn model(&self, id: ModelId) -> Option<&ModelEntry> {
        self.models.get(&id)
    }

    /// Get a mutable model
    pub fn model_mut(&mut self, id: ModelId) -> Option<&mut ModelEntry> {
        self.models.get_mut(&id)
    }

    /// Models in load order
    pub fn models(&self) -> impl Iterator<Item = &ModelEntry> {
        self.models.values()
    }

    /// Models in draw order
    pub fn models_in_render_order(&self) -> Vec<&ModelEntry> {
        let mut models: Vec<&ModelEntry> = self.models.values().collect();
        models.sort_by_key(|m| m.render_order);
        models
    }

    /// Replace the draw order; `order` must list every model once
    pub fn set_render_order(&mut self, order: &[ModelId]) -> Result<()> {
        let mut seen = order.to_vec();
        seen.sort_by_key(|id| id.0);
        seen.dedup();
        if seen.len() != order.len() || order.len() != self.models.len() {
            return Err(ProjectError::InvalidRenderOrder);
        }
        if let Some(unknown) = order.iter().find(|id| !self.models.contains_key(*id)) {
            return Err(ProjectError::UnknownModel(*unknown));
        }

        for (index, id) in order.iter().enumerate() {
            if let Some(model) = self.models.get_mut(id) {
                model.render_order = index;
            }
        }
        Ok(())
    }

    /// Add a motion; motions bound to a model require the model to exist
    pub fn add_motion(&mut self, motion: Motion) -> Result<MotionId> {
        if let Some(model) = motion.model {
            if !self.models.contains_key(&model) {
                return Err(ProjectError::UnknownModel(model));
            }
        }
        let id = motion.id;
        self.motions.insert(id, motion);
        Ok(id)
    }

    /// Remove a motion
    pub fn remove_motion(&mut self, id: MotionId) -> Option<Motion> {
        self.motions.shift_remove(&id)
    }

    /// Get a motion
    pub fn motion(&self, id: MotionId) -> Option<&Motion> {
        self.motions.get(&id)
    }

    /// Get a mutable motion
    pub fn motion_mut(&mut self, id: MotionId) -> Option<&mut Motion> {
        self.motions.get_mut(&id)
    }

    /// Find a motion by name
    pub fn motion_by_name(&self, name: &str) -> Option<&Motion> {
        self.motions.values().find(|m| m.name == name)
    }

    /// Motions bound to a model
    pub fn motions_for_model(&self, model: ModelId) -> impl Iterator<Item = &Motion> {
        self.motions.values().filter(move |m| m.model == Some(model))
    }

    /// The first motion not bound to a model (camera and light)
    pub fn camera_motion(&self) -> Option<&Motion> {
        self.motions.values().find(|m| m.model.is_none())
    }

    /// All motions
    pub fn motions(&self) -> impl Iterator<Item = &Motion> {
        self.motions.values()
    }

    /// Last keyframed frame over every motion
    pub fn max_frame_index(&self) -> u32 {
        self.motions.values().map(Motion::max_frame_index).max().unwrap_or(0)
    }

    /// Load a project from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let header: ProjectHeader = ron::from_str(&content)?;
        if header.version > PROJECT_FORMAT_VERSION {
            return Err(ProjectError::UnsupportedVersion {
                found: header.version,
                supported: PROJECT_FORMAT_VERSION,
            });
        }
        let project: Project = ron::from_str(&content)?;

        tracing::debug!(
            "Loaded project '{}' ({} models, {} motions)",
            project.metadata.name,
            project.models.len(),
            project.motions.len()
        );
        Ok(project)
    }

    /// Save the project to a file
    pub fn save(&self, path: &Path, pretty: bool) -> Result<()> {
        let content = if pretty {
            let config = ron::ser::PrettyConfig::default()
                .struct_names(true)
                .enumerate_arrays(false);
            ron::ser::to_string_pretty(self, config)?
        } else {
            ron::ser::to_string(self)?
        };

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Get the project file path for a project directory
pub fn project_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(PROJECT_FILE_NAME)
}

/// Check if a directory contains a project
pub fn is_project_directory(dir: &Path) -> bool {
    project_file_path(dir).exists()
}

/// Create a project directory with an empty project file
///
/// Returns the new project and the path of its file.
pub fn create_project(
    project_dir: &Path,
    name: &str,
    frame_rate: f32,
) -> Result<(Project, PathBuf)> {
    std::fs::create_dir_all(project_dir)?;
    for subdir in ["models", "motions"] {
        std::fs::create_dir_all(project_dir.join(subdir))?;
    }

    let mut project = Project::new(name);
    project.set_frame_rate(frame_rate);
    let path = project_file_path(project_dir);
    project.save(&path, true)?;

    tracing::info!("Created new project: {} at {:?}", name, project_dir);
    Ok((project, path))
}
