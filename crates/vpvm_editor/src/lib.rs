// SPDX-License-Identifier: MIT OR Apache-2.0
//! VPVM editor core.
//!
//! Everything the motion editor does besides drawing:
//! - Undoable motion edits (commands + snapshot history)
//! - Editor state (active motion, timeline, playback)
//! - Project files and editor configuration
//!
//! ## Architecture
//!
//! Edits are expressed as [`commands::MotionCommand`]s and run through
//! [`state::EditorState::apply`], which records the touched tracks in the
//! [`history::History`]. Projects are RON files written by
//! [`project::Project::save`].

pub mod commands;
pub mod config;
pub mod history;
pub mod project;
pub mod state;

pub use commands::{CommandError, MotionCommand};
pub use config::{ConfigError, EditorConfig};
pub use history::{History, HistoryError};
pub use project::{Project, ProjectError};
pub use state::EditorState;
