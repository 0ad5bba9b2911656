// SPDX-License-Identifier: MIT OR Apache-2.0
//! `vpvm` command line tool.
//!
//! Creates, inspects and samples VPVM projects without the GUI.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vpvm_editor::config::DEFAULT_CONFIG_FILE;
use vpvm_editor::project::create_project;
use vpvm_editor::{EditorConfig, EditorState, Project};
use vpvm_motion::{InterpolationPreset, KeyframeValue};

#[derive(Parser)]
#[command(name = "vpvm", version, about = "VPVM motion project tools")]
struct Cli {
    /// Editor configuration file
    #[arg(long, env = "VPVM_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a project directory
    New {
        /// Directory to create
        dir: PathBuf,
        /// Project name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the models and motions of a project
    Info {
        /// Project file
        project: PathBuf,
    },
    /// Evaluate every track of a motion at a frame
    Sample {
        /// Project file
        project: PathBuf,
        /// Motion name
        #[arg(long)]
        motion: String,
        /// Frame to sample (fractional frames interpolate)
        #[arg(long)]
        frame: f32,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List interpolation presets
    Presets,
}

#[derive(Serialize)]
struct SampledTrack<'a> {
    track: &'a str,
    value: KeyframeValue,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["vpvm=info", "vpvm_editor=info"] {
        env_filter = env_filter.add_directive(
            directive
                .parse()
                .unwrap_or_else(|_| LevelFilter::INFO.into()),
        );
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = EditorConfig::load_or_default(&config_path);

    let result = match cli.command {
        Command::New { dir, name } => new_project(&dir, name, config, cli.config.as_deref()),
        Command::Info { project } => info(&project, config),
        Command::Sample {
            project,
            motion,
            frame,
            json,
        } => sample(&project, &motion, frame, json, config),
        Command::Presets => {
            presets();
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn new_project(
    dir: &Path,
    name: Option<String>,
    mut config: EditorConfig,
    config_path: Option<&Path>,
) -> CliResult {
    let name = name
        .or_else(|| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "Untitled Project".to_string());
    let (_, path) = create_project(dir, &name, config.frame_rate)?;
    println!("{}", path.display());

    if let Some(config_path) = config_path {
        config.add_recent(path);
        config.save(config_path)?;
    }
    Ok(())
}

fn info(path: &Path, config: EditorConfig) -> CliResult {
    let mut state = EditorState::new(config);
    state.open(path)?;
    for line in report(&state.project) {
        println!("{line}");
    }
    Ok(())
}

fn report(project: &Project) -> Vec<String> {
    let mut lines = vec![format!("Project: {}", project.metadata.name)];
    lines.extend(project.models_in_render_order().into_iter().map(|model| {
        format!(
            "Model #{} {} ({}){}",
            model.render_order,
            model.name,
            model.path.display(),
            if model.visible { "" } else { " [hidden]" }
        )
    }));
    lines.extend(project.motions().map(|motion| {
        format!(
            "Motion {}: {} tracks, {} keyframes, last frame {}, {} fps",
            motion.name,
            motion.track_count(),
            motion.keyframe_count(),
            motion.max_frame_index(),
            motion.frame_rate
        )
    }));
    lines
}

fn sample(path: &Path, motion: &str, frame: f32, json: bool, config: EditorConfig) -> CliResult {
    let mut state = EditorState::new(config);
    state.open(path)?;
    let id = state
        .project
        .motion_by_name(motion)
        .map(|m| m.id)
        .ok_or_else(|| format!("No motion named '{motion}'"))?;
    state.set_active_motion(id)?;

    let Some(motion) = state.active_motion() else {
        return Ok(());
    };
    let sampled: Vec<SampledTrack<'_>> = state
        .sample(frame)
        .into_iter()
        .filter_map(|(track_id, value)| {
            motion.track(track_id).map(|t| SampledTrack {
                track: t.name(),
                value,
            })
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&sampled)?);
    } else {
        for s in &sampled {
            println!("{}: {}", s.track, describe(&s.value));
        }
    }
    Ok(())
}

fn describe(value: &KeyframeValue) -> String {
    match value {
        KeyframeValue::Bone(b) => format!(
            "translation {:?} orientation {:?}",
            b.translation, b.orientation
        ),
        KeyframeValue::Morph(m) => format!("weight {:.3}", m.weight),
        KeyframeValue::Camera(c) => format!(
            "look_at {:?} angle {:?} distance {:.3} fov {:.1}",
            c.look_at, c.angle, c.distance, c.fov
        ),
        KeyframeValue::Light(l) => format!("color {:?} direction {:?}", l.color, l.direction),
    }
}

fn presets() {
    for preset in InterpolationPreset::all() {
        let curve = preset.curve();
        println!(
            "{:<16} ({}, {}) ({}, {})",
            preset.name(),
            curve.c0.x,
            curve.c0.y,
            curve.c1.x,
            curve.c1.y
        );
    }
}
