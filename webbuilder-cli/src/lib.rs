//! # WebBuilder CLI
//!
//! Native host for WebBuilder Pro project files.
//!
//! ## Usage
//!
//! ```bash
//! webbuilder --project site.json init --component section --component button
//! webbuilder --project site.json export --output index.html
//! webbuilder --project site.json css
//! webbuilder --project site.json layers --json
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `CliConfig` - Resolved project path and editor configuration
//! - `run` - Executes one subcommand against a `CanvasController`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use webbuilder_core::export::{self, ExportOptions};
use webbuilder_core::{CanvasController, EditorConfig, ProjectFile};

/// Command-line arguments for webbuilder.
#[derive(Debug, Clone, Parser)]
#[command(name = "webbuilder")]
#[command(about = "WebBuilder Pro project tool")]
#[command(version)]
pub struct CliArgs {
    /// Project file to operate on
    #[arg(long, env = "WEBBUILDER_PROJECT", default_value = "project.json")]
    pub project: PathBuf,

    /// Editor configuration file (JSON)
    #[arg(long, env = "WEBBUILDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create a project, optionally seeded with components
    Init {
        /// Component type to append to the page body (repeatable)
        #[arg(long = "component")]
        components: Vec<String>,
        /// Overwrite an existing project file
        #[arg(long)]
        force: bool,
    },
    /// Write the standalone HTML document
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Document title
        #[arg(long)]
        title: Option<String>,
    },
    /// Write the generated stylesheet
    Css {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the element outline
    Layers {
        /// Print JSON instead of an indented tree
        #[arg(long)]
        json: bool,
    },
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Project file path.
    pub project: PathBuf,
    /// Editor configuration file, if any.
    pub config_path: Option<PathBuf>,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            project: args.project.clone(),
            config_path: args.config.clone(),
        }
    }
}

impl CliConfig {
    /// Load the editor configuration, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn editor_config(&self) -> anyhow::Result<EditorConfig> {
        let Some(path) = &self.config_path else {
            return Ok(EditorConfig::default());
        };
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        EditorConfig::from_json(&json)
            .with_context(|| format!("Invalid editor config {}", path.display()))
    }

    /// Open the project in a fresh editing session.
    ///
    /// # Errors
    ///
    /// Returns an error if the project cannot be read or restored.
    pub fn open_project(&self) -> anyhow::Result<CanvasController> {
        let mut controller = CanvasController::with_config(self.editor_config()?);
        let project = ProjectFile::load(&self.project)
            .with_context(|| format!("Failed to load project {}", self.project.display()))?;
        controller
            .load_project(&project)
            .with_context(|| format!("Project {} is corrupt", self.project.display()))?;
        Ok(controller)
    }
}

fn emit(content: &str, output: Option<&Path>, out: &mut dyn Write) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => writeln!(out, "{content}")?,
    }
    Ok(())
}

/// Execute the parsed command, writing stdout output to `out`.
///
/// # Errors
///
/// Returns an error if a file cannot be read or written, or a component
/// type is unknown.
pub fn run(args: &CliArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let config = CliConfig::from(args);
    match &args.command {
        Command::Init { components, force } => {
            if config.project.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    config.project.display()
                );
            }
            let mut controller = CanvasController::with_config(config.editor_config()?);
            let root = controller.canvas().root();
            for component in components {
                controller
                    .add_component(component, root, usize::MAX)
                    .with_context(|| format!("Cannot add component '{component}'"))?;
            }
            controller
                .save_project()
                .save(&config.project)
                .with_context(|| format!("Failed to save {}", config.project.display()))?;
            writeln!(out, "Created {}", config.project.display())?;
        }
        Command::Export { output, title } => {
            let controller = config.open_project()?;
            let mut options = ExportOptions::default();
            if let Some(title) = title {
                options.title.clone_from(title);
            }
            let html = export::export_document(controller.canvas(), &options);
            emit(&html, output.as_deref(), out)?;
        }
        Command::Css { output } => {
            let controller = config.open_project()?;
            emit(&controller.export_css(), output.as_deref(), out)?;
        }
        Command::Layers { json } => {
            let controller = config.open_project()?;
            let layers = controller.layers();
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&layers)?)?;
            } else {
                for layer in layers {
                    writeln!(out, "{}{} ({})", "  ".repeat(layer.depth), layer.label, layer.id)?;
                }
            }
        }
    }
    Ok(())
}
