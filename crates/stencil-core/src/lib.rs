//! Stencil Core - template scaffolding engine
//!
//! This library locates a named template across local and remote roots,
//! materializes its file tree into a project, drives its prompts through a
//! pluggable substitution engine, and merges its configuration patches into
//! existing project files.
//!
//! # Architecture
//!
//! - **Core operations** - [`templates`] (resolve, select, fetch, render,
//!   copy) and [`merge`] (JSON and script-embedded config merging)
//! - **Orchestration** - [`ProductConfig`] and [`Generator`], which runs the
//!   fixed lifecycle and fires [`hooks`] at each point
//! - **Collaborators** - [`prompt::Prompter`], [`prompt::Reporter`] and
//!   [`config::ConfigStore`], passed in explicitly
//! - **CLI interface** - optional cliclack prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based prompts and reporter
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use stencil_core::{ConfigStore, GenerateOptions, Generator, ProductConfig};
//! use stencil_core::prompt::{RecordingReporter, ScriptedPrompter};
//!
//! let store = ConfigStore::for_project(&project, config.config_file())?;
//! let generator = Generator::new(config, project, "0.1.0");
//! let options = GenerateOptions { template: Some("web".into()), ..Default::default() };
//! generator
//!     .generate(&options, &store, &mut ScriptedPrompter::new(), &mut RecordingReporter::default())
//!     .await?;
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod generator;
pub mod hooks;
pub mod merge;
pub mod product;
pub mod prompt;
pub mod templates;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use config::ConfigStore;
pub use error::{Result, ScaffoldError};
pub use generator::{GenerateOptions, GenerateReport, Generator};
pub use product::ProductConfig;
pub use templates::ConflictPolicy;

#[cfg(feature = "tui")]
pub use tui::{run, run_config};

/// Tool version - used for template compatibility checking
/// Each binary should define its own version, but this provides a fallback
pub const DEFAULT_CLI_VERSION: &str = "0.1.0";
