//! Error types for scaffolding operations.
//!
//! Every stage of a run reports through [`ScaffoldError`]; the binary prints
//! the error once and exits. Missing configuration targets are not errors and
//! never reach this type.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for scaffolding operations.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// No candidate root resolved the template.
    #[error("No template found for name \"{identifier}\" at paths [{}]", roots.join(", "))]
    Resolution {
        identifier: String,
        roots: Vec<String>,
    },

    /// The interactive choice between candidates was aborted.
    #[error("Template selection aborted: {message}")]
    Selection { message: String },

    /// Downloading a remote template failed.
    #[error("Failed to fetch template from {url}: {message}")]
    Fetch { url: String, message: String },

    /// Remote candidate lives on a host we cannot download from.
    #[error("Downloading templates from '{host}' is not implemented")]
    UnsupportedHost { host: String },

    /// The resolved location is not a valid template definition.
    #[error("Invalid template at {path}: {message}")]
    Load { path: PathBuf, message: String },

    /// A placeholder could not be rendered.
    #[error("Failed to render \"{expression}\": {message}")]
    Render { expression: String, message: String },

    /// A script-embedded config literal could not be parsed or located.
    #[error("Failed to merge {path}: {message}")]
    Merge { path: PathBuf, message: String },

    /// The command path did not lead to an invocable command.
    #[error("Unknown command \"{path}\"")]
    Dispatch { path: String },

    /// No command was given at all.
    #[error("You need to specify a command to run")]
    NoCommand,

    /// A config command was missing an argument.
    #[error("Missing argument for command \"{command}\": {argument}")]
    MissingArgument { command: String, argument: String },

    /// Only stored paths can be removed.
    #[error("Remove failed. Unknown path \"{path}\"")]
    UnknownPath { path: String },

    /// An answer did not pass its prompt's validation.
    #[error("Invalid answer for '{prompt}': {message}")]
    InvalidAnswer { prompt: String, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for scaffolding operations.
pub type Result<T> = std::result::Result<T, ScaffoldError>;
