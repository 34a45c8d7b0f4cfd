//! The JSON configuration document kept in the project root

use crate::error::{Result, ScaffoldError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Contents of the project configuration file.
///
/// Only `paths` is interpreted; every other key is carried through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Template roots added by the user, searched before the defaults
    #[serde(default)]
    pub paths: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument {
    /// Add a root unless it is already stored. Returns whether it was added.
    pub fn add_path(&mut self, path: &str) -> bool {
        if self.paths.iter().any(|p| p == path) {
            return false;
        }
        self.paths.push(path.to_string());
        true
    }

    /// Remove a stored root. Returns whether it was present.
    pub fn remove_path(&mut self, path: &str) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        self.paths.len() != before
    }

    /// Whole document as a JSON value, for template scopes
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Loads the document once and writes it back once
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    document: ConfigDocument,
}

impl ConfigStore {
    /// Read the document at `path`; a missing file yields an empty document
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => ConfigDocument::default(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| ScaffoldError::Load {
                path: path.clone(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ConfigDocument::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("loaded config from {}", path.display());
        Ok(Self { path, document })
    }

    /// Load the store for a project, using the product's file name
    pub fn for_project(project_root: &Path, file_name: &str) -> Result<Self> {
        Self::load(project_root.join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut ConfigDocument {
        &mut self.document
    }

    /// Write the document as pretty JSON
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut text = serde_json::to_string_pretty(&self.document).map_err(anyhow::Error::from)?;
        text.push('\n');
        std::fs::write(&self.path, text)?;
        tracing::debug!("saved config to {}", self.path.display());
        Ok(())
    }

    /// Save once and hand back the operation's outcome.
    ///
    /// The operation's error takes precedence over a save failure.
    pub fn finish<T>(self, outcome: Result<T>) -> Result<T> {
        let saved = self.save();
        let value = outcome?;
        saved?;
        Ok(value)
    }

    /// Load the document, run `operation` on it, and save exactly once
    pub fn scoped<T>(
        path: impl Into<PathBuf>,
        operation: impl FnOnce(&mut ConfigStore) -> Result<T>,
    ) -> Result<T> {
        let mut store = Self::load(path)?;
        let outcome = operation(&mut store);
        store.finish(outcome)
    }
}
