//! Product configuration trait for CLI binaries
//!
//! This trait defines the interface a binary implements to configure where
//! templates are looked up, where project configuration is stored, and how
//! remote templates are downloaded.

use std::path::PathBuf;

/// Configuration trait for a scaffolding CLI product
///
/// Each product implements this trait to define:
/// - Product identity (name, display name)
/// - Compiled-in template roots
/// - Project configuration file name
/// - Remote download defaults
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for CLI command, env vars, cache dir)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Name of the JSON configuration document kept in the project root
    fn config_file(&self) -> &'static str;

    /// Template used when none is given on the command line
    fn default_template(&self) -> Option<&'static str> {
        None
    }

    /// Default remote root for templates
    fn default_template_url(&self) -> &'static str;

    /// Environment variable name for overriding the default remote root
    fn template_url_env(&self) -> &'static str;

    /// Compiled-in roots, searched after the roots stored in the project config.
    ///
    /// The remote root honours the override environment variable.
    fn default_roots(&self) -> Vec<String> {
        let mut roots = Vec::new();
        if let Some(data_dir) = dirs::data_dir() {
            roots.push(
                data_dir
                    .join(self.name())
                    .join("templates")
                    .display()
                    .to_string(),
            );
        }
        roots.push(
            std::env::var(self.template_url_env())
                .unwrap_or_else(|_| self.default_template_url().to_string()),
        );
        roots
    }

    /// Branch downloaded when `--branch` is not given
    fn default_branch(&self) -> &'static str {
        "master"
    }

    /// Directory where remote templates are unpacked
    fn cache_dir(&self) -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(self.name())
    }

    /// Upgrade/install command shown in version warnings
    fn upgrade_command(&self) -> &'static str;

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }
}
