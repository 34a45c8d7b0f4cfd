//! Template definition types and loading

use super::engine::{Engine, Scope};
use crate::error::{Result, ScaffoldError};
use crate::hooks::DeclaredHooks;
use crate::merge::ConfigPatch;
use crate::prompt::Prompt;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Name of the definition file inside a template directory
pub const MANIFEST_FILE: &str = "template.yaml";

/// Whether a file rule excludes what it matches.
///
/// Rendered templates may produce the flag as text, so `"true"`, `"1"` and
/// `"yes"` count as excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Exclusion {
    Flag(bool),
    Expression(String),
}

impl Default for Exclusion {
    fn default() -> Self {
        Exclusion::Flag(false)
    }
}

impl Exclusion {
    pub fn is_excluded(&self) -> bool {
        match self {
            Exclusion::Flag(flag) => *flag,
            Exclusion::Expression(text) => matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            ),
        }
    }
}

/// Rule attached to a glob in the `files` map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRuleOptions {
    #[serde(default)]
    pub excluded: Exclusion,
}

/// A glob pattern and its rule, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRule {
    pub pattern: String,
    pub excluded: Exclusion,
}

fn ordered_file_rules<'de, D>(deserializer: D) -> std::result::Result<Vec<FileRule>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = Map::<String, Value>::deserialize(deserializer)?;
    map.into_iter()
        .map(|(pattern, rule)| {
            let options: FileRuleOptions =
                serde_json::from_value(rule).map_err(serde::de::Error::custom)?;
            Ok(FileRule {
                pattern,
                excluded: options.excluded,
            })
        })
        .collect()
}

/// Everything a template declares in its `template.yaml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateContent {
    /// Display name of the template
    #[serde(default)]
    pub name: Option<String>,

    /// Description of what the template provides
    #[serde(default)]
    pub description: Option<String>,

    /// Minimum tool version the template was written for
    #[serde(default)]
    pub version: Option<String>,

    /// Substitution engine for content and file bodies
    #[serde(default)]
    pub engine: Engine,

    /// Questions asked before rendering, in order
    #[serde(default)]
    pub prompts: Vec<Prompt>,

    /// Glob rules for the file tree, first match wins
    #[serde(default, deserialize_with = "ordered_file_rules")]
    pub files: Vec<FileRule>,

    /// Patches merged into existing project files
    #[serde(default)]
    pub configuration: Vec<ConfigPatch>,

    /// Lifecycle hook slots
    #[serde(default)]
    pub hooks: DeclaredHooks,
}

/// A template located on disk together with its raw and typed definition
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    /// Directory holding the template tree, or the definition file itself
    pub path: PathBuf,
    /// Whether `path` is a directory whose files get materialized
    pub is_dir: bool,
    /// Definition as parsed, before rendering
    pub raw: Value,
    /// Typed view of `raw`
    pub content: TemplateContent,
}

impl LoadedTemplate {
    /// Load a template from a directory (reading its `template.yaml`) or from
    /// a definition file
    pub async fn load(path: &Path) -> Result<Self> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| load_error(path, e))?;
        let is_dir = metadata.is_dir();
        let manifest_path = if is_dir {
            path.join(MANIFEST_FILE)
        } else {
            path.to_path_buf()
        };

        let text = tokio::fs::read_to_string(&manifest_path)
            .await
            .map_err(|e| load_error(path, format!("cannot read {}: {}", manifest_path.display(), e)))?;
        let raw: Value = serde_yaml::from_str(&text).map_err(|e| load_error(path, e))?;
        if !raw.is_object() {
            return Err(load_error(path, "template definition must be a mapping"));
        }
        let content = Self::typed(path, &raw)?;

        Ok(Self {
            path: path.to_path_buf(),
            is_dir,
            raw,
            content,
        })
    }

    fn typed(path: &Path, raw: &Value) -> Result<TemplateContent> {
        serde_json::from_value(raw.clone()).map_err(|e| load_error(path, e))
    }

    /// Render every string of the definition with the template's engine
    pub fn render(&self, scope: &Scope) -> Result<TemplateContent> {
        let rendered = self.content.engine.render_value(&self.raw, scope)?;
        Self::typed(&self.path, &rendered)
    }
}

fn load_error(path: &Path, message: impl ToString) -> ScaffoldError {
    ScaffoldError::Load {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::PatchKind;
    use crate::prompt::Answers;
    use serde_json::json;

    const MANIFEST: &str = r#"
name: jquery
engine: mustache
prompts:
  - type: input
    name: version
    message: Which version do you want to install?
    default: "~2.0.0"
files:
  "docs/**":
    excluded: true
  "*.md":
    excluded: "{{= skipReadme }}"
  "index.js":
    excluded: false
configuration:
  - path: bower.json
    type: json
    content:
      dependencies:
        jquery: "{{= prompts.version }}"
  - path: Gruntfile.js
    type: Grunt
    content:
      parallel:
        bowerCopy:
          tasks: ["copy:bowerJQuery"]
hooks:
  bye:
    - status: ok
      message: "Installed jquery {{= version }}"
"#;

    async fn write_template(dir: &Path) -> PathBuf {
        let template = dir.join("jquery");
        tokio::fs::create_dir_all(&template).await.unwrap();
        tokio::fs::write(template.join(MANIFEST_FILE), MANIFEST).await.unwrap();
        template
    }

    #[tokio::test]
    async fn test_load_directory_template() {
        let dir = tempfile::tempdir().unwrap();
        let template = LoadedTemplate::load(&write_template(dir.path()).await).await.unwrap();

        assert!(template.is_dir);
        let content = &template.content;
        assert_eq!(content.engine, Engine::Mustache);
        assert_eq!(content.prompts.len(), 1);
        let patterns: Vec<_> = content.files.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["docs/**", "*.md", "index.js"]);
        assert_eq!(content.configuration[1].kind, PatchKind::ScriptEmbedded);
    }

    #[tokio::test]
    async fn test_render_substitutes_answers() {
        let dir = tempfile::tempdir().unwrap();
        let template = LoadedTemplate::load(&write_template(dir.path()).await).await.unwrap();

        let answers: Answers = [
            ("version".to_string(), json!("2.1.0")),
            ("skipReadme".to_string(), json!(true)),
        ]
        .into_iter()
        .collect();
        let rendered = template.render(&Scope::new(&answers)).unwrap();

        assert_eq!(
            rendered.configuration[0].content,
            json!({"dependencies": {"jquery": "2.1.0"}})
        );
        assert!(rendered.files[1].excluded.is_excluded());
        assert!(!rendered.files[2].excluded.is_excluded());
    }

    #[tokio::test]
    async fn test_directory_without_manifest_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = LoadedTemplate::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, ScaffoldError::Load { .. }));
    }

    #[tokio::test]
    async fn test_file_template() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lodash.yaml");
        tokio::fs::write(&file, "prompts:\n  - name: version\n").await.unwrap();

        let template = LoadedTemplate::load(&file).await.unwrap();
        assert!(!template.is_dir);
        assert_eq!(template.content.engine, Engine::Default);
    }

    #[tokio::test]
    async fn test_scalar_definition_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.yaml");
        tokio::fs::write(&file, "just a string").await.unwrap();
        assert!(LoadedTemplate::load(&file).await.is_err());
    }
}
