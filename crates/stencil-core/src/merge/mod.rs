//! Structural merging of template configuration patches into project files
//!
//! A patch only ever updates a file that already exists; a missing target is
//! skipped silently whatever the patch kind.

pub mod json;
pub mod script;

use crate::error::{Result, ScaffoldError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

pub use json::deep_merge;
pub use script::{merge_script, ScriptError, PRESERVED_IDENTIFIERS};

/// Format of a patched configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PatchKind {
    /// Plain JSON document
    Json,
    /// `key=value` properties file (declared but not merged)
    Properties,
    /// Script with one `initConfig(...)` call whose argument is a data literal
    ScriptEmbedded,
    /// Anything else; skipped with a warning
    Unknown(String),
}

impl From<String> for PatchKind {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "json" => PatchKind::Json,
            "properties" => PatchKind::Properties,
            "grunt" | "gruntfile" | "script" => PatchKind::ScriptEmbedded,
            _ => PatchKind::Unknown(raw),
        }
    }
}

impl From<PatchKind> for String {
    fn from(kind: PatchKind) -> Self {
        match kind {
            PatchKind::Json => "json".to_string(),
            PatchKind::Properties => "properties".to_string(),
            PatchKind::ScriptEmbedded => "grunt".to_string(),
            PatchKind::Unknown(raw) => raw,
        }
    }
}

/// A declarative change to an existing project file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPatch {
    /// Target path, relative to the project root
    pub path: String,

    #[serde(rename = "type")]
    pub kind: PatchKind,

    #[serde(default)]
    pub content: Value,
}

/// What happened to one patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    Merged(PathBuf),
    MissingTarget(PathBuf),
    Ignored(PathBuf),
}

/// Apply one patch under `project_root`
pub async fn apply_patch(project_root: &Path, patch: &ConfigPatch) -> Result<PatchOutcome> {
    let target = project_root.join(&patch.path);

    if patch.content.is_null() {
        tracing::debug!("config patch for {} has no content, skipping", patch.path);
        return Ok(PatchOutcome::Ignored(target));
    }

    if !fs::try_exists(&target).await? {
        tracing::debug!("config target {} does not exist, skipping", target.display());
        return Ok(PatchOutcome::MissingTarget(target));
    }

    if matches!(patch.kind, PatchKind::Json | PatchKind::ScriptEmbedded) && !patch.content.is_object() {
        return Err(ScaffoldError::Merge {
            path: target,
            message: "patch content must be an object".to_string(),
        });
    }

    match &patch.kind {
        PatchKind::Json => {
            let text = fs::read_to_string(&target).await?;
            let merged = json::merge_json_text(&text, &patch.content).map_err(|e| {
                ScaffoldError::Merge {
                    path: target.clone(),
                    message: e.to_string(),
                }
            })?;
            fs::write(&target, merged).await?;
            Ok(PatchOutcome::Merged(target))
        }
        PatchKind::Properties => {
            tracing::debug!("properties patches are not merged: {}", target.display());
            Ok(PatchOutcome::Ignored(target))
        }
        PatchKind::ScriptEmbedded => {
            let text = fs::read_to_string(&target).await?;
            let merged = merge_script(&text, &patch.content, PRESERVED_IDENTIFIERS).map_err(
                |e| ScaffoldError::Merge {
                    path: target.clone(),
                    message: e.to_string(),
                },
            )?;
            fs::write(&target, merged).await?;
            Ok(PatchOutcome::Merged(target))
        }
        PatchKind::Unknown(kind) => {
            tracing::warn!("unknown config patch type '{}' for {}", kind, patch.path);
            Ok(PatchOutcome::Ignored(target))
        }
    }
}

/// Apply patches in declaration order, stopping at the first failure
pub async fn apply_patches(project_root: &Path, patches: &[ConfigPatch]) -> Result<Vec<PatchOutcome>> {
    let mut outcomes = Vec::with_capacity(patches.len());
    for patch in patches {
        outcomes.push(apply_patch(project_root, patch).await?);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(path: &str, kind: &str, content: Value) -> ConfigPatch {
        ConfigPatch {
            path: path.to_string(),
            kind: PatchKind::from(kind.to_string()),
            content,
        }
    }

    #[test]
    fn test_kind_parsing_is_case_insensitive() {
        assert_eq!(PatchKind::from("JSON".to_string()), PatchKind::Json);
        assert_eq!(PatchKind::from("Gruntfile".to_string()), PatchKind::ScriptEmbedded);
        assert_eq!(PatchKind::from("properties".to_string()), PatchKind::Properties);
        assert_eq!(
            PatchKind::from("toml".to_string()),
            PatchKind::Unknown("toml".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_target_is_never_created() {
        let dir = tempfile::tempdir().unwrap();
        for kind in ["json", "properties", "grunt"] {
            let outcome = apply_patch(dir.path(), &patch("bower.json", kind, json!({"a": 1})))
                .await
                .unwrap();
            assert!(matches!(outcome, PatchOutcome::MissingTarget(_)));
        }
        assert!(!dir.path().join("bower.json").exists());
    }

    #[tokio::test]
    async fn test_patch_without_content_keeps_target() {
        let dir = tempfile::tempdir().unwrap();
        let original = r#"{"name":"app","dependencies":{"y":"2.0"}}"#;
        std::fs::write(dir.path().join("package.json"), original).unwrap();
        std::fs::write(dir.path().join("Gruntfile.js"), "grunt.initConfig({ a: 1 });").unwrap();

        let declared: Vec<ConfigPatch> = serde_yaml::from_str(
            "- path: package.json\n  type: json\n- path: Gruntfile.js\n  type: grunt\n",
        )
        .unwrap();
        let outcomes = apply_patches(dir.path(), &declared).await.unwrap();

        assert!(outcomes.iter().all(|o| matches!(o, PatchOutcome::Ignored(_))));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("package.json")).unwrap(),
            original
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Gruntfile.js")).unwrap(),
            "grunt.initConfig({ a: 1 });"
        );
    }

    #[tokio::test]
    async fn test_scalar_content_is_a_merge_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("package.json");
        std::fs::write(&target, r#"{"name":"app"}"#).unwrap();

        let err = apply_patch(dir.path(), &patch("package.json", "json", json!("oops")))
            .await
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::Merge { .. }));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), r#"{"name":"app"}"#);
    }

    #[tokio::test]
    async fn test_json_patch_merges_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("package.json");
        std::fs::write(&target, r#"{"dependencies":{"y":"2.0"}}"#).unwrap();

        let outcome = apply_patch(
            dir.path(),
            &patch("package.json", "json", json!({"dependencies": {"x": "1.0"}})),
        )
        .await
        .unwrap();
        assert_eq!(outcome, PatchOutcome::Merged(target.clone()));

        let merged: Value = serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(merged, json!({"dependencies": {"x": "1.0", "y": "2.0"}}));
    }

    #[tokio::test]
    async fn test_properties_patch_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("application.conf");
        std::fs::write(&target, "db.url=jdbc:h2:mem\n").unwrap();

        let outcome = apply_patch(
            dir.path(),
            &patch("application.conf", "properties", json!({"db.user": "sa"})),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, PatchOutcome::Ignored(_)));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "db.url=jdbc:h2:mem\n");
    }

    #[tokio::test]
    async fn test_malformed_script_is_a_merge_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Gruntfile.js"), "grunt.initConfig({ a: foo() });").unwrap();

        let err = apply_patch(dir.path(), &patch("Gruntfile.js", "grunt", json!({"b": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::Merge { .. }));
    }
}
