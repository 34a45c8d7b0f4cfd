//! Template file copying with exclusion rules and rendering

use super::engine::{render_path, Engine, Scope};
use super::manifest::{FileRule, MANIFEST_FILE};
use super::pattern::glob_match;
use crate::error::{Result, ScaffoldError};
use crate::prompt::{Prompter, Reporter, Status};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// What to do when a destination file already exists with other content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    #[default]
    Ask,
    Force,
    Skip,
}

/// What happened to one template file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Created,
    Overwritten,
    Skipped,
    Identical,
}

/// One file handled by the materializer, relative to the project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub status: WriteStatus,
}

/// Collaborators and settings for one copy
pub struct CopyOptions<'a> {
    pub engine: Engine,
    pub rules: &'a [FileRule],
    pub scope: &'a Scope,
    pub conflicts: ConflictPolicy,
}

/// Determine if a relative path is excluded by any excluding rule
pub fn is_excluded(relative_path: &str, rules: &[FileRule]) -> bool {
    rules
        .iter()
        .filter(|rule| rule.excluded.is_excluded())
        .any(|rule| glob_match(&rule.pattern, relative_path))
}

fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Keep a rendered destination under the project root.
///
/// Empty segments and a leading root are dropped; `..` is rejected. An
/// empty result means the project root itself.
fn relocate(key: &str, rendered: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(rendered).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(ScaffoldError::Render {
                    expression: key.to_string(),
                    message: format!("destination {} leaves the project root", rendered),
                })
            }
        }
    }
    Ok(relative)
}

/// Copy a template tree into the project, rendering paths and contents
pub async fn copy_template(
    template_root: &Path,
    project_root: &Path,
    options: &CopyOptions<'_>,
    prompter: &mut dyn Prompter,
    reporter: &mut dyn Reporter,
) -> Result<Vec<WrittenFile>> {
    // Ensure target directory exists
    fs::create_dir_all(project_root).await?;

    let walker = WalkDir::new(template_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let key = relative_key(template_root, entry.path());
            if entry.depth() == 1 && key == MANIFEST_FILE {
                return false;
            }
            let excluded = is_excluded(&key, options.rules);
            if excluded {
                tracing::debug!("excluded {}", key);
            }
            !excluded
        });

    let mut written = Vec::new();
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let key = relative_key(template_root, entry.path());
        let relative = relocate(&key, &render_path(&key, options.scope)?)?;
        let destination = project_root.join(&relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).await?;
            continue;
        }
        if relative.as_os_str().is_empty() {
            return Err(ScaffoldError::Render {
                expression: key,
                message: "destination file name is empty".to_string(),
            });
        }

        let source = fs::read(entry.path()).await?;
        let content = match String::from_utf8(source) {
            Ok(text) => options.engine.render(&text, options.scope)?.into_bytes(),
            // Binary files are copied verbatim
            Err(raw) => raw.into_bytes(),
        };

        let status = write_file(&destination, &relative, &content, options.conflicts, prompter).await?;
        reporter.report(status_line(status), &relative.display().to_string());
        written.push(WrittenFile {
            path: relative,
            status,
        });
    }

    Ok(written)
}

async fn write_file(
    destination: &Path,
    relative: &Path,
    content: &[u8],
    policy: ConflictPolicy,
    prompter: &mut dyn Prompter,
) -> Result<WriteStatus> {
    let status = if fs::try_exists(destination).await? {
        let existing = fs::read(destination).await?;
        if existing == content {
            return Ok(WriteStatus::Identical);
        }
        let overwrite = match policy {
            ConflictPolicy::Force => true,
            ConflictPolicy::Skip => false,
            ConflictPolicy::Ask => {
                prompter.confirm(&format!("Overwrite {}?", relative.display()), false)?
            }
        };
        if !overwrite {
            return Ok(WriteStatus::Skipped);
        }
        WriteStatus::Overwritten
    } else {
        WriteStatus::Created
    };

    // Ensure parent directories exist
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(destination, content).await?;
    Ok(status)
}

fn status_line(status: WriteStatus) -> Status {
    match status {
        WriteStatus::Created => Status::Create,
        WriteStatus::Overwritten => Status::Force,
        WriteStatus::Skipped => Status::Skip,
        WriteStatus::Identical => Status::Identical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{Answers, RecordingReporter, ScriptedPrompter};
    use crate::templates::manifest::Exclusion;
    use serde_json::json;

    fn rule(pattern: &str, excluded: bool) -> FileRule {
        FileRule {
            pattern: pattern.to_string(),
            excluded: Exclusion::Flag(excluded),
        }
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn scope() -> Scope {
        let answers: Answers = [("name".to_string(), json!("Ada"))].into_iter().collect();
        Scope::new(&answers).with("data", json!({"indexName": "main"}))
    }

    async fn copy(
        template: &Path,
        project: &Path,
        rules: &[FileRule],
        conflicts: ConflictPolicy,
        prompter: &mut ScriptedPrompter,
    ) -> Vec<WrittenFile> {
        let scope = scope();
        let options = CopyOptions {
            engine: Engine::Mustache,
            rules,
            scope: &scope,
            conflicts,
        };
        copy_template(template, project, &options, prompter, &mut RecordingReporter::default())
            .await
            .unwrap()
    }

    #[test]
    fn test_only_excluding_rules_apply() {
        let rules = vec![rule("*.md", false), rule("**/skip.txt", true)];
        assert!(is_excluded("a/skip.txt", &rules));
        assert!(!is_excluded("README.md", &rules));
        assert!(!is_excluded("a/keep.txt", &rules));
    }

    #[tokio::test]
    async fn test_excluded_files_are_not_written() {
        let template = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        write(template.path(), "a/skip.txt", "skip");
        write(template.path(), "a/keep.txt", "keep");

        let written = copy(
            template.path(),
            project.path(),
            &[rule("**/skip.txt", true)],
            ConflictPolicy::Ask,
            &mut ScriptedPrompter::new(),
        )
        .await;

        assert_eq!(
            written,
            vec![WrittenFile {
                path: PathBuf::from("a/keep.txt"),
                status: WriteStatus::Created
            }]
        );
        assert!(project.path().join("a/keep.txt").is_file());
        assert!(!project.path().join("a/skip.txt").exists());
    }

    #[tokio::test]
    async fn test_excluded_directory_skips_subtree() {
        let template = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        write(template.path(), "docs/guide/intro.md", "intro");
        write(template.path(), "src/app.js", "app");

        let written = copy(
            template.path(),
            project.path(),
            &[rule("docs", true)],
            ConflictPolicy::Ask,
            &mut ScriptedPrompter::new(),
        )
        .await;

        assert_eq!(written.len(), 1);
        assert!(!project.path().join("docs").exists());
    }

    #[tokio::test]
    async fn test_manifest_is_never_copied_and_content_is_rendered() {
        let template = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        write(template.path(), MANIFEST_FILE, "engine: mustache\n");
        write(template.path(), "_=data.indexName_.js", "// Hello, {{=name}}!\n");

        let written = copy(
            template.path(),
            project.path(),
            &[],
            ConflictPolicy::Ask,
            &mut ScriptedPrompter::new(),
        )
        .await;

        assert_eq!(written.len(), 1);
        assert_eq!(written[0].path, PathBuf::from("main.js"));
        assert!(!project.path().join(MANIFEST_FILE).exists());
        assert_eq!(
            std::fs::read_to_string(project.path().join("main.js")).unwrap(),
            "// Hello, Ada!\n"
        );
    }

    #[test]
    fn test_relocate_stays_under_root() {
        assert_eq!(relocate("k", "/x.js").unwrap(), PathBuf::from("x.js"));
        assert_eq!(relocate("k", "a//./b.js").unwrap(), PathBuf::from("a/b.js"));
        assert!(matches!(
            relocate("k", "a/../../etc/passwd"),
            Err(ScaffoldError::Render { .. })
        ));
        assert_eq!(relocate("k", "/").unwrap(), PathBuf::new());
    }

    #[tokio::test]
    async fn test_rendered_paths_cannot_escape_project() {
        let template = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        write(template.path(), "_=dir_/escape.txt", "escape");
        write(template.path(), "_=data.missing_/nested.txt", "nested");

        let answers: Answers = [(
            "dir".to_string(),
            json!(outside.path().display().to_string()),
        )]
        .into_iter()
        .collect();
        let scope = Scope::new(&answers).with("data", json!({}));
        let options = CopyOptions {
            engine: Engine::Mustache,
            rules: &[],
            scope: &scope,
            conflicts: ConflictPolicy::Ask,
        };
        let written = copy_template(
            template.path(),
            project.path(),
            &options,
            &mut ScriptedPrompter::new(),
            &mut RecordingReporter::default(),
        )
        .await
        .unwrap();

        assert!(!outside.path().join("escape.txt").exists());
        assert!(written.iter().all(|f| f.path.is_relative()));
        assert!(project.path().join("nested.txt").is_file());
        let escaped = outside.path().strip_prefix("/").unwrap().join("escape.txt");
        assert!(project.path().join(escaped).is_file());
    }

    #[tokio::test]
    async fn test_binary_files_are_copied_verbatim() {
        let template = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let bytes = [0xff, 0xfe, b'{', b'{', b'=', 0x00];
        std::fs::write(template.path().join("logo.bin"), bytes).unwrap();

        copy(
            template.path(),
            project.path(),
            &[],
            ConflictPolicy::Ask,
            &mut ScriptedPrompter::new(),
        )
        .await;

        assert_eq!(std::fs::read(project.path().join("logo.bin")).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_conflicts_follow_policy() {
        let template = tempfile::tempdir().unwrap();
        write(template.path(), "same.txt", "same");
        write(template.path(), "other.txt", "new");

        for (policy, confirmation, expected, content) in [
            (ConflictPolicy::Force, None, WriteStatus::Overwritten, "new"),
            (ConflictPolicy::Skip, None, WriteStatus::Skipped, "old"),
            (ConflictPolicy::Ask, Some(true), WriteStatus::Overwritten, "new"),
            (ConflictPolicy::Ask, Some(false), WriteStatus::Skipped, "old"),
        ] {
            let project = tempfile::tempdir().unwrap();
            write(project.path(), "same.txt", "same");
            write(project.path(), "other.txt", "old");

            let mut prompter = ScriptedPrompter::new();
            if let Some(yes) = confirmation {
                prompter = prompter.with_confirmation(yes);
            }
            let written = copy(template.path(), project.path(), &[], policy, &mut prompter).await;

            assert_eq!(written[0].path, PathBuf::from("other.txt"));
            assert_eq!(written[0].status, expected);
            assert_eq!(written[1].status, WriteStatus::Identical);
            assert_eq!(
                std::fs::read_to_string(project.path().join("other.txt")).unwrap(),
                content
            );
        }
    }
}
