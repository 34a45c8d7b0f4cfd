//! Choosing one template location among probe results

use super::resolver::{ProbeOutcome, RemoteMeta, ResolvedCandidate};
use crate::error::{Result, ScaffoldError};
use crate::prompt::Prompter;
use std::path::PathBuf;

/// The candidate a run goes on with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedPath {
    /// Set for local candidates, and for remote ones once downloaded
    pub local_path: Option<PathBuf>,
    /// Probe response of a remote candidate
    pub remote: Option<RemoteMeta>,
}

impl SelectedPath {
    pub fn local(path: PathBuf) -> Self {
        Self {
            local_path: Some(path),
            remote: None,
        }
    }

    pub fn remote(meta: RemoteMeta) -> Self {
        Self {
            local_path: None,
            remote: Some(meta),
        }
    }

    /// Local path if known, otherwise the remote URL
    pub fn label(&self) -> String {
        match (&self.local_path, &self.remote) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(meta)) => meta.url.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Keep usable candidates: local hits, and remote hits with no status or 200
pub fn filter_candidates(candidates: &[ResolvedCandidate]) -> Vec<SelectedPath> {
    candidates
        .iter()
        .filter_map(|candidate| match &candidate.outcome {
            ProbeOutcome::Found(path) => Some(SelectedPath::local(path.clone())),
            ProbeOutcome::FoundRemote(meta) if matches!(meta.status, None | Some(200)) => {
                Some(SelectedPath::remote(meta.clone()))
            }
            _ => None,
        })
        .collect()
}

/// Pick exactly one candidate, asking the user only when several remain
pub fn select(
    identifier: &str,
    candidates: &[ResolvedCandidate],
    prompter: &mut dyn Prompter,
) -> Result<SelectedPath> {
    let mut usable = filter_candidates(candidates);
    tracing::debug!("{} usable candidate(s) for '{}'", usable.len(), identifier);

    match usable.len() {
        0 => Err(ScaffoldError::Resolution {
            identifier: identifier.to_string(),
            roots: candidates.iter().map(|c| c.root.to_string()).collect(),
        }),
        1 => Ok(usable.remove(0)),
        _ => {
            let labels: Vec<String> = usable.iter().map(SelectedPath::label).collect();
            let index = prompter
                .select("Which template do you want to use?", &labels)
                .map_err(|e| match e {
                    ScaffoldError::Selection { .. } => e,
                    other => ScaffoldError::Selection {
                        message: other.to_string(),
                    },
                })?;
            if index >= usable.len() {
                return Err(ScaffoldError::Selection {
                    message: format!("choice {} is out of range", index),
                });
            }
            Ok(usable.swap_remove(index))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use crate::templates::root::RootLocation;
    use url::Url;

    fn local(root: &str, found: bool) -> ResolvedCandidate {
        ResolvedCandidate {
            root: RootLocation::parse(root),
            outcome: if found {
                ProbeOutcome::Found(PathBuf::from(root).join("app"))
            } else {
                ProbeOutcome::NotFound
            },
        }
    }

    fn remote(root: &str, status: Option<u16>) -> ResolvedCandidate {
        ResolvedCandidate {
            root: RootLocation::parse(root),
            outcome: ProbeOutcome::FoundRemote(RemoteMeta {
                url: Url::parse(&format!("{}/app", root)).unwrap(),
                status,
            }),
        }
    }

    #[test]
    fn test_filter_drops_non_200_remote() {
        let candidates = vec![
            remote("https://github.com/a", Some(404)),
            remote("https://github.com/b", Some(200)),
            remote("https://github.com/c", None),
            local("/x", false),
        ];
        let labels: Vec<_> = filter_candidates(&candidates)
            .iter()
            .map(SelectedPath::label)
            .collect();
        assert_eq!(labels, vec!["https://github.com/b/app", "https://github.com/c/app"]);
    }

    #[test]
    fn test_single_candidate_selected_without_prompting() {
        let orders = [
            vec![local("/a", false), local("/b", true), remote("https://h.io/c", Some(500))],
            vec![remote("https://h.io/c", Some(500)), local("/b", true), local("/a", false)],
        ];
        for candidates in orders {
            let mut prompter = ScriptedPrompter::new();
            let selected = select("app", &candidates, &mut prompter).unwrap();
            assert_eq!(selected.local_path, Some(PathBuf::from("/b/app")));
            assert!(prompter.offered.is_empty());
        }
    }

    #[test]
    fn test_multiple_candidates_honour_user_pick() {
        let candidates = vec![local("/first", true), local("/second", true)];
        let mut prompter = ScriptedPrompter::new().with_selection(1);
        let selected = select("app", &candidates, &mut prompter).unwrap();

        assert_eq!(prompter.offered.len(), 1);
        assert_eq!(prompter.offered[0], vec!["/first/app", "/second/app"]);
        assert_eq!(selected.local_path, Some(PathBuf::from("/second/app")));
    }

    #[test]
    fn test_no_candidate_lists_every_root_in_order() {
        let candidates = vec![
            local("/z", false),
            remote("https://github.com/org", Some(404)),
            local("/a", false),
        ];
        let err = select("app", &candidates, &mut ScriptedPrompter::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No template found for name \"app\" at paths [/z, https://github.com/org, /a]"
        );
    }
}
