//! Template root locations

use crate::product::ProductConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// One configured place to look for templates - either remote URL or local directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootLocation {
    Remote(Url),
    Local(PathBuf),
}

impl RootLocation {
    /// Parse a configured root. Only `http`/`https` URLs are remote.
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Remote(url),
            _ => Self::Local(PathBuf::from(raw)),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Location of `identifier` under this root
    pub fn join(&self, identifier: &str) -> Result<RootTarget, url::ParseError> {
        match self {
            Self::Local(root) => Ok(RootTarget::Local(root.join(identifier))),
            Self::Remote(base) => Ok(RootTarget::Remote(build_url(base, identifier)?)),
        }
    }
}

impl fmt::Display for RootLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{}", url),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A root joined with a template identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootTarget {
    Remote(Url),
    Local(PathBuf),
}

/// Build a URL by appending a path segment, preserving query parameters
fn build_url(base: &Url, path_segment: &str) -> Result<Url, url::ParseError> {
    let mut url = base.clone();
    match url.path_segments_mut() {
        Ok(mut segments) => {
            segments.pop_if_empty().push(path_segment);
        }
        Err(()) => return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase),
    }
    Ok(url)
}

/// Effective roots for a run, in priority order.
///
/// An explicit override replaces everything. Otherwise the stored paths come
/// first, then the product's compiled-in defaults. Duplicates keep their
/// first position.
pub fn effective_roots<C: ProductConfig>(
    config: &C,
    override_path: Option<&Path>,
    stored: &[String],
) -> Vec<RootLocation> {
    if let Some(path) = override_path {
        return vec![RootLocation::parse(&path.to_string_lossy())];
    }

    let mut raw: Vec<String> = Vec::new();
    for root in stored.iter().cloned().chain(config.default_roots()) {
        if !raw.contains(&root) {
            raw.push(root);
        }
    }
    raw.iter().map(|r| RootLocation::parse(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::testing::TestProduct;

    #[test]
    fn test_parse_local_and_remote() {
        assert!(RootLocation::parse("/opt/templates").is_local());
        assert!(RootLocation::parse("relative/templates").is_local());
        assert!(!RootLocation::parse("https://github.com/stencil-templates").is_local());
        // Windows drive letters parse as URLs with a one-letter scheme
        assert!(RootLocation::parse("C:\\templates").is_local());
    }

    #[test]
    fn test_join_remote_tolerates_trailing_slash() {
        let with = RootLocation::parse("https://github.com/org/");
        let without = RootLocation::parse("https://github.com/org");
        let expected = RootTarget::Remote(Url::parse("https://github.com/org/jquery").unwrap());
        assert_eq!(with.join("jquery").unwrap(), expected);
        assert_eq!(without.join("jquery").unwrap(), expected);
    }

    #[test]
    fn test_join_local() {
        let root = RootLocation::parse("/opt/templates");
        assert_eq!(
            root.join("module").unwrap(),
            RootTarget::Local(PathBuf::from("/opt/templates/module"))
        );
    }

    #[test]
    fn test_override_replaces_everything() {
        let stored = vec!["/stored".to_string()];
        let roots = effective_roots(&TestProduct, Some(Path::new("/only/here")), &stored);
        assert_eq!(roots, vec![RootLocation::Local(PathBuf::from("/only/here"))]);
    }

    #[test]
    fn test_stored_before_defaults_without_duplicates() {
        let stored = vec![
            "/b".to_string(),
            "https://github.com/stencil-templates".to_string(),
            "/a".to_string(),
        ];
        let roots: Vec<String> = effective_roots(&TestProduct, None, &stored)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            roots,
            vec!["/b", "https://github.com/stencil-templates", "/a"]
        );
    }
}
