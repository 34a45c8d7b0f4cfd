//! Downloading remote templates into the local cache
//!
//! Only GitHub-hosted templates are supported: the selected branch is fetched
//! as a zip archive and unpacked into `{cache}/{owner}/{repo}/{branch}`.

use super::selector::SelectedPath;
use crate::error::{Result, ScaffoldError};
use crate::product::ProductConfig;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tokio::fs;
use url::Url;
use zip::ZipArchive;

/// Environment variable name for GitHub token (works with private repos)
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Host serving branch archives
pub const DEFAULT_ARCHIVE_BASE: &str = "https://codeload.github.com";

/// Owner and repository of a GitHub URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRepo {
    pub owner: String,
    pub repo: String,
}

impl GithubRepo {
    /// Extract owner/repo from a URL on a GitHub host
    pub fn from_url(url: &Url) -> Option<Self> {
        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
        let owner = segments.next()?.to_string();
        let repo = segments.next()?.trim_end_matches(".git").to_string();
        Some(Self { owner, repo })
    }
}

/// Remote fetcher - turns a remote candidate into a local directory
pub struct RemoteFetcher {
    client: reqwest::Client,
    cache_dir: PathBuf,
    /// Overrides [`DEFAULT_ARCHIVE_BASE`]
    archive_base: Option<Url>,
    /// Optional GitHub token for private repos
    github_token: Option<String>,
}

impl RemoteFetcher {
    /// Create a new fetcher with a custom user agent
    pub fn new(cache_dir: PathBuf, user_agent: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            cache_dir,
            archive_base: None,
            github_token: std::env::var(GITHUB_TOKEN_ENV).ok(),
        }
    }

    /// Create a fetcher from a product config
    pub fn from_config<C: ProductConfig>(config: &C) -> Self {
        Self::new(config.cache_dir(), config.user_agent())
    }

    /// Serve archives from another host (mirrors, tests)
    pub fn with_archive_base(mut self, base: Url) -> Self {
        self.archive_base = Some(base);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Make sure the selection has a local path, downloading it if needed
    pub async fn ensure_local(&self, selected: SelectedPath, branch: &str) -> Result<SelectedPath> {
        if selected.local_path.is_some() {
            return Ok(selected);
        }

        let meta = selected.remote.clone().ok_or_else(|| ScaffoldError::Fetch {
            url: String::new(),
            message: "candidate has neither a local path nor a remote URL".to_string(),
        })?;

        let host = meta.url.host_str().unwrap_or_default().to_string();
        if !host.contains("github") {
            return Err(ScaffoldError::UnsupportedHost { host });
        }

        validate_branch(branch).map_err(|message| ScaffoldError::Fetch {
            url: meta.url.to_string(),
            message,
        })?;

        let repo = GithubRepo::from_url(&meta.url).ok_or_else(|| ScaffoldError::Fetch {
            url: meta.url.to_string(),
            message: "URL does not name an owner and a repository".to_string(),
        })?;

        let local = self.download(&repo, branch).await?;
        Ok(SelectedPath {
            local_path: Some(local),
            remote: Some(meta),
        })
    }

    fn archive_url(&self, repo: &GithubRepo, branch: &str) -> Result<Url> {
        let mut url = match &self.archive_base {
            Some(base) => base.clone(),
            None => Url::parse(DEFAULT_ARCHIVE_BASE).map_err(anyhow::Error::from)?,
        };
        let base = url.to_string();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("URL cannot have path segments: {}", base))?
            .pop_if_empty()
            .extend([repo.owner.as_str(), repo.repo.as_str(), "zip", "refs", "heads"])
            .extend(branch.split('/'));
        Ok(url)
    }

    /// Download one branch snapshot and unpack it into the cache
    async fn download(&self, repo: &GithubRepo, branch: &str) -> Result<PathBuf> {
        let url = self.archive_url(repo, branch)?;
        tracing::debug!("downloading {}", url);

        let fetch_error = |message: String| ScaffoldError::Fetch {
            url: url.to_string(),
            message,
        };

        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.github_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(|e| fetch_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", response.status())));
        }
        let bytes = response.bytes().await.map_err(|e| fetch_error(e.to_string()))?;

        let target = self.cache_dir.join(&repo.owner).join(&repo.repo).join(branch);
        if fs::try_exists(&target).await? {
            fs::remove_dir_all(&target).await?;
        }
        fs::create_dir_all(&target).await?;

        let count = extract_archive(&bytes, &target).map_err(|e| fetch_error(e.to_string()))?;
        tracing::debug!("unpacked {} file(s) into {}", count, target.display());
        Ok(target)
    }
}

/// Branch names become cache path segments, so each must be a plain name
fn validate_branch(branch: &str) -> std::result::Result<(), String> {
    let plain = branch.split('/').all(|segment| {
        !segment.is_empty() && segment != "." && segment != ".." && !segment.contains('\\')
    });
    if plain {
        Ok(())
    } else {
        Err(format!("invalid branch name '{}'", branch))
    }
}

/// Unpack a branch archive, dropping its single top-level directory.
/// Returns the number of files written.
fn extract_archive(bytes: &[u8], target: &Path) -> anyhow::Result<usize> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        // Entries escaping the archive root are skipped
        let Some(enclosed) = file.enclosed_name() else {
            continue;
        };
        let relative: PathBuf = enclosed.components().skip(1).collect();
        if relative.as_os_str().is_empty() {
            continue;
        }

        let destination = target.join(&relative);
        if file.is_dir() {
            std::fs::create_dir_all(&destination)?;
            continue;
        }

        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        std::fs::write(&destination, &contents)?;
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::resolver::RemoteMeta;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn branch_zip(prefix: &str, files: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options = SimpleFileOptions::default();
            zip.add_directory(format!("{}/", prefix), options).unwrap();
            for (name, content) in files {
                zip.start_file(format!("{}/{}", prefix, name), options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }

    fn remote(url: &str) -> SelectedPath {
        SelectedPath::remote(RemoteMeta {
            url: Url::parse(url).unwrap(),
            status: Some(200),
        })
    }

    #[test]
    fn test_github_repo_from_url() {
        let url = Url::parse("https://github.com/stencil-templates/jquery").unwrap();
        assert_eq!(
            GithubRepo::from_url(&url),
            Some(GithubRepo {
                owner: "stencil-templates".into(),
                repo: "jquery".into()
            })
        );
        let org_only = Url::parse("https://github.com/stencil-templates").unwrap();
        assert_eq!(GithubRepo::from_url(&org_only), None);
    }

    #[tokio::test]
    async fn test_local_selection_passes_through() {
        let fetcher = RemoteFetcher::new(PathBuf::from("/unused"), "stencil-test");
        let selected = SelectedPath::local(PathBuf::from("/templates/app"));
        assert_eq!(
            fetcher.ensure_local(selected.clone(), "master").await.unwrap(),
            selected
        );
    }

    #[tokio::test]
    async fn test_unrecognized_host_is_not_implemented() {
        let fetcher = RemoteFetcher::new(PathBuf::from("/unused"), "stencil-test");
        let err = fetcher
            .ensure_local(remote("https://gitlab.com/org/app"), "master")
            .await
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::UnsupportedHost { host } if host == "gitlab.com"));
    }

    #[tokio::test]
    async fn test_downloads_branch_into_cache() {
        let mut server = mockito::Server::new_async().await;
        let archive = branch_zip(
            "jquery-develop",
            &[("template.yaml", "engine: mustache\n"), ("src/app.js", "// app\n")],
        );
        let _mock = server
            .mock("GET", "/stencil-templates/jquery/zip/refs/heads/develop")
            .with_status(200)
            .with_body(archive)
            .create_async()
            .await;

        let cache = tempfile::tempdir().unwrap();
        let fetcher = RemoteFetcher::new(cache.path().to_path_buf(), "stencil-test")
            .with_archive_base(Url::parse(&server.url()).unwrap());

        let selected = fetcher
            .ensure_local(remote("https://github.com/stencil-templates/jquery"), "develop")
            .await
            .unwrap();

        let local = selected.local_path.unwrap();
        assert_eq!(local, cache.path().join("stencil-templates/jquery/develop"));
        assert_eq!(
            std::fs::read_to_string(local.join("template.yaml")).unwrap(),
            "engine: mustache\n"
        );
        assert!(local.join("src/app.js").is_file());
        assert!(selected.remote.is_some());
    }

    #[test]
    fn test_branch_names_must_be_plain() {
        assert!(validate_branch("master").is_ok());
        assert!(validate_branch("feature/login").is_ok());
        for bad in ["", "..", "../../elsewhere", "a//b", "./x", "feature/", "a\\b"] {
            assert!(validate_branch(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_escaping_branch_never_touches_cache() {
        let mut server = mockito::Server::new_async().await;
        let download = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .expect(0)
            .create_async()
            .await;

        let cache = tempfile::tempdir().unwrap();
        let sibling = cache.path().join("org/keep");
        std::fs::create_dir_all(&sibling).unwrap();
        let fetcher = RemoteFetcher::new(cache.path().join("inner"), "stencil-test")
            .with_archive_base(Url::parse(&server.url()).unwrap());

        let err = fetcher
            .ensure_local(remote("https://github.com/org/app"), "../../../org/keep")
            .await
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::Fetch { message, .. } if message.contains("invalid branch")));
        assert!(sibling.is_dir());
        download.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_failure_is_a_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/org/app/zip/refs/heads/master")
            .with_status(404)
            .create_async()
            .await;

        let cache = tempfile::tempdir().unwrap();
        let fetcher = RemoteFetcher::new(cache.path().to_path_buf(), "stencil-test")
            .with_archive_base(Url::parse(&server.url()).unwrap());

        let err = fetcher
            .ensure_local(remote("https://github.com/org/app"), "master")
            .await
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::Fetch { .. }));
    }
}
