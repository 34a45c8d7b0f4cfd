//! Concurrent probing of template roots
//!
//! Every root is probed at once; the join waits for all probes to settle and
//! never lets one failing root abort the others.

use super::root::{RootLocation, RootTarget};
use std::path::PathBuf;
use tokio::task::JoinSet;
use url::Url;

/// Response data kept from a remote probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMeta {
    /// URL of the response (after redirects)
    pub url: Url,
    /// HTTP status, if the transport reported one
    pub status: Option<u16>,
}

/// Outcome of probing one root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found(PathBuf),
    FoundRemote(RemoteMeta),
    NotFound,
}

/// A root paired with its probe outcome for one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCandidate {
    pub root: RootLocation,
    pub outcome: ProbeOutcome,
}

/// Probes template roots, locally or over HTTP
#[derive(Clone)]
pub struct PathResolver {
    client: reqwest::Client,
}

impl PathResolver {
    pub fn new(user_agent: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Probe a single root. Never fails; problems settle as `NotFound`.
    pub async fn probe(&self, root: &RootLocation, identifier: &str) -> ProbeOutcome {
        let target = match root.join(identifier) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!("Cannot join '{}' onto root {}: {}", identifier, root, e);
                return ProbeOutcome::NotFound;
            }
        };

        match target {
            RootTarget::Local(path) => {
                tracing::debug!("probing local {}", path.display());
                match tokio::fs::try_exists(&path).await {
                    Ok(true) => ProbeOutcome::Found(path),
                    _ => ProbeOutcome::NotFound,
                }
            }
            RootTarget::Remote(url) => {
                tracing::debug!("probing remote {}", url);
                match self.client.head(url.clone()).send().await {
                    Ok(response) => ProbeOutcome::FoundRemote(RemoteMeta {
                        url: response.url().clone(),
                        status: Some(response.status().as_u16()),
                    }),
                    Err(e) => {
                        tracing::warn!("Remote probe of {} failed: {}", url, e);
                        ProbeOutcome::NotFound
                    }
                }
            }
        }
    }

    /// Probe every root concurrently and return once all have settled,
    /// in the order the roots were given.
    pub async fn resolve_all(
        &self,
        roots: &[RootLocation],
        identifier: &str,
    ) -> Vec<ResolvedCandidate> {
        let mut probes = JoinSet::new();
        for (index, root) in roots.iter().enumerate() {
            let resolver = self.clone();
            let root = root.clone();
            let identifier = identifier.to_string();
            probes.spawn(async move { (index, resolver.probe(&root, &identifier).await) });
        }

        let mut outcomes = vec![ProbeOutcome::NotFound; roots.len()];
        while let Some(settled) = probes.join_next().await {
            match settled {
                Ok((index, outcome)) => outcomes[index] = outcome,
                Err(e) => tracing::warn!("Probe task failed: {}", e),
            }
        }

        roots
            .iter()
            .cloned()
            .zip(outcomes)
            .map(|(root, outcome)| ResolvedCandidate { root, outcome })
            .collect()
    }
}
