//! The generation pipeline
//!
//! [`Generator`] composes the resolver, selector, fetcher, engine, copier and
//! merger into one run with a fixed lifecycle:
//!
//! 1. locate and load the template (`welcome`, `prePrompts`)
//! 2. ask its prompts and render its content (`postPrompts`)
//! 3. write the file tree (`postWriteFiles`)
//! 4. merge configuration patches (`postWriteConfFiles`, `bye`)

use crate::config::ConfigStore;
use crate::error::{Result, ScaffoldError};
use crate::hooks::{Hook, LifecycleHooks, NoHooks};
use crate::merge::{apply_patches, PatchOutcome};
use crate::product::ProductConfig;
use crate::prompt::{answer_prompts, Answers, Prompter, Reporter, Status};
use crate::templates::{
    check_compatibility, copy_template, effective_roots, select, ConflictPolicy, CopyOptions,
    LoadedTemplate, PathResolver, RemoteFetcher, ResolvedCandidate, RootLocation, Scope, SelectedPath,
    WrittenFile,
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Per-run options
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Template identifier; falls back to the product default
    pub template: Option<String>,
    /// Root that replaces every configured root
    pub path: Option<PathBuf>,
    /// Branch of a remote template to download
    pub branch: Option<String>,
    pub conflicts: ConflictPolicy,
}

/// What a run did
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub template: PathBuf,
    pub answers: Answers,
    pub files: Vec<WrittenFile>,
    pub patches: Vec<PatchOutcome>,
}

/// Scaffolds templates into one project
pub struct Generator<C: ProductConfig> {
    config: C,
    project_root: PathBuf,
    resolver: PathResolver,
    fetcher: RemoteFetcher,
    hooks: Box<dyn LifecycleHooks>,
    tool_version: String,
}

impl<C: ProductConfig> Generator<C> {
    pub fn new(config: C, project_root: PathBuf, tool_version: &str) -> Self {
        Self {
            resolver: PathResolver::new(config.user_agent()),
            fetcher: RemoteFetcher::from_config(&config),
            config,
            project_root,
            hooks: Box::new(NoHooks),
            tool_version: tool_version.to_string(),
        }
    }

    /// Replace the fetcher (other cache directory or archive host)
    pub fn with_fetcher(mut self, fetcher: RemoteFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Product-level hooks, invoked before the template's own
    pub fn with_hooks(mut self, hooks: impl LifecycleHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Roots searched for this run
    pub fn roots(&self, override_path: Option<&Path>, store: &ConfigStore) -> Vec<RootLocation> {
        effective_roots(&self.config, override_path, &store.document().paths)
    }

    /// Template identifier for a run, falling back to the product default
    pub fn identifier(&self, options: &GenerateOptions) -> Result<String> {
        options
            .template
            .clone()
            .or_else(|| self.config.default_template().map(String::from))
            .ok_or_else(|| ScaffoldError::MissingArgument {
                command: "new".to_string(),
                argument: "template".to_string(),
            })
    }

    /// Branch downloaded for remote templates
    pub fn branch<'a>(&'a self, options: &'a GenerateOptions) -> &'a str {
        options
            .branch
            .as_deref()
            .unwrap_or_else(|| self.config.default_branch())
    }

    /// Probe every root for `identifier`
    pub async fn candidates(&self, identifier: &str, roots: &[RootLocation]) -> Vec<ResolvedCandidate> {
        self.resolver.resolve_all(roots, identifier).await
    }

    /// Download a remote selection; local ones pass through
    pub async fn fetch(&self, selected: SelectedPath, branch: &str) -> Result<SelectedPath> {
        self.fetcher.ensure_local(selected, branch).await
    }

    /// Resolve, select and download a template
    pub async fn locate(
        &self,
        identifier: &str,
        roots: &[RootLocation],
        branch: &str,
        prompter: &mut dyn Prompter,
    ) -> Result<SelectedPath> {
        let candidates = self.candidates(identifier, roots).await;
        let selected = select(identifier, &candidates, prompter)?;
        self.fetch(selected, branch).await
    }

    /// Load the template at a selected location
    pub async fn load(&self, selected: &SelectedPath) -> Result<LoadedTemplate> {
        let path = selected.local_path.as_deref().ok_or_else(|| ScaffoldError::Load {
            path: PathBuf::new(),
            message: format!("{} was not downloaded", selected.label()),
        })?;
        LoadedTemplate::load(path).await
    }

    /// Everything placeholders can refer to
    pub async fn scope(&self, answers: &Answers, identifier: &str, store: &ConfigStore) -> Scope {
        Scope::new(answers)
            .with("templateName", Value::String(identifier.to_string()))
            .with("config", store.document().to_value())
            .with("pkg", self.package_json().await)
    }

    async fn package_json(&self) -> Value {
        let path = self.project_root.join("package.json");
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!("ignoring unreadable {}: {}", path.display(), e);
                Value::Object(Map::new())
            }),
            Err(_) => Value::Object(Map::new()),
        }
    }

    fn invoke(&self, hook: Hook, template: &dyn LifecycleHooks, reporter: &mut dyn Reporter) -> Result<()> {
        self.hooks.invoke(hook, reporter)?;
        template.invoke(hook, reporter)
    }

    /// Run the whole lifecycle for one template
    pub async fn generate(
        &self,
        options: &GenerateOptions,
        store: &ConfigStore,
        prompter: &mut dyn Prompter,
        reporter: &mut dyn Reporter,
    ) -> Result<GenerateReport> {
        let identifier = self.identifier(options)?;
        let roots = self.roots(options.path.as_deref(), store);
        let selected = self
            .locate(&identifier, &roots, self.branch(options), prompter)
            .await?;
        self.generate_from(&identifier, &selected, options, store, prompter, reporter)
            .await
    }

    /// Run the lifecycle for a template that is already located
    pub async fn generate_from(
        &self,
        identifier: &str,
        selected: &SelectedPath,
        options: &GenerateOptions,
        store: &ConfigStore,
        prompter: &mut dyn Prompter,
        reporter: &mut dyn Reporter,
    ) -> Result<GenerateReport> {
        let template = self.load(selected).await?;
        tracing::debug!("using template at {}", template.path.display());

        if let Some(version) = &template.content.version {
            if let Some(warning) =
                check_compatibility(&self.tool_version, version, self.config.upgrade_command())
            {
                tracing::warn!("{}", warning);
                reporter.report(Status::Conflict, &warning);
            }
        }

        self.invoke(Hook::Welcome, &template.content.hooks, reporter)?;
        self.invoke(Hook::PrePrompts, &template.content.hooks, reporter)?;

        let answers = answer_prompts(&template.content.prompts, prompter)?;
        let scope = self.scope(&answers, identifier, store).await;
        let content = template.render(&scope)?;
        self.invoke(Hook::PostPrompts, &content.hooks, reporter)?;

        let files = if template.is_dir {
            let copy = CopyOptions {
                engine: content.engine,
                rules: &content.files,
                scope: &scope,
                conflicts: options.conflicts,
            };
            copy_template(&template.path, &self.project_root, &copy, prompter, reporter).await?
        } else {
            Vec::new()
        };
        self.invoke(Hook::PostWriteFiles, &content.hooks, reporter)?;

        let patches = apply_patches(&self.project_root, &content.configuration).await?;
        for outcome in &patches {
            if let PatchOutcome::Merged(path) = outcome {
                let relative = path.strip_prefix(&self.project_root).unwrap_or(path);
                reporter.report(Status::Force, &relative.display().to_string());
            }
        }
        self.invoke(Hook::PostWriteConfFiles, &content.hooks, reporter)?;
        self.invoke(Hook::Bye, &content.hooks, reporter)?;

        Ok(GenerateReport {
            template: template.path,
            answers,
            files,
            patches,
        })
    }
}
