//! Charm-style CLI prompts using cliclack

use crate::commands::{command_tree, dispatch, CommandContext};
use crate::config::ConfigStore;
use crate::error::{Result as ScaffoldResult, ScaffoldError};
use crate::generator::{GenerateOptions, GenerateReport, Generator};
use crate::product::ProductConfig;
use crate::prompt::{Choice, Prompt, PromptKind, Prompter, Reporter, ScriptedPrompter, Status};
use crate::templates::selector::filter_candidates;
use crate::templates::{select, ConflictPolicy, RootLocation};
use anyhow::Result;
use colored::Colorize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// CLI arguments for the new command
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
    /// Template name to use
    pub template: Option<String>,

    /// Template root replacing every configured root
    pub path: Option<PathBuf>,

    /// Branch downloaded for remote templates
    pub branch: Option<String>,

    /// What to do with files that already exist
    pub conflicts: ConflictPolicy,

    /// Project directory (defaults to the current directory)
    pub project: Option<PathBuf>,

    /// Answer every prompt with its default (non-interactive mode)
    pub yes: bool,
}

/// Asks template prompts with cliclack widgets
#[derive(Debug, Clone, Copy, Default)]
pub struct CliclackPrompter;

fn default_text(prompt: &Prompt) -> Option<String> {
    match &prompt.default {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

impl CliclackPrompter {
    fn ask(&self, prompt: &Prompt) -> ScaffoldResult<Value> {
        let answer = match prompt.kind {
            PromptKind::Input => {
                let mut input = cliclack::input(prompt.message()).required(false);
                if let Some(default) = default_text(prompt) {
                    input = input.placeholder(&default).default_input(&default);
                }
                let text: String = input.interact()?;
                Value::String(text)
            }
            PromptKind::Password => {
                let text: String = cliclack::password(prompt.message()).mask('▪').interact()?;
                Value::String(text)
            }
            PromptKind::Confirm => {
                let initial = matches!(prompt.default, Some(Value::Bool(true)));
                Value::Bool(
                    cliclack::confirm(prompt.message())
                        .initial_value(initial)
                        .interact()?,
                )
            }
            PromptKind::List => {
                if prompt.choices.is_empty() {
                    return Ok(prompt.default.clone().unwrap_or(Value::Null));
                }
                let mut select = cliclack::select(prompt.message());
                for (idx, choice) in prompt.choices.iter().enumerate() {
                    select = select.item(idx, choice.label(), "");
                }
                if let Some(initial) = prompt
                    .default
                    .as_ref()
                    .and_then(|d| prompt.choices.iter().position(|c| &c.value() == d))
                {
                    select = select.initial_value(initial);
                }
                let selected_idx: usize = select.interact()?;
                prompt
                    .choices
                    .get(selected_idx)
                    .map(Choice::value)
                    .unwrap_or(Value::Null)
            }
            PromptKind::Checkbox => {
                if prompt.choices.is_empty() {
                    return Ok(Value::Array(Vec::new()));
                }
                let mut multi = cliclack::multiselect(prompt.message());
                for (idx, choice) in prompt.choices.iter().enumerate() {
                    multi = multi.item(idx, choice.label(), "");
                }
                let selected: Vec<usize> = multi.required(false).interact()?;
                Value::Array(
                    selected
                        .into_iter()
                        .filter_map(|idx| prompt.choices.get(idx).map(Choice::value))
                        .collect(),
                )
            }
        };
        Ok(answer)
    }
}

impl Prompter for CliclackPrompter {
    fn answer(&mut self, prompt: &Prompt) -> ScaffoldResult<Value> {
        // Re-ask until the answer passes the prompt's own validation
        loop {
            let answer = self.ask(prompt)?;
            match prompt.validate(&answer) {
                Ok(()) => return Ok(answer),
                Err(message) => cliclack::log::warning(message)?,
            }
        }
    }

    fn select(&mut self, message: &str, labels: &[String]) -> ScaffoldResult<usize> {
        let mut select = cliclack::select(message);
        for (idx, label) in labels.iter().enumerate() {
            select = select.item(idx, label, "");
        }
        select.interact().map_err(|e| ScaffoldError::Selection {
            message: e.to_string(),
        })
    }

    fn confirm(&mut self, message: &str, default: bool) -> ScaffoldResult<bool> {
        Ok(cliclack::confirm(message).initial_value(default).interact()?)
    }
}

/// Prints status lines through cliclack's log
#[derive(Debug, Clone, Copy, Default)]
pub struct CliclackReporter;

impl Reporter for CliclackReporter {
    fn report(&mut self, status: Status, message: &str) {
        let printed = match status {
            Status::Ok => cliclack::log::success(message),
            Status::Conflict => cliclack::log::warning(message),
            Status::Info | Status::Write | Status::Writeln => cliclack::log::info(message),
            Status::Create => cliclack::log::step(format!("{} {}", "create".green(), message)),
            Status::Force => cliclack::log::step(format!("{} {}", "force".yellow(), message)),
            Status::Invoke => cliclack::log::step(format!("{} {}", "invoke".blue(), message)),
            Status::Skip => cliclack::log::remark(format!("{} {}", "skip".yellow(), message)),
            Status::Identical => {
                cliclack::log::remark(format!("{} {}", "identical".cyan(), message))
            }
        };
        if let Err(e) = printed {
            tracing::debug!("failed to print status line: {}", e);
        }
    }
}

fn project_root(project: Option<&Path>) -> Result<PathBuf> {
    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let path = match project {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => current_dir.join(dir),
        None => current_dir,
    };

    // Validate parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.exists() && parent != Path::new("") {
            anyhow::bail!("Parent directory does not exist: {}", parent.display());
        }
    }
    Ok(path)
}

fn root_line(root: &RootLocation) -> String {
    let marker = if root.is_local() {
        "local ".green()
    } else {
        "remote".cyan()
    };
    format!("{} {}", marker, root)
}

/// Locate the template behind spinners, then run the rest of the lifecycle
async fn generate<C: ProductConfig>(
    generator: &Generator<C>,
    options: &GenerateOptions,
    store: &ConfigStore,
    prompter: &mut dyn Prompter,
    reporter: &mut dyn Reporter,
) -> Result<GenerateReport> {
    let identifier = generator.identifier(options)?;
    let roots = generator.roots(options.path.as_deref(), store);
    let listing: Vec<String> = roots.iter().map(root_line).collect();
    cliclack::log::info(format!(
        "Looking for your template at the following paths:\n{}",
        listing.join("\n")
    ))?;

    let spinner = cliclack::spinner();
    spinner.start(format!("Resolving {}...", identifier));
    let candidates = generator.candidates(&identifier, &roots).await;
    spinner.stop(format!("Found {} candidate(s)", filter_candidates(&candidates).len()));

    let selected = select(&identifier, &candidates, prompter)?;
    let selected = if selected.local_path.is_some() {
        selected
    } else {
        let spinner = cliclack::spinner();
        spinner.start("Downloading template...");
        match generator.fetch(selected, generator.branch(options)).await {
            Ok(downloaded) => {
                spinner.stop("Template downloaded");
                downloaded
            }
            Err(e) => {
                spinner.error("Download failed");
                return Err(e.into());
            }
        }
    };

    Ok(generator
        .generate_from(&identifier, &selected, options, store, prompter, reporter)
        .await?)
}

/// Run the generator with interactive prompts
pub async fn run<C: ProductConfig>(config: &C, args: CreateArgs, cli_version: &str) -> Result<()> {
    cliclack::intro(config.display_name())?;

    let project_dir = project_root(args.project.as_deref())?;
    let store = ConfigStore::for_project(&project_dir, config.config_file())?;
    if let Some(path) = &args.path {
        cliclack::log::info(format!("Using templates from {}", path.display()))?;
    }

    let generator = Generator::new(config.clone(), project_dir.clone(), cli_version);
    let options = GenerateOptions {
        template: args.template.clone(),
        path: args.path.clone(),
        branch: args.branch.clone(),
        conflicts: args.conflicts,
    };

    let mut reporter = CliclackReporter;
    let report = if args.yes {
        let mut prompter = ScriptedPrompter::new();
        generate(&generator, &options, &store, &mut prompter, &mut reporter).await?
    } else {
        let mut prompter = CliclackPrompter;
        generate(&generator, &options, &store, &mut prompter, &mut reporter).await?
    };

    cliclack::outro(format!(
        "Generated {} file(s) in {}",
        report.files.len(),
        project_dir.display()
    ))?;

    Ok(())
}

/// Run one `config` command against the project's stored document
pub fn run_config<C: ProductConfig>(
    config: &C,
    project: Option<&Path>,
    tokens: &[String],
) -> Result<()> {
    let project_dir = project_root(project)?;
    let mut reporter = CliclackReporter;

    ConfigStore::scoped(project_dir.join(config.config_file()), |store| {
        let mut ctx = CommandContext {
            store,
            default_roots: config.default_roots(),
            reporter: &mut reporter,
        };
        dispatch(&command_tree(), tokens, &mut ctx)
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_line_marks_location() {
        colored::control::set_override(false);
        let local = root_line(&RootLocation::parse("/opt/templates"));
        let remote = root_line(&RootLocation::parse("https://github.com/stencil-templates"));
        assert_eq!(local, "local  /opt/templates");
        assert_eq!(remote, "remote https://github.com/stencil-templates");
    }
}
