//! stencil CLI - Project scaffolding from templates

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use stencil_core::tui::CreateArgs;
use stencil_core::{ConflictPolicy, ProductConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// CLI version
pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

/// stencil product configuration
#[derive(Clone)]
pub struct StencilConfig;

impl ProductConfig for StencilConfig {
    fn name(&self) -> &'static str {
        "stencil"
    }

    fn display_name(&self) -> &'static str {
        "stencil"
    }

    fn config_file(&self) -> &'static str {
        "stencil.json"
    }

    fn default_template_url(&self) -> &'static str {
        "https://github.com/stencil-templates"
    }

    fn template_url_env(&self) -> &'static str {
        "STENCIL_TEMPLATE_URL"
    }

    fn upgrade_command(&self) -> &'static str {
        "cargo install stencil --force"
    }
}

#[derive(Parser, Debug)]
#[command(name = "stencil")]
#[command(about = "Scaffold projects from templates")]
#[command(version)]
pub struct Args {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a template into the project (default)
    New(NewArgs),
    /// Manage stored configuration, e.g. `config path add ./templates`
    Config(ConfigArgs),
}

#[derive(ClapArgs, Debug)]
pub struct NewArgs {
    /// Template name to use
    pub template: Option<String>,

    /// Template root to search instead of the configured ones
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Branch to download for remote templates
    #[arg(long)]
    pub branch: Option<String>,

    /// Overwrite existing files without asking
    #[arg(long, conflicts_with = "skip")]
    pub force: bool,

    /// Keep existing files without asking
    #[arg(long)]
    pub skip: bool,

    /// Answer every prompt with its default (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,

    /// Project directory (defaults to the current directory)
    #[arg(long)]
    pub project: Option<PathBuf>,
}

impl From<NewArgs> for CreateArgs {
    fn from(args: NewArgs) -> Self {
        let conflicts = if args.force {
            ConflictPolicy::Force
        } else if args.skip {
            ConflictPolicy::Skip
        } else {
            ConflictPolicy::Ask
        };
        CreateArgs {
            template: args.template,
            path: args.path,
            branch: args.branch,
            conflicts,
            project: args.project,
            yes: args.yes,
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Project directory holding the configuration file
    #[arg(long)]
    pub project: Option<PathBuf>,

    /// Command path and arguments
    #[arg(required = true, allow_hyphen_values = true, trailing_var_arg = true)]
    pub tokens: Vec<String>,
}

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is WARN
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("stencil=debug,stencil_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn execute(args: Args) -> Result<()> {
    let config = StencilConfig;

    match args.command {
        Some(Command::Config(config_args)) => {
            stencil_core::run_config(&config, config_args.project.as_deref(), &config_args.tokens)
        }
        Some(Command::New(new_args)) => {
            stencil_core::run(&config, new_args.into(), CLI_VERSION).await
        }
        None => {
            // No subcommand provided, default to new (interactive mode)
            stencil_core::run(&config, CreateArgs::default(), CLI_VERSION).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let args = Args::parse();
    init_tracing(args.debug);
    tracing::debug!("stencil starting with args: {:?}", args);

    let result = execute(args).await;

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = cliclack::log::error(format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_flags_map_to_conflict_policy() {
        let args = Args::try_parse_from(["stencil", "new", "web", "--force", "--path", "./t"]).unwrap();
        let Some(Command::New(new_args)) = args.command else {
            panic!("expected new");
        };
        let create: CreateArgs = new_args.into();
        assert_eq!(create.template.as_deref(), Some("web"));
        assert_eq!(create.conflicts, ConflictPolicy::Force);
        assert_eq!(create.path, Some(PathBuf::from("./t")));
    }

    #[test]
    fn test_force_and_skip_conflict() {
        assert!(Args::try_parse_from(["stencil", "new", "--force", "--skip"]).is_err());
    }

    #[test]
    fn test_config_keeps_alias_tokens() {
        let args = Args::try_parse_from(["stencil", "config", "path", "-", "./old"]).unwrap();
        let Some(Command::Config(config_args)) = args.command else {
            panic!("expected config");
        };
        assert_eq!(config_args.tokens, vec!["path", "-", "./old"]);
    }

    #[test]
    fn test_no_subcommand_defaults_to_new() {
        let args = Args::try_parse_from(["stencil", "--debug"]).unwrap();
        assert!(args.debug);
        assert!(args.command.is_none());
    }
}
