//! The `config` command tree
//!
//! Commands are a small trie: groups resolve a token through their aliases
//! and children, and the first leaf reached receives every remaining token.
//!
//! ```text
//! path list            (ls)
//! path add <value>     (+)
//! path remove <value>  (rm, -)
//! ```

use crate::config::ConfigStore;
use crate::error::{Result, ScaffoldError};
use crate::prompt::{Reporter, Status};
use crate::templates::root::RootLocation;
use colored::Colorize;

/// Everything a command handler may touch
pub struct CommandContext<'a> {
    pub store: &'a mut ConfigStore,
    /// Compiled-in roots, listed after the stored ones
    pub default_roots: Vec<String>,
    pub reporter: &'a mut dyn Reporter,
}

pub type Handler = fn(&mut CommandContext<'_>, &[String]) -> Result<()>;

/// A node of the command tree
pub enum CommandNode {
    Leaf(Handler),
    Group {
        aliases: Vec<(&'static str, &'static str)>,
        children: Vec<(&'static str, CommandNode)>,
    },
}

impl CommandNode {
    fn child(&self, token: &str) -> Option<(&'static str, &CommandNode)> {
        let CommandNode::Group { aliases, children } = self else {
            return None;
        };
        let name = aliases
            .iter()
            .find(|(alias, _)| *alias == token)
            .map_or(token, |(_, target)| *target);
        children
            .iter()
            .find(|(child, _)| *child == name)
            .map(|(child, node)| (*child, node))
    }
}

/// The full `config` command tree
pub fn command_tree() -> CommandNode {
    CommandNode::Group {
        aliases: Vec::new(),
        children: vec![(
            "path",
            CommandNode::Group {
                aliases: vec![("ls", "list"), ("rm", "remove"), ("+", "add"), ("-", "remove")],
                children: vec![
                    ("list", CommandNode::Leaf(list_paths)),
                    ("add", CommandNode::Leaf(add_path)),
                    ("remove", CommandNode::Leaf(remove_path)),
                ],
            },
        )],
    }
}

/// Walk `tokens` through the tree and run the leaf they lead to
pub fn dispatch(root: &CommandNode, tokens: &[String], ctx: &mut CommandContext<'_>) -> Result<()> {
    let mut node = root;
    let mut walked: Vec<&str> = Vec::new();
    let mut rest = tokens;

    loop {
        if let CommandNode::Leaf(handler) = node {
            tracing::debug!("dispatching '{}'", walked.join(" "));
            return handler(ctx, rest);
        }

        let Some((token, remaining)) = rest.split_first() else {
            if walked.is_empty() {
                return Err(ScaffoldError::NoCommand);
            }
            return Err(ScaffoldError::Dispatch {
                path: walked.join(" "),
            });
        };
        walked.push(token);

        match node.child(token) {
            Some((_, child)) => {
                node = child;
                rest = remaining;
            }
            None => {
                return Err(ScaffoldError::Dispatch {
                    path: walked.join(" "),
                })
            }
        }
    }
}

fn required_argument(command: &str, args: &[String]) -> Result<String> {
    args.first()
        .cloned()
        .ok_or_else(|| ScaffoldError::MissingArgument {
            command: command.to_string(),
            argument: "value".to_string(),
        })
}

fn list_paths(ctx: &mut CommandContext<'_>, _args: &[String]) -> Result<()> {
    let stored = &ctx.store.document().paths;
    let mut seen: Vec<&String> = Vec::new();
    for root in stored.iter().chain(ctx.default_roots.iter()) {
        if seen.contains(&root) {
            continue;
        }
        seen.push(root);
        let marker = if RootLocation::parse(root).is_local() {
            "local ".green()
        } else {
            "remote".cyan()
        };
        ctx.reporter.report(Status::Info, &format!("{} {}", marker, root));
    }
    Ok(())
}

fn add_path(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
    let value = required_argument("path add", args)?;
    if ctx.store.document_mut().add_path(&value) {
        ctx.reporter.report(Status::Ok, &format!("Added path {}", value));
    } else {
        ctx.reporter.report(Status::Identical, &format!("Path {} already stored", value));
    }
    Ok(())
}

fn remove_path(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
    let value = required_argument("path remove", args)?;
    if !ctx.store.document_mut().remove_path(&value) {
        return Err(ScaffoldError::UnknownPath { path: value });
    }
    ctx.reporter.report(Status::Ok, &format!("Removed path {}", value));
    Ok(())
}
