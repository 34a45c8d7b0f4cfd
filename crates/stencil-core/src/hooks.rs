//! Lifecycle hooks declared by templates
//!
//! A template may attach status lines to fixed points of a run. Absent slots
//! are explicit no-ops rather than missing fields.

use crate::error::Result;
use crate::prompt::{Reporter, Status};
use serde::{Deserialize, Serialize};

/// Fixed points of a run at which hooks fire, in lifecycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// Right after the template is loaded
    Welcome,
    /// Before the template's prompts are asked
    PrePrompts,
    /// After answers are known and content has been rendered
    PostPrompts,
    /// After the file tree has been written
    PostWriteFiles,
    /// After configuration patches have been applied
    PostWriteConfFiles,
    /// Last thing a run does
    Bye,
}

/// Capability invoked at each lifecycle point
pub trait LifecycleHooks {
    fn invoke(&self, hook: Hook, reporter: &mut dyn Reporter) -> Result<()>;
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl LifecycleHooks for NoHooks {
    fn invoke(&self, _hook: Hook, _reporter: &mut dyn Reporter) -> Result<()> {
        Ok(())
    }
}

/// One line a hook prints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookMessage {
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub message: String,
}

/// What a hook slot does when invoked
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<HookMessage>", into = "Vec<HookMessage>")]
pub enum HookAction {
    #[default]
    Noop,
    Messages(Vec<HookMessage>),
}

impl From<Vec<HookMessage>> for HookAction {
    fn from(messages: Vec<HookMessage>) -> Self {
        if messages.is_empty() {
            HookAction::Noop
        } else {
            HookAction::Messages(messages)
        }
    }
}

impl From<HookAction> for Vec<HookMessage> {
    fn from(action: HookAction) -> Self {
        match action {
            HookAction::Noop => Vec::new(),
            HookAction::Messages(messages) => messages,
        }
    }
}

impl HookAction {
    fn run(&self, reporter: &mut dyn Reporter) {
        if let HookAction::Messages(messages) = self {
            for line in messages {
                reporter.report(line.status, &line.message);
            }
        }
    }
}

/// Hook slots as declared in a template's `hooks` map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredHooks {
    #[serde(default)]
    pub welcome: HookAction,
    #[serde(default)]
    pub pre_prompts: HookAction,
    #[serde(default)]
    pub post_prompts: HookAction,
    #[serde(default)]
    pub post_write_files: HookAction,
    #[serde(default, alias = "postUpdateConfFiles")]
    pub post_write_conf_files: HookAction,
    #[serde(default)]
    pub bye: HookAction,
}

impl DeclaredHooks {
    fn slot(&self, hook: Hook) -> &HookAction {
        match hook {
            Hook::Welcome => &self.welcome,
            Hook::PrePrompts => &self.pre_prompts,
            Hook::PostPrompts => &self.post_prompts,
            Hook::PostWriteFiles => &self.post_write_files,
            Hook::PostWriteConfFiles => &self.post_write_conf_files,
            Hook::Bye => &self.bye,
        }
    }
}

impl LifecycleHooks for DeclaredHooks {
    fn invoke(&self, hook: Hook, reporter: &mut dyn Reporter) -> Result<()> {
        tracing::debug!("hook {:?}", hook);
        self.slot(hook).run(reporter);
        Ok(())
    }
}
