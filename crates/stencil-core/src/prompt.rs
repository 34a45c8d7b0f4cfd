//! Prompt descriptors, answers, and the interactive capabilities the core consumes
//!
//! The core never talks to a terminal directly. Everything interactive goes
//! through [`Prompter`], and every status line goes through [`Reporter`].

use crate::error::{Result, ScaffoldError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;

/// Kind of question a prompt asks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    #[default]
    Input,
    Password,
    Confirm,
    #[serde(alias = "rawlist")]
    List,
    Checkbox,
}

/// One selectable choice of a `list` or `checkbox` prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Choice {
    Plain(String),
    Named { name: String, value: Value },
}

impl Choice {
    pub fn label(&self) -> &str {
        match self {
            Choice::Plain(s) => s,
            Choice::Named { name, .. } => name,
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Choice::Plain(s) => Value::String(s.clone()),
            Choice::Named { value, .. } => value.clone(),
        }
    }
}

/// Validation rule attached to a prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "lowercase")]
pub enum Validation {
    Required {
        #[serde(default)]
        message: Option<String>,
    },
    Regex {
        pattern: String,
        #[serde(default)]
        message: Option<String>,
    },
}

/// Conversion applied to an answer after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    Int,
    Boolean,
    Undefined,
}

/// A prompt declared by a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: PromptKind,

    #[serde(default)]
    pub default: Option<Value>,

    #[serde(default)]
    pub choices: Vec<Choice>,

    #[serde(default)]
    pub validate: Option<Validation>,

    #[serde(default)]
    pub filter: Option<Filter>,
}

impl Prompt {
    /// Message shown to the user (falls back to the prompt name)
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or(&self.name)
    }

    /// Check a raw answer against the prompt's validation rule
    pub fn validate(&self, answer: &Value) -> std::result::Result<(), String> {
        let text = match answer {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        match &self.validate {
            None => Ok(()),
            Some(Validation::Required { message }) => {
                if text.is_empty() {
                    Err(message
                        .clone()
                        .unwrap_or_else(|| "You must enter a value.".to_string()))
                } else {
                    Ok(())
                }
            }
            Some(Validation::Regex { pattern, message }) => {
                let regex = regex::Regex::new(pattern)
                    .map_err(|e| format!("invalid pattern '{}': {}", pattern, e))?;
                if regex.is_match(&text) {
                    Ok(())
                } else {
                    Err(message
                        .clone()
                        .unwrap_or_else(|| format!("Value must match {}", pattern)))
                }
            }
        }
    }

    /// Apply the prompt's filter to a validated answer
    pub fn apply_filter(&self, answer: Value) -> Value {
        match self.filter {
            None => answer,
            Some(Filter::Int) => {
                let parsed = match &answer {
                    Value::Number(n) => n.as_f64().map(|f| f.trunc() as i64),
                    Value::String(s) => leading_int(s),
                    Value::Bool(b) => Some(i64::from(*b)),
                    _ => None,
                };
                parsed.map(Value::from).unwrap_or(Value::Null)
            }
            Some(Filter::Boolean) => Value::Bool(is_truthy(&answer)),
            Some(Filter::Undefined) => match answer {
                Value::String(s) if s.is_empty() => Value::Null,
                other => other,
            },
        }
    }
}

/// Parse the leading integer of a string, ignoring trailing garbage
fn leading_int(s: &str) -> Option<i64> {
    let trimmed = s.trim_start();
    let end = trimmed
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    trimmed[..end].parse().ok()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Answers gathered from a template's prompts, in prompt order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Answers(Map<String, Value>);

impl Answers {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Answers {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Interactive capability: asks questions and returns raw answers
pub trait Prompter {
    /// Ask one declared prompt and return the raw answer
    fn answer(&mut self, prompt: &Prompt) -> Result<Value>;

    /// Single choice among labels; returns the chosen index
    fn select(&mut self, message: &str, labels: &[String]) -> Result<usize>;

    /// Yes/no question
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;
}

/// Ask every prompt in order, validating and filtering each answer
pub fn answer_prompts(prompts: &[Prompt], prompter: &mut dyn Prompter) -> Result<Answers> {
    let mut answers = Map::new();
    for prompt in prompts {
        let raw = prompter.answer(prompt)?;
        prompt
            .validate(&raw)
            .map_err(|message| ScaffoldError::InvalidAnswer {
                prompt: prompt.name.clone(),
                message,
            })?;
        answers.insert(prompt.name.clone(), prompt.apply_filter(raw));
    }
    Ok(Answers(answers))
}

/// Non-interactive prompter: replays queued answers, then falls back to defaults
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Value>,
    selections: VecDeque<usize>,
    confirmations: VecDeque<bool>,
    /// Labels offered by every `select` call, for inspection
    pub offered: Vec<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, answer: impl Into<Value>) -> Self {
        self.answers.push_back(answer.into());
        self
    }

    pub fn with_selection(mut self, index: usize) -> Self {
        self.selections.push_back(index);
        self
    }

    pub fn with_confirmation(mut self, yes: bool) -> Self {
        self.confirmations.push_back(yes);
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn answer(&mut self, prompt: &Prompt) -> Result<Value> {
        if let Some(answer) = self.answers.pop_front() {
            return Ok(answer);
        }
        Ok(match (&prompt.default, prompt.kind) {
            (Some(default), _) => default.clone(),
            (None, PromptKind::Confirm) => Value::Bool(false),
            (None, PromptKind::List) => prompt
                .choices
                .first()
                .map(Choice::value)
                .unwrap_or(Value::Null),
            (None, PromptKind::Checkbox) => Value::Array(Vec::new()),
            (None, _) => Value::String(String::new()),
        })
    }

    fn select(&mut self, message: &str, labels: &[String]) -> Result<usize> {
        self.offered.push(labels.to_vec());
        match self.selections.pop_front() {
            Some(index) if index < labels.len() => Ok(index),
            Some(index) => Err(ScaffoldError::Selection {
                message: format!("choice {} out of range for '{}'", index, message),
            }),
            None => Ok(0),
        }
    }

    fn confirm(&mut self, _message: &str, default: bool) -> Result<bool> {
        Ok(self.confirmations.pop_front().unwrap_or(default))
    }
}

/// Status attached to a reported line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Write,
    #[default]
    Writeln,
    Ok,
    Skip,
    Force,
    Create,
    Invoke,
    Conflict,
    Identical,
    Info,
}

/// Output capability for status lines
pub trait Reporter {
    fn report(&mut self, status: Status, message: &str);
}

/// Reporter that keeps every line, used by tests and quiet runs
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    pub lines: Vec<(Status, String)>,
}

impl Reporter for RecordingReporter {
    fn report(&mut self, status: Status, message: &str) {
        self.lines.push((status, message.to_string()));
    }
}
