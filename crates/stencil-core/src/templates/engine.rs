//! Text substitution engines
//!
//! Three engines share the same three constructs and differ only in their
//! delimiters:
//!
//! | engine       | escaped     | raw         | evaluated  |
//! |--------------|-------------|-------------|------------|
//! | `default`    | `<%- x %>`  | `<%= x %>`  | `<% x %>`  |
//! | `underscore` | `_-x_`      | `_=x_`      | `_x_`      |
//! | `mustache`   | `{{- x }}`  | `{{= x }}`  | `{{ x }}`  |
//!
//! Escaped and raw constructs look up a dotted path in the scope. Evaluated
//! blocks are dropped from the output and never executed.

use crate::error::{Result, ScaffoldError};
use crate::prompt::Answers;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Substitution engine selected by a template's `engine` tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Default,
    Underscore,
    Mustache,
}

impl Engine {
    /// Combined pattern: escape | interpolate | evaluate, tried in that order
    fn pattern(self) -> &'static Regex {
        static DEFAULT: OnceLock<Regex> = OnceLock::new();
        static UNDERSCORE: OnceLock<Regex> = OnceLock::new();
        static MUSTACHE: OnceLock<Regex> = OnceLock::new();

        let (cell, source) = match self {
            Engine::Default => (&DEFAULT, r"(?s)<%-(.+?)%>|<%=(.+?)%>|<%(.+?)%>"),
            Engine::Underscore => (&UNDERSCORE, r"(?s)_-(.+?)_|_=(.+?)_|_(.+?)_"),
            Engine::Mustache => (&MUSTACHE, r"(?s)\{\{-(.+?)\}\}|\{\{=(.+?)\}\}|\{\{(.+?)\}\}"),
        };
        cell.get_or_init(|| Regex::new(source).expect("engine pattern is valid"))
    }

    /// Render one string through this engine
    pub fn render(self, text: &str, scope: &Scope) -> Result<String> {
        substitute(self.pattern(), text, |caps| {
            if let Some(expr) = caps.get(1) {
                Ok(escape_html(&scope.lookup_text(expr.as_str())?))
            } else if let Some(expr) = caps.get(2) {
                scope.lookup_text(expr.as_str())
            } else {
                if let Some(code) = caps.get(3) {
                    tracing::debug!("dropping evaluated block: {}", code.as_str().trim());
                }
                Ok(String::new())
            }
        })
    }

    /// Render every string leaf of a nested value.
    ///
    /// Key order and sequence order are kept; keys and non-string leaves are
    /// returned untouched.
    pub fn render_value(self, value: &Value, scope: &Scope) -> Result<Value> {
        Ok(match value {
            Value::String(s) => Value::String(self.render(s, scope)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.render_value(item, scope))
                    .collect::<Result<_>>()?,
            ),
            Value::Object(map) => {
                let mut rendered = Map::with_capacity(map.len());
                for (key, item) in map {
                    rendered.insert(key.clone(), self.render_value(item, scope)?);
                }
                Value::Object(rendered)
            }
            other => other.clone(),
        })
    }
}

/// Render a relative path, substituting only raw `_=expr_` placeholders
pub fn render_path(path: &str, scope: &Scope) -> Result<String> {
    static RAW: OnceLock<Regex> = OnceLock::new();
    let pattern = RAW.get_or_init(|| Regex::new(r"(?s)_=(.+?)_").expect("path pattern is valid"));
    substitute(pattern, path, |caps| scope.lookup_text(&caps[1]))
}

fn substitute<F>(pattern: &Regex, text: &str, mut replace: F) -> Result<String>
where
    F: FnMut(&Captures<'_>) -> Result<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in pattern.captures_iter(text) {
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((last, last));
        out.push_str(&text[last..whole.0]);
        out.push_str(&replace(&caps)?);
        last = whole.1;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Names visible to placeholders during rendering
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: Map<String, Value>,
}

impl Scope {
    /// Answers are visible both at top level and under `prompts`
    pub fn new(answers: &Answers) -> Self {
        let mut vars = answers.as_map().clone();
        vars.insert("prompts".to_string(), Value::Object(answers.as_map().clone()));
        Self { vars }
    }

    /// Add an ambient value (does not shadow an answer of the same name)
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.vars.entry(name.to_string()).or_insert(value);
        self
    }

    fn lookup(&self, expression: &str) -> Result<&Value> {
        let expression = expression.trim();
        let mut segments = expression.split('.');
        let head = segments.next().unwrap_or_default();
        if !segments.clone().chain(std::iter::once(head)).all(is_identifier) {
            return Err(ScaffoldError::Render {
                expression: expression.to_string(),
                message: "only dotted names are supported".to_string(),
            });
        }

        let mut current = self.vars.get(head).ok_or_else(|| ScaffoldError::Render {
            expression: expression.to_string(),
            message: format!("'{}' is not defined", head),
        })?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment).unwrap_or(&Value::Null),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i))
                    .unwrap_or(&Value::Null),
                _ => &Value::Null,
            };
        }
        Ok(current)
    }

    fn lookup_text(&self, expression: &str) -> Result<String> {
        Ok(to_text(self.lookup(expression)?))
    }
}

fn is_identifier(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '-')
}

fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(to_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}
