//! Merging into a configuration literal embedded in a script
//!
//! Build scripts such as Gruntfiles keep their configuration as the single
//! argument of an `initConfig(...)` call. The argument is parsed with a
//! restricted literal parser (objects, arrays, strings, numbers, booleans,
//! `null`, comments, trailing commas, unquoted keys), merged, and spliced
//! back at the exact same offsets. Nothing in the script is evaluated.
//!
//! Bare identifiers rooted at one of the preserved names (for example
//! `configuration` or `configuration.dir`) survive the round trip verbatim.

use super::json::deep_merge;
use serde_json::{Map, Number, Value};
use std::fmt;

/// Call whose argument holds the configuration
pub const CALL_TOKEN: &str = "initConfig(";

/// Identifiers that may appear as bare values and are written back verbatim
pub const PRESERVED_IDENTIFIERS: &[&str] = &["configuration"];

/// Parse or locate failure, with a 1-based position in the script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.message, self.line, self.column)
    }
}

impl std::error::Error for ScriptError {}

/// Merge `patch` into the `initConfig(...)` literal of `script`
pub fn merge_script(script: &str, patch: &Value, preserved: &[&str]) -> Result<String, ScriptError> {
    let call = script
        .find(CALL_TOKEN)
        .ok_or_else(|| error_at(script, 0, format!("no `{}` call found", CALL_TOKEN)))?;

    let mut parser = LiteralParser::new(script, call + CALL_TOKEN.len(), preserved);
    parser.skip_trivia()?;
    let start = parser.pos;
    let mut config = parser.parse_value()?;
    let end = parser.pos;

    deep_merge(&mut config, patch);

    let pretty = serde_json::to_string_pretty(&config)
        .map_err(|e| error_at(script, start, e.to_string()))?;
    let mut rendered = reindent(&pretty, line_indent(script, call));
    for path in parser.placeholders {
        rendered = rendered.replace(&format!("\"{}\"", placeholder(&path)), &path);
    }

    let mut out = String::with_capacity(script.len() + rendered.len());
    out.push_str(&script[..start]);
    out.push_str(&rendered);
    out.push_str(&script[end..]);
    Ok(out)
}

fn placeholder(path: &str) -> String {
    format!("@{{{}}}", path)
}

/// Leading whitespace of the line containing `offset`
fn line_indent(text: &str, offset: usize) -> &str {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[line_start..];
    let width = line.len() - line.trim_start_matches(|c| c == ' ' || c == '\t').len();
    &line[..width]
}

fn reindent(text: &str, indent: &str) -> String {
    if indent.is_empty() {
        return text.to_string();
    }
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.to_string()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn error_at(text: &str, offset: usize, message: String) -> ScriptError {
    let before = &text[..offset.min(text.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(before.chars().count(), |i| {
        before[i + 1..].chars().count()
    }) + 1;
    ScriptError {
        message,
        line,
        column,
    }
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
    preserved: &'a [&'a str],
    placeholders: Vec<String>,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str, pos: usize, preserved: &'a [&'a str]) -> Self {
        Self {
            src,
            pos,
            preserved,
            placeholders: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn fail<T>(&self, message: impl Into<String>) -> Result<T, ScriptError> {
        Err(error_at(self.src, self.pos, message.into()))
    }

    fn expect(&mut self, expected: char) -> Result<(), ScriptError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => self.fail(format!("expected '{}', found '{}'", expected, c)),
            None => self.fail(format!("expected '{}', found end of input", expected)),
        }
    }

    /// Skip whitespace and `//` / `/* */` comments
    fn skip_trivia(&mut self) -> Result<(), ScriptError> {
        loop {
            let rest = &self.src[self.pos..];
            if let Some(c) = rest.chars().next().filter(|c| c.is_whitespace()) {
                self.pos += c.len_utf8();
            } else if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if rest.starts_with("/*") {
                match rest[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => return self.fail("unterminated comment"),
                }
            } else {
                return Ok(());
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, ScriptError> {
        match self.peek() {
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some(q @ ('"' | '\'')) => self.parse_string(q).map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.parse_number(),
            Some(c) if is_ident_start(c) => self.parse_identifier_value(),
            Some(c) => self.fail(format!("unexpected character '{}'", c)),
            None => self.fail("unexpected end of input"),
        }
    }

    fn parse_object(&mut self) -> Result<Value, ScriptError> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Value::Object(map));
            }
            let key = match self.peek() {
                Some(q @ ('"' | '\'')) => self.parse_string(q)?,
                Some(c) if is_ident_start(c) || c.is_ascii_digit() => self.parse_word(),
                Some(c) => return self.fail(format!("unexpected character '{}' in object key", c)),
                None => return self.fail("unterminated object"),
            };
            self.skip_trivia()?;
            self.expect(':')?;
            self.skip_trivia()?;
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {}
                Some(c) => return self.fail(format!("expected ',' or '}}', found '{}'", c)),
                None => return self.fail("unterminated object"),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, ScriptError> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(']') {
                self.bump();
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(']') => {}
                Some(c) => return self.fail(format!("expected ',' or ']', found '{}'", c)),
                None => return self.fail("unterminated array"),
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String, ScriptError> {
        self.expect(quote)?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return self.fail("unterminated string"),
                Some(c) if c == quote => return Ok(out),
                Some('\n') => return self.fail("newline in string"),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('b') => out.push('\u{8}'),
                    Some('f') => out.push('\u{c}'),
                    Some('v') => out.push('\u{b}'),
                    Some('0') => out.push('\0'),
                    Some('x') => {
                        let code = self.parse_hex(2)?;
                        out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                    }
                    Some('u') => {
                        let high = self.parse_hex(4)?;
                        let code = if (0xD800..0xDC00).contains(&high)
                            && self.src[self.pos..].starts_with("\\u")
                        {
                            self.pos += 2;
                            let low = self.parse_hex(4)?;
                            0x10000 + ((high - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF)
                        } else {
                            high
                        };
                        out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                    }
                    // Line continuation
                    Some('\n') => {}
                    Some(other) => out.push(other),
                    None => return self.fail("unterminated string"),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_hex(&mut self, digits: usize) -> Result<u32, ScriptError> {
        let hex = self.src.get(self.pos..self.pos + digits).unwrap_or_default();
        match u32::from_str_radix(hex, 16) {
            Ok(code) if hex.len() == digits => {
                self.pos += digits;
                Ok(code)
            }
            _ => self.fail("invalid escape sequence"),
        }
    }

    fn parse_number(&mut self) -> Result<Value, ScriptError> {
        let start = self.pos;
        let mut negative = false;
        if let Some(sign @ ('-' | '+')) = self.peek() {
            negative = sign == '-';
            self.bump();
        }

        let rest = &self.src[self.pos..];
        if rest.starts_with("0x") || rest.starts_with("0X") {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let value = i64::from_str_radix(&self.src[digits_start..self.pos], 16)
                .or_else(|_| self.fail("invalid hex number"))?;
            return Ok(Value::from(if negative { -value } else { value }));
        }

        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E'))
        {
            let c = self.bump();
            if matches!(c, Some('e' | 'E')) && matches!(self.peek(), Some('-' | '+')) {
                self.bump();
            }
        }

        let text = self.src[start..self.pos].trim_start_matches('+');
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::from(int));
        }
        match text.parse::<f64>().ok().and_then(Number::from_f64) {
            Some(number) => Ok(Value::Number(number)),
            None => Err(error_at(self.src, start, format!("invalid number '{}'", text))),
        }
    }

    /// Identifier or keyword used as a key
    fn parse_word(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn parse_identifier_value(&mut self) -> Result<Value, ScriptError> {
        let start = self.pos;
        let mut path = self.parse_word();
        while self.peek() == Some('.')
            && self.src[self.pos + 1..].chars().next().is_some_and(is_ident_start)
        {
            self.bump();
            path.push('.');
            path.push_str(&self.parse_word());
        }

        match path.as_str() {
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            "null" => return Ok(Value::Null),
            _ => {}
        }

        let root = path.split('.').next().unwrap_or_default();
        if !self.preserved.contains(&root) {
            return Err(error_at(
                self.src,
                start,
                format!("unsupported expression '{}'", path),
            ));
        }
        self.skip_trivia()?;
        if self.peek() == Some('(') {
            return Err(error_at(
                self.src,
                start,
                format!("function call '{}(...)' is not supported", path),
            ));
        }

        let token = placeholder(&path);
        if !self.placeholders.contains(&path) {
            self.placeholders.push(path);
        }
        Ok(Value::String(token))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
