//! Glob matching for template file rules
//!
//! Supports the subset used by template `files` maps: `*` and `?` within a
//! segment, `[...]` classes (with `!`/`^` negation and ranges), and `**` as a
//! whole segment matching any number of directories. Paths use `/` separators.

/// Check whether a `/`-separated relative path matches a glob pattern
pub fn glob_match(pattern: &str, path: &str) -> bool {
    let pattern: Vec<&str> = pattern.trim_start_matches("./").split('/').collect();
    let path: Vec<&str> = path.split('/').collect();
    match_segments(&pattern, &path)
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => {
            // `**` swallows zero or more segments
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((head, rest)) => match path.split_first() {
            Some((segment, path_rest)) => {
                match_segment(head.as_bytes(), segment.as_bytes())
                    && match_segments(rest, path_rest)
            }
            None => false,
        },
    }
}

fn match_segment(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some(b'*') => (0..=text.len()).any(|skip| match_segment(&pattern[1..], &text[skip..])),
        Some(b'?') => !text.is_empty() && match_segment(&pattern[1..], &text[1..]),
        Some(b'[') => match (parse_class(pattern), text.first()) {
            (Some((class, consumed)), Some(&c)) => {
                class.matches(c) && match_segment(&pattern[consumed..], &text[1..])
            }
            // An unterminated class is a literal '['
            (None, Some(&b'[')) => match_segment(&pattern[1..], &text[1..]),
            _ => false,
        },
        Some(&literal) => text.first() == Some(&literal) && match_segment(&pattern[1..], &text[1..]),
    }
}

struct CharClass {
    negated: bool,
    ranges: Vec<(u8, u8)>,
}

impl CharClass {
    fn matches(&self, c: u8) -> bool {
        let hit = self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
        hit != self.negated
    }
}

/// Parse a `[...]` class at the start of `pattern`, returning it with the
/// number of bytes it spans
fn parse_class(pattern: &[u8]) -> Option<(CharClass, usize)> {
    let mut i = 1;
    let negated = matches!(pattern.get(i), Some(b'!') | Some(b'^'));
    if negated {
        i += 1;
    }
    let mut ranges = Vec::new();
    let mut first = true;
    while let Some(&c) = pattern.get(i) {
        if c == b']' && !first {
            return Some((CharClass { negated, ranges }, i + 1));
        }
        first = false;
        if pattern.get(i + 1) == Some(&b'-') && pattern.get(i + 2).is_some_and(|&e| e != b']') {
            ranges.push((c, pattern[i + 2]));
            i += 3;
        } else {
            ranges.push((c, c));
            i += 1;
        }
    }
    None
}
