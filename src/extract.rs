//! Pulls the battle declaration out of free-form message text.

use crate::errors::{ExtractError, ExtractResult};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

const THINKING_CLOSERS: [&str; 2] = ["</planning>", "</think>"];

/// Drops everything up to and including the last `</planning>`, then the same
/// for `</think>`. Matching is ASCII case-insensitive.
pub fn strip_thinking(text: &str) -> &str {
    let mut rest = text;
    for closer in THINKING_CLOSERS {
        // ASCII lowercasing keeps byte offsets aligned with the original.
        if let Some(pos) = rest.to_ascii_lowercase().rfind(closer) {
            rest = &rest[pos + closer.len()..];
        }
    }
    rest
}

pub fn open_tag(tag: &str) -> String {
    format!("<{}>", tag)
}

pub fn contains_tag(text: &str, tag: &str) -> bool {
    text.contains(&open_tag(tag))
}

/// Inner text of the last `<tag>...</tag>` block after thinking markup is
/// removed.
pub fn last_tagged_block<'a>(text: &'a str, tag: &str) -> ExtractResult<&'a str> {
    let pattern = format!(
        "(?s){}(.*?)</{}>",
        regex::escape(&open_tag(tag)),
        regex::escape(tag)
    );
    let re = Regex::new(&pattern).map_err(|_| ExtractError::MissingTag(tag.to_string()))?;
    let visible = strip_thinking(text);
    re.captures_iter(visible)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ExtractError::MissingTag(tag.to_string()))
}

/// Removes `//` and `/* */` comments. Text inside `"` or `'` quoted strings is
/// kept verbatim, including backslash escapes. An unterminated block comment
/// swallows the rest of the input.
pub fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' || next == '\r' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Slices from the first opening bracket to the last closer of the same kind.
/// `{` is preferred over `[` unless the text starts with `[`. Without a closer
/// the remainder of the text is returned.
pub fn json_candidate(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let start = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        0
    } else {
        trimmed.find('{').or_else(|| trimmed.find('['))?
    };
    let body = &trimmed[start..];
    let close = if body.starts_with('{') { '}' } else { ']' };
    match body.rfind(close) {
        Some(end) => Some(&body[..end + close.len_utf8()]),
        None => Some(body),
    }
}

/// Full extraction: last tagged block, comments removed, parsed as JSON.
pub fn extract_declaration(text: &str, tag: &str) -> ExtractResult<Value> {
    let block = last_tagged_block(text, tag)?;
    let cleaned = strip_json_comments(block);
    let candidate = json_candidate(&cleaned).ok_or(ExtractError::NoJsonBracket)?;
    debug!(bytes = candidate.len(), "parsing battle declaration");
    serde_json::from_str(candidate).map_err(|e| {
        warn!(error = %e, "battle declaration is not valid JSON");
        ExtractError::Parse(e)
    })
}
