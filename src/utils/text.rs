// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Line and token handling shared by the text readers
//!
//! One escape rule holds everywhere: `\"` is a literal quote that never
//! opens or closes a quoted section, and `\#` never starts a comment.

use std::borrow::Cow;

/// How `#` is treated when splitting input into logical lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comments {
    /// `#` starts a comment anywhere outside quotes unless written as `\#`
    Inline,
    /// Only lines whose first non-blank character is `#` are comments
    Leading,
}

/// One logical input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based number of the physical line the logical line starts on
    pub number: usize,
    pub text: String,
    /// A quote was still open at end of input
    pub unterminated: bool,
}

/// Split input into trimmed, non-empty logical lines
///
/// A double quote left open at the end of a physical line continues the
/// logical line onto the next one, joined by a newline.
pub fn logical_lines(input: &str, comments: Comments) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in input.lines().enumerate() {
        let (number, text) = match pending.take() {
            Some((number, mut text)) => {
                text.push('\n');
                text.push_str(raw);
                (number, text)
            }
            None => (idx + 1, raw.to_string()),
        };

        if has_open_quote(&text, comments) {
            pending = Some((number, text));
            continue;
        }

        push_line(&mut lines, number, &text, comments, false);
    }

    if let Some((number, text)) = pending {
        push_line(&mut lines, number, &text, comments, true);
    }

    lines
}

fn push_line(lines: &mut Vec<Line>, number: usize, text: &str, comments: Comments, unterminated: bool) {
    let text = match comments {
        Comments::Inline => strip_inline_comment(text),
        Comments::Leading => {
            if text.trim_start().starts_with('#') {
                return;
            }
            text.to_string()
        }
    };
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    lines.push(Line {
        number,
        text: text.to_string(),
        unterminated,
    });
}

fn has_open_quote(text: &str, comments: Comments) -> bool {
    if comments == Comments::Leading && text.trim_start().starts_with('#') {
        return false;
    }

    let mut open = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some('"' | '#')) => {
                chars.next();
            }
            '"' => open = !open,
            '#' if !open && comments == Comments::Inline => break,
            _ => {}
        }
    }
    open
}

fn strip_inline_comment(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'#') => {
                out.push('#');
                chars.next();
            }
            '\\' if chars.peek() == Some(&'"') => {
                out.push_str("\\\"");
                chars.next();
            }
            '"' => {
                in_quotes = !in_quotes;
                out.push(c);
            }
            '#' if !in_quotes => break,
            _ => out.push(c),
        }
    }

    out
}

/// Split a line on whitespace outside double quotes
///
/// Quotes stay part of the token so assignments can tell quoted values
/// apart.
pub fn tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'"') {
            current.push(c);
            current.push('"');
            chars.next();
        } else if c == '"' {
            in_quotes = !in_quotes;
            current.push(c);
        } else if c.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Remove one pair of surrounding double quotes, if present
///
/// An escaped final quote does not close the pair.
pub fn unquote(value: &str) -> &str {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) if !inner.ends_with('\\') => inner,
        _ => value,
    }
}

/// Turn every `\"` into `"`
pub fn unescape(value: &str) -> Cow<'_, str> {
    if value.contains("\\\"") {
        Cow::Owned(value.replace("\\\"", "\""))
    } else {
        Cow::Borrowed(value)
    }
}

/// Quote a value for writing back, escaping inner quotes
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

/// Split `key=value` at the first `=`
///
/// The key is trimmed and the value unquoted. Returns `None` when there is
/// no `=`.
pub fn split_assignment(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once('=')?;
    Some((key.trim(), unquote(value.trim())))
}

/// Split a line into its first word and the trimmed remainder
pub fn first_word(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.find(char::is_whitespace) {
        Some(pos) => (&line[..pos], line[pos..].trim()),
        None => (line, ""),
    }
}
