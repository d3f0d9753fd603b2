// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Macro definitions, argument splitting, and parameter substitution.
//!
//! Definitions use `.macro name(param, ...)` (or an unparenthesized
//! parameter tail) through `.endmacro`. Invocation and scope resolution live
//! in the processor; this module provides the mechanics shared by the inline
//! and statement forms.

use crate::core::error::{PpError, PpErrorKind};
use crate::core::text_utils::{is_ident_char, is_ident_start, skip_quoted_span, Cursor};

/// A macro: ordered unique parameters and a body of template lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<String>,
}

/// Parse the tail of a `.macro` directive: `name(a, b)`, `name a, b`, or a
/// bare `name`.
pub fn parse_macro_def(tail: &str, line: u32) -> Result<(String, Vec<String>), PpError> {
    let mut cursor = Cursor::new(tail);
    cursor.skip_ws();
    let name = cursor.take_ident().ok_or_else(|| {
        PpError::new(
            PpErrorKind::BadMacroDefinition,
            "Macro name is required after .macro",
        )
        .with_line(line)
    })?;
    cursor.skip_ws();

    let params_text = if cursor.peek() == Some(b'(') {
        let (inside, end) = extract_paren_list(tail, cursor.pos(), line)?;
        if !tail[end..].trim().is_empty() {
            return Err(PpError::new(
                PpErrorKind::BadMacroDefinition,
                "Unexpected tokens after macro parameter list",
            )
            .with_line(line)
            .with_column(end + 1));
        }
        inside
    } else {
        tail[cursor.pos()..].trim().to_string()
    };

    let params = parse_params(&params_text, &name, line)?;
    Ok((name, params))
}

fn parse_params(text: &str, name: &str, line: u32) -> Result<Vec<String>, PpError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut params: Vec<String> = Vec::new();
    for part in split_args(text) {
        let param = part.trim();
        if !is_valid_ident(param) {
            return Err(PpError::new(
                PpErrorKind::BadMacroDefinition,
                format!("Invalid parameter name '{param}' for macro '{name}'"),
            )
            .with_line(line));
        }
        if params.iter().any(|p| p.as_str() == param) {
            return Err(PpError::new(
                PpErrorKind::BadMacroDefinition,
                format!("Duplicate parameter name '{param}' for macro '{name}'"),
            )
            .with_line(line));
        }
        params.push(param.to_string());
    }
    Ok(params)
}

/// Build the arity error for an invocation of `name`.
pub fn arity_error(name: &str, expected: usize, actual: usize, line: u32) -> PpError {
    PpError::new(
        PpErrorKind::MacroArityMismatch,
        format!("Macro '{name}' expects {expected} arguments, got {actual}"),
    )
    .with_line(line)
}

/// Split a comma-separated argument list. A comma inside nested `[]`, `()`,
/// `{}`, a string, or a back-quoted span is not a separator. Arguments are
/// trimmed; an all-whitespace list is empty.
pub fn split_args(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut current = String::new();
    let mut paren_depth = 0usize;
    let mut bracket_depth = 0usize;
    let mut brace_depth = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'"' | b'`' => {
                let end = skip_quoted_span(bytes, i);
                current.push_str(&text[i..end]);
                i = end;
                continue;
            }
            b'(' => paren_depth += 1,
            b')' => paren_depth = paren_depth.saturating_sub(1),
            b'[' => bracket_depth += 1,
            b']' => bracket_depth = bracket_depth.saturating_sub(1),
            b'{' => brace_depth += 1,
            b'}' => brace_depth = brace_depth.saturating_sub(1),
            b',' if paren_depth == 0 && bracket_depth == 0 && brace_depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
                i += 1;
                continue;
            }
            _ => {}
        }
        current.push(c as char);
        i += 1;
    }
    out.push(current.trim().to_string());
    out
}

/// Extract a balanced parenthesized list starting at `start` (which must be
/// a `(`). Returns the inner text and the index just past the closing `)`.
pub fn extract_paren_list(
    code: &str,
    start: usize,
    line: u32,
) -> Result<(String, usize), PpError> {
    let bytes = code.as_bytes();
    if bytes.get(start) != Some(&b'(') {
        return Err(PpError::new(
            PpErrorKind::BadMacroDefinition,
            "Expected '(' to start argument list",
        )
        .with_line(line)
        .with_column(start + 1));
    }
    let mut i = start + 1;
    let mut depth = 1usize;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'`' => {
                i = skip_quoted_span(bytes, i);
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((code[start + 1..i].to_string(), i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(PpError::new(
        PpErrorKind::BadMacroDefinition,
        "Unterminated argument list",
    )
    .with_line(line)
    .with_column(start + 1))
}

/// Substitute actual arguments for parameter names in one body line.
/// Replacement is by exact token match: an identifier equal to a parameter
/// name is replaced, a name merely containing it is not. Quoted spans are
/// untouched.
pub fn substitute_line(line: &str, params: &[String], args: &[String]) -> String {
    let bytes = line.as_bytes();
    let mut out = String::new();
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'"' | b'`' => {
                let end = skip_quoted_span(bytes, i);
                out.push_str(&line[i..end]);
                i = end;
            }
            _ if is_ident_start(c) => {
                let mut j = i + 1;
                while j < bytes.len() && is_ident_char(bytes[j]) {
                    j += 1;
                }
                let tok = &line[i..j];
                match params.iter().position(|p| p.as_str() == tok) {
                    Some(idx) => out.push_str(args.get(idx).map(String::as_str).unwrap_or("")),
                    None => out.push_str(tok),
                }
                i = j;
            }
            _ => {
                out.push(c as char);
                i += 1;
            }
        }
    }
    out
}

fn is_valid_ident(text: &str) -> bool {
    let bytes = text.as_bytes();
    match bytes.first() {
        Some(&c) if is_ident_start(c) => {}
        _ => return false,
    }
    bytes.iter().all(|&c| is_ident_char(c))
}
