// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Addressing-mode bracket rewriting.
//!
//! `[` ... `]` spans denote indirect addressing and become `(` ... `)` for
//! the backend. An auto increment/decrement sigil may sit immediately inside
//! the opening bracket (`[-a0]`, `[--a0]`) or immediately before the closing
//! one (`[a0+]`, `[a0++]`); either way it is normalized to the backend's
//! placement: `-` before the parenthesized group, `+` after it. A sigil
//! followed by a digit is ordinary signed arithmetic and passes through, so
//! displacement forms like `[-2, a0]` keep their sign.
//!
//! The rewrite is re-entrant with macro expansion: it runs on macro
//! arguments and on already-expanded bodies alike.

use crate::core::error::{PpError, PpErrorKind};
use crate::core::text_utils::{is_ident_start, skip_quoted_span};

struct Frame {
    kind: u8,
    /// Output index of the emitted `(` for bracket frames.
    paren_pos: usize,
    /// A `+` sigil seen at the opening bracket, emitted after the close.
    pending_plus: bool,
}

/// Rewrite addressing brackets in one operand text. `col_base` is the column
/// of the text's first byte within its source line, for diagnostics.
pub fn rewrite_brackets(text: &str, line: u32, col_base: usize) -> Result<String, PpError> {
    let bytes = text.as_bytes();
    let mut out = String::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'"' | b'`' => {
                let end = skip_quoted_span(bytes, i);
                out.push_str(&text[i..end]);
                i = end;
            }
            b'[' => {
                let mut content = i + 1;
                let mut sigil = None;
                if let Some(&s) = bytes.get(content) {
                    if s == b'+' || s == b'-' {
                        let mut k = content + 1;
                        if bytes.get(k) == Some(&s) {
                            k += 1;
                        }
                        if bytes.get(k).copied().is_some_and(is_ident_start) {
                            sigil = Some(s);
                            content = k;
                        }
                    }
                }
                if sigil == Some(b'-') {
                    out.push('-');
                }
                stack.push(Frame {
                    kind: b'[',
                    paren_pos: out.len(),
                    pending_plus: sigil == Some(b'+'),
                });
                out.push('(');
                i = content;
            }
            b']' => match stack.last().map(|f| f.kind) {
                Some(b'[') => {
                    let frame = stack.pop().unwrap();
                    out.push(')');
                    if frame.pending_plus {
                        out.push('+');
                    }
                    i += 1;
                }
                Some(_) => {
                    return Err(bracket_error(
                        "Mismatched bracket nesting",
                        line,
                        col_base + i,
                    ))
                }
                None => return Err(bracket_error("Unmatched ']'", line, col_base + i)),
            },
            b'+' | b'-' if stack.last().is_some_and(|f| f.kind == b'[') => {
                let mut k = i + 1;
                if bytes.get(k) == Some(&c) {
                    k += 1;
                }
                if bytes.get(k) == Some(&b']') {
                    let frame = stack.pop().unwrap();
                    if c == b'-' {
                        out.insert(frame.paren_pos, '-');
                        out.push(')');
                    } else {
                        out.push(')');
                        out.push('+');
                    }
                    i = k + 1;
                } else {
                    out.push(c as char);
                    i += 1;
                }
            }
            b'(' | b'{' => {
                stack.push(Frame {
                    kind: c,
                    paren_pos: 0,
                    pending_plus: false,
                });
                out.push(c as char);
                i += 1;
            }
            b')' | b'}' => {
                let open = if c == b')' { b'(' } else { b'{' };
                if stack.last().is_some_and(|f| f.kind == open) {
                    stack.pop();
                }
                out.push(c as char);
                i += 1;
            }
            _ => {
                out.push(c as char);
                i += 1;
            }
        }
    }

    if stack.iter().any(|f| f.kind == b'[') {
        return Err(bracket_error(
            "Unterminated '[' in operand",
            line,
            col_base + bytes.len(),
        ));
    }
    Ok(out)
}

fn bracket_error(msg: &str, line: u32, col: usize) -> PpError {
    PpError::new(PpErrorKind::InvalidAddressingBracket, msg)
        .with_line(line)
        .with_column(col + 1)
}
