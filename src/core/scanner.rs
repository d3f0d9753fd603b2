// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Token scanner for the preprocessor dialect.
//!
//! The scanner classifies raw input without look-behind: identifiers (which
//! may carry the `.` and `$` sigils), numbers, double-quoted strings,
//! back-quoted code spans, comments (`;` and `//`), whitespace, continuations
//! (`\` immediately before a line end), newlines, and single-character
//! punctuation. Strings and code spans are atomic: nothing inside them is
//! ever expanded, and newlines inside them count toward line height.
//!
//! An unterminated string or code span is accepted up to end of input. Both
//! quote kinds recover the same way; the span is recorded so the driver can
//! report a warning.

use crate::core::text_utils::{is_ident_char, is_ident_start, is_space};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: u32,
    pub col_start: usize,
    pub col_end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    Str,
    CodeSpan,
    Comment,
    Punct,
    Whitespace,
    Continuation,
    Newline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

impl<'a> Token<'a> {
    /// Count the line breaks embedded in this token's text.
    pub fn newlines(&self) -> u32 {
        let bytes = self.text.as_bytes();
        let mut count = 0u32;
        let mut i = 0usize;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => count += 1,
                b'\r' => {
                    count += 1;
                    if bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        count
    }
}

/// An unterminated quoted span, recovered leniently.
#[derive(Debug, Clone, Copy)]
pub struct UnterminatedQuote {
    pub span: Span,
    pub what: &'static str,
}

pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    line_start: usize,
    unterminated: Vec<UnterminatedQuote>,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_start_line(input, 1)
    }

    pub fn with_start_line(input: &'a str, line: u32) -> Self {
        Self {
            src: input,
            bytes: input.as_bytes(),
            pos: 0,
            line,
            line_start: 0,
            unterminated: Vec::new(),
        }
    }

    /// Unterminated quote spans seen so far.
    pub fn unterminated_quotes(&self) -> &[UnterminatedQuote] {
        &self.unterminated
    }

    pub fn next_token(&mut self) -> Option<Token<'a>> {
        if self.pos >= self.bytes.len() {
            return None;
        }
        let start = self.pos;
        let start_line = self.line;
        let col_start = self.pos - self.line_start + 1;
        let c = self.bytes[self.pos];

        let kind = match c {
            b'\n' | b'\r' => {
                self.eat_newline();
                TokenKind::Newline
            }
            b' ' | b'\t' => {
                self.pos += 1;
                while self.cur().is_some_and(is_space) {
                    self.pos += 1;
                }
                TokenKind::Whitespace
            }
            b'\\' => match self.bytes.get(self.pos + 1).copied() {
                Some(b'\n') | Some(b'\r') => {
                    self.pos += 1;
                    self.eat_newline();
                    TokenKind::Continuation
                }
                _ => {
                    self.pos += 1;
                    TokenKind::Punct
                }
            },
            b';' => {
                self.eat_to_eol();
                TokenKind::Comment
            }
            b'/' if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                self.eat_to_eol();
                TokenKind::Comment
            }
            b'"' => {
                self.scan_string(start_line, col_start);
                TokenKind::Str
            }
            b'`' => {
                self.scan_code_span(start_line, col_start);
                TokenKind::CodeSpan
            }
            _ if c.is_ascii_digit() => {
                self.scan_number();
                TokenKind::Number
            }
            _ if is_ident_start(c) => {
                if (c == b'.' || c == b'$')
                    && !self
                        .bytes
                        .get(self.pos + 1)
                        .copied()
                        .is_some_and(is_ident_char)
                {
                    self.pos += 1;
                    TokenKind::Punct
                } else {
                    self.pos += 1;
                    while self.cur().is_some_and(is_ident_char) {
                        self.pos += 1;
                    }
                    TokenKind::Identifier
                }
            }
            _ => {
                self.pos += 1;
                TokenKind::Punct
            }
        };

        Some(Token {
            kind,
            text: &self.src[start..self.pos],
            span: Span {
                line: start_line,
                col_start,
                col_end: self.pos.saturating_sub(self.line_start) + 1,
            },
        })
    }

    fn cur(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Consume `\n`, `\r`, or `\r\n` at the cursor and advance the line count.
    fn eat_newline(&mut self) {
        if self.cur() == Some(b'\r') {
            self.pos += 1;
            if self.cur() == Some(b'\n') {
                self.pos += 1;
            }
        } else {
            self.pos += 1;
        }
        self.line += 1;
        self.line_start = self.pos;
    }

    fn eat_to_eol(&mut self) {
        while let Some(c) = self.cur() {
            if c == b'\n' || c == b'\r' {
                break;
            }
            self.pos += 1;
        }
    }

    fn scan_string(&mut self, line: u32, col: usize) {
        self.pos += 1;
        loop {
            match self.cur() {
                None => {
                    self.note_unterminated(line, col, "string");
                    break;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.cur() {
                        None => {
                            self.note_unterminated(line, col, "string");
                            break;
                        }
                        Some(b'\n') | Some(b'\r') => self.eat_newline(),
                        Some(_) => self.pos += 1,
                    }
                }
                Some(b'\n') | Some(b'\r') => self.eat_newline(),
                Some(_) => self.pos += 1,
            }
        }
    }

    fn scan_code_span(&mut self, line: u32, col: usize) {
        self.pos += 1;
        loop {
            match self.cur() {
                None => {
                    self.note_unterminated(line, col, "code span");
                    break;
                }
                Some(b'`') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\n') | Some(b'\r') => self.eat_newline(),
                Some(_) => self.pos += 1,
            }
        }
    }

    fn scan_number(&mut self) {
        self.pos += 1;
        while let Some(c) = self.cur() {
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' {
                self.pos += 1;
            } else if (c == b'+' || c == b'-')
                && matches!(self.bytes.get(self.pos - 1), Some(b'e') | Some(b'E'))
            {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn note_unterminated(&mut self, line: u32, col: usize, what: &'static str) {
        self.unterminated.push(UnterminatedQuote {
            span: Span {
                line,
                col_start: col,
                col_end: col + 1,
            },
            what,
        });
    }
}
