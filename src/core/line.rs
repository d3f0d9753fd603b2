// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Logical line assembly.
//!
//! A logical line is one or more physical lines joined by continuation. A
//! physical line whose code part ends in an unescaped backslash (an odd
//! trailing run; even runs are escaped backslashes) continues onto the next
//! line, whose leading indentation is stripped on join. Comments are removed
//! before continuation detection, so a backslash before a comment still
//! continues the line while a backslash inside a comment does not.

use crate::core::scanner::{Scanner, TokenKind, UnterminatedQuote};
use crate::core::text_utils::trailing_backslashes;

/// One or more physical lines merged into a single statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// Joined code text, comments stripped.
    pub text: String,
    /// Line number of the first physical line.
    pub start_line: u32,
    /// Count of physical lines consumed, for line-number resynchronization.
    pub height: u32,
}

pub struct LineAssembler<'a> {
    scanner: Scanner<'a>,
    done: bool,
}

impl<'a> LineAssembler<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_start_line(input, 1)
    }

    pub fn with_start_line(input: &'a str, line: u32) -> Self {
        Self {
            scanner: Scanner::with_start_line(input, line),
            done: false,
        }
    }

    /// Unterminated quote spans seen so far (recovered leniently).
    pub fn unterminated_quotes(&self) -> &[UnterminatedQuote] {
        self.scanner.unterminated_quotes()
    }

    pub fn next_logical_line(&mut self) -> Option<LogicalLine> {
        if self.done {
            return None;
        }
        let mut text = String::new();
        let mut start_line = 0u32;
        let mut started = false;
        let mut extra = 0u32; // physical line boundaries folded into this line
        let mut saw_comment = false;
        let mut strip_indent = false;

        loop {
            let Some(tok) = self.scanner.next_token() else {
                self.done = true;
                if !started {
                    return None;
                }
                // A pending continuation at end of input still yields the line.
                let (text, _) = strip_continuation(text, saw_comment);
                return Some(LogicalLine {
                    text,
                    start_line,
                    height: extra + 1,
                });
            };
            if !started {
                started = true;
                start_line = tok.span.line;
            }
            match tok.kind {
                TokenKind::Newline => {
                    let (joined, continues) = strip_continuation(text, saw_comment);
                    text = joined;
                    if continues {
                        extra += 1;
                        saw_comment = false;
                        strip_indent = true;
                        continue;
                    }
                    return Some(LogicalLine {
                        text,
                        start_line,
                        height: extra + 1,
                    });
                }
                TokenKind::Continuation => {
                    if trailing_backslashes(text.as_bytes()) % 2 == 1 {
                        // The marker is escaped by the preceding backslash:
                        // the pair is literal and the line ends here.
                        text.push('\\');
                        return Some(LogicalLine {
                            text,
                            start_line,
                            height: extra + 1,
                        });
                    }
                    extra += 1;
                    saw_comment = false;
                    strip_indent = true;
                }
                TokenKind::Comment => {
                    saw_comment = true;
                }
                TokenKind::Whitespace if strip_indent => {}
                _ => {
                    strip_indent = false;
                    extra += tok.newlines();
                    text.push_str(tok.text);
                }
            }
        }
    }
}

/// Check the accumulated text for a trailing continuation marker and strip
/// it. When a comment was removed from this physical line, the whitespace
/// that separated code from comment is dropped along with it.
fn strip_continuation(mut text: String, saw_comment: bool) -> (String, bool) {
    if saw_comment {
        text.truncate(text.trim_end().len());
    }
    if trailing_backslashes(text.as_bytes()) % 2 == 1 {
        text.pop();
        (text, true)
    } else {
        (text, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &str) -> Vec<LogicalLine> {
        let mut asm = LineAssembler::new(input);
        let mut out = Vec::new();
        while let Some(line) = asm.next_logical_line() {
            out.push(line);
        }
        out
    }

    #[test]
    fn passes_simple_lines() {
        let got = lines("one\ntwo\n");
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].text, "one");
        assert_eq!(got[0].start_line, 1);
        assert_eq!(got[0].height, 1);
        assert_eq!(got[1].text, "two");
        assert_eq!(got[1].start_line, 2);
    }

    #[test]
    fn joins_continued_lines_and_strips_indent() {
        let got = lines("all \\\n    one line\nnext\n");
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].text, "all one line");
        assert_eq!(got[0].height, 2);
        assert_eq!(got[1].text, "next");
        assert_eq!(got[1].start_line, 3);
    }

    #[test]
    fn strips_comments() {
        let got = lines("code ; comment\nmore // note\n");
        assert_eq!(got[0].text, "code");
        assert_eq!(got[1].text, "more");
    }

    #[test]
    fn comment_is_removed_before_continuation_detection() {
        // A backslash before the comment still continues the line; a
        // backslash inside the comment does not.
        let got = lines("a \\ ; note\nb\n");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].text, "a b");
        assert_eq!(got[0].height, 2);

        let got = lines("a ; note \\\nb\n");
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].text, "a");
        assert_eq!(got[1].text, "b");
    }

    #[test]
    fn doubled_backslash_is_not_a_continuation() {
        let got = lines("a \\\\\nb\n");
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].text, "a \\\\");
    }

    #[test]
    fn continuation_at_eof_yields_final_line() {
        let got = lines("last \\");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].text, "last ");
        assert_eq!(got[0].height, 1);
    }

    #[test]
    fn string_newlines_count_toward_height() {
        let got = lines("dc.b \"a\\\nb\"\nnext\n");
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].text, "dc.b \"a\\\nb\"");
        assert_eq!(got[0].height, 2);
        assert_eq!(got[1].start_line, 3);
    }

    #[test]
    fn empty_lines_survive() {
        let got = lines("a\n\nb\n");
        assert_eq!(got.len(), 3);
        assert_eq!(got[1].text, "");
        assert_eq!(got[1].height, 1);
    }

    #[test]
    fn unterminated_string_is_recovered() {
        let mut asm = LineAssembler::new("dc.b \"abc");
        let line = asm.next_logical_line().unwrap();
        assert_eq!(line.text, "dc.b \"abc");
        assert!(asm.next_logical_line().is_none());
        assert_eq!(asm.unterminated_quotes().len(), 1);
    }
}
