// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types and diagnostics for the preprocessor.

use std::fmt;

/// Categories of preprocessor conditions. Not every kind is fatal:
/// unterminated quotes are recovered leniently and unknown inline references
/// pass through unchanged, so those two surface as warnings at most.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpErrorKind {
    Cli,
    Io,
    UnterminatedQuote,
    MismatchedScopeEnd,
    MacroArityMismatch,
    UnknownMacroReference,
    InvalidAddressingBracket,
    MacroDepthExceeded,
    BadMacroDefinition,
}

/// Severity of a reported condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A preprocessor error with a kind, message, and optional source location.
#[derive(Debug, Clone)]
pub struct PpError {
    kind: PpErrorKind,
    message: String,
    file: Option<String>,
    line: Option<u32>,
    column: Option<usize>,
    source: Option<String>,
}

impl PpError {
    pub fn new(kind: PpErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            file: None,
            line: None,
            column: None,
            source: None,
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_file(mut self, file: &str) -> Self {
        if self.file.is_none() {
            self.file = Some(file.to_string());
        }
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        if self.source.is_none() {
            self.source = Some(source.to_string());
        }
        self
    }

    pub fn kind(&self) -> PpErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn severity(&self) -> Severity {
        match self.kind {
            PpErrorKind::UnterminatedQuote | PpErrorKind::UnknownMacroReference => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    /// One-line `file:line: error: message` form.
    pub fn format_line(&self) -> String {
        let sev = match self.severity() {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match (&self.file, self.line) {
            (Some(file), Some(line)) => format!("{file}:{line}: {sev}: {}", self.message),
            (Some(file), None) => format!("{file}: {sev}: {}", self.message),
            (None, Some(line)) => format!("{line}: {sev}: {}", self.message),
            (None, None) => format!("{sev}: {}", self.message),
        }
    }

    /// Multi-line form with the offending source line and a highlight.
    pub fn format_with_context(&self, use_color: bool) -> String {
        let mut out = self.format_line();
        if let (Some(line), Some(source)) = (self.line, self.source.as_deref()) {
            out.push('\n');
            let display = highlight_line(source, self.column, use_color);
            out.push_str(&format!("{:>5} | {}", line, display));
        }
        out
    }
}

impl fmt::Display for PpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_line())
    }
}

impl std::error::Error for PpError {}

/// Highlight one column of a source line with ANSI color, or append a caret
/// when the column is past the end of the line.
pub fn highlight_line(line: &str, column: Option<usize>, use_color: bool) -> String {
    let Some(column) = column else {
        return line.to_string();
    };
    if column == 0 {
        return line.to_string();
    }
    let idx = column.saturating_sub(1);
    if idx >= line.len() {
        if use_color {
            return format!("{line}\x1b[31m^\x1b[0m");
        }
        return format!("{line}^");
    }
    let (head, tail) = line.split_at(idx);
    let ch = tail.chars().next().unwrap_or(' ');
    let rest = &tail[ch.len_utf8()..];
    if use_color {
        format!("{head}\x1b[31m{ch}\x1b[0m{rest}")
    } else {
        format!("{head}{ch}{rest}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_line_includes_file_and_line() {
        let err = PpError::new(PpErrorKind::MismatchedScopeEnd, "Unmatched '}'")
            .with_line(7)
            .with_file("prog.s");
        assert_eq!(err.format_line(), "prog.s:7: error: Unmatched '}'");
    }

    #[test]
    fn unterminated_quote_is_a_warning() {
        let err = PpError::new(PpErrorKind::UnterminatedQuote, "Unterminated string");
        assert_eq!(err.severity(), Severity::Warning);
        assert_eq!(err.format_line(), "warning: Unterminated string");
    }

    #[test]
    fn context_shows_source_line() {
        let err = PpError::new(PpErrorKind::InvalidAddressingBracket, "Unmatched ']'")
            .with_line(3)
            .with_file("t.s")
            .with_column(5)
            .with_source("  a ] b");
        let text = err.format_with_context(false);
        assert_eq!(text, "t.s:3: error: Unmatched ']'\n    3 |   a ] b");
    }

    #[test]
    fn highlight_appends_caret_past_end() {
        assert_eq!(highlight_line("ab", Some(9), false), "ab^");
    }
}
