// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Output emission: rewritten statements, line-number synchronization
//! markers, and scope-bracketing directives for the backend assembler.
//!
//! The preamble predefines the backend macros the rewriter targets: `_(x)`
//! swallows alias annotations, `L`/`S` expand scope-qualified local symbols,
//! and the `.label`/`.scope`/`.endscope` assembler macros give the default
//! behavior a port can override.

use std::fmt::Write;

pub struct Output {
    text: String,
    file: String,
    line: u32,
}

impl Output {
    pub fn new(file: &str) -> Self {
        Self::with_start_line(file, 1)
    }

    pub fn with_start_line(file: &str, line: u32) -> Self {
        let mut out = Self {
            text: String::new(),
            file: file.to_string(),
            line,
        };
        out.text.push_str(&preamble());
        out.sync();
        out
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Set the source line number the next emitted line corresponds to.
    pub fn set_line(&mut self, line: u32) {
        self.line = line;
    }

    pub fn push_line(&mut self, s: &str) {
        self.text.push_str(s);
        self.text.push('\n');
    }

    /// Emit a separating blank line unless one is already present.
    pub fn blank(&mut self) {
        if !self.text.ends_with("\n\n") {
            self.text.push('\n');
        }
    }

    /// Emit a `# <line> "<file>"` marker so downstream diagnostics map back
    /// to the original source.
    pub fn sync(&mut self) {
        let _ = writeln!(self.text, "# {} \"{}\"", self.line, self.file);
    }

    /// Emit the directives that open a block scope.
    pub fn begin_scope(&mut self, old: Option<&str>, new: &str, depth: usize) {
        self.blank();
        if old.is_some() {
            self.push_line("#undef SCOPE");
        }
        let _ = writeln!(self.text, "#define SCOPE {new}");
        let _ = writeln!(self.text, ".scope {new}, {depth}");
        self.sync();
    }

    /// Emit the directives that close a block scope and restore the parent.
    pub fn end_scope(&mut self, popped: &str, depth: usize, restored: Option<&str>) {
        self.blank();
        let _ = writeln!(self.text, ".endscope {popped}, {depth}");
        self.push_line("#undef SCOPE");
        if let Some(name) = restored {
            let _ = writeln!(self.text, "#define SCOPE {name}");
        }
        self.sync();
    }
}

fn preamble() -> String {
    "\
# 1 \"(ppforge)\"

#define _(x)                          // inline comment
#define L(name)        .L$SCOPE$name  // ref to symbol in current scope
#define S(scope, name) .L$scope$name  // ref to symbol in given scope

.macro .label name:req                // default label behavior
  \\name\\():
.endm

.macro .scope name:req, depth:req     // default begin-scope behavior
.endm

.macro .endscope name:req, depth:req  // default end-scope behavior
.endm

"
    .to_string()
}
