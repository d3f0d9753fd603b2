// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The preprocessing pipeline for one input unit.
//!
//! Logical lines flow through label and block handling, macro expansion,
//! addressing-bracket rewriting, and the identifier/alias rewrite, then into
//! the output emitter. All state (scopes, aliases, macros, generated scope
//! names) belongs to one unit; the driver builds a fresh `Processor` per
//! file.

use std::sync::Arc;

use crate::core::address::rewrite_brackets;
use crate::core::error::{PpError, PpErrorKind};
use crate::core::line::LineAssembler;
use crate::core::macros::{self, MacroDef};
use crate::core::output::Output;
use crate::core::scope::ScopeStack;
use crate::core::text_utils::{is_ident_char, is_ident_start, is_space, skip_quoted_span, Cursor};

/// Function type for checking if an identifier is reserved by the selected
/// target (register names, size suffixes). Reserved identifiers are exempt
/// from alias definition and lookup.
pub type ReservedChecker = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Default checker that reserves nothing.
pub fn no_reserved(_ident: &str) -> bool {
    false
}

pub fn reserved_checker_none() -> ReservedChecker {
    reserved_checker_from_fn(no_reserved)
}

pub fn reserved_checker_from_fn(func: fn(&str) -> bool) -> ReservedChecker {
    Arc::new(func)
}

/// Splice a macro body for inline (expression) position: each line trimmed
/// and joined with single spaces.
fn inline_body(def: &MacroDef) -> String {
    def.body
        .iter()
        .map(|l| l.trim())
        .collect::<Vec<_>>()
        .join(" ")
}

struct MacroCollect {
    name: String,
    params: Vec<String>,
    body: Vec<String>,
    start_line: u32,
}

pub struct Processor {
    scopes: ScopeStack,
    out: Output,
    file: String,
    line: u32,
    pending_label: Option<String>,
    gensym: u32,
    reserved: ReservedChecker,
    max_depth: usize,
    collecting: Option<MacroCollect>,
    warnings: Vec<PpError>,
}

impl Processor {
    pub fn new(file: &str) -> Self {
        Self::with_config(file, 1, reserved_checker_none(), 64)
    }

    pub fn with_config(
        file: &str,
        start_line: u32,
        reserved: ReservedChecker,
        max_depth: usize,
    ) -> Self {
        Self {
            scopes: ScopeStack::new(),
            out: Output::with_start_line(file, start_line),
            file: file.to_string(),
            line: start_line,
            pending_label: None,
            gensym: 0,
            reserved,
            max_depth,
            collecting: None,
            warnings: Vec::new(),
        }
    }

    /// Predefine a constant (`-D NAME[=value]`): a zero-parameter macro in
    /// the root scope.
    pub fn define_constant(&mut self, name: &str, value: &str) {
        self.scopes.define_macro(MacroDef {
            name: name.to_string(),
            params: Vec::new(),
            body: vec![value.to_string()],
        });
    }

    /// Process one full input unit.
    pub fn process(&mut self, input: &str) -> Result<(), PpError> {
        let mut lines = LineAssembler::with_start_line(input, self.line);
        while let Some(ll) = lines.next_logical_line() {
            self.line = ll.start_line;
            self.out.set_line(ll.start_line + ll.height);
            if let Err(err) = self.handle_line(&ll.text, 0) {
                return Err(err.with_file(&self.file).with_source(&ll.text));
            }
            if ll.height > 1 {
                self.out.sync();
            }
        }
        for quote in lines.unterminated_quotes() {
            self.warnings.push(
                PpError::new(
                    PpErrorKind::UnterminatedQuote,
                    format!("Unterminated {}", quote.what),
                )
                .with_line(quote.span.line)
                .with_column(quote.span.col_start)
                .with_file(&self.file),
            );
        }
        if let Some(collect) = &self.collecting {
            return Err(PpError::new(
                PpErrorKind::BadMacroDefinition,
                format!("Missing .endmacro for macro '{}'", collect.name),
            )
            .with_line(collect.start_line)
            .with_file(&self.file));
        }
        if self.scopes.depth() > 0 {
            let name = self.scopes.innermost_name().unwrap_or("").to_string();
            return Err(PpError::new(
                PpErrorKind::MismatchedScopeEnd,
                format!("Missing '}}' for scope '{name}'"),
            )
            .with_line(self.line)
            .with_file(&self.file));
        }
        Ok(())
    }

    /// Warnings collected while processing (lenient recoveries).
    pub fn warnings(&self) -> &[PpError] {
        &self.warnings
    }

    pub fn output(&self) -> &str {
        self.out.as_str()
    }

    pub fn into_output(self) -> String {
        self.out.into_string()
    }

    fn handle_line(&mut self, text: &str, depth: usize) -> Result<(), PpError> {
        if depth > self.max_depth {
            return Err(PpError::new(
                PpErrorKind::MacroDepthExceeded,
                format!("Macro expansion exceeded maximum depth ({})", self.max_depth),
            )
            .with_line(self.line));
        }

        if self.collecting.is_some() {
            return self.collect_macro_line(text);
        }

        match text.trim() {
            "{" => {
                self.begin_block();
                return Ok(());
            }
            "}" => return self.end_block(),
            _ => {}
        }

        let Some(stmt) = parse_statement(text) else {
            // Unrecognized shape (cpp directive, punctuation, blank): verbatim.
            self.out.push_line(text);
            return Ok(());
        };

        if let Some(mnemonic) = &stmt.mnemonic {
            if mnemonic.name.eq_ignore_ascii_case(".macro") {
                self.emit_labels_only(&stmt);
                let (name, params) = macros::parse_macro_def(stmt.tail, self.line)?;
                self.collecting = Some(MacroCollect {
                    name,
                    params,
                    body: Vec::new(),
                    start_line: self.line,
                });
                return Ok(());
            }
            if mnemonic.name.eq_ignore_ascii_case(".endmacro")
                || mnemonic.name.eq_ignore_ascii_case(".endm")
            {
                return Err(PpError::new(
                    PpErrorKind::BadMacroDefinition,
                    ".endmacro found without matching .macro",
                )
                .with_line(self.line));
            }
            if let Some(def) = self.scopes.resolve_macro(&mnemonic.name).cloned() {
                return self.expand_statement_macro(&stmt, def, depth);
            }
        }

        let mut rendered = String::with_capacity(text.len());
        rendered.push_str(stmt.indent);
        for label in &stmt.labels {
            self.render_label(label, &mut rendered);
        }
        if let Some(mnemonic) = &stmt.mnemonic {
            rendered.push_str(mnemonic.name);
            let pseudo = is_pseudo(mnemonic.name);
            let expanded = self.expand_inline(stmt.tail, depth)?;
            let bracketed = rewrite_brackets(&expanded, self.line, stmt.tail_offset)?;
            rendered.push_str(&self.rewrite_operand_idents(&bracketed, pseudo));
            self.pending_label = None;
        } else {
            rendered.push_str(stmt.tail);
        }
        self.out.push_line(rendered.trim_end());
        Ok(())
    }

    fn collect_macro_line(&mut self, text: &str) -> Result<(), PpError> {
        let mut cursor = Cursor::new(text);
        cursor.skip_ws();
        if let Some(first) = cursor.take_ident() {
            if first.eq_ignore_ascii_case(".endmacro") || first.eq_ignore_ascii_case(".endm") {
                let collect = self.collecting.take().expect("collection in progress");
                self.scopes.define_macro(MacroDef {
                    name: collect.name,
                    params: collect.params,
                    body: collect.body,
                });
                return Ok(());
            }
            if first.eq_ignore_ascii_case(".macro") {
                return Err(PpError::new(
                    PpErrorKind::BadMacroDefinition,
                    "Nested .macro definitions are not supported",
                )
                .with_line(self.line));
            }
        }
        self.collecting
            .as_mut()
            .expect("collection in progress")
            .body
            .push(text.to_string());
        Ok(())
    }

    fn emit_labels_only(&mut self, stmt: &Statement<'_>) {
        if stmt.labels.is_empty() {
            return;
        }
        let mut rendered = String::from(stmt.indent);
        for label in &stmt.labels {
            self.render_label(label, &mut rendered);
        }
        self.out.push_line(rendered.trim_end());
    }

    fn render_label(&mut self, label: &LabelTok<'_>, rendered: &mut String) {
        if label.name.starts_with('.') {
            let localized = format!("L({})", &label.name[1..]);
            self.scopes.define_label(label.name, &localized);
            rendered.push_str(&localized);
            rendered.push(':');
        } else {
            rendered.push_str(".label ");
            rendered.push_str(label.name);
            rendered.push(';');
            self.scopes.clear_aliases();
            self.pending_label = Some(label.name.to_string());
        }
        if label.global {
            rendered.push_str(" .global ");
            rendered.push_str(label.name);
            rendered.push(';');
        }
        rendered.push(' ');
    }

    fn begin_block(&mut self) {
        let old = self.scopes.innermost_name().map(str::to_string);
        let leaf = self.pending_label.take().unwrap_or_else(|| {
            let n = self.gensym;
            self.gensym += 1;
            n.to_string()
        });
        let name = match &old {
            Some(outer) => format!("{outer}${leaf}"),
            None => leaf,
        };
        let depth = self.scopes.depth();
        self.scopes.enter_scope(name.clone());
        self.out.begin_scope(old.as_deref(), &name, depth);
    }

    fn end_block(&mut self) -> Result<(), PpError> {
        self.pending_label = None;
        let Some(popped) = self.scopes.leave_scope() else {
            return Err(PpError::new(
                PpErrorKind::MismatchedScopeEnd,
                "Block end without matching begin",
            )
            .with_line(self.line));
        };
        let restored = self.scopes.innermost_name().map(str::to_string);
        self.out
            .end_scope(&popped, self.scopes.depth(), restored.as_deref());
        Ok(())
    }

    fn expand_statement_macro(
        &mut self,
        stmt: &Statement<'_>,
        def: MacroDef,
        depth: usize,
    ) -> Result<(), PpError> {
        let mut args: Vec<String> = Vec::new();
        let tail = stmt.tail.trim();

        // A parenthesized call that consumes the whole tail is the inline
        // form at statement position: no implicit label argument.
        let paren_args = if tail.starts_with('(') {
            let (inside, end) = macros::extract_paren_list(tail, 0, self.line)?;
            if tail[end..].trim().is_empty() {
                Some(inside)
            } else {
                None
            }
        } else {
            None
        };

        match paren_args {
            Some(inside) => {
                self.emit_labels_only(stmt);
                args.extend(macros::split_args(&inside));
            }
            None => {
                if def.params.is_empty() {
                    self.emit_labels_only(stmt);
                } else {
                    // Label prefixes recombine into an implicit first argument.
                    let labels = stmt
                        .labels
                        .iter()
                        .map(|l| l.text)
                        .collect::<Vec<_>>()
                        .join(" ");
                    args.push(labels);
                }
                args.extend(macros::split_args(tail));
            }
        }

        let mut expanded = Vec::with_capacity(args.len());
        for arg in &args {
            expanded.push(self.expand_inline(arg, depth + 1)?);
        }
        if expanded.len() != def.params.len() {
            return Err(macros::arity_error(
                &def.name,
                def.params.len(),
                expanded.len(),
                self.line,
            ));
        }

        self.pending_label = None;
        for body_line in &def.body {
            let line = macros::substitute_line(body_line, &def.params, &expanded);
            self.handle_line(&line, depth + 1)?;
        }
        if def.body.len() != 1 {
            self.out.sync();
        }
        Ok(())
    }

    /// Expand inline macro invocations in operand text. Arguments expand
    /// before substitution, inside-out; unknown names pass through unchanged
    /// since most are architecture mnemonics or plain symbols.
    fn expand_inline(&mut self, text: &str, depth: usize) -> Result<String, PpError> {
        if depth > self.max_depth {
            return Err(PpError::new(
                PpErrorKind::MacroDepthExceeded,
                format!("Macro expansion exceeded maximum depth ({})", self.max_depth),
            )
            .with_line(self.line));
        }
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut i = 0usize;
        while i < bytes.len() {
            let c = bytes[i];
            match c {
                b'"' | b'`' => {
                    let end = skip_quoted_span(bytes, i);
                    out.push_str(&text[i..end]);
                    i = end;
                }
                b'@' => {
                    // Verbatim escape: the identifier is exempt from expansion.
                    match scan_ident_at(bytes, i + 1) {
                        Some(end) => {
                            out.push_str(&text[i..end]);
                            i = end;
                        }
                        None => {
                            out.push('@');
                            i += 1;
                        }
                    }
                }
                _ if c.is_ascii_digit() => {
                    let mut j = i + 1;
                    while j < bytes.len() && is_ident_char(bytes[j]) {
                        j += 1;
                    }
                    out.push_str(&text[i..j]);
                    i = j;
                }
                _ => match scan_ident_at(bytes, i) {
                    Some(j) => {
                        let id = &text[i..j];
                        if let Some(def) = self.scopes.resolve_macro(id).cloned() {
                            let mut k = j;
                            while k < bytes.len() && is_space(bytes[k]) {
                                k += 1;
                            }
                            if bytes.get(k) == Some(&b'(') {
                                let (inside, end) =
                                    macros::extract_paren_list(text, k, self.line)?;
                                let args = macros::split_args(&inside);
                                let mut expanded = Vec::with_capacity(args.len());
                                for arg in &args {
                                    expanded.push(self.expand_inline(arg, depth + 1)?);
                                }
                                if expanded.len() != def.params.len() {
                                    return Err(macros::arity_error(
                                        &def.name,
                                        def.params.len(),
                                        expanded.len(),
                                        self.line,
                                    ));
                                }
                                let body = inline_body(&def);
                                let substituted =
                                    macros::substitute_line(&body, &def.params, &expanded);
                                out.push_str(&self.expand_inline(&substituted, depth + 1)?);
                                i = end;
                                continue;
                            }
                            if def.params.is_empty() {
                                let body = inline_body(&def);
                                out.push_str(&self.expand_inline(&body, depth + 1)?);
                                i = j;
                                continue;
                            }
                            // A parameterized macro named without arguments is
                            // just a name here.
                        }
                        out.push_str(id);
                        i = j;
                    }
                    None => {
                        out.push(c as char);
                        i += 1;
                    }
                },
            }
        }
        Ok(out)
    }

    /// Rewrite identifiers in operand text: alias definitions and
    /// references, local symbols, verbatim escapes, and the immediate-mode
    /// marker policy.
    fn rewrite_operand_idents(&mut self, text: &str, pseudo: bool) -> String {
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut i = 0usize;
        while i < bytes.len() {
            let c = bytes[i];
            match c {
                b'"' | b'`' => {
                    let end = skip_quoted_span(bytes, i);
                    out.push_str(&text[i..end]);
                    i = end;
                }
                b'@' => match scan_ident_at(bytes, i + 1) {
                    Some(end) => {
                        out.push_str(&text[i + 1..end]);
                        i = end;
                    }
                    None => {
                        out.push('@');
                        i += 1;
                    }
                },
                b'#' => {
                    // Pseudo-ops get the removal wrap; instructions keep a
                    // literal marker. Never synthesized.
                    out.push_str(if pseudo { "_(#)" } else { "#" });
                    i += 1;
                }
                _ if c.is_ascii_digit() => {
                    let mut j = i + 1;
                    while j < bytes.len() && is_ident_char(bytes[j]) {
                        j += 1;
                    }
                    out.push_str(&text[i..j]);
                    i = j;
                }
                _ => match scan_ident_at(bytes, i) {
                    Some(j) => {
                        let id = &text[i..j];
                        if !(self.reserved)(id) {
                            if let Some((target, after)) = scan_alias_def(text, j) {
                                self.scopes.define_alias(id, target);
                                out.push_str("_(");
                                out.push_str(id);
                                out.push(')');
                                out.push_str(&self.localize_if_local(target));
                                i = after;
                                continue;
                            }
                            if let Some(target) =
                                self.scopes.resolve_alias(id).map(str::to_string)
                            {
                                out.push_str("_(");
                                out.push_str(id);
                                out.push(')');
                                out.push_str(&self.localize_if_local(&target));
                                i = j;
                                continue;
                            }
                            if let Some(mapped) =
                                self.scopes.resolve_label(id).map(str::to_string)
                            {
                                out.push_str(&mapped);
                                i = j;
                                continue;
                            }
                            if let Some(stripped) = id.strip_prefix('.') {
                                out.push_str("L(");
                                out.push_str(stripped);
                                out.push(')');
                                i = j;
                                continue;
                            }
                        }
                        out.push_str(id);
                        i = j;
                    }
                    None => {
                        out.push(c as char);
                        i += 1;
                    }
                },
            }
        }
        out
    }

    fn localize_if_local(&self, target: &str) -> String {
        match target.strip_prefix('.') {
            Some(stripped) if !(self.reserved)(target) => format!("L({stripped})"),
            _ => target.to_string(),
        }
    }
}

/// A parsed statement line: indentation, `label:` prefixes, and an optional
/// mnemonic with its operand tail.
struct Statement<'a> {
    indent: &'a str,
    labels: Vec<LabelTok<'a>>,
    mnemonic: Option<Mnemonic<'a>>,
    tail: &'a str,
    tail_offset: usize,
}

struct LabelTok<'a> {
    /// As written, colons included.
    text: &'a str,
    name: &'a str,
    global: bool,
}

struct Mnemonic<'a> {
    name: &'a str,
}

fn parse_statement(text: &str) -> Option<Statement<'_>> {
    let bytes = text.as_bytes();
    let mut cursor = Cursor::new(text);
    cursor.skip_ws();
    let indent = &text[..cursor.pos()];
    let mut labels = Vec::new();

    loop {
        let start = cursor.pos();
        let Some(_) = cursor.take_ident() else {
            if labels.is_empty() {
                return None;
            }
            return Some(Statement {
                indent,
                labels,
                mnemonic: None,
                tail: "",
                tail_offset: text.len(),
            });
        };
        let name_end = cursor.pos();
        if cursor.peek() == Some(b':') {
            cursor.next();
            let global = cursor.peek() == Some(b':');
            if global {
                cursor.next();
            }
            labels.push(LabelTok {
                text: &text[start..cursor.pos()],
                name: &text[start..name_end],
                global,
            });
            cursor.skip_ws();
            if cursor.peek().is_none() {
                return Some(Statement {
                    indent,
                    labels,
                    mnemonic: None,
                    tail: "",
                    tail_offset: text.len(),
                });
            }
            if !bytes.get(cursor.pos()).copied().is_some_and(is_ident_start) {
                // Label(s) followed by something that is not a mnemonic.
                let offset = cursor.pos();
                return Some(Statement {
                    indent,
                    labels,
                    mnemonic: None,
                    tail: &text[offset..],
                    tail_offset: offset,
                });
            }
            continue;
        }
        let offset = cursor.pos();
        return Some(Statement {
            indent,
            labels,
            mnemonic: Some(Mnemonic {
                name: &text[start..name_end],
            }),
            tail: &text[offset..],
            tail_offset: offset,
        });
    }
}

fn scan_ident_at(bytes: &[u8], i: usize) -> Option<usize> {
    let first = *bytes.get(i)?;
    if !is_ident_start(first) {
        return None;
    }
    if (first == b'.' || first == b'$')
        && !bytes.get(i + 1).copied().is_some_and(is_ident_char)
    {
        return None;
    }
    let mut j = i + 1;
    while j < bytes.len() && is_ident_char(bytes[j]) {
        j += 1;
    }
    Some(j)
}

/// Skip the `=>`/`=` of an alias definition after an identifier ending at
/// `from`, returning the target identifier and the index past it.
fn scan_alias_def(text: &str, from: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    let mut k = from;
    while k < bytes.len() && is_space(bytes[k]) {
        k += 1;
    }
    if bytes.get(k) != Some(&b'=') {
        return None;
    }
    match bytes.get(k + 1).copied() {
        Some(b'>') => k += 2,
        Some(b'=') => return None,
        _ => k += 1,
    }
    while k < bytes.len() && is_space(bytes[k]) {
        k += 1;
    }
    let end = scan_ident_at(bytes, k)?;
    Some((&text[k..end], end))
}

/// Directive-like mnemonics are exempt from immediate-marker rewriting:
/// a leading `.` or a `$` anywhere marks a pseudo-op.
fn is_pseudo(name: &str) -> bool {
    name.starts_with('.') || name.contains('$')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> String {
        let mut p = Processor::new("test.s");
        p.process(input).expect("process");
        p.into_output()
    }

    fn run_err(input: &str) -> PpError {
        let mut p = Processor::new("test.s");
        p.process(input).expect_err("expected failure")
    }

    /// Output lines after the preamble's trailing sync marker.
    fn body(output: &str) -> Vec<String> {
        let marker = "# 1 \"test.s\"\n";
        let idx = output.find(marker).expect("sync marker") + marker.len();
        output[idx..].lines().map(str::to_string).collect()
    }

    #[test]
    fn passes_plain_statements_through() {
        let out = run("  move.l d0, d1\n");
        assert_eq!(body(&out), vec!["  move.l d0, d1"]);
    }

    #[test]
    fn rewrites_label_statement() {
        let out = run("foo:\n");
        assert_eq!(body(&out), vec![".label foo;"]);
    }

    #[test]
    fn global_label_emits_export() {
        let out = run("foo::\n");
        assert_eq!(body(&out), vec![".label foo; .global foo;"]);
    }

    #[test]
    fn local_label_localizes_and_registers() {
        let out = run(".loop:\n  bra .loop\n");
        assert_eq!(body(&out), vec!["L(loop):", "  bra L(loop)"]);
    }

    #[test]
    fn local_operand_degenerates_without_definition() {
        let out = run("  jmp .exit\n");
        assert_eq!(body(&out), vec!["  jmp L(exit)"]);
    }

    #[test]
    fn alias_definition_and_reference() {
        let out = run("  op bar = qux\n  op bar\n");
        assert_eq!(body(&out), vec!["  op _(bar)qux", "  op _(bar)qux"]);
    }

    #[test]
    fn alias_arrow_form() {
        let out = run("  op bar => qux\n  op bar\n");
        assert_eq!(body(&out), vec!["  op _(bar)qux", "  op _(bar)qux"]);
    }

    #[test]
    fn alias_cleared_by_nonlocal_label() {
        let out = run("  op bar = qux\nnext:\n  op bar\n");
        let lines = body(&out);
        assert_eq!(lines[0], "  op _(bar)qux");
        assert_eq!(lines[1], ".label next;");
        assert_eq!(lines[2], "  op bar");
    }

    #[test]
    fn alias_rebinding_evicts_older_mapping() {
        let out = run("  op foo = a0\n  op bar = a0\n  op foo\n");
        let lines = body(&out);
        assert_eq!(lines[0], "  op _(foo)a0");
        assert_eq!(lines[1], "  op _(bar)a0");
        // foo's binding was evicted; the bare name passes through.
        assert_eq!(lines[2], "  op foo");
    }

    #[test]
    fn equality_is_not_an_alias_definition() {
        let out = run("  .if x == y\n");
        assert_eq!(body(&out), vec!["  .if x == y"]);
    }

    #[test]
    fn verbatim_escape_suppresses_alias() {
        let out = run("  op bar = qux\n  op @bar\n");
        let lines = body(&out);
        assert_eq!(lines[1], "  op bar");
    }

    #[test]
    fn hash_passes_through_for_instructions() {
        let out = run("  cmp.l #4, d0\n");
        assert_eq!(body(&out), vec!["  cmp.l #4, d0"]);
    }

    #[test]
    fn hash_wrapped_for_pseudo_ops() {
        let out = run("  cmp$.l #4, d0\n  .word #4\n");
        let lines = body(&out);
        assert_eq!(lines[0], "  cmp$.l _(#)4, d0");
        assert_eq!(lines[1], "  .word _(#)4");
    }

    #[test]
    fn brackets_rewrite_in_operands() {
        let out = run("  move.l [8, fp], d0\n  move.l [-a0], [a1+]\n");
        let lines = body(&out);
        assert_eq!(lines[0], "  move.l (8, fp), d0");
        assert_eq!(lines[1], "  move.l -(a0), (a1)+");
    }

    #[test]
    fn block_scopes_emit_directives() {
        let out = run("foo:\n{\n  nop\n}\n");
        let text = out;
        assert!(text.contains("#define SCOPE foo\n.scope foo, 0\n"));
        assert!(text.contains(".endscope foo, 0\n#undef SCOPE\n"));
    }

    #[test]
    fn nested_scopes_get_hierarchical_names() {
        let out = run("foo:\n{\nbar:\n{\n  nop\n}\n}\n");
        assert!(out.contains(".scope foo$bar, 1\n"));
        assert!(out.contains(".endscope foo$bar, 1\n"));
        assert!(out.contains("#define SCOPE foo\n.scope foo, 0"));
    }

    #[test]
    fn anonymous_scope_uses_gensym() {
        let out = run("{\n  nop\n}\n");
        assert!(out.contains("#define SCOPE 0\n.scope 0, 0\n"));
    }

    #[test]
    fn mismatched_block_end_is_fatal() {
        let err = run_err("}\n");
        assert_eq!(err.kind(), PpErrorKind::MismatchedScopeEnd);
    }

    #[test]
    fn unclosed_block_is_fatal() {
        let err = run_err("foo:\n{\n  nop\n");
        assert_eq!(err.kind(), PpErrorKind::MismatchedScopeEnd);
        assert!(err.message().contains("foo"));
    }

    #[test]
    fn defines_and_expands_inline_macro() {
        let out = run(".macro hi(x)\n  dc.b x\n.endmacro\n  foo hi(9)\n");
        assert_eq!(body(&out), vec!["  foo dc.b 9"]);
    }

    #[test]
    fn statement_macro_expands_body_lines() {
        let out = run(".macro copy(lbl, src, dst)\n  move.l src, dst\n.endmacro\n  copy d0, d1\n");
        let lines = body(&out);
        assert_eq!(lines[0], "  move.l d0, d1");
    }

    #[test]
    fn statement_macro_receives_label_prefix() {
        let out = run(
            ".macro entry(lbl, val)\nlbl dc.w val\n.endmacro\nstart: entry 7\n",
        );
        let lines = body(&out);
        assert_eq!(lines[0], ".label start; dc.w 7");
    }

    #[test]
    fn macro_arity_mismatch_is_fatal() {
        let err = run_err(".macro m(a, b)\n  dc.b a, b\n.endmacro\n  x m(1)\n");
        assert_eq!(err.kind(), PpErrorKind::MacroArityMismatch);
        assert_eq!(err.message(), "Macro 'm' expects 2 arguments, got 1");
    }

    #[test]
    fn unknown_inline_reference_passes_through() {
        let out = run("  jsr printf(a)\n");
        assert_eq!(body(&out), vec!["  jsr printf(a)"]);
    }

    #[test]
    fn arguments_expand_before_substitution() {
        let out = run(
            ".macro one(x)\n1+x\n.endmacro\n.macro two(y)\n  dc.b y\n.endmacro\n  two(one(2))\n",
        );
        let lines = body(&out);
        assert_eq!(lines[0], "  dc.b 1+2");
    }

    #[test]
    fn constants_expand_bare() {
        let mut p = Processor::new("test.s");
        p.define_constant("DEBUG", "1");
        p.process("  dc.b DEBUG\n").expect("process");
        let out = p.into_output();
        assert_eq!(body(&out), vec!["  dc.b 1"]);
    }

    #[test]
    fn macro_defined_in_scope_is_dropped_on_pop() {
        let input = "\
f:\n{\n.macro m(x)\n  dc.b x\n.endmacro\n  y m(1)\n}\n  y m(1)\n";
        let out = run(input);
        let text = out;
        // Inside the scope the call expands; outside it passes through.
        assert!(text.contains("  y dc.b 1\n"));
        assert!(text.contains("  y m(1)\n"));
    }

    #[test]
    fn recursive_macro_hits_depth_limit() {
        let err = run_err(".macro m(x)\n  q m(x)\n.endmacro\n  q m(1)\n");
        assert_eq!(err.kind(), PpErrorKind::MacroDepthExceeded);
    }

    #[test]
    fn missing_endmacro_is_fatal() {
        let err = run_err(".macro m(x)\n  dc.b x\n");
        assert_eq!(err.kind(), PpErrorKind::BadMacroDefinition);
        assert!(err.message().contains("Missing .endmacro"));
    }

    #[test]
    fn stray_endmacro_is_fatal() {
        let err = run_err(".endmacro\n");
        assert_eq!(err.kind(), PpErrorKind::BadMacroDefinition);
    }

    #[test]
    fn continued_lines_resync_line_numbers() {
        let out = run("  move.l \\\n    d0, d1\n  nop\n");
        assert!(out.contains("  move.l d0, d1\n# 3 \"test.s\"\n"));
    }

    #[test]
    fn reserved_identifiers_skip_aliasing() {
        fn regs(id: &str) -> bool {
            id == "a0"
        }
        let mut p =
            Processor::with_config("test.s", 1, reserved_checker_from_fn(regs), 64);
        p.process("  op a0 = d0\n").expect("process");
        let out = p.into_output();
        assert_eq!(body(&out), vec!["  op a0 = d0"]);
    }

    #[test]
    fn unterminated_quote_yields_warning_not_error() {
        let mut p = Processor::new("test.s");
        p.process("  dc.b \"abc\n").expect("lenient");
        assert_eq!(p.warnings().len(), 1);
        assert_eq!(p.warnings()[0].kind(), PpErrorKind::UnterminatedQuote);
    }
}
