// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::core::error::{PpError, PpErrorKind};
use crate::core::processor::ReservedChecker;
use crate::core::text_utils::{is_ident_char, is_ident_start};
use std::sync::Arc;

pub const VERSION: &str = "0.3";

const LONG_ABOUT: &str = "Assembly preprocessor with scoped labels, aliases, and macros.

Rewrites the input dialect into plain assembler text on standard output:
labels invoke the .label backend macro, block scopes become .scope/.endscope
with #define SCOPE bracketing, local .symbols become L(...) references,
identifier aliases (name => target) annotate as _(name)target, addressing
brackets [...] become parentheses, and macros defined with .macro/.endmacro
expand in inline or statement position.

Each input file is processed independently; a fatal error aborts that file
and processing continues with the next.";

#[derive(Parser, Debug)]
#[command(
    name = "ppForge",
    version = VERSION,
    about = "Assembly preprocessor with scoped labels, aliases, and macros",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(
        value_name = "FILE",
        required = true,
        help = "Input assembly source files, processed in sequence"
    )]
    pub infiles: Vec<PathBuf>,
    #[arg(
        short = 'D',
        long = "define",
        value_name = "NAME[=VAL]",
        action = ArgAction::Append,
        long_help = "Predefine a constant (repeatable). If VAL is omitted, defaults to 1."
    )]
    pub defines: Vec<String>,
    #[arg(
        short = 'm',
        long = "target",
        value_name = "CPU",
        default_value = "mcf5307",
        long_help = "Target CPU. Selects the register set exempt from alias rewriting. \
                     Known targets: mcf5307, m68k, none."
    )]
    pub target: String,
    #[arg(
        long = "macro-depth",
        value_name = "N",
        default_value_t = 64,
        long_help = "Maximum macro expansion depth. Defaults to 64."
    )]
    pub macro_depth: usize,
}

/// A selectable target: a name and the identifiers the rewriter must leave
/// alone because the backend assembler owns them.
#[derive(Debug)]
pub struct Target {
    pub name: &'static str,
    pub registers: &'static [&'static str],
}

/// Size suffixes reserved on every target.
const RESERVED_SUFFIXES: &[&str] = &[".s", ".b", ".w", ".l"];

pub const TARGETS: &[Target] = &[
    Target {
        name: "mcf5307",
        registers: &[
            "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "fp", "sp", "d0", "d1", "d2", "d3",
            "d4", "d5", "d6", "d7", "pc", "sr", "ccr", "bc", "vbr", "cacr", "acr0", "acr1",
            "mbar", "rambar",
        ],
    },
    Target {
        name: "m68k",
        registers: &[
            "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "fp", "sp", "d0", "d1", "d2", "d3",
            "d4", "d5", "d6", "d7", "pc", "sr", "ccr", "usp",
        ],
    },
    Target {
        name: "none",
        registers: &[],
    },
];

pub fn lookup_target(name: &str) -> Option<&'static Target> {
    TARGETS.iter().find(|t| t.name == name)
}

/// Build the reserved-identifier checker for a target.
pub fn reserved_checker(target: &'static Target) -> ReservedChecker {
    Arc::new(move |ident: &str| {
        RESERVED_SUFFIXES.contains(&ident) || target.registers.contains(&ident)
    })
}

/// Validated CLI configuration.
#[derive(Debug)]
pub struct CliConfig {
    pub defines: Vec<(String, String)>,
    pub target: &'static Target,
    pub macro_depth: usize,
}

/// Validate CLI arguments and return parsed configuration.
pub fn validate_cli(cli: &Cli) -> Result<CliConfig, PpError> {
    if cli.macro_depth == 0 {
        return Err(PpError::new(
            PpErrorKind::Cli,
            "--macro-depth must be at least 1",
        ));
    }

    let target = lookup_target(&cli.target).ok_or_else(|| {
        PpError::new(
            PpErrorKind::Cli,
            format!("Unknown target '{}'", cli.target),
        )
    })?;

    let mut defines = Vec::new();
    for spec in &cli.defines {
        let (name, value) = match spec.split_once('=') {
            Some((name, value)) => (name, value),
            None => (spec.as_str(), "1"),
        };
        if !is_valid_name(name) {
            return Err(PpError::new(
                PpErrorKind::Cli,
                format!("Invalid -D/--define name '{name}'"),
            ));
        }
        defines.push((name.to_string(), value.to_string()));
    }

    Ok(CliConfig {
        defines,
        target,
        macro_depth: cli.macro_depth,
    })
}

fn is_valid_name(text: &str) -> bool {
    let bytes = text.as_bytes();
    match bytes.first() {
        Some(&c) if is_ident_start(c) => {}
        _ => return false,
    }
    bytes.iter().all(|&c| is_ident_char(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_parses_files_and_defines() {
        let cli = Cli::parse_from([
            "ppForge",
            "-D",
            "DEBUG",
            "-D",
            "LEVEL=2",
            "-m",
            "m68k",
            "--macro-depth",
            "80",
            "prog.s",
            "util.s",
        ]);
        assert_eq!(
            cli.infiles,
            vec![PathBuf::from("prog.s"), PathBuf::from("util.s")]
        );
        assert_eq!(cli.defines, vec!["DEBUG".to_string(), "LEVEL=2".to_string()]);
        assert_eq!(cli.target, "m68k");
        assert_eq!(cli.macro_depth, 80);
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["ppForge", "prog.s"]);
        assert_eq!(cli.target, "mcf5307");
        assert_eq!(cli.macro_depth, 64);
    }

    #[test]
    fn validate_parses_define_values() {
        let cli = Cli::parse_from(["ppForge", "-D", "DEBUG", "-D", "LEVEL=2", "prog.s"]);
        let config = validate_cli(&cli).expect("validate");
        assert_eq!(
            config.defines,
            vec![
                ("DEBUG".to_string(), "1".to_string()),
                ("LEVEL".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn validate_rejects_bad_define_name() {
        let cli = Cli::parse_from(["ppForge", "-D", "2BAD=1", "prog.s"]);
        let err = validate_cli(&cli).unwrap_err();
        assert_eq!(err.kind(), PpErrorKind::Cli);
        assert!(err.message().contains("2BAD"));
    }

    #[test]
    fn validate_rejects_unknown_target() {
        let cli = Cli::parse_from(["ppForge", "-m", "z80", "prog.s"]);
        let err = validate_cli(&cli).unwrap_err();
        assert!(err.message().contains("z80"));
    }

    #[test]
    fn validate_rejects_zero_macro_depth() {
        let cli = Cli::parse_from(["ppForge", "--macro-depth", "0", "prog.s"]);
        let err = validate_cli(&cli).unwrap_err();
        assert_eq!(err.to_string(), "error: --macro-depth must be at least 1");
    }

    #[test]
    fn reserved_checker_covers_registers_and_suffixes() {
        let target = lookup_target("mcf5307").expect("target");
        let checker = reserved_checker(target);
        assert!(checker("a0"));
        assert!(checker(".w"));
        assert!(!checker("foo"));
    }

    #[test]
    fn none_target_reserves_only_suffixes() {
        let target = lookup_target("none").expect("target");
        let checker = reserved_checker(target);
        assert!(!checker("a0"));
        assert!(checker(".l"));
    }
}
