// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Preprocessor driver: CLI entry and the per-file processing loop.
//!
//! Files are processed in sequence, each with fresh preprocessor state.
//! A fatal error aborts the current file only; remaining files still run,
//! and the process exit code reflects whether any unit failed.

pub mod cli;


use std::fs;

use clap::Parser;

use crate::core::error::{PpError, PpErrorKind};
use crate::core::processor::Processor;

use cli::{reserved_checker, validate_cli, Cli, CliConfig};

pub use cli::VERSION;

/// Result of one input unit.
pub struct UnitOutcome {
    pub file: String,
    pub error: Option<PpError>,
    pub warnings: Vec<PpError>,
}

/// Result of a whole run.
pub struct RunOutcome {
    pub units: Vec<UnitOutcome>,
}

impl RunOutcome {
    pub fn failed(&self) -> bool {
        self.units.iter().any(|u| u.error.is_some())
    }
}

/// Run the preprocessor with command-line arguments, writing rewritten text
/// to standard output.
pub fn run() -> Result<RunOutcome, PpError> {
    let cli = Cli::parse();
    let config = validate_cli(&cli)?;

    let mut units = Vec::new();
    for path in &cli.infiles {
        let name = path.to_string_lossy().to_string();
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                units.push(UnitOutcome {
                    file: name.clone(),
                    error: Some(
                        PpError::new(PpErrorKind::Io, format!("Error reading file: {err}"))
                            .with_file(&name),
                    ),
                    warnings: Vec::new(),
                });
                continue;
            }
        };
        match process_unit(&name, &source, &config) {
            Ok((output, warnings)) => {
                print!("{output}");
                units.push(UnitOutcome {
                    file: name,
                    error: None,
                    warnings,
                });
            }
            Err(err) => {
                units.push(UnitOutcome {
                    file: name,
                    error: Some(err),
                    warnings: Vec::new(),
                });
            }
        }
    }

    Ok(RunOutcome { units })
}

/// Preprocess one named input unit with fresh state.
pub fn process_unit(
    name: &str,
    source: &str,
    config: &CliConfig,
) -> Result<(String, Vec<PpError>), PpError> {
    let mut processor = Processor::with_config(
        name,
        1,
        reserved_checker(config.target),
        config.macro_depth,
    );
    for (define, value) in &config.defines {
        processor.define_constant(define, value);
    }
    processor.process(source)?;
    let warnings = processor.warnings().to_vec();
    Ok((processor.into_output(), warnings))
}
