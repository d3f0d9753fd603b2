// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for ppForge.

fn main() {
    let use_color = std::env::var("NO_COLOR").is_err();
    match ppforge::preprocessor::run() {
        Ok(outcome) => {
            for unit in &outcome.units {
                for warning in &unit.warnings {
                    eprintln!("{}", warning.format_with_context(use_color));
                }
                if let Some(err) = &unit.error {
                    eprintln!("{}", err.format_with_context(use_color));
                }
            }
            if outcome.failed() {
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("{}", err.format_with_context(use_color));
            std::process::exit(1);
        }
    }
}
