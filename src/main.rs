//! reid-config CLI
//!
//! Validates training parameters and prints the derived sub-configurations.
//!
//! # Usage
//!
//! ```bash
//! # Defaults for a single dataset
//! reid-config -s market1501 -t market1501
//!
//! # Triplet training; the identity sampler is forced
//! reid-config -s market1501 -t market1501 --criterion htri
//!
//! # Keep the configured sampler anyway
//! ns=1 reid-config -s market1501 -t market1501 --criterion htri --train-sampler RandomSampler
//!
//! # Values from a file, overridden on the command line, printed as JSON
//! reid-config --config abd.yaml --lr 0.0001 --format json
//! ```

use reid_config::config::{
    command, parse, parse_args, registry, render, sampler_override_present, usage_error,
    ConfigBundle,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let registry = registry();

    let invocation = match parse_args(std::env::args_os(), registry) {
        Ok(invocation) => invocation,
        Err(e) => e.exit(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(invocation.cli.log_filter()),
    )
    .format_timestamp_millis()
    .init();

    let input = match invocation.resolve_input() {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let raw = match parse(&input, registry) {
        Ok(raw) => raw,
        Err(e) => usage_error(&mut command(registry), &e).exit(),
    };
    log::debug!("validated {} parameters", raw.len());

    let sampler_override = sampler_override_present();
    let result = ConfigBundle::derive(raw, sampler_override)
        .and_then(|bundle| render(&bundle, invocation.cli.format));

    match result {
        Ok(output) => {
            if !invocation.cli.quiet {
                println!("{}", output.trim_end());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
