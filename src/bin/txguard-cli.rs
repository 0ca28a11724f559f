//! `txguard-cli` — reads one JSON validation request from stdin, writes one
//! JSON response to stdout, and exits 0 on a well-formed response or 1 on a
//! catastrophic failure to even read the request (spec.md §6 CLI surface).

use std::io::{Read, Write};
use std::process;

use clap::Parser;

use txguard::config::CliArgs;
use txguard::envelope::{self, MAX_INPUT_BYTES};
use txguard::registry::Registry;

fn main() {
    let args = CliArgs::parse();
    txguard::logging::init();

    let registry = match load_registry(&args) {
        Ok(registry) => registry,
        Err(err) => {
            tracing::error!(error = %err, "failed to build validator registry");
            print_internal_error();
            process::exit(1);
        }
    };

    let input = match read_capped_stdin() {
        Ok(input) => input,
        Err(err) => {
            tracing::error!(error = %err, "failed to read request from stdin");
            print_internal_error();
            process::exit(1);
        }
    };

    let response = envelope::handle_json_request(&registry, &input);
    let ok = match serde_json::to_string(&response) {
        Ok(line) => {
            println!("{line}");
            true
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize response");
            print_internal_error();
            false
        }
    };

    if !ok {
        process::exit(1);
    }
}

fn load_registry(args: &CliArgs) -> Result<Registry, Box<dyn std::error::Error>> {
    match &args.vault_registry {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            Ok(Registry::build_from_vault_json(&contents)?)
        }
        None => Ok(Registry::build()?),
    }
}

/// Reads stdin up to [`MAX_INPUT_BYTES`] + 1 bytes, so oversized input is
/// still detected (and rejected) by the envelope's own size check rather
/// than silently truncated.
fn read_capped_stdin() -> std::io::Result<String> {
    let mut buf = Vec::new();
    std::io::stdin()
        .take((MAX_INPUT_BYTES + 1) as u64)
        .read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn print_internal_error() {
    let fallback = serde_json::json!({
        "ok": false,
        "apiVersion": "1.0",
        "error": {
            "code": "INTERNAL_ERROR",
            "message": "internal error",
        },
        "meta": { "requestHash": "" },
    });
    let mut stdout = std::io::stdout();
    let _ = writeln!(stdout, "{fallback}");
}
