//! CLI configuration (spec.md §6 CLI surface; SPEC_FULL.md §3.3).

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for `txguard-cli`.
#[derive(Parser, Debug)]
#[command(name = "txguard-cli")]
#[command(about = "Pre-signature transaction validator for staking and DeFi yield operations")]
pub struct CliArgs {
    /// Overrides the embedded vault registry with one loaded from this path.
    #[arg(long, short, env = "TXGUARD_VAULT_REGISTRY")]
    pub vault_registry: Option<PathBuf>,

    /// Log level passed through to `RUST_LOG` when unset.
    #[arg(long, env = "TXGUARD_LOG", default_value = "info")]
    pub log_level: String,
}
