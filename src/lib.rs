//! Pre-signature transaction validator for staking and DeFi yield operations.
//!
//! Given an unsigned transaction and the yield product a user intends to
//! interact with, this crate decides whether the transaction actually does
//! what it claims to do before it is ever signed. It never simulates,
//! submits, or signs anything; every check is a pure decode-and-inspect pass
//! over the raw transaction bytes.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`chain`] | Per-chain decoders (EVM calldata, Solana legacy transactions, Tron contracts) |
//! | [`types`] | Chain-agnostic request/result data model |
//! | [`error`] | Crate-wide error taxonomy |
//! | [`validators`] | Per-yield validation rules and the tagged-enum registry entry |
//! | [`registry`] | The immutable `yield_id -> validator` registry |
//! | [`dispatch`] | Auto-detect dispatch: tries every op a validator supports |
//! | [`envelope`] | JSON request/response envelope, schema checks, error codes |
//! | [`config`] | CLI configuration (only with the `cli` feature) |
//! | [`logging`] | `tracing` subscriber setup for the CLI binary (only with the `cli` feature) |
//!
//! # Example
//!
//! ```
//! use txguard::registry::Registry;
//! use txguard::envelope;
//!
//! let registry = Registry::build().unwrap();
//! let request = r#"{"apiVersion":"1.0","operation":"getSupportedYieldIds"}"#;
//! let response = envelope::handle_json_request(&registry, request);
//! assert!(serde_json::to_value(&response).unwrap()["ok"].as_bool().unwrap());
//! ```

pub mod chain;
#[cfg(feature = "cli")]
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
#[cfg(feature = "cli")]
pub mod logging;
pub mod registry;
pub mod types;
pub mod validators;

pub use dispatch::{dispatch, ValidationOutcome};
pub use envelope::handle_json_request;
pub use registry::Registry;
