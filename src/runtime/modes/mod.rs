//! Execution modes
//!
//! Only the HTTP server runs long-lived; the other subcommands are one-shot
//! and live in `cli`.

pub mod server;

pub use server::run_server;
