/// Helpers.
mod common;
/// Subcommand tests.
mod cli;
/// Configuration discovery tests.
mod config;
