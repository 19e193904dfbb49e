//! # caniphish-cli
//!
//! Command-line interface for the caniphish.com supply-chain scan.
//!
//! ## Features
//!
//! - **Scan**: query the API with automatic retry and backoff
//! - **Tables**: mail sender issues, mail receiver stack and raw DNS records
//! - **Persistence**: append the raw JSON response to a file
//! - **Configuration**: flags, environment variables or a TOML config file

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
