//! Core types and errors for the caniphish API client.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - **Types**: [`ScanRequest`] and the loosely-typed [`ScanResult`] with its
//!   field views ([`SenderIssue`], [`SupplyDetail`])
//! - **Errors**: [`CaniphishError`] and the [`Result`] alias
//!
//! # Example
//!
//! ```rust,ignore
//! use caniphish_core::{ScanResult, Result};
//!
//! fn summarize(result: &ScanResult) -> Result<()> {
//!     for issue in result.sender_issues() {
//!         println!("{} ({})", issue.title, issue.severity);
//!     }
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/caniphish-core/0.2.0")]

mod error;
pub mod types;

pub use error::{CaniphishError, Result};
pub use types::*;
