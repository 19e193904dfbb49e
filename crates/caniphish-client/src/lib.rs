//! HTTP client for the caniphish supply-chain scan API.
//!
//! This crate provides [`CaniphishClient`], which issues the scan request
//! under a [`RetryConfig`] policy and decodes the JSON object it returns.

#![doc(html_root_url = "https://docs.rs/caniphish-client/0.2.0")]

mod client;
mod config;

pub use caniphish_core::{CaniphishError, Result};
pub use client::{CaniphishClient, CaniphishClientBuilder, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use config::*;
