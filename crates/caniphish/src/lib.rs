//! Rust client for the caniphish.com supply-chain scan API.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use caniphish::{CaniphishClient, ScanRequest};
//!
//! #[tokio::main]
//! async fn main() -> caniphish::Result<()> {
//!     let client = CaniphishClient::new()?;
//!     let request = ScanRequest::new("your-api-key", "you@example.com", "example.com");
//!
//!     let result = client.fetch(&request).await?;
//!     for issue in result.sender_issues() {
//!         println!("{} {} ({})", issue.code, issue.title, issue.severity);
//!     }
//!     println!("SPF: {:?}", result.spf_record());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Uses rustls for TLS
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS

#![doc(html_root_url = "https://docs.rs/caniphish/0.2.0")]

// Re-export core types
pub use caniphish_core::*;

// Re-export client
pub use caniphish_client::{
    CaniphishClient, CaniphishClientBuilder, RetryConfig, DEFAULT_ENDPOINT,
    DEFAULT_RETRY_STATUSES, DEFAULT_TIMEOUT,
};

// Re-export runtime for convenience
pub use serde_json;
pub use tokio;
