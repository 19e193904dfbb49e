//! caniphish - supply-chain phishing-risk scan CLI
//!
//! Queries caniphish.com for a domain's mail sender and receiver posture.

use anyhow::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    caniphish_cli::run().await
}
