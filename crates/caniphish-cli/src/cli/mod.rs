//! CLI argument parsing and the scan command.

pub mod args;

use anyhow::{Context as _, Result};
use args::{expand_help_alias, Cli};
use caniphish::{CaniphishClient, RetryConfig, ScanRequest, DEFAULT_TIMEOUT};
use clap::Parser;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::output::{persist, Renderer};

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse_from(expand_help_alias(std::env::args_os()));

    init_tracing(cli.verbose, cli.no_color);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let outcome: Result<()> = async {
        // Load configuration
        let config = match &cli.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        let ctx = Context::resolve(&cli, &config);
        execute(&ctx, &cli).await
    }
    .await;

    if let Err(e) = &outcome {
        error!(domain = cli.domain.as_str(), error = %format!("{e:#}"), "scan failed");
    }
    outcome
}

/// Fetch, then render and/or persist.
pub async fn execute(ctx: &Context, cli: &Cli) -> Result<()> {
    let request = ctx.scan_request(&cli.domain)?;
    let client = ctx.client()?;
    debug!(
        endpoint = client.endpoint(),
        max_retries = client.retry_config().max_retries,
        "client ready"
    );

    let result = match client.fetch(&request).await {
        Ok(result) => result,
        Err(e) => {
            debug!(status = e.status_code(), "fetch failed");
            return Err(e).with_context(|| format!("scan of {} failed", request.domain()));
        }
    };
    debug!(fields = result.fields().len(), "scan result received");

    if !cli.silent {
        Renderer::stdout()
            .render(&result, request.domain())
            .context("writing tables to stdout")?;
    }

    if let Some(path) = &cli.output {
        persist(&result, path)
            .with_context(|| format!("writing results to {}", path.display()))?;
        info!(path = %path.display(), "results saved");
    }

    Ok(())
}

/// Settings merged from flags, environment and config file.
#[derive(Debug, Clone)]
pub struct Context {
    /// caniphish.com API key
    pub api_key: Option<String>,

    /// Registered email address
    pub email: Option<String>,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Per-attempt timeout
    pub timeout: Duration,

    /// Whether to verify TLS certificates
    pub verify_tls: bool,

    /// Endpoint override
    pub endpoint: Option<String>,
}

impl Context {
    /// Merge settings; flags and environment win over the config file.
    pub fn resolve(cli: &Cli, config: &Config) -> Self {
        let defaults = RetryConfig::default();

        Self {
            api_key: non_empty(cli.api_key.as_ref()).or_else(|| non_empty(config.api_key.as_ref())),
            email: non_empty(cli.email.as_ref()).or_else(|| non_empty(config.email.as_ref())),
            max_retries: cli
                .retries
                .or(config.max_retries)
                .unwrap_or(defaults.max_retries),
            timeout: cli
                .timeout
                .or(config.timeout_secs)
                .map_or(DEFAULT_TIMEOUT, Duration::from_secs),
            verify_tls: cli.verify_tls || config.verify_tls,
            endpoint: cli.endpoint.clone(),
        }
    }

    /// Build the scan request, requiring credentials.
    pub fn scan_request(&self, domain: &str) -> Result<ScanRequest> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "API key required.\n\n\
                 Set it with one of:\n  \
                 1. --api-key <KEY>\n  \
                 2. CANIPHISH_API_KEY environment variable\n  \
                 3. api_key in the config file"
            )
        })?;
        let email = self.email.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "Email address required.\n\n\
                 Set it with one of:\n  \
                 1. --email <EMAIL>\n  \
                 2. CANIPHISH_EMAIL environment variable\n  \
                 3. email in the config file"
            )
        })?;

        let domain = domain.trim();
        if domain.is_empty() {
            anyhow::bail!("Domain must not be empty");
        }

        Ok(ScanRequest::new(api_key, email, domain))
    }

    /// Create a client with the resolved retry and TLS settings.
    pub fn client(&self) -> Result<CaniphishClient> {
        let mut builder = CaniphishClient::builder()
            .user_agent(concat!("caniphish-cli/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .retry(RetryConfig::new().max_retries(self.max_retries))
            .accept_invalid_certs(!self.verify_tls);

        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint(endpoint);
        }

        Ok(builder.build()?)
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

/// Log to stderr; `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: u8, no_color: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!no_color)
                .with_target(false),
        )
        .try_init();
}
