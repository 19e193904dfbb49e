//! Command-line argument definitions using clap.

use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// Options whose next argument is a value, never the `help` alias
const VALUE_OPTIONS: &[&str] = &[
    "-k", "--api-key", "-e", "--email", "-r", "--retries", "-t", "--timeout", "-c",
    "--config", "--endpoint",
];

/// caniphish.com supply-chain scan CLI
///
/// Outputs results to the terminal as tables by default.
/// If OUTPUT is given, the raw JSON response is appended to that file.
///
/// Get your API key at: https://caniphish.com
#[derive(Parser, Debug)]
#[command(name = "caniphish")]
#[command(author, version)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// API key for caniphish.com
    #[arg(short = 'k', long, env = "CANIPHISH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Email address registered with caniphish.com
    #[arg(short, long, env = "CANIPHISH_EMAIL")]
    pub email: Option<String>,

    /// Silent mode: don't print tables
    #[arg(short, long)]
    pub silent: bool,

    /// Retries after the first attempt on transient failures
    #[arg(short, long, value_name = "N")]
    pub retries: Option<u32>,

    /// Per-attempt timeout in seconds
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Verify the server's TLS certificate
    #[arg(long)]
    pub verify_tls: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Override the scan endpoint
    #[arg(long, env = "CANIPHISH_ENDPOINT", hide = true)]
    pub endpoint: Option<String>,

    /// Domain to scan
    pub domain: String,

    /// File to append the JSON response to
    pub output: Option<PathBuf>,
}

/// Rewrite a bare `help` word into `--help`.
///
/// Option values (`-k help`) and anything after `--` are left alone.
pub fn expand_help_alias<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut expanded = Vec::new();
    let mut value_expected = false;
    let mut positional_only = false;

    for (index, arg) in args.into_iter().map(Into::into).enumerate() {
        let text = arg.to_str();
        let is_alias = index > 0 && !value_expected && !positional_only && text == Some("help");

        value_expected = !positional_only && text.is_some_and(|t| VALUE_OPTIONS.contains(&t));
        if text == Some("--") {
            positional_only = true;
        }

        expanded.push(if is_alias { OsString::from("--help") } else { arg });
    }

    expanded
}
