use std::fmt;

use url::Url;

use crate::{CaniphishError, Result};

/// Parameters of a single supply-chain scan.
///
/// Built once per invocation from flags, environment or config file.
#[derive(Clone, PartialEq, Eq)]
pub struct ScanRequest {
    api_key: String,
    email: String,
    domain: String,
}

impl ScanRequest {
    /// Create a new scan request
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        email: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            email: email.into(),
            domain: domain.into(),
        }
    }

    /// API key for caniphish.com
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Email address registered with caniphish.com
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Domain to scan
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Query parameters in the order the endpoint documents them
    #[must_use]
    pub fn query_pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("emailAddress", self.email.as_str()),
            ("apiKey", self.api_key.as_str()),
            ("domainName", self.domain.as_str()),
        ]
    }

    /// Build the full request URL against `endpoint`
    pub fn url(&self, endpoint: &str) -> Result<Url> {
        Url::parse_with_params(endpoint, self.query_pairs())
            .map_err(|e| CaniphishError::InvalidUrl(format!("{endpoint}: {e}")))
    }
}

impl fmt::Debug for ScanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanRequest")
            .field("api_key", &mask(&self.api_key))
            .field("email", &self.email)
            .field("domain", &self.domain)
            .finish()
    }
}

/// Mask a secret, keeping only a short prefix and suffix.
#[must_use]
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}
