//! Retrying caniphish API client.

use crate::config::RetryConfig;
use caniphish_core::{CaniphishError, Result, ScanRequest, ScanResult};
use reqwest::redirect::Policy;
use reqwest::Client as HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// The supply-chain scan endpoint
pub const DEFAULT_ENDPOINT: &str = "https://caniphish.com/API/SupplyChainScan";

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the caniphish supply-chain scan API
#[derive(Clone)]
pub struct CaniphishClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    endpoint: String,
    retry_config: RetryConfig,
}

/// Why a single attempt failed in a way the retry policy may absorb
enum Failure {
    Status(u16),
    Timeout(String),
    Connect(String),
    Transport(String),
}

impl Failure {
    /// Classify a request or body-read error; the URL (and its API key) is dropped first.
    fn from_reqwest(err: reqwest::Error) -> Self {
        let err = err.without_url();
        let message = error_chain(&err);
        if err.is_timeout() {
            Self::Timeout(message)
        } else if err.is_connect() {
            Self::Connect(message)
        } else {
            Self::Transport(message)
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Status(code) => format!("HTTP status {code}"),
            Self::Timeout(msg) => format!("timed out: {msg}"),
            Self::Connect(msg) => format!("connection failed: {msg}"),
            Self::Transport(msg) => format!("transport error: {msg}"),
        }
    }
}

impl CaniphishClient {
    /// Create a new client using default settings
    pub fn new() -> Result<Self> {
        CaniphishClientBuilder::new().build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> CaniphishClientBuilder {
        CaniphishClientBuilder::new()
    }

    /// Endpoint requests are sent to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Retry policy in effect
    #[must_use]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.inner.retry_config
    }

    /// Run a supply-chain scan
    pub async fn fetch(&self, request: &ScanRequest) -> Result<ScanResult> {
        let url = request.url(&self.inner.endpoint)?;
        debug!(domain = request.domain(), "requesting supply-chain scan");
        self.fetch_url(url).await
    }

    /// GET `url` under the retry policy and decode the JSON object it returns
    pub async fn fetch_url(&self, url: Url) -> Result<ScanResult> {
        let retry = &self.inner.retry_config;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            // The query string carries the API key; log the host only.
            debug!(attempt, host = url.host_str().unwrap_or_default(), "GET request");

            let failure = match self.inner.http.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        // Read the body here so a stalled or cut-off body is retried too.
                        match response.text().await {
                            Ok(body) => return ScanResult::from_json(&body),
                            Err(e) => Failure::from_reqwest(e),
                        }
                    } else if retry.should_retry_status(status.as_u16()) {
                        Failure::Status(status.as_u16())
                    } else {
                        return Err(Self::handle_error(response).await);
                    }
                }
                Err(e) if e.is_builder() => {
                    return Err(CaniphishError::Transport(error_chain(&e.without_url())));
                }
                Err(e) => Failure::from_reqwest(e),
            };

            if attempt >= retry.max_attempts() {
                return Err(match failure {
                    Failure::Connect(msg) | Failure::Transport(msg) => {
                        CaniphishError::Transport(msg)
                    }
                    other => CaniphishError::RetryExhausted {
                        attempts: attempt,
                        last: other.describe(),
                    },
                });
            }

            let delay = retry.backoff_for(attempt);
            warn!(
                attempt,
                reason = %failure.describe(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Convert a non-retryable status into an error
    async fn handle_error(response: reqwest::Response) -> CaniphishError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Prefer an error message from a JSON body
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                ["error", "message", "Message"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(String::from))
            })
            .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

        CaniphishError::Api {
            code: status.as_u16(),
            message,
        }
    }
}

/// Builder for configuring a [`CaniphishClient`]
pub struct CaniphishClientBuilder {
    endpoint: String,
    timeout: Duration,
    user_agent: String,
    retry_config: RetryConfig,
    accept_invalid_certs: bool,
}

impl Default for CaniphishClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CaniphishClientBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("caniphish-rust/{}", env!("CARGO_PKG_VERSION")),
            retry_config: RetryConfig::default(),
            accept_invalid_certs: true,
        }
    }

    /// Set the endpoint URL (useful for testing)
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Set the per-attempt timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set retry configuration
    #[must_use]
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Skip TLS certificate verification (on by default, as the scan tool always did)
    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<CaniphishClient> {
        Url::parse(&self.endpoint)
            .map_err(|e| CaniphishError::InvalidUrl(format!("{}: {e}", self.endpoint)))?;

        if self.accept_invalid_certs {
            debug!("TLS certificate verification disabled");
        }

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .gzip(true)
            .build()
            .map_err(|e| CaniphishError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(CaniphishClient {
            inner: Arc::new(ClientInner {
                http,
                endpoint: self.endpoint,
                retry_config: self.retry_config,
            }),
        })
    }
}

/// Flatten an error and its sources into one line
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SCAN_PATH: &str = "/API/SupplyChainScan";

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig::new()
            .max_retries(max_retries)
            .backoff_factor(Duration::from_millis(1))
    }

    fn client_for(server: &MockServer, max_retries: u32) -> CaniphishClient {
        CaniphishClient::builder()
            .endpoint(format!("{}{SCAN_PATH}", server.uri()))
            .retry(fast_retry(max_retries))
            .build()
            .unwrap()
    }

    fn request() -> ScanRequest {
        ScanRequest::new("test-key", "me@example.com", "example.com")
    }

    #[tokio::test]
    async fn sends_credentials_as_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SCAN_PATH))
            .and(query_param("emailAddress", "me@example.com"))
            .and(query_param("apiKey", "test-key"))
            .and(query_param("domainName", "example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"SPFRecord": "v=spf1 -all"})))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, 0).fetch(&request()).await.unwrap();
        assert_eq!(result.spf_record().as_deref(), Some("v=spf1 -all"));
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SCAN_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(SCAN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"MailSenderIssues": []})))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, 3).fetch(&request()).await.unwrap();
        assert!(result.sender_issues().is_empty());
    }

    #[tokio::test]
    async fn forbidden_is_retried_like_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client_for(&server, 1).fetch(&request()).await.is_ok());
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;

        let err = client_for(&server, 2).fetch(&request()).await.unwrap_err();
        match err {
            CaniphishError::RetryExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(last.contains("502"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_retryable_status_fails_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid API key"})))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, 5).fetch(&request()).await.unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[tokio::test]
    async fn redirects_are_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SCAN_PATH))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/elsewhere"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/elsewhere"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server, 0).fetch(&request()).await.unwrap_err();
        assert_eq!(err.status_code(), Some(302));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server, 0).fetch(&request()).await.unwrap_err();
        assert!(matches!(err, CaniphishError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn timeouts_count_as_retryable_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let client = CaniphishClient::builder()
            .endpoint(format!("{}{SCAN_PATH}", server.uri()))
            .timeout(Duration::from_millis(50))
            .retry(fast_retry(1))
            .build()
            .unwrap();

        let err = client.fetch(&request()).await.unwrap_err();
        assert!(matches!(err, CaniphishError::RetryExhausted { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let client = CaniphishClient::builder()
            .endpoint(format!("http://127.0.0.1:1{SCAN_PATH}"))
            .retry(fast_retry(1))
            .build()
            .unwrap();

        let err = client.fetch(&request()).await.unwrap_err();
        assert!(matches!(err, CaniphishError::Transport(_)));
    }

    /// How the hand-rolled server treats its first connection
    #[derive(Clone, Copy)]
    enum FirstConnection {
        /// Read the request, then close without answering
        Drop,
        /// Send headers, then stall the body past the client timeout
        StallBody,
    }

    fn read_request(stream: &mut TcpStream) {
        let mut buf = [0u8; 4096];
        let mut seen = Vec::new();
        while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => seen.extend_from_slice(&buf[..n]),
            }
        }
    }

    /// Serve `{}` on every connection except the first `failing` ones.
    fn flaky_server(first: FirstConnection, failing: usize) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}{SCAN_PATH}", listener.local_addr().unwrap());
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connections);

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let index = counter.fetch_add(1, Ordering::SeqCst);
                std::thread::spawn(move || {
                    read_request(&mut stream);
                    if index >= failing {
                        let _ = stream.write_all(
                            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
                        );
                        return;
                    }
                    match first {
                        FirstConnection::Drop => {}
                        FirstConnection::StallBody => {
                            let _ = stream.write_all(
                                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n",
                            );
                            std::thread::sleep(Duration::from_secs(2));
                        }
                    }
                });
            }
        });

        (endpoint, connections)
    }

    fn raw_client(endpoint: &str, max_retries: u32) -> CaniphishClient {
        CaniphishClient::builder()
            .endpoint(endpoint)
            .timeout(Duration::from_millis(300))
            .retry(fast_retry(max_retries))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn dropped_connection_is_retried() {
        let (endpoint, connections) = flaky_server(FirstConnection::Drop, 1);

        let result = raw_client(&endpoint, 3).fetch(&request()).await.unwrap();
        assert_eq!(result, ScanResult::default());
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stalled_body_is_retried() {
        let (endpoint, connections) = flaky_server(FirstConnection::StallBody, 1);

        let result = raw_client(&endpoint, 3).fetch(&request()).await.unwrap();
        assert_eq!(result, ScanResult::default());
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn repeated_drops_exhaust_as_transport_error_without_api_key() {
        let (endpoint, connections) = flaky_server(FirstConnection::Drop, usize::MAX);
        let request = ScanRequest::new("secret-key-123", "me@example.com", "example.com");

        let err = raw_client(&endpoint, 2).fetch(&request).await.unwrap_err();
        assert!(matches!(err, CaniphishError::Transport(_)));
        assert_eq!(connections.load(Ordering::SeqCst), 3);
        assert!(!err.to_string().contains("secret-key-123"));
        assert!(!err.to_string().contains("apiKey"));
    }

    #[tokio::test]
    async fn errors_never_carry_the_api_key() {
        let request = ScanRequest::new("secret-key-123", "me@example.com", "example.com");
        let client = CaniphishClient::builder()
            .endpoint(format!("http://127.0.0.1:1{SCAN_PATH}"))
            .retry(fast_retry(0))
            .build()
            .unwrap();

        let err = client.fetch(&request).await.unwrap_err();
        assert!(!err.to_string().contains("secret-key-123"));
        assert!(!format!("{err:?}").contains("secret-key-123"));
    }

    #[test]
    fn invalid_endpoint_is_rejected_at_build() {
        let result = CaniphishClient::builder().endpoint("::nope::").build();
        assert!(matches!(result, Err(CaniphishError::InvalidUrl(_))));
    }
}
