//! HTTP client abstraction for testability.
//!
//! All network access in the crate goes through the [`HttpClient`] trait so
//! probes, planners and the orchestrator can be exercised against scripted
//! responses without touching the network.

use std::time::Duration;
use thiserror::Error;

/// Default timeout for HTTP requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors from a single HTTP GET.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HttpError {
    /// Connection-level failure: reset, refused, DNS, timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status code.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The client itself could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    ClientBuild(String),
}

impl HttpError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Transport failures and throttling/server-side statuses are
    /// retryable; client errors (4xx other than 429) are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::ClientBuild(_) => false,
        }
    }
}

impl crate::retry::Retryable for HttpError {
    fn is_retryable(&self) -> bool {
        HttpError::is_retryable(self)
    }
}

/// Trait for blocking HTTP GET operations.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET and returns the response body.
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError>;
}

/// Real HTTP client implementation using reqwest's blocking API.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with the default 30 second timeout.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::ClientBuild(e.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| HttpError::Transport(e.to_string()))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock HTTP client that replays a scripted sequence of responses.
    ///
    /// Responses are consumed in order; once the script is exhausted the
    /// final response repeats. Requested URLs are recorded for assertions.
    /// Clones share the same script and request log, so a test can keep a
    /// handle after moving a clone into the component under test.
    #[derive(Clone)]
    pub struct MockHttpClient {
        inner: Arc<MockInner>,
    }

    struct MockInner {
        script: Mutex<Vec<Result<Vec<u8>, HttpError>>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn new(script: Vec<Result<Vec<u8>, HttpError>>) -> Self {
            assert!(!script.is_empty(), "script must have at least one response");
            Self {
                inner: Arc::new(MockInner {
                    script: Mutex::new(script),
                    requests: Mutex::new(Vec::new()),
                }),
            }
        }

        /// Single response replayed for every request.
        pub fn always(response: Result<Vec<u8>, HttpError>) -> Self {
            Self::new(vec![response])
        }

        pub fn requests(&self) -> Vec<String> {
            self.inner.requests.lock().unwrap().clone()
        }

        pub fn request_count(&self) -> usize {
            self.inner.requests.lock().unwrap().len()
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
            self.inner.requests.lock().unwrap().push(url.to_string());
            let mut script = self.inner.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone()
            }
        }
    }

    #[test]
    fn test_mock_replays_script_in_order() {
        let mock = MockHttpClient::new(vec![
            Err(HttpError::Transport("reset".into())),
            Ok(vec![1, 2, 3]),
        ]);

        assert!(mock.get("http://example.com/a").is_err());
        assert_eq!(mock.get("http://example.com/b").unwrap(), vec![1, 2, 3]);
        // Script exhausted: last response repeats
        assert_eq!(mock.get("http://example.com/c").unwrap(), vec![1, 2, 3]);
        assert_eq!(mock.request_count(), 3);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(HttpError::Transport("timed out".into()).is_retryable());
        assert!(HttpError::Status { status: 503, url: "u".into() }.is_retryable());
        assert!(HttpError::Status { status: 429, url: "u".into() }.is_retryable());
        assert!(!HttpError::Status { status: 404, url: "u".into() }.is_retryable());
        assert!(!HttpError::ClientBuild("bad".into()).is_retryable());
    }
}
