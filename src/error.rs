//! Error types for the Messari client library.

use thiserror::Error;

/// The main error type for all Messari client operations.
#[derive(Error, Debug)]
pub enum MessariError {
    /// Client configuration is missing or invalid.
    ///
    /// Only produced while building a client, never by [`call`](crate::MessariClient::call).
    #[error("configuration error: {0}")]
    Config(String),

    /// The endpoint key is not present in the registry.
    #[error("unknown endpoint: {key}")]
    UnknownEndpoint {
        /// The key that was looked up
        key: String,
    },

    /// A `{placeholder}` in the path template has no matching path parameter.
    ///
    /// Raised before any network I/O happens.
    #[error("missing path parameter `{param}` for `{endpoint}`")]
    MissingPathParameter {
        /// Endpoint key whose template could not be resolved
        endpoint: String,
        /// First missing placeholder, in template order
        param: String,
    },

    /// Authentication or authorization failure (HTTP 401/403).
    #[error("authentication failed: HTTP {status}")]
    Auth {
        /// The HTTP status code (401 or 403)
        status: u16,
        /// Decoded response body, when the body was JSON
        body: Option<serde_json::Value>,
    },

    /// Rate limit exceeded (HTTP 429).
    #[error("rate limit exceeded, retry after {retry_after_secs:?}s")]
    RateLimited {
        /// Wait hint from the `Retry-After` response header, when present
        retry_after_secs: Option<u64>,
        /// Decoded response body, when the body was JSON
        body: Option<serde_json::Value>,
    },

    /// Transport, decoding, or other non-2xx HTTP failure.
    #[error("API error: {0}")]
    Api(ApiFailure),
}

impl MessariError {
    /// Short stable identifier for the error family.
    ///
    /// Used by callers that report errors without matching on the full enum,
    /// e.g. the CLI's `error[<label>]: message` output.
    pub fn label(&self) -> &'static str {
        match self {
            MessariError::Config(_) => "config",
            MessariError::UnknownEndpoint { .. } => "unknown-endpoint",
            MessariError::MissingPathParameter { .. } => "missing-path-param",
            MessariError::Auth { .. } => "auth",
            MessariError::RateLimited { .. } => "rate-limit",
            MessariError::Api(failure) => match failure.kind {
                ApiErrorKind::Network => "network",
                ApiErrorKind::MalformedResponse => "malformed-response",
                ApiErrorKind::Http => "http",
            },
        }
    }
}

impl From<reqwest::Error> for MessariError {
    fn from(err: reqwest::Error) -> Self {
        MessariError::Api(ApiFailure::network(&err))
    }
}

/// Distinguishes the failure modes collapsed into [`MessariError::Api`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Transport failure: connection refused, timeout, DNS resolution
    Network,
    /// A 2xx response whose body could not be decoded as JSON
    MalformedResponse,
    /// A non-2xx response not covered by the auth or rate-limit variants
    Http,
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ApiErrorKind::Network => "network",
            ApiErrorKind::MalformedResponse => "malformed response",
            ApiErrorKind::Http => "http",
        };
        write!(f, "{name}")
    }
}

/// Details for failures reported by the transport or the Messari API itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    /// Which family of failure this is
    pub kind: ApiErrorKind,
    /// HTTP status code, absent for transport failures
    pub status: Option<u16>,
    /// Decoded response body, when one was available and was JSON
    pub body: Option<serde_json::Value>,
    /// The request URL, when known
    pub url: Option<String>,
    /// Human-readable error message
    pub message: String,
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {status}): {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl ApiFailure {
    /// Create a transport failure from the underlying HTTP client error.
    pub fn network(err: &reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            status: None,
            body: None,
            url: err.url().map(|u| u.to_string()),
            message: err.to_string(),
        }
    }

    /// Create a decode failure for a 2xx response with a non-JSON body.
    pub fn malformed(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::MalformedResponse,
            status: None,
            body: None,
            url: Some(url.into()),
            message: message.into(),
        }
    }

    /// Create a generic HTTP failure from a non-2xx response.
    pub fn http(
        status: u16,
        message: impl Into<String>,
        body: Option<serde_json::Value>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            status: Some(status),
            body,
            url: Some(url.into()),
            message: message.into(),
        }
    }

    /// Check if this is a transport-level failure.
    pub fn is_network(&self) -> bool {
        self.kind == ApiErrorKind::Network
    }

    /// Check if this is a response-decoding failure.
    pub fn is_malformed(&self) -> bool {
        self.kind == ApiErrorKind::MalformedResponse
    }

    /// Check if this failure carries a 5xx status.
    pub fn is_server_error(&self) -> bool {
        self.status.is_some_and(|s| (500..600).contains(&s))
    }
}
