//! Messari REST API client implementation.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{ApiFailure, MessariError};
use crate::registry::{EndpointDescriptor, EndpointRegistry, HttpMethod};

/// Base URL for the Messari REST API.
pub const MESSARI_BASE_URL: &str = "https://api.messari.io";

/// Environment variable consulted when no API key is passed explicitly.
pub const MESSARI_API_KEY_ENV: &str = "MESSARI_API_KEY";

/// Header carrying the API key on every request.
const API_KEY_HEADER: &str = "x-messari-api-key";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Parameters for a single [`MessariClient::call`] invocation.
///
/// Path and query values accept anything convertible to [`serde_json::Value`];
/// scalars are rendered onto the wire with booleans as `true`/`false` and
/// numbers in their display form. Query keys outside the endpoint's allow-list
/// are dropped at dispatch, not rejected.
///
/// # Example
///
/// ```rust
/// use messari_api_client::CallParams;
///
/// let params = CallParams::new()
///     .path("exchangeIdentifier", "binance")
///     .query("limit", 20)
///     .query("hasMarketData", true);
/// ```
#[derive(Debug, Default, Clone)]
pub struct CallParams {
    path: BTreeMap<String, Value>,
    query: BTreeMap<String, Value>,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl CallParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value for one `{placeholder}` in the path template.
    pub fn path(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path.insert(name.into(), value.into());
        self
    }

    /// Set one query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Merge a set of path parameters, e.g. a decoded JSON object.
    pub fn paths(mut self, values: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.path.extend(values);
        self
    }

    /// Merge a set of query parameters, e.g. a decoded JSON object.
    pub fn queries(mut self, values: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.query.extend(values);
        self
    }

    /// Add a header sent on top of the client defaults.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body, sent for non-GET endpoints.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The Messari REST API client.
///
/// A thin, registry-driven wrapper: [`call`](Self::call) turns an endpoint key
/// plus parameters into one blocking HTTP exchange and hands the decoded JSON
/// back untouched. Configuration (API key, base URL, timeout) is fixed at
/// construction; the client holds no mutable state and can be shared freely.
///
/// # Example
///
/// ```rust,no_run
/// use messari_api_client::{CallParams, MessariClient};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Key from the MESSARI_API_KEY environment variable.
///     let client = MessariClient::new()?;
///
///     let params = CallParams::new().query("assetIDs", "bitcoin,ethereum");
///     let details = client.call("assets.details", &params)?;
///     println!("{}", messari_api_client::pretty(&details));
///     Ok(())
/// }
/// ```
pub struct MessariClient {
    http_client: HttpClient,
    base_url: String,
    api_key: SecretString,
    registry: EndpointRegistry,
}

impl MessariClient {
    /// Create a client with default settings and the key from the
    /// [`MESSARI_API_KEY`](MESSARI_API_KEY_ENV) environment variable.
    pub fn new() -> Result<Self, MessariError> {
        Self::builder().build()
    }

    /// Create a new client builder.
    pub fn builder() -> MessariClientBuilder {
        MessariClientBuilder::new()
    }

    /// The endpoint registry backing this client.
    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Call a registered endpoint.
    ///
    /// Resolves the descriptor for `key`, substitutes path parameters into the
    /// template, filters query parameters against the allow-list, performs the
    /// HTTP exchange and decodes the response body as JSON. An empty 2xx body
    /// decodes to [`Value::Null`].
    ///
    /// Every invocation is one independent, synchronous request-response
    /// exchange; nothing is retried or cached.
    pub fn call(&self, key: &str, params: &CallParams) -> Result<Value, MessariError> {
        let descriptor = self.registry.get(key)?;
        let path = resolve_path(descriptor, &params.path)?;
        let query = filter_query(descriptor, &params.query);
        let url = format!("{}{}", self.base_url, path);

        debug!(endpoint = key, method = %descriptor.method, url = %url, "dispatching request");

        let mut request = self
            .http_client
            .request(descriptor.method.as_reqwest(), &url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .query(&query);
        for (name, value) in &params.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &params.body {
            if descriptor.method != HttpMethod::Get {
                request = request.json(body);
            }
        }

        let response = request.send()?;
        self.parse_response(&url, response)
    }

    /// Map an HTTP response to a decoded payload or a typed error.
    fn parse_response(
        &self,
        url: &str,
        response: reqwest::blocking::Response,
    ) -> Result<Value, MessariError> {
        let status = response.status();
        let retry_after_secs = parse_retry_after(response.headers());
        let body = response.text()?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&body).map_err(|e| {
                MessariError::Api(ApiFailure::malformed(
                    format!("failed to decode response body: {e}"),
                    url,
                ))
            });
        }

        let error_body: Option<Value> = serde_json::from_str(&body).ok();
        match status.as_u16() {
            401 | 403 => Err(MessariError::Auth {
                status: status.as_u16(),
                body: error_body,
            }),
            429 => Err(MessariError::RateLimited {
                retry_after_secs,
                body: error_body,
            }),
            _ => {
                let message = if body.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    body.trim().to_string()
                };
                Err(MessariError::Api(ApiFailure::http(
                    status.as_u16(),
                    message,
                    error_body,
                    url,
                )))
            }
        }
    }
}

impl std::fmt::Debug for MessariClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessariClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("endpoints", &self.registry.len())
            .finish()
    }
}

/// Builder for [`MessariClient`].
pub struct MessariClientBuilder {
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    user_agent: Option<String>,
    registry: Option<EndpointRegistry>,
}

impl MessariClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: MESSARI_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            registry: None,
        }
    }

    /// Set the API key explicitly.
    ///
    /// When set, the environment is never consulted.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL (useful for testing with a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Use a custom endpoint registry instead of the built-in table.
    pub fn registry(mut self, registry: EndpointRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the client.
    ///
    /// Fails with [`MessariError::Config`] when no API key is available from
    /// either the explicit argument or the environment, or when the base URL
    /// does not parse. Configuration problems surface here, never at call
    /// time.
    pub fn build(self) -> Result<MessariClient, MessariError> {
        let api_key = match self.api_key {
            Some(key) => key,
            None => std::env::var(MESSARI_API_KEY_ENV).map_err(|_| {
                MessariError::Config(format!(
                    "API key is missing: pass one explicitly or set {MESSARI_API_KEY_ENV}"
                ))
            })?,
        };
        if api_key.is_empty() {
            return Err(MessariError::Config("API key is empty".to_string()));
        }

        Url::parse(&self.base_url).map_err(|e| {
            MessariError::Config(format!("invalid base URL `{}`: {e}", self.base_url))
        })?;
        let base_url = self.base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("messari-api-client/{}", env!("CARGO_PKG_VERSION")));
        let header_value = HeaderValue::from_str(&user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("messari-api-client"));
        headers.insert(USER_AGENT, header_value);

        let http_client = HttpClient::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .map_err(|e| MessariError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(MessariClient {
            http_client,
            base_url,
            api_key: SecretString::from(api_key),
            registry: self.registry.unwrap_or_default(),
        })
    }
}

impl Default for MessariClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pretty-print a decoded payload.
///
/// Deterministic output: two-space indentation, object keys in sorted order
/// (the default `serde_json` map representation). Intended for display only.
pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Substitute path parameters into the descriptor's template.
///
/// Placeholders are checked in template order, so the first missing parameter
/// reported is deterministic. Substituted values are percent-encoded.
fn resolve_path(
    descriptor: &EndpointDescriptor,
    values: &BTreeMap<String, Value>,
) -> Result<String, MessariError> {
    let mut path = descriptor.path.to_string();
    for name in descriptor.placeholders() {
        let value = values
            .get(name)
            .ok_or_else(|| MessariError::MissingPathParameter {
                endpoint: descriptor.key.to_string(),
                param: name.to_string(),
            })?;
        let encoded = urlencoding::encode(&scalar_to_string(value)).into_owned();
        path = path.replace(&format!("{{{name}}}"), &encoded);
    }
    Ok(path)
}

/// Filter query parameters down to the endpoint's allow-list.
///
/// Unknown keys and JSON nulls are silently dropped so callers can pass extra
/// context without breaking.
fn filter_query(
    descriptor: &EndpointDescriptor,
    values: &BTreeMap<String, Value>,
) -> Vec<(String, String)> {
    values
        .iter()
        .filter(|(name, value)| descriptor.allows_query_param(name) && !value.is_null())
        .map(|(name, value)| (name.clone(), scalar_to_string(value)))
        .collect()
}

/// Render a JSON scalar the way it goes onto the wire.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        other => other.to_string(),
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry::MESSARI_ENDPOINTS;

    fn descriptor(key: &str) -> &'static EndpointDescriptor {
        MESSARI_ENDPOINTS.iter().find(|d| d.key == key).unwrap()
    }

    fn map(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_resolve_path_substitutes_and_encodes() {
        let d = descriptor("exchanges.get");
        let path = resolve_path(d, &map(&[("exchangeIdentifier", json!("binance"))])).unwrap();
        assert_eq!(path, "/metrics/v1/exchanges/binance");

        let path = resolve_path(d, &map(&[("exchangeIdentifier", json!("gate io/1"))])).unwrap();
        assert_eq!(path, "/metrics/v1/exchanges/gate%20io%2F1");
    }

    #[test]
    fn test_resolve_path_missing_param() {
        let d = descriptor("exchanges.get");
        let err = resolve_path(d, &BTreeMap::new()).unwrap_err();
        assert_eq!(err.label(), "missing-path-param");
        assert!(err.to_string().contains("exchangeIdentifier"));
    }

    #[test]
    fn test_filter_query_drops_unknown_keys() {
        let d = descriptor("assets.list");
        let query = filter_query(d, &map(&[("bogus", json!("x")), ("limit", json!(5))]));
        assert_eq!(query, vec![("limit".to_string(), "5".to_string())]);
    }

    #[test]
    fn test_filter_query_normalizes_scalars() {
        let d = descriptor("assets.list");
        let query = filter_query(
            d,
            &map(&[
                ("hasMarketData", json!(true)),
                ("search", json!("ai")),
                ("page", json!(2)),
                ("category", Value::Null),
            ]),
        );
        assert_eq!(
            query,
            vec![
                ("hasMarketData".to_string(), "true".to_string()),
                ("page".to_string(), "2".to_string()),
                ("search".to_string(), "ai".to_string()),
            ]
        );
    }

    #[test]
    fn test_pretty_is_deterministic() {
        let value = json!({"b": 1, "a": {"nested": true}});
        let expected = "{\n  \"a\": {\n    \"nested\": true\n  },\n  \"b\": 1\n}";
        assert_eq!(pretty(&value), expected);
        assert_eq!(pretty(&value), pretty(&value));
    }

    #[test]
    fn test_builder_rejects_bad_base_url() {
        let err = MessariClient::builder()
            .api_key("key")
            .base_url("not a url")
            .build()
            .unwrap_err();
        assert_eq!(err.label(), "config");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = MessariClient::builder()
            .api_key("super_secret_key")
            .build()
            .unwrap();
        let debug_str = format!("{client:?}");
        assert!(!debug_str.contains("super_secret_key"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
