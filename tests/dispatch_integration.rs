use std::time::Duration;

use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use messari_api_client::{
    ApiErrorKind, CallParams, EndpointDescriptor, EndpointRegistry, HttpMethod, MessariClient,
    MessariError,
};

/// Blocking-friendly wrapper around wiremock's async mock server.
///
/// The runtime must outlive the server so its background task keeps serving
/// while the test thread performs blocking requests.
struct TestServer {
    runtime: Runtime,
    server: MockServer,
}

impl TestServer {
    fn start() -> Self {
        let runtime = Runtime::new().expect("tokio runtime");
        let server = runtime.block_on(MockServer::start());
        Self { runtime, server }
    }

    fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    fn uri(&self) -> String {
        self.server.uri()
    }

    fn received_requests(&self) -> Vec<wiremock::Request> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }
}

fn build_client(server: &TestServer) -> MessariClient {
    MessariClient::builder()
        .api_key("test_key")
        .base_url(server.uri())
        .timeout(Duration::from_secs(5))
        .build()
        .expect("client")
}

#[test]
fn test_successful_call_round_trips_payload() {
    let server = TestServer::start();
    let response = json!({"data": []});

    server.mount(
        Mock::given(method("GET"))
            .and(path("/metrics/v2/assets"))
            .and(header("x-messari-api-key", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response.clone())),
    );

    let client = build_client(&server);
    let data = client.call("assets.list", &CallParams::new()).unwrap();
    assert_eq!(data, response);
}

#[test]
fn test_unknown_endpoint_never_hits_the_wire() {
    let server = TestServer::start();
    let client = build_client(&server);

    let err = client
        .call("assets.bogus", &CallParams::new())
        .unwrap_err();
    assert!(matches!(err, MessariError::UnknownEndpoint { ref key } if key == "assets.bogus"));
    assert!(server.received_requests().is_empty());
}

#[test]
fn test_missing_path_param_never_hits_the_wire() {
    let server = TestServer::start();
    let client = build_client(&server);

    let err = client.call("exchanges.get", &CallParams::new()).unwrap_err();
    match err {
        MessariError::MissingPathParameter { endpoint, param } => {
            assert_eq!(endpoint, "exchanges.get");
            assert_eq!(param, "exchangeIdentifier");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(server.received_requests().is_empty());
}

#[test]
fn test_path_param_is_substituted() {
    let server = TestServer::start();
    let response = json!({"data": {"slug": "binance"}});

    server.mount(
        Mock::given(method("GET"))
            .and(path("/metrics/v1/exchanges/binance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response.clone())),
    );

    let client = build_client(&server);
    let params = CallParams::new().path("exchangeIdentifier", "binance");
    let data = client.call("exchanges.get", &params).unwrap();
    assert_eq!(data, response);
}

#[test]
fn test_unknown_query_params_are_dropped() {
    let server = TestServer::start();

    server.mount(
        Mock::given(method("GET"))
            .and(path("/metrics/v2/assets"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []}))),
    );

    let client = build_client(&server);
    let params = CallParams::new().query("bogus", "x").query("limit", 5);
    client.call("assets.list", &params).unwrap();

    let requests = server.received_requests();
    assert_eq!(requests.len(), 1);
    let query: Vec<(String, String)> = requests[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(query, vec![("limit".to_string(), "5".to_string())]);
}

#[test]
fn test_bool_query_values_are_normalized() {
    let server = TestServer::start();

    server.mount(
        Mock::given(method("GET"))
            .and(path("/metrics/v2/assets"))
            .and(query_param("hasMarketData", "true"))
            .and(query_param("search", "ai"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []}))),
    );

    let client = build_client(&server);
    let params = CallParams::new()
        .query("hasMarketData", true)
        .query("search", "ai");
    client.call("assets.list", &params).unwrap();
}

#[test]
fn test_unauthorized_maps_to_auth_error() {
    for status in [401, 403] {
        let server = TestServer::start();
        server.mount(
            Mock::given(method("GET"))
                .and(path("/metrics/v2/assets"))
                .respond_with(
                    ResponseTemplate::new(status).set_body_json(json!({"error": "bad key"})),
                ),
        );

        let client = build_client(&server);
        let err = client.call("assets.list", &CallParams::new()).unwrap_err();
        match err {
            MessariError::Auth { status: got, body } => {
                assert_eq!(got, status);
                assert_eq!(body, Some(json!({"error": "bad key"})));
            }
            other => panic!("unexpected error for {status}: {other:?}"),
        }
    }
}

#[test]
fn test_rate_limit_maps_to_rate_limited() {
    let server = TestServer::start();
    server.mount(
        Mock::given(method("GET"))
            .and(path("/news/v1/news/feed"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "7")
                    .set_body_json(json!({"error": "slow down"})),
            ),
    );

    let client = build_client(&server);
    let err = client.call("news.feed", &CallParams::new()).unwrap_err();
    match err {
        MessariError::RateLimited {
            retry_after_secs,
            body,
        } => {
            assert_eq!(retry_after_secs, Some(7));
            assert_eq!(body, Some(json!({"error": "slow down"})));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_server_error_maps_to_http_api_error() {
    let server = TestServer::start();
    server.mount(
        Mock::given(method("GET"))
            .and(path("/metrics/v2/assets"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom")),
    );

    let client = build_client(&server);
    let err = client.call("assets.list", &CallParams::new()).unwrap_err();
    match err {
        MessariError::Api(failure) => {
            assert_eq!(failure.kind, ApiErrorKind::Http);
            assert_eq!(failure.status, Some(500));
            assert!(failure.message.contains("boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_malformed_success_body_maps_to_decode_error() {
    let server = TestServer::start();
    server.mount(
        Mock::given(method("GET"))
            .and(path("/metrics/v2/assets"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json at all")),
    );

    let client = build_client(&server);
    let err = client.call("assets.list", &CallParams::new()).unwrap_err();
    match err {
        MessariError::Api(failure) => assert_eq!(failure.kind, ApiErrorKind::MalformedResponse),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_empty_success_body_decodes_to_null() {
    let server = TestServer::start();
    server.mount(
        Mock::given(method("GET"))
            .and(path("/metrics/v2/assets"))
            .respond_with(ResponseTemplate::new(204)),
    );

    let client = build_client(&server);
    let data = client.call("assets.list", &CallParams::new()).unwrap();
    assert_eq!(data, serde_json::Value::Null);
}

#[test]
fn test_connection_refused_maps_to_network_error() {
    // Bind then drop a listener so the port is very likely unused.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = MessariClient::builder()
        .api_key("test_key")
        .base_url(format!("http://127.0.0.1:{port}"))
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let err = client.call("assets.list", &CallParams::new()).unwrap_err();
    match err {
        MessariError::Api(failure) => assert!(failure.is_network()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_slow_response_times_out_as_network_error() {
    let server = TestServer::start();
    server.mount(
        Mock::given(method("GET"))
            .and(path("/metrics/v2/assets"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": []}))
                    .set_delay(Duration::from_secs(5)),
            ),
    );

    let client = MessariClient::builder()
        .api_key("test_key")
        .base_url(server.uri())
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let err = client.call("assets.list", &CallParams::new()).unwrap_err();
    match err {
        MessariError::Api(failure) => assert!(failure.is_network()),
        other => panic!("unexpected error: {other:?}"),
    }
}

// Test-only routes exercising a custom registry table, POST dispatch and
// extra headers.
static TEST_ENDPOINTS: &[EndpointDescriptor] = &[EndpointDescriptor {
    key: "diag.echo",
    method: HttpMethod::Post,
    path: "/diag/{channel}/echo",
    path_params: &["channel"],
    query_params: &["verbose"],
    description: "Echoes the request body back.",
}];

fn build_diag_client(server: &TestServer) -> MessariClient {
    MessariClient::builder()
        .api_key("test_key")
        .base_url(server.uri())
        .registry(EndpointRegistry::from_table(TEST_ENDPOINTS))
        .build()
        .expect("client")
}

#[test]
fn test_post_sends_json_body() {
    let server = TestServer::start();
    let body = json!({"message": "ping"});

    server.mount(
        Mock::given(method("POST"))
            .and(path("/diag/alpha/echo"))
            .and(body_json(body.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"echo": "ping"}))),
    );

    let client = build_diag_client(&server);
    let params = CallParams::new().path("channel", "alpha").body(body);
    let data = client.call("diag.echo", &params).unwrap();
    assert_eq!(data, json!({"echo": "ping"}));
}

#[test]
fn test_extra_headers_are_forwarded() {
    let server = TestServer::start();

    server.mount(
        Mock::given(method("POST"))
            .and(path("/diag/alpha/echo"))
            .and(header("x-request-id", "abc-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({}))),
    );

    let client = build_diag_client(&server);
    let params = CallParams::new()
        .path("channel", "alpha")
        .header("x-request-id", "abc-123");
    client.call("diag.echo", &params).unwrap();
}
