//! Endpoint registry for the Messari REST API.
//!
//! Every supported route is described by an [`EndpointDescriptor`]: HTTP
//! method, path template, the path parameters the template expects, and the
//! allow-list of query parameters the route accepts. The descriptors are pure
//! data; [`EndpointRegistry`] wraps them in a lookup structure built once and
//! never mutated afterwards.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::MessariError;

/// HTTP methods used by registry entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub(crate) fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        write!(f, "{name}")
    }
}

/// Static description of one Messari API route.
///
/// Invariant: every `{placeholder}` in `path` has an entry in `path_params`
/// and vice versa.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointDescriptor {
    /// Unique dotted key, `resource.action` convention (e.g. `"assets.list"`)
    pub key: &'static str,
    /// HTTP method used for the request
    pub method: HttpMethod,
    /// URL path template with `{name}` placeholders
    pub path: &'static str,
    /// Names of the placeholders present in `path`
    pub path_params: &'static [&'static str],
    /// Allow-list of recognized query parameters (may be empty)
    pub query_params: &'static [&'static str],
    /// Human-readable description, documentation only
    pub description: &'static str,
}

impl EndpointDescriptor {
    /// Placeholder names in the order they appear in the path template.
    pub fn placeholders(&self) -> impl Iterator<Item = &'static str> {
        let mut rest = self.path;
        std::iter::from_fn(move || {
            let start = rest.find('{')?;
            let end = start + rest[start..].find('}')?;
            let name = &rest[start + 1..end];
            rest = &rest[end + 1..];
            Some(name)
        })
    }

    /// Whether `name` is on this endpoint's query-parameter allow-list.
    pub fn allows_query_param(&self, name: &str) -> bool {
        self.query_params.contains(&name)
    }
}

/// Every supported Messari route, in registration order.
///
/// Registration order is the listing order used by introspection tooling, so
/// new entries go at the end of their resource group.
pub static MESSARI_ENDPOINTS: &[EndpointDescriptor] = &[
    // Assets: market information for thousands of digital assets, including
    // price data, metadata, supply figures and coverage indicators.
    EndpointDescriptor {
        key: "assets.list",
        method: HttpMethod::Get,
        path: "/metrics/v2/assets",
        path_params: &[],
        query_params: &[
            "category",
            "sector",
            "search",
            "limit",
            "page",
            "hasDiligence",
            "hasIntel",
            "hasMarketData",
            "hasNews",
            "hasProposals",
            "hasResearch",
            "hasTokenUnlocks",
            "hasFundraising",
        ],
        description: "Paginated collection of assets with optional filters for category, sector, \
                      keyword search and data-coverage flags. Useful for discovery lists, \
                      scanners and filters.",
    },
    EndpointDescriptor {
        key: "assets.details",
        method: HttpMethod::Get,
        path: "/metrics/v2/assets/details",
        path_params: &[],
        query_params: &["assetIDs"],
        description: "Detailed information for up to 20 assets (comma-separated slugs or UUIDs), \
                      including pricing, metadata, supply figures and headline market metrics.",
    },
    // Exchanges: spot and derivatives exchange metadata with normalized
    // activity metrics.
    EndpointDescriptor {
        key: "exchanges.list",
        method: HttpMethod::Get,
        path: "/metrics/v1/exchanges",
        path_params: &[],
        query_params: &["limit", "pageSize", "page", "type", "typeRankCutoff"],
        description: "Paginated list of exchanges with optional filters for exchange type \
                      (centralized or decentralized) and 30-day ranking.",
    },
    EndpointDescriptor {
        key: "exchanges.get",
        method: HttpMethod::Get,
        path: "/metrics/v1/exchanges/{exchangeIdentifier}",
        path_params: &["exchangeIdentifier"],
        query_params: &[],
        description: "Single exchange by slug or unique identifier, with metadata and recent \
                      volume metrics.",
    },
    // News: aggregated crypto-focused news feed and source directory.
    EndpointDescriptor {
        key: "news.feed",
        method: HttpMethod::Get,
        path: "/news/v1/news/feed",
        path_params: &[],
        query_params: &[
            "publishedBefore",
            "publishedAfter",
            "sourceTypes",
            "sourceIds",
            "assetIds",
            "sort",
            "limit",
            "page",
        ],
        description: "Paginated crypto news feed with optional filters for publish window, \
                      source type, source IDs and tagged assets.",
    },
    EndpointDescriptor {
        key: "news.sources",
        method: HttpMethod::Get,
        path: "/news/v1/news/sources",
        path_params: &[],
        query_params: &["sourceName", "sourceTypes", "limit", "page"],
        description: "News sources available in the Messari news system, filterable by name \
                      substring and source type.",
    },
];

/// Immutable lookup over a table of [`EndpointDescriptor`]s.
///
/// Built once, typically at program start, and passed to the client; there is
/// no global registry singleton. Key order is preserved from the table so
/// listings stay deterministic.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    index: HashMap<&'static str, &'static EndpointDescriptor>,
    order: Vec<&'static str>,
}

impl EndpointRegistry {
    /// Build the registry over the built-in [`MESSARI_ENDPOINTS`] table.
    pub fn new() -> Self {
        Self::from_table(MESSARI_ENDPOINTS)
    }

    /// Build a registry over a custom descriptor table.
    ///
    /// Useful for tests and for callers that expose a subset of routes.
    pub fn from_table(table: &'static [EndpointDescriptor]) -> Self {
        let mut index = HashMap::with_capacity(table.len());
        let mut order = Vec::with_capacity(table.len());
        for descriptor in table {
            index.insert(descriptor.key, descriptor);
            order.push(descriptor.key);
        }
        Self { index, order }
    }

    /// Look up a descriptor by key.
    pub fn get(&self, key: &str) -> Result<&'static EndpointDescriptor, MessariError> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| MessariError::UnknownEndpoint {
                key: key.to_string(),
            })
    }

    /// Alias of [`get`](Self::get), named for introspection call sites.
    pub fn describe(&self, key: &str) -> Result<&'static EndpointDescriptor, MessariError> {
        self.get(key)
    }

    /// All registered keys, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the registry holds no endpoints.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}
