//! # Messari API Client
//!
//! A Rust client library for the Messari cryptocurrency data REST API, plus a
//! small CLI playground (`messari`) for exploring it.
//!
//! ## Features
//!
//! - Declarative endpoint registry: every route described once as data
//! - Generic dispatch: `call("assets.list", ...)` for any registered route
//! - Typed errors for configuration, auth, rate-limit and transport failures
//! - JSON pass-through: responses are returned undecoded beyond top-level parsing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use messari_api_client::{CallParams, MessariClient};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads the key from MESSARI_API_KEY.
//!     let client = MessariClient::new()?;
//!
//!     let params = CallParams::new()
//!         .query("search", "ai")
//!         .query("limit", 50)
//!         .query("hasMarketData", true);
//!     let assets = client.call("assets.list", &params)?;
//!     println!("{}", messari_api_client::pretty(&assets));
//!     Ok(())
//! }
//! ```
//!
//! Endpoints with path parameters take them through the same parameter set:
//!
//! ```rust,no_run
//! use messari_api_client::{CallParams, MessariClient};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MessariClient::builder().api_key("my_key").build()?;
//!     let params = CallParams::new().path("exchangeIdentifier", "binance");
//!     let exchange = client.call("exchanges.get", &params)?;
//!     println!("{exchange}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod registry;

// Re-export commonly used types at crate root
pub use client::{
    CallParams, MESSARI_API_KEY_ENV, MESSARI_BASE_URL, MessariClient, MessariClientBuilder, pretty,
};
pub use error::{ApiErrorKind, ApiFailure, MessariError};
pub use registry::{EndpointDescriptor, EndpointRegistry, HttpMethod, MESSARI_ENDPOINTS};

/// Result type alias using MessariError
pub type Result<T> = std::result::Result<T, MessariError>;
