//! Synchronous client for the XenForo REST API.
//!
//! # Overview
//! [`Client`] owns the API URL, the API key, an optional acting user, and an
//! injected [`Transport`]. It adds the authentication headers to every call,
//! sends it, and returns the decoded JSON body as a [`serde_json::Value`].
//! Any status other than 200 and any transport fault becomes an [`ApiError`].
//!
//! # Design
//! - Request building and response parsing are plain functions over
//!   [`HttpRequest`] / [`HttpResponse`], so the pipeline is testable without
//!   a network.
//! - Endpoint groups live in containers ([`XfContainer`]) that the client
//!   creates on first access and caches. Name lookup goes through the static
//!   [`container::REGISTRY`].
//! - `params` are not added to the URL unless [`QueryParamMode::Append`] is
//!   configured.
//!
//! ```no_run
//! use xfapi_core::{Client, ClientConfig};
//!
//! let config = ClientConfig::new("https://forum.example/api", "api-key")?
//!     .with_acting_user("1");
//! let client = Client::new(config);
//! let thread = client.xf().get_thread(42, false)?;
//! println!("{}", thread["thread"]["title"]);
//! # Ok::<(), xfapi_core::ApiError>(())
//! ```

pub mod client;
pub mod config;
pub mod container;
pub mod error;
pub mod http;
pub mod transport;

pub use client::{Client, RequestOptions, HEADER_API_KEY, HEADER_API_USER};
pub use config::{ClientConfig, QueryParamMode};
pub use container::{Container, XfContainer};
pub use error::{ApiError, Result, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
