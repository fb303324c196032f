//! Authenticated request pipeline for the XenForo REST API.
//!
//! # Design
//! Every call goes through one pipeline: [`RequestOptions`] are turned into an
//! [`HttpRequest`] by `build_request`, the injected [`Transport`] executes it,
//! and `parse_response` maps the [`HttpResponse`] to a JSON value or an
//! [`ApiError`]. The build and parse halves are public and free of I/O.
//!
//! Configuration and transport sit in a shared `ClientState` behind an `Arc`.
//! Containers hold a `Weak` to that state, so they can issue requests without
//! keeping the client alive.

use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::config::{ClientConfig, QueryParamMode};
use crate::container::{self, Container, XfContainer};
use crate::error::{ApiError, Result};
use crate::http::{find_header, set_header, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};

pub const HEADER_API_KEY: &str = "XF-Api-Key";
pub const HEADER_API_USER: &str = "XF-Api-User";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// One API call as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub endpoint: String,
    pub query_params: Vec<(String, String)>,
    pub form_data: Vec<(String, String)>,
    pub extra_headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new(method: impl Into<HttpMethod>, endpoint: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            endpoint: endpoint.into(),
            query_params: Vec::new(),
            form_data: Vec::new(),
            extra_headers: Vec::new(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, endpoint)
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    pub fn form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_data.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }
}

/// Synchronous XenForo API client.
///
/// Holds credentials and a transport, builds authenticated requests, and
/// hands out lazily created containers that group related endpoints.
pub struct Client {
    state: Arc<ClientState>,
    xf: OnceLock<Arc<XfContainer>>,
}

impl Client {
    /// Library version reported in the `User-Agent` header.
    pub const LIBRARY_VERSION: &'static str = env!("CARGO_PKG_VERSION");

    /// Client using the default [`UreqTransport`].
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }

    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(transport);
        Self {
            state: Arc::new(ClientState {
                config: RwLock::new(config),
                transport: RwLock::new(transport),
            }),
            xf: OnceLock::new(),
        }
    }

    /// Shorthand for [`ClientConfig::new`] plus an optional acting user.
    pub fn from_credentials(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        acting_user_id: Option<&str>,
    ) -> Result<Self> {
        let mut config = ClientConfig::new(base_url, api_key)?;
        if let Some(user_id) = acting_user_id {
            config = config.with_acting_user(user_id);
        }
        Ok(Self::new(config))
    }

    pub fn user_agent() -> &'static str {
        USER_AGENT
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> ClientConfig {
        self.state.config().clone()
    }

    pub fn base_url(&self) -> String {
        self.state.config().base_url.clone()
    }

    pub fn set_base_url(&self, base_url: impl Into<String>) {
        self.state.config_mut().base_url = base_url.into();
    }

    pub fn api_key(&self) -> String {
        self.state.config().api_key.clone()
    }

    pub fn set_api_key(&self, api_key: impl Into<String>) {
        self.state.config_mut().api_key = api_key.into();
    }

    pub fn acting_user_id(&self) -> Option<String> {
        self.state.config().acting_user_id.clone()
    }

    pub fn set_acting_user_id(&self, user_id: Option<String>) {
        self.state.config_mut().acting_user_id = user_id;
    }

    pub fn query_param_mode(&self) -> QueryParamMode {
        self.state.config().query_params
    }

    pub fn set_query_param_mode(&self, mode: QueryParamMode) {
        self.state.config_mut().query_params = mode;
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.state.transport()
    }

    pub fn set_transport(&self, transport: impl Transport + 'static) {
        let transport: Arc<dyn Transport> = Arc::new(transport);
        *self
            .state
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner) = transport;
    }

    // -----------------------------------------------------------------------
    // URLs
    // -----------------------------------------------------------------------

    /// Base URL joined with `endpoint`, adding a leading `/` when missing.
    ///
    /// `params` are accepted and ignored; see [`Client::get_full_url_with_query`].
    pub fn get_full_url(&self, endpoint: &str, _params: &[(&str, &str)]) -> String {
        full_url(&self.state.config().base_url, endpoint)
    }

    /// Like [`Client::get_full_url`], but serializes `params` into the query
    /// string.
    pub fn get_full_url_with_query(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        full_url_with_query(&self.state.config().base_url, endpoint, params)
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    pub fn request_get(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Value> {
        self.request("GET", endpoint, params, &[], headers)
    }

    pub fn request_post(
        &self,
        endpoint: &str,
        data: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Value> {
        self.request("POST", endpoint, &[], data, headers)
    }

    /// Send `method endpoint` and decode a 200 response as JSON.
    ///
    /// `data` is only sent for POST. Any status other than 200 fails with
    /// [`ApiError::Http`]; transport faults fail with [`ApiError::Transport`].
    pub fn request(
        &self,
        method: &str,
        endpoint: &str,
        params: &[(&str, &str)],
        data: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Value> {
        self.send(RequestOptions {
            method: HttpMethod::from(method),
            endpoint: endpoint.to_string(),
            query_params: owned_pairs(params),
            form_data: owned_pairs(data),
            extra_headers: owned_pairs(headers),
        })
    }

    pub fn send(&self, options: RequestOptions) -> Result<Value> {
        self.state.send(&options)
    }

    pub fn build_request(&self, options: &RequestOptions) -> HttpRequest {
        self.state.build_request(options)
    }

    pub fn parse_response(&self, response: HttpResponse) -> Result<Value> {
        parse_response(response)
    }

    // -----------------------------------------------------------------------
    // Containers
    // -----------------------------------------------------------------------

    /// The XenForo core container, created on first use.
    pub fn xf(&self) -> Arc<XfContainer> {
        self.xf
            .get_or_init(|| {
                debug!(container = XfContainer::NAME, "creating container");
                Arc::new(XfContainer::new(Arc::downgrade(&self.state)))
            })
            .clone()
    }

    /// Look up a container by name (ASCII case-insensitive).
    pub fn container(&self, name: &str) -> Result<Arc<dyn Container>> {
        container::resolve(self, name)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.state.config();
        f.debug_struct("Client")
            .field("base_url", &config.base_url)
            .field("acting_user_id", &config.acting_user_id)
            .field("query_params", &config.query_params)
            .finish_non_exhaustive()
    }
}

/// State shared between a client and the containers it created.
pub(crate) struct ClientState {
    config: RwLock<ClientConfig>,
    transport: RwLock<Arc<dyn Transport>>,
}

impl ClientState {
    fn config(&self) -> RwLockReadGuard<'_, ClientConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn config_mut(&self) -> RwLockWriteGuard<'_, ClientConfig> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn transport(&self) -> Arc<dyn Transport> {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn build_request(&self, options: &RequestOptions) -> HttpRequest {
        let config = self.config();

        let url = match config.query_params {
            QueryParamMode::Ignore => full_url(&config.base_url, &options.endpoint),
            QueryParamMode::Append => {
                let params: Vec<(&str, &str)> = options
                    .query_params
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                full_url_with_query(&config.base_url, &options.endpoint, &params)
            }
        };

        // Caller headers first; mandatory headers overwrite same-named ones.
        let mut headers = options.extra_headers.clone();
        set_header(&mut headers, HEADER_API_KEY, &config.api_key);
        set_header(&mut headers, "User-Agent", USER_AGENT);
        set_header(&mut headers, "Accept-Charset", "utf-8");
        if let Some(user_id) = config.acting_user_id.as_deref().filter(|id| !id.is_empty()) {
            set_header(&mut headers, HEADER_API_USER, user_id);
        }
        if find_header(&headers, "Accept").is_none() {
            headers.push(("Accept".to_string(), "application/json".to_string()));
        }

        let body = if options.method.sends_form_body() {
            set_header(&mut headers, "Content-Type", FORM_CONTENT_TYPE);
            Some(
                form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(&options.form_data)
                    .finish(),
            )
        } else {
            None
        };

        HttpRequest {
            method: options.method.clone(),
            url,
            headers,
            body,
        }
    }

    pub(crate) fn send(&self, options: &RequestOptions) -> Result<Value> {
        let request = self.build_request(options);
        debug!(method = %request.method, url = %request.url, "sending API request");

        // Clone the transport out so no lock is held across I/O.
        let transport = self.transport();
        let response = transport.execute(&request).map_err(|err| {
            warn!(method = %request.method, url = %request.url, error = %err, "transport fault");
            ApiError::from(err)
        })?;

        if response.status != 200 {
            warn!(method = %request.method, url = %request.url, status = response.status, "API request failed");
        }
        parse_response(response)
    }
}

// `XFAPI_RUSTC_VERSION` is the building compiler's version, exported by `build.rs`.
const USER_AGENT: &str = concat!(
    "xfapi-rust/",
    env!("CARGO_PKG_VERSION"),
    " (Rust ",
    env!("XFAPI_RUSTC_VERSION"),
    ")"
);

/// Map a response to a decoded body. Only 200 is success.
fn parse_response(response: HttpResponse) -> Result<Value> {
    // TODO: decode XenForo's `errors` payload into per-status variants.
    if response.status != 200 {
        return Err(ApiError::Http {
            status: response.status,
            body: response.body,
        });
    }
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&response.body)?)
}

fn full_url(base_url: &str, endpoint: &str) -> String {
    if endpoint.starts_with('/') {
        format!("{base_url}{endpoint}")
    } else {
        format!("{base_url}/{endpoint}")
    }
}

fn full_url_with_query(base_url: &str, endpoint: &str, params: &[(&str, &str)]) -> String {
    let url = full_url(base_url, endpoint);
    if params.is_empty() {
        return url;
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

fn owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
