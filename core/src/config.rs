//! Client credentials and request-shaping options.

use crate::error::{ApiError, Result};

/// How `params` passed to a request reach the URL.
///
/// The historical behaviour of this client accepts query parameters but never
/// serializes them, so `Ignore` stays the default. `Append` is the fixed
/// behaviour and must be opted into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryParamMode {
    #[default]
    Ignore,
    Append,
}

/// Connection settings for a XenForo API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) acting_user_id: Option<String>,
    pub(crate) query_params: QueryParamMode,
}

impl ClientConfig {
    /// Fails when `base_url` or `api_key` is empty. The URL is otherwise
    /// taken verbatim.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let api_key = api_key.into();
        if base_url.is_empty() {
            return Err(ApiError::Config("base URL must not be empty"));
        }
        if api_key.is_empty() {
            return Err(ApiError::Config("API key must not be empty"));
        }
        Ok(Self {
            base_url,
            api_key,
            acting_user_id: None,
            query_params: QueryParamMode::default(),
        })
    }

    /// Attribute calls to this user via the `XF-Api-User` header.
    pub fn with_acting_user(mut self, user_id: impl Into<String>) -> Self {
        self.acting_user_id = Some(user_id.into());
        self
    }

    pub fn with_query_params(mut self, mode: QueryParamMode) -> Self {
        self.query_params = mode;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn acting_user_id(&self) -> Option<&str> {
        self.acting_user_id.as_deref()
    }

    pub fn query_params(&self) -> QueryParamMode {
        self.query_params
    }
}
