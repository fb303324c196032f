//! Named, lazily created groups of API operations.
//!
//! # Design
//! A client exposes each container through a typed accessor (`Client::xf`)
//! that builds it on first use and caches it for the client's lifetime. Name
//! based access goes through the static [`REGISTRY`] table, so the set of
//! reachable containers is fixed at compile time.

mod xf;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::client::Client;
use crate::error::{ApiError, Result};

pub use xf::XfContainer;

/// A group of API operations bound to the client that created it.
pub trait Container: Any + fmt::Debug + Send + Sync {
    /// Registry name, e.g. `"xf"`.
    fn name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

pub type Accessor = fn(&Client) -> Arc<dyn Container>;

/// Every container reachable by name, paired with its cached accessor.
pub const REGISTRY: &[(&str, Accessor)] = &[(XfContainer::NAME, xf_accessor as Accessor)];

fn xf_accessor(client: &Client) -> Arc<dyn Container> {
    client.xf()
}

pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

pub(crate) fn resolve(client: &Client, name: &str) -> Result<Arc<dyn Container>> {
    REGISTRY
        .iter()
        .find(|(registered, _)| registered.eq_ignore_ascii_case(name))
        .map(|(_, accessor)| accessor(client))
        .ok_or_else(|| ApiError::UnknownContainer(name.to_string()))
}
