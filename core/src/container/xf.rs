//! XenForo core endpoints: index, users, nodes, forums, threads, posts, alerts.

use std::any::Any;
use std::sync::{Arc, Weak};

use serde_json::Value;

use super::Container;
use crate::client::{ClientState, RequestOptions};
use crate::error::{ApiError, Result};

/// Handle for the endpoints XenForo ships with.
///
/// Obtained from [`Client::xf`](crate::Client::xf). Each method is a single
/// request through the owning client. Paging arguments are sent as query
/// parameters and only reach the server when the client uses
/// [`QueryParamMode::Append`](crate::QueryParamMode::Append).
#[derive(Debug)]
pub struct XfContainer {
    client: Weak<ClientState>,
}

impl XfContainer {
    pub const NAME: &'static str = "xf";

    pub(crate) fn new(client: Weak<ClientState>) -> Self {
        Self { client }
    }

    fn send(&self, options: RequestOptions) -> Result<Value> {
        let client: Arc<ClientState> = self.client.upgrade().ok_or(ApiError::ClientDropped)?;
        client.send(&options)
    }

    /// Board information and API version.
    pub fn index(&self) -> Result<Value> {
        self.send(RequestOptions::get("index"))
    }

    /// The acting user. Requires an acting-user id on the client.
    pub fn me(&self) -> Result<Value> {
        self.send(RequestOptions::get("me"))
    }

    pub fn get_user(&self, user_id: u64) -> Result<Value> {
        self.send(RequestOptions::get(format!("users/{user_id}")))
    }

    pub fn list_users(&self, page: u32) -> Result<Value> {
        self.send(RequestOptions::get("users").param("page", page.to_string()))
    }

    pub fn list_nodes(&self) -> Result<Value> {
        self.send(RequestOptions::get("nodes"))
    }

    pub fn get_node(&self, node_id: u64) -> Result<Value> {
        self.send(RequestOptions::get(format!("nodes/{node_id}")))
    }

    pub fn get_forum(&self, forum_id: u64) -> Result<Value> {
        self.send(RequestOptions::get(format!("forums/{forum_id}")))
    }

    pub fn get_forum_threads(&self, forum_id: u64, page: u32) -> Result<Value> {
        self.send(
            RequestOptions::get(format!("forums/{forum_id}/threads")).param("page", page.to_string()),
        )
    }

    pub fn list_threads(&self, page: u32) -> Result<Value> {
        self.send(RequestOptions::get("threads").param("page", page.to_string()))
    }

    pub fn get_thread(&self, thread_id: u64, with_posts: bool) -> Result<Value> {
        let mut options = RequestOptions::get(format!("threads/{thread_id}"));
        if with_posts {
            options = options.param("with_posts", "1");
        }
        self.send(options)
    }

    /// Start a thread in `node_id` with `message` as its first post.
    pub fn create_thread(&self, node_id: u64, title: &str, message: &str) -> Result<Value> {
        self.send(
            RequestOptions::post("threads")
                .form("node_id", node_id.to_string())
                .form("title", title)
                .form("message", message),
        )
    }

    pub fn get_post(&self, post_id: u64) -> Result<Value> {
        self.send(RequestOptions::get(format!("posts/{post_id}")))
    }

    /// Reply to `thread_id`.
    pub fn create_post(&self, thread_id: u64, message: &str) -> Result<Value> {
        self.send(
            RequestOptions::post("posts")
                .form("thread_id", thread_id.to_string())
                .form("message", message),
        )
    }

    pub fn list_alerts(&self) -> Result<Value> {
        self.send(RequestOptions::get("alerts"))
    }
}

impl Container for XfContainer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
