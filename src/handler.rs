//! Handler abstraction
//!
//! A handler turns a [`Context`] into a [`Response`] or a classified error.
//! Middleware wraps handlers; see [`middleware`].

pub mod middleware;

pub use middleware::{compose, from_fn, BoxMiddleware, Middleware, Next};

use crate::error::Result;
use crate::update::{OutgoingMessage, Update};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Per-event scratch state handed to handlers
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub update: Update,
    /// Session key of the sender
    pub user_id: String,
    /// Path parameters captured by the route trie
    pub params: HashMap<String, String>,
    /// Caller data and, when resuming, the data stored in the session
    pub data: HashMap<String, Value>,
}

impl Context {
    pub fn from_update(update: Update) -> Self {
        let user_id = update.user_id().unwrap_or_default();
        Self {
            update,
            user_id,
            params: HashMap::new(),
            data: HashMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Text of the inbound event (callback data or message text)
    pub fn text(&self) -> &str {
        self.update.text().unwrap_or_default()
    }

    /// Chat replies should go to. Zero when the event carries no chat.
    pub fn chat_id(&self) -> i64 {
        self.update.chat_id().unwrap_or_default()
    }

    /// Plain reply to the chat this event came from
    pub fn reply(&self, text: impl Into<String>) -> OutgoingMessage {
        OutgoingMessage::new(self.chat_id(), text)
    }
}

/// Handler output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub messages: Vec<OutgoingMessage>,
    /// Drop the user's session after this response
    pub release_session: bool,
    /// Follow up with the default route's messages
    pub redirect_to_root: bool,
    /// Route to resume at on the next free-text event
    pub path: String,
    /// Data to carry into the resumed handler
    pub data: HashMap<String, String>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-message response
    pub fn text(message: OutgoingMessage) -> Self {
        Self::new().with_message(message)
    }

    pub fn with_message(mut self, message: OutgoingMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn release(mut self) -> Self {
        self.release_session = true;
        self
    }

    pub fn redirect_root(mut self) -> Self {
        self.redirect_to_root = true;
        self
    }

    pub fn resume_at(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Whether this response asks for a session to be stored
    pub fn wants_resume(&self) -> bool {
        !self.path.is_empty() || !self.data.is_empty()
    }
}

/// Anything that can answer a routed event
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, ctx: Context) -> Result<Response>;
}

pub type BoxHandler = Arc<dyn Handler>;

#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
    async fn call(&self, ctx: Context) -> Result<Response> {
        (**self).call(ctx).await
    }
}

/// Handler backed by an async closure
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    async fn call(&self, ctx: Context) -> Result<Response> {
        (self.f)(ctx).await
    }
}

/// Turn an async closure into a [`BoxHandler`]
pub fn handler_fn<F, Fut>(f: F) -> BoxHandler
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    Arc::new(HandlerFn { f })
}
