//! Chat transport abstraction
//!
//! The dispatcher only needs two operations from the chat platform: fetch the
//! next batch of updates and send a message.

mod telegram;

pub use telegram::TelegramClient;

use crate::update::{OutgoingMessage, Update};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} rejected by the API: {description}")]
    Api { method: String, description: String },

    #[error("Malformed API response: {0}")]
    Decode(String),
}

/// Source of updates and sink for outgoing messages
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch updates with `update_id >= offset`, waiting up to `timeout`
    async fn poll(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, TransportError>;

    async fn send(&self, message: &OutgoingMessage) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn poll(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, TransportError> {
        (**self).poll(offset, timeout).await
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        (**self).send(message).await
    }
}
