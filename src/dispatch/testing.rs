//! Mock transport for dispatcher tests
//!
//! Serves queued batches in order and cancels the dispatcher once the queue
//! runs dry, so `serve` returns after everything queued has been handled.

use crate::transport::{Transport, TransportError};
use crate::update::{OutgoingMessage, Update};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct MockTransport {
    batches: Mutex<VecDeque<Result<Vec<Update>, TransportError>>>,
    cancel: CancellationToken,
    /// Messages passed to `send`, in call order
    pub sent: Mutex<Vec<OutgoingMessage>>,
    /// Offsets passed to `poll`, in call order
    pub offsets: Mutex<Vec<i64>>,
    fail_sends: bool,
}

impl MockTransport {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            batches: Mutex::new(VecDeque::new()),
            cancel,
            sent: Mutex::new(Vec::new()),
            offsets: Mutex::new(Vec::new()),
            fail_sends: false,
        }
    }

    /// Every `send` fails with an API error
    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn queue_batch(&self, updates: Vec<Update>) {
        self.batches.lock().unwrap().push_back(Ok(updates));
    }

    pub fn queue_error(&self, error: TransportError) {
        self.batches.lock().unwrap().push_back(Err(error));
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn recorded_offsets(&self) -> Vec<i64> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn poll(&self, offset: i64, _timeout: Duration) -> Result<Vec<Update>, TransportError> {
        self.offsets.lock().unwrap().push(offset);
        let next = self.batches.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            self.cancel.cancel();
            Ok(Vec::new())
        })
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail_sends {
            return Err(TransportError::Api {
                method: "sendMessage".to_string(),
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        Ok(())
    }
}

/// Text update with an explicit `update_id`
pub fn numbered(update_id: i64, user_id: i64, text: &str) -> Update {
    Update {
        update_id,
        ..Update::text_message(user_id, text)
    }
}
