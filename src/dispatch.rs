//! Dispatch front-end
//!
//! Polls the transport and sends whatever the router produced. Each active
//! user gets one worker task that routes that user's updates in arrival order,
//! so a conversation advances one step per event. Workers and sender-less
//! updates each take a slot of the admission gate.

#[cfg(test)]
mod testing;

use crate::config::Config;
use crate::handler::Context;
use crate::router::{Routed, Router};
use crate::transport::Transport;
use crate::update::{OutgoingMessage, Update};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Pause before polling again after a transport failure
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Per-user FIFO queues, each drained by a single worker task.
///
/// Only the poll loop pushes, and a worker only retires while holding the map
/// lock with its queue empty, so nothing pushed is ever stranded.
#[derive(Default)]
struct UserQueues {
    queues: Mutex<HashMap<String, mpsc::UnboundedSender<Update>>>,
}

impl UserQueues {
    /// Append to the user's running worker. Hands the update back when no
    /// worker is running.
    fn push(&self, user_id: &str, update: Update) -> Result<(), Update> {
        let queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        match queues.get(user_id) {
            Some(queue) => queue.send(update).map_err(|rejected| rejected.0),
            None => Err(update),
        }
    }

    /// Register a worker for `user_id`
    fn open(&self, user_id: &str) -> mpsc::UnboundedReceiver<Update> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id.to_string(), tx);
        rx
    }

    /// Next queued update, or `None` after retiring the worker
    fn next_or_close(
        &self,
        user_id: &str,
        queue: &mut mpsc::UnboundedReceiver<Update>,
    ) -> Option<Update> {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        match queue.try_recv() {
            Ok(update) => Some(update),
            Err(_) => {
                queues.remove(user_id);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Drives a [`Router`] from a [`Transport`]
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
    transport: Arc<dyn Transport>,
    admission: Arc<Semaphore>,
    queues: Arc<UserQueues>,
    poll_timeout: Duration,
    error_message: Option<String>,
}

impl Dispatcher {
    pub fn new(router: Arc<Router>, transport: Arc<dyn Transport>, config: &Config) -> Self {
        Self {
            router,
            transport,
            admission: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            queues: Arc::new(UserQueues::default()),
            poll_timeout: config.poll_timeout,
            error_message: config.error_message.clone(),
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Poll and dispatch until `cancel` fires, then wait for in-flight updates
    pub async fn serve(&self, cancel: CancellationToken) {
        tracing::info!(
            default_route = %self.router.default_route(),
            max_in_flight = self.admission.available_permits(),
            "Dispatcher started"
        );

        let mut offset = 0;
        let mut tasks = JoinSet::new();

        'poll: loop {
            let polled = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                polled = self.transport.poll(offset, self.poll_timeout) => polled,
            };

            let updates = match polled {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "Polling failed, retrying");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(POLL_RETRY_DELAY) => continue,
                    }
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);

                let user_id = update.user_id().unwrap_or_default();
                let update = if user_id.is_empty() {
                    update
                } else {
                    match self.queues.push(&user_id, update) {
                        Ok(()) => continue,
                        Err(update) => update,
                    }
                };

                // Admission gate: one slot per sender-less update or active user
                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break 'poll,
                    permit = Arc::clone(&self.admission).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break 'poll,
                    },
                };

                let this = self.clone();
                if user_id.is_empty() {
                    tasks.spawn(async move {
                        let _permit = permit;
                        this.handle_update(update).await;
                    });
                } else {
                    let queue = self.queues.open(&user_id);
                    tasks.spawn(async move {
                        let _permit = permit;
                        this.drain_user(&user_id, update, queue).await;
                    });
                }
            }

            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Dispatch task panicked");
                }
            }
        }

        tracing::info!(in_flight = tasks.len(), "Dispatcher stopping");
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Dispatch task panicked");
            }
        }
    }

    /// Handle `first` and then everything queued behind it for the same user
    async fn drain_user(
        &self,
        user_id: &str,
        first: Update,
        mut queue: mpsc::UnboundedReceiver<Update>,
    ) {
        let mut next = Some(first);
        while let Some(update) = next {
            self.handle_update(update).await;
            next = self.queues.next_or_close(user_id, &mut queue);
        }
    }

    /// Route one update and send the resulting messages.
    ///
    /// Ordering between updates of the same user is kept by [`serve`](Self::serve);
    /// direct callers are responsible for their own sequencing.
    pub async fn handle_update(&self, update: Update) -> Routed {
        let update_id = update.update_id;
        let chat_id = update.chat_id();
        let ctx = Context::from_update(update);
        let user_id = ctx.user_id.clone();

        let routed = self.router.route(ctx).await;

        if let Some(err) = &routed.error {
            tracing::warn!(
                update_id,
                user_id = %user_id,
                kind = %err.kind(),
                error = %err,
                "Routing reported an error"
            );
        }

        self.deliver(chat_id, &routed).await;
        routed
    }

    /// Send outgoing messages. Failures are logged and never touch session state.
    async fn deliver(&self, chat_id: Option<i64>, routed: &Routed) {
        for message in &routed.response.messages {
            self.send(message).await;
        }

        if routed.error.is_some() && routed.response.messages.is_empty() {
            if let (Some(text), Some(chat_id)) = (&self.error_message, chat_id) {
                self.send(&OutgoingMessage::new(chat_id, text.clone())).await;
            }
        }
    }

    async fn send(&self, message: &OutgoingMessage) {
        if let Err(e) = self.transport.send(message).await {
            tracing::error!(chat_id = message.chat_id, error = %e, "Failed to send message");
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("available_permits", &self.admission.available_permits())
            .field("poll_timeout", &self.poll_timeout)
            .finish_non_exhaustive()
    }
}
