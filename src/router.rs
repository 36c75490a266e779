//! Router: path lookup, session resumption and session bookkeeping
//!
//! Each event goes through:
//! 1. classification (callback data or message text)
//! 2. explicit navigation (`/path`, clears the user's session) or resumption
//!    from the user's stored session
//! 3. fallback to the default route when nothing matched
//! 4. invocation of the middleware-wrapped handler; a failing handler is
//!    replaced by the default route and its error is surfaced alongside
//! 5. bookkeeping: release, persist or leave the session untouched
//!
//! Routes and middlewares are registered before serving starts. The trie is
//! read-only afterwards, so dispatch needs no locking beyond the session store.

use crate::error::{Error, Result};
use crate::handler::{compose, BoxHandler, BoxMiddleware, Context, Handler, Response};
use crate::session::{Session, SessionStore, DEFAULT_SESSION_TTL};
use crate::tree::{RouteMatch, RouteTree};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Prefix that marks an event as explicit navigation
pub const PATH_SIGIL: char = '/';

/// Outcome of routing one event
///
/// `response` is always usable: on handler failure it holds the default
/// route's output. `error` carries the original handler failure.
#[derive(Debug, Default)]
pub struct Routed {
    pub response: Response,
    pub error: Option<Error>,
}

pub struct Router {
    tree: RouteTree,
    default_route: String,
    global_middlewares: Vec<BoxMiddleware>,
    store: Arc<dyn SessionStore>,
    session_ttl: Duration,
}

impl Router {
    pub fn new(default_route: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            tree: RouteTree::new(),
            default_route: default_route.into(),
            global_middlewares: Vec::new(),
            store,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    /// Lifetime given to sessions persisted after a handler asks to resume
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Replace the global middleware set.
    ///
    /// Global middlewares are composed at registration time, so only routes
    /// registered after this call are wrapped by them.
    pub fn set_global_middlewares(&mut self, middlewares: Vec<BoxMiddleware>) {
        self.global_middlewares = middlewares;
    }

    /// Register `handler` under `path`, wrapped by `middlewares` and then by
    /// the global middlewares (which therefore run first).
    ///
    /// A duplicate route is a configuration error; callers are expected to
    /// abort startup on it.
    pub fn register(
        &mut self,
        path: &str,
        handler: BoxHandler,
        middlewares: &[BoxMiddleware],
    ) -> Result<()> {
        let handler = compose(compose(handler, middlewares), &self.global_middlewares);
        self.tree.insert(path, handler)?;
        tracing::debug!(route = %path, middlewares = middlewares.len(), "Registered route");
        Ok(())
    }

    /// Whether `path` is registered exactly (parameter names included)
    pub fn has_route(&self, path: &str) -> bool {
        self.tree.contains(path)
    }

    /// Check that the default route resolves. Run once after registration.
    pub fn validate(&self) -> Result<()> {
        if self.tree.find_path(&self.default_route).is_none() {
            return Err(self.missing_default());
        }
        Ok(())
    }

    pub fn default_route(&self) -> &str {
        &self.default_route
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Route one event
    pub async fn route(&self, mut ctx: Context) -> Routed {
        let user_id = ctx.user_id.clone();
        let text = ctx.text().to_string();

        let found = match text.strip_prefix(PATH_SIGIL) {
            Some(path) => {
                self.release(&user_id).await;
                self.tree.find_path(path)
            }
            None => self.resume(&mut ctx).await,
        };

        let default_handler = self
            .tree
            .find_path(&self.default_route)
            .map(|found| found.handler);
        let Some(RouteMatch { handler, params }) =
            found.or_else(|| self.tree.find_path(&self.default_route))
        else {
            tracing::error!(route = %self.default_route, "Default route is not registered");
            return Routed {
                response: Response::default(),
                error: Some(self.missing_default()),
            };
        };
        // Same trie slot as the default route, however it was reached
        let at_default = default_handler.is_some_and(|default| std::ptr::eq(default, handler));

        ctx.params = params;
        let (mut response, error) = match handler.call(ctx.clone()).await {
            Ok(response) => (response, None),
            Err(err) => {
                tracing::warn!(
                    user_id = %user_id,
                    text = %text,
                    kind = %err.kind(),
                    error = %err,
                    "Handler failed, falling back to default route"
                );
                let fallback = if at_default {
                    Response::default()
                } else {
                    self.call_default(ctx.clone()).await.unwrap_or_else(|root_err| {
                        tracing::warn!(error = %root_err, "Default route failed during fallback");
                        Response::default()
                    })
                };
                (fallback, Some(err))
            }
        };

        self.bookkeeping(&user_id, &response).await;

        if response.redirect_to_root && !at_default {
            match self.call_default(ctx).await {
                Ok(root) => response.messages.extend(root.messages),
                Err(err) => tracing::warn!(error = %err, "Redirect to default route failed"),
            }
        }

        Routed { response, error }
    }

    /// Resolve the user's stored session and load it into `ctx`.
    ///
    /// A missing session is logged and reported as no match, so the caller
    /// falls back to the default route without surfacing an error.
    async fn resume(&self, ctx: &mut Context) -> Option<RouteMatch<'_>> {
        let Some(session) = self.store.get(&ctx.user_id).await else {
            let miss = Error::not_found("router.resume", "no live session for free-text input");
            tracing::debug!(user_id = %ctx.user_id, error = %miss, "Resume miss");
            return None;
        };

        let Some(found) = self.tree.find_path(&session.path) else {
            tracing::warn!(
                user_id = %ctx.user_id,
                path = %session.path,
                "Stored session points at an unknown route, releasing it"
            );
            self.release(&ctx.user_id).await;
            return None;
        };

        tracing::debug!(user_id = %ctx.user_id, path = %session.path, "Resuming session");
        for (key, value) in session.data {
            ctx.data.entry(key).or_insert(Value::String(value));
        }
        Some(found)
    }

    async fn call_default(&self, mut ctx: Context) -> Result<Response> {
        let found = self
            .tree
            .find_path(&self.default_route)
            .ok_or_else(|| self.missing_default())?;
        ctx.params = found.params;
        found.handler.call(ctx).await
    }

    fn missing_default(&self) -> Error {
        Error::not_found(
            "router.default",
            format!("default route {:?} is not registered", self.default_route),
        )
    }

    /// Release, persist or leave the session according to `response`
    async fn bookkeeping(&self, user_id: &str, response: &Response) {
        if response.release_session {
            self.release(user_id).await;
        } else if response.wants_resume() {
            if user_id.is_empty() {
                tracing::debug!(path = %response.path, "Event has no sender, not persisting session");
                return;
            }
            let session = Session::new(&response.path, response.data.clone(), self.session_ttl);
            if let Err(e) = self.store.set(user_id, session).await {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to persist session");
            }
        }
    }

    async fn release(&self, user_id: &str) {
        if let Err(e) = self.store.delete(user_id).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to release session");
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("default_route", &self.default_route)
            .field("routes", &self.tree.len())
            .field("global_middlewares", &self.global_middlewares.len())
            .field("session_ttl", &self.session_ttl)
            .finish_non_exhaustive()
    }
}
