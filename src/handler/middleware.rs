//! Middleware: functions from handler to handler
//!
//! The first middleware in a list is the outermost wrapper. It runs first and
//! alone decides whether the rest of the chain (and the handler) runs.

use super::{BoxHandler, Context, Handler, Response};
use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Decorator over a handler
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: BoxHandler) -> BoxHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxHandler) -> BoxHandler + Send + Sync,
{
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        self(next)
    }
}

pub type BoxMiddleware = Arc<dyn Middleware>;

/// Wrap `handler` so that `middlewares[0]` runs first
pub fn compose(handler: BoxHandler, middlewares: &[BoxMiddleware]) -> BoxHandler {
    middlewares
        .iter()
        .rev()
        .fold(handler, |next, middleware| middleware.wrap(next))
}

/// Continuation handed to [`from_fn`] middleware
#[derive(Clone)]
pub struct Next {
    inner: BoxHandler,
}

impl Next {
    pub async fn run(&self, ctx: Context) -> Result<Response> {
        self.inner.call(ctx).await
    }
}

struct FromFn<F> {
    f: Arc<F>,
    next: Next,
}

#[async_trait]
impl<F, Fut> Handler for FromFn<F>
where
    F: Fn(Context, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    async fn call(&self, ctx: Context) -> Result<Response> {
        (self.f)(ctx, self.next.clone()).await
    }
}

/// Middleware backed by an async closure taking the context and the rest of the chain
///
/// ```ignore
/// let auth = from_fn(|ctx, next| async move {
///     if ctx.user_id.is_empty() {
///         return Err(Error::forbidden("auth", "anonymous sender"));
///     }
///     next.run(ctx).await
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> BoxMiddleware
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |next: BoxHandler| -> BoxHandler {
        Arc::new(FromFn {
            f: Arc::clone(&f),
            next: Next { inner: next },
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::handler::handler_fn;
    use std::sync::Mutex;

    type Trace = Arc<Mutex<Vec<String>>>;

    fn tracing_middleware(name: &'static str, trace: &Trace) -> BoxMiddleware {
        let trace = Arc::clone(trace);
        from_fn(move |ctx, next| {
            let trace = Arc::clone(&trace);
            async move {
                trace.lock().unwrap().push(name.to_string());
                next.run(ctx).await
            }
        })
    }

    fn tracing_handler(trace: &Trace) -> BoxHandler {
        let trace = Arc::clone(trace);
        handler_fn(move |_ctx| {
            let trace = Arc::clone(&trace);
            async move {
                trace.lock().unwrap().push("handler".to_string());
                Ok(Response::new())
            }
        })
    }

    #[tokio::test]
    async fn test_first_middleware_is_outermost() {
        let trace: Trace = Arc::default();
        let handler = compose(
            tracing_handler(&trace),
            &[tracing_middleware("a", &trace), tracing_middleware("b", &trace)],
        );

        handler.call(Context::default()).await.unwrap();

        assert_eq!(*trace.lock().unwrap(), ["a", "b", "handler"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest_of_chain() {
        let trace: Trace = Arc::default();
        let deny = from_fn(|_ctx, _next| async move {
            Err::<Response, _>(Error::forbidden("test.deny", "stop here"))
        });
        let handler = compose(
            tracing_handler(&trace),
            &[tracing_middleware("a", &trace), deny, tracing_middleware("c", &trace)],
        );

        let err = handler.call(Context::default()).await.unwrap_err();

        assert_eq!(err.message(), "stop here");
        assert_eq!(*trace.lock().unwrap(), ["a"]);
    }

    #[tokio::test]
    async fn test_plain_closure_is_middleware() {
        let upper: BoxMiddleware = Arc::new(|next: BoxHandler| -> BoxHandler {
            handler_fn(move |mut ctx: Context| {
                let next = Arc::clone(&next);
                async move {
                    ctx.params.insert("seen".into(), "yes".into());
                    next.call(ctx).await
                }
            })
        });
        let inner = handler_fn(|ctx: Context| async move {
            Ok(Response::new().with_data("seen", ctx.param("seen").unwrap_or("no")))
        });

        let res = compose(inner, &[upper]).call(Context::default()).await.unwrap();

        assert_eq!(res.data.get("seen").map(String::as_str), Some("yes"));
    }

    #[tokio::test]
    async fn test_no_middlewares_is_identity() {
        let handler = handler_fn(|_ctx| async move { Ok(Response::new().resume_at("x")) });
        let res = compose(handler, &[]).call(Context::default()).await.unwrap();
        assert_eq!(res.path, "x");
    }
}
