//! Telecraft demo bot
//!
//! Long-polls the Bot API and serves a small user/account flow until Ctrl-C.

use std::sync::Arc;
use telecraft::{
    from_fn, handler_fn, BoxMiddleware, Config, Context, Dispatcher, InlineKeyboardButton,
    InlineKeyboardMarkup, Response, Router, TelegramClient,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telecraft=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    let router = Arc::new(build_router(&config)?);
    tracing::info!(
        backend = ?config.session_backend,
        session_ttl_secs = config.session_ttl.as_secs(),
        "Router ready"
    );

    let client = TelegramClient::new(&config.api_url, &config.token)?;
    let dispatcher = Dispatcher::new(router, Arc::new(client), &config);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
        tracing::info!("Shutdown requested");
        shutdown.cancel();
    });

    dispatcher.serve(cancel).await;
    Ok(())
}

fn build_router(config: &Config) -> telecraft::Result<Router> {
    let mut router = Router::new(config.default_route.clone(), config.session_backend.build())
        .with_session_ttl(config.session_ttl);
    router.set_global_middlewares(vec![log_event()]);

    router.register(
        &config.default_route,
        handler_fn(|ctx: Context| async move {
            let menu = InlineKeyboardMarkup::default()
                .row([InlineKeyboardButton::new("My profile", format!("/users/{}", ctx.user_id))])
                .row([InlineKeyboardButton::new(
                    "Create account",
                    format!("/users/{}/accounts", ctx.user_id),
                )]);
            Ok(Response::text(ctx.reply("What would you like to do?").with_keyboard(menu)).release())
        }),
        &[],
    )?;

    router.register(
        "users/:id",
        handler_fn(|ctx: Context| async move {
            let id = ctx.param("id").unwrap_or_default().to_string();
            Ok(Response::text(ctx.reply(format!("The user id is {id}"))).release())
        }),
        &[],
    )?;

    router.register(
        "users/:id/accounts",
        handler_fn(|ctx: Context| async move {
            let account = ctx.text().trim().to_string();
            Ok(Response::text(ctx.reply(format!("Account {account} is created")))
                .release()
                .redirect_root())
        }),
        &[account_prompt()],
    )?;

    router.validate()?;
    Ok(router)
}

/// Log every routed event before any other middleware runs
fn log_event() -> BoxMiddleware {
    from_fn(|ctx: Context, next| async move {
        tracing::info!(
            user_id = %ctx.user_id,
            kind = ?ctx.update.kind(),
            text = %ctx.text(),
            "Event"
        );
        next.run(ctx).await
    })
}

/// Ask for the account name first; the answer resumes the accounts route
fn account_prompt() -> BoxMiddleware {
    from_fn(|ctx: Context, next| async move {
        if ctx.data.contains_key("account") {
            return next.run(ctx).await;
        }
        let id = ctx.param("id").unwrap_or_default().to_string();
        Ok(Response::text(ctx.reply("Input your account:"))
            .resume_at(format!("users/{id}/accounts"))
            .with_data("account", ""))
    })
}
