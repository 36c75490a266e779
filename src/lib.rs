//! Telecraft - path-routed conversational bots
//!
//! Inbound chat events are routed through a trie of `/`-delimited paths to
//! middleware-wrapped handlers. Multi-step interactions are carried across
//! events by short-lived per-user sessions.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod router;
pub mod session;
pub mod transport;
pub mod tree;
pub mod update;

pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{Error, ErrorKind, Result};
pub use handler::{
    compose, from_fn, handler_fn, BoxHandler, BoxMiddleware, Context, Handler, Middleware, Next,
    Response,
};
pub use router::{Routed, Router};
pub use session::{MemoryStore, Session, SessionBackend, SessionStore};
pub use transport::{TelegramClient, Transport, TransportError};
pub use update::{InlineKeyboardButton, InlineKeyboardMarkup, OutgoingMessage, Update};
