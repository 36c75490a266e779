//! Classified errors shared by the router, the trie and session stores

use std::fmt;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error with a classification and the scope that raised it
#[derive(Debug, Error)]
#[error("{scope}: {message}")]
pub struct Error {
    kind: ErrorKind,
    scope: String,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl Error {
    pub fn new(kind: ErrorKind, scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            scope: scope.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a foreign error. Its kind is `Unexpected` unless it is itself
    /// an [`Error`], in which case the inner classification is kept.
    pub fn wrap(scope: impl Into<String>, err: impl Into<BoxError>) -> Self {
        let err = err.into();
        Self {
            kind: ErrorKind::Unexpected,
            scope: scope.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    pub fn unexpected(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, scope, message)
    }

    pub fn forbidden(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, scope, message)
    }

    pub fn bad_request(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, scope, message)
    }

    pub fn not_found(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, scope, message)
    }

    pub fn duplicate(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Duplicate, scope, message)
    }

    /// Classification of this error, looking through wrapped crate errors
    pub fn kind(&self) -> ErrorKind {
        if self.kind != ErrorKind::Unexpected {
            return self.kind;
        }
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<Error>())
            .map_or(self.kind, Error::kind)
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Message without the scope prefix
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Anything not classified more precisely
    Unexpected,
    /// Caller is not allowed to perform the operation
    Forbidden,
    /// Input was malformed or failed validation
    BadRequest,
    /// Requested entity (route, session, backend) does not exist
    NotFound,
    /// Entity already exists (e.g. a route registered twice)
    Duplicate,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unexpected => "unexpected",
            Self::Forbidden => "forbidden",
            Self::BadRequest => "bad request",
            Self::NotFound => "not found",
            Self::Duplicate => "duplicate",
        };
        f.write_str(name)
    }
}
