//! Process configuration

use crate::error::{Error, Result};
use crate::session::{SessionBackend, DEFAULT_SESSION_TTL};
use std::time::Duration;

const DEFAULT_ROUTE: &str = "root";
const DEFAULT_MAX_IN_FLIGHT: usize = 64;
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Settings for the bot process
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot API token
    pub token: String,
    /// Route invoked when nothing else matches
    pub default_route: String,
    pub session_backend: SessionBackend,
    pub session_ttl: Duration,
    /// Upper bound on concurrently dispatched updates
    pub max_in_flight: usize,
    /// Long-poll timeout for `getUpdates`
    pub poll_timeout: Duration,
    pub api_url: String,
    /// Sent when routing failed and produced nothing to show
    pub error_message: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: String::new(),
            default_route: DEFAULT_ROUTE.to_string(),
            session_backend: SessionBackend::Memory,
            session_ttl: DEFAULT_SESSION_TTL,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            api_url: DEFAULT_API_URL.to_string(),
            error_message: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unknown backends are an error;
    /// unparseable numbers fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let secs = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        };

        let session_backend = match lookup("TELECRAFT_SESSION_BACKEND") {
            Some(name) => SessionBackend::parse(&name)?,
            None => defaults.session_backend,
        };

        Ok(Self {
            token: lookup("TELECRAFT_TOKEN").unwrap_or_default(),
            default_route: lookup("TELECRAFT_DEFAULT_ROUTE").unwrap_or(defaults.default_route),
            session_backend,
            session_ttl: secs("TELECRAFT_SESSION_TTL_SECS").unwrap_or(defaults.session_ttl),
            max_in_flight: lookup("TELECRAFT_MAX_IN_FLIGHT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_in_flight),
            poll_timeout: secs("TELECRAFT_POLL_TIMEOUT_SECS").unwrap_or(defaults.poll_timeout),
            api_url: lookup("TELECRAFT_API_URL").unwrap_or(defaults.api_url),
            error_message: lookup("TELECRAFT_ERROR_MESSAGE").filter(|m| !m.is_empty()),
        })
    }

    /// Reject settings the dispatcher cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(Error::bad_request("config", "TELECRAFT_TOKEN is not set"));
        }
        if self.max_in_flight == 0 {
            return Err(Error::bad_request(
                "config",
                "TELECRAFT_MAX_IN_FLIGHT must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.default_route, "root");
        assert_eq!(config.session_ttl, Duration::from_secs(120));
        assert_eq!(config.max_in_flight, 64);
        assert_eq!(config.session_backend, SessionBackend::Memory);
        assert!(config.error_message.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("TELECRAFT_TOKEN", "123:abc"),
            ("TELECRAFT_DEFAULT_ROUTE", "start"),
            ("TELECRAFT_SESSION_BACKEND", "cache"),
            ("TELECRAFT_SESSION_TTL_SECS", "30"),
            ("TELECRAFT_MAX_IN_FLIGHT", "4"),
            ("TELECRAFT_ERROR_MESSAGE", "Something went wrong"),
        ]))
        .unwrap();

        assert_eq!(config.token, "123:abc");
        assert_eq!(config.default_route, "start");
        assert_eq!(config.session_ttl, Duration::from_secs(30));
        assert_eq!(config.max_in_flight, 4);
        assert_eq!(config.error_message.as_deref(), Some("Something went wrong"));
        config.validate().unwrap();
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("TELECRAFT_SESSION_TTL_SECS", "soon"),
            ("TELECRAFT_MAX_IN_FLIGHT", "-1"),
        ]))
        .unwrap();
        assert_eq!(config.session_ttl, DEFAULT_SESSION_TTL);
        assert_eq!(config.max_in_flight, 64);
    }

    #[test]
    fn test_unknown_backend_is_fatal() {
        let err = Config::from_lookup(lookup(&[("TELECRAFT_SESSION_BACKEND", "redis")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_validate() {
        let err = Config::default().validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let config = Config {
            token: "t".into(),
            max_in_flight: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
