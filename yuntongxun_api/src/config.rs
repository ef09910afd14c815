//! Endpoints, defaults and environment-driven client settings.

use std::time::Duration;

use crate::{AuthType, Error};

/// Sandbox endpoint, for testing before an application goes live.
pub const SANDBOX_BASE_URL: &str = "https://sandboxapp.cloopen.com:8883/2013-12-26";
/// Production endpoint.
pub const PRODUCTION_BASE_URL: &str = "https://app.cloopen.com:8883/2013-12-26";
/// Per-call timeout used when neither the client nor the request sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub const ENV_BASE_URL: &str = "YUNTONGXUN_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "YUNTONGXUN_TIMEOUT_SECS";
pub const ENV_AUTH_TYPE: &str = "YUNTONGXUN_AUTH_TYPE";

/// Where and how a [`Client`](crate::Client) sends its calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub auth_type: AuthType,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: SANDBOX_BASE_URL.to_string(),
            auth_type: AuthType::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn production() -> Self {
        Self {
            base_url: PRODUCTION_BASE_URL.to_string(),
            ..Self::default()
        }
    }

    /// Reads `YUNTONGXUN_BASE_URL`, `YUNTONGXUN_AUTH_TYPE` and
    /// `YUNTONGXUN_TIMEOUT_SECS`, falling back to the sandbox defaults.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`], with a caller-supplied variable lookup.
    ///
    /// An unparsable timeout falls back to [`DEFAULT_TIMEOUT`]; an unknown auth
    /// type is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let auth_type = match lookup(ENV_AUTH_TYPE) {
            Some(val) => val.trim().parse()?,
            None => defaults.auth_type,
        };
        let timeout = lookup(ENV_TIMEOUT_SECS)
            .and_then(|val| val.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        Ok(Self {
            base_url: lookup(ENV_BASE_URL).unwrap_or(defaults.base_url),
            auth_type,
            timeout,
        })
    }
}
