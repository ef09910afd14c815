//! Account authentication: the `sig` query parameter and the `Authorization` header.
//!
//! Every call carries an upper-case MD5 digest of `account_sid + auth_token + timestamp`
//! as `sig`, and `base64(account_sid:timestamp)` as the `Authorization` header. The
//! platform accepts a timestamp for 24 hours after it was generated.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Local, NaiveDateTime};
use md5::{Digest, Md5};

use crate::Error;

/// Timestamp layout expected by the platform (`yyyyMMddHHmmss`).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Environment variable holding the account (or sub-account) SID.
pub const ENV_ACCOUNT_SID: &str = "YUNTONGXUN_ACCOUNT_SID";
/// Environment variable holding the auth token paired with the SID.
pub const ENV_AUTH_TOKEN: &str = "YUNTONGXUN_AUTH_TOKEN";

/// Source of the wall-clock time used to stamp signatures.
pub trait Clock: Send + Sync {
    /// Current local time.
    fn now(&self) -> NaiveDateTime;
}

/// Reads the local system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant. Used to make signatures reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Account SID and auth token. The token never leaves the process; it only
/// feeds the signature digest.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    account_sid: String,
    auth_token: String,
}

impl Credential {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Reads `YUNTONGXUN_ACCOUNT_SID` and `YUNTONGXUN_AUTH_TOKEN`.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Credential::from_env`], with a caller-supplied variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|val| !val.trim().is_empty())
                .ok_or_else(|| Error::InvalidRequest(format!("{} is not set", key)))
        };
        Ok(Self::new(required(ENV_ACCOUNT_SID)?, required(ENV_AUTH_TOKEN)?))
    }

    pub fn account_sid(&self) -> &str {
        &self.account_sid
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

/// Per-request authentication material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Value for the `Authorization` header.
    pub auth_header: String,
    /// Value for the `sig` query parameter.
    pub signature: String,
    /// The `yyyyMMddHHmmss` timestamp both values were derived from.
    pub timestamp: String,
}

/// Builds the signature for `account_sid`/`auth_token` stamped with the system clock.
pub fn build_auth(account_sid: &str, auth_token: &str) -> Signature {
    build_auth_with(account_sid, auth_token, &SystemClock)
}

/// Builds the signature stamped with the time reported by `clock`.
pub fn build_auth_with(account_sid: &str, auth_token: &str, clock: &dyn Clock) -> Signature {
    let timestamp = clock.now().format(TIMESTAMP_FORMAT).to_string();
    let digest = Md5::digest(format!("{}{}{}", account_sid, auth_token, timestamp).as_bytes());
    let auth_header = STANDARD.encode(format!("{}:{}", account_sid, timestamp));
    Signature {
        auth_header,
        signature: hex::encode_upper(digest),
        timestamp,
    }
}
