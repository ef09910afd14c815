//! Request descriptor: authentication level, target function, parameters and payload.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value as JsonValue;
use url::Url;

use crate::xml::Element;
use crate::Error;

pub const ACCEPT_JSON: &str = "application/json";
pub const ACCEPT_XML: &str = "application/xml";
pub const CONTENT_TYPE_XML: &str = "application/xml;charset=utf-8";

/// Authentication level, the first path segment after the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthType {
    /// The platform checks the main account SID and token.
    #[default]
    Accounts,
    /// The platform checks a sub-account SID and token.
    SubAccounts,
}

impl AuthType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Accounts => "Accounts",
            Self::SubAccounts => "SubAccounts",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Accounts" => Ok(Self::Accounts),
            "SubAccounts" => Ok(Self::SubAccounts),
            other => Err(Error::InvalidAuthType(other.to_string())),
        }
    }
}

/// Request payload. Its kind decides the HTTP method and the JSON/XML mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// `GET`, JSON response.
    #[default]
    Empty,
    /// `POST` with a JSON object, JSON response.
    Json(JsonValue),
    /// `POST` with an XML document, XML response.
    Xml(Element),
}

/// One REST call: `{function}/{action}` plus query parameters, extra headers,
/// payload and an optional per-call timeout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    function: String,
    action: String,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: Body,
    timeout: Option<Duration>,
}

impl Request {
    /// `function` names the business area (`SMS`, `ivr`, ...), `action` the
    /// operation within it (`TemplateSMS`, `dial`, ...).
    pub fn new(function: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sends `body` as JSON. It must be a JSON object.
    pub fn with_json_body(mut self, body: JsonValue) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn with_xml_body(mut self, document: Element) -> Self {
        self.body = Body::Xml(document);
        self
    }

    /// Overrides the client's default timeout for this call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn method(&self) -> Method {
        match self.body {
            Body::Empty => Method::GET,
            Body::Json(_) | Body::Xml(_) => Method::POST,
        }
    }

    /// `Accept` value; also selects the response decoder.
    pub fn accept(&self) -> &'static str {
        match self.body {
            Body::Empty | Body::Json(_) => ACCEPT_JSON,
            Body::Xml(_) => ACCEPT_XML,
        }
    }

    /// Explicit `Content-Type`, if the payload mode sets one.
    pub fn content_type(&self) -> Option<&'static str> {
        match self.body {
            Body::Xml(_) => Some(CONTENT_TYPE_XML),
            Body::Empty | Body::Json(_) => None,
        }
    }

    /// `{base_url}/{auth_type}/{account_sid}/{function}/{action}`.
    pub fn url(&self, base_url: &str, auth_type: AuthType, account_sid: &str) -> Result<Url, Error> {
        let raw = format!(
            "{}/{}/{}/{}/{}",
            base_url.trim_end_matches('/'),
            auth_type,
            account_sid,
            self.function,
            self.action
        );
        Url::parse(&raw).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::InvalidRequest(format!("invalid URL {:?}: {}", raw, e))
        })
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.function.is_empty() || self.action.is_empty() {
            return Err(Error::InvalidRequest(
                "function and action must not be empty".to_string(),
            ));
        }
        if let Body::Json(body) = &self.body {
            if !body.is_object() {
                return Err(Error::InvalidRequest(
                    "JSON body must be an object".to_string(),
                ));
            }
        }
        Ok(())
    }
}
