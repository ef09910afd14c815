//! HTTP client for the Yuntongxun REST API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;

use crate::{
    auth::{build_auth_with, Clock, Credential, Signature, SystemClock},
    config::{ClientConfig, DEFAULT_TIMEOUT},
    errors::{check_for_error, ParsedBody},
    request::{AuthType, Body, Request, ACCEPT_JSON, ACCEPT_XML},
    value::{AttrMap, Value},
    xml::{flatten, Element},
    Error,
};

/// Performs one signed REST call and returns the decoded response.
///
/// `auth_type` must be `"Accounts"` or `"SubAccounts"`; anything else fails with
/// [`Error::InvalidAuthType`] before any network activity. The call uses the
/// request's timeout, or [`DEFAULT_TIMEOUT`] when it has none.
pub async fn invoke(
    base_url: &str,
    auth_type: &str,
    credential: &Credential,
    request: &Request,
) -> Result<AttrMap, Error> {
    let auth_type = auth_type.parse::<AuthType>()?;
    send(base_url, auth_type, credential, &SystemClock, request, DEFAULT_TIMEOUT).await
}

/// Holds the endpoint, authentication level, credential and default timeout
/// shared by a series of calls.
///
/// Each call builds its own signature and its own `reqwest::Client`, so nothing
/// but configuration is shared between concurrent calls.
#[derive(Clone)]
pub struct Client {
    base_url: String,
    auth_type: AuthType,
    credential: Credential,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl Client {
    /// Creates a client for the sandbox endpoint with main-account authentication.
    pub fn new(credential: Credential) -> Self {
        Self::from_config(&ClientConfig::default(), credential)
    }

    /// Creates a client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str, credential: Credential) -> Self {
        let config = ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        };
        Self::from_config(&config, credential)
    }

    pub fn from_config(config: &ClientConfig, credential: Credential) -> Self {
        Self {
            base_url: config.base_url.clone(),
            auth_type: config.auth_type,
            credential,
            timeout: config.timeout,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }

    /// Default timeout for requests that do not set their own.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the clock used to timestamp signatures.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_type(&self) -> AuthType {
        self.auth_type
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Signature a call made right now would carry.
    pub fn sign(&self) -> Signature {
        build_auth_with(
            self.credential.account_sid(),
            self.credential.auth_token(),
            self.clock.as_ref(),
        )
    }

    pub async fn invoke(&self, request: &Request) -> Result<AttrMap, Error> {
        send(
            &self.base_url,
            self.auth_type,
            &self.credential,
            self.clock.as_ref(),
            request,
            self.timeout,
        )
        .await
    }
}

async fn send(
    base_url: &str,
    auth_type: AuthType,
    credential: &Credential,
    clock: &dyn Clock,
    request: &Request,
    default_timeout: Duration,
) -> Result<AttrMap, Error> {
    request.validate()?;
    let url = request.url(base_url, auth_type, credential.account_sid())?;
    let signature = build_auth_with(credential.account_sid(), credential.auth_token(), clock);
    let accept = request.accept();
    let timeout = request.timeout().unwrap_or(default_timeout);
    let headers = build_headers(request, &signature)?;

    let mut query: Vec<(&str, &str)> = request
        .query_params()
        .iter()
        .filter(|(key, _)| key.as_str() != "sig")
        .map(|(key, val)| (key.as_str(), val.as_str()))
        .collect();
    query.push(("sig", signature.signature.as_str()));

    tracing::debug!(
        method = %request.method(),
        url = %url,
        accept,
        timeout_secs = timeout.as_secs_f64(),
        "Invoking REST API"
    );

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            tracing::error!("Failed to build HTTP client: {}", e);
            Error::Network(e)
        })?;
    let builder = match request.body() {
        Body::Empty => client.get(url),
        Body::Json(value) => client.post(url).json(value),
        Body::Xml(document) => client.post(url).body(document.to_document_bytes()?),
    };

    let resp = builder
        .headers(headers)
        .query(&query)
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;

    let status = resp.status();
    if status != StatusCode::OK {
        // The status is the error; an unreadable body only loses the log detail.
        let body = resp.text().await.unwrap_or_default();
        return Err(http_error(status, &body));
    }

    let body = resp.text().await.map_err(|e| transport_error(e, timeout))?;
    parse_response(accept, &body)
}

fn http_error(status: StatusCode, body: &str) -> Error {
    tracing::error!(
        "Request failed with status {} | body: {}",
        status,
        truncate_body(body)
    );
    Error::Http {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_string(),
    }
}

fn build_headers(request: &Request, signature: &Signature) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    for (name, value) in request.headers() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidRequest(format!("invalid header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::InvalidRequest(format!("invalid value for header {}: {}", name, e)))?;
        headers.insert(name, value);
    }

    let auth = HeaderValue::from_str(&signature.auth_header)
        .map_err(|e| Error::InvalidRequest(format!("invalid Authorization value: {}", e)))?;
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static(request.accept()));
    if let Some(content_type) = request.content_type() {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    Ok(headers)
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        tracing::error!("Request timed out after {:?}", timeout);
        Error::Timeout(timeout)
    } else {
        tracing::error!("Failed to get resource: {}", err);
        Error::Network(err)
    }
}

/// Decodes a `200 OK` body according to the `Accept` mode the request was sent with.
pub(crate) fn parse_response(accept: &str, body: &str) -> Result<AttrMap, Error> {
    match accept {
        ACCEPT_JSON => {
            let parsed: serde_json::Value = serde_json::from_str(body).map_err(|e| {
                tracing::error!("Failed to parse JSON response: {} | body: {}", e, truncate_body(body));
                Error::Json(e)
            })?;
            check_for_error(ParsedBody::Json(&parsed))?;
            AttrMap::try_from(parsed)
        }
        ACCEPT_XML => {
            let root = Element::parse(body).map_err(|e| {
                tracing::error!("Failed to parse XML response: {} | body: {}", e, truncate_body(body));
                e
            })?;
            check_for_error(ParsedBody::Xml(&root))?;
            match flatten(&root) {
                (_, Value::Map(fields)) => Ok(fields),
                (tag, other) => Err(Error::UnexpectedShape(format!(
                    "root element <{}> holds a {} instead of fields",
                    tag,
                    other.kind()
                ))),
            }
        }
        other => Err(Error::AcceptHeader(other.to_string())),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_success_is_wrapped() {
        let map = parse_response(
            ACCEPT_JSON,
            r#"{"statusCode":"000000","templateSMS":{"smsMessageSid":"abc"}}"#,
        )
        .unwrap();
        assert_eq!(map.path("templateSMS.smsMessageSid").unwrap().as_str(), Some("abc"));
        assert_eq!(map.text("statusCode").unwrap(), "000000");
    }

    #[test]
    fn json_vendor_error() {
        let err = parse_response(ACCEPT_JSON, r#"{"statusCode":"160003","statusMsg":"no permission"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::RestApi { code: 160003, .. }));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse_response(ACCEPT_JSON, "{not valid json}").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.is_parse());
    }

    #[test]
    fn xml_root_is_discarded() {
        let map = parse_response(
            ACCEPT_XML,
            "<Response><statusCode>000000</statusCode><callSid>c1</callSid></Response>",
        )
        .unwrap();
        assert_eq!(map.text("callSid").unwrap(), "c1");
        assert!(!map.contains_key("Response"));
    }

    #[test]
    fn xml_vendor_error_and_malformed_xml() {
        let err = parse_response(
            ACCEPT_XML,
            "<Response><statusCode>111150</statusCode><statusMsg>busy</statusMsg></Response>",
        )
        .unwrap_err();
        assert!(matches!(err, Error::RestApi { code: 111150, ref message } if message == "busy"));

        assert!(matches!(parse_response(ACCEPT_XML, "<Response>"), Err(Error::Xml(_))));
    }

    #[test]
    fn xml_text_root_is_shape_error() {
        assert!(matches!(
            parse_response(ACCEPT_XML, "<Response>plain</Response>"),
            Err(Error::UnexpectedShape(_))
        ));
    }

    #[test]
    fn unknown_accept_fails_fast() {
        let err = parse_response("text/plain", "hello").unwrap_err();
        assert!(matches!(err, Error::AcceptHeader(ref a) if a == "text/plain"));
        assert!(err.is_usage());
    }

    #[test]
    fn http_error_keeps_canonical_reason() {
        let body = "x".repeat(5000);
        let err = http_error(StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert!(matches!(
            err,
            Error::Http { status: 500, ref reason } if reason == "Internal Server Error"
        ));
        assert!(err.is_transport());

        let unknown = StatusCode::from_u16(599).unwrap();
        assert!(matches!(
            http_error(unknown, ""),
            Error::Http { status: 599, ref reason } if reason.is_empty()
        ));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let body = "é".repeat(1500);
        let out = truncate_body(&body);
        assert!(out.ends_with("...[truncated]"));
        assert!(truncate_body("short").eq("short"));
    }
}
