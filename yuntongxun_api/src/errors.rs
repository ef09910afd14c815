//! Error types for the API client and the vendor status check.

use std::time::Duration;

use serde_json::Value as JsonValue;

use crate::xml::Element;

/// `statusCode` the platform returns for a successful call (`"000000"`).
pub const SUCCESS_CODE: i64 = 0;

/// Errors that can occur when invoking the REST API.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The endpoint answered with a status other than `200 OK`.
    #[error("HTTP Error [{status}]: {reason}")]
    Http { status: u16, reason: String },
    /// The call did not complete within its timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Connection, TLS or body transfer failure.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),
    /// HTTP succeeded but the platform reported a non-success `statusCode`.
    #[error("Restful API Error [{code}]: {message}")]
    RestApi { code: i64, message: String },
    #[error("Unknown auth type \"{0}\"")]
    InvalidAuthType(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// The negotiated `Accept` value has no response decoder.
    #[error("Accept header error: {0}")]
    AcceptHeader(String),
    #[error("Failed to parse JSON response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse XML response: {0}")]
    Xml(String),
    #[error("Malformed statusCode {0:?}")]
    MalformedStatusCode(String),
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
    #[error("Missing field \"{0}\"")]
    MissingField(String),
}

impl Error {
    /// HTTP status failures, timeouts and network failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Timeout(_) | Self::Network(_))
    }

    pub fn is_rest_api(&self) -> bool {
        matches!(self, Self::RestApi { .. })
    }

    /// Caller mistakes: bad auth type or request, and an `Accept` mode no decoder handles.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::InvalidAuthType(_) | Self::InvalidRequest(_) | Self::AcceptHeader(_)
        )
    }

    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            Self::Json(_) | Self::Xml(_) | Self::MalformedStatusCode(_) | Self::UnexpectedShape(_)
        )
    }

    /// HTTP status code for [`Error::Http`], vendor code for [`Error::RestApi`].
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Http { status, .. } => Some(i64::from(*status)),
            Self::RestApi { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// A decoded response body, before it is flattened into an [`AttrMap`](crate::AttrMap).
#[derive(Debug, Clone, Copy)]
pub enum ParsedBody<'a> {
    /// Root element of an XML response.
    Xml(&'a Element),
    /// A decoded JSON response.
    Json(&'a JsonValue),
}

/// Inspects a decoded response for a vendor-reported failure.
///
/// Returns `Ok(())` when `statusCode` is absent or equals [`SUCCESS_CODE`], and
/// [`Error::RestApi`] with the code and `statusMsg` otherwise. A JSON body that
/// is not an object is an [`Error::UnexpectedShape`].
pub fn check_for_error(body: ParsedBody<'_>) -> Result<(), Error> {
    let (raw_code, message) = match body {
        ParsedBody::Xml(root) => {
            let Some(code) = root.child("statusCode") else {
                return Ok(());
            };
            let message = root.child_text("statusMsg").unwrap_or_default();
            (code.text.trim().to_string(), message.to_string())
        }
        ParsedBody::Json(JsonValue::Object(map)) => {
            let code = match map.get("statusCode") {
                None => return Ok(()),
                Some(JsonValue::String(s)) => s.trim().to_string(),
                Some(JsonValue::Number(n)) => n.to_string(),
                Some(other) => return Err(Error::MalformedStatusCode(other.to_string())),
            };
            let message = match map.get("statusMsg") {
                None | Some(JsonValue::Null) => String::new(),
                Some(JsonValue::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            (code, message)
        }
        ParsedBody::Json(other) => {
            return Err(Error::UnexpectedShape(format!(
                "expected a JSON object, got {}",
                json_kind(other)
            )))
        }
    };

    let code = raw_code
        .parse::<i64>()
        .map_err(|_| Error::MalformedStatusCode(raw_code.clone()))?;
    if code == SUCCESS_CODE {
        return Ok(());
    }
    tracing::warn!("REST API reported error {}: {}", code, message);
    Err(Error::RestApi { code, message })
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_success_code_passes() {
        let body = json!({"statusCode": "000000", "templateSMS": {"smsMessageSid": "abc"}});
        assert!(check_for_error(ParsedBody::Json(&body)).is_ok());
    }

    #[test]
    fn json_error_code_raises() {
        let body = json!({"statusCode": "160003", "statusMsg": "no permission"});
        let err = check_for_error(ParsedBody::Json(&body)).unwrap_err();
        assert!(matches!(
            err,
            Error::RestApi { code: 160003, ref message } if message == "no permission"
        ));
        assert_eq!(err.to_string(), "Restful API Error [160003]: no permission");
    }

    #[test]
    fn json_numeric_code_and_missing_message() {
        let body = json!({"statusCode": 111100});
        let err = check_for_error(ParsedBody::Json(&body)).unwrap_err();
        assert!(matches!(err, Error::RestApi { code: 111100, ref message } if message.is_empty()));
    }

    #[test]
    fn json_without_status_code_passes() {
        let body = json!({"data": []});
        assert!(check_for_error(ParsedBody::Json(&body)).is_ok());
    }

    #[test]
    fn json_non_object_is_shape_error() {
        let body = json!(["statusCode"]);
        let err = check_for_error(ParsedBody::Json(&body)).unwrap_err();
        assert!(matches!(err, Error::UnexpectedShape(_)));
        assert!(err.is_parse());
    }

    #[test]
    fn json_malformed_code() {
        let body = json!({"statusCode": "oops"});
        assert!(matches!(
            check_for_error(ParsedBody::Json(&body)),
            Err(Error::MalformedStatusCode(code)) if code == "oops"
        ));

        let body = json!({"statusCode": true});
        assert!(matches!(
            check_for_error(ParsedBody::Json(&body)),
            Err(Error::MalformedStatusCode(_))
        ));
    }

    #[test]
    fn xml_error_code_raises() {
        let root = Element::parse(
            "<Response><statusCode>112310</statusCode><statusMsg>bad template</statusMsg></Response>",
        )
        .unwrap();
        let err = check_for_error(ParsedBody::Xml(&root)).unwrap_err();
        assert!(matches!(
            err,
            Error::RestApi { code: 112310, ref message } if message == "bad template"
        ));
    }

    #[test]
    fn xml_success_code_passes() {
        let root = Element::parse(
            "<Response>\n  <statusCode>000000</statusCode>\n  <callSid>x</callSid>\n</Response>",
        )
        .unwrap();
        assert!(check_for_error(ParsedBody::Xml(&root)).is_ok());
    }

    #[test]
    fn xml_empty_status_code_is_malformed() {
        let root = Element::parse("<Response><statusCode/></Response>").unwrap();
        assert!(matches!(
            check_for_error(ParsedBody::Xml(&root)),
            Err(Error::MalformedStatusCode(_))
        ));
    }

    #[test]
    fn classification() {
        let http = Error::Http {
            status: 500,
            reason: "Internal Server Error".to_string(),
        };
        assert!(http.is_transport());
        assert_eq!(http.code(), Some(500));
        assert_eq!(http.to_string(), "HTTP Error [500]: Internal Server Error");

        assert!(Error::Timeout(Duration::from_secs(1)).is_transport());
        assert!(Error::InvalidAuthType("x".into()).is_usage());
        assert!(Error::AcceptHeader("text/plain".into()).is_usage());
        assert!(Error::Xml("bad".into()).is_parse());

        let api = Error::RestApi {
            code: 1,
            message: String::new(),
        };
        assert!(api.is_rest_api());
        assert!(!api.is_transport());
        assert_eq!(api.code(), Some(1));
    }
}
