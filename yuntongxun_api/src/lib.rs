//! Async helper library for the Yuntongxun (cloopen.com) REST API.
//!
//! A call is signed with the account SID and auth token, sent as `GET`, JSON
//! `POST` or XML `POST`, and its JSON or XML response is decoded into an
//! [`AttrMap`]. Vendor-reported failures surface as [`Error::RestApi`].

pub mod auth;
mod client;
pub mod config;
mod errors;
mod request;
pub mod value;
pub mod xml;
pub use self::auth::{build_auth, Credential, Signature};
pub use self::client::{invoke, Client};
pub use self::config::ClientConfig;
pub use self::errors::{check_for_error, Error, ParsedBody, SUCCESS_CODE};
pub use self::request::{AuthType, Body, Request, ACCEPT_JSON, ACCEPT_XML, CONTENT_TYPE_XML};
pub use self::value::{AttrMap, Value};
pub use self::xml::{flatten, Element};
