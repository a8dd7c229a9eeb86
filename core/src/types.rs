//! Request descriptor and the success/error envelopes handed back to callers.
//!
//! # Design
//! All three types live for a single call. Envelopes are generic over the
//! transport's request handle `H` so callers keep access to whatever the
//! transport exposes (identity, cancellation, diagnostics).

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::FailureCause;
use crate::http::{FormField, Headers, RequestBody, ResponseData};

/// Credentials for HTTP basic authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Basic ` followed by base64 of the UTF-8 bytes of `username:password`.
    pub fn header_value(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(credentials.as_bytes()))
    }
}

/// Caller-supplied predicate deciding whether a status code counts as success.
pub type StatusValidator = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// One HTTP request as described by the caller.
#[derive(Clone)]
pub struct RequestDescriptor {
    /// Case-insensitive; upper-cased before dispatch.
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Option<RequestBody>,
    pub params: Option<Vec<(String, String)>>,
    pub auth: Option<BasicAuth>,
    pub validate_status: Option<StatusValidator>,
}

impl RequestDescriptor {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Headers::new(),
            body: None,
            params: None,
            auth: None,
            validate_status: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("get", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("post", url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    pub fn raw(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Some(RequestBody::Raw(bytes.into()));
        self
    }

    pub fn multipart(mut self, fields: Vec<FormField>) -> Self {
        self.body = Some(RequestBody::MultipartForm(fields));
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth::new(username, password));
        self
    }

    pub fn validate_status<F>(mut self, predicate: F) -> Self
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        self.validate_status = Some(Arc::new(predicate));
        self
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("params", &self.params)
            .field("auth", &self.auth.as_ref().map(|a| &a.username))
            .field(
                "validate_status",
                &self.validate_status.as_ref().map(|_| "<fn>"),
            )
            .finish()
    }
}

/// A settled response in the shape callers expect.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope<H> {
    pub data: ResponseData,
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    /// The descriptor exactly as the caller passed it.
    pub config: RequestDescriptor,
    /// The transport's handle for this call.
    pub request: H,
}

/// The single failure shape for every way a call can fail.
///
/// `response` is present when the origin answered; callers branch on it to
/// tell "got a response we didn't like" from "never got a response".
#[derive(Debug, Clone)]
pub struct ErrorEnvelope<H> {
    pub cause: FailureCause,
    pub config: RequestDescriptor,
    /// Transport-native error name; unset for status-validation rejections.
    pub code: Option<String>,
    pub request: H,
    pub response: Option<ResponseEnvelope<H>>,
}

impl<H> ErrorEnvelope<H> {
    pub fn message(&self) -> String {
        self.cause.to_string()
    }

    pub fn is_validation_rejection(&self) -> bool {
        matches!(self.cause, FailureCause::ValidationRejected { .. })
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }
}

impl<H> fmt::Display for ErrorEnvelope<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.cause, f)
    }
}

impl<H: fmt::Debug> std::error::Error for ErrorEnvelope<H> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Outcome of one adapted call.
pub type AdaptResult<H> = Result<ResponseEnvelope<H>, ErrorEnvelope<H>>;
