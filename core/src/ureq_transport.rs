//! `Transport` backed by a blocking ureq agent.
//!
//! # Design
//! ureq is synchronous, so each call runs on tokio's blocking pool. The
//! agent is built with `http_status_as_error(false)` so every status comes
//! back as data; whether a non-2xx status is a failure is then decided by
//! `TransportConfig::status_as_failure`, matching clients that surface error
//! statuses on their failure channel.
//!
//! Multipart bodies are encoded here with a freshly generated boundary, and
//! the matching content type always replaces whatever the caller sent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use ureq::http::{self, HeaderMap, Method};
use url::Url;
use uuid::Uuid;

use crate::http::{FormField, FormValue, HeaderView, RequestBody, ResponseData};
use crate::transport::{
    Transport, TransportErrorResponse, TransportFailure, TransportOutcome, TransportRequest,
    TransportResponse,
};

/// Settings for `UreqTransport`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Whole-call timeout. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
    /// Report non-2xx responses as failures rather than responses.
    pub status_as_failure: bool,
    /// Sent as `User-Agent` unless the request sets one.
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            status_as_failure: true,
            user_agent: None,
        }
    }
}

impl TransportConfig {
    /// Defaults overridden by `ADAPTER_TIMEOUT_SECS`, `ADAPTER_STATUS_AS_FAILURE`
    /// and `ADAPTER_USER_AGENT` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// An unparsable timeout is ignored. The failure flag is off only for
    /// `0`, `false`, `no` or `off` (any case).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(secs) = lookup("ADAPTER_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            config.timeout_secs = Some(secs);
        }
        if let Some(flag) = lookup("ADAPTER_STATUS_AS_FAILURE") {
            config.status_as_failure = !matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
        if let Some(agent) = lookup("ADAPTER_USER_AGENT") {
            config.user_agent = Some(agent);
        }
        config
    }
}

/// A request prepared by `UreqTransport`, not yet sent.
#[derive(Debug)]
pub struct PreparedRequest {
    pub id: Uuid,
    pub request: TransportRequest,
}

/// Shared handle to a prepared request. Clones refer to the same call.
#[derive(Debug, Clone)]
pub struct RequestHandle(Arc<PreparedRequest>);

impl RequestHandle {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn request(&self) -> &TransportRequest {
        &self.0.request
    }

    /// Whether both handles refer to the same call.
    pub fn ptr_eq(&self, other: &RequestHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    config: TransportConfig,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl UreqTransport {
    pub fn new(config: TransportConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout_secs.map(Duration::from_secs))
            .build()
            .new_agent();
        Self { agent, config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for UreqTransport {
    type Handle = RequestHandle;

    fn prepare(&self, request: TransportRequest) -> RequestHandle {
        RequestHandle(Arc::new(PreparedRequest {
            id: Uuid::new_v4(),
            request,
        }))
    }

    async fn execute(&self, handle: &RequestHandle) -> TransportOutcome {
        let agent = self.agent.clone();
        let config = self.config.clone();
        let handle = handle.clone();

        match tokio::task::spawn_blocking(move || run_blocking(&agent, &config, &handle)).await {
            Ok(outcome) => outcome,
            Err(err) => failed(err.to_string(), "JoinError"),
        }
    }
}

fn run_blocking(
    agent: &ureq::Agent,
    config: &TransportConfig,
    handle: &RequestHandle,
) -> TransportOutcome {
    let request = handle.request();

    let method = match Method::from_bytes(request.method.as_bytes()) {
        Ok(method) => method,
        Err(_) => return failed(format!("invalid method: {}", request.method), "InvalidMethod"),
    };
    let url = match build_url(&request.url, &request.params) {
        Ok(url) => url,
        Err(err) => return failed(format!("invalid url {}: {err}", request.url), "BadUri"),
    };
    let (content_type, payload) = match encode_body(request.body.as_ref()) {
        Ok(encoded) => encoded,
        Err(err) => return failed(err.to_string(), "Serialization"),
    };
    let multipart = request.body.as_ref().is_some_and(RequestBody::is_multipart);

    let mut builder = http::Request::builder()
        .method(method)
        .uri(url.as_str());
    for (key, value) in request.headers.iter() {
        if multipart && key.eq_ignore_ascii_case("content-type") {
            continue;
        }
        builder = builder.header(key, value);
    }
    if let Some(content_type) = content_type {
        if multipart || !request.headers.contains_ignore_case("content-type") {
            builder = builder.header("content-type", content_type);
        }
    }
    if let Some(user_agent) = &config.user_agent {
        if !request.headers.contains_ignore_case("user-agent") {
            builder = builder.header("user-agent", user_agent.as_str());
        }
    }

    debug!(id = %handle.id(), method = %request.method, url = %url, "sending request");
    let sent = match payload {
        Some(bytes) => builder.body(bytes).map(|req| agent.run(req)),
        None => builder.body(()).map(|req| agent.run(req)),
    };
    let mut response = match sent {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            warn!(id = %handle.id(), url = %url, "request failed: {err}");
            return failed(err.to_string(), error_name(&err));
        }
        Err(err) => return failed(err.to_string(), "Http"),
    };

    let status = response.status();
    let status_text = status.canonical_reason().unwrap_or_default().to_string();
    let headers = response.headers().clone();
    let data = match response.body_mut().read_to_vec() {
        Ok(bytes) => decode_payload(bytes),
        Err(err) => return failed(err.to_string(), error_name(&err)),
    };
    debug!(id = %handle.id(), status = status.as_u16(), "response received");

    if config.status_as_failure && !status.is_success() {
        return TransportOutcome::Failed(TransportFailure {
            message: format!(
                "Http failure response for {url}: {} {status_text}",
                status.as_u16()
            ),
            name: Some("HttpErrorResponse".to_string()),
            response: Some(TransportErrorResponse {
                status: status.as_u16(),
                status_text,
                headers: Box::new(headers),
                error: data,
            }),
        });
    }

    TransportOutcome::Ok(TransportResponse {
        status: status.as_u16(),
        status_text,
        headers: Box::new(headers),
        body: data,
    })
}

fn failed(message: String, name: &str) -> TransportOutcome {
    TransportOutcome::Failed(TransportFailure {
        message,
        name: Some(name.to_string()),
        response: None,
    })
}

fn error_name(err: &ureq::Error) -> &'static str {
    match err {
        ureq::Error::StatusCode(_) => "StatusCode",
        ureq::Error::Timeout(_) => "Timeout",
        ureq::Error::HostNotFound => "HostNotFound",
        ureq::Error::ConnectionFailed => "ConnectionFailed",
        ureq::Error::TooManyRedirects => "TooManyRedirects",
        ureq::Error::BadUri(_) => "BadUri",
        ureq::Error::Io(_) => "Io",
        _ => "TransportError",
    }
}

fn build_url(base: &str, params: &[(String, String)]) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    Ok(url)
}

/// Content type (if the encoding implies one) and bytes to send.
fn encode_body(
    body: Option<&RequestBody>,
) -> Result<(Option<String>, Option<Vec<u8>>), serde_json::Error> {
    let Some(body) = body else {
        return Ok((None, None));
    };
    Ok(match body {
        RequestBody::Json(value) => (
            Some("application/json".to_string()),
            Some(serde_json::to_vec(value)?),
        ),
        RequestBody::Raw(bytes) => (None, Some(bytes.clone())),
        RequestBody::MultipartForm(fields) => {
            let boundary = format!("adapter-{}", Uuid::new_v4().simple());
            (
                Some(format!("multipart/form-data; boundary={boundary}")),
                Some(encode_multipart(fields, &boundary)),
            )
        }
    })
}

fn encode_multipart(fields: &[FormField], boundary: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for field in fields {
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        let name = escape_quoted(&field.name);
        match &field.value {
            FormValue::Text(text) => {
                out.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                out.extend_from_slice(text.as_bytes());
            }
            FormValue::File {
                filename,
                content_type,
                bytes,
            } => {
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{}\"\r\n",
                        escape_quoted(filename)
                    )
                    .as_bytes(),
                );
                let content_type = content_type
                    .as_deref()
                    .unwrap_or("application/octet-stream");
                out.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
                out.extend_from_slice(bytes);
            }
        }
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    out
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Empty bodies are `Empty`; anything that parses as JSON is `Json`; other
/// UTF-8 is `Text`; the rest stays as bytes.
fn decode_payload(bytes: Vec<u8>) -> ResponseData {
    if bytes.is_empty() {
        return ResponseData::Empty;
    }
    if let Ok(value) = serde_json::from_slice(&bytes) {
        return ResponseData::Json(value);
    }
    match String::from_utf8(bytes) {
        Ok(text) => ResponseData::Text(text),
        Err(err) => ResponseData::Bytes(err.into_bytes()),
    }
}

impl HeaderView for HeaderMap {
    fn keys(&self) -> Vec<String> {
        HeaderMap::keys(self)
            .map(|name| name.as_str().to_string())
            .collect()
    }

    fn has(&self, key: &str) -> bool {
        self.contains_key(key)
    }

    /// First value for `key`; values that are not visible ASCII are skipped.
    fn get(&self, key: &str) -> Option<String> {
        HeaderMap::get(self, key)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn params_are_appended_to_existing_query() {
        let url = build_url(
            "http://localhost/echo?a=1",
            &[("b".to_string(), "two words".to_string())],
        )
        .unwrap();
        assert_eq!(url.as_str(), "http://localhost/echo?a=1&b=two+words");
    }

    #[test]
    fn url_without_params_is_untouched() {
        let url = build_url("http://localhost/echo", &[]).unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn json_body_sets_content_type() {
        let (content_type, payload) =
            encode_body(Some(&RequestBody::Json(json!({"a": 1})))).unwrap();
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(payload.unwrap(), br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn raw_body_has_no_implied_content_type() {
        let (content_type, payload) =
            encode_body(Some(&RequestBody::Raw(b"abc".to_vec()))).unwrap();
        assert!(content_type.is_none());
        assert_eq!(payload.unwrap(), b"abc".to_vec());
    }

    #[test]
    fn multipart_encoding_uses_boundary() {
        let fields = vec![
            FormField::text("title", "hello"),
            FormField::file("doc", "a.txt", Some("text/plain".to_string()), b"data".to_vec()),
        ];
        let body = String::from_utf8(encode_multipart(&fields, "XYZ")).unwrap();
        assert_eq!(
            body,
            "--XYZ\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
             hello\r\n\
             --XYZ\r\n\
             Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             data\r\n\
             --XYZ--\r\n"
        );
    }

    #[test]
    fn payload_decoding() {
        assert_eq!(decode_payload(Vec::new()), ResponseData::Empty);
        assert_eq!(
            decode_payload(br#"{"id":1}"#.to_vec()),
            ResponseData::Json(json!({"id": 1}))
        );
        assert_eq!(
            decode_payload(b"plain".to_vec()),
            ResponseData::Text("plain".to_string())
        );
        assert_eq!(
            decode_payload(vec![0xff, 0xfe]),
            ResponseData::Bytes(vec![0xff, 0xfe])
        );
    }

    #[test]
    fn header_map_view_reports_first_value() {
        let mut map = HeaderMap::new();
        map.append("x-multi", "one".parse().unwrap());
        map.append("x-multi", "two".parse().unwrap());

        assert_eq!(HeaderView::keys(&map), vec!["x-multi".to_string()]);
        assert!(HeaderView::has(&map, "X-Multi"));
        assert_eq!(HeaderView::get(&map, "x-multi").as_deref(), Some("one"));
        assert_eq!(HeaderView::get(&map, "x-missing"), None);
    }

    #[test]
    fn config_defaults_treat_error_status_as_failure() {
        let config = TransportConfig::default();
        assert!(config.status_as_failure);
        assert!(config.timeout_secs.is_none());

        let parsed: TransportConfig =
            serde_json::from_value(json!({"timeout_secs": 5})).unwrap();
        assert_eq!(parsed.timeout_secs, Some(5));
        assert!(parsed.status_as_failure);
    }

    fn lookup_from(
        vars: &'static [(&'static str, &'static str)],
    ) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn config_from_lookup_reads_every_variable() {
        let config = TransportConfig::from_lookup(lookup_from(&[
            ("ADAPTER_TIMEOUT_SECS", " 30 "),
            ("ADAPTER_STATUS_AS_FAILURE", "Off"),
            ("ADAPTER_USER_AGENT", "adapter-test/1.0"),
        ]));
        assert_eq!(
            config,
            TransportConfig {
                timeout_secs: Some(30),
                status_as_failure: false,
                user_agent: Some("adapter-test/1.0".to_string()),
            }
        );
    }

    #[test]
    fn config_from_lookup_without_variables_is_default() {
        let config = TransportConfig::from_lookup(|_| None);
        assert_eq!(config, TransportConfig::default());
    }

    #[test]
    fn config_from_lookup_ignores_bad_timeout() {
        let config =
            TransportConfig::from_lookup(lookup_from(&[("ADAPTER_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn status_flag_is_off_only_for_falsy_words() {
        for (flag, expected) in [
            ("0", false),
            ("false", false),
            ("NO", false),
            ("off", false),
            ("1", true),
            ("true", true),
            ("yes", true),
            ("whatever", true),
        ] {
            let config = TransportConfig::from_lookup(|key| {
                (key == "ADAPTER_STATUS_AS_FAILURE").then(|| flag.to_string())
            });
            assert_eq!(config.status_as_failure, expected, "{flag}");
        }
    }

    #[tokio::test]
    async fn invalid_method_is_a_transport_failure() {
        let transport = UreqTransport::default();
        let handle = transport.prepare(TransportRequest {
            method: "NOT A METHOD".to_string(),
            url: "http://127.0.0.1:9/".to_string(),
            body: None,
            headers: Default::default(),
            params: Vec::new(),
            observe: crate::transport::Observe::Response,
        });

        match transport.execute(&handle).await {
            TransportOutcome::Failed(failure) => {
                assert_eq!(failure.name.as_deref(), Some("InvalidMethod"));
                assert!(failure.response.is_none());
            }
            TransportOutcome::Ok(_) => panic!("expected failure"),
        }
    }
}
