//! Runs request descriptors through a transport and shapes the result into
//! envelopes.
//!
//! # Design
//! `Adapter` holds only its transport and carries no state between calls.
//! Each `adapt` call pre-processes a private copy of the caller's headers,
//! issues exactly one transport call, and settles into either a
//! `ResponseEnvelope` or an `ErrorEnvelope`. The caller's descriptor is
//! echoed back as `config` untouched, so descriptors can be reused.

use tracing::{debug, warn};

use crate::error::FailureCause;
use crate::http::{HeaderView, Headers, RequestBody, ResponseData};
use crate::transport::{
    Observe, Transport, TransportErrorResponse, TransportFailure, TransportOutcome,
    TransportRequest, TransportResponse,
};
use crate::types::{AdaptResult, ErrorEnvelope, RequestDescriptor, ResponseEnvelope};

const CONTENT_TYPE: &str = "Content-Type";
const AUTHORIZATION: &str = "Authorization";

/// Adapts descriptor-style requests onto a `Transport`.
#[derive(Debug, Clone)]
pub struct Adapter<T> {
    transport: T,
}

impl<T: Transport> Adapter<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issue `descriptor` through the transport.
    ///
    /// Resolves with a `ResponseEnvelope` when the transport answers on its
    /// success channel and the status predicate (if any) accepts the status.
    /// Every other outcome is an `ErrorEnvelope`.
    pub async fn adapt(&self, descriptor: RequestDescriptor) -> AdaptResult<T::Handle> {
        let request = build_transport_request(&descriptor);
        debug!(method = %request.method, url = %request.url, "dispatching request");

        let handle = self.transport.prepare(request);
        match self.transport.execute(&handle).await {
            TransportOutcome::Ok(response) => handle_success(descriptor, handle, response),
            TransportOutcome::Failed(failure) => Err(handle_failure(descriptor, handle, failure)),
        }
    }
}

/// Apply header rules to a copy of the descriptor's headers and assemble the
/// outgoing transport request.
fn build_transport_request(descriptor: &RequestDescriptor) -> TransportRequest {
    let mut headers = descriptor.headers.clone();

    if descriptor
        .body
        .as_ref()
        .is_some_and(RequestBody::is_multipart)
    {
        headers.remove_ignore_case(CONTENT_TYPE);
    }

    if let Some(auth) = &descriptor.auth {
        headers.insert(AUTHORIZATION, auth.header_value());
    }

    TransportRequest {
        method: descriptor.method.to_uppercase(),
        url: descriptor.url.clone(),
        body: descriptor.body.clone(),
        headers,
        params: descriptor.params.clone().unwrap_or_default(),
        observe: Observe::Response,
    }
}

fn handle_success<H: Clone>(
    config: RequestDescriptor,
    request: H,
    response: TransportResponse,
) -> AdaptResult<H> {
    let status = response.status;
    let accepted = config
        .validate_status
        .as_ref()
        .map_or(true, |validate| validate(status));
    let converted = ConvertedResponse::from(response);

    if accepted {
        debug!(status, "request settled");
        return Ok(converted.into_envelope(config, request));
    }

    warn!(status, url = %config.url, "status rejected by validator");
    let response = converted.into_envelope(config.clone(), request.clone());
    Err(ErrorEnvelope {
        cause: FailureCause::ValidationRejected { status },
        config,
        code: None,
        request,
        response: Some(response),
    })
}

fn handle_failure<H: Clone>(
    config: RequestDescriptor,
    request: H,
    failure: TransportFailure,
) -> ErrorEnvelope<H> {
    let TransportFailure {
        message,
        name,
        response,
    } = failure;
    warn!(
        url = %config.url,
        error_name = name.as_deref().unwrap_or("-"),
        status = ?response.as_ref().map(|r| r.status),
        "transport failure: {message}"
    );

    let response = response
        .map(|r| ConvertedResponse::from(r).into_envelope(config.clone(), request.clone()));
    ErrorEnvelope {
        code: name.clone(),
        cause: FailureCause::Transport { message, name },
        config,
        request,
        response,
    }
}

/// The transport-independent parts of a response envelope.
#[derive(Debug, Clone, PartialEq)]
struct ConvertedResponse {
    data: ResponseData,
    status: u16,
    status_text: String,
    headers: Headers,
}

impl ConvertedResponse {
    fn into_envelope<H>(self, config: RequestDescriptor, request: H) -> ResponseEnvelope<H> {
        ResponseEnvelope {
            data: self.data,
            status: self.status,
            status_text: self.status_text,
            headers: self.headers,
            config,
            request,
        }
    }
}

impl From<TransportResponse> for ConvertedResponse {
    fn from(response: TransportResponse) -> Self {
        convert_response(
            response.headers.as_ref(),
            response.body,
            response.status,
            response.status_text,
        )
    }
}

impl From<TransportErrorResponse> for ConvertedResponse {
    fn from(response: TransportErrorResponse) -> Self {
        convert_response(
            response.headers.as_ref(),
            response.error,
            response.status,
            response.status_text,
        )
    }
}

fn convert_response(
    view: &dyn HeaderView,
    data: ResponseData,
    status: u16,
    status_text: String,
) -> ConvertedResponse {
    let headers = view
        .keys()
        .into_iter()
        .filter_map(|key| {
            if !view.has(&key) {
                return None;
            }
            view.get(&key).map(|value| (key, value))
        })
        .collect();

    ConvertedResponse {
        data,
        status,
        status_text,
        headers,
    }
}
