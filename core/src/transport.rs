//! The transport capability the adapter delegates network I/O to.
//!
//! # Design
//! A transport works in two steps. `prepare` turns a `TransportRequest` into
//! the transport's own handle without sending anything; `execute` performs
//! the one network call for that handle. The adapter keeps the handle and
//! attaches it to whichever envelope the call settles into.
//!
//! Whether the origin's answer counts as a response or an error response is
//! decided here, once, by the `TransportOutcome` variant.

use std::fmt;

use async_trait::async_trait;

use crate::http::{HeaderView, Headers, RequestBody, ResponseData};

/// How much of the response the caller wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observe {
    /// Only the decoded body.
    Body,
    /// Status, status text, headers and body.
    Response,
}

/// Everything a transport needs to issue one call.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Upper-cased. Validity is for the transport to judge.
    pub method: String,
    pub url: String,
    pub body: Option<RequestBody>,
    pub headers: Headers,
    pub params: Vec<(String, String)>,
    pub observe: Observe,
}

/// A response the transport delivered on its success channel.
#[derive(Debug)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Box<dyn HeaderView>,
    pub body: ResponseData,
}

/// A response the transport received but reports as failure.
#[derive(Debug)]
pub struct TransportErrorResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Box<dyn HeaderView>,
    pub error: ResponseData,
}

#[derive(Debug)]
pub struct TransportFailure {
    pub message: String,
    /// Transport-native error discriminator.
    pub name: Option<String>,
    /// Absent when no response was received from the origin.
    pub response: Option<TransportErrorResponse>,
}

#[derive(Debug)]
pub enum TransportOutcome {
    Ok(TransportResponse),
    Failed(TransportFailure),
}

/// An HTTP-calling collaborator.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Native handle for one in-flight call.
    type Handle: Clone + fmt::Debug + Send + Sync;

    /// Build the handle for `request`. Nothing is sent yet.
    fn prepare(&self, request: TransportRequest) -> Self::Handle;

    /// Issue exactly one network call for `handle` and report how it settled.
    async fn execute(&self, handle: &Self::Handle) -> TransportOutcome;
}
