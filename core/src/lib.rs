//! Descriptor-style HTTP requests executed through a pluggable transport.
//!
//! # Overview
//! Code written against a "request config in, structured response or
//! structured error out" contract hands a `RequestDescriptor` to an
//! `Adapter`. The adapter normalizes headers, synthesizes basic-auth,
//! delegates the network call to its `Transport`, and reshapes whatever the
//! transport reports into a `ResponseEnvelope` or an `ErrorEnvelope`.
//!
//! # Design
//! - `Adapter` is stateless apart from the transport it was built with.
//! - The transport is a trait; `UreqTransport` (feature `ureq`, on by
//!   default) is the bundled implementation.
//! - Response headers are read through the `HeaderView` capability so any
//!   transport can expose its native header container.
//! - Network failures, error statuses and status-predicate rejections all
//!   converge on `ErrorEnvelope`.

pub mod adapter;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;
#[cfg(feature = "ureq")]
pub mod ureq_transport;

pub use adapter::Adapter;
pub use error::FailureCause;
pub use http::{FormField, FormValue, HeaderView, Headers, RequestBody, ResponseData};
pub use transport::{
    Observe, Transport, TransportErrorResponse, TransportFailure, TransportOutcome,
    TransportRequest, TransportResponse,
};
pub use types::{
    AdaptResult, BasicAuth, ErrorEnvelope, RequestDescriptor, ResponseEnvelope, StatusValidator,
};
#[cfg(feature = "ureq")]
pub use ureq_transport::{RequestHandle, TransportConfig, UreqTransport};
