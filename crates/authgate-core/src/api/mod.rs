//! REST API gateway.
//!
//! This module provides the `ApiClient` and the interceptor `Pipeline` it
//! sends through. The pipeline attaches the held bearer credential before
//! each call and classifies failures afterwards (notices, forced logout on
//! an unauthorized response, redirect to the public entry route).

pub mod client;
pub mod error;
pub mod notice;
pub mod pipeline;
pub mod transport;

pub use client::ApiClient;
pub use error::ApiError;
pub use notice::{ChannelNotifier, Notice, Notifier, TracingNotifier};
pub use pipeline::{BearerAuth, FailureClassifier, Pipeline, RequestInterceptor, ResponseInterceptor};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
