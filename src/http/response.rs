//! Response handling and transformation.
//!
//! # Responsibilities
//! - Transform the destination response for the client
//! - Map upstream errors to appropriate HTTP status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Hop-by-hop headers stripped automatically
//! - Upstream timeouts result in 504 Gateway Timeout, everything else in 502
//! - A streamed request body cut off by the size limit results in 413

use std::error::Error as StdError;

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use http_body_util::LengthLimitError;

use crate::http::request::strip_hop_by_hop;

/// Classification of an upstream failure, used for status and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFailure {
    Timeout,
    Connect,
    BodyTooLarge,
    Other,
}

impl UpstreamFailure {
    pub fn classify(err: &reqwest::Error) -> Self {
        let mut chain = std::iter::successors(Some(err as &(dyn StdError + 'static)), |e| (*e).source());
        if chain.any(|e| e.is::<LengthLimitError>()) {
            Self::BodyTooLarge
        } else if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect
        } else {
            Self::Other
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Connect | Self::Other => StatusCode::BAD_GATEWAY,
        }
    }

    /// Metric label.
    pub fn kind(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::BodyTooLarge => "body_too_large",
            Self::Other => "request",
        }
    }
}

impl IntoResponse for UpstreamFailure {
    fn into_response(self) -> Response {
        let message = match self {
            Self::Timeout => "Upstream request timed out",
            Self::BodyTooLarge => "Request body too large",
            Self::Connect | Self::Other => "Upstream request failed",
        };
        (self.status(), message).into_response()
    }
}

/// Convert a destination response into a client response, streaming the body.
pub fn from_upstream(mut upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = std::mem::take(upstream.headers_mut());
    strip_hop_by_hop(&mut headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
