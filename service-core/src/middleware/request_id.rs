//! `x-request-id` handling on top of tower-http's request-id layers.
//!
//! Apply [`propagate_request_id_layer`] first and [`set_request_id_layer`]
//! after it, so the id is minted before anything inside (trace spans,
//! handlers) reads it and is copied onto the response on the way out.

use axum::http::HeaderName;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn header_name() -> HeaderName {
    HeaderName::from_static(REQUEST_ID_HEADER)
}

/// Keeps the caller's id, or sets a fresh uuid when the header is missing.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(header_name(), MakeRequestUuid)
}

/// Echoes the request's id on the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(header_name())
}
