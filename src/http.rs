//! Thin `axum` binding over the framework-agnostic `Router`. Only this
//! module (and `main.rs`) knows about HTTP types, mirroring how the teacher
//! keeps `image_ops.rs`/`image_loader.rs` free of `axum` and only wires them
//! up in `main.rs`.

use std::sync::Arc;
use std::time::SystemTime;

use axum::{
    Router as AxumRouter,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::constants;
use crate::error::{IiifError, Status};
use crate::router::{ImageOutcome, Router as CoreRouter};

#[derive(Clone)]
struct AppState {
    router: Arc<CoreRouter>,
    base_uri: String,
}

fn map_status(status: Status) -> StatusCode {
    match status {
        Status::BadRequest => StatusCode::BAD_REQUEST,
        Status::NotFound => StatusCode::NOT_FOUND,
        Status::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for IiifError {
    fn into_response(self) -> Response {
        tracing::warn!(kind = self.kind(), error = %self, "request failed");
        (map_status(self.status()), self.to_string()).into_response()
    }
}

fn profile_link_header() -> HeaderValue {
    HeaderValue::from_str(&format!("<{}>;rel=\"profile\"", constants::COMPLIANCE)).expect("compliance uri is valid header text")
}

fn canonical_link_header(canonical_uri_tail: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("</{canonical_uri_tail}>;rel=\"canonical\"")).ok()
}

fn not_modified_since(headers: &HeaderMap, last_modified: SystemTime) -> bool {
    headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v).ok())
        .map(|since| last_modified <= since)
        .unwrap_or(false)
}

async fn get_info(Path(identifier): Path<String>, headers: HeaderMap, State(state): State<AppState>) -> Response {
    match state.router.get_info(&identifier, &state.base_uri).await {
        Ok((info, last_modified)) => {
            if not_modified_since(&headers, last_modified) {
                return StatusCode::NOT_MODIFIED.into_response();
            }

            let body = match serde_json::to_vec(&info.to_document()) {
                Ok(body) => body,
                Err(e) => return IiifError::ImageInfo(e.to_string()).into_response(),
            };

            let mut response = Response::new(body.into());
            response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("application/ld+json"));
            response.headers_mut().insert(header::LINK, profile_link_header());
            response
                .headers_mut()
                .insert(header::LAST_MODIFIED, HeaderValue::from_str(&httpdate::fmt_http_date(last_modified)).unwrap());
            response
        }
        Err(e) => e.into_response(),
    }
}

async fn get_image(
    Path((identifier, region, size, rotation, quality_format)): Path<(String, String, String, String, String)>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    match state
        .router
        .get_image(&identifier, &region, &size, &rotation, &quality_format, &state.base_uri)
        .await
    {
        Ok(ImageOutcome::Redirect { location_tail }) => {
            let mut response = StatusCode::MOVED_PERMANENTLY.into_response();
            if let Ok(value) = HeaderValue::from_str(&format!("/{location_tail}")) {
                response.headers_mut().insert(header::LOCATION, value);
            }
            response
        }
        Ok(ImageOutcome::Image { path, content_type, last_modified, canonical_uri_tail }) => {
            if not_modified_since(&headers, last_modified) {
                return StatusCode::NOT_MODIFIED.into_response();
            }

            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => return IiifError::Image(e.to_string()).into_response(),
            };

            let mut response = Response::new(bytes.into());
            response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
            response.headers_mut().insert(header::LINK, profile_link_header());
            response
                .headers_mut()
                .insert(header::LAST_MODIFIED, HeaderValue::from_str(&httpdate::fmt_http_date(last_modified)).unwrap());
            if let Some(value) = canonical_link_header(&canonical_uri_tail) {
                response.headers_mut().append(header::LINK, value);
            }
            response
        }
        Err(e) => e.into_response(),
    }
}

async fn get_identifier_root(Path(identifier): Path<String>) -> Response {
    let mut response = StatusCode::SEE_OTHER.into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("/{identifier}/info.json")) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

pub fn build_app(router: Arc<CoreRouter>, base_uri: String) -> AxumRouter {
    let state = AppState { router, base_uri };

    AxumRouter::new()
        .route("/{identifier}/info.json", get(get_info))
        .route("/{identifier}/", get(get_identifier_root))
        .route("/{identifier}/{region}/{size}/{rotation}/{quality_format}", get(get_image))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(tower_http::cors::Any).allow_methods([Method::GET]))
        .with_state(state)
}
