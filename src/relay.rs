// src/relay.rs
//! Same-origin relay in front of the key and registration endpoints.
//!
//! Browsers cannot call those hosts directly because they do not grant
//! cross-origin access. The relay forwards requests verbatim and rewrites the
//! CORS headers on every response it emits, error responses included.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        Method, StatusCode,
    },
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, error};

use crate::config::{RelayConfig, KEYS_PATH, REGISTRATION_PATH};

pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";

const HOP_HEADERS: [HeaderName; 8] = [
    header::HOST,
    header::CONTENT_LENGTH,
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHORIZATION,
];

/// Closed mapping from relay paths to upstream URLs.
#[derive(Debug, Clone)]
pub struct Routes {
    keys: String,
    registration: String,
}

impl Routes {
    pub fn new(keys: impl Into<String>, registration: impl Into<String>) -> Self {
        Self {
            keys: keys.into(),
            registration: registration.into(),
        }
    }

    pub fn resolve(&self, path: &str) -> Option<&str> {
        match path {
            KEYS_PATH => Some(&self.keys),
            REGISTRATION_PATH => Some(&self.registration),
            _ => None,
        }
    }
}

#[derive(Clone)]
struct RelayState {
    routes: Arc<Routes>,
    client: reqwest::Client,
    max_body_bytes: usize,
    body_timeout: Duration,
}

pub fn router(config: &RelayConfig) -> Result<Router, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .build()?;
    let state = RelayState {
        routes: Arc::new(Routes::new(
            config.keys_upstream.clone(),
            config.registration_upstream.clone(),
        )),
        client,
        max_body_bytes: config.max_body_bytes,
        body_timeout: config.upstream_timeout,
    };

    // Body reads and upstream calls time out first; the outer timeout is a backstop.
    let outer_timeout = config.upstream_timeout * 2 + Duration::from_secs(5);

    Ok(Router::new()
        .fallback(relay)
        .with_state(state)
        .layer(TimeoutLayer::new(outer_timeout))
        .layer(middleware::map_response(with_cors))
        .layer(TraceLayer::new_for_http()))
}

// ---------- HANDLER ---------- //

async fn relay(State(state): State<RelayState>, req: Request) -> Response {
    if req.method() == Method::OPTIONS {
        return preflight();
    }

    let Some(upstream) = state.routes.resolve(req.uri().path()) else {
        return RelayError::NotFound.into_response();
    };
    let upstream = upstream.to_owned();

    match forward(&state, &upstream, req).await {
        Ok(res) => res,
        Err(e) => {
            error!("relay to {upstream} failed: {e}");
            e.into_response()
        }
    }
}

async fn forward(state: &RelayState, url: &str, req: Request) -> Result<Response, RelayError> {
    let (parts, body) = req.into_parts();
    let mut headers = parts.headers;
    strip_hop_headers(&mut headers);

    let mut upstream = state
        .client
        .request(parts.method.clone(), url)
        .headers(headers);
    if parts.method != Method::GET && parts.method != Method::HEAD {
        let bytes = tokio::time::timeout(
            state.body_timeout,
            axum::body::to_bytes(body, state.max_body_bytes),
        )
        .await
        .map_err(|_| RelayError::BodyTimeout)?
        .map_err(|e| RelayError::BadBody(e.to_string()))?;
        upstream = upstream.body(bytes);
    }

    let res = upstream
        .send()
        .await
        .map_err(|e| RelayError::Upstream(e.to_string()))?;
    let status = res.status();
    let mut headers = res.headers().clone();
    let body: Bytes = res
        .bytes()
        .await
        .map_err(|e| RelayError::Upstream(e.to_string()))?;
    debug!(%status, bytes = body.len(), "relayed {} {url}", parts.method);

    strip_hop_headers(&mut headers);
    apply_cors(&mut headers);

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

// ---------- RESPONSES ---------- //

fn preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    apply_cors(response.headers_mut());
    response
}

/// Overwrites the three CORS headers.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
}

// Covers responses produced by layers, e.g. the timeout backstop.
async fn with_cors(mut response: Response) -> Response {
    apply_cors(response.headers_mut());
    response
}

fn strip_hop_headers(headers: &mut HeaderMap) {
    for name in HOP_HEADERS {
        headers.remove(name);
    }
}

#[derive(Debug)]
enum RelayError {
    NotFound,
    BadBody(String),
    BodyTimeout,
    Upstream(String),
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::NotFound => f.write_str("Not Found"),
            RelayError::BadBody(e) => write!(f, "Invalid request body: {e}"),
            RelayError::BodyTimeout => f.write_str("Timed out reading request body"),
            RelayError::Upstream(e) => write!(f, "Error fetching data: {e}"),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match self {
            RelayError::NotFound => StatusCode::NOT_FOUND,
            RelayError::BadBody(_) => StatusCode::BAD_REQUEST,
            RelayError::BodyTimeout => StatusCode::REQUEST_TIMEOUT,
            RelayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let mut response = (status, self.to_string()).into_response();
        apply_cors(response.headers_mut());
        response
    }
}
