//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing, limits, timeout, request ID)
//! - Bind server to listener
//! - Resolve requests through the rewrite table
//! - Forward matching requests to their destination
//!
//! # Design Decisions
//! - Request bodies are streamed upstream, never buffered; the body limit
//!   layer enforces `max_body_size` while the stream is read
//! - Two deadlines: `upstream_secs` bounds the upstream exchange (504),
//!   `request_secs` bounds the whole inbound request (408)

use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Span;

use crate::config::ProxyConfig;
use crate::http::request::{forward_headers, request_id, UuidRequestId};
use crate::http::response::{from_upstream, UpstreamFailure};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::routing::{RewriteTable, RuleError};

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid rewrite rules: {0}")]
    Rules(#[from] RuleError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid metrics address: {0}")]
    MetricsAddress(#[from] AddrParseError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub rewrites: Arc<RewriteTable>,
    pub client: reqwest::Client,
}

/// HTTP server for the rewrite proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    rewrites: Arc<RewriteTable>,
}

impl HttpServer {
    /// Create a new HTTP server, compiling the rewrite table from `config`.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let rewrites = Arc::new(RewriteTable::from_config(&config)?);

        for rule in rewrites.rules() {
            tracing::info!(
                rule = %rule.name(),
                source = %rule.source(),
                destination = %rule.destination(),
                "Rewrite rule loaded"
            );
        }

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.upstream_secs))
            .no_proxy()
            .build()?;

        let state = AppState {
            rewrites: rewrites.clone(),
            client,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            rewrites,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rules = self.rewrites.rules().len(),
            "HTTP server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for driving the proxy without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn rewrites(&self) -> &RewriteTable {
        &self.rewrites
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

fn make_request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        request_id = %request_id(request.headers()),
        method = %request.method(),
        uri = %request.uri(),
    )
}

/// Main proxy handler.
/// Resolves the rewrite target and forwards the request to it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let method_str = method.to_string();

    let Some(rewrite) = state.rewrites.resolve(request.uri()) else {
        tracing::debug!(path = %request.uri().path(), "No rewrite rule matched");
        metrics::record_request(&method_str, 404, metrics::NO_RULE, start_time);
        return (StatusCode::NOT_FOUND, "No rewrite rule matched").into_response();
    };
    let rule = rewrite.rule.name().to_string();
    let target = rewrite.target;

    tracing::debug!(rule = %rule, target = %target, "Rewriting request");

    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let (parts, body) = request.into_parts();

    let mut upstream = state
        .client
        .request(method, target.to_string())
        .headers(forward_headers(&parts.headers, client_addr));
    if has_body(&parts.headers) {
        upstream = upstream.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    match upstream.send().await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(&method_str, status.as_u16(), &rule, start_time);
            tracing::debug!(
                rule = %rule,
                status = %status,
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Upstream responded"
            );
            from_upstream(response)
        }
        Err(e) => {
            let failure = UpstreamFailure::classify(&e);
            if failure == UpstreamFailure::BodyTooLarge {
                tracing::warn!(rule = %rule, "Request body exceeded the size limit");
            } else {
                tracing::error!(rule = %rule, target = %target, error = %e, "Upstream error");
                metrics::record_upstream_error(&rule, failure.kind());
            }
            metrics::record_request(&method_str, failure.status().as_u16(), &rule, start_time);
            failure.into_response()
        }
    }
}

/// Whether the inbound request announces a body. `Content-Length: 0` is
/// forwarded as a header only, so the upstream sees an explicit empty body.
fn has_body(headers: &HeaderMap) -> bool {
    headers.contains_key(header::TRANSFER_ENCODING)
        || headers
            .get(header::CONTENT_LENGTH)
            .is_some_and(|len| len.as_bytes() != b"0")
}
