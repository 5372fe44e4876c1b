//! Router construction and server host for the Transmission-RPC ingress
//! (§4.F, §6 "HTTP ingress").

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router, middleware};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::auth::require_basic_auth;
use crate::model::{RpcRequest, RpcResponse};
use crate::rpc::dispatch;
use crate::state::IngressState;

/// Axum router wrapper hosting the Transmission-RPC ingress.
pub struct IngressServer {
    router: Router,
}

impl IngressServer {
    /// Build the ingress server. Only constructed by the supervisor when the
    /// configured backend implements [`boxwarden_backend::MutationBackend`]
    /// (§4.F: "Available only when the configured backend supports mutation").
    ///
    /// `request_timeout` bounds each request end-to-end; `axum::serve` does
    /// not expose hyper's read/write/idle timeouts individually, so the
    /// three configured timeouts (§6 "HTTP ingress") collapse onto this one
    /// per-request layer (see the open question noted in `DESIGN.md`).
    #[must_use]
    pub fn new(state: IngressState, request_timeout: Duration) -> Self {
        let state = Arc::new(state);

        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                    status = tracing::field::Empty,
                    duration_ms = tracing::field::Empty
                )
            })
            .on_response(|response: &Response, latency: Duration, span: &Span| {
                let status = response.status().as_u16();
                let duration_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                span.record("status", status);
                span.record("duration_ms", duration_ms);
                match status {
                    0..=399 => tracing::info!(status, duration_ms, "request completed"),
                    400..=499 => tracing::warn!(status, duration_ms, "request completed"),
                    _ => tracing::error!(status, duration_ms, "request completed"),
                }
            });

        let request_id_layers = ServiceBuilder::new()
            .layer(boxwarden_telemetry::propagate_request_id_layer())
            .layer(boxwarden_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(TimeoutLayer::new(request_timeout));

        let auth = middleware::from_fn_with_state(Arc::clone(&state), require_basic_auth);

        let router = Router::new()
            .route("/transmission/rpc", post(handle_rpc).route_layer(auth))
            .layer(request_id_layers)
            .with_state(state);

        Self { router }
    }

    /// Serve the ingress on `addr` until the listener fails or `shutdown`
    /// fires, in which case in-flight requests are drained before returning
    /// (§4.H "graceful shutdown").
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or the server terminates
    /// unexpectedly.
    pub async fn serve(self, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
        tracing::info!(%addr, "starting Transmission-RPC ingress");
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn router(self) -> Router {
        self.router
    }
}

async fn handle_rpc(
    axum::extract::State(state): axum::extract::State<Arc<IngressState>>,
    Json(body): Json<RpcRequest>,
) -> (StatusCode, Json<RpcResponse>) {
    let response = dispatch(&state, body).await;
    (StatusCode::OK, Json(response))
}
