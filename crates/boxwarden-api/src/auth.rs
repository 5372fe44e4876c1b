//! HTTP basic-auth middleware (§4.F "Authentication", §6 middleware chain).

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::state::IngressState;

/// Reject the request with `401` unless the `Authorization` header carries
/// basic credentials matching configuration. Never logs the credential
/// value, only that a check failed.
pub(crate) async fn require_basic_auth(
    State(state): State<Arc<IngressState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if credentials_match(req.headers(), &state) {
        Ok(next.run(req).await)
    } else {
        tracing::warn!("rejected ingress request with missing or invalid basic auth");
        Ok((StatusCode::UNAUTHORIZED, "unauthorized").into_response())
    }
}

fn credentials_match(headers: &HeaderMap, state: &IngressState) -> bool {
    let Some(header) = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()) else {
        return false;
    };
    let Some(encoded) = header.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((username, password)) = decoded.split_once(':') else {
        return false;
    };
    username == state.auth.username && password == state.auth.password
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::state::BasicAuthCredentials;

    fn state_with(username: &str, password: &str) -> IngressState {
        use boxwarden_backend::{BackendResult, ByteStream, DiscoverBackend, MutationBackend, Transfer, TransferFile};
        use boxwarden_telemetry::Metrics;

        struct Empty;

        #[async_trait::async_trait]
        impl DiscoverBackend for Empty {
            async fn authenticate(&self) -> BackendResult<()> {
                Ok(())
            }
            async fn get_tagged_transfers(&self, _label: &str) -> BackendResult<Vec<Transfer>> {
                Ok(Vec::new())
            }
            async fn grab_file(&self, _transfer: &Transfer, _file: &TransferFile) -> BackendResult<ByteStream> {
                unimplemented!()
            }
        }

        #[async_trait::async_trait]
        impl MutationBackend for Empty {
            async fn remove_transfer(&self, _id: &str) -> BackendResult<()> {
                Ok(())
            }
            async fn add_transfer_by_url(&self, _url: &str, _destination: &str) -> BackendResult<Transfer> {
                unimplemented!()
            }
            async fn add_transfer_by_bytes(&self, _content: &[u8], _filename: &str, _destination: &str) -> BackendResult<Transfer> {
                unimplemented!()
            }
        }

        IngressState::new(
            std::sync::Arc::new(Empty),
            std::sync::Arc::new(Empty),
            "boxwarden",
            "downloads",
            Metrics::new().expect("metrics"),
            BasicAuthCredentials::new(username, password),
        )
    }

    #[test]
    fn rejects_missing_header() {
        let state = state_with("op", "secret");
        assert!(!credentials_match(&HeaderMap::new(), &state));
    }

    #[test]
    fn accepts_matching_credentials() {
        let state = state_with("op", "secret");
        let mut headers = HeaderMap::new();
        let encoded = STANDARD.encode("op:secret");
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Basic {encoded}")).unwrap());
        assert!(credentials_match(&headers, &state));
    }

    #[test]
    fn rejects_wrong_password() {
        let state = state_with("op", "secret");
        let mut headers = HeaderMap::new();
        let encoded = STANDARD.encode("op:wrong");
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Basic {encoded}")).unwrap());
        assert!(!credentials_match(&headers, &state));
    }
}
