//! HTTP routing: the gate in front of the static file service.
//!
//! ```text
//! request ──→ gate middleware ──→ index rewrite ──→ ServeDir
//!                  │
//!                  └──→ 302 / 503 (answered here)
//! ```

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use portcullis_session::Authenticator;
use tower_http::services::ServeDir;

use crate::gate::{GateDecision, LoginGate, Route};
use crate::StaticConfig;

/// Builds the application router.
///
/// Every request passes the gate first. Admitted requests are served
/// from `statics.document_root`; paths ending in `/` get the index file.
pub fn router<A: Authenticator>(gate: Arc<LoginGate<A>>, statics: &StaticConfig) -> Router {
    let statics = statics.clone().validated();
    let files = ServeDir::new(&statics.document_root).append_index_html_on_directories(false);
    let index: Arc<str> = Arc::from(statics.index_file);

    Router::new()
        .fallback_service(files)
        .layer(middleware::from_fn_with_state(index, rewrite_index))
        .layer(middleware::from_fn_with_state(gate, gate_requests::<A>))
}

async fn gate_requests<A: Authenticator>(
    State(gate): State<Arc<LoginGate<A>>>,
    req: Request,
    next: Next,
) -> Response {
    // `Body` is not `Sync`, so only `Parts` may be borrowed across awaits.
    let (parts, body) = req.into_parts();
    let route = gate.classify(&parts.method, parts.uri.path());

    // Only a login submission has a body worth reading here.
    let (body, form) = if route == Route::LoginSubmit {
        let bytes = match axum::body::to_bytes(body, gate.config().max_form_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "login body unreadable or too large");
                Bytes::new()
            }
        };
        (Body::from(bytes.clone()), bytes)
    } else {
        (body, Bytes::new())
    };

    let decision = gate
        .evaluate(&parts.method, parts.uri.path(), &parts.headers, &form)
        .await;

    match decision {
        GateDecision::Admit => next.run(Request::from_parts(parts, body)).await,
        GateDecision::LoginSucceeded { token } => {
            let mut response = found(&gate.config().landing_path);
            match HeaderValue::from_str(&gate.cookie_for(token)) {
                Ok(cookie) => {
                    response.headers_mut().insert(header::SET_COOKIE, cookie);
                }
                Err(e) => {
                    tracing::error!(error = %e, "session cookie is not a valid header value");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            }
            response
        }
        GateDecision::RedirectToLogin => found(&gate.config().login_path),
        GateDecision::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// Maps `/dir/` to `/dir/<index>` before the file service sees it.
async fn rewrite_index(State(index): State<Arc<str>>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if path.ends_with('/') {
        let rewritten = match req.uri().query() {
            Some(query) => format!("{path}{index}?{query}"),
            None => format!("{path}{index}"),
        };
        match rewritten.parse::<Uri>() {
            Ok(uri) => *req.uri_mut() = uri,
            Err(e) => tracing::debug!(error = %e, "could not rewrite to index file"),
        }
    }
    next.run(req).await
}

/// `302 Found` with a `Location` header.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
