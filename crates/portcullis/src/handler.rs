//! Per-connection handler: finish the transport handshake, then speak
//! HTTP/1.1 until the client goes away.

use axum::Router;
use hyper::body::Incoming as IncomingBody;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use portcullis_transport::Incoming;
use tower::Service;

use crate::PortcullisError;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(incoming: Incoming, router: Router) -> Result<(), PortcullisError> {
    let conn_id = incoming.id();
    let peer = incoming.peer();
    tracing::debug!(%conn_id, %peer, "handling new connection");

    // TLS handshakes happen here, off the accept loop.
    let stream = incoming.establish().await?;

    let service = service_fn(move |req: hyper::Request<IncomingBody>| router.clone().call(req));

    http1::Builder::new()
        .serve_connection(TokioIo::new(stream), service)
        .await?;

    tracing::debug!(%conn_id, "connection closed");
    Ok(())
}
