//! # Health endpoint.
//!
//! | Path          | Method | Body                              |
//! |---------------|--------|-----------------------------------|
//! | `/healthz`    | GET    | `health: ok`                      |
//! | `/status`     | GET    | `status: doing nothing for now`   |
//! | `/pausewatch` | PUT    | `paused watching vault servers`   |
//!
//! Any other method on a known path answers `405` with an `Allow` header and
//! `Only GET is allowed` / `Only PUT is allowed`. Unknown paths answer `404`.
//!
//! [`HealthServer`] runs the router as a supervised worker. A bind failure is
//! fatal. After cancellation the server stops accepting connections and waits
//! at most `shutdown_timeout` for in-flight requests.

use std::future::IntoFuture;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::Request;
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::WorkerError;
use crate::workers::{Role, Worker, WorkerContext, WorkerIdentity};

/// Builds the health router.
pub fn router() -> Router {
    Router::new()
        .route("/healthz", get(healthz).fallback(only_get))
        .route("/status", get(status).fallback(only_get))
        .route("/pausewatch", put(pause_watch).fallback(only_put))
        .layer(middleware::from_fn(log_request))
}

async fn healthz() -> &'static str {
    "health: ok"
}

async fn status() -> &'static str {
    "status: doing nothing for now"
}

async fn pause_watch() -> &'static str {
    "paused watching vault servers"
}

async fn only_get() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET")],
        "Only GET is allowed",
    )
}

async fn only_put() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "PUT")],
        "Only PUT is allowed",
    )
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let res = next.run(req).await;
    info!(%method, path = %path, status = res.status().as_u16(), "health request");
    res
}

enum Bind {
    Address(String, u16),
    Listener(TcpListener),
}

/// The health endpoint as a supervised worker.
pub struct HealthServer {
    identity: WorkerIdentity,
    bind: Bind,
    shutdown_timeout: Duration,
}

impl HealthServer {
    /// Server that binds `address:port` when it starts.
    pub fn new(address: impl Into<String>, port: u16, shutdown_timeout: Duration) -> Self {
        Self {
            identity: WorkerIdentity::of(Role::Health),
            bind: Bind::Address(address.into(), port),
            shutdown_timeout,
        }
    }

    /// Server on an already bound listener.
    pub fn with_listener(listener: TcpListener, shutdown_timeout: Duration) -> Self {
        Self {
            identity: WorkerIdentity::of(Role::Health),
            bind: Bind::Listener(listener),
            shutdown_timeout,
        }
    }
}

#[async_trait]
impl Worker for HealthServer {
    fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    async fn run(self: Box<Self>, ctx: WorkerContext) -> Result<(), WorkerError> {
        let HealthServer {
            bind,
            shutdown_timeout,
            ..
        } = *self;
        let listener = match bind {
            Bind::Listener(listener) => listener,
            Bind::Address(address, port) => TcpListener::bind((address.as_str(), port))
                .await
                .map_err(|e| WorkerError::Fatal {
                    error: format!("unable to bind health endpoint {address}:{port}: {e}"),
                })?,
        };
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "health endpoint listening");
        }

        let token = ctx.token().clone();
        let server = axum::serve(listener, router())
            .with_graceful_shutdown(async move { token.cancelled().await })
            .into_future();
        let mut server = std::pin::pin!(server);

        tokio::select! {
            res = &mut server => return res.map_err(serve_error),
            _ = ctx.cancelled() => {}
        }

        match tokio::time::timeout(shutdown_timeout, server).await {
            Ok(res) => res.map_err(serve_error),
            Err(_) => {
                warn!(timeout = ?shutdown_timeout, "health endpoint shutdown timed out");
                Ok(())
            }
        }
    }
}

fn serve_error(e: std::io::Error) -> WorkerError {
    WorkerError::Fatal {
        error: format!("health endpoint failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;
    use axum::body::Body;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    async fn call(method: &str, uri: &str) -> (StatusCode, Option<String>, String) {
        let res = router()
            .oneshot(
                axum::http::Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = res.status();
        let allow = res
            .headers()
            .get(header::ALLOW)
            .map(|v| v.to_str().unwrap().to_owned());
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, allow, String::from_utf8(body.to_vec()).unwrap())
    }

    fn context() -> WorkerContext {
        let (tx, _rx) = mpsc::channel(1);
        WorkerContext::new(
            WorkerIdentity::of(Role::Health).with_ordinal(1),
            CancellationToken::new(),
            Bus::default(),
            tx,
        )
    }

    #[tokio::test]
    async fn routes_answer_their_method() {
        assert_eq!(
            call("GET", "/healthz").await,
            (StatusCode::OK, None, "health: ok".into())
        );
        assert_eq!(
            call("GET", "/status").await,
            (StatusCode::OK, None, "status: doing nothing for now".into())
        );
        assert_eq!(
            call("PUT", "/pausewatch").await,
            (StatusCode::OK, None, "paused watching vault servers".into())
        );
    }

    #[tokio::test]
    async fn wrong_method_is_405_with_allow() {
        assert_eq!(
            call("POST", "/healthz").await,
            (
                StatusCode::METHOD_NOT_ALLOWED,
                Some("GET".into()),
                "Only GET is allowed".into()
            )
        );
        assert_eq!(
            call("DELETE", "/status").await.0,
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            call("GET", "/pausewatch").await,
            (
                StatusCode::METHOD_NOT_ALLOWED,
                Some("PUT".into()),
                "Only PUT is allowed".into()
            )
        );
        assert_eq!(call("GET", "/nope").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn serves_over_tcp_until_cancelled() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = HealthServer::with_listener(listener, Duration::from_secs(5));
        assert_eq!(server.identity().role(), Role::Health);

        let ctx = context();
        let token = ctx.token().clone();
        let handle = tokio::spawn(Box::new(server).run(ctx));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 200"), "{raw}");
        assert!(raw.ends_with("health: ok"), "{raw}");

        token.cancel();
        assert_eq!(handle.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn bind_failure_is_fatal() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let server = HealthServer::new("127.0.0.1", port, Duration::from_secs(5));
        let err = Box::new(server).run(context()).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
