//! HTTP gateway for PeerLink.
//!
//! Two endpoints front the one-shot transfer engine:
//!
//! - `POST /upload` takes a `multipart/form-data` body with a single file,
//!   stores it and answers `{"port": <code>}`.
//! - `GET /download/{code}` connects to the share on behalf of the browser
//!   and relays the file back as an attachment.
//!
//! Every response carries `Access-Control-Allow-Origin: *`, and `OPTIONS`
//! on any path is answered with `204 No Content`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use peerlink_core::config::Config;
//! use peerlink_core::web::WebServer;
//!
//! let server = WebServer::new(&Config::default())?;
//! server.run(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//! ```

pub mod error;
pub mod handlers;
pub mod state;

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::Config;
use crate::error::Result;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, SharedState};

/// Build the gateway router.
pub fn router(state: SharedState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/upload",
            post(handlers::upload).fallback(handlers::method_not_allowed),
        )
        .route(
            "/download/{code}",
            get(handlers::download).fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(cors))
        .layer(TraceLayer::new_for_http())
}

async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        let mut preflight = StatusCode::NO_CONTENT.into_response();
        let headers = preflight.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );
        preflight
    } else {
        next.run(request).await
    };

    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

#[allow(clippy::needless_pass_by_value)]
fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Request handler panicked");
    ApiError::internal("Internal Server Error").into_response()
}

/// The HTTP gateway together with its shares.
#[derive(Debug)]
pub struct WebServer {
    state: SharedState,
    addr: SocketAddr,
    max_upload_bytes: usize,
}

impl WebServer {
    /// Create a gateway from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address or code range is invalid, or
    /// the scratch directory cannot be created.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            state: AppState::new(config)?.shared(),
            addr: config.server.bind_addr()?,
            max_upload_bytes: config.server.max_upload_bytes,
        })
    }

    /// Shared state of the gateway.
    #[must_use]
    pub const fn state(&self) -> &SharedState {
        &self.state
    }

    /// Configured listen address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Router serving this gateway.
    #[must_use]
    pub fn router(&self) -> Router {
        router(self.state.clone(), self.max_upload_bytes)
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the server fails.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        self.run_with_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// Shares still waiting for their client are stopped before this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails.
    pub async fn run_with_listener<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!("PeerLink gateway listening on http://{}", addr);
        tracing::info!("Scratch directory: {}", self.state.scratch_dir.display());

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        self.state.sessions.shutdown().await;
        tracing::info!("PeerLink gateway stopped");
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    fn test_state() -> (tempfile::TempDir, SharedState) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.scratch_dir = Some(dir.path().to_path_buf());
        let state = AppState::new(&config).unwrap().shared();
        (dir, state)
    }

    #[tokio::test]
    async fn test_options_preflight() {
        let (_dir, state) = test_state();
        let response = router(state, 1024)
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, OPTIONS"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let (_dir, state) = test_state();
        let response = router(state, 1024)
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"NOT FOUND");
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let app = Router::new()
            .route("/boom", get(|| async {
                panic!("boom");
                #[allow(unreachable_code)]
                ()
            }))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(middleware::from_fn(cors));

        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(!String::from_utf8_lossy(&body).contains("boom"));
    }
}
